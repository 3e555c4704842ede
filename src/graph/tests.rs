use super::description::GraphDescription;
use super::*;

fn nhwc(name: &str, shape: [u32; 4]) -> TensorDescriptor {
    TensorDescriptor::new(name, Order::nhwc(), shape.to_vec()).unwrap()
}

#[test]
fn test_order_parse_and_display() {
    let order: Order = "nhwc".parse().unwrap();
    assert_eq!(order, Order::nhwc());
    assert_eq!(order.to_string(), "NHWC");
    assert_eq!(Order::nchw().to_string(), "NCHW");
}

#[test]
fn test_order_rejects_repeated_axis() {
    let err = "NHHC".parse::<Order>().unwrap_err();
    assert!(matches!(err, LowerError::InvalidOrder { .. }));
}

#[test]
fn test_order_rejects_unknown_axis() {
    assert!("NHWT".parse::<Order>().is_err());
}

#[test]
fn test_shape_of_follows_order() {
    let t = TensorDescriptor::new("x", Order::nchw(), vec![1, 8, 3, 5]).unwrap();
    assert_eq!(t.shape_of(Axis::N).unwrap(), 1);
    assert_eq!(t.shape_of(Axis::C).unwrap(), 8);
    assert_eq!(t.shape_of(Axis::H).unwrap(), 3);
    assert_eq!(t.shape_of(Axis::W).unwrap(), 5);
    assert_eq!(t.size(), 120);
}

#[test]
fn test_shape_of_missing_axis() {
    let order = Order::new(vec![Axis::N, Axis::C]).unwrap();
    let t = TensorDescriptor::new("flat", order, vec![2, 10]).unwrap();
    let err = t.shape_of(Axis::H).unwrap_err();
    assert!(matches!(err, LowerError::MissingAxis { axis: 'H', .. }));
}

#[test]
fn test_tensor_rejects_rank_mismatch_and_zero_extent() {
    assert!(TensorDescriptor::new("x", Order::nhwc(), vec![1, 2, 2]).is_err());
    assert!(TensorDescriptor::new("x", Order::nhwc(), vec![1, 0, 2, 4]).is_err());
}

#[test]
fn test_operator_identity() {
    let op = Operator::Depth2Space(
        BlockRearrange::new(OperatorId(7), nhwc("x", [1, 2, 2, 4]), nhwc("y", [1, 4, 4, 1]), 2)
            .unwrap(),
    );
    assert_eq!(op.kind(), OperatorKind::Depth2Space);
    assert_eq!(op.id(), OperatorId(7));
    assert_eq!(op.label(), "depth2space#7");
    assert_eq!(op.inputs()[0].name(), "x");
    assert_eq!(op.outputs()[0].name(), "y");
}

#[test]
fn test_block_size_must_be_positive() {
    let err = BlockRearrange::new(OperatorId(0), nhwc("x", [1, 1, 1, 1]), nhwc("y", [1, 1, 1, 1]), 0)
        .unwrap_err();
    assert!(matches!(err, LowerError::InvalidParameter { .. }));
}

#[test]
fn test_operator_kind_parse() {
    assert_eq!("Depth2Space".parse::<OperatorKind>().unwrap(), OperatorKind::Depth2Space);
    assert_eq!("space2depth".parse::<OperatorKind>().unwrap(), OperatorKind::Space2Depth);
    assert!(matches!(
        "Conv2D".parse::<OperatorKind>(),
        Err(LowerError::UnknownOperatorType { .. })
    ));
}

#[test]
fn test_graph_rejects_duplicate_ids() {
    let op = Operator::Depth2Space(
        BlockRearrange::new(OperatorId(1), nhwc("x", [1, 2, 2, 4]), nhwc("y", [1, 4, 4, 1]), 2)
            .unwrap(),
    );
    let err = Graph::new(vec![op.clone(), op]).unwrap_err();
    assert!(matches!(err, LowerError::DuplicateOperatorId { id: 1 }));
}

const DESCRIPTION: &str = r#"{
  "tensors": [
    {"name": "x", "order": "NHWC", "shape": [1, 2, 2, 4]},
    {"name": "y", "order": "NHWC", "shape": [1, 4, 4, 1]}
  ],
  "operators": [
    {"id": 0, "type": "Depth2Space", "inputs": {"x": "x"}, "outputs": {"y": "y"}, "parameters": {"r": 2}}
  ],
  "layout": {
    "x": {"segment": "static", "offset": 0, "size": 16},
    "y": {"segment": "dynamic", "offset": {"label": "y_offset"}, "size": 16}
  }
}"#;

#[test]
fn test_description_into_parts() {
    let desc = GraphDescription::from_json(DESCRIPTION).unwrap();
    let (graph, layout) = desc.into_parts().unwrap();
    assert_eq!(graph.len(), 1);
    assert_eq!(layout.len(), 2);
    match &graph.operators()[0] {
        Operator::Depth2Space(op) => {
            assert_eq!(op.r, 2);
            assert_eq!(op.x.shape(), &[1, 2, 2, 4]);
            assert_eq!(op.y.shape_of(Axis::H).unwrap(), 4);
        }
        other => panic!("unexpected operator {:?}", other),
    }
}

#[test]
fn test_description_missing_parameter() {
    let text = DESCRIPTION.replace(r#", "parameters": {"r": 2}"#, "");
    let err = GraphDescription::from_json(&text).unwrap().into_parts().unwrap_err();
    assert!(
        matches!(&err, LowerError::MissingParameter { op, name } if op == "depth2space#0" && name == "r")
    );
}

#[test]
fn test_description_missing_input() {
    let text = DESCRIPTION.replace(r#""inputs": {"x": "x"}"#, r#""inputs": {}"#);
    let err = GraphDescription::from_json(&text).unwrap().into_parts().unwrap_err();
    assert!(matches!(err, LowerError::MissingInput { .. }));
}

#[test]
fn test_description_unknown_tensor() {
    let text = DESCRIPTION.replace(r#""outputs": {"y": "y"}"#, r#""outputs": {"y": "z"}"#);
    let err = GraphDescription::from_json(&text).unwrap().into_parts().unwrap_err();
    assert!(matches!(err, LowerError::UnknownTensor { tensor, .. } if tensor == "z"));
}

#[test]
fn test_description_negative_block_size() {
    let text = DESCRIPTION.replace(r#""r": 2"#, r#""r": -2"#);
    let err = GraphDescription::from_json(&text).unwrap().into_parts().unwrap_err();
    assert!(matches!(err, LowerError::InvalidParameter { .. }));
}

//! Lowering throughput: template build, injection, and whole graphs.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use kernelsmith::graph::{BlockRearrange, OperatorId, Order, TensorDescriptor};
use kernelsmith::kir::lower::metal::{depth2space_index_map, template};
use kernelsmith::layout::{Allocation, Segment};
use kernelsmith::{lower_graph, Graph, HandlerRegistry, LoweringConfig, MemoryLayout, Operator, OperatorKind};

/// A chain of `n` depth2space operators with disjoint tensors.
fn synthetic_graph(n: u32) -> (Graph, MemoryLayout) {
    let mut ops = Vec::with_capacity(n as usize);
    let mut layout = MemoryLayout::new();
    for i in 0..n {
        let x = TensorDescriptor::new(format!("x{}", i), Order::nhwc(), vec![1, 8, 8, 16]).unwrap();
        let y = TensorDescriptor::new(format!("y{}", i), Order::nhwc(), vec![1, 16, 16, 4]).unwrap();
        layout.insert(x.name(), Allocation::fixed(Segment::Static, i * 1024, 1024));
        layout.insert(y.name(), Allocation::fixed(Segment::Dynamic, i * 1024, 1024));
        ops.push(Operator::Depth2Space(
            BlockRearrange::new(OperatorId(i), x, y, 2).unwrap(),
        ));
    }
    (Graph::new(ops).unwrap(), layout)
}

fn bench_template(c: &mut Criterion) {
    c.bench_function("template_depth2space", |b| {
        b.iter(|| template(OperatorKind::Depth2Space, black_box(depth2space_index_map())))
    });
}

fn bench_lower_graph(c: &mut Criterion) {
    let registry = HandlerRegistry::metal();
    let mut group = c.benchmark_group("lower_graph");
    for n in [16u32, 256] {
        let (graph, layout) = synthetic_graph(n);
        group.bench_function(format!("{}_ops_sequential", n), |b| {
            b.iter(|| lower_graph(black_box(&graph), &layout, &registry, &LoweringConfig::metal()))
        });
        let parallel = LoweringConfig {
            parallel: true,
            ..LoweringConfig::metal()
        };
        group.bench_function(format!("{}_ops_parallel", n), |b| {
            b.iter(|| lower_graph(black_box(&graph), &layout, &registry, &parallel))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_template, bench_lower_graph);
criterion_main!(benches);

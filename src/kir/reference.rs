//! Host reference semantics for generated kernels.
//!
//! Evaluates a kernel's `IndexMap` on the CPU under the same grid-stride
//! traversal the device uses, so the index arithmetic can be checked
//! without a GPU. Every worker visits `worker, worker + workers, ...`
//! below `total`; the map must send each output index to exactly one
//! input element and no output index may be written twice.

use std::collections::HashMap;

use super::expr::IndexMap;
use crate::error::Result;
use crate::graph::{Axis, BlockRearrange};

/// Scalar bindings a kernel reads from its metadata buffer.
#[derive(Clone, Debug, Default)]
pub struct IndexEnv {
    scalars: HashMap<String, i64>,
}

impl IndexEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, name: &str, value: i64) -> Self {
        self.scalars.insert(name.to_string(), value);
        self
    }

    /// The scalars a block-rearrangement kernel loads, from its tensors.
    pub fn block_rearrange(op: &BlockRearrange) -> Result<Self> {
        let (x, y) = (&op.x, &op.y);
        let env = Self::new()
            .bind("r", op.r.into())
            .bind("N", x.shape_of(Axis::N)?.into())
            .bind("C1", x.shape_of(Axis::C)?.into())
            .bind("C2", y.shape_of(Axis::C)?.into())
            .bind("H1", x.shape_of(Axis::H)?.into())
            .bind("H2", y.shape_of(Axis::H)?.into())
            .bind("W1", x.shape_of(Axis::W)?.into())
            .bind("W2", y.shape_of(Axis::W)?.into());
        Ok(env)
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.scalars.get(name).copied()
    }

    pub fn scalars(&self) -> &HashMap<String, i64> {
        &self.scalars
    }
}

/// Output indices visited by one worker.
pub fn grid_stride(worker: usize, workers: usize, total: usize) -> impl Iterator<Item = usize> {
    (worker..total).step_by(workers.max(1))
}

/// Input index read for every output index below `total`.
pub fn source_indices(map: &IndexMap, env: &IndexEnv, total: usize) -> Option<Vec<usize>> {
    (0..total)
        .map(|gid| {
            let src = map.eval(gid as i64, env.scalars())?;
            usize::try_from(src).ok()
        })
        .collect()
}

/// Run `map` over `input` with `workers` grid-stride threads.
///
/// `None` if an index evaluates out of bounds, an output element is
/// written twice, or an output element is never written.
pub fn execute<T: Copy>(
    map: &IndexMap,
    env: &IndexEnv,
    input: &[T],
    total: usize,
    workers: usize,
) -> Option<Vec<T>> {
    let mut output: Vec<Option<T>> = vec![None; total];
    for worker in 0..workers.max(1) {
        for gid in grid_stride(worker, workers, total) {
            let src = usize::try_from(map.eval(gid as i64, env.scalars())?).ok()?;
            let value = *input.get(src)?;
            if output[gid].replace(value).is_some() {
                return None;
            }
        }
    }
    output.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{OperatorId, Order, TensorDescriptor};
    use crate::kir::lower::metal::{depth2space_index_map, space2depth_index_map};
    use proptest::prelude::*;

    fn nhwc(name: &str, n: u32, h: u32, w: u32, c: u32) -> TensorDescriptor {
        TensorDescriptor::new(name, Order::nhwc(), vec![n, h, w, c]).unwrap()
    }

    /// depth2space from (n, h, w, c*r*r) to (n, h*r, w*r, c).
    fn d2s(n: u32, h: u32, w: u32, c: u32, r: u32) -> BlockRearrange {
        let x = nhwc("x", n, h, w, c * r * r);
        let y = nhwc("y", n, h * r, w * r, c);
        BlockRearrange::new(OperatorId(0), x, y, r).unwrap()
    }

    /// space2depth from (n, h*r, w*r, c) to (n, h, w, c*r*r).
    fn s2d(n: u32, h: u32, w: u32, c: u32, r: u32) -> BlockRearrange {
        let x = nhwc("y", n, h * r, w * r, c);
        let y = nhwc("z", n, h, w, c * r * r);
        BlockRearrange::new(OperatorId(1), x, y, r).unwrap()
    }

    fn iota(len: u64) -> Vec<u32> {
        (0..len as u32).collect()
    }

    #[test]
    fn test_grid_stride_visits() {
        let visited: Vec<usize> = grid_stride(1, 3, 8).collect();
        assert_eq!(visited, vec![1, 4, 7]);
        assert_eq!(grid_stride(5, 8, 4).count(), 0);
    }

    #[test]
    fn test_depth2space_scenario() {
        // N=1, C1=4, H1=2, W1=2, r=2: output is (1, 4, 4, 1).
        let op = d2s(1, 2, 2, 1, 2);
        let env = IndexEnv::block_rearrange(&op).unwrap();
        assert_eq!(env.get("C1"), Some(4));
        assert_eq!(env.get("H2"), Some(4));
        let map = depth2space_index_map();
        assert_eq!(map.eval(0, env.scalars()), Some(0));
        // (h2=1, w2=1, c2=0) is gid 5 and reads channel 3 of pixel (0, 0).
        assert_eq!(map.eval(5, env.scalars()), Some(3));

        let out = execute(&map, &env, &iota(op.x.size()), op.y.size() as usize, 8).unwrap();
        assert_eq!(
            out,
            vec![0, 1, 4, 5, 2, 3, 6, 7, 8, 9, 12, 13, 10, 11, 14, 15]
        );
    }

    #[test]
    fn test_execute_gather_and_out_of_bounds() {
        // Every output reads input 0: a valid gather, not a double write.
        let env = IndexEnv::new();
        let map = IndexMap::new("gid").source(crate::kir::expr::lit(0));
        assert_eq!(execute(&map, &env, &[7u32], 3, 2), Some(vec![7, 7, 7]));
        let map = IndexMap::new("gid").source(crate::kir::expr::lit(9));
        assert_eq!(execute(&map, &env, &[7u32], 3, 2), None);
    }

    proptest! {
        #[test]
        fn test_depth2space_is_bijection(
            n in 1u32..3, h in 1u32..4, w in 1u32..4, c in 1u32..4, r in 1u32..4
        ) {
            let op = d2s(n, h, w, c, r);
            let env = IndexEnv::block_rearrange(&op).unwrap();
            let total = op.y.size() as usize;
            let mut sources = source_indices(&depth2space_index_map(), &env, total).unwrap();
            sources.sort_unstable();
            prop_assert_eq!(sources, (0..total).collect::<Vec<_>>());
        }

        #[test]
        fn test_space2depth_is_bijection(
            n in 1u32..3, h in 1u32..4, w in 1u32..4, c in 1u32..4, r in 1u32..4
        ) {
            let op = s2d(n, h, w, c, r);
            let env = IndexEnv::block_rearrange(&op).unwrap();
            let total = op.y.size() as usize;
            let mut sources = source_indices(&space2depth_index_map(), &env, total).unwrap();
            sources.sort_unstable();
            prop_assert_eq!(sources, (0..total).collect::<Vec<_>>());
        }

        #[test]
        fn test_block_size_one_is_identity(
            n in 1u32..3, h in 1u32..5, w in 1u32..5, c in 1u32..5
        ) {
            let op = d2s(n, h, w, c, 1);
            let env = IndexEnv::block_rearrange(&op).unwrap();
            let total = op.y.size() as usize;
            let sources = source_indices(&depth2space_index_map(), &env, total).unwrap();
            prop_assert_eq!(sources, (0..total).collect::<Vec<_>>());
        }

        #[test]
        fn test_grid_stride_covers_every_output(
            h in 1u32..4, w in 1u32..4, c in 1u32..3, r in 1u32..3, workers in 1usize..40
        ) {
            let op = d2s(1, h, w, c, r);
            let env = IndexEnv::block_rearrange(&op).unwrap();
            let input = iota(op.x.size());
            let out = execute(&depth2space_index_map(), &env, &input, op.y.size() as usize, workers);
            prop_assert!(out.is_some());
        }

        #[test]
        fn test_space2depth_inverts_depth2space(
            n in 1u32..3, h in 1u32..4, w in 1u32..4, c in 1u32..4, r in 1u32..4
        ) {
            let forward = d2s(n, h, w, c, r);
            let inverse = s2d(n, h, w, c, r);
            let input = iota(forward.x.size());

            let env = IndexEnv::block_rearrange(&forward).unwrap();
            let spread = execute(&depth2space_index_map(), &env, &input, forward.y.size() as usize, 8)
                .unwrap();
            let env = IndexEnv::block_rearrange(&inverse).unwrap();
            let back = execute(&space2depth_index_map(), &env, &spread, inverse.y.size() as usize, 8)
                .unwrap();
            prop_assert_eq!(back, input);
        }
    }
}

use crate::kir::expr::{var, IndexMap};

/// Inverse of depth2space: output channel `c2` holds channel `c2 % C1`
/// of the pixel at offset `(k / r, k % r)` inside input block `(h2, w2)`,
/// with `k = c2 / C1`.
pub fn index_map() -> IndexMap {
    IndexMap::new("gid")
        .bind("c2", var("gid") % var("C2"))
        .bind("w2", var("gid") / var("C2") % var("W2"))
        .bind("h2", var("gid") / var("C2") / var("W2") % var("H2"))
        .bind("n", var("gid") / var("C2") / var("W2") / var("H2"))
        .bind("c1", var("c2") % var("C1"))
        .bind("k", var("c2") / var("C1"))
        .bind("w1", var("w2") * var("r") + var("k") % var("r"))
        .bind("h1", var("h2") * var("r") + var("k") / var("r"))
        .source(((var("n") * var("H1") + var("h1")) * var("W1") + var("w1")) * var("C1") + var("c1"))
}

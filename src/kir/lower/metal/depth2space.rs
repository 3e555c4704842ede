use crate::kir::expr::{var, IndexMap};

/// Output NHWC index → input NHWC index. Each output pixel `(h2, w2)`
/// reads channel block `(h2 % r, w2 % r)` of input pixel `(h2 / r, w2 / r)`.
pub fn index_map() -> IndexMap {
    IndexMap::new("gid")
        .bind("c2", var("gid") % var("C2"))
        .bind("w2", var("gid") / var("C2") % var("W2"))
        .bind("h2", var("gid") / var("C2") / var("W2") % var("H2"))
        .bind("n", var("gid") / var("C2") / var("W2") / var("H2"))
        .bind("w1", var("w2") / var("r"))
        .bind("h1", var("h2") / var("r"))
        .bind(
            "c1",
            var("c2")
                + var("w2") % var("r") * var("C2")
                + var("h2") % var("r") * var("C2") * var("r"),
        )
        .source(((var("n") * var("H1") + var("h1")) * var("W1") + var("w1")) * var("C1") + var("c1"))
}

//! Integer index expressions.
//!
//! The index remapping of a kernel is written once as an `IndexMap` and
//! used twice: rendered into the MSL loop body, and evaluated on the
//! host by `kir::reference` to check the mapping. Values are assumed
//! non-negative, where C `/` and `%` agree with Rust's.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Rem};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinOp::Add => 1,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Var(String),
    Const(i64),
    Bin(BinOp, Box<Expr>, Box<Expr>),
}

pub fn var(name: &str) -> Expr {
    Expr::Var(name.to_string())
}

pub fn lit(value: i64) -> Expr {
    Expr::Const(value)
}

impl Expr {
    fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Bin(op, Box::new(lhs), Box::new(rhs))
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Bin(op, _, _) => op.precedence(),
            _ => u8::MAX,
        }
    }

    /// C source with the minimum parentheses for left-associative
    /// evaluation.
    pub fn render(&self) -> String {
        match self {
            Expr::Var(name) => name.clone(),
            Expr::Const(v) => v.to_string(),
            Expr::Bin(op, lhs, rhs) => {
                let p = op.precedence();
                let l = if lhs.precedence() < p {
                    format!("({})", lhs.render())
                } else {
                    lhs.render()
                };
                let r = if rhs.precedence() <= p {
                    format!("({})", rhs.render())
                } else {
                    rhs.render()
                };
                format!("{} {} {}", l, op.symbol(), r)
            }
        }
    }

    /// Evaluate with `env` bindings. `None` on an unbound variable or a
    /// zero divisor.
    pub fn eval(&self, env: &HashMap<String, i64>) -> Option<i64> {
        match self {
            Expr::Var(name) => env.get(name).copied(),
            Expr::Const(v) => Some(*v),
            Expr::Bin(op, lhs, rhs) => {
                let l = lhs.eval(env)?;
                let r = rhs.eval(env)?;
                match op {
                    BinOp::Add => l.checked_add(r),
                    BinOp::Mul => l.checked_mul(r),
                    BinOp::Div => l.checked_div(r),
                    BinOp::Rem => l.checked_rem(r),
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

macro_rules! impl_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::bin($op, self, rhs)
            }
        }
    };
}

impl_binop!(Add, add, BinOp::Add);
impl_binop!(Mul, mul, BinOp::Mul);
impl_binop!(Div, div, BinOp::Div);
impl_binop!(Rem, rem, BinOp::Rem);

/// Output-index → input-index mapping for one grid-stride loop.
///
/// `bindings` are evaluated in order, each may use the loop variable,
/// kernel scalars, and earlier bindings. `source` is the flat input
/// index read for the current output index.
#[derive(Clone, Debug)]
pub struct IndexMap {
    pub index_var: String,
    pub bindings: Vec<(String, Expr)>,
    pub source: Expr,
}

impl IndexMap {
    pub fn new(index_var: &str) -> Self {
        Self {
            index_var: index_var.to_string(),
            bindings: Vec::new(),
            source: Expr::Var(index_var.to_string()),
        }
    }

    pub fn bind(mut self, name: &str, expr: Expr) -> Self {
        self.bindings.push((name.to_string(), expr));
        self
    }

    pub fn source(mut self, expr: Expr) -> Self {
        self.source = expr;
        self
    }

    /// Input index for output index `index`, with kernel scalars in `scalars`.
    pub fn eval(&self, index: i64, scalars: &HashMap<String, i64>) -> Option<i64> {
        let mut env = scalars.clone();
        env.insert(self.index_var.clone(), index);
        for (name, expr) in &self.bindings {
            let value = expr.eval(&env)?;
            env.insert(name.clone(), value);
        }
        self.source.eval(&env)
    }
}

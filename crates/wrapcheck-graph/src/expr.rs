//! Default-argument expression trees.
//!
//! The external parser hands default arguments as small expression trees,
//! not as source text. The default-argument evaluator folds these into
//! binding-safe values or marks them non-foldable.

use crate::types::TypeId;
use serde::Serialize;
use wrapcheck_common::interner::Atom;

/// A compile-time constant value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    BitOr,
    BitAnd,
    Add,
    Sub,
}

/// A default-argument expression as delivered by the parser.
#[derive(Clone, Debug, PartialEq)]
pub enum DefaultExpr {
    Lit(ConstValue),
    /// A reference to another declaration: an enumerator, a static member,
    /// or a constant variable.
    Name { path: Vec<Atom>, absolute: bool },
    /// Braced initializer: `{ EnumValue }`.
    Aggregate(Vec<DefaultExpr>),
    /// A function call. Calls are assumed side-effecting.
    Call { path: Vec<Atom>, args: Vec<DefaultExpr> },
    Unary { op: UnaryOp, operand: Box<DefaultExpr> },
    Binary {
        op: BinaryOp,
        lhs: Box<DefaultExpr>,
        rhs: Box<DefaultExpr>,
    },
    /// Explicit conversion, e.g. `(IntArg){ 100 }`. Folds through to the
    /// operand; the target type is kept for the record.
    Cast { ty: TypeId, operand: Box<DefaultExpr> },
}

//! Default-argument constant folding.
//!
//! Folds literal constants, enum-value and static-member references,
//! aggregate initializers, short-circuit boolean expressions, and
//! integer/flag arithmetic into binding-safe values. A call is assumed to
//! have observable side effects: the result is flagged not-foldable, but a
//! best-effort value is still produced when short-circuit evaluation
//! determines one, so the emitter can document the default without
//! substituting it.

use crate::analyzer::Analyzer;
use serde::Serialize;
use wrapcheck_common::limits::MAX_FOLD_DEPTH;
use wrapcheck_graph::{BinaryOp, ConstValue, DeclData, DeclId, DefaultExpr, UnaryOp};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum FoldedValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
    /// A resolved enumerator: rendered name plus its numeric value.
    EnumValue { name: String, value: i64 },
    Aggregate(Vec<FoldedValue>),
    /// Nothing could be determined statically.
    Opaque,
}

/// The folded form of one default argument. `foldable` is false when
/// substituting `value` does not reproduce the real default's behavior.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DefaultArgument {
    pub value: FoldedValue,
    pub foldable: bool,
}

impl DefaultArgument {
    fn folded(value: FoldedValue) -> Self {
        Self { value, foldable: true }
    }

    fn unsafe_value(value: FoldedValue) -> Self {
        Self { value, foldable: false }
    }

    fn opaque() -> Self {
        Self { value: FoldedValue::Opaque, foldable: false }
    }

    fn as_bool(&self) -> Option<bool> {
        match self.value {
            FoldedValue::Bool(b) => Some(b),
            FoldedValue::Int(i) => Some(i != 0),
            _ => None,
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self.value {
            FoldedValue::Int(i) => Some(i),
            FoldedValue::Bool(b) => Some(i64::from(b)),
            FoldedValue::EnumValue { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl Analyzer<'_> {
    /// Fold a default-argument expression in a lookup scope. Pure over the
    /// immutable graph, so re-evaluation always yields the same result.
    pub fn evaluate_default(&self, scope: Option<DeclId>, expr: &DefaultExpr) -> DefaultArgument {
        self.fold(scope, expr, 0)
    }

    fn fold(&self, scope: Option<DeclId>, expr: &DefaultExpr, depth: usize) -> DefaultArgument {
        if depth > MAX_FOLD_DEPTH {
            return DefaultArgument::opaque();
        }
        match expr {
            DefaultExpr::Lit(value) => DefaultArgument::folded(match value {
                ConstValue::Bool(b) => FoldedValue::Bool(*b),
                ConstValue::Int(i) => FoldedValue::Int(*i),
                ConstValue::Float(f) => FoldedValue::Float(*f),
                ConstValue::Str(s) => FoldedValue::Str(s.clone()),
                ConstValue::Null => FoldedValue::Null,
            }),
            DefaultExpr::Name { path, absolute } => self.fold_name(scope, path, *absolute, depth),
            DefaultExpr::Aggregate(items) => {
                let mut folded = Vec::with_capacity(items.len());
                let mut foldable = true;
                for item in items {
                    let sub = self.fold(scope, item, depth + 1);
                    foldable &= sub.foldable;
                    folded.push(sub.value);
                }
                DefaultArgument { value: FoldedValue::Aggregate(folded), foldable }
            }
            // Any call may have observable side effects.
            DefaultExpr::Call { .. } => DefaultArgument::opaque(),
            DefaultExpr::Unary { op, operand } => {
                let operand = self.fold(scope, operand, depth + 1);
                let value = match op {
                    UnaryOp::Not => operand.as_bool().map(|b| FoldedValue::Bool(!b)),
                    UnaryOp::Neg => match operand.value {
                        FoldedValue::Int(i) => i.checked_neg().map(FoldedValue::Int),
                        FoldedValue::Float(f) => Some(FoldedValue::Float(-f)),
                        _ => None,
                    },
                };
                match value {
                    Some(value) => DefaultArgument { value, foldable: operand.foldable },
                    None => DefaultArgument::opaque(),
                }
            }
            DefaultExpr::Binary { op, lhs, rhs } => self.fold_binary(scope, *op, lhs, rhs, depth),
            // A conversion wrapper folds through to its operand.
            DefaultExpr::Cast { operand, .. } => self.fold(scope, operand, depth + 1),
        }
    }

    fn fold_name(
        &self,
        scope: Option<DeclId>,
        path: &[wrapcheck_common::interner::Atom],
        absolute: bool,
        depth: usize,
    ) -> DefaultArgument {
        let graph = self.binder.graph();
        let Ok(decl_id) = self.binder.resolve_path(scope, path, absolute) else {
            return DefaultArgument::opaque();
        };
        let decl = graph.decl(decl_id);
        match &decl.data {
            // Access is deliberately ignored: the evaluator works at the
            // graph level, and a private static constant still has a value.
            DeclData::Enumerator { value } => DefaultArgument::folded(FoldedValue::EnumValue {
                name: graph.qualified_name(decl_id),
                value: *value,
            }),
            DeclData::Variable(var) => match &var.init {
                Some(init) if var.is_constexpr || var.is_static => {
                    self.fold(decl.parent, init, depth + 1)
                }
                _ => DefaultArgument::opaque(),
            },
            _ => DefaultArgument::opaque(),
        }
    }

    fn fold_binary(
        &self,
        scope: Option<DeclId>,
        op: BinaryOp,
        lhs: &DefaultExpr,
        rhs: &DefaultExpr,
        depth: usize,
    ) -> DefaultArgument {
        let lhs = self.fold(scope, lhs, depth + 1);
        let rhs = self.fold(scope, rhs, depth + 1);
        match op {
            BinaryOp::Or => fold_short_circuit(lhs, rhs, true),
            BinaryOp::And => fold_short_circuit(lhs, rhs, false),
            BinaryOp::BitOr => fold_arith(lhs, rhs, |a, b| Some(a | b)),
            BinaryOp::BitAnd => fold_arith(lhs, rhs, |a, b| Some(a & b)),
            BinaryOp::Add => fold_arith(lhs, rhs, i64::checked_add),
            BinaryOp::Sub => fold_arith(lhs, rhs, i64::checked_sub),
        }
    }
}

/// Short-circuit folding around unknown operands. For `||`, a foldable
/// `true` on the left decides the result without evaluating the right; an
/// unknown left with a decisive right still yields a best-effort value,
/// flagged unsafe because the left side's effects would still run.
fn fold_short_circuit(lhs: DefaultArgument, rhs: DefaultArgument, stop_on: bool) -> DefaultArgument {
    match (lhs.as_bool(), lhs.foldable) {
        (Some(decided), true) if decided == stop_on => {
            DefaultArgument::folded(FoldedValue::Bool(decided))
        }
        (Some(_), true) => match rhs.as_bool() {
            Some(right) => DefaultArgument {
                value: FoldedValue::Bool(right),
                foldable: rhs.foldable,
            },
            None => DefaultArgument::opaque(),
        },
        _ => match rhs.as_bool() {
            // `F() || true` is true whatever F returns, but substituting
            // the constant would skip F's side effects.
            Some(right) if right == stop_on => {
                DefaultArgument::unsafe_value(FoldedValue::Bool(right))
            }
            _ => DefaultArgument::opaque(),
        },
    }
}

/// Integer folding. An operation that overflows `i64` has no trustworthy
/// static value and comes back opaque.
fn fold_arith(
    lhs: DefaultArgument,
    rhs: DefaultArgument,
    apply: impl Fn(i64, i64) -> Option<i64>,
) -> DefaultArgument {
    match (lhs.as_int(), rhs.as_int()) {
        (Some(a), Some(b)) => match apply(a, b) {
            Some(value) => DefaultArgument {
                value: FoldedValue::Int(value),
                foldable: lhs.foldable && rhs.foldable,
            },
            None => DefaultArgument::opaque(),
        },
        _ => DefaultArgument::opaque(),
    }
}

#[cfg(test)]
#[path = "../tests/defaults_tests.rs"]
mod tests;

//! Declaration classification and wrappability analysis.
//!
//! This crate consumes the immutable declaration graph through the binder
//! and derives, per declaration, everything the external binding emitter
//! needs:
//! - Special-member availability and ownership semantics (`classify`)
//! - Flattened base sets and inherited-member maps (`inheritance`)
//! - Best-viable overload selection (`overloads`)
//! - Folded default-argument values (`defaults`)
//! - Template instantiation and argument deduction (`templates`)
//! - The per-declaration output records and the parallel driver (`records`,
//!   `analyzer`)
//!
//! Every derived fact is computed lazily and memoized in concurrent
//! append-only caches; analyses of independent declarations run in parallel
//! over the shared graph.

pub mod analyzer;
pub mod classify;
pub mod defaults;
pub mod inheritance;
pub mod overloads;
pub mod records;
pub mod templates;

pub use analyzer::{analyze, Analyzer};
pub use classify::{ClassInfo, DtorState, SpecialMember};
pub use defaults::{DefaultArgument, FoldedValue};
pub use inheritance::{InheritanceMap, InheritedMember, ResolvedBase};
pub use overloads::{Argument, CallSite, OverloadError, ValueCategory};
pub use records::{
    AnalysisOutput, CallableKind, CallableRecord, ClassRecord, EnumRecord, Ownership, ReasonCode,
    Record,
};
pub use templates::TemplateError;

//! Immutable declaration graph for the wrapcheck analyzer.
//!
//! This crate owns the data model the rest of the analysis reads:
//! - Declarations and their kind-specific payloads (`decl`)
//! - Structurally interned types (`types`)
//! - Default-argument expression trees (`expr`)
//! - The graph itself plus its builder (`graph`)
//! - The serde input model for the external parser's JSON (`input`)

pub mod decl;
pub mod expr;
pub mod graph;
pub mod input;
pub mod types;

pub use decl::{
    Access, Attribute, BaseSpecifier, ClassData, ClassFlags, DeclData, DeclId, DeclKind,
    Declaration, EnumData, FnFlags, FunctionData, Param, Specialization, TemplateData,
    TemplateParamDecl, VarData,
};
pub use expr::{BinaryOp, ConstValue, DefaultExpr, UnaryOp};
pub use graph::{DeclGraph, GraphBuilder};
pub use input::{GraphInput, load_graph};
pub use types::{BuiltinKind, Quals, RefKind, TypeId, TypeKey, TypeTable};

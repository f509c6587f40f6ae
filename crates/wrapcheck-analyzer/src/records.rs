//! Output records consumed by the external binding emitter.
//!
//! One record per surfaced declaration, in declaration order, plus the
//! non-fatal diagnostics collected along the way. Records carry rendered
//! names and types rather than raw graph ids so the output is meaningful
//! without the graph that produced it.

use crate::classify::{DtorState, SpecialMember};
use serde::Serialize;
use wrapcheck_common::diagnostics::Diagnostic;

/// Why a declaration cannot be wrapped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ReasonCode {
    /// Protected or private declaration.
    NonPublicAccess,
    /// A forward-only class used by value in a signature.
    IncompleteTypeByValue,
    /// Pass or return by value of a class that is neither copyable nor
    /// movable.
    NonCopyableByValue,
    /// An abstract class used by value.
    AbstractByValue,
    /// Returning by value a class whose destructor is inaccessible.
    InaccessibleDestructor,
    /// Explicitly deleted function.
    DeletedFunction,
    /// A type in the signature failed to resolve.
    UnresolvedType,
    /// A template parameter cannot be deduced from any function parameter.
    UndeducibleTemplateParameter,
}

/// How instances of a class may be owned across the binding boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Ownership {
    /// Public destructor, concrete: the binding may own instances by value.
    Value,
    /// Construction-but-not-destruction, abstract, or incomplete: only
    /// references and pointers may cross the boundary.
    PointerOnly,
}

#[derive(Clone, Debug, Serialize)]
pub struct SpecialMemberRecord {
    pub default_ctor: SpecialMember,
    pub copy_ctor: SpecialMember,
    pub copy_assign: SpecialMember,
    pub move_ctor: SpecialMember,
    pub move_assign: SpecialMember,
    pub dtor: DtorState,
}

#[derive(Clone, Debug, Serialize)]
pub struct BaseRecord {
    pub name: String,
    pub public: bool,
    pub is_virtual: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct InheritedMemberRecord {
    pub name: String,
    /// Qualified name of the declaring base, or `None` when ambiguous.
    pub declared_in: Option<String>,
    pub ambiguous: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClassRecord {
    pub name: String,
    pub location: Option<String>,
    pub incomplete: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub polymorphic: bool,
    pub special_members: Option<SpecialMemberRecord>,
    pub copyable: bool,
    pub movable: bool,
    pub ownership: Ownership,
    pub bases: Vec<BaseRecord>,
    pub inherited_members: Vec<InheritedMemberRecord>,
    pub deprecated: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ParamRecord {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: String,
    pub default: Option<DefaultRecord>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DefaultRecord {
    /// JSON-ready rendering of the folded value; `null` when nothing could
    /// be folded.
    pub value: serde_json::Value,
    /// False when substituting the folded value does not reproduce the real
    /// default's behavior.
    pub foldable: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableKind {
    Function,
    Method,
    Constructor,
    Destructor,
    FunctionTemplate,
}

#[derive(Clone, Debug, Serialize)]
pub struct CallableRecord {
    pub name: String,
    pub kind: CallableKind,
    pub location: Option<String>,
    pub signature: String,
    pub params: Vec<ParamRecord>,
    pub returns: String,
    pub is_const: bool,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_operator: bool,
    /// Qualified name of the overload the callable's own signature selects
    /// from its merged overload set.
    pub selected_overload: Option<String>,
    pub wrappable: bool,
    pub reason: Option<ReasonCode>,
    pub deprecated: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EnumeratorRecord {
    pub name: String,
    pub value: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct EnumRecord {
    pub name: String,
    pub location: Option<String>,
    pub scoped: bool,
    pub underlying: String,
    pub enumerators: Vec<EnumeratorRecord>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Record {
    Class(ClassRecord),
    Callable(CallableRecord),
    Enum(EnumRecord),
}

impl Record {
    pub fn name(&self) -> &str {
        match self {
            Self::Class(r) => &r.name,
            Self::Callable(r) => &r.name,
            Self::Enum(r) => &r.name,
        }
    }
}

/// The full result of one analysis run.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisOutput {
    pub records: Vec<Record>,
    pub diagnostics: Vec<Diagnostic>,
}

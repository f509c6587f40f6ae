//! Declarations and their kind-specific payloads.
//!
//! A `Declaration` is a named entity owned by its enclosing scope.
//! Declarations form a tree under namespace/class scopes; the tree is built
//! once by the graph builder and immutable afterwards.

use crate::expr::DefaultExpr;
use crate::types::TypeId;
use serde::Serialize;
use wrapcheck_common::interner::Atom;
use wrapcheck_common::location::SourceLoc;

/// Index into the graph's declaration table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeclId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Access {
    Public,
    Protected,
    Private,
}

impl Access {
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Public)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DeclKind {
    Namespace,
    Class,
    Function,
    Method,
    Constructor,
    Destructor,
    Enum,
    Enumerator,
    Typedef,
    Using,
    Variable,
    Field,
    ClassTemplate,
    FunctionTemplate,
}

impl DeclKind {
    /// Kinds that open a lookup scope for their children. Templates scope
    /// their pattern declaration.
    pub const fn is_scope(self) -> bool {
        matches!(
            self,
            Self::Namespace | Self::Class | Self::Enum | Self::ClassTemplate | Self::FunctionTemplate
        )
    }

    pub const fn is_callable(self) -> bool {
        matches!(
            self,
            Self::Function | Self::Method | Self::Constructor | Self::Destructor
        )
    }
}

/// Side-channel tag on a declaration. Attributes never influence resolution
/// or classification; only the emitted records and diagnostics consult them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Attribute {
    Deprecated { message: Option<String> },
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct FnFlags: u16 {
        const VIRTUAL = 1 << 0;
        const PURE_VIRTUAL = 1 << 1;
        const STATIC = 1 << 2;
        /// Const-qualified method.
        const CONST = 1 << 3;
        const DELETED = 1 << 4;
        const DEFAULTED = 1 << 5;
        const EXPLICIT = 1 << 6;
        /// Operator overload; the declaration name is the operator symbol.
        const OPERATOR = 1 << 7;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Option<Atom>,
    pub ty: TypeId,
    pub default: Option<DefaultExpr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionData {
    pub params: Vec<Param>,
    pub ret: TypeId,
    pub flags: FnFlags,
}

impl FunctionData {
    pub fn is_virtual(&self) -> bool {
        self.flags.intersects(FnFlags::VIRTUAL | FnFlags::PURE_VIRTUAL)
    }

    pub fn is_pure_virtual(&self) -> bool {
        self.flags.contains(FnFlags::PURE_VIRTUAL)
    }

    pub fn is_deleted(&self) -> bool {
        self.flags.contains(FnFlags::DELETED)
    }

    pub fn is_const(&self) -> bool {
        self.flags.contains(FnFlags::CONST)
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(FnFlags::STATIC)
    }

    /// Number of parameters without a default argument.
    pub fn required_params(&self) -> usize {
        self.params
            .iter()
            .take_while(|p| p.default.is_none())
            .count()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BaseSpecifier {
    pub ty: TypeId,
    pub access: Access,
    pub is_virtual: bool,
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct ClassFlags: u8 {
        /// Declared with `struct` (members default public).
        const STRUCT = 1 << 0;
        const FINAL = 1 << 1;
        /// A definition was observed; false for forward-only declarations.
        const DEFINITION = 1 << 2;
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct ClassData {
    pub bases: Vec<BaseSpecifier>,
    pub flags: ClassFlags,
}

impl ClassData {
    pub fn is_definition(&self) -> bool {
        self.flags.contains(ClassFlags::DEFINITION)
    }

    pub fn is_final(&self) -> bool {
        self.flags.contains(ClassFlags::FINAL)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumData {
    /// `enum class` members are visible only through the enum's scope.
    pub scoped: bool,
    pub underlying: TypeId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarData {
    pub ty: TypeId,
    pub is_static: bool,
    pub is_constexpr: bool,
    pub init: Option<DefaultExpr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TemplateParamDecl {
    pub name: Atom,
    pub is_pack: bool,
}

/// A partial or full specialization attached to a primary template.
#[derive(Clone, Debug, PartialEq)]
pub struct Specialization {
    /// Argument patterns; may contain `Param`/`Pack` placeholders.
    pub args: Vec<TypeId>,
    pub pattern: DeclId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TemplateData {
    pub params: Vec<TemplateParamDecl>,
    /// The templated class or function declaration; its types contain
    /// `Param`/`Pack` placeholders indexed into `params`.
    pub pattern: DeclId,
    pub specializations: Vec<Specialization>,
}

impl TemplateData {
    pub fn non_pack_params(&self) -> usize {
        self.params.iter().filter(|p| !p.is_pack).count()
    }

    pub fn is_variadic(&self) -> bool {
        self.params.iter().any(|p| p.is_pack)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeclData {
    None,
    Class(ClassData),
    Function(FunctionData),
    Enum(EnumData),
    Enumerator { value: i64 },
    Typedef { target: TypeId },
    /// `using Namespace::Name;` importing a name into this scope.
    Using { target: Vec<Atom>, absolute: bool },
    Variable(VarData),
    Field { ty: TypeId },
    Template(TemplateData),
}

#[derive(Clone, Debug)]
pub struct Declaration {
    pub id: DeclId,
    pub name: Atom,
    pub kind: DeclKind,
    pub access: Access,
    pub parent: Option<DeclId>,
    /// Children in declaration order.
    pub children: Vec<DeclId>,
    pub loc: Option<SourceLoc>,
    pub attrs: Vec<Attribute>,
    pub data: DeclData,
}

impl Declaration {
    pub fn function(&self) -> Option<&FunctionData> {
        match &self.data {
            DeclData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn class(&self) -> Option<&ClassData> {
        match &self.data {
            DeclData::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn template(&self) -> Option<&TemplateData> {
        match &self.data {
            DeclData::Template(t) => Some(t),
            _ => None,
        }
    }

    pub fn deprecation(&self) -> Option<&Attribute> {
        self.attrs
            .iter()
            .find(|a| matches!(a, Attribute::Deprecated { .. }))
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecation().is_some()
    }
}

//! Serde model for the external parser's declaration output.
//!
//! The core never parses source text; it consumes a declaration graph the
//! parser serialized as JSON. The loader interns names and types, applies
//! source-language defaults (member access, enumerator values), and merges
//! forward declarations, producing the immutable `DeclGraph`.

use crate::decl::{
    Access, Attribute, BaseSpecifier, ClassData, ClassFlags, DeclData, DeclId, DeclKind, EnumData,
    FnFlags, FunctionData, Param, Specialization, TemplateData, TemplateParamDecl, VarData,
};
use crate::expr::{BinaryOp, ConstValue, DefaultExpr, UnaryOp};
use crate::graph::{DeclGraph, GraphBuilder};
use crate::types::{BuiltinKind, Quals, TypeId, TypeKey};
use serde::Deserialize;
use wrapcheck_common::diagnostics::{Diagnostic, DiagnosticKind};
use wrapcheck_common::interner::Atom;
use wrapcheck_common::location::SourceLoc;

#[derive(Debug, Deserialize)]
pub struct GraphInput {
    pub declarations: Vec<DeclInput>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessInput {
    Public,
    Protected,
    Private,
}

impl From<AccessInput> for Access {
    fn from(value: AccessInput) -> Self {
        match value {
            AccessInput::Public => Access::Public,
            AccessInput::Protected => Access::Protected,
            AccessInput::Private => Access::Private,
        }
    }
}

/// Fields shared by every declaration kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommonInput {
    pub access: Option<AccessInput>,
    pub file: Option<String>,
    pub line: Option<u32>,
    /// Deprecation message; empty string for a bare attribute.
    pub deprecated: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "k", rename_all = "snake_case")]
pub enum TypeInput {
    Builtin {
        name: String,
        #[serde(default, rename = "const")]
        is_const: bool,
    },
    Pointer {
        to: Box<TypeInput>,
        #[serde(default, rename = "const")]
        is_const: bool,
    },
    Ref {
        to: Box<TypeInput>,
        #[serde(default)]
        rvalue: bool,
    },
    Named {
        path: Vec<String>,
        #[serde(default)]
        args: Vec<TypeInput>,
        #[serde(default)]
        absolute: bool,
        #[serde(default, rename = "const")]
        is_const: bool,
    },
    /// Template type parameter reference, valid inside template patterns.
    Param {
        name: String,
        #[serde(default, rename = "const")]
        is_const: bool,
    },
    /// Parameter pack reference, valid inside variadic template patterns.
    Pack { name: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "e", rename_all = "snake_case")]
pub enum ExprInput {
    Bool { value: bool },
    Int { value: i64 },
    Float { value: f64 },
    Str { value: String },
    Null,
    Name {
        path: Vec<String>,
        #[serde(default)]
        absolute: bool,
    },
    Aggregate { items: Vec<ExprInput> },
    Call {
        path: Vec<String>,
        #[serde(default)]
        args: Vec<ExprInput>,
    },
    Unary { op: String, operand: Box<ExprInput> },
    Binary {
        op: String,
        lhs: Box<ExprInput>,
        rhs: Box<ExprInput>,
    },
    Cast {
        #[serde(rename = "type")]
        ty: TypeInput,
        operand: Box<ExprInput>,
    },
}

#[derive(Debug, Deserialize)]
pub struct ParamInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeInput,
    #[serde(default)]
    pub default: Option<ExprInput>,
}

#[derive(Debug, Deserialize)]
pub struct BaseInput {
    #[serde(rename = "type")]
    pub ty: TypeInput,
    #[serde(default)]
    pub access: Option<AccessInput>,
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
}

#[derive(Debug, Deserialize)]
pub struct EnumeratorInput {
    pub name: String,
    #[serde(default)]
    pub value: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TypeParamInput {
    pub name: String,
    #[serde(default)]
    pub pack: bool,
}

#[derive(Debug, Deserialize)]
pub struct SpecializationInput {
    pub args: Vec<TypeInput>,
    pub pattern: Box<DeclInput>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclInput {
    Namespace {
        name: String,
        #[serde(default)]
        members: Vec<DeclInput>,
        #[serde(flatten)]
        common: CommonInput,
    },
    Class {
        name: String,
        #[serde(default)]
        bases: Vec<BaseInput>,
        #[serde(default)]
        members: Vec<DeclInput>,
        #[serde(default, rename = "struct")]
        is_struct: bool,
        #[serde(default, rename = "final")]
        is_final: bool,
        /// False for a forward declaration.
        #[serde(default = "default_true")]
        definition: bool,
        #[serde(flatten)]
        common: CommonInput,
    },
    Function {
        name: String,
        #[serde(default)]
        params: Vec<ParamInput>,
        #[serde(default)]
        returns: Option<TypeInput>,
        #[serde(default)]
        deleted: bool,
        #[serde(flatten)]
        common: CommonInput,
    },
    Method {
        name: String,
        #[serde(default)]
        params: Vec<ParamInput>,
        #[serde(default)]
        returns: Option<TypeInput>,
        #[serde(default, rename = "const")]
        is_const: bool,
        #[serde(default, rename = "virtual")]
        is_virtual: bool,
        #[serde(default)]
        pure: bool,
        #[serde(default, rename = "static")]
        is_static: bool,
        #[serde(default)]
        deleted: bool,
        #[serde(flatten)]
        common: CommonInput,
    },
    Constructor {
        #[serde(default)]
        params: Vec<ParamInput>,
        #[serde(default)]
        explicit: bool,
        #[serde(default)]
        deleted: bool,
        #[serde(default)]
        defaulted: bool,
        #[serde(flatten)]
        common: CommonInput,
    },
    Destructor {
        #[serde(default, rename = "virtual")]
        is_virtual: bool,
        #[serde(default)]
        deleted: bool,
        #[serde(flatten)]
        common: CommonInput,
    },
    Enum {
        name: String,
        #[serde(default)]
        scoped: bool,
        #[serde(default)]
        underlying: Option<TypeInput>,
        #[serde(default)]
        members: Vec<EnumeratorInput>,
        #[serde(flatten)]
        common: CommonInput,
    },
    Typedef {
        name: String,
        #[serde(rename = "type")]
        ty: TypeInput,
        #[serde(flatten)]
        common: CommonInput,
    },
    Using {
        /// Name introduced into the scope; defaults to the last path segment.
        #[serde(default)]
        name: Option<String>,
        target: Vec<String>,
        #[serde(default)]
        absolute: bool,
        #[serde(flatten)]
        common: CommonInput,
    },
    Variable {
        name: String,
        #[serde(rename = "type")]
        ty: TypeInput,
        #[serde(default, rename = "static")]
        is_static: bool,
        #[serde(default)]
        constexpr: bool,
        #[serde(default)]
        init: Option<ExprInput>,
        #[serde(flatten)]
        common: CommonInput,
    },
    Field {
        name: String,
        #[serde(rename = "type")]
        ty: TypeInput,
        #[serde(flatten)]
        common: CommonInput,
    },
    ClassTemplate {
        name: String,
        type_params: Vec<TypeParamInput>,
        pattern: Box<DeclInput>,
        #[serde(default)]
        specializations: Vec<SpecializationInput>,
        #[serde(flatten)]
        common: CommonInput,
    },
    FunctionTemplate {
        name: String,
        type_params: Vec<TypeParamInput>,
        pattern: Box<DeclInput>,
        #[serde(flatten)]
        common: CommonInput,
    },
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Loader
// =============================================================================

/// Parse a JSON declaration graph and build the immutable `DeclGraph`.
pub fn load_graph(json: &str) -> Result<DeclGraph, Diagnostic> {
    let input: GraphInput = serde_json::from_str(json).map_err(|err| {
        Diagnostic::new(
            DiagnosticKind::InconsistentGraph,
            "<input>",
            format!("malformed declaration graph: {err}"),
        )
    })?;
    build_graph(input)
}

/// Build the graph from an already-deserialized input model.
pub fn build_graph(input: GraphInput) -> Result<DeclGraph, Diagnostic> {
    let mut loader = Loader {
        builder: GraphBuilder::new(),
        template_params: Vec::new(),
    };
    for decl in &input.declarations {
        loader.load_decl(None, decl, Access::Public)?;
    }
    loader.builder.finish()
}

struct Loader {
    builder: GraphBuilder,
    /// Stack of template parameter frames; `Param`/`Pack` names resolve to
    /// indices against the innermost frame that declares them.
    template_params: Vec<Vec<(Atom, bool)>>,
}

impl Loader {
    fn atom(&self, text: &str) -> Atom {
        self.builder.names().intern(text)
    }

    fn builtin_kind(name: &str) -> Option<BuiltinKind> {
        Some(match name {
            "void" => BuiltinKind::Void,
            "bool" => BuiltinKind::Bool,
            "char" => BuiltinKind::Char,
            "int" => BuiltinKind::Int,
            "unsigned int" | "uint" => BuiltinKind::UInt,
            "int64" | "int64_t" | "long long" => BuiltinKind::Int64,
            "uint64" | "uint64_t" | "unsigned long long" => BuiltinKind::UInt64,
            "float" => BuiltinKind::Float,
            "double" => BuiltinKind::Double,
            "nullptr_t" => BuiltinKind::NullPtr,
            _ => return None,
        })
    }

    fn quals(is_const: bool) -> Quals {
        if is_const { Quals::CONST } else { Quals::empty() }
    }

    /// Look up a template parameter name across the frame stack. Indices
    /// refer to the innermost frame, matching the pattern they appear in.
    fn template_param_index(&self, name: Atom) -> Option<(u32, bool)> {
        for frame in self.template_params.iter().rev() {
            if let Some(position) = frame.iter().position(|&(n, _)| n == name) {
                return Some((position as u32, frame[position].1));
            }
        }
        None
    }

    fn load_type(&mut self, input: &TypeInput) -> Result<TypeId, Diagnostic> {
        let key = match input {
            TypeInput::Builtin { name, is_const } => match Self::builtin_kind(name) {
                Some(kind) => TypeKey::Builtin { kind, quals: Self::quals(*is_const) },
                None => {
                    return Err(Diagnostic::new(
                        DiagnosticKind::InconsistentGraph,
                        name.clone(),
                        "unknown builtin type name",
                    ));
                }
            },
            TypeInput::Pointer { to, is_const } => {
                let pointee = self.load_type(to)?;
                TypeKey::Pointer { pointee, quals: Self::quals(*is_const) }
            }
            TypeInput::Ref { to, rvalue } => {
                let referent = self.load_type(to)?;
                if *rvalue {
                    TypeKey::RValueRef { referent }
                } else {
                    TypeKey::LValueRef { referent }
                }
            }
            TypeInput::Named { path, args, absolute, is_const } => {
                let atoms: Vec<Atom> = path.iter().map(|p| self.atom(p)).collect();
                // A bare single-segment name may actually be a template
                // parameter of an enclosing template.
                if atoms.len() == 1 && args.is_empty() && !absolute {
                    if let Some((index, is_pack)) = self.template_param_index(atoms[0]) {
                        let key = if is_pack {
                            TypeKey::Pack { index }
                        } else {
                            TypeKey::Param { index, quals: Self::quals(*is_const) }
                        };
                        return Ok(self.builder.types().intern(key));
                    }
                }
                let mut loaded = Vec::with_capacity(args.len());
                for arg in args {
                    loaded.push(self.load_type(arg)?);
                }
                TypeKey::Named {
                    path: atoms,
                    args: loaded,
                    absolute: *absolute,
                    quals: Self::quals(*is_const),
                }
            }
            TypeInput::Param { name, is_const } => {
                let atom = self.atom(name);
                let Some((index, is_pack)) = self.template_param_index(atom) else {
                    return Err(Diagnostic::new(
                        DiagnosticKind::InconsistentGraph,
                        name.clone(),
                        "template parameter referenced outside a template pattern",
                    ));
                };
                if is_pack {
                    TypeKey::Pack { index }
                } else {
                    TypeKey::Param { index, quals: Self::quals(*is_const) }
                }
            }
            TypeInput::Pack { name } => {
                let atom = self.atom(name);
                let Some((index, _)) = self.template_param_index(atom) else {
                    return Err(Diagnostic::new(
                        DiagnosticKind::InconsistentGraph,
                        name.clone(),
                        "parameter pack referenced outside a template pattern",
                    ));
                };
                TypeKey::Pack { index }
            }
        };
        Ok(self.builder.types().intern(key))
    }

    fn load_expr(&mut self, input: &ExprInput) -> Result<DefaultExpr, Diagnostic> {
        Ok(match input {
            ExprInput::Bool { value } => DefaultExpr::Lit(ConstValue::Bool(*value)),
            ExprInput::Int { value } => DefaultExpr::Lit(ConstValue::Int(*value)),
            ExprInput::Float { value } => DefaultExpr::Lit(ConstValue::Float(*value)),
            ExprInput::Str { value } => DefaultExpr::Lit(ConstValue::Str(value.clone())),
            ExprInput::Null => DefaultExpr::Lit(ConstValue::Null),
            ExprInput::Name { path, absolute } => DefaultExpr::Name {
                path: path.iter().map(|p| self.atom(p)).collect(),
                absolute: *absolute,
            },
            ExprInput::Aggregate { items } => {
                let mut loaded = Vec::with_capacity(items.len());
                for item in items {
                    loaded.push(self.load_expr(item)?);
                }
                DefaultExpr::Aggregate(loaded)
            }
            ExprInput::Call { path, args } => {
                let mut loaded = Vec::with_capacity(args.len());
                for arg in args {
                    loaded.push(self.load_expr(arg)?);
                }
                DefaultExpr::Call {
                    path: path.iter().map(|p| self.atom(p)).collect(),
                    args: loaded,
                }
            }
            ExprInput::Unary { op, operand } => {
                let op = match op.as_str() {
                    "!" => UnaryOp::Not,
                    "-" => UnaryOp::Neg,
                    other => {
                        return Err(Diagnostic::new(
                            DiagnosticKind::InconsistentGraph,
                            other,
                            "unknown unary operator in default argument",
                        ));
                    }
                };
                DefaultExpr::Unary { op, operand: Box::new(self.load_expr(operand)?) }
            }
            ExprInput::Binary { op, lhs, rhs } => {
                let op = match op.as_str() {
                    "||" => BinaryOp::Or,
                    "&&" => BinaryOp::And,
                    "|" => BinaryOp::BitOr,
                    "&" => BinaryOp::BitAnd,
                    "+" => BinaryOp::Add,
                    "-" => BinaryOp::Sub,
                    other => {
                        return Err(Diagnostic::new(
                            DiagnosticKind::InconsistentGraph,
                            other,
                            "unknown binary operator in default argument",
                        ));
                    }
                };
                DefaultExpr::Binary {
                    op,
                    lhs: Box::new(self.load_expr(lhs)?),
                    rhs: Box::new(self.load_expr(rhs)?),
                }
            }
            ExprInput::Cast { ty, operand } => DefaultExpr::Cast {
                ty: self.load_type(ty)?,
                operand: Box::new(self.load_expr(operand)?),
            },
        })
    }

    fn load_params(&mut self, inputs: &[ParamInput]) -> Result<Vec<Param>, Diagnostic> {
        let mut params = Vec::with_capacity(inputs.len());
        for input in inputs {
            let default = match &input.default {
                Some(expr) => Some(self.load_expr(expr)?),
                None => None,
            };
            params.push(Param {
                name: input.name.as_deref().map(|n| self.atom(n)),
                ty: self.load_type(&input.ty)?,
                default,
            });
        }
        Ok(params)
    }

    fn apply_common(&mut self, id: DeclId, common: &CommonInput) {
        if let (Some(file), Some(line)) = (&common.file, common.line) {
            let file = self.atom(file);
            self.builder.set_loc(id, SourceLoc::new(file, line));
        }
        if let Some(message) = &common.deprecated {
            let message = if message.is_empty() { None } else { Some(message.clone()) };
            self.builder.add_attr(id, Attribute::Deprecated { message });
        }
    }

    fn access_of(common: &CommonInput, default: Access) -> Access {
        common.access.map(Access::from).unwrap_or(default)
    }

    /// Load one declaration under `parent`. `default_access` is the ambient
    /// member access of the enclosing scope (private inside a `class`,
    /// public inside a `struct` or namespace).
    fn load_decl(
        &mut self,
        parent: Option<DeclId>,
        input: &DeclInput,
        default_access: Access,
    ) -> Result<DeclId, Diagnostic> {
        match input {
            DeclInput::Namespace { name, members, common } => {
                let atom = self.atom(name);
                let id = self.builder.namespace(parent, atom);
                self.apply_common(id, common);
                for member in members {
                    self.load_decl(Some(id), member, Access::Public)?;
                }
                Ok(id)
            }
            DeclInput::Class {
                name,
                bases,
                members,
                is_struct,
                is_final,
                definition,
                common,
            } => {
                let atom = self.atom(name);
                let mut flags = ClassFlags::empty();
                flags.set(ClassFlags::STRUCT, *is_struct);
                flags.set(ClassFlags::FINAL, *is_final);
                flags.set(ClassFlags::DEFINITION, *definition);
                let mut loaded_bases = Vec::with_capacity(bases.len());
                for base in bases {
                    loaded_bases.push(BaseSpecifier {
                        ty: self.load_type(&base.ty)?,
                        access: base
                            .access
                            .map(Access::from)
                            .unwrap_or(if *is_struct { Access::Public } else { Access::Private }),
                        is_virtual: base.is_virtual,
                    });
                }
                let access = Self::access_of(common, default_access);
                let id = self.builder.class(
                    parent,
                    atom,
                    access,
                    ClassData { bases: loaded_bases, flags },
                )?;
                self.apply_common(id, common);
                let member_default = if *is_struct { Access::Public } else { Access::Private };
                for member in members {
                    self.load_decl(Some(id), member, member_default)?;
                }
                Ok(id)
            }
            DeclInput::Function { name, params, returns, deleted, common } => {
                let atom = self.atom(name);
                let params = self.load_params(params)?;
                let ret = match returns {
                    Some(ty) => self.load_type(ty)?,
                    None => TypeId::VOID,
                };
                let mut flags = FnFlags::empty();
                flags.set(FnFlags::DELETED, *deleted);
                flags.set(FnFlags::OPERATOR, name.starts_with("operator"));
                let id = self.builder.add(
                    parent,
                    atom,
                    DeclKind::Function,
                    Self::access_of(common, default_access),
                    DeclData::Function(FunctionData { params, ret, flags }),
                );
                self.apply_common(id, common);
                Ok(id)
            }
            DeclInput::Method {
                name,
                params,
                returns,
                is_const,
                is_virtual,
                pure,
                is_static,
                deleted,
                common,
            } => {
                let atom = self.atom(name);
                let params = self.load_params(params)?;
                let ret = match returns {
                    Some(ty) => self.load_type(ty)?,
                    None => TypeId::VOID,
                };
                let mut flags = FnFlags::empty();
                flags.set(FnFlags::CONST, *is_const);
                flags.set(FnFlags::VIRTUAL, *is_virtual || *pure);
                flags.set(FnFlags::PURE_VIRTUAL, *pure);
                flags.set(FnFlags::STATIC, *is_static);
                flags.set(FnFlags::DELETED, *deleted);
                flags.set(FnFlags::OPERATOR, name.starts_with("operator"));
                let id = self.builder.add(
                    parent,
                    atom,
                    DeclKind::Method,
                    Self::access_of(common, default_access),
                    DeclData::Function(FunctionData { params, ret, flags }),
                );
                self.apply_common(id, common);
                Ok(id)
            }
            DeclInput::Constructor { params, explicit, deleted, defaulted, common } => {
                let Some(class_id) = parent else {
                    return Err(Diagnostic::new(
                        DiagnosticKind::InconsistentGraph,
                        "<constructor>",
                        "constructor outside a class scope",
                    ));
                };
                let atom = self.builder.decl(class_id).name;
                let params = self.load_params(params)?;
                let mut flags = FnFlags::empty();
                flags.set(FnFlags::EXPLICIT, *explicit);
                flags.set(FnFlags::DELETED, *deleted);
                flags.set(FnFlags::DEFAULTED, *defaulted);
                let id = self.builder.add(
                    parent,
                    atom,
                    DeclKind::Constructor,
                    Self::access_of(common, default_access),
                    DeclData::Function(FunctionData { params, ret: TypeId::VOID, flags }),
                );
                self.apply_common(id, common);
                Ok(id)
            }
            DeclInput::Destructor { is_virtual, deleted, common } => {
                let Some(class_id) = parent else {
                    return Err(Diagnostic::new(
                        DiagnosticKind::InconsistentGraph,
                        "<destructor>",
                        "destructor outside a class scope",
                    ));
                };
                let class_name = self.builder.names().resolve(self.builder.decl(class_id).name);
                let atom = self.atom(&format!("~{class_name}"));
                let mut flags = FnFlags::empty();
                flags.set(FnFlags::VIRTUAL, *is_virtual);
                flags.set(FnFlags::DELETED, *deleted);
                let id = self.builder.add(
                    parent,
                    atom,
                    DeclKind::Destructor,
                    Self::access_of(common, default_access),
                    DeclData::Function(FunctionData { params: Vec::new(), ret: TypeId::VOID, flags }),
                );
                self.apply_common(id, common);
                Ok(id)
            }
            DeclInput::Enum { name, scoped, underlying, members, common } => {
                let atom = self.atom(name);
                let underlying = match underlying {
                    Some(ty) => self.load_type(ty)?,
                    None => TypeId::INT,
                };
                let id = self.builder.add(
                    parent,
                    atom,
                    DeclKind::Enum,
                    Self::access_of(common, default_access),
                    DeclData::Enum(EnumData { scoped: *scoped, underlying }),
                );
                self.apply_common(id, common);
                let mut next_value = 0i64;
                for member in members {
                    let value = member.value.unwrap_or(next_value);
                    next_value = value.saturating_add(1);
                    let member_atom = self.atom(&member.name);
                    self.builder.add(
                        Some(id),
                        member_atom,
                        DeclKind::Enumerator,
                        Access::Public,
                        DeclData::Enumerator { value },
                    );
                }
                Ok(id)
            }
            DeclInput::Typedef { name, ty, common } => {
                let atom = self.atom(name);
                let target = self.load_type(ty)?;
                let id = self.builder.add(
                    parent,
                    atom,
                    DeclKind::Typedef,
                    Self::access_of(common, default_access),
                    DeclData::Typedef { target },
                );
                self.apply_common(id, common);
                Ok(id)
            }
            DeclInput::Using { name, target, absolute, common } => {
                let introduced = match name {
                    Some(explicit) => explicit.clone(),
                    None => target.last().cloned().unwrap_or_default(),
                };
                if introduced.is_empty() {
                    return Err(Diagnostic::new(
                        DiagnosticKind::InconsistentGraph,
                        "<using>",
                        "using-declaration with an empty target path",
                    ));
                }
                let atom = self.atom(&introduced);
                let target = target.iter().map(|p| self.atom(p)).collect();
                let id = self.builder.add(
                    parent,
                    atom,
                    DeclKind::Using,
                    Self::access_of(common, default_access),
                    DeclData::Using { target, absolute: *absolute },
                );
                self.apply_common(id, common);
                Ok(id)
            }
            DeclInput::Variable { name, ty, is_static, constexpr, init, common } => {
                let atom = self.atom(name);
                let ty = self.load_type(ty)?;
                let init = match init {
                    Some(expr) => Some(self.load_expr(expr)?),
                    None => None,
                };
                let id = self.builder.add(
                    parent,
                    atom,
                    DeclKind::Variable,
                    Self::access_of(common, default_access),
                    DeclData::Variable(VarData {
                        ty,
                        is_static: *is_static,
                        is_constexpr: *constexpr,
                        init,
                    }),
                );
                self.apply_common(id, common);
                Ok(id)
            }
            DeclInput::Field { name, ty, common } => {
                let atom = self.atom(name);
                let ty = self.load_type(ty)?;
                let id = self.builder.add(
                    parent,
                    atom,
                    DeclKind::Field,
                    Self::access_of(common, default_access),
                    DeclData::Field { ty },
                );
                self.apply_common(id, common);
                Ok(id)
            }
            DeclInput::ClassTemplate { name, type_params, pattern, specializations, common } => {
                self.load_template(
                    parent,
                    name,
                    type_params,
                    pattern,
                    specializations,
                    common,
                    DeclKind::ClassTemplate,
                    default_access,
                )
            }
            DeclInput::FunctionTemplate { name, type_params, pattern, common } => self
                .load_template(
                    parent,
                    name,
                    type_params,
                    pattern,
                    &[],
                    common,
                    DeclKind::FunctionTemplate,
                    default_access,
                ),
        }
    }

    fn load_template(
        &mut self,
        parent: Option<DeclId>,
        name: &str,
        type_params: &[TypeParamInput],
        pattern: &DeclInput,
        specializations: &[SpecializationInput],
        common: &CommonInput,
        kind: DeclKind,
        default_access: Access,
    ) -> Result<DeclId, Diagnostic> {
        let atom = self.atom(name);
        let params: Vec<TemplateParamDecl> = type_params
            .iter()
            .map(|p| TemplateParamDecl { name: self.atom(&p.name), is_pack: p.pack })
            .collect();
        // Placeholder data; filled in once the pattern is loaded.
        let id = self.builder.add(
            parent,
            atom,
            kind,
            Self::access_of(common, default_access),
            DeclData::None,
        );
        self.apply_common(id, common);

        let frame: Vec<(Atom, bool)> = params.iter().map(|p| (p.name, p.is_pack)).collect();
        self.template_params.push(frame);
        let pattern_id = self.load_decl(Some(id), pattern, default_access)?;
        let mut loaded_specs = Vec::with_capacity(specializations.len());
        for spec in specializations {
            let mut args = Vec::with_capacity(spec.args.len());
            for arg in &spec.args {
                args.push(self.load_type(arg)?);
            }
            let spec_pattern = self.load_decl(Some(id), &spec.pattern, default_access)?;
            loaded_specs.push(Specialization { args, pattern: spec_pattern });
        }
        self.template_params.pop();

        self.builder.set_data(
            id,
            DeclData::Template(TemplateData {
                params,
                pattern: pattern_id,
                specializations: loaded_specs,
            }),
        );
        Ok(id)
    }
}

#[cfg(test)]
#[path = "../tests/input_tests.rs"]
mod tests;

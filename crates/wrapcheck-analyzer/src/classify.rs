//! Special-member classification.
//!
//! For each class the classifier derives the availability matrix of its
//! special members, abstractness, and polymorphism. Explicit user
//! declarations win; otherwise the implicit rules apply: an implicit
//! default constructor exists only when no user constructor is declared and
//! every base and class-typed member is default-constructible, declaring a
//! move operation suppresses the implicit copy operations, and declaring a
//! copy operation or destructor suppresses the implicit moves.

use crate::analyzer::Analyzer;
use serde::Serialize;
use std::sync::Arc;
use tracing::trace;
use wrapcheck_graph::{Access, DeclId, DeclKind, FunctionData, RefKind, TypeId, TypeKey};

/// Availability of one special member.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SpecialMember {
    /// Suppressed: neither declared nor implicitly generated.
    Missing,
    Implicit,
    /// User-declared and public (explicitly defaulted counts).
    UserProvided,
    Deleted,
    /// User-declared but protected or private.
    Private,
}

impl SpecialMember {
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Implicit | Self::UserProvided)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DtorState {
    Public,
    Protected,
    Private,
    Deleted,
}

impl DtorState {
    /// Whether binding-generated code may destroy instances.
    pub const fn is_accessible(self) -> bool {
        matches!(self, Self::Public)
    }
}

/// Derived classification of one class declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassInfo {
    pub default_ctor: SpecialMember,
    pub copy_ctor: SpecialMember,
    pub copy_assign: SpecialMember,
    pub move_ctor: SpecialMember,
    pub move_assign: SpecialMember,
    pub dtor: DtorState,
    pub is_abstract: bool,
    pub polymorphic: bool,
    pub is_final: bool,
}

impl ClassInfo {
    pub fn copyable(&self) -> bool {
        self.copy_ctor.is_available()
    }

    /// Movable directly or by falling back to a copy.
    pub fn movable(&self) -> bool {
        self.move_ctor.is_available() || self.copy_ctor.is_available()
    }

    pub fn default_constructible(&self) -> bool {
        self.default_ctor.is_available()
    }

    /// Whether the binding may own instances by value: destruction must be
    /// accessible and the class concrete.
    pub fn value_ownable(&self) -> bool {
        self.dtor.is_accessible() && !self.is_abstract
    }

    /// Permissive placeholder used to break classification cycles.
    fn permissive() -> Self {
        Self {
            default_ctor: SpecialMember::Implicit,
            copy_ctor: SpecialMember::Implicit,
            copy_assign: SpecialMember::Implicit,
            move_ctor: SpecialMember::Implicit,
            move_assign: SpecialMember::Implicit,
            dtor: DtorState::Public,
            is_abstract: false,
            polymorphic: false,
            is_final: false,
        }
    }
}

/// What role a user-declared constructor or `operator=` plays.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum MemberRole {
    DefaultCtor,
    CopyCtor,
    MoveCtor,
    CopyAssign,
    MoveAssign,
    OtherCtor,
}

#[derive(Default)]
struct UserDecls {
    default_ctor: Option<SpecialMember>,
    copy_ctor: Option<SpecialMember>,
    move_ctor: Option<SpecialMember>,
    copy_assign: Option<SpecialMember>,
    move_assign: Option<SpecialMember>,
    any_ctor: bool,
    dtor: Option<DtorState>,
}

impl Analyzer<'_> {
    /// Classification of a class declaration, memoized for the run.
    pub fn classify(&self, class: DeclId) -> Arc<ClassInfo> {
        if let Some(cached) = self.class_cache.get(&class) {
            return cached.clone();
        }
        let mut visiting = Vec::new();
        let info = self.classify_guarded(class, &mut visiting);
        trace!(class = class.0, "Analyzer::classify");
        self.class_cache
            .entry(class)
            .or_insert(info)
            .clone()
    }

    fn classify_guarded(&self, class: DeclId, visiting: &mut Vec<DeclId>) -> Arc<ClassInfo> {
        if let Some(cached) = self.class_cache.get(&class) {
            return cached.clone();
        }
        if visiting.contains(&class) {
            return Arc::new(ClassInfo::permissive());
        }
        visiting.push(class);
        let info = Arc::new(self.compute_class_info(class, visiting));
        visiting.pop();
        self.class_cache.entry(class).or_insert(info).clone()
    }

    fn compute_class_info(&self, class: DeclId, visiting: &mut Vec<DeclId>) -> ClassInfo {
        let Some(decl) = self.decl_of(class) else {
            return ClassInfo::permissive();
        };
        let Some(class_data) = decl.class() else {
            return ClassInfo::permissive();
        };

        let mut user = UserDecls::default();
        let mut own_virtual = false;
        for &member_id in &decl.children {
            let Some(member) = self.decl_of(member_id) else { continue };
            let Some(func) = member.function() else { continue };
            if func.is_virtual() {
                own_virtual = true;
            }
            let role = match member.kind {
                DeclKind::Constructor => self.ctor_role(class, func),
                DeclKind::Destructor => {
                    user.dtor = Some(combine_dtor(user.dtor, dtor_state(member.access, func)));
                    continue;
                }
                DeclKind::Method if self.is_assign_operator(member.name) => {
                    match self.assign_role(class, func) {
                        Some(role) => role,
                        None => continue,
                    }
                }
                _ => continue,
            };
            let state = member_state(member.access, func);
            match role {
                MemberRole::DefaultCtor => {
                    user.any_ctor = true;
                    user.default_ctor = Some(combine(user.default_ctor, state));
                }
                MemberRole::CopyCtor => {
                    user.any_ctor = true;
                    user.copy_ctor = Some(combine(user.copy_ctor, state));
                }
                MemberRole::MoveCtor => {
                    user.any_ctor = true;
                    user.move_ctor = Some(combine(user.move_ctor, state));
                }
                MemberRole::CopyAssign => {
                    user.copy_assign = Some(combine(user.copy_assign, state));
                }
                MemberRole::MoveAssign => {
                    user.move_assign = Some(combine(user.move_assign, state));
                }
                MemberRole::OtherCtor => user.any_ctor = true,
            }
        }

        // Classifications of every base and class-typed member, for the
        // implicit rules.
        let mut parts: Vec<Arc<ClassInfo>> = Vec::new();
        let mut base_polymorphic = false;
        for base in &class_data.bases {
            if let Some(base_decl) = self.base_class_decl(class, base.ty) {
                let info = self.classify_guarded(base_decl, visiting);
                base_polymorphic |= info.polymorphic;
                parts.push(info);
            }
        }
        for &member_id in &decl.children {
            let Some(member) = self.decl_of(member_id) else { continue };
            if member.kind != DeclKind::Field {
                continue;
            }
            let wrapcheck_graph::DeclData::Field { ty } = &member.data else { continue };
            if let Some(field_class) = self.value_class_decl(class, *ty) {
                parts.push(self.classify_guarded(field_class, visiting));
            }
        }

        let parts_default = parts.iter().all(|p| p.default_constructible());
        let parts_copyable = parts.iter().all(|p| p.copyable());
        let parts_movable = parts.iter().all(|p| p.movable());
        let parts_destructible = parts.iter().all(|p| p.dtor.is_accessible());

        let declared_move = user.move_ctor.is_some() || user.move_assign.is_some();
        let declared_copy = user.copy_ctor.is_some() || user.copy_assign.is_some();
        let declared_dtor = user.dtor.is_some();

        let default_ctor = user.default_ctor.unwrap_or({
            if user.any_ctor {
                SpecialMember::Missing
            } else if parts_default {
                SpecialMember::Implicit
            } else {
                SpecialMember::Deleted
            }
        });
        let copy_ctor = user.copy_ctor.unwrap_or({
            if declared_move {
                SpecialMember::Missing
            } else if parts_copyable {
                SpecialMember::Implicit
            } else {
                SpecialMember::Deleted
            }
        });
        let copy_assign = user.copy_assign.unwrap_or({
            if declared_move {
                SpecialMember::Missing
            } else if parts_copyable {
                SpecialMember::Implicit
            } else {
                SpecialMember::Deleted
            }
        });
        let move_ctor = user.move_ctor.unwrap_or({
            if declared_copy || declared_dtor || user.move_assign.is_some() {
                SpecialMember::Missing
            } else if parts_movable {
                SpecialMember::Implicit
            } else {
                SpecialMember::Missing
            }
        });
        let move_assign = user.move_assign.unwrap_or({
            if declared_copy || declared_dtor || user.move_ctor.is_some() {
                SpecialMember::Missing
            } else if parts_movable {
                SpecialMember::Implicit
            } else {
                SpecialMember::Missing
            }
        });
        let dtor = user.dtor.unwrap_or(if parts_destructible {
            DtorState::Public
        } else {
            DtorState::Deleted
        });

        let is_abstract = !self.pure_virtuals(class, 0).is_empty();

        ClassInfo {
            default_ctor,
            copy_ctor,
            copy_assign,
            move_ctor,
            move_assign,
            dtor,
            is_abstract,
            polymorphic: own_virtual || base_polymorphic,
            is_final: class_data.is_final(),
        }
    }

    /// Pure virtual (name, arity) pairs still unimplemented at `class`:
    /// inherited entries minus this class's overrides, plus its own.
    pub(crate) fn pure_virtuals(&self, class: DeclId, depth: usize) -> Vec<(u32, usize)> {
        if depth > wrapcheck_common::limits::MAX_INHERITANCE_DEPTH {
            return Vec::new();
        }
        let Some(decl) = self.decl_of(class) else { return Vec::new() };
        let Some(class_data) = decl.class() else { return Vec::new() };

        let mut pending: Vec<(u32, usize)> = Vec::new();
        for base in &class_data.bases {
            if let Some(base_decl) = self.base_class_decl(class, base.ty) {
                for entry in self.pure_virtuals(base_decl, depth + 1) {
                    if !pending.contains(&entry) {
                        pending.push(entry);
                    }
                }
            }
        }
        for &member_id in &decl.children {
            let Some(member) = self.decl_of(member_id) else { continue };
            let Some(func) = member.function() else { continue };
            if member.kind != DeclKind::Method {
                continue;
            }
            let entry = (member.name.0, func.params.len());
            if func.is_pure_virtual() {
                if !pending.contains(&entry) {
                    pending.push(entry);
                }
            } else {
                // An override, implicit virtual or not, satisfies the base's
                // pure entry.
                pending.retain(|&e| e != entry);
            }
        }
        pending
    }

    /// The class declaration behind a base specifier type. A base naming a
    /// template instantiation resolves to its synthesized declaration.
    pub(crate) fn base_class_decl(&self, class: DeclId, ty: TypeId) -> Option<DeclId> {
        let canonical = if self.is_graph_id(class) {
            let scope = self.binder.graph().decl(class).parent;
            self.binder
                .canonical_type(Some(class), ty)
                .ok()
                .or_else(|| self.binder.canonical_type(scope, ty).ok())?
        } else {
            self.canonical_member_type(class, ty)?
        };
        match self.binder.graph().types.lookup(canonical) {
            TypeKey::Class { decl, .. } => Some(decl),
            TypeKey::Instance { template, args, .. } => {
                self.instantiate(template, &args).ok()
            }
            _ => None,
        }
    }

    /// Canonical form of a type written inside a class body. Synthesized
    /// classes resolve in their template's enclosing graph scope.
    fn canonical_member_type(&self, class: DeclId, ty: TypeId) -> Option<TypeId> {
        if self.is_graph_id(class) {
            self.binder.canonical_type(Some(class), ty).ok()
        } else {
            let scope = self.nearest_graph_scope(self.instantiated(class)?.parent);
            self.binder.canonical_type(scope, ty).ok()
        }
    }

    /// A field type that embeds a class by value (not through a pointer or
    /// reference).
    fn value_class_decl(&self, class: DeclId, ty: TypeId) -> Option<DeclId> {
        let canonical = self.canonical_member_type(class, ty)?;
        match self.binder.graph().types.lookup(canonical) {
            TypeKey::Class { decl, .. } => Some(decl),
            TypeKey::Instance { template, args, .. } => {
                self.instantiate(template, &args).ok()
            }
            _ => None,
        }
    }

    fn ctor_role(&self, class: DeclId, func: &FunctionData) -> MemberRole {
        if func.required_params() == 0 && func.params.is_empty() {
            return MemberRole::DefaultCtor;
        }
        if func.required_params() <= 1 {
            if let Some(first) = func.params.first() {
                match self.own_class_ref(class, first.ty) {
                    Some(RefKind::LValue) => return MemberRole::CopyCtor,
                    Some(RefKind::RValue) => return MemberRole::MoveCtor,
                    None => {}
                }
            }
        }
        if func.required_params() == 0 {
            return MemberRole::DefaultCtor;
        }
        MemberRole::OtherCtor
    }

    fn assign_role(&self, class: DeclId, func: &FunctionData) -> Option<MemberRole> {
        let first = func.params.first()?;
        match self.own_class_ref(class, first.ty)? {
            RefKind::LValue => Some(MemberRole::CopyAssign),
            RefKind::RValue => Some(MemberRole::MoveAssign),
        }
    }

    /// Whether a parameter type is a reference to this very class, and with
    /// which reference kind.
    fn own_class_ref(&self, class: DeclId, ty: TypeId) -> Option<RefKind> {
        let types = &self.binder.graph().types;
        let canonical = self.canonical_member_type(class, ty)?;
        let (inner, ref_kind) = types.strip_ref(canonical);
        let ref_kind = ref_kind?;
        match types.lookup(inner) {
            TypeKey::Class { decl, .. } if decl == class => Some(ref_kind),
            TypeKey::Instance { template, args, .. }
                if self.instantiate(template, &args).ok() == Some(class) =>
            {
                Some(ref_kind)
            }
            _ => None,
        }
    }

    fn is_assign_operator(&self, name: wrapcheck_common::interner::Atom) -> bool {
        self.binder.graph().names.resolve(name).as_ref() == "operator="
    }
}

fn member_state(access: Access, func: &FunctionData) -> SpecialMember {
    if func.is_deleted() {
        SpecialMember::Deleted
    } else if access.is_public() {
        SpecialMember::UserProvided
    } else {
        SpecialMember::Private
    }
}

fn dtor_state(access: Access, func: &FunctionData) -> DtorState {
    if func.is_deleted() {
        DtorState::Deleted
    } else {
        match access {
            Access::Public => DtorState::Public,
            Access::Protected => DtorState::Protected,
            Access::Private => DtorState::Private,
        }
    }
}

/// Multiple user declarations of one special member: deletion dominates,
/// then restricted access.
fn combine(existing: Option<SpecialMember>, incoming: SpecialMember) -> SpecialMember {
    match existing {
        None => incoming,
        Some(SpecialMember::Deleted) => SpecialMember::Deleted,
        Some(prev) => {
            if incoming == SpecialMember::Deleted || incoming == SpecialMember::Private {
                incoming
            } else {
                prev
            }
        }
    }
}

fn combine_dtor(existing: Option<DtorState>, incoming: DtorState) -> DtorState {
    match existing {
        None => incoming,
        Some(DtorState::Deleted) => DtorState::Deleted,
        Some(_) => incoming,
    }
}

#[cfg(test)]
#[path = "../tests/classify_tests.rs"]
mod tests;

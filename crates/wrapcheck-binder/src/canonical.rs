//! Type canonicalization: written type references to structural types.
//!
//! A `Named` type is whatever the input spelled at a use site. Canonical
//! form replaces it with the `Class`/`Enum`/`Instance` it denotes, chasing
//! typedef chains and accumulating cv-qualifiers along the way. Composite
//! types canonicalize their components recursively.

use crate::{Binder, ResolveError};
use tracing::trace;
use wrapcheck_common::interner::Atom;
use wrapcheck_common::limits::MAX_TYPEDEF_CHAIN;
use wrapcheck_graph::{DeclData, DeclId, DeclKind, Quals, TypeId, TypeKey};

impl Binder<'_> {
    /// Canonical form of a type as written in `scope`. Memoized per
    /// (scope, type) pair; already-canonical types are returned as-is.
    pub fn canonical_type(
        &self,
        scope: Option<DeclId>,
        ty: TypeId,
    ) -> Result<TypeId, ResolveError> {
        if let Some(cached) = self.type_cache.get(&(scope, ty)) {
            return Ok(*cached);
        }
        let canonical = self.canonicalize(scope, ty, 0)?;
        trace!(written = ty.0, canonical = canonical.0, "Binder::canonical_type");
        self.type_cache.insert((scope, ty), canonical);
        Ok(canonical)
    }

    /// The class or enum declaration a canonical type refers to, through
    /// references and qualifiers. Instantiations answer their template.
    pub fn type_decl(&self, scope: Option<DeclId>, ty: TypeId) -> Option<DeclId> {
        let canonical = self.canonical_type(scope, ty).ok()?;
        let (inner, _) = self.graph.types.strip_ref(canonical);
        match self.graph.types.lookup(inner) {
            TypeKey::Class { decl, .. } | TypeKey::Enum { decl, .. } => Some(decl),
            TypeKey::Instance { template, .. } => Some(template),
            _ => None,
        }
    }

    fn canonicalize(
        &self,
        scope: Option<DeclId>,
        ty: TypeId,
        depth: usize,
    ) -> Result<TypeId, ResolveError> {
        let types = &self.graph.types;
        match types.lookup(ty) {
            TypeKey::Error
            | TypeKey::Builtin { .. }
            | TypeKey::Class { .. }
            | TypeKey::Enum { .. }
            | TypeKey::Param { .. }
            | TypeKey::Pack { .. } => Ok(ty),
            TypeKey::Pointer { pointee, quals } => {
                let pointee = self.canonicalize(scope, pointee, depth)?;
                Ok(types.intern(TypeKey::Pointer { pointee, quals }))
            }
            TypeKey::LValueRef { referent } => {
                let referent = self.canonicalize(scope, referent, depth)?;
                Ok(types.intern(TypeKey::LValueRef { referent }))
            }
            TypeKey::RValueRef { referent } => {
                let referent = self.canonicalize(scope, referent, depth)?;
                Ok(types.intern(TypeKey::RValueRef { referent }))
            }
            TypeKey::Instance { template, args, quals } => {
                let args = self.canonicalize_args(scope, args, depth)?;
                Ok(types.intern(TypeKey::Instance { template, args, quals }))
            }
            TypeKey::Named { path, args, absolute, quals } => {
                let decl = self.resolve_type_name(scope, &path, absolute)?;
                let args = self.canonicalize_args(scope, args, depth)?;
                self.canonical_of_decl(decl, &path, args, quals, depth)
            }
        }
    }

    fn canonicalize_args(
        &self,
        scope: Option<DeclId>,
        args: Vec<TypeId>,
        depth: usize,
    ) -> Result<Vec<TypeId>, ResolveError> {
        args.into_iter()
            .map(|arg| self.canonicalize(scope, arg, depth))
            .collect()
    }

    /// Resolve a type name to a single declaration. Callable results mean
    /// the path named a function, which is never a type.
    fn resolve_type_name(
        &self,
        scope: Option<DeclId>,
        path: &[Atom],
        absolute: bool,
    ) -> Result<DeclId, ResolveError> {
        let all = self.resolve_all(scope, path, absolute)?;
        let type_like: Vec<DeclId> = all
            .into_iter()
            .filter(|&id| !self.graph.decl(id).kind.is_callable())
            .collect();
        match type_like.as_slice() {
            [] => Err(ResolveError::NotFound { path: path.to_vec() }),
            [single] => Ok(*single),
            multiple => Err(ResolveError::Ambiguous {
                path: path.to_vec(),
                candidates: multiple.to_vec(),
            }),
        }
    }

    fn canonical_of_decl(
        &self,
        decl_id: DeclId,
        path: &[Atom],
        args: Vec<TypeId>,
        quals: Quals,
        depth: usize,
    ) -> Result<TypeId, ResolveError> {
        let types = &self.graph.types;
        let decl = self.graph.decl(decl_id);
        match decl.kind {
            DeclKind::Class if args.is_empty() => {
                Ok(types.intern(TypeKey::Class { decl: decl_id, quals }))
            }
            DeclKind::Enum if args.is_empty() => {
                Ok(types.intern(TypeKey::Enum { decl: decl_id, quals }))
            }
            DeclKind::ClassTemplate if !args.is_empty() => {
                Ok(types.intern(TypeKey::Instance { template: decl_id, args, quals }))
            }
            DeclKind::Typedef => {
                if depth >= MAX_TYPEDEF_CHAIN {
                    return Err(ResolveError::DepthExceeded { path: path.to_vec() });
                }
                let DeclData::Typedef { target } = &decl.data else {
                    return Err(ResolveError::NotFound { path: path.to_vec() });
                };
                let chased = self.canonicalize(decl.parent, *target, depth + 1)?;
                if quals.is_empty() {
                    Ok(chased)
                } else {
                    // `const Alias` adds const on top of whatever the alias
                    // carries.
                    Ok(types.with_quals(chased, types.quals(chased) | quals))
                }
            }
            // Bare template name, argument-carrying class, and every
            // non-type kind fall through here.
            _ => Err(ResolveError::NotFound { path: path.to_vec() }),
        }
    }
}

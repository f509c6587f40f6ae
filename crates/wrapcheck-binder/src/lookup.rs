//! Name lookup: unqualified walk-up, qualified descent, using-declarations,
//! and unscoped-enum enumerator visibility.

use crate::{Binder, ResolveError};
use smallvec::SmallVec;
use tracing::trace;
use wrapcheck_common::interner::Atom;
use wrapcheck_common::limits::MAX_TYPEDEF_CHAIN;
use wrapcheck_graph::{DeclData, DeclId, DeclKind, TypeKey};

impl Binder<'_> {
    /// Every declaration a possibly-qualified name denotes from a lookup
    /// scope. Multiple results are either an overload set (all callable) or
    /// an ambiguity the caller reports.
    pub fn resolve_all(
        &self,
        scope: Option<DeclId>,
        path: &[Atom],
        absolute: bool,
    ) -> Result<Vec<DeclId>, ResolveError> {
        let cache_scope = if absolute { None } else { scope };
        if let Some(cached) = self.name_cache.get(&(cache_scope, path.to_vec())) {
            return Ok(cached.clone());
        }
        let resolved = self.resolve_all_uncached(cache_scope, path)?;
        trace!(candidates = resolved.len(), "Binder::resolve_all");
        self.name_cache
            .insert((cache_scope, path.to_vec()), resolved.clone());
        Ok(resolved)
    }

    /// Resolve to exactly one declaration. An overload set collapses to its
    /// first member (callers needing the whole set use `resolve_callables`).
    pub fn resolve_path(
        &self,
        scope: Option<DeclId>,
        path: &[Atom],
        absolute: bool,
    ) -> Result<DeclId, ResolveError> {
        let all = self.resolve_all(scope, path, absolute)?;
        match all.as_slice() {
            [] => Err(ResolveError::NotFound { path: path.to_vec() }),
            [single] => Ok(*single),
            multiple => {
                if multiple
                    .iter()
                    .all(|&id| self.graph.decl(id).kind.is_callable())
                {
                    Ok(multiple[0])
                } else {
                    Err(ResolveError::Ambiguous {
                        path: path.to_vec(),
                        candidates: multiple.to_vec(),
                    })
                }
            }
        }
    }

    /// The overload set a callable name denotes in (or above) a scope.
    /// The nearest scope that declares the name hides outer scopes.
    pub fn resolve_callables(&self, scope: Option<DeclId>, name: Atom) -> Vec<DeclId> {
        let mut cursor = scope;
        loop {
            match self.find_in_scope(cursor, name, 0) {
                Ok(found) if !found.is_empty() => {
                    let callables: Vec<DeclId> = found
                        .into_iter()
                        .filter(|&id| self.graph.decl(id).kind.is_callable())
                        .collect();
                    if !callables.is_empty() {
                        return callables;
                    }
                }
                _ => {}
            }
            match cursor {
                Some(id) => cursor = self.graph.decl(id).parent,
                None => return Vec::new(),
            }
        }
    }

    fn resolve_all_uncached(
        &self,
        scope: Option<DeclId>,
        path: &[Atom],
    ) -> Result<Vec<DeclId>, ResolveError> {
        let mut cursor = scope;
        loop {
            let found = self.find_in_scope(cursor, path[0], 0)?;
            if !found.is_empty() {
                // The nearest scope that declares the first segment hides
                // outer scopes, even if the remainder fails to resolve.
                if path.len() == 1 {
                    return Ok(found);
                }
                return self.descend(&found, path, 1);
            }
            match cursor {
                Some(id) => cursor = self.graph.decl(id).parent,
                None => return Err(ResolveError::NotFound { path: path.to_vec() }),
            }
        }
    }

    /// Qualified descent: `found` are the candidates for the segments
    /// consumed so far; continue with direct children only (no walk-up).
    fn descend(
        &self,
        found: &[DeclId],
        path: &[Atom],
        next: usize,
    ) -> Result<Vec<DeclId>, ResolveError> {
        let scopes: SmallVec<[DeclId; 2]> = found
            .iter()
            .filter_map(|&id| self.as_scope(id))
            .collect();
        let scope = match scopes.as_slice() {
            [] => return Err(ResolveError::NotFound { path: path.to_vec() }),
            [single] => *single,
            multiple => {
                return Err(ResolveError::Ambiguous {
                    path: path.to_vec(),
                    candidates: multiple.to_vec(),
                });
            }
        };
        let found = self.find_in_scope(Some(scope), path[next], 0)?;
        if found.is_empty() {
            return Err(ResolveError::NotFound { path: path.to_vec() });
        }
        if next + 1 == path.len() {
            return Ok(found);
        }
        self.descend(&found, path, next + 1)
    }

    /// Candidates for one name in one scope: direct children, imports via
    /// `using`, and enumerators of unscoped member enums.
    fn find_in_scope(
        &self,
        scope: Option<DeclId>,
        name: Atom,
        depth: usize,
    ) -> Result<Vec<DeclId>, ResolveError> {
        if depth > MAX_TYPEDEF_CHAIN {
            return Err(ResolveError::DepthExceeded { path: vec![name] });
        }
        let mut found: Vec<DeclId> = Vec::new();
        for &child_id in self.graph.scope_children(scope) {
            let child = self.graph.decl(child_id);
            if child.name == name {
                match &child.data {
                    DeclData::Using { target, absolute } => {
                        let imported = self.resolve_import(scope, target, *absolute, depth + 1)?;
                        for id in imported {
                            if !found.contains(&id) {
                                found.push(id);
                            }
                        }
                    }
                    _ => {
                        if !found.contains(&child_id) {
                            found.push(child_id);
                        }
                    }
                }
                continue;
            }
            // Unscoped enumerators leak into the enclosing scope.
            if child.kind == DeclKind::Enum
                && matches!(&child.data, DeclData::Enum(e) if !e.scoped)
            {
                for &enumerator in &child.children {
                    if self.graph.decl(enumerator).name == name && !found.contains(&enumerator) {
                        found.push(enumerator);
                    }
                }
            }
        }
        Ok(found)
    }

    /// Chase a using-declaration's target from the scope it was written in.
    fn resolve_import(
        &self,
        scope: Option<DeclId>,
        target: &[Atom],
        absolute: bool,
        depth: usize,
    ) -> Result<Vec<DeclId>, ResolveError> {
        let mut cursor = if absolute { None } else { scope };
        loop {
            let found = self.find_in_scope(cursor, target[0], depth)?;
            if !found.is_empty() {
                if target.len() == 1 {
                    return Ok(found);
                }
                return self.descend(&found, target, 1);
            }
            match cursor {
                Some(id) => cursor = self.graph.decl(id).parent,
                None => return Err(ResolveError::NotFound { path: target.to_vec() }),
            }
        }
    }

    /// The scope a declaration opens for qualified lookup, chasing typedefs
    /// to the class or enum they name.
    fn as_scope(&self, id: DeclId) -> Option<DeclId> {
        let decl = self.graph.decl(id);
        match decl.kind {
            DeclKind::Namespace | DeclKind::Class | DeclKind::Enum => Some(id),
            DeclKind::Typedef => {
                let DeclData::Typedef { target } = &decl.data else { return None };
                let canonical = self.canonical_type(decl.parent, *target).ok()?;
                match self.graph.types.lookup(canonical) {
                    TypeKey::Class { decl, .. } | TypeKey::Enum { decl, .. } => Some(decl),
                    TypeKey::Instance { template, .. } => {
                        self.graph.decl(template).template().map(|t| t.pattern)
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

//! Base-class flattening and inherited-member promotion.
//!
//! The resolver flattens a class's base DAG into a list of base instances,
//! deduplicating virtual bases by identity while keeping non-virtual
//! diamond paths as independent instances, and computes the map from
//! inherited member name to its most-derived declaring base. A name
//! reachable from two unrelated base instances is ambiguous unless the
//! derived class redeclares it.

use crate::analyzer::Analyzer;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::trace;
use wrapcheck_common::diagnostics::{Diagnostic, DiagnosticKind};
use wrapcheck_common::interner::Atom;
use wrapcheck_common::limits::MAX_INHERITANCE_DEPTH;
use wrapcheck_graph::{Access, DeclId, DeclKind};

/// One flattened base instance. Virtual bases appear exactly once no matter
/// how many paths reach them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedBase {
    pub decl: DeclId,
    /// Access of the least permissive edge on the path.
    pub access: Access,
    pub is_virtual: bool,
}

/// Where an inherited name comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InheritedMember {
    Unique {
        member: DeclId,
        /// The base class that declares it.
        declared_in: DeclId,
    },
    /// Declared by two unrelated base instances and not redeclared by the
    /// derived class.
    Ambiguous { declared_in: Vec<DeclId> },
}

#[derive(Clone, Debug, Default)]
pub struct InheritanceMap {
    pub bases: Vec<ResolvedBase>,
    /// Promoted member names in first-encounter order.
    pub members: IndexMap<Atom, InheritedMember>,
}

/// A member candidate during promotion, before ambiguity merging.
#[derive(Clone, Debug)]
struct Candidate {
    member: DeclId,
    declared_in: DeclId,
    /// True when the declaring class is reached through a virtual base
    /// edge, making its subobject shared between paths.
    via_virtual: bool,
}

impl Analyzer<'_> {
    /// The flattened base set and inherited-member map, memoized. The only
    /// failure is a base-class cycle, which is a fatal input inconsistency.
    pub fn inheritance(&self, class: DeclId) -> Result<Arc<InheritanceMap>, Diagnostic> {
        if let Some(cached) = self.inherit_cache.get(&class) {
            return Ok(cached.clone());
        }
        let mut map = InheritanceMap::default();
        let mut merged: IndexMap<Atom, Vec<Candidate>> = IndexMap::new();
        // Redeclaration in the derived class hides every inherited copy.
        let own_names = self.declared_names(class);
        self.collect_bases(class, class, false, Access::Public, &own_names, 0, &mut map, &mut merged)?;

        for (name, candidates) in merged {
            let entry = resolve_candidates(&candidates);
            map.members.insert(name, entry);
        }
        trace!(class = class.0, bases = map.bases.len(), "Analyzer::inheritance");
        let map = Arc::new(map);
        Ok(self
            .inherit_cache
            .entry(class)
            .or_insert(map)
            .clone())
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_bases(
        &self,
        root: DeclId,
        class: DeclId,
        via_virtual: bool,
        path_access: Access,
        hidden: &[Atom],
        depth: usize,
        map: &mut InheritanceMap,
        merged: &mut IndexMap<Atom, Vec<Candidate>>,
    ) -> Result<(), Diagnostic> {
        if depth > MAX_INHERITANCE_DEPTH {
            let graph = self.binder.graph();
            return Err(Diagnostic::new(
                DiagnosticKind::InconsistentGraph,
                graph.qualified_name(root),
                "inheritance depth limit exceeded; the base-class graph is cyclic",
            ));
        }
        let Some(class_decl) = self.decl_of(class) else {
            return Ok(());
        };
        let Some(class_data) = class_decl.class() else {
            return Ok(());
        };
        for base in &class_data.bases {
            let Some(base_decl) = self.base_class_decl(class, base.ty) else {
                continue;
            };
            let base_virtual = via_virtual || base.is_virtual;
            let access = tighten(path_access, base.access);
            if base_virtual
                && map
                    .bases
                    .iter()
                    .any(|b| b.decl == base_decl && b.is_virtual)
            {
                // Second path to a shared virtual base: one instance only.
                continue;
            }
            map.bases.push(ResolvedBase {
                decl: base_decl,
                access,
                is_virtual: base_virtual,
            });
            // Only public paths promote members into the binding surface.
            if access.is_public() {
                self.promote_members(base_decl, base_virtual, hidden, merged);
            }
            // Names this base declares hide identical names further up its
            // own path, but not across sibling paths.
            let mut base_hidden = hidden.to_vec();
            for name in self.declared_names(base_decl) {
                if !base_hidden.contains(&name) {
                    base_hidden.push(name);
                }
            }
            self.collect_bases(
                root,
                base_decl,
                base_virtual,
                access,
                &base_hidden,
                depth + 1,
                map,
                merged,
            )?;
        }
        Ok(())
    }

    fn declared_names(&self, class: DeclId) -> Vec<Atom> {
        let Some(decl) = self.decl_of(class) else {
            return Vec::new();
        };
        decl.children
            .iter()
            .filter_map(|&id| self.decl_of(id).map(|d| d.name))
            .collect()
    }

    fn promote_members(
        &self,
        base: DeclId,
        via_virtual: bool,
        hidden: &[Atom],
        merged: &mut IndexMap<Atom, Vec<Candidate>>,
    ) {
        let Some(base_decl) = self.decl_of(base) else {
            return;
        };
        for &member_id in &base_decl.children {
            let Some(member) = self.decl_of(member_id) else { continue };
            if !member.access.is_public() || hidden.contains(&member.name) {
                continue;
            }
            let promotable = matches!(
                member.kind,
                DeclKind::Method | DeclKind::Field | DeclKind::Enum | DeclKind::Typedef
            );
            if !promotable {
                continue;
            }
            merged.entry(member.name).or_default().push(Candidate {
                member: member_id,
                declared_in: base,
                via_virtual,
            });
        }
    }
}

fn resolve_candidates(candidates: &[Candidate]) -> InheritedMember {
    debug_assert!(!candidates.is_empty());
    if candidates.len() == 1 {
        return InheritedMember::Unique {
            member: candidates[0].member,
            declared_in: candidates[0].declared_in,
        };
    }
    // Multiple occurrences of the same declaration are one shared subobject
    // only when every path reaches it virtually.
    let same_decl = candidates
        .iter()
        .all(|c| c.member == candidates[0].member);
    if same_decl && candidates.iter().all(|c| c.via_virtual) {
        return InheritedMember::Unique {
            member: candidates[0].member,
            declared_in: candidates[0].declared_in,
        };
    }
    let mut declared_in: Vec<DeclId> = Vec::new();
    for candidate in candidates {
        if !declared_in.contains(&candidate.declared_in) {
            declared_in.push(candidate.declared_in);
        }
    }
    InheritedMember::Ambiguous { declared_in }
}

/// The effective access of a path is its least permissive edge.
fn tighten(path: Access, edge: Access) -> Access {
    match (path, edge) {
        (Access::Private, _) | (_, Access::Private) => Access::Private,
        (Access::Protected, _) | (_, Access::Protected) => Access::Protected,
        (Access::Public, Access::Public) => Access::Public,
    }
}

#[cfg(test)]
#[path = "../tests/inheritance_tests.rs"]
mod tests;

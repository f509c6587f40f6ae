//! Symbol table and qualified-name resolution.
//!
//! The binder answers "what declaration does this name mean here" and "what
//! canonical type does this reference mean" over the immutable declaration
//! graph. It resolves `using`-declarations, chases typedefs transitively,
//! and tolerates forward declarations defined in a different logical
//! compilation unit (the graph builder already merged those into one
//! canonical declaration).
//!
//! Resolutions are memoized in append-only concurrent caches shared by
//! every other component; a race recomputes the same answer.

mod canonical;
mod lookup;

use dashmap::DashMap;
use wrapcheck_common::diagnostics::{Diagnostic, DiagnosticKind};
use wrapcheck_common::interner::Atom;
use wrapcheck_graph::{DeclGraph, DeclId, TypeId};

/// A name- or type-resolution failure, local to one use site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    NotFound { path: Vec<Atom> },
    Ambiguous { path: Vec<Atom>, candidates: Vec<DeclId> },
    /// The name resolved to a class that was only ever forward-declared,
    /// in a position that requires the definition.
    Incomplete { decl: DeclId },
    /// Typedef or using chain exceeded the resolution depth limit.
    DepthExceeded { path: Vec<Atom> },
}

impl ResolveError {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::NotFound { .. } => DiagnosticKind::NameNotFound,
            Self::Ambiguous { .. } => DiagnosticKind::AmbiguousName,
            Self::Incomplete { .. } | Self::DepthExceeded { .. } => DiagnosticKind::IncompleteType,
        }
    }

    pub fn to_diagnostic(&self, graph: &DeclGraph, subject: impl Into<String>) -> Diagnostic {
        let message = match self {
            Self::NotFound { path } => {
                format!("name `{}` not found", render_path(graph, path))
            }
            Self::Ambiguous { path, candidates } => format!(
                "name `{}` is ambiguous between {} declarations",
                render_path(graph, path),
                candidates.len()
            ),
            Self::Incomplete { decl } => format!(
                "type `{}` is incomplete: no definition was observed in the input",
                graph.qualified_name(*decl)
            ),
            Self::DepthExceeded { path } => format!(
                "resolution of `{}` exceeded the typedef/using depth limit",
                render_path(graph, path)
            ),
        };
        Diagnostic::new(self.kind(), subject, message)
    }
}

fn render_path(graph: &DeclGraph, path: &[Atom]) -> String {
    path.iter()
        .map(|&atom| graph.names.resolve(atom).to_string())
        .collect::<Vec<_>>()
        .join("::")
}

/// Shared resolution state over one graph.
pub struct Binder<'g> {
    graph: &'g DeclGraph,
    /// Canonical-name cache: (lookup scope, path) -> declarations.
    name_cache: DashMap<(Option<DeclId>, Vec<Atom>), Vec<DeclId>>,
    /// Canonical-type cache: (lookup scope, written type) -> canonical type.
    type_cache: DashMap<(Option<DeclId>, TypeId), TypeId>,
}

impl<'g> Binder<'g> {
    pub fn new(graph: &'g DeclGraph) -> Self {
        Self {
            graph,
            name_cache: DashMap::new(),
            type_cache: DashMap::new(),
        }
    }

    pub fn graph(&self) -> &'g DeclGraph {
        self.graph
    }

    /// Require that a class declaration has an observed definition.
    pub fn require_complete(&self, decl: DeclId) -> Result<DeclId, ResolveError> {
        let declaration = self.graph.decl(decl);
        match declaration.class() {
            Some(class) if !class.is_definition() => Err(ResolveError::Incomplete { decl }),
            _ => Ok(decl),
        }
    }
}

#[cfg(test)]
#[path = "../tests/binder_unit_tests.rs"]
mod tests;

//! The immutable declaration graph and its builder.
//!
//! The graph is built once per analysis run from the external parser's
//! output and never mutated afterwards. Forward declarations and reopened
//! namespaces are merged during construction, so one canonical `DeclId`
//! exists per entity; conflicting definitions are a fatal
//! `InconsistentGraph` error, since local recovery cannot be trusted once
//! graph consistency is violated.

use crate::decl::{
    Access, Attribute, ClassData, ClassFlags, DeclData, DeclId, DeclKind, Declaration,
};
use crate::types::{TypeId, TypeKey, TypeTable};
use tracing::trace;
use wrapcheck_common::diagnostics::{Diagnostic, DiagnosticKind};
use wrapcheck_common::interner::{Atom, Interner};
use wrapcheck_common::location::SourceLoc;

#[derive(Debug)]
pub struct DeclGraph {
    pub names: Interner,
    pub types: TypeTable,
    decls: Vec<Declaration>,
    roots: Vec<DeclId>,
}

impl DeclGraph {
    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DeclId> + '_ {
        (0..self.decls.len() as u32).map(DeclId)
    }

    pub fn roots(&self) -> &[DeclId] {
        &self.roots
    }

    /// Children of a scope; `None` is the global scope.
    pub fn scope_children(&self, scope: Option<DeclId>) -> &[DeclId] {
        match scope {
            Some(id) => &self.decl(id).children,
            None => &self.roots,
        }
    }

    pub fn children_named(&self, scope: Option<DeclId>, name: Atom) -> Vec<DeclId> {
        self.scope_children(scope)
            .iter()
            .copied()
            .filter(|&id| self.decl(id).name == name)
            .collect()
    }

    /// "Namespace::Class::Member" rendering of a declaration's path.
    pub fn qualified_name(&self, id: DeclId) -> String {
        let mut parts = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let decl = self.decl(current);
            parts.push(self.names.resolve(decl.name));
            cursor = decl.parent;
        }
        parts.reverse();
        parts
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join("::")
    }

    pub fn loc_string(&self, id: DeclId) -> Option<String> {
        self.decl(id)
            .loc
            .map(|loc| format!("{}:{}", self.names.resolve(loc.file), loc.line))
    }

    /// Whether a class declaration has an observed definition.
    pub fn is_complete_class(&self, id: DeclId) -> bool {
        self.decl(id)
            .class()
            .is_some_and(ClassData::is_definition)
    }

    /// Human-readable type rendering for diagnostics and records.
    pub fn display_type(&self, id: TypeId) -> String {
        let key = self.types.lookup(id);
        let quals = key.quals();
        let prefix = if quals.contains(crate::types::Quals::CONST) {
            "const "
        } else {
            ""
        };
        match key {
            TypeKey::Error => "<error>".to_string(),
            TypeKey::Builtin { kind, .. } => format!("{prefix}{}", kind.as_str()),
            TypeKey::Pointer { pointee, .. } => format!("{}*", self.display_type(pointee)),
            TypeKey::LValueRef { referent } => format!("{}&", self.display_type(referent)),
            TypeKey::RValueRef { referent } => format!("{}&&", self.display_type(referent)),
            TypeKey::Class { decl, .. } | TypeKey::Enum { decl, .. } => {
                format!("{prefix}{}", self.qualified_name(decl))
            }
            TypeKey::Instance { template, args, .. } => {
                let rendered: Vec<String> = args.iter().map(|&a| self.display_type(a)).collect();
                format!(
                    "{prefix}{}<{}>",
                    self.qualified_name(template),
                    rendered.join(", ")
                )
            }
            TypeKey::Named { path, args, absolute, .. } => {
                let joined = path
                    .iter()
                    .map(|&atom| self.names.resolve(atom).to_string())
                    .collect::<Vec<_>>()
                    .join("::");
                let root = if absolute { "::" } else { "" };
                if args.is_empty() {
                    format!("{prefix}{root}{joined}")
                } else {
                    let rendered: Vec<String> =
                        args.iter().map(|&a| self.display_type(a)).collect();
                    format!("{prefix}{root}{joined}<{}>", rendered.join(", "))
                }
            }
            TypeKey::Param { index, .. } => format!("{prefix}${index}"),
            TypeKey::Pack { index } => format!("${index}..."),
        }
    }
}

/// Builder used by the input loader (and tests) to assemble the graph.
///
/// Reopened namespaces merge into one declaration. A forward class
/// declaration merges with its later definition regardless of which logical
/// compilation unit either appeared in.
pub struct GraphBuilder {
    names: Interner,
    types: TypeTable,
    decls: Vec<Declaration>,
    roots: Vec<DeclId>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            names: Interner::new(),
            types: TypeTable::new(),
            decls: Vec::new(),
            roots: Vec::new(),
        }
    }

    pub fn names(&self) -> &Interner {
        &self.names
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0 as usize]
    }

    fn find_child(&self, parent: Option<DeclId>, name: Atom, kind: DeclKind) -> Option<DeclId> {
        let children = match parent {
            Some(id) => &self.decl(id).children,
            None => &self.roots,
        };
        children
            .iter()
            .copied()
            .find(|&id| self.decl(id).name == name && self.decl(id).kind == kind)
    }

    /// Append a fresh declaration under `parent`.
    pub fn add(
        &mut self,
        parent: Option<DeclId>,
        name: Atom,
        kind: DeclKind,
        access: Access,
        data: DeclData,
    ) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(Declaration {
            id,
            name,
            kind,
            access,
            parent,
            children: Vec::new(),
            loc: None,
            attrs: Vec::new(),
            data,
        });
        match parent {
            Some(parent_id) => self.decls[parent_id.0 as usize].children.push(id),
            None => self.roots.push(id),
        }
        trace!(id = id.0, kind = ?kind, "GraphBuilder::add");
        id
    }

    pub fn set_loc(&mut self, id: DeclId, loc: SourceLoc) {
        self.decls[id.0 as usize].loc = Some(loc);
    }

    /// Replace a declaration's payload. Used by the loader to fill template
    /// data once the pattern has been assembled.
    pub fn set_data(&mut self, id: DeclId, data: DeclData) {
        self.decls[id.0 as usize].data = data;
    }

    pub fn add_attr(&mut self, id: DeclId, attr: Attribute) {
        self.decls[id.0 as usize].attrs.push(attr);
    }

    /// Get or create a namespace; reopening merges.
    pub fn namespace(&mut self, parent: Option<DeclId>, name: Atom) -> DeclId {
        if let Some(existing) = self.find_child(parent, name, DeclKind::Namespace) {
            return existing;
        }
        self.add(parent, name, DeclKind::Namespace, Access::Public, DeclData::None)
    }

    /// Declare or define a class. A forward declaration followed by a
    /// definition upgrades in place; two definitions are fatal.
    pub fn class(
        &mut self,
        parent: Option<DeclId>,
        name: Atom,
        access: Access,
        data: ClassData,
    ) -> Result<DeclId, Diagnostic> {
        if let Some(existing) = self.find_child(parent, name, DeclKind::Class) {
            let existing_data = self
                .decl(existing)
                .class()
                .cloned()
                .unwrap_or_default();
            let incoming_is_def = data.flags.contains(ClassFlags::DEFINITION);
            if !incoming_is_def {
                return Ok(existing);
            }
            if existing_data.is_definition() {
                let qualified = self.qualified_name_of(existing);
                return Err(Diagnostic::new(
                    DiagnosticKind::InconsistentGraph,
                    qualified,
                    "class defined more than once in the aggregated input",
                ));
            }
            self.decls[existing.0 as usize].data = DeclData::Class(data);
            return Ok(existing);
        }
        Ok(self.add(parent, name, DeclKind::Class, access, DeclData::Class(data)))
    }

    fn qualified_name_of(&self, id: DeclId) -> String {
        let mut parts = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let decl = self.decl(current);
            parts.push(self.names.resolve(decl.name).to_string());
            cursor = decl.parent;
        }
        parts.reverse();
        parts.join("::")
    }

    /// Final consistency pass, then freeze the graph.
    pub fn finish(self) -> Result<DeclGraph, Diagnostic> {
        // A declaration claiming a scope it is not a child of would corrupt
        // every downstream walk; treat it as a parser precondition violation.
        for decl in &self.decls {
            if let Some(parent) = decl.parent {
                let parent_decl = &self.decls[parent.0 as usize];
                if !parent_decl.kind.is_scope() {
                    return Err(Diagnostic::new(
                        DiagnosticKind::InconsistentGraph,
                        self.qualified_name_of(decl.id),
                        format!(
                            "declared inside a non-scope declaration of kind {:?}",
                            parent_decl.kind
                        ),
                    ));
                }
            }
        }
        Ok(DeclGraph {
            names: self.names,
            types: self.types,
            decls: self.decls,
            roots: self.roots,
        })
    }
}

#[cfg(test)]
#[path = "../tests/graph_tests.rs"]
mod tests;

//! Template instantiation and argument deduction.
//!
//! Instantiation synthesizes a concrete declaration from a template pattern
//! and an explicit argument list, as if the template had been written out
//! for those arguments. Synthesized declarations live in an append-only
//! store with ids past the end of the graph's table; instantiation is
//! memoized per (template, argument list). Partial specializations are
//! selected by specificity, falling back to the primary pattern. Deduction
//! unifies pattern parameter types against call-site argument types,
//! peeling references, top-level qualifiers, and pointers.

use crate::analyzer::Analyzer;
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::sync::{Arc, RwLock};
use tracing::trace;
use wrapcheck_common::interner::Atom;
use wrapcheck_common::limits::MAX_INSTANTIATION_DEPTH;
use wrapcheck_graph::{
    DeclData, DeclId, Declaration, FunctionData, Param, TemplateData, TypeId, TypeKey,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateError {
    /// The argument list cannot satisfy the parameter list.
    Arity { expected: usize, got: usize },
    /// A parameter has no argument to deduce it from.
    Undeducible { param: Atom },
    /// Two arguments deduce the same parameter to different types.
    Conflict { param: Atom },
    /// Two partial specializations match with equal specificity.
    AmbiguousSpecialization,
    /// Recursive instantiation exceeded the depth limit.
    DepthExceeded,
    /// The declaration is not a template.
    NotATemplate,
}

impl TemplateError {
    pub fn message(&self, names: &wrapcheck_common::interner::Interner) -> String {
        match self {
            Self::Arity { expected, got } => {
                format!("template expects {expected} arguments, got {got}")
            }
            Self::Undeducible { param } => format!(
                "template parameter `{}` cannot be deduced from the arguments",
                names.resolve(*param)
            ),
            Self::Conflict { param } => format!(
                "conflicting deductions for template parameter `{}`",
                names.resolve(*param)
            ),
            Self::AmbiguousSpecialization => {
                "multiple partial specializations match with equal specificity".into()
            }
            Self::DepthExceeded => "recursive template instantiation exceeds the depth limit".into(),
            Self::NotATemplate => "declaration is not a template".into(),
        }
    }
}

/// Append-only store of synthesized declarations. Ids continue past the
/// graph's declaration table.
pub(crate) struct InstanceStore {
    base: u32,
    memo: DashMap<(DeclId, Vec<TypeId>), DeclId>,
    decls: RwLock<Vec<Arc<Declaration>>>,
}

impl InstanceStore {
    pub(crate) fn new(graph_len: usize) -> Self {
        Self {
            base: graph_len as u32,
            memo: DashMap::new(),
            decls: RwLock::new(Vec::new()),
        }
    }

    fn get(&self, id: DeclId) -> Option<Arc<Declaration>> {
        let decls = self.decls.read().expect("instance store lock poisoned");
        decls.get(id.0.checked_sub(self.base)? as usize).cloned()
    }

    fn push(&self, mut decl: Declaration) -> DeclId {
        let mut decls = self.decls.write().expect("instance store lock poisoned");
        let id = DeclId(self.base + decls.len() as u32);
        decl.id = id;
        decls.push(Arc::new(decl));
        id
    }
}

impl Analyzer<'_> {
    /// A synthesized declaration by id, when the id belongs to the
    /// instantiation store rather than the graph.
    pub fn instantiated(&self, id: DeclId) -> Option<Arc<Declaration>> {
        self.instances.get(id)
    }

    /// Instantiate a class or function template for an explicit argument
    /// list. Memoized; a race instantiates twice and keeps the first.
    pub fn instantiate(&self, template: DeclId, args: &[TypeId]) -> Result<DeclId, TemplateError> {
        self.instantiate_depth(template, args, 0)
    }

    fn instantiate_depth(
        &self,
        template: DeclId,
        args: &[TypeId],
        depth: usize,
    ) -> Result<DeclId, TemplateError> {
        if depth > MAX_INSTANTIATION_DEPTH {
            return Err(TemplateError::DepthExceeded);
        }
        let graph = self.binder.graph();
        let Some(data) = graph.decl(template).template() else {
            return Err(TemplateError::NotATemplate);
        };
        check_arity(data, args)?;

        let key = (template, args.to_vec());
        if let Some(existing) = self.instances.memo.get(&key) {
            return Ok(*existing);
        }

        let pattern = self.select_pattern(data, args)?;
        let id = self.synthesize(pattern, template, args, depth)?;
        trace!(template = template.0, instance = id.0, "Analyzer::instantiate");
        match self.instances.memo.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(existing) => Ok(*existing.get()),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(id);
                Ok(id)
            }
        }
    }

    /// Deduce template arguments from call-site argument types. Every
    /// non-pack parameter must be determined, consistently.
    pub fn deduce(&self, template: DeclId, call_args: &[TypeId]) -> Result<Vec<TypeId>, TemplateError> {
        let graph = self.binder.graph();
        let Some(data) = graph.decl(template).template() else {
            return Err(TemplateError::NotATemplate);
        };
        let pattern = graph.decl(data.pattern);
        let Some(func) = pattern.function() else {
            return Err(TemplateError::NotATemplate);
        };

        let mut bindings: FxHashMap<u32, TypeId> = FxHashMap::default();
        for (param, &arg) in func.params.iter().zip(call_args) {
            self.unify(param.ty, arg, data, &mut bindings)?;
        }
        let mut deduced = Vec::with_capacity(data.params.len());
        for (index, param) in data.params.iter().enumerate() {
            if param.is_pack {
                continue;
            }
            match bindings.get(&(index as u32)) {
                Some(&ty) => deduced.push(ty),
                None => return Err(TemplateError::Undeducible { param: param.name }),
            }
        }
        Ok(deduced)
    }

    /// Which template parameters appear anywhere in the function pattern's
    /// parameter types. A parameter outside this set can never be deduced
    /// from a call site.
    pub fn undeducible_params(&self, template: DeclId) -> Vec<Atom> {
        let graph = self.binder.graph();
        let Some(data) = graph.decl(template).template() else {
            return Vec::new();
        };
        let Some(func) = graph.decl(data.pattern).function() else {
            return Vec::new();
        };
        let mut seen = vec![false; data.params.len()];
        for param in &func.params {
            self.mark_params(param.ty, &mut seen);
        }
        data.params
            .iter()
            .enumerate()
            .filter(|&(index, _)| !seen[index])
            .map(|(_, p)| p.name)
            .collect()
    }

    fn mark_params(&self, ty: TypeId, seen: &mut Vec<bool>) {
        let types = &self.binder.graph().types;
        match types.lookup(ty) {
            TypeKey::Param { index, .. } | TypeKey::Pack { index } => {
                if let Some(slot) = seen.get_mut(index as usize) {
                    *slot = true;
                }
            }
            TypeKey::Pointer { pointee, .. } => self.mark_params(pointee, seen),
            TypeKey::LValueRef { referent } | TypeKey::RValueRef { referent } => {
                self.mark_params(referent, seen)
            }
            TypeKey::Instance { args, .. } | TypeKey::Named { args, .. } => {
                for arg in args {
                    self.mark_params(arg, seen);
                }
            }
            _ => {}
        }
    }

    /// Structural unification of a pattern type against a concrete type.
    fn unify(
        &self,
        pattern: TypeId,
        concrete: TypeId,
        data: &TemplateData,
        bindings: &mut FxHashMap<u32, TypeId>,
    ) -> Result<(), TemplateError> {
        let types = &self.binder.graph().types;
        match types.lookup(pattern) {
            TypeKey::Param { index, .. } => {
                let stripped = {
                    // Deduction peels references and top-level qualifiers.
                    let (inner, _) = types.strip_ref(concrete);
                    types.strip_quals(inner)
                };
                match bindings.get(&index) {
                    Some(&bound) if bound != stripped => Err(TemplateError::Conflict {
                        param: data.params[index as usize].name,
                    }),
                    Some(_) => Ok(()),
                    None => {
                        bindings.insert(index, stripped);
                        Ok(())
                    }
                }
            }
            TypeKey::Pack { .. } => Ok(()),
            TypeKey::Pointer { pointee, .. } => match types.lookup(strip(types, concrete)) {
                TypeKey::Pointer { pointee: concrete_pointee, .. } => {
                    self.unify(pointee, concrete_pointee, data, bindings)
                }
                _ => Ok(()),
            },
            TypeKey::LValueRef { referent } | TypeKey::RValueRef { referent } => {
                let (inner, _) = types.strip_ref(concrete);
                self.unify(referent, inner, data, bindings)
            }
            TypeKey::Instance { args: pattern_args, .. } => {
                match types.lookup(strip(types, concrete)) {
                    TypeKey::Instance { args: concrete_args, .. } => {
                        for (p, c) in pattern_args.iter().zip(concrete_args.iter()) {
                            self.unify(*p, *c, data, bindings)?;
                        }
                        Ok(())
                    }
                    _ => Ok(()),
                }
            }
            // Concrete pattern positions constrain nothing for deduction.
            _ => Ok(()),
        }
    }

    /// Pick the most specific matching specialization, falling back to the
    /// primary pattern. Specificity is the count of concrete (non-placeholder)
    /// positions in the specialization's argument patterns; two distinct
    /// matches with equal specificity are ambiguous.
    fn select_pattern(&self, data: &TemplateData, args: &[TypeId]) -> Result<DeclId, TemplateError> {
        let mut best: Option<(usize, DeclId)> = None;
        let mut tied = false;
        for spec in &data.specializations {
            if spec.args.len() != args.len() {
                continue;
            }
            let mut matches = true;
            let mut score = 0usize;
            let mut spec_bindings: FxHashMap<u32, TypeId> = FxHashMap::default();
            for (&pattern, &arg) in spec.args.iter().zip(args) {
                if !self.matches_pattern(pattern, arg, &mut spec_bindings, &mut score) {
                    matches = false;
                    break;
                }
            }
            if !matches {
                continue;
            }
            match best {
                Some((s, _)) if score > s => {
                    best = Some((score, spec.pattern));
                    tied = false;
                }
                Some((s, p)) if score == s && p != spec.pattern => tied = true,
                Some(_) => {}
                None => best = Some((score, spec.pattern)),
            }
        }
        if tied {
            return Err(TemplateError::AmbiguousSpecialization);
        }
        Ok(best.map_or(data.pattern, |(_, pattern)| pattern))
    }

    /// Render a synthesized class the way its use sites spell it, e.g.
    /// `Holder<int>`. Resolved through the instantiation memo.
    pub(crate) fn instance_display(&self, id: DeclId) -> Option<String> {
        self.instances.memo.iter().find(|entry| *entry.value() == id).map(|entry| {
            let (template, args) = entry.key();
            let graph = self.binder.graph();
            let rendered: Vec<String> =
                args.iter().map(|&arg| graph.display_type(arg)).collect();
            format!("{}<{}>", graph.qualified_name(*template), rendered.join(", "))
        })
    }

    fn matches_pattern(
        &self,
        pattern: TypeId,
        arg: TypeId,
        bindings: &mut FxHashMap<u32, TypeId>,
        score: &mut usize,
    ) -> bool {
        let types = &self.binder.graph().types;
        match types.lookup(pattern) {
            TypeKey::Param { index, .. } => match bindings.get(&index) {
                Some(&bound) => bound == arg,
                None => {
                    bindings.insert(index, arg);
                    true
                }
            },
            TypeKey::Pack { .. } => true,
            TypeKey::Pointer { pointee, .. } => {
                *score += 1;
                match types.lookup(arg) {
                    TypeKey::Pointer { pointee: arg_pointee, .. } => {
                        self.matches_pattern(pointee, arg_pointee, bindings, score)
                    }
                    _ => false,
                }
            }
            TypeKey::Instance { template, args: pattern_args, .. } => {
                *score += 1;
                match types.lookup(arg) {
                    TypeKey::Instance { template: arg_template, args: arg_args, .. } => {
                        template == arg_template
                            && pattern_args.len() == arg_args.len()
                            && pattern_args
                                .iter()
                                .zip(arg_args.iter())
                                .all(|(&p, &a)| self.matches_pattern(p, a, bindings, score))
                    }
                    _ => false,
                }
            }
            other => {
                *score += 1;
                other == types.lookup(arg)
            }
        }
    }

    /// Write out the pattern for one argument list, substituting parameter
    /// placeholders throughout.
    fn synthesize(
        &self,
        pattern: DeclId,
        template: DeclId,
        args: &[TypeId],
        depth: usize,
    ) -> Result<DeclId, TemplateError> {
        let graph = self.binder.graph();
        let decl = graph.decl(pattern);
        let mut synthesized = Declaration {
            id: DeclId(0), // assigned by the store
            name: decl.name,
            kind: decl.kind,
            access: decl.access,
            parent: graph.decl(template).parent,
            children: Vec::new(),
            loc: decl.loc,
            attrs: decl.attrs.clone(),
            data: self.substitute_data(&decl.data, args, depth)?,
        };
        // Members are synthesized after the owner so the owner's id exists
        // for them to point at.
        let owner = self.instances.push(synthesized.clone());
        let mut children = Vec::with_capacity(decl.children.len());
        for &child_id in &decl.children {
            let child = graph.decl(child_id);
            let member = Declaration {
                id: DeclId(0),
                name: child.name,
                kind: child.kind,
                access: child.access,
                parent: Some(owner),
                children: Vec::new(),
                loc: child.loc,
                attrs: child.attrs.clone(),
                data: self.substitute_data(&child.data, args, depth)?,
            };
            children.push(self.instances.push(member));
        }
        synthesized.id = owner;
        synthesized.children = children;
        // Replace the stored owner with the completed one.
        {
            let mut decls = self
                .instances
                .decls
                .write()
                .expect("instance store lock poisoned");
            let slot = (owner.0 - self.instances.base) as usize;
            decls[slot] = Arc::new(synthesized);
        }
        Ok(owner)
    }

    fn substitute_data(
        &self,
        data: &DeclData,
        args: &[TypeId],
        depth: usize,
    ) -> Result<DeclData, TemplateError> {
        Ok(match data {
            DeclData::Function(func) => {
                let mut params = Vec::with_capacity(func.params.len());
                for param in &func.params {
                    if let TypeKey::Pack { .. } =
                        self.binder.graph().types.lookup(param.ty)
                    {
                        // A pack parameter expands to one parameter per
                        // remaining argument.
                        let consumed = params.len();
                        for &arg in args.iter().skip(consumed) {
                            params.push(Param { name: None, ty: arg, default: None });
                        }
                        continue;
                    }
                    params.push(Param {
                        name: param.name,
                        ty: self.substitute_type(param.ty, args, depth)?,
                        default: param.default.clone(),
                    });
                }
                DeclData::Function(FunctionData {
                    params,
                    ret: self.substitute_type(func.ret, args, depth)?,
                    flags: func.flags,
                })
            }
            DeclData::Field { ty } => DeclData::Field {
                ty: self.substitute_type(*ty, args, depth)?,
            },
            DeclData::Typedef { target } => DeclData::Typedef {
                target: self.substitute_type(*target, args, depth)?,
            },
            DeclData::Class(class) => {
                let mut substituted = class.clone();
                for base in &mut substituted.bases {
                    base.ty = self.substitute_type(base.ty, args, depth)?;
                }
                DeclData::Class(substituted)
            }
            other => other.clone(),
        })
    }

    /// Replace `Param`/`Pack` placeholders with concrete arguments,
    /// recursing through composite types. Nested instantiations are
    /// materialized eagerly, which is where the depth limit bites.
    pub(crate) fn substitute_type(
        &self,
        ty: TypeId,
        args: &[TypeId],
        depth: usize,
    ) -> Result<TypeId, TemplateError> {
        let types = &self.binder.graph().types;
        Ok(match types.lookup(ty) {
            TypeKey::Param { index, quals } => {
                let Some(&arg) = args.get(index as usize) else {
                    return Err(TemplateError::Arity {
                        expected: index as usize + 1,
                        got: args.len(),
                    });
                };
                if quals.is_empty() {
                    arg
                } else {
                    types.with_quals(arg, types.quals(arg) | quals)
                }
            }
            TypeKey::Pack { .. } => ty,
            TypeKey::Pointer { pointee, quals } => {
                let pointee = self.substitute_type(pointee, args, depth)?;
                types.intern(TypeKey::Pointer { pointee, quals })
            }
            TypeKey::LValueRef { referent } => {
                let referent = self.substitute_type(referent, args, depth)?;
                types.intern(TypeKey::LValueRef { referent })
            }
            TypeKey::RValueRef { referent } => {
                let referent = self.substitute_type(referent, args, depth)?;
                types.intern(TypeKey::RValueRef { referent })
            }
            TypeKey::Instance { template, args: inner, quals } => {
                let mut substituted = Vec::with_capacity(inner.len());
                for arg in inner {
                    substituted.push(self.substitute_type(arg, args, depth)?);
                }
                self.instantiate_depth(template, &substituted, depth + 1)?;
                types.intern(TypeKey::Instance { template, args: substituted, quals })
            }
            TypeKey::Named { path, args: inner, absolute, quals } => {
                let mut substituted = Vec::with_capacity(inner.len());
                for arg in inner {
                    substituted.push(self.substitute_type(arg, args, depth)?);
                }
                types.intern(TypeKey::Named { path, args: substituted, absolute, quals })
            }
            _ => ty,
        })
    }
}

fn check_arity(data: &TemplateData, args: &[TypeId]) -> Result<(), TemplateError> {
    let non_pack = data.non_pack_params();
    if data.is_variadic() {
        if args.len() < non_pack {
            return Err(TemplateError::Arity { expected: non_pack, got: args.len() });
        }
    } else if args.len() != data.params.len() {
        return Err(TemplateError::Arity { expected: data.params.len(), got: args.len() });
    }
    Ok(())
}

fn strip(types: &wrapcheck_graph::TypeTable, ty: TypeId) -> TypeId {
    let (inner, _) = types.strip_ref(ty);
    types.strip_quals(inner)
}

#[cfg(test)]
#[path = "../tests/templates_tests.rs"]
mod tests;

//! Overload resolution over a hypothetical call site.
//!
//! Candidates are ranked per parameter on three tiers: exact match,
//! qualification adjustment (const binding, reference binding,
//! derived-to-base), and user-defined conversion on at most one parameter.
//! A candidate wins only when it is at least as good on every parameter and
//! strictly better on one; otherwise the call is ambiguous. Const and
//! non-const method overloads rank through an implicit object parameter, so
//! a const receiver selects the const overload and never arbitrarily.

use crate::analyzer::Analyzer;
use smallvec::SmallVec;
use wrapcheck_common::interner::Atom;
use wrapcheck_graph::{DeclId, DeclKind, FnFlags, RefKind, TypeId, TypeKey};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueCategory {
    LValue,
    RValue,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Argument {
    pub ty: TypeId,
    pub category: ValueCategory,
}

impl Argument {
    pub fn lvalue(ty: TypeId) -> Self {
        Self { ty, category: ValueCategory::LValue }
    }

    pub fn rvalue(ty: TypeId) -> Self {
        Self { ty, category: ValueCategory::RValue }
    }
}

/// A hypothetical call site: argument types with value categories, plus
/// receiver constness when calling a method.
#[derive(Clone, Debug)]
pub struct CallSite {
    pub args: Vec<Argument>,
    pub receiver_const: Option<bool>,
}

impl CallSite {
    pub fn free(args: Vec<Argument>) -> Self {
        Self { args, receiver_const: None }
    }

    pub fn method(args: Vec<Argument>, receiver_const: bool) -> Self {
        Self { args, receiver_const: Some(receiver_const) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverloadError {
    NoViable,
    Ambiguous { candidates: Vec<DeclId> },
}

/// Per-parameter conversion rank; lower is better.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Exact,
    Qualification,
    UserConversion,
}

type Ranks = SmallVec<[Rank; 8]>;

impl Analyzer<'_> {
    /// Select the single best-viable candidate for a call site, or fail
    /// with a structured ambiguity. Deterministic for identical inputs.
    pub fn resolve_overload(
        &self,
        set: &[DeclId],
        site: &CallSite,
    ) -> Result<DeclId, OverloadError> {
        let mut viable: Vec<(DeclId, Ranks)> = Vec::new();
        for &candidate in set {
            if let Some(ranks) = self.rank_candidate(candidate, site) {
                viable.push((candidate, ranks));
            }
        }
        if viable.is_empty() {
            return Err(OverloadError::NoViable);
        }
        if viable.len() == 1 {
            return Ok(viable[0].0);
        }

        let mut best: Option<usize> = None;
        for index in 0..viable.len() {
            let beats_all = (0..viable.len())
                .filter(|&other| other != index)
                .all(|other| better(&viable[index].1, &viable[other].1));
            if beats_all {
                best = Some(index);
                break;
            }
        }
        if let Some(index) = best {
            return Ok(viable[index].0);
        }
        // Declaration order is a tie-break only between exact redeclarations
        // with identical rank vectors; anything else is a real ambiguity.
        let ranks0 = &viable[0].1;
        if viable.iter().all(|(decl, ranks)| {
            ranks == ranks0 && self.same_signature(viable[0].0, *decl)
        }) {
            return Ok(viable[0].0);
        }
        Err(OverloadError::Ambiguous {
            candidates: viable.into_iter().map(|(decl, _)| decl).collect(),
        })
    }

    /// The merged overload set for an operator symbol: free functions in
    /// the enclosing scopes plus members of the first operand's class.
    pub fn operator_set(&self, scope: Option<DeclId>, symbol: Atom, first_operand: TypeId) -> Vec<DeclId> {
        let mut set = self.binder.resolve_callables(scope, symbol);
        let types = &self.binder.graph().types;
        let (inner, _) = types.strip_ref(first_operand);
        if let TypeKey::Class { decl, .. } = types.lookup(types.strip_quals(inner)) {
            for &member_id in &self.binder.graph().decl(decl).children {
                let member = self.binder.graph().decl(member_id);
                if member.name == symbol
                    && member.kind == DeclKind::Method
                    && !set.contains(&member_id)
                {
                    set.push(member_id);
                }
            }
        }
        set
    }

    /// Rank one candidate against the call site; `None` when not viable.
    fn rank_candidate(&self, candidate: DeclId, site: &CallSite) -> Option<Ranks> {
        let graph = self.binder.graph();
        let decl = graph.decl(candidate);
        let func = decl.function()?;
        let scope = decl.parent;

        let is_member = matches!(decl.kind, DeclKind::Method) && !func.is_static();
        // Member operators take their first operand through the implicit
        // object parameter.
        let consumes_first = is_member
            && func.flags.contains(FnFlags::OPERATOR)
            && site.args.len() == func.params.len() + 1;
        let args: &[Argument] = if consumes_first { &site.args[1..] } else { &site.args };

        if args.len() < func.required_params() || args.len() > func.params.len() {
            return None;
        }

        let mut ranks = Ranks::new();
        if is_member {
            match site.receiver_const {
                Some(receiver_const) => {
                    // A const receiver cannot call a non-const method.
                    if receiver_const && !func.is_const() {
                        return None;
                    }
                    ranks.push(if receiver_const == func.is_const() {
                        Rank::Exact
                    } else {
                        Rank::Qualification
                    });
                }
                None if consumes_first => {
                    // The first operand binds to the implicit object
                    // parameter, a reference to the method's class with the
                    // method's constness.
                    let class = decl.parent?;
                    let types = &graph.types;
                    let quals = if func.is_const() {
                        wrapcheck_graph::Quals::CONST
                    } else {
                        wrapcheck_graph::Quals::empty()
                    };
                    let referent = types.intern(TypeKey::Class { decl: class, quals });
                    let receiver_param = types.intern(TypeKey::LValueRef { referent });
                    let rank = self.rank_conversion(
                        receiver_param,
                        site.args[0].ty,
                        site.args[0].category,
                    )?;
                    ranks.push(rank);
                }
                None => {}
            }
        }

        let mut conversions = 0usize;
        for (param, arg) in func.params.iter().zip(args) {
            let param_ty = self.binder.canonical_type(scope, param.ty).ok()?;
            let arg_ty = self.binder.canonical_type(scope, arg.ty).ok()?;
            let rank = self.rank_conversion(param_ty, arg_ty, arg.category)?;
            if rank == Rank::UserConversion {
                conversions += 1;
                // At most one user-defined conversion per candidate.
                if conversions > 1 {
                    return None;
                }
            }
            ranks.push(rank);
        }
        Some(ranks)
    }

    /// How an argument converts to a parameter type, or `None` if it cannot.
    fn rank_conversion(
        &self,
        param: TypeId,
        arg: TypeId,
        category: ValueCategory,
    ) -> Option<Rank> {
        let types = &self.binder.graph().types;
        if param == arg {
            return Some(Rank::Exact);
        }

        let (param_inner, param_ref) = types.strip_ref(param);
        match param_ref {
            Some(RefKind::LValue) => {
                let param_const = types.is_const(param_inner);
                // A non-const lvalue reference binds only to lvalues.
                if !param_const && category != ValueCategory::LValue {
                    return None;
                }
                let (arg_inner, _) = types.strip_ref(arg);
                let arg_bare = types.strip_quals(arg_inner);
                let param_bare = types.strip_quals(param_inner);
                if arg_inner == param_inner {
                    return Some(Rank::Exact);
                }
                if arg_bare == param_bare {
                    // Binding differs only in qualifiers; const-adding is an
                    // adjustment, const-dropping is ill-formed.
                    return if param_const || !types.is_const(arg_inner) {
                        Some(Rank::Qualification)
                    } else {
                        None
                    };
                }
                if self.is_derived_from(arg_bare, param_bare) {
                    return Some(Rank::Qualification);
                }
                if param_const {
                    return self.user_conversion(param_bare, arg_bare);
                }
                None
            }
            Some(RefKind::RValue) => {
                if category != ValueCategory::RValue {
                    return None;
                }
                let (arg_inner, _) = types.strip_ref(arg);
                if types.strip_quals(arg_inner) == types.strip_quals(param_inner) {
                    if arg_inner == param_inner {
                        Some(Rank::Exact)
                    } else {
                        Some(Rank::Qualification)
                    }
                } else {
                    None
                }
            }
            None => {
                // By-value parameter: top-level qualifiers on either side
                // are irrelevant.
                let (arg_inner, _) = types.strip_ref(arg);
                let arg_bare = types.strip_quals(arg_inner);
                let param_bare = types.strip_quals(param_inner);
                if arg_bare == param_bare {
                    return Some(Rank::Exact);
                }
                if self.pointer_adjustment(param_bare, arg_bare) {
                    return Some(Rank::Qualification);
                }
                if self.builtin_adjustment(param_bare, arg_bare) {
                    return Some(Rank::Qualification);
                }
                self.user_conversion(param_bare, arg_bare)
            }
        }
    }

    /// Pointer conversions that need only adjustment: added pointee const,
    /// derived-to-base, and nullptr.
    fn pointer_adjustment(&self, param: TypeId, arg: TypeId) -> bool {
        let types = &self.binder.graph().types;
        match (types.lookup(param), types.lookup(arg)) {
            (TypeKey::Pointer { pointee: param_pointee, .. }, TypeKey::Pointer { pointee: arg_pointee, .. }) => {
                let param_bare = types.strip_quals(param_pointee);
                let arg_bare = types.strip_quals(arg_pointee);
                if param_bare == arg_bare {
                    // Only const-adding survives.
                    return types.is_const(param_pointee) || !types.is_const(arg_pointee);
                }
                self.is_derived_from(arg_bare, param_bare)
            }
            (TypeKey::Pointer { .. }, TypeKey::Builtin { kind, .. }) => {
                kind == wrapcheck_graph::BuiltinKind::NullPtr
            }
            _ => false,
        }
    }

    /// Arithmetic and enum-to-integer conversions rank as adjustments;
    /// scoped enums never convert implicitly.
    fn builtin_adjustment(&self, param: TypeId, arg: TypeId) -> bool {
        let types = &self.binder.graph().types;
        let param_key = types.lookup(param);
        let arg_key = types.lookup(arg);
        let arithmetic = |key: &TypeKey| {
            matches!(
                key,
                TypeKey::Builtin { kind, .. } if !matches!(kind, wrapcheck_graph::BuiltinKind::Void | wrapcheck_graph::BuiltinKind::NullPtr)
            )
        };
        if arithmetic(&param_key) && arithmetic(&arg_key) {
            return true;
        }
        if let (true, TypeKey::Enum { decl, .. }) = (arithmetic(&param_key), &arg_key) {
            let graph = self.binder.graph();
            if let wrapcheck_graph::DeclData::Enum(data) = &graph.decl(*decl).data {
                return !data.scoped;
            }
        }
        false
    }

    /// Whether `derived` has `base` anywhere in its flattened base set.
    pub(crate) fn is_derived_from(&self, derived: TypeId, base: TypeId) -> bool {
        let types = &self.binder.graph().types;
        let (TypeKey::Class { decl: derived_decl, .. }, TypeKey::Class { decl: base_decl, .. }) =
            (types.lookup(derived), types.lookup(base))
        else {
            return false;
        };
        match self.inheritance(derived_decl) {
            Ok(map) => map.bases.iter().any(|b| b.decl == base_decl),
            Err(_) => false,
        }
    }

    /// A user-defined conversion from `arg` to `param`: a non-explicit
    /// converting constructor of the parameter's class, or a conversion
    /// operator of the argument's class.
    fn user_conversion(&self, param: TypeId, arg: TypeId) -> Option<Rank> {
        let graph = self.binder.graph();
        let types = &graph.types;

        if let TypeKey::Class { decl: param_class, .. } = types.lookup(param) {
            for &member_id in &graph.decl(param_class).children {
                let member = graph.decl(member_id);
                if member.kind != DeclKind::Constructor || !member.access.is_public() {
                    continue;
                }
                let Some(func) = member.function() else { continue };
                if func.is_deleted() || func.flags.contains(FnFlags::EXPLICIT) {
                    continue;
                }
                if func.required_params() != 1 {
                    continue;
                }
                let scope = Some(param_class);
                if let Ok(ctor_param) = self.binder.canonical_type(scope, func.params[0].ty) {
                    let (inner, _) = types.strip_ref(ctor_param);
                    let bare = types.strip_quals(inner);
                    // The constructor argument itself must not need another
                    // user conversion.
                    if bare == arg || self.builtin_adjustment(bare, arg) {
                        return Some(Rank::UserConversion);
                    }
                }
            }
        }

        if let TypeKey::Class { decl: arg_class, .. } = types.lookup(arg) {
            for &member_id in &graph.decl(arg_class).children {
                let member = graph.decl(member_id);
                if member.kind != DeclKind::Method || !member.access.is_public() {
                    continue;
                }
                let Some(func) = member.function() else { continue };
                if !func.flags.contains(FnFlags::OPERATOR) || !func.params.is_empty() {
                    continue;
                }
                if let Ok(ret) = self.binder.canonical_type(Some(arg_class), func.ret) {
                    let (inner, _) = types.strip_ref(ret);
                    let bare = types.strip_quals(inner);
                    if bare == param || self.builtin_adjustment(param, bare) {
                        return Some(Rank::UserConversion);
                    }
                }
            }
        }
        None
    }

    /// Exact redeclarations: same name, same parameter types, same
    /// constness.
    fn same_signature(&self, left: DeclId, right: DeclId) -> bool {
        if left == right {
            return true;
        }
        let graph = self.binder.graph();
        let (l, r) = (graph.decl(left), graph.decl(right));
        if l.name != r.name {
            return false;
        }
        let (Some(lf), Some(rf)) = (l.function(), r.function()) else {
            return false;
        };
        lf.is_const() == rf.is_const()
            && lf.params.len() == rf.params.len()
            && lf
                .params
                .iter()
                .zip(&rf.params)
                .all(|(a, b)| {
                    let a = self.binder.canonical_type(l.parent, a.ty).ok();
                    let b = self.binder.canonical_type(r.parent, b.ty).ok();
                    a.is_some() && a == b
                })
    }
}

/// Pairwise comparison: `a` beats `b` when no parameter ranks worse and at
/// least one ranks strictly better.
fn better(a: &Ranks, b: &Ranks) -> bool {
    if a.len() != b.len() {
        // Different viable arities (defaulted parameters): fewer
        // conversions needed wins only if no common position is worse.
        let common = a.len().min(b.len());
        let no_worse = a[..common].iter().zip(&b[..common]).all(|(x, y)| x <= y);
        return no_worse && a.len() < b.len();
    }
    let mut strictly = false;
    for (x, y) in a.iter().zip(b) {
        if x > y {
            return false;
        }
        if x < y {
            strictly = true;
        }
    }
    strictly
}

#[cfg(test)]
#[path = "../tests/overloads_tests.rs"]
mod tests;

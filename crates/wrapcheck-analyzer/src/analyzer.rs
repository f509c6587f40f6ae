//! Shared analysis state and the parallel per-declaration driver.
//!
//! One `Analyzer` lives for one run over one immutable graph. Every derived
//! fact is memoized in concurrent caches, so declarations are analyzed in
//! parallel with no coordination beyond the caches themselves; a cache race
//! recomputes the same answer. Per-declaration failures become diagnostics
//! on the output; the only fatal error is an inconsistent input graph.

use crate::classify::ClassInfo;
use crate::defaults::DefaultArgument;
use crate::inheritance::{InheritanceMap, InheritedMember};
use crate::overloads::{Argument, CallSite, OverloadError};
use crate::records::{
    AnalysisOutput, BaseRecord, CallableKind, CallableRecord, ClassRecord, DefaultRecord,
    EnumRecord, EnumeratorRecord, InheritedMemberRecord, Ownership, ParamRecord, ReasonCode,
    Record, SpecialMemberRecord,
};
use crate::templates::InstanceStore;
use dashmap::DashMap;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;
use wrapcheck_binder::Binder;
use wrapcheck_common::diagnostics::{Diagnostic, DiagnosticKind, Severity};
use wrapcheck_graph::{
    Attribute, DeclData, DeclGraph, DeclId, DeclKind, Declaration, FnFlags, FunctionData, RefKind,
    TypeId, TypeKey,
};

/// Run the full analysis over a graph. `Err` only for fatal graph
/// inconsistencies; everything else lands in the output's diagnostics.
pub fn analyze(graph: &DeclGraph) -> Result<AnalysisOutput, Diagnostic> {
    Analyzer::new(graph).run()
}

/// A declaration reference that is either borrowed from the graph or
/// shared out of the instantiation store.
pub(crate) enum DeclRef<'g> {
    Graph(&'g Declaration),
    Synthesized(Arc<Declaration>),
}

impl std::ops::Deref for DeclRef<'_> {
    type Target = Declaration;

    fn deref(&self) -> &Declaration {
        match self {
            Self::Graph(decl) => decl,
            Self::Synthesized(decl) => decl,
        }
    }
}

pub struct Analyzer<'g> {
    pub(crate) binder: Binder<'g>,
    pub(crate) class_cache: DashMap<DeclId, Arc<ClassInfo>>,
    pub(crate) inherit_cache: DashMap<DeclId, Arc<InheritanceMap>>,
    pub(crate) instances: InstanceStore,
}

impl<'g> Analyzer<'g> {
    pub fn new(graph: &'g DeclGraph) -> Self {
        Self {
            binder: Binder::new(graph),
            class_cache: DashMap::new(),
            inherit_cache: DashMap::new(),
            instances: InstanceStore::new(graph.len()),
        }
    }

    pub fn graph(&self) -> &'g DeclGraph {
        self.binder.graph()
    }

    pub fn binder(&self) -> &Binder<'g> {
        &self.binder
    }

    /// Whether an id indexes the input graph rather than the instantiation
    /// store.
    pub(crate) fn is_graph_id(&self, id: DeclId) -> bool {
        (id.0 as usize) < self.graph().len()
    }

    /// A declaration by id, from the graph or the instantiation store.
    /// Synthesized ids continue past the graph's table, so indexing the
    /// graph with them is never valid.
    pub(crate) fn decl_of(&self, id: DeclId) -> Option<DeclRef<'g>> {
        if self.is_graph_id(id) {
            Some(DeclRef::Graph(self.graph().decl(id)))
        } else {
            self.instantiated(id).map(DeclRef::Synthesized)
        }
    }

    /// The closest enclosing scope that lives in the graph. A synthesized
    /// declaration resolves names in the scope its template was declared in.
    pub(crate) fn nearest_graph_scope(&self, mut scope: Option<DeclId>) -> Option<DeclId> {
        while let Some(id) = scope {
            if self.is_graph_id(id) {
                return Some(id);
            }
            scope = self.instantiated(id).and_then(|decl| decl.parent);
        }
        None
    }

    /// Qualified-name rendering that also covers synthesized declarations,
    /// which the graph cannot name.
    pub(crate) fn display_name(&self, id: DeclId) -> String {
        let graph = self.graph();
        if self.is_graph_id(id) {
            return graph.qualified_name(id);
        }
        if let Some(rendered) = self.instance_display(id) {
            return rendered;
        }
        match self.instantiated(id) {
            Some(decl) => {
                let own = graph.names.resolve(decl.name).to_string();
                match decl.parent {
                    Some(owner) => format!("{}::{own}", self.display_name(owner)),
                    None => own,
                }
            }
            None => "<synthesized>".to_string(),
        }
    }

    /// Analyze every declaration, in parallel, and assemble the output in
    /// declaration order.
    pub fn run(&self) -> Result<AnalysisOutput, Diagnostic> {
        let ids: Vec<DeclId> = self.graph().ids().collect();
        debug!(declarations = ids.len(), "analysis run started");
        let per_decl: Result<Vec<_>, Diagnostic> = ids
            .par_iter()
            .map(|&id| {
                self.analyze_decl(id)
                    .map(|(records, diagnostics)| (id, records, diagnostics))
            })
            .collect();
        let mut per_decl = per_decl?;
        per_decl.sort_by_key(|(id, ..)| *id);

        let mut records = Vec::new();
        let mut diagnostics = Vec::new();
        for (_, mut decl_records, mut decl_diags) in per_decl {
            records.append(&mut decl_records);
            diagnostics.append(&mut decl_diags);
        }
        debug!(
            records = records.len(),
            diagnostics = diagnostics.len(),
            "analysis run finished"
        );
        Ok(AnalysisOutput { records, diagnostics })
    }

    fn analyze_decl(&self, id: DeclId) -> Result<(Vec<Record>, Vec<Diagnostic>), Diagnostic> {
        let graph = self.graph();
        let decl = graph.decl(id);
        let mut diagnostics = Vec::new();
        let records = match decl.kind {
            DeclKind::Class => vec![self.class_record(id, &mut diagnostics)?],
            DeclKind::Function
            | DeclKind::Method
            | DeclKind::Constructor
            | DeclKind::Destructor => {
                vec![self.callable_record(id, decl, &mut diagnostics)]
            }
            DeclKind::Enum => vec![self.enum_record(id, decl)],
            DeclKind::Typedef => {
                if let DeclData::Typedef { target } = &decl.data {
                    if let Err(err) = self.binder.canonical_type(decl.parent, *target) {
                        diagnostics.push(err.to_diagnostic(graph, graph.qualified_name(id)));
                    }
                }
                Vec::new()
            }
            DeclKind::FunctionTemplate => {
                match self.function_template_record(id, decl, &mut diagnostics) {
                    Some(record) => vec![record],
                    None => Vec::new(),
                }
            }
            // Namespaces, usings, variables, fields, enumerators, and class
            // template patterns surface through their owners.
            _ => Vec::new(),
        };
        Ok((records, diagnostics))
    }

    // =========================================================================
    // Classes
    // =========================================================================

    fn class_record(
        &self,
        id: DeclId,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Record, Diagnostic> {
        let graph = self.graph();
        let decl = graph.decl(id);
        let name = graph.qualified_name(id);
        let incomplete = !graph.is_complete_class(id);

        if incomplete {
            return Ok(Record::Class(ClassRecord {
                name,
                location: graph.loc_string(id),
                incomplete: true,
                is_final: false,
                is_abstract: false,
                polymorphic: false,
                special_members: None,
                copyable: false,
                movable: false,
                ownership: Ownership::PointerOnly,
                bases: Vec::new(),
                inherited_members: Vec::new(),
                deprecated: deprecation_message(decl),
            }));
        }

        let info = self.classify(id);
        let inherit = self.inheritance(id)?;

        let mut inherited_members = Vec::new();
        for (member_name, entry) in &inherit.members {
            match entry {
                InheritedMember::Unique { declared_in, .. } => {
                    inherited_members.push(InheritedMemberRecord {
                        name: graph.names.resolve(*member_name).to_string(),
                        declared_in: Some(self.display_name(*declared_in)),
                        ambiguous: false,
                    });
                }
                InheritedMember::Ambiguous { declared_in } => {
                    let rendered = graph.names.resolve(*member_name).to_string();
                    let bases: Vec<String> = declared_in
                        .iter()
                        .map(|&b| self.display_name(b))
                        .collect();
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::InheritedNameAmbiguous,
                        name.clone(),
                        format!(
                            "member `{rendered}` is inherited from unrelated bases {}",
                            bases.join(" and ")
                        ),
                    ));
                    inherited_members.push(InheritedMemberRecord {
                        name: rendered,
                        declared_in: None,
                        ambiguous: true,
                    });
                }
            }
        }

        let bases = inherit
            .bases
            .iter()
            .map(|base| BaseRecord {
                name: self.display_name(base.decl),
                public: base.access.is_public(),
                is_virtual: base.is_virtual,
            })
            .collect();

        if let Some(message) = deprecation_message(decl) {
            diagnostics.push(
                Diagnostic::new(DiagnosticKind::Deprecated, name.clone(), message.clone())
                    .with_severity(Severity::Warning),
            );
        }

        Ok(Record::Class(ClassRecord {
            name,
            location: graph.loc_string(id),
            incomplete: false,
            is_final: info.is_final,
            is_abstract: info.is_abstract,
            polymorphic: info.polymorphic,
            special_members: Some(SpecialMemberRecord {
                default_ctor: info.default_ctor,
                copy_ctor: info.copy_ctor,
                copy_assign: info.copy_assign,
                move_ctor: info.move_ctor,
                move_assign: info.move_assign,
                dtor: info.dtor,
            }),
            copyable: info.copyable(),
            movable: info.movable(),
            ownership: if info.value_ownable() {
                Ownership::Value
            } else {
                Ownership::PointerOnly
            },
            bases,
            inherited_members,
            deprecated: deprecation_message(decl),
        }))
    }

    // =========================================================================
    // Callables
    // =========================================================================

    fn callable_record(
        &self,
        id: DeclId,
        decl: &Declaration,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Record {
        let graph = self.graph();
        let name = graph.qualified_name(id);
        let func = decl
            .function()
            .expect("callable declaration carries function data");
        let scope = decl.parent;

        let mut reason: Option<ReasonCode> = None;
        let mut note_reason = |code: ReasonCode| {
            if reason.is_none() {
                reason = Some(code);
            }
        };

        if func.is_deleted() {
            note_reason(ReasonCode::DeletedFunction);
        }
        if !decl.access.is_public() {
            note_reason(ReasonCode::NonPublicAccess);
        }

        // Parameters: canonicalize, check value semantics, fold defaults.
        let mut params = Vec::with_capacity(func.params.len());
        let mut canonical_params = Vec::with_capacity(func.params.len());
        for param in &func.params {
            let canonical = match self.binder.canonical_type(scope, param.ty) {
                Ok(ty) => ty,
                Err(err) => {
                    diagnostics.push(err.to_diagnostic(graph, name.clone()));
                    note_reason(ReasonCode::UnresolvedType);
                    TypeId::ERROR
                }
            };
            canonical_params.push(canonical);
            if canonical != TypeId::ERROR {
                if let Some(code) = self.check_value_use(canonical, &name, diagnostics) {
                    note_reason(code);
                }
            }
            let default = param.default.as_ref().map(|expr| {
                let folded = self.evaluate_default(scope, expr);
                if !folded.foldable {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::NotFoldable,
                            name.clone(),
                            "default argument has observable side effects; \
                             the folded value is best-effort only",
                        )
                        .with_severity(Severity::Warning),
                    );
                }
                render_default(&folded)
            });
            params.push(ParamRecord {
                name: param.name.map(|n| graph.names.resolve(n).to_string()),
                ty: graph.display_type(canonical),
                default,
            });
        }

        let returns = match self.binder.canonical_type(scope, func.ret) {
            Ok(ty) => {
                if let Some(code) = self.check_value_use(ty, &name, diagnostics) {
                    note_reason(code);
                }
                ty
            }
            Err(err) => {
                diagnostics.push(err.to_diagnostic(graph, name.clone()));
                note_reason(ReasonCode::UnresolvedType);
                TypeId::ERROR
            }
        };

        let selected_overload = self.select_own_overload(
            id,
            decl,
            func,
            &canonical_params,
            &name,
            diagnostics,
        );

        let deprecated = deprecation_message(decl);
        if let Some(message) = &deprecated {
            diagnostics.push(
                Diagnostic::new(DiagnosticKind::Deprecated, name.clone(), message.clone())
                    .with_severity(Severity::Warning),
            );
        }

        let kind = match decl.kind {
            DeclKind::Method => CallableKind::Method,
            DeclKind::Constructor => CallableKind::Constructor,
            DeclKind::Destructor => CallableKind::Destructor,
            _ => CallableKind::Function,
        };

        Record::Callable(CallableRecord {
            signature: self.render_signature(&name, func, &canonical_params, returns),
            name,
            kind,
            location: graph.loc_string(id),
            params,
            returns: graph.display_type(returns),
            is_const: func.is_const(),
            is_static: func.is_static(),
            is_virtual: func.is_virtual(),
            is_operator: func.flags.contains(FnFlags::OPERATOR),
            selected_overload,
            wrappable: reason.is_none(),
            reason,
            deprecated,
        })
    }

    /// Resolve the callable's own signature against its merged overload
    /// set. Exercises determinism and surfaces real ambiguities such as
    /// exact duplicate signatures from different usings.
    fn select_own_overload(
        &self,
        id: DeclId,
        decl: &Declaration,
        func: &FunctionData,
        canonical_params: &[TypeId],
        name: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<String> {
        if !matches!(decl.kind, DeclKind::Function | DeclKind::Method) {
            return None;
        }
        let graph = self.graph();
        let types = &graph.types;

        let mut args: Vec<Argument> = canonical_params
            .iter()
            .map(|&ty| match types.strip_ref(ty) {
                (inner, Some(RefKind::RValue)) => Argument::rvalue(inner),
                (inner, Some(RefKind::LValue)) => Argument::lvalue(inner),
                _ => Argument::lvalue(types.strip_quals(ty)),
            })
            .collect();

        let is_member = decl.kind == DeclKind::Method && !func.is_static();
        let is_operator = func.flags.contains(FnFlags::OPERATOR);
        if is_member && is_operator {
            // A member operator's receiver is its first operand in the
            // merged free/member set.
            if let Some(class) = decl.parent {
                let quals = if func.is_const() {
                    wrapcheck_graph::Quals::CONST
                } else {
                    wrapcheck_graph::Quals::empty()
                };
                let receiver = types.intern(TypeKey::Class { decl: class, quals });
                args.insert(0, Argument::lvalue(receiver));
            }
        }

        let site = if is_member {
            CallSite::method(args, func.is_const())
        } else {
            CallSite::free(args)
        };

        let set = if is_operator {
            let first = site.args.first().map_or(TypeId::ERROR, |a| a.ty);
            let outer = if decl.kind == DeclKind::Method {
                decl.parent.and_then(|p| graph.decl(p).parent)
            } else {
                decl.parent
            };
            self.operator_set(outer, decl.name, first)
        } else {
            self.binder.resolve_callables(decl.parent, decl.name)
        };
        if set.len() < 2 {
            return Some(graph.qualified_name(id));
        }

        match self.resolve_overload(&set, &site) {
            Ok(selected) => Some(graph.qualified_name(selected)),
            Err(OverloadError::Ambiguous { candidates }) => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::AmbiguousOverload,
                    name,
                    format!(
                        "signature matches {} overloads with no strict ordering",
                        candidates.len()
                    ),
                ));
                None
            }
            Err(OverloadError::NoViable) => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::NoViableOverload,
                    name,
                    "no overload is viable for the declared signature",
                ));
                None
            }
        }
    }

    /// Wrappability constraints on a type used by value in a signature.
    /// References and pointers only need the instantiation check.
    fn check_value_use(
        &self,
        ty: TypeId,
        subject: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ReasonCode> {
        let graph = self.graph();
        let types = &graph.types;
        match types.lookup(ty) {
            TypeKey::Class { decl, .. } => {
                if !graph.is_complete_class(decl) {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::IncompleteType,
                        subject,
                        format!(
                            "`{}` is passed by value but no definition was observed",
                            graph.qualified_name(decl)
                        ),
                    ));
                    return Some(ReasonCode::IncompleteTypeByValue);
                }
                class_value_reason(&self.classify(decl))
            }
            // An instantiation passed by value carries its synthesized
            // class's constraints, exactly like a named class.
            TypeKey::Instance { template, args, .. } => {
                match self.instantiate(template, &args) {
                    Ok(instance) => class_value_reason(&self.classify(instance)),
                    Err(err) => {
                        diagnostics.push(Diagnostic::new(
                            DiagnosticKind::DeductionFailure,
                            subject,
                            err.message(&graph.names),
                        ));
                        None
                    }
                }
            }
            TypeKey::Pointer { pointee, .. } => {
                // Opaque handles are fine; nested instantiations still get
                // validated.
                self.validate_instances(pointee, subject, diagnostics);
                None
            }
            TypeKey::LValueRef { referent } | TypeKey::RValueRef { referent } => {
                self.validate_instances(referent, subject, diagnostics);
                None
            }
            _ => None,
        }
    }

    fn validate_instances(&self, ty: TypeId, subject: &str, diagnostics: &mut Vec<Diagnostic>) {
        let graph = self.graph();
        if let TypeKey::Instance { template, args, .. } = graph.types.lookup(ty) {
            if let Err(err) = self.instantiate(template, &args) {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DeductionFailure,
                    subject,
                    err.message(&graph.names),
                ));
            }
        }
    }

    fn render_signature(
        &self,
        name: &str,
        func: &FunctionData,
        params: &[TypeId],
        ret: TypeId,
    ) -> String {
        let graph = self.graph();
        let rendered: Vec<String> = params.iter().map(|&p| graph.display_type(p)).collect();
        let constness = if func.is_const() { " const" } else { "" };
        format!(
            "{} {}({}){}",
            graph.display_type(ret),
            name,
            rendered.join(", "),
            constness
        )
    }

    // =========================================================================
    // Enums and function templates
    // =========================================================================

    fn enum_record(&self, id: DeclId, decl: &Declaration) -> Record {
        let graph = self.graph();
        let DeclData::Enum(data) = &decl.data else {
            return Record::Enum(EnumRecord {
                name: graph.qualified_name(id),
                location: graph.loc_string(id),
                scoped: false,
                underlying: String::new(),
                enumerators: Vec::new(),
            });
        };
        let enumerators = decl
            .children
            .iter()
            .filter_map(|&child_id| {
                let child = graph.decl(child_id);
                match child.data {
                    DeclData::Enumerator { value } => Some(EnumeratorRecord {
                        name: graph.names.resolve(child.name).to_string(),
                        value,
                    }),
                    _ => None,
                }
            })
            .collect();
        Record::Enum(EnumRecord {
            name: graph.qualified_name(id),
            location: graph.loc_string(id),
            scoped: data.scoped,
            underlying: graph.display_type(data.underlying),
            enumerators,
        })
    }

    fn function_template_record(
        &self,
        id: DeclId,
        decl: &Declaration,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Record> {
        let graph = self.graph();
        let data = decl.template()?;
        let pattern = graph.decl(data.pattern);
        let func = pattern.function()?;
        let name = graph.qualified_name(id);

        let undeducible = self.undeducible_params(id);
        let wrappable = undeducible.is_empty();
        if !wrappable {
            let rendered: Vec<String> = undeducible
                .iter()
                .map(|&p| graph.names.resolve(p).to_string())
                .collect();
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::DeductionFailure,
                name.clone(),
                format!(
                    "template parameter{} {} cannot be deduced from any call site",
                    if rendered.len() == 1 { "" } else { "s" },
                    rendered.join(", ")
                ),
            ));
        }

        let params = func
            .params
            .iter()
            .map(|param| ParamRecord {
                name: param.name.map(|n| graph.names.resolve(n).to_string()),
                ty: graph.display_type(param.ty),
                default: None,
            })
            .collect();

        let deprecated = deprecation_message(decl);
        Some(Record::Callable(CallableRecord {
            signature: self.render_signature(
                &name,
                func,
                &func.params.iter().map(|p| p.ty).collect::<Vec<_>>(),
                func.ret,
            ),
            name,
            kind: CallableKind::FunctionTemplate,
            location: graph.loc_string(id),
            params,
            returns: graph.display_type(func.ret),
            is_const: false,
            is_static: false,
            is_virtual: false,
            is_operator: false,
            selected_overload: None,
            wrappable,
            reason: (!wrappable).then_some(ReasonCode::UndeducibleTemplateParameter),
            deprecated,
        }))
    }
}

/// Value-semantics constraints shared by named classes and instantiations.
fn class_value_reason(info: &ClassInfo) -> Option<ReasonCode> {
    if info.is_abstract {
        Some(ReasonCode::AbstractByValue)
    } else if !info.copyable() && !info.movable() {
        Some(ReasonCode::NonCopyableByValue)
    } else if !info.dtor.is_accessible() {
        Some(ReasonCode::InaccessibleDestructor)
    } else {
        None
    }
}

fn deprecation_message(decl: &Declaration) -> Option<String> {
    match decl.deprecation() {
        Some(Attribute::Deprecated { message }) => Some(
            message
                .clone()
                .unwrap_or_else(|| "deprecated".to_string()),
        ),
        None => None,
    }
}

fn render_default(folded: &DefaultArgument) -> DefaultRecord {
    DefaultRecord {
        value: serde_json::to_value(&folded.value).unwrap_or(serde_json::Value::Null),
        foldable: folded.foldable,
    }
}

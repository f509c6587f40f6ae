use super::*;
use crate::analyzer::Analyzer;
use wrapcheck_graph::{load_graph, DeclGraph, DeclId, DeclKind, Quals, TypeId};

fn callables(graph: &DeclGraph, name: &str) -> Vec<DeclId> {
    let atom = graph.names.intern(name);
    graph
        .ids()
        .filter(|&id| {
            let decl = graph.decl(id);
            decl.kind.is_callable() && decl.name == atom
        })
        .collect()
}

fn class_ty(graph: &DeclGraph, name: &str) -> TypeId {
    let atom = graph.names.intern(name);
    let decl = graph
        .ids()
        .find(|&id| graph.decl(id).name == atom && graph.decl(id).kind == DeclKind::Class)
        .unwrap_or_else(|| panic!("no class named {name}"));
    graph.types.intern(TypeKey::Class { decl, quals: Quals::empty() })
}

#[test]
fn const_ref_yields_to_the_exact_non_const_binding() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"class","name":"T"},
            {"kind":"function","name":"f","params":[
                {"type":{"k":"ref","to":{"k":"named","path":["T"],"const":true}}},
                {"type":{"k":"ref","to":{"k":"named","path":["T"],"const":true}}}
            ]},
            {"kind":"function","name":"f","params":[
                {"type":{"k":"ref","to":{"k":"named","path":["T"],"const":true}}},
                {"type":{"k":"ref","to":{"k":"named","path":["T"]}}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let set = callables(&graph, "f");
    assert_eq!(set.len(), 2);

    // Two non-const lvalues: the non-const second parameter is an exact
    // binding, the const one is an adjustment.
    let t = class_ty(&graph, "T");
    let site = CallSite::free(vec![Argument::lvalue(t), Argument::lvalue(t)]);
    let selected = analyzer.resolve_overload(&set, &site).unwrap();
    assert_eq!(selected, set[1]);
}

#[test]
fn const_receiver_can_only_call_the_const_overload() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"class","name":"Box","members":[
                {"kind":"method","name":"get","access":"public",
                 "returns":{"k":"builtin","name":"int"}},
                {"kind":"method","name":"get","access":"public","const":true,
                 "returns":{"k":"builtin","name":"int"}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let set = callables(&graph, "get");
    assert_eq!(set.len(), 2);
    let graph_decl = |id: DeclId| graph.decl(id).function().unwrap();

    let from_const = analyzer
        .resolve_overload(&set, &CallSite::method(vec![], true))
        .unwrap();
    assert!(graph_decl(from_const).is_const());

    // A mutable receiver prefers the non-const overload but could call both.
    let from_mut = analyzer
        .resolve_overload(&set, &CallSite::method(vec![], false))
        .unwrap();
    assert!(!graph_decl(from_mut).is_const());
}

#[test]
fn cross_ranked_candidates_are_ambiguous() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"function","name":"g","params":[
                {"type":{"k":"builtin","name":"int"}},
                {"type":{"k":"builtin","name":"double"}}
            ]},
            {"kind":"function","name":"g","params":[
                {"type":{"k":"builtin","name":"double"}},
                {"type":{"k":"builtin","name":"int"}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let set = callables(&graph, "g");
    let site = CallSite::free(vec![
        Argument::rvalue(TypeId::INT),
        Argument::rvalue(TypeId::INT),
    ]);
    match analyzer.resolve_overload(&set, &site) {
        Err(OverloadError::Ambiguous { candidates }) => assert_eq!(candidates.len(), 2),
        other => panic!("expected an ambiguity, got {other:?}"),
    }
    // Re-resolution reports the identical outcome.
    let again = analyzer.resolve_overload(&set, &site);
    assert_eq!(again, analyzer.resolve_overload(&set, &site));
}

#[test]
fn arity_mismatch_leaves_no_viable_candidate() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"function","name":"f","params":[{"type":{"k":"builtin","name":"int"}}]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let set = callables(&graph, "f");
    let site = CallSite::free(vec![
        Argument::rvalue(TypeId::INT),
        Argument::rvalue(TypeId::INT),
    ]);
    assert_eq!(analyzer.resolve_overload(&set, &site), Err(OverloadError::NoViable));
}

#[test]
fn defaulted_trailing_parameter_keeps_the_candidate_viable() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"function","name":"h","params":[
                {"type":{"k":"builtin","name":"int"}},
                {"type":{"k":"builtin","name":"int"},"default":{"e":"int","value":0}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let set = callables(&graph, "h");
    let site = CallSite::free(vec![Argument::rvalue(TypeId::INT)]);
    assert_eq!(analyzer.resolve_overload(&set, &site), Ok(set[0]));
}

#[test]
fn nullptr_converts_to_any_pointer_parameter() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"class","name":"T"},
            {"kind":"function","name":"take","params":[
                {"type":{"k":"pointer","to":{"k":"named","path":["T"]}}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let set = callables(&graph, "take");
    let site = CallSite::free(vec![Argument::rvalue(TypeId::NULLPTR)]);
    assert_eq!(analyzer.resolve_overload(&set, &site), Ok(set[0]));
}

#[test]
fn builtin_adjustment_beats_a_user_conversion() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"class","name":"Wrapper","members":[
                {"kind":"constructor","access":"public","params":[
                    {"type":{"k":"builtin","name":"int"}}
                ]}
            ]},
            {"kind":"function","name":"u","params":[
                {"type":{"k":"named","path":["Wrapper"]}}
            ]},
            {"kind":"function","name":"u","params":[
                {"type":{"k":"builtin","name":"double"}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let set = callables(&graph, "u");
    let site = CallSite::free(vec![Argument::rvalue(TypeId::INT)]);
    let selected = analyzer.resolve_overload(&set, &site).unwrap();
    assert_eq!(selected, set[1]);
}

#[test]
fn explicit_constructors_never_supply_implicit_conversions() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"class","name":"Wrapper","members":[
                {"kind":"constructor","access":"public","explicit":true,"params":[
                    {"type":{"k":"builtin","name":"int"}}
                ]}
            ]},
            {"kind":"function","name":"u","params":[
                {"type":{"k":"named","path":["Wrapper"]}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let set = callables(&graph, "u");
    let site = CallSite::free(vec![Argument::rvalue(TypeId::INT)]);
    assert_eq!(analyzer.resolve_overload(&set, &site), Err(OverloadError::NoViable));
}

#[test]
fn derived_argument_binds_a_base_reference_as_an_adjustment() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"class","name":"Base"},
            {"kind":"class","name":"Derived","bases":[
                {"type":{"k":"named","path":["Base"]},"access":"public"}
            ]},
            {"kind":"function","name":"f","params":[
                {"type":{"k":"ref","to":{"k":"named","path":["Base"],"const":true}}}
            ]},
            {"kind":"function","name":"f","params":[
                {"type":{"k":"ref","to":{"k":"named","path":["Derived"]}}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let set = callables(&graph, "f");
    let d = class_ty(&graph, "Derived");
    let site = CallSite::free(vec![Argument::lvalue(d)]);
    // The exact referent beats the derived-to-base adjustment.
    assert_eq!(analyzer.resolve_overload(&set, &site), Ok(set[1]));
}

#[test]
fn operator_sets_merge_free_functions_and_members() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"class","name":"Vec","members":[
                {"kind":"method","name":"operator+","access":"public",
                 "returns":{"k":"named","path":["Vec"]},
                 "params":[{"type":{"k":"ref","to":{"k":"named","path":["Vec"],"const":true}}}]}
            ]},
            {"kind":"function","name":"operator+",
             "returns":{"k":"named","path":["Vec"]},
             "params":[
                {"type":{"k":"ref","to":{"k":"named","path":["Vec"],"const":true}}},
                {"type":{"k":"builtin","name":"int"}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let symbol = graph.names.intern("operator+");
    let v = class_ty(&graph, "Vec");
    let set = analyzer.operator_set(None, symbol, v);
    assert_eq!(set.len(), 2);

    // Vec + Vec can only mean the member.
    let site = CallSite::free(vec![Argument::lvalue(v), Argument::lvalue(v)]);
    let selected = analyzer.resolve_overload(&set, &site).unwrap();
    assert_eq!(graph.decl(selected).kind, DeclKind::Method);

    // Vec + int can only mean the free function.
    let site = CallSite::free(vec![Argument::lvalue(v), Argument::rvalue(TypeId::INT)]);
    let selected = analyzer.resolve_overload(&set, &site).unwrap();
    assert_eq!(graph.decl(selected).kind, DeclKind::Function);
}

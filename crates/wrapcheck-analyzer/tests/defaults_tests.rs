use super::*;
use crate::analyzer::Analyzer;
use wrapcheck_graph::{load_graph, DeclGraph, DeclId, DefaultExpr};

fn default_of(graph: &DeclGraph, name: &str, index: usize) -> (Option<DeclId>, DefaultExpr) {
    let atom = graph.names.intern(name);
    let id = graph
        .ids()
        .find(|&id| graph.decl(id).name == atom && graph.decl(id).function().is_some())
        .unwrap_or_else(|| panic!("no callable named {name}"));
    let decl = graph.decl(id);
    let expr = decl.function().unwrap().params[index]
        .default
        .clone()
        .unwrap_or_else(|| panic!("{name} has no default at position {index}"));
    (decl.parent, expr)
}

#[test]
fn integer_literal_folds() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"function","name":"f","params":[
                {"type":{"k":"builtin","name":"int"},"default":{"e":"int","value":5}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let (scope, expr) = default_of(&graph, "f", 0);
    let folded = analyzer.evaluate_default(scope, &expr);
    assert_eq!(folded.value, FoldedValue::Int(5));
    assert!(folded.foldable);
}

#[test]
fn enumerator_reference_folds_with_its_qualified_name() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"namespace","name":"paint","members":[
                {"kind":"enum","name":"Color","members":[
                    {"name":"kRed","value":1},{"name":"kBlue"}
                ]},
                {"kind":"function","name":"Fill","params":[
                    {"type":{"k":"named","path":["Color"]},
                     "default":{"e":"name","path":["Color","kBlue"]}}
                ]}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let (scope, expr) = default_of(&graph, "Fill", 0);
    let folded = analyzer.evaluate_default(scope, &expr);
    assert_eq!(
        folded.value,
        FoldedValue::EnumValue { name: "paint::Color::kBlue".into(), value: 2 }
    );
    assert!(folded.foldable);
}

#[test]
fn constexpr_member_folds_regardless_of_access() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"class","name":"Config","members":[
                {"kind":"variable","name":"kLimit","access":"private",
                 "type":{"k":"builtin","name":"int"},
                 "static":true,"constexpr":true,
                 "init":{"e":"int","value":32}}
            ]},
            {"kind":"function","name":"Resize","params":[
                {"type":{"k":"builtin","name":"int"},
                 "default":{"e":"name","path":["Config","kLimit"]}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let (scope, expr) = default_of(&graph, "Resize", 0);
    let folded = analyzer.evaluate_default(scope, &expr);
    assert_eq!(folded.value, FoldedValue::Int(32));
    assert!(folded.foldable);
}

#[test]
fn aggregate_folds_item_wise_and_inherits_unfoldability() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"function","name":"f","params":[
                {"type":{"k":"builtin","name":"int"},
                 "default":{"e":"aggregate","items":[
                    {"e":"int","value":1},
                    {"e":"call","path":["Make"]}
                 ]}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let (scope, expr) = default_of(&graph, "f", 0);
    let folded = analyzer.evaluate_default(scope, &expr);
    assert_eq!(
        folded.value,
        FoldedValue::Aggregate(vec![FoldedValue::Int(1), FoldedValue::Opaque])
    );
    assert!(!folded.foldable);
}

#[test]
fn short_circuit_or_keeps_the_value_but_marks_it_unsafe() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"function","name":"f","params":[
                {"type":{"k":"builtin","name":"bool"},
                 "default":{"e":"binary","op":"||",
                    "lhs":{"e":"call","path":["BoolFunc"]},
                    "rhs":{"e":"bool","value":true}}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let (scope, expr) = default_of(&graph, "f", 0);
    let folded = analyzer.evaluate_default(scope, &expr);
    // True whatever BoolFunc returns, but substituting the constant would
    // skip the call's side effects.
    assert_eq!(folded.value, FoldedValue::Bool(true));
    assert!(!folded.foldable);
}

#[test]
fn a_bare_call_is_opaque() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"function","name":"f","params":[
                {"type":{"k":"builtin","name":"int"},
                 "default":{"e":"call","path":["Compute"],"args":[{"e":"int","value":3}]}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let (scope, expr) = default_of(&graph, "f", 0);
    let folded = analyzer.evaluate_default(scope, &expr);
    assert_eq!(folded.value, FoldedValue::Opaque);
    assert!(!folded.foldable);
}

#[test]
fn flag_unions_over_enumerators_fold_to_an_integer() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"enum","name":"Flags","members":[
                {"name":"kRead","value":1},{"name":"kWrite","value":2}
            ]},
            {"kind":"function","name":"Open","params":[
                {"type":{"k":"builtin","name":"int"},
                 "default":{"e":"binary","op":"|",
                    "lhs":{"e":"name","path":["kRead"]},
                    "rhs":{"e":"name","path":["kWrite"]}}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let (scope, expr) = default_of(&graph, "Open", 0);
    let folded = analyzer.evaluate_default(scope, &expr);
    assert_eq!(folded.value, FoldedValue::Int(3));
    assert!(folded.foldable);
}

#[test]
fn unary_operators_fold_over_literals() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"function","name":"f","params":[
                {"type":{"k":"builtin","name":"int"},
                 "default":{"e":"unary","op":"-","operand":{"e":"int","value":5}}},
                {"type":{"k":"builtin","name":"bool"},
                 "default":{"e":"unary","op":"!","operand":{"e":"bool","value":true}}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let (scope, neg) = default_of(&graph, "f", 0);
    assert_eq!(analyzer.evaluate_default(scope, &neg).value, FoldedValue::Int(-5));
    let (scope, not) = default_of(&graph, "f", 1);
    assert_eq!(analyzer.evaluate_default(scope, &not).value, FoldedValue::Bool(false));
}

#[test]
fn a_cast_folds_through_to_its_operand() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"function","name":"f","params":[
                {"type":{"k":"builtin","name":"int64"},
                 "default":{"e":"cast","type":{"k":"builtin","name":"int64"},
                    "operand":{"e":"int","value":7}}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let (scope, expr) = default_of(&graph, "f", 0);
    let folded = analyzer.evaluate_default(scope, &expr);
    assert_eq!(folded.value, FoldedValue::Int(7));
    assert!(folded.foldable);
}

#[test]
fn evaluation_is_repeatable() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"enum","name":"Flags","members":[{"name":"kRead","value":1}]},
            {"kind":"function","name":"f","params":[
                {"type":{"k":"builtin","name":"int"},
                 "default":{"e":"name","path":["kRead"]}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let (scope, expr) = default_of(&graph, "f", 0);
    assert_eq!(
        analyzer.evaluate_default(scope, &expr),
        analyzer.evaluate_default(scope, &expr)
    );
}

#[test]
fn overflowing_arithmetic_comes_back_opaque() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"function","name":"f","params":[
                {"type":{"k":"builtin","name":"int64"},
                 "default":{"e":"binary","op":"+",
                    "lhs":{"e":"int","value":9223372036854775807},
                    "rhs":{"e":"int","value":1}}}
            ]},
            {"kind":"function","name":"g","params":[
                {"type":{"k":"builtin","name":"int64"},
                 "default":{"e":"unary","op":"-",
                    "operand":{"e":"int","value":-9223372036854775808}}}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);

    let (scope, expr) = default_of(&graph, "f", 0);
    let folded = analyzer.evaluate_default(scope, &expr);
    assert_eq!(folded.value, FoldedValue::Opaque);
    assert!(!folded.foldable);

    let (scope, expr) = default_of(&graph, "g", 0);
    let folded = analyzer.evaluate_default(scope, &expr);
    assert_eq!(folded.value, FoldedValue::Opaque);
    assert!(!folded.foldable);
}

//! End-to-end runs over whole declaration graphs.

use wrapcheck_analyzer::{
    analyze, AnalysisOutput, CallableKind, CallableRecord, ClassRecord, Ownership, ReasonCode,
    Record,
};
use wrapcheck_common::diagnostics::{DiagnosticKind, Severity};
use wrapcheck_graph::load_graph;

fn run(json: &str) -> AnalysisOutput {
    analyze(&load_graph(json).unwrap()).unwrap()
}

fn class<'a>(output: &'a AnalysisOutput, name: &str) -> &'a ClassRecord {
    output
        .records
        .iter()
        .find_map(|record| match record {
            Record::Class(class) if class.name == name => Some(class),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no class record for {name}"))
}

fn callable<'a>(output: &'a AnalysisOutput, name: &str) -> &'a CallableRecord {
    output
        .records
        .iter()
        .find_map(|record| match record {
            Record::Callable(callable) if callable.name == name => Some(callable),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no callable record for {name}"))
}

#[test]
fn a_plain_value_class_is_value_ownable() {
    let output = run(r#"{"declarations":[
        {"kind":"class","name":"Point","struct":true,"members":[
            {"kind":"field","name":"x","type":{"k":"builtin","name":"int"}},
            {"kind":"field","name":"y","type":{"k":"builtin","name":"int"}}
        ]}
    ]}"#);
    let record = class(&output, "Point");
    assert!(!record.incomplete);
    assert!(record.copyable);
    assert!(record.movable);
    assert_eq!(record.ownership, Ownership::Value);
    assert!(output.diagnostics.is_empty());
}

#[test]
fn non_public_and_deleted_callables_are_not_wrappable() {
    let output = run(r#"{"declarations":[
        {"kind":"class","name":"Widget","members":[
            {"kind":"method","name":"Internal","access":"private"},
            {"kind":"method","name":"Gone","access":"public","deleted":true},
            {"kind":"method","name":"Fine","access":"public"}
        ]}
    ]}"#);
    assert_eq!(
        callable(&output, "Widget::Internal").reason,
        Some(ReasonCode::NonPublicAccess)
    );
    assert_eq!(
        callable(&output, "Widget::Gone").reason,
        Some(ReasonCode::DeletedFunction)
    );
    assert!(callable(&output, "Widget::Fine").wrappable);
}

#[test]
fn passing_a_forward_only_class_by_value_is_rejected() {
    let output = run(r#"{"declarations":[
        {"kind":"class","name":"Opaque","definition":false},
        {"kind":"function","name":"Consume","params":[
            {"type":{"k":"named","path":["Opaque"]}}
        ]},
        {"kind":"function","name":"Borrow","params":[
            {"type":{"k":"pointer","to":{"k":"named","path":["Opaque"]}}}
        ]}
    ]}"#);
    let record = class(&output, "Opaque");
    assert!(record.incomplete);
    assert_eq!(record.ownership, Ownership::PointerOnly);

    let consume = callable(&output, "Consume");
    assert!(!consume.wrappable);
    assert_eq!(consume.reason, Some(ReasonCode::IncompleteTypeByValue));
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::IncompleteType && d.subject == "Consume"));

    // A pointer to the same class is an opaque handle and stays wrappable.
    assert!(callable(&output, "Borrow").wrappable);
}

#[test]
fn abstract_classes_may_cross_only_by_pointer() {
    let output = run(r#"{"declarations":[
        {"kind":"class","name":"Shape","members":[
            {"kind":"method","name":"Area","pure":true,"access":"public",
             "returns":{"k":"builtin","name":"double"}}
        ]},
        {"kind":"function","name":"Draw","params":[
            {"type":{"k":"named","path":["Shape"]}}
        ]},
        {"kind":"function","name":"DrawRef","params":[
            {"type":{"k":"ref","to":{"k":"named","path":["Shape"],"const":true}}}
        ]}
    ]}"#);
    let record = class(&output, "Shape");
    assert!(record.is_abstract);
    assert_eq!(record.ownership, Ownership::PointerOnly);
    assert_eq!(callable(&output, "Draw").reason, Some(ReasonCode::AbstractByValue));
    assert!(callable(&output, "DrawRef").wrappable);
}

#[test]
fn diamond_inheritance_surfaces_an_ambiguity_diagnostic() {
    let output = run(r#"{"declarations":[
        {"kind":"class","name":"grandfather","members":[
            {"kind":"method","name":"Name","access":"public"}
        ]},
        {"kind":"class","name":"grandmother","members":[
            {"kind":"method","name":"Name","access":"public"}
        ]},
        {"kind":"class","name":"multiparent","bases":[
            {"type":{"k":"named","path":["grandfather"]},"access":"public"},
            {"type":{"k":"named","path":["grandmother"]},"access":"public"}
        ]}
    ]}"#);
    let record = class(&output, "multiparent");
    let entry = record
        .inherited_members
        .iter()
        .find(|m| m.name == "Name")
        .unwrap();
    assert!(entry.ambiguous);
    assert!(entry.declared_in.is_none());
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::InheritedNameAmbiguous
            && d.subject == "multiparent"));
}

#[test]
fn deprecation_is_carried_and_warned_once_per_declaration() {
    let output = run(r#"{"declarations":[
        {"kind":"function","name":"OldApi","deprecated":"use NewApi instead"}
    ]}"#);
    let record = callable(&output, "OldApi");
    assert!(record.wrappable);
    assert_eq!(record.deprecated.as_deref(), Some("use NewApi instead"));
    let warnings: Vec<_> = output
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::Deprecated)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::Warning);
}

#[test]
fn side_effecting_defaults_warn_but_do_not_block_wrapping() {
    let output = run(r#"{"declarations":[
        {"kind":"function","name":"Configure","params":[
            {"name":"verbose","type":{"k":"builtin","name":"bool"},
             "default":{"e":"binary","op":"||",
                "lhs":{"e":"call","path":["DefaultVerbosity"]},
                "rhs":{"e":"bool","value":true}}}
        ]}
    ]}"#);
    let record = callable(&output, "Configure");
    assert!(record.wrappable);
    let default = record.params[0].default.as_ref().unwrap();
    assert!(!default.foldable);
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::NotFoldable && d.severity == Severity::Warning));
}

#[test]
fn function_templates_split_on_deducibility() {
    let output = run(r#"{"declarations":[
        {"kind":"function_template","name":"Identity","type_params":[{"name":"T"}],
         "pattern":{"kind":"function","name":"Identity",
            "returns":{"k":"param","name":"T"},
            "params":[{"type":{"k":"param","name":"T"}}]}},
        {"kind":"function_template","name":"Conjure",
         "type_params":[{"name":"A"},{"name":"B"}],
         "pattern":{"kind":"function","name":"Conjure",
            "returns":{"k":"param","name":"B"},
            "params":[{"type":{"k":"param","name":"A"}}]}}
    ]}"#);
    let identity = callable(&output, "Identity");
    assert_eq!(identity.kind, CallableKind::FunctionTemplate);
    assert!(identity.wrappable);

    let conjure = callable(&output, "Conjure");
    assert!(!conjure.wrappable);
    assert_eq!(conjure.reason, Some(ReasonCode::UndeducibleTemplateParameter));
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::DeductionFailure && d.subject == "Conjure"));
}

#[test]
fn each_overload_selects_itself_from_the_merged_set() {
    let output = run(r#"{"declarations":[
        {"kind":"function","name":"f","params":[{"type":{"k":"builtin","name":"int"}}]},
        {"kind":"function","name":"f","params":[{"type":{"k":"builtin","name":"double"}}]}
    ]}"#);
    let records: Vec<_> = output
        .records
        .iter()
        .filter_map(|record| match record {
            Record::Callable(c) => Some(c),
            _ => None,
        })
        .collect();
    assert_eq!(records.len(), 2);
    for record in records {
        assert_eq!(record.selected_overload.as_deref(), Some("f"));
        assert!(record.wrappable);
    }
    assert!(!output
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::AmbiguousOverload));
}

#[test]
fn enums_report_scoping_and_implicit_values() {
    let output = run(r#"{"declarations":[
        {"kind":"enum","name":"Mode","scoped":true,"members":[
            {"name":"kAuto"},{"name":"kManual"},{"name":"kOff","value":10},{"name":"kOn"}
        ]}
    ]}"#);
    let record = output
        .records
        .iter()
        .find_map(|r| match r {
            Record::Enum(e) if e.name == "Mode" => Some(e),
            _ => None,
        })
        .unwrap();
    assert!(record.scoped);
    assert_eq!(record.underlying, "int");
    let values: Vec<i64> = record.enumerators.iter().map(|e| e.value).collect();
    assert_eq!(values, vec![0, 1, 10, 11]);
}

#[test]
fn unresolved_parameter_types_are_reported_not_fatal() {
    let output = run(r#"{"declarations":[
        {"kind":"function","name":"Lost","params":[
            {"type":{"k":"named","path":["NoSuchType"]}}
        ]}
    ]}"#);
    let record = callable(&output, "Lost");
    assert!(!record.wrappable);
    assert_eq!(record.reason, Some(ReasonCode::UnresolvedType));
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::NameNotFound && d.subject == "Lost"));
}

#[test]
fn output_is_stable_across_runs() {
    let json = r#"{"declarations":[
        {"kind":"namespace","name":"api","members":[
            {"kind":"class","name":"Session","members":[
                {"kind":"constructor","access":"public"},
                {"kind":"method","name":"Send","access":"public","params":[
                    {"type":{"k":"builtin","name":"int"}}
                ]},
                {"kind":"method","name":"Send","access":"public","params":[
                    {"type":{"k":"builtin","name":"double"}}
                ]}
            ]},
            {"kind":"enum","name":"Status","members":[{"name":"kOk"},{"name":"kError"}]}
        ]}
    ]}"#;
    let first = serde_json::to_string(&run(json)).unwrap();
    for _ in 0..4 {
        assert_eq!(serde_json::to_string(&run(json)).unwrap(), first);
    }
}

#[test]
fn a_class_may_derive_from_a_template_instantiation() {
    let output = run(r#"{"declarations":[
        {"kind":"class_template","name":"Holder","type_params":[{"name":"T"}],
         "pattern":{"kind":"class","name":"Holder","members":[
            {"kind":"field","name":"value","type":{"k":"param","name":"T"},"access":"public"}
         ]}},
        {"kind":"class","name":"IntBox","bases":[
            {"type":{"k":"named","path":["Holder"],"args":[{"k":"builtin","name":"int"}]},
             "access":"public"}
        ],"members":[{"kind":"constructor","access":"public"}]}
    ]}"#);
    let record = class(&output, "IntBox");
    assert_eq!(record.bases.len(), 1);
    assert_eq!(record.bases[0].name, "Holder<int>");
    let value = record
        .inherited_members
        .iter()
        .find(|m| m.name == "value")
        .unwrap();
    assert!(!value.ambiguous);
    assert_eq!(value.declared_in.as_deref(), Some("Holder<int>"));
    assert_eq!(record.ownership, Ownership::Value);
    assert!(output.diagnostics.is_empty());
}

#[test]
fn by_value_instantiations_carry_their_class_constraints() {
    let output = run(r#"{"declarations":[
        {"kind":"class","name":"NoCopy","members":[
            {"kind":"constructor","access":"public"},
            {"kind":"constructor","access":"public","deleted":true,"params":[
                {"type":{"k":"ref","to":{"k":"named","path":["NoCopy"],"const":true}}}
            ]}
        ]},
        {"kind":"class_template","name":"Holder","type_params":[{"name":"T"}],
         "pattern":{"kind":"class","name":"Holder","members":[
            {"kind":"field","name":"value","type":{"k":"param","name":"T"},"access":"public"}
         ]}},
        {"kind":"function","name":"Consume","params":[
            {"type":{"k":"named","path":["Holder"],"args":[{"k":"named","path":["NoCopy"]}]}}
        ]},
        {"kind":"function","name":"Borrow","params":[
            {"type":{"k":"ref","to":{"k":"named","path":["Holder"],
             "args":[{"k":"named","path":["NoCopy"]}],"const":true}}}
        ]}
    ]}"#);
    // A field of a non-copyable type makes the whole instantiation
    // non-copyable; by value that blocks wrapping, by reference it is fine.
    let consume = callable(&output, "Consume");
    assert!(!consume.wrappable);
    assert_eq!(consume.reason, Some(ReasonCode::NonCopyableByValue));
    assert!(callable(&output, "Borrow").wrappable);
}

//! Whole-library fixtures run through the facade.
//!
//! Each fixture is a self-contained declaration graph shaped like a real
//! header surface: namespaces, classes with inheritance, operators,
//! typedefs, templates, and defaulted arguments together.

use wrapcheck::{
    analyze_json, AnalysisOutput, CallableKind, CallableRecord, ClassRecord, DiagnosticKind,
    Ownership, ReasonCode, Record,
};

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
fn a_task_library_surface_comes_out_whole() {
    let output = analyze_json(
        r#"{"declarations":[
            {"kind":"namespace","name":"tasks","members":[
                {"kind":"enum","name":"Priority","members":[
                    {"name":"kLow"},{"name":"kHigh","value":10}
                ]},
                {"kind":"class","name":"Task","members":[
                    {"kind":"constructor","access":"public","params":[
                        {"name":"priority","type":{"k":"named","path":["Priority"]},
                         "default":{"e":"name","path":["kLow"]}}
                    ]},
                    {"kind":"method","name":"Run","access":"public",
                     "returns":{"k":"builtin","name":"bool"}},
                    {"kind":"destructor","access":"public"}
                ]},
                {"kind":"typedef","name":"TaskRef",
                 "type":{"k":"ref","to":{"k":"named","path":["Task"]}}},
                {"kind":"function","name":"Submit","params":[
                    {"type":{"k":"named","path":["TaskRef"]}}
                ]}
            ]}
        ]}"#,
    )
    .unwrap();

    let task = class(&output, "tasks::Task");
    assert_eq!(task.ownership, Ownership::Value);
    assert!(task.copyable);

    let ctor = callable(&output, "tasks::Task::Task");
    assert_eq!(ctor.kind, CallableKind::Constructor);
    assert!(ctor.wrappable);
    let default = ctor.params[0].default.as_ref().unwrap();
    assert!(default.foldable);

    // The typedef in Submit's signature canonicalizes to `Task&`.
    let submit = callable(&output, "tasks::Submit");
    assert!(submit.wrappable);
    assert_eq!(submit.params[0].ty, "tasks::Task&");

    assert!(output.diagnostics.is_empty());
}

#[test]
fn member_and_free_operators_each_select_themselves() {
    let output = analyze_json(
        r#"{"declarations":[
            {"kind":"class","name":"Vec","members":[
                {"kind":"method","name":"operator==","access":"public","const":true,
                 "returns":{"k":"builtin","name":"bool"},
                 "params":[{"type":{"k":"ref","to":{"k":"named","path":["Vec"],"const":true}}}]}
            ]},
            {"kind":"function","name":"operator==",
             "returns":{"k":"builtin","name":"bool"},
             "params":[
                {"type":{"k":"ref","to":{"k":"named","path":["Vec"],"const":true}}},
                {"type":{"k":"builtin","name":"int"}}
            ]}
        ]}"#,
    )
    .unwrap();

    let member = callable(&output, "Vec::operator==");
    assert!(member.is_operator);
    assert!(member.is_const);
    assert_eq!(member.selected_overload.as_deref(), Some("Vec::operator=="));

    let free = callable(&output, "operator==");
    assert!(free.is_operator);
    assert_eq!(free.selected_overload.as_deref(), Some("operator=="));
    assert!(output.diagnostics.is_empty());
}

#[test]
fn template_arguments_in_signatures_are_validated() {
    let output = analyze_json(
        r#"{"declarations":[
            {"kind":"class_template","name":"Holder","type_params":[{"name":"T"}],
             "pattern":{"kind":"class","name":"Holder","members":[
                {"kind":"field","name":"value","type":{"k":"param","name":"T"},"access":"public"}
             ]}},
            {"kind":"function","name":"Store","params":[
                {"type":{"k":"named","path":["Holder"],"args":[{"k":"builtin","name":"int"}]}}
            ]},
            {"kind":"function","name":"Broken","params":[
                {"type":{"k":"named","path":["Holder"],
                 "args":[{"k":"builtin","name":"int"},{"k":"builtin","name":"bool"}]}}
            ]}
        ]}"#,
    )
    .unwrap();
    assert!(callable(&output, "Store").wrappable);
    assert_eq!(callable(&output, "Store").params[0].ty, "Holder<int>");
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::DeductionFailure && d.subject == "Broken"));
}

#[test]
fn movable_only_types_may_still_cross_by_value() {
    let output = analyze_json(
        r#"{"declarations":[
            {"kind":"class","name":"Buffer","members":[
                {"kind":"constructor","access":"public"},
                {"kind":"constructor","access":"public","params":[
                    {"type":{"k":"ref","rvalue":true,"to":{"k":"named","path":["Buffer"]}}}
                ]}
            ]},
            {"kind":"class","name":"Pinned","members":[
                {"kind":"constructor","access":"public"},
                {"kind":"constructor","access":"public","deleted":true,"params":[
                    {"type":{"k":"ref","to":{"k":"named","path":["Pinned"],"const":true}}}
                ]}
            ]},
            {"kind":"function","name":"MakeBuffer","returns":{"k":"named","path":["Buffer"]}},
            {"kind":"function","name":"MakePinned","returns":{"k":"named","path":["Pinned"]}}
        ]}"#,
    )
    .unwrap();

    let buffer = class(&output, "Buffer");
    assert!(!buffer.copyable);
    assert!(buffer.movable);
    assert!(callable(&output, "MakeBuffer").wrappable);

    let pinned = class(&output, "Pinned");
    assert!(!pinned.copyable);
    assert!(!pinned.movable);
    assert_eq!(
        callable(&output, "MakePinned").reason,
        Some(ReasonCode::NonCopyableByValue)
    );
}

#[test]
fn a_private_destructor_blocks_returns_by_value() {
    let output = analyze_json(
        r#"{"declarations":[
            {"kind":"class","name":"Singleton","members":[
                {"kind":"constructor","access":"public"},
                {"kind":"destructor","access":"private"}
            ]},
            {"kind":"function","name":"Get","returns":{"k":"named","path":["Singleton"]}},
            {"kind":"function","name":"GetPtr",
             "returns":{"k":"pointer","to":{"k":"named","path":["Singleton"]}}}
        ]}"#,
    )
    .unwrap();
    assert_eq!(class(&output, "Singleton").ownership, Ownership::PointerOnly);
    assert_eq!(
        callable(&output, "Get").reason,
        Some(ReasonCode::InaccessibleDestructor)
    );
    assert!(callable(&output, "GetPtr").wrappable);
}

#[test]
fn usings_pull_names_across_namespaces_in_signatures() {
    let output = analyze_json(
        r#"{"declarations":[
            {"kind":"namespace","name":"detail","members":[
                {"kind":"class","name":"Impl","members":[
                    {"kind":"constructor","access":"public"}
                ]}
            ]},
            {"kind":"namespace","name":"api","members":[
                {"kind":"using","target":["detail","Impl"],"absolute":true},
                {"kind":"function","name":"Touch","params":[
                    {"type":{"k":"ref","to":{"k":"named","path":["Impl"],"const":true}}}
                ]}
            ]}
        ]}"#,
    )
    .unwrap();
    let touch = callable(&output, "api::Touch");
    assert!(touch.wrappable);
    assert_eq!(touch.params[0].ty, "const detail::Impl&");
}

#[test]
fn virtual_bases_keep_the_diamond_unambiguous() {
    let output = analyze_json(
        r#"{"declarations":[
            {"kind":"class","name":"Device","members":[
                {"kind":"method","name":"Id","access":"public",
                 "returns":{"k":"builtin","name":"int"}}
            ]},
            {"kind":"class","name":"Reader","bases":[
                {"type":{"k":"named","path":["Device"]},"access":"public","virtual":true}
            ]},
            {"kind":"class","name":"Writer","bases":[
                {"type":{"k":"named","path":["Device"]},"access":"public","virtual":true}
            ]},
            {"kind":"class","name":"Transceiver","bases":[
                {"type":{"k":"named","path":["Reader"]},"access":"public"},
                {"type":{"k":"named","path":["Writer"]},"access":"public"}
            ]}
        ]}"#,
    )
    .unwrap();
    let record = class(&output, "Transceiver");
    let id = record
        .inherited_members
        .iter()
        .find(|m| m.name == "Id")
        .unwrap();
    assert!(!id.ambiguous);
    assert_eq!(id.declared_in.as_deref(), Some("Device"));
    assert!(!output
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::InheritedNameAmbiguous));
}

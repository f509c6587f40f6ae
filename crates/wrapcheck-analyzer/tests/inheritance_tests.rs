use super::*;
use crate::analyzer::Analyzer;
use wrapcheck_graph::{load_graph, DeclGraph, DeclId};

fn class_id(graph: &DeclGraph, name: &str) -> DeclId {
    graph
        .ids()
        .find(|&id| graph.qualified_name(id) == name && graph.decl(id).class().is_some())
        .unwrap_or_else(|| panic!("no class named {name}"))
}

const DIAMOND: &str = r#"{"declarations":[
    {"kind":"class","name":"grandfather","members":[
        {"kind":"method","name":"Name","access":"public"}
    ]},
    {"kind":"class","name":"grandmother","members":[
        {"kind":"method","name":"Name","access":"public"},
        {"kind":"method","name":"OnlyHers","access":"public"}
    ]},
    {"kind":"class","name":"multiparent","bases":[
        {"type":{"k":"named","path":["grandfather"]},"access":"public"},
        {"type":{"k":"named","path":["grandmother"]},"access":"public"}
    ]},
    {"kind":"class","name":"multichild","bases":[
        {"type":{"k":"named","path":["multiparent"]},"access":"public"}
    ]}
]}"#;

#[test]
fn non_virtual_diamond_keeps_independent_instances_and_flags_collisions() {
    let graph = load_graph(DIAMOND).unwrap();
    let analyzer = Analyzer::new(&graph);
    let map = analyzer.inheritance(class_id(&graph, "multichild")).unwrap();

    // multiparent, grandfather, grandmother: three base instances.
    assert_eq!(map.bases.len(), 3);

    let name = graph.names.intern("Name");
    match map.members.get(&name) {
        Some(InheritedMember::Ambiguous { declared_in }) => {
            assert_eq!(declared_in.len(), 2);
        }
        other => panic!("expected ambiguity for Name, got {other:?}"),
    }
    // A name only one base declares stays unique.
    let only_hers = graph.names.intern("OnlyHers");
    assert!(matches!(
        map.members.get(&only_hers),
        Some(InheritedMember::Unique { .. })
    ));
}

#[test]
fn redeclaration_in_the_derived_class_resolves_the_collision() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"class","name":"grandfather","members":[
                {"kind":"method","name":"Name","access":"public"}
            ]},
            {"kind":"class","name":"grandmother","members":[
                {"kind":"method","name":"Name","access":"public"}
            ]},
            {"kind":"class","name":"multiparent",
             "bases":[
                {"type":{"k":"named","path":["grandfather"]},"access":"public"},
                {"type":{"k":"named","path":["grandmother"]},"access":"public"}
             ],
             "members":[{"kind":"method","name":"Name","access":"public"}]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let map = analyzer.inheritance(class_id(&graph, "multiparent")).unwrap();
    let name = graph.names.intern("Name");
    assert!(map.members.get(&name).is_none());
}

#[test]
fn virtual_base_collapses_to_a_single_instance() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"class","name":"greatgrandparent","members":[
                {"kind":"method","name":"Legacy","access":"public"}
            ]},
            {"kind":"class","name":"left","bases":[
                {"type":{"k":"named","path":["greatgrandparent"]},"access":"public","virtual":true}
            ]},
            {"kind":"class","name":"right","bases":[
                {"type":{"k":"named","path":["greatgrandparent"]},"access":"public","virtual":true}
            ]},
            {"kind":"class","name":"joined","bases":[
                {"type":{"k":"named","path":["left"]},"access":"public"},
                {"type":{"k":"named","path":["right"]},"access":"public"}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let map = analyzer.inheritance(class_id(&graph, "joined")).unwrap();

    let shared: Vec<_> = map
        .bases
        .iter()
        .filter(|b| graph.qualified_name(b.decl) == "greatgrandparent")
        .collect();
    assert_eq!(shared.len(), 1);
    assert!(shared[0].is_virtual);

    // Exactly one copy of the shared base's members, never two.
    let legacy = graph.names.intern("Legacy");
    assert!(matches!(
        map.members.get(&legacy),
        Some(InheritedMember::Unique { .. })
    ));
}

#[test]
fn private_bases_do_not_promote_members() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"class","name":"Base","members":[
                {"kind":"method","name":"Helper","access":"public"}
            ]},
            {"kind":"class","name":"Derived","bases":[
                {"type":{"k":"named","path":["Base"]},"access":"private"}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let map = analyzer.inheritance(class_id(&graph, "Derived")).unwrap();
    assert_eq!(map.bases.len(), 1);
    assert!(!map.bases[0].access.is_public());
    let helper = graph.names.intern("Helper");
    assert!(map.members.get(&helper).is_none());
}

#[test]
fn derived_name_hides_the_same_name_further_up_its_path() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"class","name":"Top","members":[
                {"kind":"method","name":"Shadowed","access":"public"}
            ]},
            {"kind":"class","name":"Middle",
             "bases":[{"type":{"k":"named","path":["Top"]},"access":"public"}],
             "members":[{"kind":"method","name":"Shadowed","access":"public"}]},
            {"kind":"class","name":"Bottom","bases":[
                {"type":{"k":"named","path":["Middle"]},"access":"public"}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let map = analyzer.inheritance(class_id(&graph, "Bottom")).unwrap();
    let shadowed = graph.names.intern("Shadowed");
    match map.members.get(&shadowed) {
        Some(InheritedMember::Unique { declared_in, .. }) => {
            assert_eq!(graph.qualified_name(*declared_in), "Middle");
        }
        other => panic!("expected Middle's declaration to win, got {other:?}"),
    }
}

#[test]
fn cyclic_bases_are_a_fatal_inconsistency() {
    let graph = load_graph(
        r#"{"declarations":[
            {"kind":"class","name":"Ouroboros","bases":[
                {"type":{"k":"named","path":["Ouroboros"]},"access":"public"}
            ]}
        ]}"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&graph);
    let err = analyzer.inheritance(class_id(&graph, "Ouroboros")).unwrap_err();
    assert!(err.kind.is_fatal());
}

//! Apply-engine integration tests: write/merge/delete, choice enforcement,
//! constraints, and versioned structural sharing.

#[path = "helpers/source_fixtures.rs"]
mod source_fixtures;

use std::sync::Arc;

use yangine::apply::DataTree;
use yangine::base::{QName, QNameModule, XmlNamespace};
use yangine::error::SchemaViolation;
use yangine::reactor::compile;
use yangine::tree::{
    InstancePath, ListEntryId, NormalizedNode, PathArgument, TreeNode, Value,
};

use source_fixtures::*;

fn ch(name: &str) -> QName {
    QName::new(
        QNameModule::new(XmlNamespace::new("urn:example:choice"), None),
        name,
    )
}

fn sys(name: &str) -> QName {
    QName::new(
        QNameModule::new(XmlNamespace::new("urn:example:system"), None),
        name,
    )
}

fn node_path(steps: &[QName]) -> InstancePath {
    InstancePath::of(steps.iter().cloned().map(PathArgument::Node))
}

fn choice_tree() -> DataTree {
    DataTree::new(&compile(&[("choice.yang", CHOICE_MODULE)]).unwrap())
}

fn system_tree() -> DataTree {
    DataTree::new(&compile(&[("system.yang", SYSTEM_MODULE)]).unwrap())
}

fn server_entry(name: &str, address: &str) -> NormalizedNode {
    NormalizedNode::list_entry(
        ListEntryId::new(sys("server"), vec![(sys("name"), name.into())]),
        [
            NormalizedNode::leaf(sys("name"), name),
            NormalizedNode::leaf(sys("address"), address),
        ],
    )
}

fn apply_to(tree: &mut DataTree, build: impl FnOnce(&mut yangine::apply::DataTreeModification)) -> Result<Arc<TreeNode>, SchemaViolation> {
    let mut tx = tree.snapshot().new_modification();
    build(&mut tx);
    tx.seal();
    let candidate = tx.apply()?;
    tree.commit(Arc::clone(&candidate));
    Ok(candidate)
}

// ============================================================================
// CHOICE CASE ENFORCEMENT
// ============================================================================

#[test]
fn test_choice_rejects_children_of_two_cases() {
    let mut tree = choice_tree();
    let result = apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[ch("settings"), ch("transport")]),
            NormalizedNode::choice(
                ch("transport"),
                [
                    NormalizedNode::leaf(ch("x"), 1u64),
                    NormalizedNode::leaf(ch("y"), 2u64),
                ],
            ),
        );
    });
    let err = result.unwrap_err();
    assert!(matches!(err, SchemaViolation::CaseExclusion { .. }));
    let text = err.to_string();
    assert!(text.contains('x') && text.contains('y'), "{text}");
}

#[test]
fn test_choice_write_and_replace() {
    let mut tree = choice_tree();
    apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[ch("settings"), ch("transport")]),
            NormalizedNode::choice(ch("transport"), [NormalizedNode::leaf(ch("x"), 1u64)]),
        );
    })
    .unwrap();

    // a second write replaces the choice entirely, switching cases
    let candidate = apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[ch("settings"), ch("transport")]),
            NormalizedNode::choice(ch("transport"), [NormalizedNode::leaf(ch("y"), 2u64)]),
        );
    })
    .unwrap();

    let settings = candidate
        .child(&PathArgument::Node(ch("settings")))
        .unwrap();
    let transport = settings.child(&PathArgument::Node(ch("transport"))).unwrap();
    assert!(transport.child(&PathArgument::Node(ch("y"))).is_some());
    assert!(transport.child(&PathArgument::Node(ch("x"))).is_none());
}

#[test]
fn test_choice_merge_cannot_mix_cases() {
    let mut tree = choice_tree();
    apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[ch("settings"), ch("transport")]),
            NormalizedNode::choice(ch("transport"), [NormalizedNode::leaf(ch("x"), 1u64)]),
        );
    })
    .unwrap();

    let result = apply_to(&mut tree, |tx| {
        tx.merge(
            &node_path(&[ch("settings"), ch("transport")]),
            NormalizedNode::choice(ch("transport"), [NormalizedNode::leaf(ch("y"), 2u64)]),
        );
    });
    assert!(matches!(result, Err(SchemaViolation::CaseExclusion { .. })));
}

#[test]
fn test_choice_rejects_unknown_child() {
    let mut tree = choice_tree();
    let result = apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[ch("settings"), ch("transport")]),
            NormalizedNode::choice(
                ch("transport"),
                [NormalizedNode::leaf(ch("stranger"), 1u64)],
            ),
        );
    });
    assert!(result.is_err());
}

// ============================================================================
// STRUCTURE, TYPES, CONSTRAINTS
// ============================================================================

#[test]
fn test_write_outside_the_schema_is_a_mismatch() {
    let mut tree = system_tree();
    let result = apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[sys("system"), sys("no-such-leaf")]),
            NormalizedNode::leaf(sys("no-such-leaf"), "x"),
        );
    });
    match result {
        Err(SchemaViolation::SchemaMismatch { detail, .. }) => {
            assert!(detail.contains("schema mismatch"), "{detail}");
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
}

#[test]
fn test_container_write_enforces_mandatory_leaf() {
    let mut tree = system_tree();
    let result = apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[sys("system")]),
            NormalizedNode::container(sys("system"), []),
        );
    });
    assert!(matches!(result, Err(SchemaViolation::MandatoryMissing { .. })));
}

#[test]
fn test_leaf_type_checks() {
    let mut tree = system_tree();
    // pattern violation
    let result = apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[sys("system"), sys("hostname")]),
            NormalizedNode::leaf(sys("hostname"), "not a hostname!"),
        );
    });
    assert!(matches!(result, Err(SchemaViolation::TypeCheck { .. })));

    // valid value passes
    apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[sys("system"), sys("hostname")]),
            NormalizedNode::leaf(sys("hostname"), "web-01.example"),
        );
    })
    .unwrap();

    // range violation inside a list entry
    let result = apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[sys("system"), sys("server")]),
            NormalizedNode::list(
                sys("server"),
                [NormalizedNode::list_entry(
                    ListEntryId::new(sys("server"), vec![(sys("name"), "s1".into())]),
                    [
                        NormalizedNode::leaf(sys("name"), "s1"),
                        NormalizedNode::leaf(sys("port"), Value::Uint(0)),
                    ],
                )],
            ),
        );
    });
    assert!(matches!(result, Err(SchemaViolation::TypeCheck { .. })));
}

#[test]
fn test_list_max_elements() {
    let mut tree = system_tree();
    let entries: Vec<NormalizedNode> = (0..4)
        .map(|i| server_entry(&format!("s{i}"), &format!("10.0.0.{i}")))
        .collect();
    let result = apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[sys("system"), sys("server")]),
            NormalizedNode::list(sys("server"), entries),
        );
    });
    assert!(matches!(result, Err(SchemaViolation::Cardinality { .. })));
}

#[test]
fn test_list_unique_constraint() {
    let mut tree = system_tree();
    let result = apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[sys("system"), sys("server")]),
            NormalizedNode::list(
                sys("server"),
                [
                    server_entry("s1", "10.0.0.1"),
                    server_entry("s2", "10.0.0.1"),
                ],
            ),
        );
    });
    let err = result.unwrap_err();
    assert!(matches!(err, SchemaViolation::Unique { .. }), "{err}");
}

#[test]
fn test_list_entry_key_must_match_identifier() {
    let mut tree = system_tree();
    let result = apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[sys("system"), sys("server")]),
            NormalizedNode::list(
                sys("server"),
                [NormalizedNode::list_entry(
                    ListEntryId::new(sys("server"), vec![(sys("name"), "s1".into())]),
                    [
                        NormalizedNode::leaf(sys("name"), "different"),
                        NormalizedNode::leaf(sys("address"), "10.0.0.1"),
                    ],
                )],
            ),
        );
    });
    assert!(matches!(result, Err(SchemaViolation::SchemaMismatch { .. })));
}

// ============================================================================
// MERGE / DELETE / VERSIONING
// ============================================================================

#[test]
fn test_merge_unions_children() {
    let mut tree = system_tree();
    apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[sys("system"), sys("hostname")]),
            NormalizedNode::leaf(sys("hostname"), "web-01"),
        );
    })
    .unwrap();

    let candidate = apply_to(&mut tree, |tx| {
        tx.merge(
            &node_path(&[sys("system")]),
            NormalizedNode::container(
                sys("system"),
                [NormalizedNode::list(
                    sys("server"),
                    [server_entry("s1", "10.0.0.1")],
                )],
            ),
        );
    })
    .unwrap();

    let system = candidate.child(&PathArgument::Node(sys("system"))).unwrap();
    // merged child arrived, earlier leaf survived
    assert!(system.child(&PathArgument::Node(sys("server"))).is_some());
    let hostname = system.child(&PathArgument::Node(sys("hostname"))).unwrap();
    assert_eq!(hostname.data().value(), Some(&Value::str("web-01")));
}

#[test]
fn test_delete_prunes_empty_nonpresence_ancestors() {
    let mut tree = system_tree();
    apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[sys("system"), sys("hostname")]),
            NormalizedNode::leaf(sys("hostname"), "web-01"),
        );
    })
    .unwrap();

    let candidate = apply_to(&mut tree, |tx| {
        tx.delete(&node_path(&[sys("system"), sys("hostname")]));
    })
    .unwrap();
    // the system container became semantically empty and was pruned
    assert!(candidate.child(&PathArgument::Node(sys("system"))).is_none());
}

#[test]
fn test_unchanged_subtrees_are_shared_between_versions() {
    let mut tree = system_tree();
    apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[sys("system"), sys("hostname")]),
            NormalizedNode::leaf(sys("hostname"), "web-01"),
        );
        tx.write(
            &node_path(&[sys("system"), sys("server")]),
            NormalizedNode::list(sys("server"), [server_entry("s1", "10.0.0.1")]),
        );
    })
    .unwrap();
    let before = Arc::clone(tree.root());

    let mut tx = tree.snapshot().new_modification();
    tx.write(
        &node_path(&[sys("system"), sys("hostname")]),
        NormalizedNode::leaf(sys("hostname"), "web-02"),
    );
    tx.seal();
    let version = tx.version();
    let candidate = tx.apply().unwrap();

    let system_before = before.child(&PathArgument::Node(sys("system"))).unwrap();
    let system_after = candidate.child(&PathArgument::Node(sys("system"))).unwrap();

    // the untouched server list is the same allocation in both versions
    let server_before = system_before.child(&PathArgument::Node(sys("server"))).unwrap();
    let server_after = system_after.child(&PathArgument::Node(sys("server"))).unwrap();
    assert!(Arc::ptr_eq(server_before, server_after));

    // subtree versions advanced along the changed spine only
    assert_eq!(system_after.subtree_version(), version);
    assert!(server_after.subtree_version() < version);
    let hostname = system_after.child(&PathArgument::Node(sys("hostname"))).unwrap();
    assert_eq!(hostname.version(), version);
}

#[test]
fn test_sealed_modification_rejects_further_writes() {
    let mut tree = system_tree();
    let snapshot = tree.snapshot();
    let mut tx = snapshot.new_modification();
    tx.seal();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        tx.write(
            &node_path(&[sys("system"), sys("hostname")]),
            NormalizedNode::leaf(sys("hostname"), "web-01"),
        );
    }));
    assert!(result.is_err());
    let _ = &mut tree;
}

#[test]
fn test_two_transactions_from_one_snapshot_are_isolated() {
    let mut tree = system_tree();
    apply_to(&mut tree, |tx| {
        tx.write(
            &node_path(&[sys("system"), sys("hostname")]),
            NormalizedNode::leaf(sys("hostname"), "web-01"),
        );
    })
    .unwrap();

    let snapshot = tree.snapshot();
    let mut tx1 = snapshot.new_modification();
    tx1.write(
        &node_path(&[sys("system"), sys("hostname")]),
        NormalizedNode::leaf(sys("hostname"), "a"),
    );
    tx1.seal();
    let mut tx2 = snapshot.new_modification();
    tx2.write(
        &node_path(&[sys("system"), sys("hostname")]),
        NormalizedNode::leaf(sys("hostname"), "b"),
    );
    tx2.seal();

    // both succeed in isolation against the same base
    let r1 = tx1.apply().unwrap();
    let r2 = tx2.apply().unwrap();
    let read = |root: &Arc<TreeNode>| {
        root.child(&PathArgument::Node(sys("system")))
            .unwrap()
            .child(&PathArgument::Node(sys("hostname")))
            .unwrap()
            .data()
            .value()
            .cloned()
    };
    assert_eq!(read(&r1), Some(Value::str("a")));
    assert_eq!(read(&r2), Some(Value::str("b")));
}

//! Inference-stack integration tests: navigation, identifiers, path and
//! leafref resolution.

#[path = "helpers/source_fixtures.rs"]
mod source_fixtures;

use once_cell::sync::Lazy;

use yangine::base::{QName, QNameModule, XmlNamespace};
use yangine::error::StackError;
use yangine::model::BuiltinType;
use yangine::reactor::compile;
use yangine::schema::{EffectiveModelContext, InferenceStack};

use source_fixtures::*;

static BGP_MODEL: Lazy<EffectiveModelContext> = Lazy::new(|| {
    compile(&[
        ("ni.yang", NETWORK_INSTANCE_MODULE),
        ("bgp.yang", BGP_MODULE),
    ])
    .unwrap()
});

fn ni(name: &str) -> QName {
    QName::new(
        QNameModule::new(XmlNamespace::new("urn:example:network-instance"), None),
        name,
    )
}

fn bgp(name: &str) -> QName {
    QName::new(
        QNameModule::new(XmlNamespace::new("urn:example:bgp"), None),
        name,
    )
}

fn ch(name: &str) -> QName {
    QName::new(
        QNameModule::new(XmlNamespace::new("urn:example:choice"), None),
        name,
    )
}

/// The augmented BGP subtree is reachable with successive data-tree steps,
/// crossing from the base module's namespace into the augmenting module's.
#[test]
fn test_augmented_path_is_resolvable_by_data_steps() {
    let mut stack = InferenceStack::new(&BGP_MODEL);
    for step in [
        ni("network-instances"),
        ni("network-instance"),
        ni("protocols"),
        ni("protocol"),
        bgp("bgp"),
        bgp("neighbors"),
        bgp("neighbor"),
        bgp("afi-safis"),
        bgp("afi-safi"),
    ] {
        stack.enter_data_tree(&step).unwrap();
    }
    let leaf = stack.enter_data_tree(&bgp("afi-safi-name")).unwrap();
    assert_eq!(leaf.type_def().unwrap().base, BuiltinType::String);

    let id = stack.to_schema_node_identifier().unwrap();
    assert_eq!(
        id.to_string(),
        "/network-instances/network-instance/protocols/protocol/bgp/neighbors/neighbor/afi-safis/afi-safi/afi-safi-name"
    );
}

/// `ofInference(s.toInference())` converts to the same identifier as `s`.
#[test]
fn test_stack_round_trips_through_inference() {
    let mut stack = InferenceStack::new(&BGP_MODEL);
    for step in [
        ni("network-instances"),
        ni("network-instance"),
        ni("protocols"),
        ni("protocol"),
        bgp("bgp"),
    ] {
        stack.enter_data_tree(&step).unwrap();
    }
    let inference = stack.to_inference();
    let mut restored = InferenceStack::from_inference(&BGP_MODEL, &inference);
    assert_eq!(
        restored.to_schema_node_identifier().unwrap(),
        stack.to_schema_node_identifier().unwrap()
    );
}

#[test]
fn test_missing_child_is_reported_with_parent() {
    let mut stack = InferenceStack::new(&BGP_MODEL);
    stack.enter_data_tree(&ni("network-instances")).unwrap();
    let err = stack.enter_data_tree(&ni("no-such-node")).unwrap_err();
    assert!(matches!(err, StackError::NotFound { .. }));
    assert!(err.to_string().contains("no-such-node"));
    // failed step leaves the stack where it was
    assert_eq!(stack.depth(), 1);
}

#[test]
fn test_exit_of_empty_stack_is_illegal_state() {
    let mut stack = InferenceStack::new(&BGP_MODEL);
    assert!(matches!(
        stack.exit(),
        Err(StackError::IllegalState(_))
    ));
}

#[test]
fn test_enter_choice_and_reconstruction() {
    let model = compile(&[("choice.yang", CHOICE_MODULE)]).unwrap();

    // schema steps land on the choice explicitly
    let mut stack = InferenceStack::new(&model);
    stack.enter_schema_tree(&ch("settings")).unwrap();
    let choice = stack.enter_choice(&ch("transport")).unwrap();
    assert!(choice.is(yangine::model::YangKeyword::Choice));

    // entering something that is not a choice undoes the step
    let mut stack = InferenceStack::new(&model);
    let err = stack.enter_choice(&ch("settings")).unwrap_err();
    assert!(matches!(err, StackError::IllegalState(_)));
    assert!(stack.is_empty());

    // a data step elides choice and case; the identifier reconstructs them
    let mut stack = InferenceStack::new(&model);
    stack.enter_data_tree(&ch("settings")).unwrap();
    stack.enter_data_tree(&ch("x")).unwrap();
    assert_eq!(stack.depth(), 2);
    let id = stack.to_schema_node_identifier().unwrap();
    assert_eq!(id.to_string(), "/settings/transport/a/x");
}

#[test]
fn test_exit_to_data_tree_asserts_data_statements() {
    let model = compile(&[("choice.yang", CHOICE_MODULE)]).unwrap();
    let mut stack = InferenceStack::new(&model);
    stack.enter_data_tree(&ch("settings")).unwrap();
    stack.enter_data_tree(&ch("x")).unwrap();
    // x pops back to settings: both are data nodes
    let popped = stack.exit_to_data_tree().unwrap();
    assert_eq!(popped.qname().unwrap().local_name(), "x");

    // from a schema position inside the choice, the data-tree exit refuses
    let mut stack = InferenceStack::new(&model);
    stack.enter_schema_tree(&ch("settings")).unwrap();
    stack.enter_schema_tree(&ch("transport")).unwrap();
    assert!(matches!(
        stack.exit_to_data_tree(),
        Err(StackError::IllegalState(_))
    ));
}

#[test]
fn test_grouping_steps_forbid_identifiers() {
    let mut stack = InferenceStack::new(&BGP_MODEL);
    stack
        .enter_grouping(&bgp("afi-safi-list"))
        .unwrap();
    assert!(!stack.in_instantiated_context());
    stack.enter_schema_tree(&bgp("afi-safis")).unwrap();
    assert!(matches!(
        stack.to_schema_node_identifier(),
        Err(StackError::IllegalState(_))
    ));
    // popping back out of the grouping restores instantiated context
    stack.exit().unwrap();
    stack.exit().unwrap();
    assert!(stack.in_instantiated_context());
}

#[test]
fn test_leafref_resolution_caches_target_types() {
    let model = compile(&[("leafref.yang", LEAFREF_MODULE)]).unwrap();
    let module = model.module_by_name("example-leafref").unwrap();
    let lr = |name: &str| {
        QName::new(
            QNameModule::new(XmlNamespace::new("urn:example:leafref"), None),
            name,
        )
    };
    let state = module.stmt().data_child(&lr("state")).unwrap();

    let primary = state.data_child(&lr("primary-interface")).unwrap();
    let resolved = primary.type_def().unwrap().leafref_target().unwrap();
    assert_eq!(resolved.base, BuiltinType::String);

    // deref(../primary-interface)/../mtu lands on the uint16 leaf
    let mtu = state.data_child(&lr("primary-mtu")).unwrap();
    let resolved = mtu.type_def().unwrap().leafref_target().unwrap();
    assert_eq!(resolved.base, BuiltinType::Uint16);
}

#[test]
fn test_leafref_cycle_is_rejected() {
    let err = compile(&[("cycle.yang", LEAFREF_CYCLE_MODULE)]).unwrap_err();
    assert!(err.to_string().contains("loops through"), "{err}");
}

/// `deref` of an instance-identifier leaf has no static semantics; the
/// condition is recoverable and must not fail the compile.
#[test]
fn test_deref_of_instance_identifier_is_recoverable() {
    let source = r#"
    module example-deref-ii {
        yang-version 1.1;
        namespace "urn:example:deref-ii";
        prefix dii;

        container refs {
            leaf anchor { type instance-identifier; }
            leaf via {
                type leafref {
                    path "deref(../anchor)/../anchor";
                }
            }
        }
    }
    "#;
    let model = compile(&[("deref-ii.yang", source)]).unwrap();
    let module = model.module_by_name("example-deref-ii").unwrap();
    let q = |name: &str| {
        QName::new(
            QNameModule::new(XmlNamespace::new("urn:example:deref-ii"), None),
            name,
        )
    };
    let via = module
        .stmt()
        .data_child(&q("refs"))
        .unwrap()
        .data_child(&q("via"))
        .unwrap();
    // resolution was skipped, not failed
    assert!(via.type_def().unwrap().leafref_target().is_none());
}

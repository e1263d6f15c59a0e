//! Feature selection: if-feature elision and re-filtering.

#[path = "helpers/source_fixtures.rs"]
mod source_fixtures;

use yangine::base::{QName, QNameModule, XmlNamespace};
use yangine::model::YangKeyword;
use yangine::reactor::{FeatureSet, ReactorBuilder};

use source_fixtures::*;

fn exf(name: &str) -> QName {
    QName::new(
        QNameModule::new(XmlNamespace::new("urn:example:features"), None),
        name,
    )
}

fn compile_with(features: FeatureSet) -> yangine::schema::EffectiveModelContext {
    ReactorBuilder::new()
        .add_source("features.yang", FEATURES_MODULE)
        .features(features)
        .build()
        .unwrap()
}

#[test]
fn test_all_features_keep_the_augmentation() {
    let model = compile_with(FeatureSet::All);
    let module = model.module_by_name("example-features").unwrap();
    let target = module.stmt().data_child(&exf("target")).unwrap();
    let my_con = target.data_child(&exf("my-con")).unwrap();
    assert_eq!(my_con.description(), Some("New description"));
}

#[test]
fn test_empty_feature_set_elides_the_augmentation() {
    let model = compile_with(FeatureSet::none());
    let module = model.module_by_name("example-features").unwrap();
    let target = module.stmt().data_child(&exf("target")).unwrap();
    assert!(target.data_child(&exf("my-con")).is_none());
    // the gated augment statement itself is gone from the effective module
    assert_eq!(module.stmt().find_all(YangKeyword::Augment).count(), 0);
}

#[test]
fn test_explicit_feature_set_enables_the_augmentation() {
    let model = compile_with(FeatureSet::of([exf("my-feature")]));
    let module = model.module_by_name("example-features").unwrap();
    let target = module.stmt().data_child(&exf("target")).unwrap();
    assert!(target.data_child(&exf("my-con")).is_some());
}

/// Compiling with feature set F and then re-filtering with F is the
/// identity.
#[test]
fn test_feature_filtering_is_idempotent() {
    for features in [FeatureSet::All, FeatureSet::none(), FeatureSet::of([exf("my-feature")])] {
        let model = compile_with(features.clone());
        let refiltered = model.filter_features(&features);
        let before = model.module_by_name("example-features").unwrap();
        let after = refiltered.module_by_name("example-features").unwrap();
        assert_eq!(before.stmt(), after.stmt());
    }
}

/// Re-filtering an all-features model with an empty set removes the same
/// statements one compile with the empty set would have removed.
#[test]
fn test_refilter_matches_compile() {
    let full = compile_with(FeatureSet::All);
    let refiltered = full.filter_features(&FeatureSet::none());
    let direct = compile_with(FeatureSet::none());
    assert_eq!(
        refiltered
            .module_by_name("example-features")
            .unwrap()
            .stmt(),
        direct.module_by_name("example-features").unwrap().stmt()
    );
}

#[test]
fn test_unknown_feature_reference_fails_the_compile() {
    let source = r#"
    module example-unknown-feature {
        yang-version 1.1;
        namespace "urn:example:unknown-feature";
        prefix uf;

        container c {
            if-feature "no-such-feature";
            leaf l { type string; }
        }
    }
    "#;
    let err = ReactorBuilder::new()
        .add_source("unknown.yang", source)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("unknown feature"), "{err}");
}

#[test]
fn test_feature_gating_through_feature_references() {
    // ssh depends on networking; enabling only ssh leaves it disabled
    let source = r#"
    module example-chained {
        yang-version 1.1;
        namespace "urn:example:chained";
        prefix chn;

        feature networking;
        feature ssh {
            if-feature "networking";
        }

        container ssh-server {
            if-feature "ssh";
        }
    }
    "#;
    let chained = |features: FeatureSet| {
        ReactorBuilder::new()
            .add_source("chained.yang", source)
            .features(features)
            .build()
            .unwrap()
    };
    let q = |name: &str| {
        QName::new(
            QNameModule::new(XmlNamespace::new("urn:example:chained"), None),
            name,
        )
    };

    let model = chained(FeatureSet::of([q("ssh")]));
    let module = model.module_by_name("example-chained").unwrap();
    assert!(module.stmt().data_child(&q("ssh-server")).is_none());

    let model = chained(FeatureSet::of([q("ssh"), q("networking")]));
    let module = model.module_by_name("example-chained").unwrap();
    assert!(module.stmt().data_child(&q("ssh-server")).is_some());
}

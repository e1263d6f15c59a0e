//! Reactor integration tests: linkage, expansion, cardinality, failure
//! aggregation.

#[path = "helpers/source_fixtures.rs"]
mod source_fixtures;

use std::collections::HashSet;
use std::sync::Arc;

use yangine::base::{QName, QNameModule, SchemaNodeId, XmlNamespace};
use yangine::model::{BuiltinType, EffectiveStmt, StmtFlags, YangKeyword};
use yangine::reactor::compile;

use source_fixtures::*;

fn qname(namespace: &str, name: &str) -> QName {
    QName::new(QNameModule::new(XmlNamespace::new(namespace), None), name)
}

#[test]
fn test_compile_minimal_module() {
    let model = compile(&[("minimal.yang", MINIMAL_MODULE)]).unwrap();
    let module = model.module_by_name("minimal").unwrap();
    assert_eq!(module.prefix(), "min");
    assert_eq!(module.module().namespace().as_str(), "urn:example:minimal");

    let state = module
        .stmt()
        .data_child(&qname("urn:example:minimal", "state"))
        .unwrap();
    assert!(state.is(YangKeyword::Container));
    assert_eq!(
        state.schema_path().unwrap().to_string(),
        "/state"
    );
    let up = state
        .data_child(&qname("urn:example:minimal", "up"))
        .unwrap();
    assert_eq!(up.type_def().unwrap().base, BuiltinType::Boolean);
}

#[test]
fn test_typedef_chain_merges_restrictions() {
    let model = compile(&[("types.yang", TYPES_MODULE)]).unwrap();
    let module = model.module_by_name("example-types").unwrap();
    let load = module
        .stmt()
        .data_child(&qname("urn:example:types", "load"))
        .unwrap();
    let ty = load.type_def().unwrap();
    assert_eq!(ty.base, BuiltinType::Uint8);
    assert_eq!(ty.name, "half-percent");
    assert_eq!(ty.ranges.as_deref(), Some(&[(0, 50)][..]));
    assert_eq!(ty.units.as_deref(), Some("percent"));
}

#[test]
fn test_uses_expansion_with_refine() {
    let source = r#"
    module example-refine {
        yang-version 1.1;
        namespace "urn:example:refine";
        prefix rf;

        grouping endpoint {
            leaf host { type string; }
            leaf port { type uint16; }
        }

        container peer {
            uses endpoint {
                refine "host" { mandatory true; }
            }
        }
    }
    "#;
    let model = compile(&[("refine.yang", source)]).unwrap();
    let module = model.module_by_name("example-refine").unwrap();
    let peer = module
        .stmt()
        .data_child(&qname("urn:example:refine", "peer"))
        .unwrap();
    // grouping content instantiated into the using module's namespace
    let host = peer
        .data_child(&qname("urn:example:refine", "host"))
        .unwrap();
    assert!(host.flags().contains(StmtFlags::MANDATORY));
    let port = peer
        .data_child(&qname("urn:example:refine", "port"))
        .unwrap();
    assert!(!port.flags().contains(StmtFlags::MANDATORY));
}

#[test]
fn test_grouping_using_itself_is_a_cycle() {
    let source = r#"
    module example-cycle {
        yang-version 1.1;
        namespace "urn:example:cycle";
        prefix cy;

        grouping g {
            container inner {
                uses g;
            }
        }

        uses g;
    }
    "#;
    let err = compile(&[("cycle.yang", source)]).unwrap_err();
    assert!(err.to_string().contains("uses itself"), "{err}");
}

#[test]
fn test_unresolved_import_lists_missing_prerequisite() {
    let source = r#"
    module example-importer {
        yang-version 1.1;
        namespace "urn:example:importer";
        prefix imp;

        import nowhere-to-be-found { prefix nf; }
    }
    "#;
    let err = compile(&[("importer.yang", source)]).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("import of module 'nowhere-to-be-found'"), "{text}");
    assert!(text.contains("module 'nowhere-to-be-found'"), "{text}");
}

#[test]
fn test_substatement_validator_rejects_type_under_revision() {
    let source = r#"
    module example-bad {
        yang-version 1.1;
        namespace "urn:example:bad";
        prefix bad;

        revision 2024-01-01 {
            type string;
        }
    }
    "#;
    let err = compile(&[("bad.yang", source)]).unwrap_err();
    assert!(
        err.to_string().contains("TYPE is not valid for REVISION"),
        "{err}"
    );
}

#[test]
fn test_substatement_validator_counts_descriptions() {
    let source = r#"
    module example-bad2 {
        yang-version 1.1;
        namespace "urn:example:bad2";
        prefix bad;

        container top;

        augment "/top" {
            description "one";
            description "two";
            leaf extra { type string; }
        }
    }
    "#;
    let err = compile(&[("bad2.yang", source)]).unwrap_err();
    assert!(
        err.to_string()
            .contains("Maximal count of DESCRIPTION for AUGMENT is 1"),
        "{err}"
    );
}

#[test]
fn test_duplicate_schema_node_is_rejected() {
    let source = r#"
    module example-dup {
        yang-version 1.1;
        namespace "urn:example:dup";
        prefix dup;

        container twice;
        container twice;
    }
    "#;
    let err = compile(&[("dup.yang", source)]).unwrap_err();
    assert!(err.to_string().contains("duplicate schema node"), "{err}");
}

fn collect_schema_paths(stmt: &Arc<EffectiveStmt>, out: &mut Vec<SchemaNodeId>) {
    for sub in stmt.substatements() {
        if let Some(path) = sub.schema_path() {
            out.push(path.clone());
        }
        collect_schema_paths(sub, out);
    }
}

#[test]
fn test_schema_node_identifiers_are_unique() {
    let model = compile(&[
        ("ni.yang", NETWORK_INSTANCE_MODULE),
        ("bgp.yang", BGP_MODULE),
    ])
    .unwrap();
    let mut paths = Vec::new();
    for module in model.modules() {
        collect_schema_paths(module.stmt(), &mut paths);
    }
    assert!(!paths.is_empty());
    let distinct: HashSet<_> = paths.iter().cloned().collect();
    assert_eq!(distinct.len(), paths.len(), "schema node identifier collision");
}

#[test]
fn test_bits_and_identityref_types_compile() {
    let source = r#"
    module example-flags {
        yang-version 1.1;
        namespace "urn:example:flags";
        prefix fl;

        identity hash-algorithm;
        identity sha-256 { base hash-algorithm; }

        leaf tcp-flags {
            type bits {
                bit syn { position 1; }
                bit ack;
            }
        }

        leaf digest {
            type identityref { base fl:hash-algorithm; }
        }
    }
    "#;
    let model = compile(&[("flags.yang", source)]).unwrap();
    let module = model.module_by_name("example-flags").unwrap();

    let flags = module
        .stmt()
        .data_child(&qname("urn:example:flags", "tcp-flags"))
        .unwrap();
    let ty = flags.type_def().unwrap();
    assert_eq!(ty.base, BuiltinType::Bits);
    assert_eq!(ty.bits.len(), 2);
    assert_eq!((ty.bits[0].name.as_str(), ty.bits[0].position), ("syn", 1));
    // unpositioned bits continue from the highest assigned position
    assert_eq!((ty.bits[1].name.as_str(), ty.bits[1].position), ("ack", 2));

    let digest = module
        .stmt()
        .data_child(&qname("urn:example:flags", "digest"))
        .unwrap();
    let ty = digest.type_def().unwrap();
    assert_eq!(ty.base, BuiltinType::Identityref);
    let base = ty.identity_base.as_ref().unwrap();
    assert_eq!(base.prefix.as_deref(), Some("fl"));
    assert_eq!(base.name, "hash-algorithm");
}

#[test]
fn test_submodule_body_is_part_of_the_module() {
    let module = r#"
    module example-main {
        yang-version 1.1;
        namespace "urn:example:main";
        prefix mn;

        include example-sub;

        container from-main;
    }
    "#;
    let submodule = r#"
    submodule example-sub {
        yang-version 1.1;
        belongs-to example-main { prefix mn; }

        container from-sub {
            leaf detail { type string; }
        }
    }
    "#;
    let model = compile(&[("main.yang", module), ("sub.yang", submodule)]).unwrap();
    assert_eq!(model.len(), 1);
    let main = model.module_by_name("example-main").unwrap();
    // submodule content lives in the including module's namespace
    let from_sub = main
        .stmt()
        .data_child(&qname("urn:example:main", "from-sub"))
        .unwrap();
    assert!(from_sub
        .data_child(&qname("urn:example:main", "detail"))
        .is_some());
    assert!(main
        .stmt()
        .data_child(&qname("urn:example:main", "from-main"))
        .is_some());
}

#[test]
fn test_extension_statements_are_carried_opaquely() {
    let source = r#"
    module example-ext {
        yang-version 1.1;
        namespace "urn:example:ext";
        prefix ext;

        extension note {
            argument text;
        }

        container c {
            ext:note "remember this";
            leaf l { type string; }
        }
    }
    "#;
    let model = compile(&[("ext.yang", source)]).unwrap();
    let module = model.module_by_name("example-ext").unwrap();
    let c = module
        .stmt()
        .data_child(&qname("urn:example:ext", "c"))
        .unwrap();
    let note = c
        .substatements()
        .iter()
        .find(|s| s.keyword().text() == "ext:note")
        .unwrap();
    assert_eq!(
        note.argument().and_then(|a| a.as_str()),
        Some("remember this")
    );
}

#[test]
fn test_unknown_prefixless_statement_is_rejected() {
    let source = r#"
    module example-bogus {
        yang-version 1.1;
        namespace "urn:example:bogus";
        prefix bg;

        frobnicate now;
    }
    "#;
    let err = compile(&[("bogus.yang", source)]).unwrap_err();
    assert!(err.to_string().contains("unknown statement"), "{err}");
}

#[test]
fn test_fixture_directory_compiles_as_one_model() {
    // sweep every .yang fixture on disk and compile them together
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");
    let mut sources = Vec::new();
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.unwrap();
        if entry.path().extension().is_some_and(|e| e == "yang") {
            let name = entry.file_name().to_string_lossy().to_string();
            let text = std::fs::read_to_string(entry.path()).unwrap();
            sources.push((name, text));
        }
    }
    assert!(sources.len() >= 3, "expected fixture modules on disk");
    let refs: Vec<(&str, &str)> = sources
        .iter()
        .map(|(n, t)| (n.as_str(), t.as_str()))
        .collect();
    let model = compile(&refs).unwrap();
    assert_eq!(model.len(), sources.len());
}

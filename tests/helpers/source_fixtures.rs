//! Common YANG source fixtures for integration tests.

/// A minimal self-contained module.
pub const MINIMAL_MODULE: &str = r#"
module minimal {
    yang-version 1.1;
    namespace "urn:example:minimal";
    prefix min;

    container state {
        leaf up { type boolean; }
    }
}
"#;

/// Typedef chains with tightening restrictions.
pub const TYPES_MODULE: &str = r#"
module example-types {
    yang-version 1.1;
    namespace "urn:example:types";
    prefix ty;

    typedef percent {
        type uint8 { range "0..100"; }
        units "percent";
    }

    typedef half-percent {
        type percent { range "0..50"; }
    }

    leaf load { type half-percent; }
}
"#;

/// The base of the augment scenario: openconfig-style network instances.
pub const NETWORK_INSTANCE_MODULE: &str = r#"
module example-network-instance {
    yang-version 1.1;
    namespace "urn:example:network-instance";
    prefix ni;

    container network-instances {
        list network-instance {
            key "name";
            leaf name { type string; }
            container protocols {
                list protocol {
                    key "identifier name";
                    leaf identifier { type string; }
                    leaf name { type string; }
                }
            }
        }
    }
}
"#;

/// Augments a protocol with a BGP neighbors subtree; the afi-safi list
/// arrives through a grouping.
pub const BGP_MODULE: &str = r#"
module example-bgp {
    yang-version 1.1;
    namespace "urn:example:bgp";
    prefix bgp;

    import example-network-instance { prefix ni; }

    grouping afi-safi-list {
        container afi-safis {
            list afi-safi {
                key "afi-safi-name";
                leaf afi-safi-name { type string; }
            }
        }
    }

    augment "/ni:network-instances/ni:network-instance/ni:protocols/ni:protocol" {
        container bgp {
            container neighbors {
                list neighbor {
                    key "neighbor-address";
                    leaf neighbor-address { type string; }
                    uses afi-safi-list;
                }
            }
        }
    }
}
"#;

/// Feature-gated augmentation.
pub const FEATURES_MODULE: &str = r#"
module example-features {
    yang-version 1.1;
    namespace "urn:example:features";
    prefix exf;

    feature my-feature;

    container target {
        description "Base container";
    }

    augment "/target" {
        if-feature "my-feature";
        container my-con {
            description "New description";
        }
    }
}
"#;

/// Leafrefs, including a deref through another leafref.
pub const LEAFREF_MODULE: &str = r#"
module example-leafref {
    yang-version 1.1;
    namespace "urn:example:leafref";
    prefix lr;

    container interfaces {
        list interface {
            key "name";
            leaf name { type string; }
            leaf mtu { type uint16; }
        }
    }

    container state {
        leaf primary-interface {
            type leafref {
                path "/lr:interfaces/lr:interface/lr:name";
            }
        }
        leaf primary-mtu {
            type leafref {
                path "deref(../primary-interface)/../mtu";
            }
        }
    }
}
"#;

/// Two leafrefs that close a cycle; must never compile.
pub const LEAFREF_CYCLE_MODULE: &str = r#"
module example-leafref-cycle {
    yang-version 1.1;
    namespace "urn:example:leafref-cycle";
    prefix lc;

    container pair {
        leaf a { type leafref { path "../b"; } }
        leaf b { type leafref { path "../a"; } }
    }
}
"#;

/// A choice with two cases, for case-exclusion tests.
pub const CHOICE_MODULE: &str = r#"
module example-choice {
    yang-version 1.1;
    namespace "urn:example:choice";
    prefix ch;

    container settings {
        choice transport {
            case a {
                leaf x { type uint8; }
            }
            case b {
                leaf y { type uint8; }
            }
        }
    }
}
"#;

/// Containers, mandatory leaves, list constraints; the data-tree fixture.
pub const SYSTEM_MODULE: &str = r#"
module example-system {
    yang-version 1.1;
    namespace "urn:example:system";
    prefix sys;

    container system {
        leaf hostname {
            type string {
                length "1..63";
                pattern "[A-Za-z0-9.-]+";
            }
            mandatory true;
        }
        list server {
            key "name";
            unique "address";
            max-elements 3;
            leaf name { type string; }
            leaf address { type string; }
            leaf port { type uint16 { range "1..65535"; } }
        }
    }
}
"#;

/// Deviation target module.
pub const DEVIATION_BASE_MODULE: &str = r#"
module example-base {
    yang-version 1.1;
    namespace "urn:example:base";
    prefix base;

    container config {
        leaf timeout { type uint16; }
        leaf retries { type uint8; }
    }
}
"#;

//! YANG statement keywords.
//!
//! [`YangKeyword`] enumerates every RFC 7950 statement keyword the compiler
//! understands. Extension statements (keywords defined by `extension`) are
//! represented as [`StatementKeyword::Unknown`] and handled by the opaque
//! fallback support.

use std::fmt;

use smol_str::SmolStr;

macro_rules! yang_keywords {
    ($( $variant:ident => ($name:literal, $ident:literal) ),+ $(,)?) => {
        /// An RFC 7950 statement keyword.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum YangKeyword {
            $( $variant, )+
        }

        impl YangKeyword {
            /// The keyword as written in YANG source (`"leaf-list"`).
            pub fn name(&self) -> &'static str {
                match self {
                    $( YangKeyword::$variant => $name, )+
                }
            }

            /// The keyword's diagnostic identifier (`"LEAF_LIST"`), used in
            /// cardinality and validity messages.
            pub fn ident(&self) -> &'static str {
                match self {
                    $( YangKeyword::$variant => $ident, )+
                }
            }

            /// Parse a source keyword. Returns `None` for extension keywords.
            pub fn from_name(name: &str) -> Option<YangKeyword> {
                match name {
                    $( $name => Some(YangKeyword::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

yang_keywords! {
    Module => ("module", "MODULE"),
    Submodule => ("submodule", "SUBMODULE"),
    YangVersion => ("yang-version", "YANG_VERSION"),
    Namespace => ("namespace", "NAMESPACE"),
    Prefix => ("prefix", "PREFIX"),
    Import => ("import", "IMPORT"),
    Include => ("include", "INCLUDE"),
    BelongsTo => ("belongs-to", "BELONGS_TO"),
    Revision => ("revision", "REVISION"),
    RevisionDate => ("revision-date", "REVISION_DATE"),
    Organization => ("organization", "ORGANIZATION"),
    Contact => ("contact", "CONTACT"),
    Description => ("description", "DESCRIPTION"),
    Reference => ("reference", "REFERENCE"),
    Status => ("status", "STATUS"),
    Config => ("config", "CONFIG"),
    Mandatory => ("mandatory", "MANDATORY"),
    Presence => ("presence", "PRESENCE"),
    OrderedBy => ("ordered-by", "ORDERED_BY"),
    MinElements => ("min-elements", "MIN_ELEMENTS"),
    MaxElements => ("max-elements", "MAX_ELEMENTS"),
    Units => ("units", "UNITS"),
    Default => ("default", "DEFAULT"),
    Feature => ("feature", "FEATURE"),
    IfFeature => ("if-feature", "IF_FEATURE"),
    Identity => ("identity", "IDENTITY"),
    Base => ("base", "BASE"),
    Typedef => ("typedef", "TYPEDEF"),
    Type => ("type", "TYPE"),
    Range => ("range", "RANGE"),
    Length => ("length", "LENGTH"),
    Pattern => ("pattern", "PATTERN"),
    Enum => ("enum", "ENUM"),
    Value => ("value", "VALUE"),
    Bit => ("bit", "BIT"),
    Position => ("position", "POSITION"),
    FractionDigits => ("fraction-digits", "FRACTION_DIGITS"),
    Path => ("path", "PATH"),
    RequireInstance => ("require-instance", "REQUIRE_INSTANCE"),
    Container => ("container", "CONTAINER"),
    Leaf => ("leaf", "LEAF"),
    LeafList => ("leaf-list", "LEAF_LIST"),
    List => ("list", "LIST"),
    Key => ("key", "KEY"),
    Unique => ("unique", "UNIQUE"),
    Choice => ("choice", "CHOICE"),
    Case => ("case", "CASE"),
    Grouping => ("grouping", "GROUPING"),
    Uses => ("uses", "USES"),
    Refine => ("refine", "REFINE"),
    Augment => ("augment", "AUGMENT"),
    When => ("when", "WHEN"),
    Must => ("must", "MUST"),
    ErrorMessage => ("error-message", "ERROR_MESSAGE"),
    ErrorAppTag => ("error-app-tag", "ERROR_APP_TAG"),
    Deviation => ("deviation", "DEVIATION"),
    Deviate => ("deviate", "DEVIATE"),
    Anyxml => ("anyxml", "ANYXML"),
    Anydata => ("anydata", "ANYDATA"),
    Rpc => ("rpc", "RPC"),
    Input => ("input", "INPUT"),
    Output => ("output", "OUTPUT"),
    Action => ("action", "ACTION"),
    Notification => ("notification", "NOTIFICATION"),
    Extension => ("extension", "EXTENSION"),
    Argument => ("argument", "ARGUMENT"),
    YinElement => ("yin-element", "YIN_ELEMENT"),
}

impl YangKeyword {
    /// True for statements that occupy a slot in the schema tree.
    pub fn is_schema_node(&self) -> bool {
        use YangKeyword::*;
        matches!(
            self,
            Container
                | Leaf
                | LeafList
                | List
                | Choice
                | Case
                | Anyxml
                | Anydata
                | Rpc
                | Input
                | Output
                | Action
                | Notification
        )
    }

    /// True for schema nodes that also appear in the data tree. `choice` and
    /// `case` are schema-only levels elided from data-tree addressing.
    pub fn is_data_node(&self) -> bool {
        use YangKeyword::*;
        matches!(
            self,
            Container | Leaf | LeafList | List | Anyxml | Anydata
        )
    }

    /// True for statements whose argument names a new statement-local
    /// definition (and therefore forms a [`crate::base::QName`]).
    pub fn is_named_definition(&self) -> bool {
        use YangKeyword::*;
        matches!(self, Feature | Identity | Typedef | Grouping | Extension)
    }
}

impl fmt::Display for YangKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ident())
    }
}

/// A statement keyword: a core RFC 7950 keyword or an extension keyword
/// (`prefix:name`) treated as opaque by the generic support.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatementKeyword {
    Core(YangKeyword),
    Unknown(SmolStr),
}

impl StatementKeyword {
    /// Parse a keyword token. Prefixed keywords and unrecognized names are
    /// extension statements.
    pub fn parse(text: &str) -> StatementKeyword {
        if text.contains(':') {
            return StatementKeyword::Unknown(text.into());
        }
        match YangKeyword::from_name(text) {
            Some(kw) => StatementKeyword::Core(kw),
            None => StatementKeyword::Unknown(text.into()),
        }
    }

    pub fn as_core(&self) -> Option<YangKeyword> {
        match self {
            StatementKeyword::Core(kw) => Some(*kw),
            StatementKeyword::Unknown(_) => None,
        }
    }

    pub fn is(&self, kw: YangKeyword) -> bool {
        self.as_core() == Some(kw)
    }

    /// The keyword as written in source.
    pub fn text(&self) -> &str {
        match self {
            StatementKeyword::Core(kw) => kw.name(),
            StatementKeyword::Unknown(name) => name,
        }
    }
}

impl fmt::Display for StatementKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKeyword::Core(kw) => f.write_str(kw.ident()),
            StatementKeyword::Unknown(name) => f.write_str(name),
        }
    }
}

impl From<YangKeyword> for StatementKeyword {
    fn from(kw: YangKeyword) -> Self {
        StatementKeyword::Core(kw)
    }
}

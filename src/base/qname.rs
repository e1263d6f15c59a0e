//! Qualified names and module identifiers.
//!
//! A [`QName`] is the identifier of every schema node, every normalized-node
//! child slot, and every feature: a namespace URI, an optional revision date,
//! and a local name. Equality and hashing cover all three, so two revisions
//! of the same module produce distinct identifiers.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use smol_str::SmolStr;
use thiserror::Error;

/// An XML namespace URI, shared by reference.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XmlNamespace(Arc<str>);

impl XmlNamespace {
    pub fn new(uri: impl Into<Arc<str>>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for XmlNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for XmlNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XmlNamespace({})", self.0)
    }
}

impl From<&str> for XmlNamespace {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

/// Error raised when a revision string is not a valid `YYYY-MM-DD` date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid revision date '{0}', expected YYYY-MM-DD")]
pub struct InvalidRevision(pub String);

/// A YANG revision date (`YYYY-MM-DD`).
///
/// Ordering is chronological; the latest revision of a module is the module's
/// effective revision.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision {
    year: u16,
    month: u8,
    day: u8,
}

impl Revision {
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self, InvalidRevision> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(InvalidRevision(format!("{year:04}-{month:02}-{day:02}")));
        }
        Ok(Self { year, month, day })
    }
}

impl FromStr for Revision {
    type Err = InvalidRevision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || InvalidRevision(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(err());
        }
        let year: u16 = s[0..4].parse().map_err(|_| err())?;
        let month: u8 = s[5..7].parse().map_err(|_| err())?;
        let day: u8 = s[8..10].parse().map_err(|_| err())?;
        Revision::new(year, month, day).map_err(|_| err())
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({self})")
    }
}

/// A module identifier: namespace URI plus revision date.
///
/// Distinct revisions of the same namespace coexist in one effective model.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QNameModule {
    namespace: XmlNamespace,
    revision: Option<Revision>,
}

impl QNameModule {
    pub fn new(namespace: XmlNamespace, revision: Option<Revision>) -> Self {
        Self {
            namespace,
            revision,
        }
    }

    pub fn namespace(&self) -> &XmlNamespace {
        &self.namespace
    }

    pub fn revision(&self) -> Option<Revision> {
        self.revision
    }

    /// Same namespace with the revision stripped; used for revision-agnostic
    /// lookups.
    pub fn without_revision(&self) -> QNameModule {
        QNameModule::new(self.namespace.clone(), None)
    }
}

impl fmt::Display for QNameModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.revision {
            Some(rev) => write!(f, "{}@{}", self.namespace, rev),
            None => write!(f, "{}", self.namespace),
        }
    }
}

impl fmt::Debug for QNameModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QNameModule({self})")
    }
}

/// A qualified name: `(namespace, revision, local name)`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    module: QNameModule,
    local_name: SmolStr,
}

impl QName {
    pub fn new(module: QNameModule, local_name: impl Into<SmolStr>) -> Self {
        Self {
            module,
            local_name: local_name.into(),
        }
    }

    pub fn module(&self) -> &QNameModule {
        &self.module
    }

    pub fn namespace(&self) -> &XmlNamespace {
        self.module.namespace()
    }

    pub fn revision(&self) -> Option<Revision> {
        self.module.revision()
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Rebind this name to another module, keeping the local name.
    pub fn bind_to(&self, module: QNameModule) -> QName {
        QName::new(module, self.local_name.clone())
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){}", self.module, self.local_name)
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QName({self})")
    }
}

/// A schema node identifier: the list of QNames from the module root that
/// uniquely names a schema node in the effective model.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SchemaNodeId {
    nodes: Arc<[QName]>,
}

impl SchemaNodeId {
    pub fn new(nodes: impl Into<Arc<[QName]>>) -> Self {
        Self {
            nodes: nodes.into(),
        }
    }

    pub fn nodes(&self) -> &[QName] {
        &self.nodes
    }

    pub fn last(&self) -> Option<&QName> {
        self.nodes.last()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Identifier of this node's child `qname`.
    pub fn child(&self, qname: QName) -> SchemaNodeId {
        let mut nodes = self.nodes.to_vec();
        nodes.push(qname);
        SchemaNodeId::new(nodes)
    }
}

impl fmt::Display for SchemaNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for qname in self.nodes.iter() {
            write!(f, "/{}", qname.local_name())?;
        }
        Ok(())
    }
}

impl fmt::Debug for SchemaNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaNodeId({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> QNameModule {
        QNameModule::new(
            XmlNamespace::new("urn:example:test"),
            Some("2024-01-15".parse().unwrap()),
        )
    }

    #[test]
    fn test_revision_parse_and_display() {
        let rev: Revision = "2024-01-15".parse().unwrap();
        assert_eq!(rev.to_string(), "2024-01-15");
    }

    #[test]
    fn test_revision_rejects_malformed() {
        assert!("2024-1-15".parse::<Revision>().is_err());
        assert!("2024-13-01".parse::<Revision>().is_err());
        assert!("not-a-date".parse::<Revision>().is_err());
    }

    #[test]
    fn test_revision_ordering_is_chronological() {
        let older: Revision = "2023-12-31".parse().unwrap();
        let newer: Revision = "2024-01-01".parse().unwrap();
        assert!(older < newer);
    }

    #[test]
    fn test_qname_equality_covers_revision() {
        let a = QName::new(module(), "leaf-a");
        let b = QName::new(
            QNameModule::new(XmlNamespace::new("urn:example:test"), None),
            "leaf-a",
        );
        assert_ne!(a, b);
        assert_eq!(a, QName::new(module(), "leaf-a"));
    }

    #[test]
    fn test_schema_node_id_child() {
        let root = SchemaNodeId::new(vec![QName::new(module(), "top")]);
        let child = root.child(QName::new(module(), "inner"));
        assert_eq!(child.len(), 2);
        assert_eq!(child.last().unwrap().local_name(), "inner");
        assert_eq!(child.to_string(), "/top/inner");
    }
}

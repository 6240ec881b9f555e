// src/model/qname.rs
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A namespace-qualified name.
///
/// Identity is `(namespace, local_name)`; the prefix only matters for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QName {
    #[serde(default)]
    pub prefix: String,
    pub namespace: String,
    pub local_name: String,
}

impl QName {
    pub fn new(
        prefix: impl Into<String>,
        namespace: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// Resolve `prefix:local` against a prefix map.
    ///
    /// Returns `None` when the text has no colon or the prefix is unknown.
    pub fn from_prefixed(text: &str, prefixes: &BTreeMap<String, String>) -> Option<Self> {
        let (prefix, local) = text.split_once(':')?;
        if local.is_empty() {
            return None;
        }
        let namespace = prefixes.get(prefix)?;
        Some(Self::new(prefix, namespace.clone(), local))
    }

    /// The `prefix:local` form, or just the local name when there is no prefix.
    pub fn prefixed(&self) -> String {
        if self.prefix.is_empty() {
            self.local_name.clone()
        } else {
            format!("{}:{}", self.prefix, self.local_name)
        }
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.local_name == other.local_name
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.local_name.hash(state);
    }
}

impl PartialOrd for QName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.namespace
            .cmp(&other.namespace)
            .then_with(|| self.local_name.cmp(&other.local_name))
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefixed())
    }
}

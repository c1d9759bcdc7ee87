//! Node identifiers and their allocation.
//!
//! Identifiers follow the `<class name><index>` convention, e.g.
//! `vtkMRMLScalarVolumeNode1`. The allocator keeps one monotonic counter per
//! class and remembers every identifier it has handed out, so an allocated
//! identifier is never issued twice during a session, even after its node
//! was removed.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Stable identifier of a node within a scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds `<class><index>`.
    pub fn construct(class: &str, index: u64) -> Self {
        Self(format!("{}{}", class, index))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Hands out identifiers that are unique for the lifetime of a scene.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    next_index: HashMap<String, u64>,
    issued: HashSet<NodeId>,
    reserved: HashSet<NodeId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next free `<class><n>` identifier.
    pub fn allocate(&mut self, class: &str) -> NodeId {
        let mut index = self.next_index.get(class).copied().unwrap_or(1);
        let id = loop {
            let candidate = NodeId::construct(class, index);
            if !self.issued.contains(&candidate) && !self.reserved.contains(&candidate) {
                break candidate;
            }
            index += 1;
        };
        self.next_index.insert(class.to_string(), index + 1);
        self.issued.insert(id.clone());
        id
    }

    /// Records an externally chosen identifier (e.g. read from a scene file).
    ///
    /// Returns `false` if the identifier had already been seen.
    pub fn claim(&mut self, id: &NodeId) -> bool {
        self.issued.insert(id.clone())
    }

    pub fn is_issued(&self, id: &str) -> bool {
        self.issued.contains(id)
    }

    /// Blocks `id` from being handed out by [`IdAllocator::allocate`].
    pub fn reserve(&mut self, id: NodeId) {
        self.reserved.insert(id);
    }

    pub fn release_reserved(&mut self) {
        self.reserved.clear();
    }
}

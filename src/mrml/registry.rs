//! Factory lookup from class names and scene-file tags to node variants.
//!
//! A registry is an explicit value handed to each [`crate::scene::Scene`]
//! rather than process-wide state, so two scenes can know different node
//! types and tests can build minimal registries.

use crate::error::{MrmlError, Result};
use crate::node::{ColorTable, LinearTransform, Node, NodeRef, NodeVariant, ScalarVolume, VolumeDisplay, VolumeStorage};
use std::collections::HashMap;
use std::fmt;

pub type Factory = Box<dyn Fn() -> Box<dyn NodeVariant>>;

struct Entry {
    class: &'static str,
    tag: &'static str,
    factory: Factory,
}

#[derive(Default)]
pub struct NodeRegistry {
    entries: Vec<Entry>,
    by_class: HashMap<&'static str, usize>,
    by_tag: HashMap<&'static str, usize>,
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.classes()).finish()
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry knowing every node type shipped with the crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(|| Box::new(ScalarVolume::default()));
        registry.register(|| Box::new(VolumeDisplay::default()));
        registry.register(|| Box::new(LinearTransform::default()));
        registry.register(|| Box::new(ColorTable::default()));
        registry.register(|| Box::new(VolumeStorage::default()));
        registry
    }

    /// Registers a factory under the class and tag of the variant it builds.
    /// Registering a class again replaces the previous factory.
    pub fn register<F>(&mut self, factory: F)
    where
        F: Fn() -> Box<dyn NodeVariant> + 'static,
    {
        let sample = factory();
        let (class, tag) = (sample.class_name(), sample.tag_name());
        let entry = Entry {
            class,
            tag,
            factory: Box::new(factory),
        };
        match self.by_class.get(class) {
            Some(&slot) => {
                let old_tag = self.entries[slot].tag;
                if self.by_tag.get(old_tag) == Some(&slot) {
                    self.by_tag.remove(old_tag);
                }
                self.entries[slot] = entry;
                self.by_tag.insert(tag, slot);
                tracing::debug!(class, tag, "replaced node factory");
            }
            None => {
                let slot = self.entries.len();
                self.entries.push(entry);
                self.by_class.insert(class, slot);
                self.by_tag.insert(tag, slot);
            }
        }
    }

    pub fn create_by_class(&self, class: &str) -> Result<NodeRef> {
        self.by_class
            .get(class)
            .map(|&slot| Node::new((self.entries[slot].factory)()))
            .ok_or_else(|| MrmlError::UnknownNodeType(class.to_string()))
    }

    pub fn create_by_tag(&self, tag: &str) -> Result<NodeRef> {
        self.by_tag
            .get(tag)
            .map(|&slot| Node::new((self.entries[slot].factory)()))
            .ok_or_else(|| MrmlError::UnknownNodeType(tag.to_string()))
    }

    pub fn class_for_tag(&self, tag: &str) -> Option<&'static str> {
        self.by_tag.get(tag).map(|&slot| self.entries[slot].class)
    }

    pub fn tag_for_class(&self, class: &str) -> Option<&'static str> {
        self.by_class.get(class).map(|&slot| self.entries[slot].tag)
    }

    pub fn is_registered(&self, class: &str) -> bool {
        self.by_class.contains_key(class)
    }

    /// Class names in registration order.
    pub fn classes(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.class).collect()
    }
}

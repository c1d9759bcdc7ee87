//! The capability set every concrete node type implements.
//!
//! A [`crate::node::Node`] carries the state shared by all node types
//! (identifier, name, attributes, references, observers). Everything that is
//! specific to one type of data lives in a boxed [`NodeVariant`]: its class
//! name, its serialized attributes, which reference roles it knows, and how
//! it copies itself.

use super::attributes::AttributeList;
use crate::error::{MrmlError, Result};
use std::any::Any;
use std::fmt;

/// Whether a reference role holds one target or a list of targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleArity {
    /// Setting a reference replaces the previous target.
    Single,
    /// Setting a reference appends to the list.
    Multi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceRole {
    pub name: &'static str,
    pub arity: RoleArity,
}

impl ReferenceRole {
    pub const fn single(name: &'static str) -> Self {
        Self {
            name,
            arity: RoleArity::Single,
        }
    }

    pub const fn multi(name: &'static str) -> Self {
        Self {
            name,
            arity: RoleArity::Multi,
        }
    }
}

pub trait NodeVariant: Any + fmt::Debug {
    /// Class name, also the prefix of generated identifiers.
    fn class_name(&self) -> &'static str;

    /// Element name used in scene files.
    fn tag_name(&self) -> &'static str;

    /// Reference roles with a known arity. Roles not listed are multi-valued.
    fn reference_roles(&self) -> &'static [ReferenceRole] {
        &[]
    }

    /// Appends the variant's own attributes.
    fn write_attributes(&self, out: &mut AttributeList);

    /// Consumes one attribute. Returns `Ok(false)` for keys the variant does
    /// not know, so the caller can preserve them.
    fn read_attribute(&mut self, key: &str, value: &str) -> Result<bool>;

    /// Overwrites this payload from `other`, which must be the same class.
    fn copy_from(&mut self, other: &dyn NodeVariant) -> Result<()>;

    /// A default-initialized payload of the same class.
    fn new_instance(&self) -> Box<dyn NodeVariant>;

    fn clone_box(&self) -> Box<dyn NodeVariant>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn NodeVariant {
    pub fn arity_of(&self, role: &str) -> RoleArity {
        self.reference_roles()
            .iter()
            .find(|r| r.name == role)
            .map(|r| r.arity)
            .unwrap_or(RoleArity::Multi)
    }

    pub fn downcast_ref<T: NodeVariant>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: NodeVariant>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

impl Clone for Box<dyn NodeVariant> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Shared `copy_from` body for variants that are plain `Clone` data.
pub fn copy_cloned<T: NodeVariant + Clone>(this: &mut T, other: &dyn NodeVariant) -> Result<()> {
    match other.as_any().downcast_ref::<T>() {
        Some(source) => {
            *this = source.clone();
            Ok(())
        }
        None => Err(MrmlError::TypeMismatch {
            target_class: this.class_name().to_string(),
            source_class: other.class_name().to_string(),
        }),
    }
}

/// Implements the boilerplate half of [`NodeVariant`] for a `Clone + Default`
/// type.
#[macro_export]
macro_rules! impl_variant_boilerplate {
    () => {
        fn copy_from(&mut self, other: &dyn $crate::node::NodeVariant) -> $crate::error::Result<()> {
            $crate::node::variant::copy_cloned(self, other)
        }

        fn new_instance(&self) -> Box<dyn $crate::node::NodeVariant> {
            Box::new(Self::default())
        }

        fn clone_box(&self) -> Box<dyn $crate::node::NodeVariant> {
            Box::new(self.clone())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    };
}

//! Event payloads delivered to observers.
//!
//! Every notification carries three things: the [`EventKind`], the object
//! that raised it ([`EventSource`]), and optional [`CallData`] describing
//! what the event concerns (the node that was added, the reference edge that
//! changed, the diagnostics gathered at the end of a batch, ...).

use crate::ids::NodeId;
use crate::node::NodeRef;
use crate::scene::DanglingReference;
use std::fmt;

/// Kinds of notifications raised by scenes and nodes.
///
/// The set is open: collaborators may raise their own events through
/// [`EventKind::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NodeAboutToBeAdded,
    NodeAdded,
    NodeAboutToBeRemoved,
    NodeRemoved,
    NodeModified,
    ReferenceAdded,
    ReferenceRemoved,
    /// Raised on a node whose reference target was removed from the scene.
    ReferencedNodeRemoved,
    SceneModified,
    StartImport,
    SceneImported,
    StartRestore,
    SceneRestored,
    StartClose,
    SceneClosed,
    BatchStart,
    BatchEnd,
    Custom(u32),
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Custom(code) => write!(f, "Custom({})", code),
            other => write!(f, "{:?}", other),
        }
    }
}

/// The object an event was raised by.
#[derive(Clone)]
pub enum EventSource {
    Scene,
    Node(NodeRef),
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSource::Scene => f.write_str("Scene"),
            EventSource::Node(node) => write!(f, "Node({})", node.describe()),
        }
    }
}

/// Optional payload attached to an event.
#[derive(Clone)]
pub enum CallData {
    Node(NodeRef),
    NodeId(NodeId),
    Reference {
        role: String,
        target: NodeId,
    },
    Dangling(Vec<DanglingReference>),
}

impl fmt::Debug for CallData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallData::Node(node) => write!(f, "Node({})", node.describe()),
            CallData::NodeId(id) => write!(f, "NodeId({})", id),
            CallData::Reference { role, target } => write!(f, "Reference({} -> {})", role, target),
            CallData::Dangling(list) => write!(f, "Dangling({} entries)", list.len()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub source: EventSource,
    pub call_data: Option<CallData>,
}

impl Event {
    pub fn new(kind: EventKind, source: EventSource) -> Self {
        Self {
            kind,
            source,
            call_data: None,
        }
    }

    pub fn with_call_data(mut self, data: CallData) -> Self {
        self.call_data = Some(data);
        self
    }

    /// The node carried in the payload, if any.
    pub fn node(&self) -> Option<&NodeRef> {
        match &self.call_data {
            Some(CallData::Node(node)) => Some(node),
            _ => None,
        }
    }

    /// The node that raised the event, if it was raised by a node.
    pub fn source_node(&self) -> Option<&NodeRef> {
        match &self.source {
            EventSource::Node(node) => Some(node),
            EventSource::Scene => None,
        }
    }

    pub fn dangling(&self) -> &[DanglingReference] {
        match &self.call_data {
            Some(CallData::Dangling(list)) => list,
            _ => &[],
        }
    }
}

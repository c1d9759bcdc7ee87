//! # Scene
//!
//! The [`Scene`] owns an ordered collection of nodes and is the only place
//! where the cross-cutting invariants are enforced:
//!
//! - every owned node has an identifier unique within the scene, and
//!   identifiers are never handed out twice in a session,
//! - the [`ReferenceTable`] agrees with the reference slots of the owned
//!   nodes (outside of a batch),
//! - removing a node unresolves every reference to it and tells the nodes
//!   that held those references.
//!
//! ## Handles
//!
//! `Scene` is a cheap clone over `Rc<SceneInner>`. Observers receive events
//! synchronously and may query (or mutate) the scene from inside a callback;
//! no internal borrow is held while events are delivered.
//!
//! ## Batches
//!
//! Bulk operations (import, restore, close) run inside a batch. While the
//! batch depth is above zero, `SceneModified` is coalesced and dangling
//! references are tolerated. Closing the outermost batch runs the
//! consistency pass and raises `BatchEnd` with the resulting diagnostics.
//!
//! Serialization lives in [`io`], the two-pass loaders in [`load`] and the
//! undo history in [`undo`].

pub mod io;
pub mod load;
pub mod undo;

use crate::config::SceneConfig;
use crate::error::{MrmlError, Result};
use crate::event::{CallData, Event, EventKind, EventSource};
use crate::ids::{IdAllocator, NodeId};
use crate::node::{NodeRef, ReferenceUpdate};
use crate::observer::{EmitReport, ObserverLedger, SubscriptionHandle};
use crate::references::ReferenceTable;
use crate::registry::NodeRegistry;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

pub use io::{NodeRecord, SceneSnapshot};
pub use load::{ImportReport, RestoreReport};

use undo::UndoHistory;

/// A reference slot that does not resolve to a node of the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub from: NodeId,
    pub role: String,
    /// `None` when the slot was unresolved (its target was removed).
    pub target: Option<NodeId>,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{} --{}--> {} (missing)", self.from, self.role, target),
            None => write!(f, "{} --{}--> (unresolved)", self.from, self.role),
        }
    }
}

pub struct SceneInner {
    nodes: RefCell<Vec<NodeRef>>,
    index: RefCell<HashMap<NodeId, NodeRef>>,
    ids: RefCell<IdAllocator>,
    pub(crate) references: RefCell<ReferenceTable>,
    ledger: ObserverLedger,
    batch_depth: Cell<u32>,
    modified_pending: Cell<bool>,
    registry: Rc<NodeRegistry>,
    config: SceneConfig,
    history: RefCell<UndoHistory>,
}

#[derive(Clone)]
pub struct Scene {
    inner: Rc<SceneInner>,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("nodes", &self.len())
            .field("batch_depth", &self.inner.batch_depth.get())
            .finish()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Rc::new(NodeRegistry::with_builtin()), SceneConfig::default())
    }
}

impl Scene {
    pub fn new(registry: Rc<NodeRegistry>, config: SceneConfig) -> Self {
        Self {
            inner: Rc::new(SceneInner {
                nodes: RefCell::new(Vec::new()),
                index: RefCell::new(HashMap::new()),
                ids: RefCell::new(IdAllocator::new()),
                references: RefCell::new(ReferenceTable::new()),
                ledger: ObserverLedger::new(),
                batch_depth: Cell::new(0),
                modified_pending: Cell::new(false),
                registry,
                config,
                history: RefCell::new(UndoHistory::default()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<SceneInner>) -> Self {
        Self { inner }
    }

    pub fn ptr_eq(&self, other: &Scene) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.inner.registry
    }

    pub fn config(&self) -> &SceneConfig {
        &self.inner.config
    }

    // ---- observers ------------------------------------------------------

    pub fn observers(&self) -> &ObserverLedger {
        &self.inner.ledger
    }

    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Event) -> anyhow::Result<()> + 'static,
    {
        self.inner.ledger.subscribe(kind, callback)
    }

    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.inner.ledger.unsubscribe(handle)
    }

    /// Raises an event on the scene's own ledger.
    pub fn invoke(&self, kind: EventKind, call_data: Option<CallData>) -> EmitReport {
        let mut event = Event::new(kind, EventSource::Scene);
        event.call_data = call_data;
        self.inner.ledger.emit(&event)
    }

    fn scene_modified(&self) {
        if self.is_batch_processing() {
            self.inner.modified_pending.set(true);
        } else {
            self.invoke(EventKind::SceneModified, None);
        }
    }

    // ---- batching -------------------------------------------------------

    pub fn begin_batch(&self) {
        let depth = self.inner.batch_depth.get() + 1;
        self.inner.batch_depth.set(depth);
        if depth == 1 {
            self.invoke(EventKind::BatchStart, None);
        }
    }

    /// Closes one `begin_batch`. Closing the outermost batch collects the
    /// dangling references, raises the coalesced `SceneModified` and then
    /// `BatchEnd`, and returns the diagnostics.
    pub fn end_batch(&self) -> Vec<DanglingReference> {
        let depth = self.inner.batch_depth.get();
        if depth == 0 {
            tracing::warn!("end_batch called outside of a batch");
            return Vec::new();
        }
        self.inner.batch_depth.set(depth - 1);
        if depth > 1 {
            return Vec::new();
        }

        let dangling = self.dangling_references();
        for reference in &dangling {
            tracing::warn!(%reference, "dangling reference after batch");
        }
        if self.inner.modified_pending.replace(false) {
            self.invoke(EventKind::SceneModified, None);
        }
        self.invoke(EventKind::BatchEnd, Some(CallData::Dangling(dangling.clone())));
        dangling
    }

    /// Opens a batch closed when the guard is finished or dropped.
    pub fn batch(&self) -> BatchGuard {
        self.begin_batch();
        BatchGuard {
            scene: self.clone(),
            open: true,
        }
    }

    pub fn is_batch_processing(&self) -> bool {
        self.inner.batch_depth.get() > 0
    }

    // ---- node collection ------------------------------------------------

    /// Adopts `node`.
    ///
    /// Returns the handle now owned by the scene: `node` itself, or an
    /// existing node with the same class and singleton tag that `node` was
    /// copied into.
    pub fn add_node(&self, node: &NodeRef) -> Result<NodeRef> {
        self.adopt(node, Placement::Append)
    }

    /// Adopts `node` and places it right before the node `anchor` in the
    /// node order.
    pub fn insert_before(&self, anchor: &str, node: &NodeRef) -> Result<NodeRef> {
        self.require(anchor)?;
        self.adopt(node, Placement::Before(NodeId::from(anchor)))
    }

    /// Adopts `node` and places it right after the node `anchor`.
    pub fn insert_after(&self, anchor: &str, node: &NodeRef) -> Result<NodeRef> {
        self.require(anchor)?;
        self.adopt(node, Placement::After(NodeId::from(anchor)))
    }

    fn adopt(&self, node: &NodeRef, placement: Placement) -> Result<NodeRef> {
        if node.is_owned() {
            return Err(MrmlError::AlreadyOwned(node.require_id()?));
        }

        if let Some(tag) = node.singleton_tag() {
            if let Some(existing) = self.singleton(node.class_name(), &tag) {
                existing.copy_from(node)?;
                tracing::debug!(id = %existing.describe(), singleton = %tag, "merged into singleton");
                self.scene_modified();
                return Ok(existing);
            }
        }

        let id = self.assign_id(node)?;
        // Buffered references go into the table before the node becomes
        // owned, so edits made by NodeAboutToBeAdded observers land once.
        {
            let mut table = self.inner.references.borrow_mut();
            for (role, slots) in node.references() {
                for target in slots.iter().flatten() {
                    table.add_edge(&id, &role, target);
                }
            }
        }
        node.attach(Rc::downgrade(&self.inner), id.clone());
        self.invoke(EventKind::NodeAboutToBeAdded, Some(CallData::Node(Rc::clone(node))));

        {
            let mut nodes = self.inner.nodes.borrow_mut();
            let position = match &placement {
                Placement::Append => None,
                Placement::Before(anchor) => nodes.iter().position(|n| n.id().as_ref() == Some(anchor)),
                Placement::After(anchor) => nodes
                    .iter()
                    .position(|n| n.id().as_ref() == Some(anchor))
                    .map(|i| i + 1),
            };
            match position {
                Some(i) => nodes.insert(i, Rc::clone(node)),
                None => nodes.push(Rc::clone(node)),
            }
        }
        self.inner
            .index
            .borrow_mut()
            .insert(id.clone(), Rc::clone(node));
        tracing::debug!(id = %id, class = node.class_name(), "node added");

        self.invoke(EventKind::NodeAdded, Some(CallData::Node(Rc::clone(node))));
        self.scene_modified();
        Ok(Rc::clone(node))
    }

    fn assign_id(&self, node: &NodeRef) -> Result<NodeId> {
        let mut ids = self.inner.ids.borrow_mut();
        let id = match node.id() {
            Some(preset) if self.inner.index.borrow().contains_key(&preset) => {
                if !self.inner.config.renumbers() {
                    return Err(MrmlError::DuplicateId(preset));
                }
                let fresh = ids.allocate(node.class_name());
                tracing::debug!(from = %preset, to = %fresh, "renumbered conflicting id");
                fresh
            }
            Some(preset) => {
                ids.claim(&preset);
                preset
            }
            None => ids.allocate(node.class_name()),
        };
        Ok(id)
    }

    fn singleton(&self, class: &str, tag: &str) -> Option<NodeRef> {
        self.inner
            .nodes
            .borrow()
            .iter()
            .find(|n| n.class_name() == class && n.singleton_tag().as_deref() == Some(tag))
            .cloned()
    }

    /// Removes the node `id` and returns it.
    ///
    /// Every slot referencing it becomes unresolved, and each referencing
    /// node raises `ReferencedNodeRemoved` and then `NodeRemoved` (carrying
    /// the removed node) before `NodeRemoved` is raised on the scene. The
    /// returned node keeps its identifier but is detached.
    pub fn remove_node(&self, id: &str) -> Result<NodeRef> {
        let node = self
            .node_by_id(id)
            .ok_or_else(|| MrmlError::NotFound(NodeId::from(id)))?;
        let id = NodeId::from(id);
        self.invoke(EventKind::NodeAboutToBeRemoved, Some(CallData::Node(Rc::clone(&node))));

        let (outgoing, incoming) = {
            let mut table = self.inner.references.borrow_mut();
            (table.remove_references_from(&id), table.remove_references_to(&id))
        };

        let mut notified = HashSet::new();
        for edge in &incoming {
            if !notified.insert(edge.from.clone()) {
                continue;
            }
            if let Some(referrer) = self.node_by_id(edge.from.as_str()) {
                referrer.unresolve_reference(&id);
                referrer.invoke(EventKind::NodeRemoved, Some(CallData::Node(Rc::clone(&node))));
            }
        }

        node.detach();
        self.inner
            .nodes
            .borrow_mut()
            .retain(|n| !Rc::ptr_eq(n, &node));
        self.inner.index.borrow_mut().remove(&id);
        tracing::debug!(
            id = %id,
            outgoing = outgoing.len(),
            incoming = incoming.len(),
            "node removed"
        );

        self.invoke(EventKind::NodeRemoved, Some(CallData::Node(Rc::clone(&node))));
        self.scene_modified();
        Ok(node)
    }

    /// Takes back a node added by a load that is being rolled back.
    ///
    /// Unlike [`Scene::remove_node`] the slots of other nodes that point at
    /// `id` are left alone, along with their table edges: those references
    /// were dangling before the load and stay so.
    pub(crate) fn discard_node(&self, id: &NodeId) {
        let Some(node) = self.node_by_id(id.as_str()) else {
            return;
        };
        self.invoke(EventKind::NodeAboutToBeRemoved, Some(CallData::Node(Rc::clone(&node))));
        self.inner.references.borrow_mut().remove_references_from(id);
        node.detach();
        self.inner
            .nodes
            .borrow_mut()
            .retain(|n| !Rc::ptr_eq(n, &node));
        self.inner.index.borrow_mut().remove(id);
        tracing::debug!(id = %id, "node discarded");
        self.invoke(EventKind::NodeRemoved, Some(CallData::Node(node)));
        self.scene_modified();
    }

    /// Adds `from --role--> to` on the node `from`.
    pub fn add_reference(&self, from: &str, role: &str, to: &str) -> Result<ReferenceUpdate> {
        self.require(from)?.add_reference(role, to)
    }

    pub fn remove_reference(&self, from: &str, role: &str, to: &str) -> Result<ReferenceUpdate> {
        self.require(from)?.remove_reference(role, to)
    }

    fn require(&self, id: &str) -> Result<NodeRef> {
        self.node_by_id(id)
            .ok_or_else(|| MrmlError::NotFound(NodeId::from(id)))
    }

    /// Creates a fresh node of `node`'s class, copies `node` into it and adds
    /// it. The copy gets its own identifier.
    pub fn copy_node(&self, node: &NodeRef) -> Result<NodeRef> {
        let copy = node.new_instance();
        copy.copy_from(node)?;
        copy.set_singleton_tag(None);
        self.add_node(&copy)
    }

    /// A detached node of `class` built through the scene's registry.
    pub fn create_node_by_class(&self, class: &str) -> Result<NodeRef> {
        self.inner.registry.create_by_class(class)
    }

    /// Creates, names and adds a node of `class`.
    pub fn add_new_node_by_class(&self, class: &str, name: &str) -> Result<NodeRef> {
        let node = self.create_node_by_class(class)?;
        if !name.is_empty() {
            node.set_name(self.unique_name(name));
        }
        self.add_node(&node)
    }

    /// Blocks `id` from automatic allocation.
    pub fn reserve_id(&self, id: impl Into<NodeId>) {
        self.inner.ids.borrow_mut().reserve(id.into());
    }

    /// First of `base`, `base1`, `base2`, ... not used as a node name.
    pub fn unique_name(&self, base: &str) -> String {
        let used: HashSet<String> = self
            .inner
            .nodes
            .borrow()
            .iter()
            .filter_map(|n| n.name())
            .collect();
        if !used.contains(base) {
            return base.to_string();
        }
        (1u64..)
            .map(|i| format!("{}{}", base, i))
            .find(|candidate| !used.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Removes every node (or every non-singleton node) inside one batch,
    /// between `StartClose` and `SceneClosed`, and drops the undo history.
    /// Returns how many were removed.
    pub fn clear(&self, keep_singletons: bool) -> usize {
        let guard = self.batch();
        self.invoke(EventKind::StartClose, None);

        let victims: Vec<NodeId> = self
            .inner
            .nodes
            .borrow()
            .iter()
            .filter(|n| !(keep_singletons && n.singleton_tag().is_some()))
            .filter_map(|n| n.id())
            .collect();
        let mut removed = 0;
        for id in victims.iter().rev() {
            if self.remove_node(id.as_str()).is_ok() {
                removed += 1;
            }
        }

        self.inner.history.borrow_mut().clear();
        self.invoke(EventKind::SceneClosed, None);
        guard.finish();
        tracing::debug!(removed, "scene cleared");
        removed
    }

    // ---- queries --------------------------------------------------------

    pub fn node_by_id(&self, id: &str) -> Option<NodeRef> {
        self.inner.index.borrow().get(id).cloned()
    }

    /// Owned nodes in insertion order.
    pub fn nodes(&self) -> Vec<NodeRef> {
        self.inner.nodes.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nodes.borrow().is_empty()
    }

    pub fn nth_node(&self, n: usize) -> Option<NodeRef> {
        self.inner.nodes.borrow().get(n).cloned()
    }

    pub fn nodes_by_class(&self, class: &str) -> Vec<NodeRef> {
        self.inner
            .nodes
            .borrow()
            .iter()
            .filter(|n| n.class_name() == class)
            .cloned()
            .collect()
    }

    pub fn nodes_by_name(&self, name: &str) -> Vec<NodeRef> {
        self.inner
            .nodes
            .borrow()
            .iter()
            .filter(|n| n.name().as_deref() == Some(name))
            .cloned()
            .collect()
    }

    /// Nodes holding a reference to `id`, each once, in reference order.
    pub fn referencing_nodes(&self, id: &str) -> Vec<NodeRef> {
        let sources = self.inner.references.borrow().referenced_by(&NodeId::from(id));
        let mut seen = HashSet::new();
        sources
            .into_iter()
            .filter(|(from, _)| seen.insert(from.clone()))
            .filter_map(|(from, _)| self.node_by_id(from.as_str()))
            .collect()
    }

    /// `id` followed by every node reachable from it through references,
    /// breadth first.
    pub fn referenced_nodes(&self, id: &str) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([NodeId::from(id)]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(node) = self.node_by_id(current.as_str()) else {
                continue;
            };
            for (_, to) in self.inner.references.borrow().references_from(&current) {
                queue.push_back(to);
            }
            out.push(node);
        }
        out
    }

    /// Every reference slot that does not resolve to an owned node.
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();
        for node in self.nodes() {
            let Some(from) = node.id() else { continue };
            for (role, slots) in node.references() {
                for slot in slots {
                    let resolves = slot
                        .as_ref()
                        .is_some_and(|target| self.inner.index.borrow().contains_key(target));
                    if !resolves {
                        dangling.push(DanglingReference {
                            from: from.clone(),
                            role: role.clone(),
                            target: slot,
                        });
                    }
                }
            }
        }
        dangling
    }

    /// Cross-checks the reference table against itself and against the
    /// reference slots of the owned nodes. Returns one line per problem.
    pub fn check_consistency(&self) -> Vec<String> {
        let table = self.inner.references.borrow();
        let mut problems = table.check_consistency();

        let mut from_nodes: Vec<(String, String, String)> = Vec::new();
        for node in self.inner.nodes.borrow().iter() {
            let Some(from) = node.id() else {
                problems.push(format!("owned {} node has no id", node.class_name()));
                continue;
            };
            for (role, slots) in node.references() {
                for target in slots.into_iter().flatten() {
                    from_nodes.push((from.to_string(), role.clone(), target.to_string()));
                }
            }
        }
        let mut from_table: Vec<(String, String, String)> = table
            .edges()
            .map(|e| (e.from.to_string(), e.role, e.to.to_string()))
            .collect();
        from_nodes.sort();
        from_table.sort();

        if from_nodes != from_table {
            for edge in from_nodes.iter().filter(|e| !from_table.contains(e)) {
                problems.push(format!("{} --{}--> {} missing from table", edge.0, edge.1, edge.2));
            }
            for edge in from_table.iter().filter(|e| !from_nodes.contains(e)) {
                problems.push(format!("{} --{}--> {} not held by any node", edge.0, edge.1, edge.2));
            }
            if problems.is_empty() {
                problems.push("reference multiplicities differ between nodes and table".to_string());
            }
        }
        problems
    }

    pub fn reference_edge_count(&self) -> usize {
        self.inner.references.borrow().edge_count()
    }
}

/// Where `adopt` puts a node in the node order. A vanished anchor
/// falls back to appending.
enum Placement {
    Append,
    Before(NodeId),
    After(NodeId),
}

/// Closes a batch when finished or dropped.
pub struct BatchGuard {
    scene: Scene,
    open: bool,
}

impl BatchGuard {
    /// Closes the batch and returns its diagnostics.
    pub fn finish(mut self) -> Vec<DanglingReference> {
        self.open = false;
        self.scene.end_batch()
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        if self.open {
            self.scene.end_batch();
        }
    }
}

//! # Nodes
//!
//! A [`Node`] is one addressable piece of scene data. All nodes share the same
//! contract (identifier, name, user attributes, named references, observers,
//! serialization and copy); what differs between a volume and a transform is
//! the boxed [`NodeVariant`] payload and the typed accessors it exposes.
//!
//! ## Ownership
//!
//! Nodes are handed around as [`NodeRef`] (`Rc<Node>`). A scene keeps one
//! handle per owned node, anything else (views, tools, tests) may keep more.
//! A node lives as long as its longest holder.
//!
//! Nodes never own each other. A reference is a role name plus the target's
//! [`NodeId`]; it is resolved through the owning scene on demand, so cycles
//! between nodes cannot leak.
//!
//! ## Mutation and Events
//!
//! Every mutator takes `&self`: state sits behind a `RefCell` that is never
//! held while observers run, so a callback may freely read the node that
//! notified it. Each effective change bumps [`Node::generation`] and raises
//! [`EventKind::NodeModified`]. Wrap several changes in
//! [`Node::modify_guard`] to get a single event.
//!
//! ## References Before Adoption
//!
//! A detached node (not yet added to a scene) buffers its references. The
//! scene flushes them into its reference table when it adopts the node.
//! Operations that need to *resolve* a reference fail with
//! [`MrmlError::NotOwned`] on a detached node.

pub mod attributes;
pub mod color;
pub mod storage;
pub mod transform;
pub mod variant;
pub mod volume;

use crate::error::{MrmlError, Result};
use crate::event::{CallData, Event, EventKind, EventSource};
use crate::ids::NodeId;
use crate::observer::{EmitReport, ObserverLedger, SubscriptionHandle};
use crate::scene::{Scene, SceneInner};
use attributes::{
    format_bool, format_map, format_references, parse_bool, parse_map, parse_references,
    AttributeList, ReferenceSet,
};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

pub use color::ColorTable;
pub use storage::VolumeStorage;
pub use transform::LinearTransform;
pub use variant::{NodeVariant, ReferenceRole, RoleArity};
pub use volume::{ScalarVolume, VolumeDisplay};

pub type NodeRef = Rc<Node>;

/// Outcome of a reference mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceUpdate {
    /// The owning scene's reference table was updated.
    Applied,
    /// The node is detached; the change is buffered until adoption.
    Deferred,
    /// Nothing changed.
    Unchanged,
}

#[derive(Clone)]
struct NodeState {
    id: Option<NodeId>,
    name: Option<String>,
    description: Option<String>,
    hide_from_editors: bool,
    selectable: bool,
    selected: bool,
    singleton_tag: Option<String>,
    attributes: BTreeMap<String, String>,
    references: ReferenceSet,
    unknown: Vec<(String, String)>,
    variant: Box<dyn NodeVariant>,
}

pub struct Node {
    class: &'static str,
    state: RefCell<NodeState>,
    generation: Cell<u64>,
    modify_depth: Cell<u32>,
    modify_pending: Cell<bool>,
    scene: RefCell<Weak<SceneInner>>,
    ledger: ObserverLedger,
    self_ref: Weak<Node>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Node")
            .field("class", &self.class)
            .field("id", &state.id)
            .field("name", &state.name)
            .field("references", &state.references)
            .field("generation", &self.generation.get())
            .finish()
    }
}

impl Node {
    /// Creates a detached node around `variant`.
    pub fn new(variant: Box<dyn NodeVariant>) -> NodeRef {
        let class = variant.class_name();
        Rc::new_cyclic(|self_ref| Node {
            class,
            state: RefCell::new(NodeState {
                id: None,
                name: None,
                description: None,
                hide_from_editors: false,
                selectable: true,
                selected: false,
                singleton_tag: None,
                attributes: BTreeMap::new(),
                references: ReferenceSet::new(),
                unknown: Vec::new(),
                variant,
            }),
            generation: Cell::new(0),
            modify_depth: Cell::new(0),
            modify_pending: Cell::new(false),
            scene: RefCell::new(Weak::new()),
            ledger: ObserverLedger::new(),
            self_ref: self_ref.clone(),
        })
    }

    /// Convenience for `Node::new(Box::new(variant))`.
    pub fn with<V: NodeVariant>(variant: V) -> NodeRef {
        Self::new(Box::new(variant))
    }

    /// Fresh detached node of the same class with default contents.
    pub fn new_instance(&self) -> NodeRef {
        let variant = self.state.borrow().variant.new_instance();
        Node::new(variant)
    }

    // ---- identity -------------------------------------------------------

    pub fn class_name(&self) -> &'static str {
        self.class
    }

    pub fn tag_name(&self) -> &'static str {
        self.state.borrow().variant.tag_name()
    }

    pub fn id(&self) -> Option<NodeId> {
        self.state.borrow().id.clone()
    }

    /// The identifier, or `NotOwned` for a node that was never adopted.
    pub fn require_id(&self) -> Result<NodeId> {
        self.id().ok_or_else(|| MrmlError::NotOwned {
            class: self.class.to_string(),
        })
    }

    /// Short human-readable label used in logs.
    pub fn describe(&self) -> String {
        match self.state.try_borrow() {
            Ok(state) => match &state.id {
                Some(id) => id.to_string(),
                None => format!("{} (detached)", self.class),
            },
            Err(_) => self.class.to_string(),
        }
    }

    pub fn is_owned(&self) -> bool {
        self.scene.borrow().strong_count() > 0
    }

    /// The scene owning this node, if any.
    pub fn scene(&self) -> Option<Scene> {
        self.scene.borrow().upgrade().map(Scene::from_inner)
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    // ---- observers ------------------------------------------------------

    pub fn observers(&self) -> &ObserverLedger {
        &self.ledger
    }

    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Event) -> anyhow::Result<()> + 'static,
    {
        self.ledger.subscribe(kind, callback)
    }

    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.ledger.unsubscribe(handle)
    }

    pub(crate) fn invoke(&self, kind: EventKind, call_data: Option<CallData>) -> EmitReport {
        let Some(me) = self.self_ref.upgrade() else {
            return EmitReport::default();
        };
        let mut event = Event::new(kind, EventSource::Node(me));
        event.call_data = call_data;
        self.ledger.emit(&event)
    }

    // ---- modification bookkeeping ---------------------------------------

    /// Marks the node changed: bumps the generation and raises
    /// `NodeModified`, or defers it while a modify guard is open.
    pub fn modified(&self) {
        self.generation.set(self.generation.get() + 1);
        if self.modify_depth.get() > 0 {
            self.modify_pending.set(true);
        } else {
            self.invoke(EventKind::NodeModified, None);
        }
    }

    pub fn start_modify(&self) {
        self.modify_depth.set(self.modify_depth.get() + 1);
    }

    /// Closes one `start_modify`. Returns `true` if a coalesced
    /// `NodeModified` event was raised.
    pub fn end_modify(&self) -> bool {
        let depth = self.modify_depth.get().saturating_sub(1);
        self.modify_depth.set(depth);
        if depth == 0 && self.modify_pending.replace(false) {
            self.invoke(EventKind::NodeModified, None);
            return true;
        }
        false
    }

    pub fn modify_guard(&self) -> ModifyGuard<'_> {
        self.start_modify();
        ModifyGuard { node: self }
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut NodeState) -> (R, bool)) -> R {
        let (result, changed) = {
            let mut state = self.state.borrow_mut();
            f(&mut state)
        };
        if changed {
            self.modified();
        }
        result
    }

    // ---- common properties ----------------------------------------------

    pub fn name(&self) -> Option<String> {
        self.state.borrow().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.mutate(|s| {
            let changed = s.name.as_deref() != Some(name.as_str());
            s.name = Some(name);
            ((), changed)
        })
    }

    pub fn description(&self) -> Option<String> {
        self.state.borrow().description.clone()
    }

    pub fn set_description(&self, description: Option<String>) {
        self.mutate(|s| {
            let changed = s.description != description;
            s.description = description;
            ((), changed)
        })
    }

    pub fn hide_from_editors(&self) -> bool {
        self.state.borrow().hide_from_editors
    }

    pub fn set_hide_from_editors(&self, hide: bool) {
        self.mutate(|s| {
            let changed = s.hide_from_editors != hide;
            s.hide_from_editors = hide;
            ((), changed)
        })
    }

    pub fn selectable(&self) -> bool {
        self.state.borrow().selectable
    }

    pub fn set_selectable(&self, selectable: bool) {
        self.mutate(|s| {
            let changed = s.selectable != selectable;
            s.selectable = selectable;
            ((), changed)
        })
    }

    pub fn selected(&self) -> bool {
        self.state.borrow().selected
    }

    pub fn set_selected(&self, selected: bool) {
        self.mutate(|s| {
            let changed = s.selected != selected;
            s.selected = selected;
            ((), changed)
        })
    }

    pub fn singleton_tag(&self) -> Option<String> {
        self.state.borrow().singleton_tag.clone()
    }

    pub fn set_singleton_tag(&self, tag: Option<String>) {
        self.mutate(|s| {
            let changed = s.singleton_tag != tag;
            s.singleton_tag = tag;
            ((), changed)
        })
    }

    // ---- user attributes ------------------------------------------------

    pub fn attribute(&self, key: &str) -> Option<String> {
        self.state.borrow().attributes.get(key).cloned()
    }

    /// Sets a user attribute. Setting the current value is not a change.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        self.mutate(|s| {
            if s.attributes.get(&key) == Some(&value) {
                return ((), false);
            }
            s.attributes.insert(key, value);
            ((), true)
        })
    }

    pub fn remove_attribute(&self, key: &str) -> Option<String> {
        self.mutate(|s| {
            let old = s.attributes.remove(key);
            let changed = old.is_some();
            (old, changed)
        })
    }

    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.state.borrow().attributes.clone()
    }

    /// Serialized attributes this node did not recognize, in file order.
    pub fn unknown_attributes(&self) -> Vec<(String, String)> {
        self.state.borrow().unknown.clone()
    }

    pub fn clear_unknown_attributes(&self) {
        self.state.borrow_mut().unknown.clear();
    }

    // ---- variant access -------------------------------------------------

    /// Borrows the typed payload. The borrow must be released before the node
    /// is mutated again.
    pub fn variant<T: NodeVariant>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.state.borrow(), |s| s.variant.downcast_ref::<T>()).ok()
    }

    /// Mutable borrow of the typed payload. Unlike [`Node::update_variant`]
    /// this does not raise `NodeModified`; call [`Node::modified`] afterwards.
    pub fn variant_mut<T: NodeVariant>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.state.borrow_mut(), |s| s.variant.downcast_mut::<T>()).ok()
    }

    /// Reads the typed payload. `None` if the node is not a `T`.
    pub fn with_variant<T: NodeVariant, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let state = self.state.borrow();
        state.variant.downcast_ref::<T>().map(f)
    }

    /// Mutates the typed payload and raises `NodeModified`.
    pub fn update_variant<T: NodeVariant, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let result = {
            let mut state = self.state.borrow_mut();
            state.variant.downcast_mut::<T>().map(f)
        };
        if result.is_some() {
            self.modified();
        }
        result
    }

    pub fn is_a<T: NodeVariant>(&self) -> bool {
        self.state.borrow().variant.downcast_ref::<T>().is_some()
    }

    pub fn role_arity(&self, role: &str) -> RoleArity {
        self.state.borrow().variant.arity_of(role)
    }

    // ---- references -----------------------------------------------------

    /// Snapshot of all reference roles and their slots.
    pub fn references(&self) -> ReferenceSet {
        self.state.borrow().references.clone()
    }

    /// Slots of one role; `None` entries are unresolved.
    pub fn reference_slots(&self, role: &str) -> Vec<Option<NodeId>> {
        self.state
            .borrow()
            .references
            .get(role)
            .cloned()
            .unwrap_or_default()
    }

    /// First resolved target id of a role.
    pub fn reference_id(&self, role: &str) -> Option<NodeId> {
        self.reference_slots(role).into_iter().flatten().next()
    }

    /// Adds a reference. Single-valued roles replace their target,
    /// multi-valued roles append.
    pub fn add_reference(&self, role: &str, target: impl Into<NodeId>) -> Result<ReferenceUpdate> {
        let target = target.into();
        let arity = self.role_arity(role);
        let replaced: Vec<NodeId> = {
            let mut state = self.state.borrow_mut();
            let slots = state.references.entry(role.to_string()).or_default();
            if arity == RoleArity::Single && slots.len() == 1 && slots[0].as_ref() == Some(&target) {
                return Ok(ReferenceUpdate::Unchanged);
            }
            match arity {
                RoleArity::Single => {
                    let old = slots.drain(..).flatten().collect();
                    slots.push(Some(target.clone()));
                    old
                }
                RoleArity::Multi => {
                    slots.push(Some(target.clone()));
                    Vec::new()
                }
            }
        };

        let update = match self.owner_with_id() {
            Some((scene, id)) => {
                {
                    let mut table = scene.references.borrow_mut();
                    for old in &replaced {
                        table.remove_reference(&id, role, old);
                    }
                    table.add_edge(&id, role, &target);
                }
                let _guard = self.modify_guard();
                for old in replaced {
                    self.invoke(
                        EventKind::ReferenceRemoved,
                        Some(CallData::Reference {
                            role: role.to_string(),
                            target: old,
                        }),
                    );
                }
                self.invoke(
                    EventKind::ReferenceAdded,
                    Some(CallData::Reference {
                        role: role.to_string(),
                        target,
                    }),
                );
                self.modified();
                ReferenceUpdate::Applied
            }
            None => {
                self.modified();
                ReferenceUpdate::Deferred
            }
        };
        Ok(update)
    }

    /// Makes `target` the only target of `role`, whatever its arity.
    pub fn set_reference(&self, role: &str, target: impl Into<NodeId>) -> Result<ReferenceUpdate> {
        let target = target.into();
        if self.reference_slots(role) == [Some(target.clone())] {
            return Ok(ReferenceUpdate::Unchanged);
        }
        let _guard = self.modify_guard();
        self.clear_role(role)?;
        self.add_reference(role, target)
    }

    /// Removes the first slot of `role` pointing at `target`.
    pub fn remove_reference(&self, role: &str, target: &str) -> Result<ReferenceUpdate> {
        let removed = {
            let mut state = self.state.borrow_mut();
            let Some(slots) = state.references.get_mut(role) else {
                return Ok(ReferenceUpdate::Unchanged);
            };
            match slots
                .iter()
                .position(|s| s.as_ref().map(NodeId::as_str) == Some(target))
            {
                Some(pos) => {
                    slots.remove(pos);
                    if slots.is_empty() {
                        state.references.remove(role);
                    }
                    true
                }
                None => false,
            }
        };
        if !removed {
            return Ok(ReferenceUpdate::Unchanged);
        }

        let target = NodeId::from(target);
        let update = match self.owner_with_id() {
            Some((scene, id)) => {
                scene
                    .references
                    .borrow_mut()
                    .remove_reference(&id, role, &target);
                let _guard = self.modify_guard();
                self.invoke(
                    EventKind::ReferenceRemoved,
                    Some(CallData::Reference {
                        role: role.to_string(),
                        target,
                    }),
                );
                self.modified();
                ReferenceUpdate::Applied
            }
            None => {
                self.modified();
                ReferenceUpdate::Deferred
            }
        };
        Ok(update)
    }

    /// Drops every slot of `role`.
    pub fn clear_role(&self, role: &str) -> Result<ReferenceUpdate> {
        let mut refs = self.references();
        if refs.remove(role).is_none() {
            return Ok(ReferenceUpdate::Unchanged);
        }
        Ok(self.replace_references(refs))
    }

    /// Replaces the whole reference set, keeping the owning scene's table in
    /// sync.
    pub(crate) fn replace_references(&self, refs: ReferenceSet) -> ReferenceUpdate {
        let refs: ReferenceSet = refs.into_iter().filter(|(_, s)| !s.is_empty()).collect();
        {
            let mut state = self.state.borrow_mut();
            if state.references == refs {
                return ReferenceUpdate::Unchanged;
            }
            state.references = refs.clone();
        }
        let update = match self.owner_with_id() {
            Some((scene, id)) => {
                let mut table = scene.references.borrow_mut();
                table.remove_references_from(&id);
                for (role, slots) in &refs {
                    for target in slots.iter().flatten() {
                        table.add_edge(&id, role, target);
                    }
                }
                ReferenceUpdate::Applied
            }
            None => ReferenceUpdate::Deferred,
        };
        self.modified();
        update
    }

    /// Marks every slot pointing at `target` unresolved. Used by the scene
    /// after it has already dropped the matching table edges.
    pub(crate) fn unresolve_reference(&self, target: &NodeId) -> Vec<String> {
        let roles: Vec<String> = {
            let mut state = self.state.borrow_mut();
            let mut roles = Vec::new();
            for (role, slots) in state.references.iter_mut() {
                let mut hit = false;
                for slot in slots.iter_mut() {
                    if slot.as_ref() == Some(target) {
                        *slot = None;
                        hit = true;
                    }
                }
                if hit {
                    roles.push(role.clone());
                }
            }
            roles
        };
        if !roles.is_empty() {
            let _guard = self.modify_guard();
            self.invoke(
                EventKind::ReferencedNodeRemoved,
                Some(CallData::NodeId(target.clone())),
            );
            self.modified();
        }
        roles
    }

    /// Resolves the `index`-th slot of `role` through the owning scene.
    ///
    /// Returns `Ok(None)` for missing or unresolved slots and for targets that
    /// are not in the scene.
    pub fn referenced_node(&self, role: &str, index: usize) -> Result<Option<NodeRef>> {
        let scene = self.require_scene()?;
        let slot = self
            .state
            .borrow()
            .references
            .get(role)
            .and_then(|slots| slots.get(index).cloned())
            .flatten();
        Ok(slot.and_then(|id| scene.node_by_id(id.as_str())))
    }

    /// All resolvable targets of `role`, in slot order.
    pub fn referenced_nodes(&self, role: &str) -> Result<Vec<NodeRef>> {
        let scene = self.require_scene()?;
        Ok(self
            .reference_slots(role)
            .into_iter()
            .flatten()
            .filter_map(|id| scene.node_by_id(id.as_str()))
            .collect())
    }

    fn require_scene(&self) -> Result<Scene> {
        self.scene().ok_or_else(|| MrmlError::NotOwned {
            class: self.class.to_string(),
        })
    }

    fn owner_with_id(&self) -> Option<(Rc<SceneInner>, NodeId)> {
        let scene = self.scene.borrow().upgrade()?;
        let id = self.id()?;
        Some((scene, id))
    }

    // ---- scene adoption (crate internal) ---------------------------------

    pub(crate) fn set_preset_id(&self, id: Option<NodeId>) {
        self.state.borrow_mut().id = id;
    }

    pub(crate) fn attach(&self, scene: Weak<SceneInner>, id: NodeId) {
        let mut state = self.state.borrow_mut();
        if state.name.as_deref().map_or(true, str::is_empty) {
            state.name = Some(id.to_string());
        }
        state.id = Some(id);
        *self.scene.borrow_mut() = scene;
    }

    pub(crate) fn detach(&self) {
        *self.scene.borrow_mut() = Weak::new();
    }

    /// Everything but the owning scene, for rollback and undo.
    pub(crate) fn memento(&self) -> NodeMemento {
        NodeMemento {
            state: self.state.borrow().clone(),
        }
    }

    /// Puts back a state taken with [`Node::memento`]. The identifier is kept
    /// and the owning scene's reference table follows the restored slots.
    pub(crate) fn restore_memento(&self, memento: NodeMemento) {
        let _guard = self.modify_guard();
        let references = {
            let mut saved = memento.state;
            let mut state = self.state.borrow_mut();
            let references = std::mem::take(&mut saved.references);
            saved.id = state.id.clone();
            saved.references = std::mem::take(&mut state.references);
            *state = saved;
            references
        };
        self.replace_references(references);
        self.modified();
    }

    // ---- copy / serialization -------------------------------------------

    /// Copies everything except identifier and owning scene from `other`,
    /// raising a single `NodeModified`.
    pub fn copy_from(&self, other: &Node) -> Result<()> {
        if self.class != other.class {
            return Err(MrmlError::TypeMismatch {
                target_class: self.class.to_string(),
                source_class: other.class.to_string(),
            });
        }
        if std::ptr::eq(self, other) {
            return Ok(());
        }

        let _guard = self.modify_guard();
        let references = {
            let source = other.state.borrow();
            let mut state = self.state.borrow_mut();
            state.variant.copy_from(source.variant.as_ref())?;
            if source.name.as_deref().is_some_and(|n| !n.is_empty()) {
                state.name = source.name.clone();
            }
            state.description = source.description.clone();
            state.hide_from_editors = source.hide_from_editors;
            state.selectable = source.selectable;
            state.selected = source.selected;
            if source.singleton_tag.is_some() {
                state.singleton_tag = source.singleton_tag.clone();
            }
            state.attributes = source.attributes.clone();
            state.unknown = source.unknown.clone();
            source.references.clone()
        };
        self.replace_references(references);
        self.modified();
        Ok(())
    }

    /// Serialized form without the identifier (the scene writes that).
    pub fn write_attributes(&self) -> AttributeList {
        let state = self.state.borrow();
        let mut out = AttributeList::new();
        if let Some(name) = &state.name {
            out.push("name", name.clone());
        }
        if let Some(description) = &state.description {
            out.push("description", description.clone());
        }
        out.push("hideFromEditors", format_bool(state.hide_from_editors));
        out.push("selectable", format_bool(state.selectable));
        out.push("selected", format_bool(state.selected));
        if let Some(tag) = &state.singleton_tag {
            out.push("singletonTag", tag.clone());
        }
        if !state.attributes.is_empty() {
            out.push("attributes", format_map(&state.attributes));
        }
        if state.references.values().any(|slots| !slots.is_empty()) {
            out.push("references", format_references(&state.references));
        }
        state.variant.write_attributes(&mut out);
        for (key, value) in &state.unknown {
            out.push(key.clone(), value.clone());
        }
        out
    }

    /// Reads a serialized attribute list. `id` is ignored: identifiers are
    /// handled by the scene. Unknown keys are preserved.
    pub fn read_attributes(&self, list: &AttributeList) -> Result<()> {
        let _guard = self.modify_guard();
        let mut references = None;
        {
            let mut state = self.state.borrow_mut();
            for (key, value) in list.iter() {
                match key {
                    "id" => {}
                    "name" => state.name = Some(value.to_string()),
                    "description" => state.description = Some(value.to_string()),
                    "hideFromEditors" => state.hide_from_editors = parse_bool(key, value)?,
                    "selectable" => state.selectable = parse_bool(key, value)?,
                    "selected" => state.selected = parse_bool(key, value)?,
                    "singletonTag" => state.singleton_tag = Some(value.to_string()),
                    "attributes" => state.attributes = parse_map(value)?,
                    "references" => references = Some(parse_references(value)?),
                    _ => {
                        if !state.variant.read_attribute(key, value)? {
                            state.unknown.retain(|(k, _)| k != key);
                            state.unknown.push((key.to_string(), value.to_string()));
                        }
                    }
                }
            }
        }
        if let Some(references) = references {
            self.replace_references(references);
        }
        self.modified();
        Ok(())
    }
}

/// Saved node state, see [`Node::memento`].
#[derive(Clone)]
pub(crate) struct NodeMemento {
    state: NodeState,
}

impl NodeMemento {
    pub(crate) fn id(&self) -> Option<&NodeId> {
        self.state.id.as_ref()
    }
}

/// Closes a `start_modify` when dropped.
pub struct ModifyGuard<'a> {
    node: &'a Node,
}

impl Drop for ModifyGuard<'_> {
    fn drop(&mut self) {
        self.node.end_modify();
    }
}

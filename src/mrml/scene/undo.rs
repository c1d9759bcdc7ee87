//! Undo and redo.
//!
//! Undo is off until [`Scene::set_undo_enabled`] turns it on; saving state
//! is then an explicit call made before a change. A step is either a whole
//! scene snapshot ([`Scene::save_state_for_undo`]) or the saved state of a
//! few nodes ([`Scene::save_node_state_for_undo`]). Undoing a scene step
//! goes through [`Scene::restore`], so the nodes it brings back are new
//! handles; undoing a node step writes the saved state back into the nodes
//! that are still owned and skips the others.

use super::io::SceneSnapshot;
use super::Scene;
use crate::error::Result;
use crate::node::{NodeMemento, NodeRef};
use std::collections::VecDeque;

#[derive(Default)]
pub(crate) struct UndoHistory {
    enabled: bool,
    replaying: bool,
    undo: VecDeque<UndoStep>,
    redo: Vec<UndoStep>,
}

#[derive(Clone)]
enum UndoStep {
    Scene(SceneSnapshot),
    Nodes(Vec<NodeMemento>),
}

impl UndoHistory {
    pub(crate) fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    fn push_undo(&mut self, step: UndoStep, limit: usize) {
        self.undo.push_back(step);
        while self.undo.len() > limit {
            self.undo.pop_front();
        }
    }
}

impl Scene {
    pub fn set_undo_enabled(&self, enabled: bool) {
        self.inner.history.borrow_mut().enabled = enabled;
    }

    pub fn is_undo_enabled(&self) -> bool {
        self.inner.history.borrow().enabled
    }

    /// Pushes a snapshot of the whole scene onto the undo stack and drops the
    /// redo stack. Does nothing while undo is off or a step is being undone.
    pub fn save_state_for_undo(&self) {
        if !self.recording() {
            return;
        }
        let step = UndoStep::Scene(self.snapshot());
        self.record(step);
    }

    /// Like [`Scene::save_state_for_undo`], but saves only `nodes`. Nodes
    /// that are not owned by this scene are ignored.
    pub fn save_node_state_for_undo(&self, nodes: &[NodeRef]) {
        if !self.recording() {
            return;
        }
        let saved: Vec<NodeMemento> = nodes
            .iter()
            .filter(|n| n.scene().is_some_and(|s| s.ptr_eq(self)))
            .map(|n| n.memento())
            .collect();
        if saved.is_empty() {
            return;
        }
        self.record(UndoStep::Nodes(saved));
    }

    /// Returns the scene to the last saved state. `Ok(false)` when there is
    /// nothing to undo.
    pub fn undo(&self) -> Result<bool> {
        let Some(step) = self.inner.history.borrow_mut().undo.pop_back() else {
            return Ok(false);
        };
        let inverse = self.inverse_of(&step);
        if let Err(err) = self.replay(&step) {
            self.inner.history.borrow_mut().undo.push_back(step);
            return Err(err);
        }
        self.inner.history.borrow_mut().redo.push(inverse);
        tracing::debug!(levels = self.undo_levels(), "undo");
        Ok(true)
    }

    /// Re-applies the last undone step. `Ok(false)` when there is nothing to
    /// redo.
    pub fn redo(&self) -> Result<bool> {
        let Some(step) = self.inner.history.borrow_mut().redo.pop() else {
            return Ok(false);
        };
        let inverse = self.inverse_of(&step);
        if let Err(err) = self.replay(&step) {
            self.inner.history.borrow_mut().redo.push(step);
            return Err(err);
        }
        let limit = self.config().undo_stack_size;
        self.inner.history.borrow_mut().push_undo(inverse, limit);
        tracing::debug!(levels = self.redo_levels(), "redo");
        Ok(true)
    }

    pub fn undo_levels(&self) -> usize {
        self.inner.history.borrow().undo.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.inner.history.borrow().redo.len()
    }

    pub fn clear_undo_stack(&self) {
        self.inner.history.borrow_mut().undo.clear();
    }

    pub fn clear_redo_stack(&self) {
        self.inner.history.borrow_mut().redo.clear();
    }

    fn recording(&self) -> bool {
        let history = self.inner.history.borrow();
        history.enabled && !history.replaying
    }

    fn record(&self, step: UndoStep) {
        let limit = self.config().undo_stack_size;
        let mut history = self.inner.history.borrow_mut();
        history.push_undo(step, limit);
        history.redo.clear();
    }

    /// The step that takes the scene from after `step` back to now.
    fn inverse_of(&self, step: &UndoStep) -> UndoStep {
        match step {
            UndoStep::Scene(_) => UndoStep::Scene(self.snapshot()),
            UndoStep::Nodes(saved) => UndoStep::Nodes(
                saved
                    .iter()
                    .filter_map(|m| m.id())
                    .filter_map(|id| self.node_by_id(id.as_str()))
                    .map(|n| n.memento())
                    .collect(),
            ),
        }
    }

    fn replay(&self, step: &UndoStep) -> Result<()> {
        self.inner.history.borrow_mut().replaying = true;
        let result = match step {
            UndoStep::Scene(snapshot) => self.restore(snapshot).map(|_| ()),
            UndoStep::Nodes(saved) => {
                let guard = self.batch();
                for memento in saved {
                    let node = memento.id().and_then(|id| self.node_by_id(id.as_str()));
                    match node {
                        Some(node) => node.restore_memento(memento.clone()),
                        None => tracing::debug!("undo skipped a node no longer in the scene"),
                    }
                }
                guard.finish();
                Ok(())
            }
        };
        self.inner.history.borrow_mut().replaying = false;
        result
    }
}

//! Central bookkeeping of node-to-node references.
//!
//! Every edge `from --role--> to` is stored twice: forward under
//! `(from, role)` in slot order, and inverse under `to`. Each method updates
//! both sides before it returns, so outside a method call the two views
//! always agree. Unresolved slots are not edges and never appear here.

use crate::ids::NodeId;
use crate::node::RoleArity;
use std::collections::{BTreeMap, HashMap};

/// One directed reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceEdge {
    pub from: NodeId,
    pub role: String,
    pub to: NodeId,
}

#[derive(Debug, Default)]
pub struct ReferenceTable {
    forward: BTreeMap<(NodeId, String), Vec<NodeId>>,
    inverse: HashMap<NodeId, Vec<(NodeId, String)>>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `from --role--> to`. Single roles drop their previous targets
    /// first; the dropped edges are returned.
    pub fn set_reference(
        &mut self,
        from: &NodeId,
        role: &str,
        to: &NodeId,
        arity: RoleArity,
    ) -> Vec<ReferenceEdge> {
        let mut dropped = Vec::new();
        if arity == RoleArity::Single {
            let old = self
                .forward
                .get(&(from.clone(), role.to_string()))
                .cloned()
                .unwrap_or_default();
            for target in old {
                if self.remove_reference(from, role, &target) {
                    dropped.push(ReferenceEdge {
                        from: from.clone(),
                        role: role.to_string(),
                        to: target,
                    });
                }
            }
        }
        self.add_edge(from, role, to);
        dropped
    }

    /// Appends one edge without looking at arity.
    pub fn add_edge(&mut self, from: &NodeId, role: &str, to: &NodeId) {
        self.forward
            .entry((from.clone(), role.to_string()))
            .or_default()
            .push(to.clone());
        self.inverse
            .entry(to.clone())
            .or_default()
            .push((from.clone(), role.to_string()));
    }

    /// Removes one `from --role--> to` edge. Returns `false` if there was none.
    pub fn remove_reference(&mut self, from: &NodeId, role: &str, to: &NodeId) -> bool {
        let key = (from.clone(), role.to_string());
        let Some(targets) = self.forward.get_mut(&key) else {
            return false;
        };
        let Some(pos) = targets.iter().position(|t| t == to) else {
            return false;
        };
        targets.remove(pos);
        if targets.is_empty() {
            self.forward.remove(&key);
        }
        self.drop_inverse(to, from, role);
        true
    }

    fn drop_inverse(&mut self, to: &NodeId, from: &NodeId, role: &str) {
        if let Some(sources) = self.inverse.get_mut(to) {
            if let Some(pos) = sources.iter().position(|(f, r)| f == from && r == role) {
                sources.remove(pos);
            }
            if sources.is_empty() {
                self.inverse.remove(to);
            }
        }
    }

    /// Drops every outgoing edge of `id` and returns them.
    pub fn remove_references_from(&mut self, id: &NodeId) -> Vec<ReferenceEdge> {
        let keys: Vec<(NodeId, String)> = self
            .forward
            .keys()
            .filter(|(from, _)| from == id)
            .cloned()
            .collect();
        let mut removed = Vec::new();
        for key in keys {
            let Some(targets) = self.forward.remove(&key) else {
                continue;
            };
            for to in targets {
                self.drop_inverse(&to, &key.0, &key.1);
                removed.push(ReferenceEdge {
                    from: key.0.clone(),
                    role: key.1.clone(),
                    to,
                });
            }
        }
        removed
    }

    /// Drops every incoming edge of `id` and returns them, so the referencing
    /// nodes can be told.
    pub fn remove_references_to(&mut self, id: &NodeId) -> Vec<ReferenceEdge> {
        let sources = self.inverse.remove(id).unwrap_or_default();
        let mut removed = Vec::with_capacity(sources.len());
        for (from, role) in sources {
            let key = (from, role);
            if let Some(targets) = self.forward.get_mut(&key) {
                if let Some(pos) = targets.iter().position(|t| t == id) {
                    targets.remove(pos);
                }
                if targets.is_empty() {
                    self.forward.remove(&key);
                }
            }
            let (from, role) = key;
            removed.push(ReferenceEdge {
                from,
                role,
                to: id.clone(),
            });
        }
        removed
    }

    /// `(from, role)` pairs pointing at `id`, in the order they were added.
    pub fn referenced_by(&self, id: &NodeId) -> Vec<(NodeId, String)> {
        self.inverse.get(id).cloned().unwrap_or_default()
    }

    /// Outgoing `(role, to)` edges of `id`, grouped by role.
    pub fn references_from(&self, id: &NodeId) -> Vec<(String, NodeId)> {
        self.forward
            .iter()
            .filter(|((from, _), _)| from == id)
            .flat_map(|((_, role), targets)| targets.iter().map(move |t| (role.clone(), t.clone())))
            .collect()
    }

    pub fn targets(&self, from: &NodeId, role: &str) -> Vec<NodeId> {
        self.forward
            .get(&(from.clone(), role.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn edges(&self) -> impl Iterator<Item = ReferenceEdge> + '_ {
        self.forward.iter().flat_map(|((from, role), targets)| {
            targets.iter().map(move |to| ReferenceEdge {
                from: from.clone(),
                role: role.clone(),
                to: to.clone(),
            })
        })
    }

    pub fn edge_count(&self) -> usize {
        self.forward.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.inverse.clear();
    }

    /// Verifies that forward and inverse views describe the same multiset of
    /// edges. Returns a description of each disagreement.
    pub fn check_consistency(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut expected: HashMap<(NodeId, NodeId, String), usize> = HashMap::new();
        for edge in self.edges() {
            *expected.entry((edge.to, edge.from, edge.role)).or_default() += 1;
        }
        let mut found: HashMap<(NodeId, NodeId, String), usize> = HashMap::new();
        for (to, sources) in &self.inverse {
            if sources.is_empty() {
                problems.push(format!("empty inverse entry for {}", to));
            }
            for (from, role) in sources {
                *found
                    .entry((to.clone(), from.clone(), role.clone()))
                    .or_default() += 1;
            }
        }
        for (key, count) in &expected {
            let seen = found.get(key).copied().unwrap_or(0);
            if seen != *count {
                problems.push(format!(
                    "{} --{}--> {}: {} forward, {} inverse",
                    key.1, key.2, key.0, count, seen
                ));
            }
        }
        for (key, count) in &found {
            if !expected.contains_key(key) {
                problems.push(format!(
                    "{} --{}--> {}: 0 forward, {} inverse",
                    key.1, key.2, key.0, count
                ));
            }
        }
        problems.sort();
        problems
    }
}

//! Bulk loading: import, restore and connect.
//!
//! All three validate before they touch the scene. Records are turned into
//! detached nodes first, so a malformed attribute or an unknown node type
//! fails the operation while the scene is still untouched. References are
//! parsed up front but only applied in a second pass, after every node of
//! the load has its final identifier; that is what lets a node refer to a
//! record further down the file.

use super::io::SceneSnapshot;
use super::{DanglingReference, Scene};
use crate::error::{MrmlError, Result};
use crate::event::EventKind;
use crate::ids::NodeId;
use crate::node::attributes::{parse_references, ReferenceSet};
use crate::node::{NodeMemento, NodeRef};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Outcome of [`Scene::import_str`] and friends.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Identifiers of the nodes now holding the imported records, in file
    /// order.
    pub added: Vec<NodeId>,
    /// Record identifier -> identifier the node actually received.
    pub renamed: BTreeMap<NodeId, NodeId>,
    pub dangling: Vec<DanglingReference>,
}

#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: usize,
    pub removed: usize,
    pub dangling: Vec<DanglingReference>,
}

struct Prepared {
    record_id: NodeId,
    node: NodeRef,
    references: ReferenceSet,
}

impl Scene {
    /// Builds detached nodes for every record without touching the scene.
    fn prepare(&self, snapshot: &SceneSnapshot) -> Result<Vec<Prepared>> {
        let preserve = self.config().preserve_unknown_attributes;
        snapshot
            .records
            .iter()
            .map(|record| {
                let record_id = record
                    .id()
                    .map(NodeId::from)
                    .ok_or_else(|| MrmlError::parse(format!("<{}> record has no id", record.tag)))?;
                let node = self.registry().create_by_tag(&record.tag)?;
                node.read_attributes(&record.attributes.without(&["id", "references"]))?;
                if !preserve {
                    node.clear_unknown_attributes();
                }
                let references = match record.attributes.get("references") {
                    Some(raw) => parse_references(raw)?,
                    None => ReferenceSet::new(),
                };
                node.set_preset_id(Some(record_id.clone()));
                Ok(Prepared {
                    record_id,
                    node,
                    references,
                })
            })
            .collect()
    }

    /// Existing singletons that records of this load would merge into, with
    /// their state before the merge.
    fn singletons_touched_by(&self, prepared: &[Prepared]) -> Vec<(NodeRef, NodeMemento)> {
        let mut saved: Vec<(NodeRef, NodeMemento)> = Vec::new();
        for item in prepared {
            let Some(tag) = item.node.singleton_tag() else {
                continue;
            };
            if let Some(existing) = self.singleton(item.node.class_name(), &tag) {
                if !saved.iter().any(|(n, _)| Rc::ptr_eq(n, &existing)) {
                    let memento = existing.memento();
                    saved.push((existing, memento));
                }
            }
        }
        saved
    }

    pub fn import_str(&self, text: &str) -> Result<ImportReport> {
        let snapshot = SceneSnapshot::parse(text)?;
        self.import_snapshot(&snapshot)
    }

    pub fn import_path<P: AsRef<Path>>(&self, path: P) -> Result<ImportReport> {
        let text = fs::read_to_string(path.as_ref()).map_err(MrmlError::Io)?;
        self.import_str(&text)
    }

    /// Adds the snapshot's nodes to the scene in one batch.
    ///
    /// If any node cannot be added, the nodes already added by this import
    /// are removed again and the error is returned.
    pub fn import_snapshot(&self, snapshot: &SceneSnapshot) -> Result<ImportReport> {
        let prepared = self.prepare(snapshot)?;

        let saved_ids = self.inner.ids.borrow().clone();
        let saved_singletons = self.singletons_touched_by(&prepared);

        let guard = self.batch();
        self.invoke(EventKind::StartImport, None);

        let mut created: Vec<NodeId> = Vec::new();
        let mut owners: Vec<NodeRef> = Vec::with_capacity(prepared.len());
        let mut report = ImportReport::default();
        for item in &prepared {
            match self.add_node(&item.node) {
                Ok(owner) => {
                    let id = owner.require_id()?;
                    if Rc::ptr_eq(&owner, &item.node) {
                        created.push(id.clone());
                    }
                    if id != item.record_id {
                        report.renamed.insert(item.record_id.clone(), id.clone());
                    }
                    report.added.push(id);
                    owners.push(owner);
                }
                Err(err) => {
                    tracing::warn!(
                        record = %item.record_id,
                        error = %err,
                        rolled_back = created.len(),
                        "import failed, rolling back"
                    );
                    for id in created.iter().rev() {
                        self.discard_node(id);
                    }
                    for (node, memento) in saved_singletons {
                        node.restore_memento(memento);
                    }
                    *self.inner.ids.borrow_mut() = saved_ids;
                    guard.finish();
                    return Err(err);
                }
            }
        }

        for (item, owner) in prepared.iter().zip(&owners) {
            if item.references.is_empty() {
                continue;
            }
            let remapped: ReferenceSet = item
                .references
                .iter()
                .map(|(role, slots)| {
                    let slots = slots
                        .iter()
                        .map(|slot| {
                            slot.as_ref()
                                .map(|target| report.renamed.get(target).cloned().unwrap_or_else(|| target.clone()))
                        })
                        .collect();
                    (role.clone(), slots)
                })
                .collect();
            owner.replace_references(remapped);
        }

        self.invoke(EventKind::SceneImported, None);
        report.dangling = guard.finish();
        tracing::info!(
            added = report.added.len(),
            renamed = report.renamed.len(),
            dangling = report.dangling.len(),
            "scene imported"
        );
        Ok(report)
    }

    /// Replaces the scene contents with `snapshot`, keeping the snapshot's
    /// identifiers.
    ///
    /// Every record is validated before anything is removed; on error the
    /// scene is left as it was.
    pub fn restore(&self, snapshot: &SceneSnapshot) -> Result<RestoreReport> {
        let prepared = self.prepare(snapshot)?;
        let mut seen = HashSet::new();
        for item in &prepared {
            if !seen.insert(item.record_id.clone()) {
                return Err(MrmlError::DuplicateId(item.record_id.clone()));
            }
            item.node.replace_references(item.references.clone());
        }

        let guard = self.batch();
        self.invoke(EventKind::StartRestore, None);

        let current: Vec<NodeId> = self.nodes().iter().filter_map(|n| n.id()).collect();
        for id in current.iter().rev() {
            self.remove_node(id.as_str())?;
        }
        let mut restored = 0;
        for item in &prepared {
            self.add_node(&item.node)?;
            restored += 1;
        }

        self.invoke(EventKind::SceneRestored, None);
        let dangling = guard.finish();
        tracing::info!(restored, removed = current.len(), dangling = dangling.len(), "scene restored");
        Ok(RestoreReport {
            restored,
            removed: current.len(),
            dangling,
        })
    }

    /// Replaces the scene contents with the scene in `text`.
    pub fn connect_str(&self, text: &str) -> Result<ImportReport> {
        let snapshot = SceneSnapshot::parse(text)?;
        self.prepare(&snapshot)?;

        let guard = self.batch();
        self.clear(false);
        let result = self.import_snapshot(&snapshot);
        guard.finish();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IdConflictPolicy, SceneConfig};
    use crate::node::{ColorTable, Node, ScalarVolume, VolumeDisplay};
    use crate::registry::NodeRegistry;
    use crate::test_utils::EventLog;

    const FORWARD: &str = r#"<MRML version="Slicer4">
  <Volume id="vol1" name="CT" references="display:disp1;storage:store1"/>
  <VolumeDisplay id="disp1" window="400" level="40"/>
  <VolumeArchetypeStorage id="store1" fileName="ct.nrrd"/>
</MRML>"#;

    #[test]
    fn forward_references_resolve() {
        let scene = Scene::default();
        let report = scene.import_str(FORWARD).unwrap();

        assert_eq!(report.added.len(), 3);
        assert!(report.dangling.is_empty());
        assert!(report.renamed.is_empty());
        let vol = scene.node_by_id("vol1").unwrap();
        let disp = vol.referenced_node("display", 0).unwrap().unwrap();
        assert_eq!(disp.with_variant(|d: &VolumeDisplay| d.window), Some(400.0));
        assert!(scene.check_consistency().is_empty());
    }

    #[test]
    fn import_runs_in_one_batch() {
        let scene = Scene::default();
        let log = EventLog::attach_scene(&scene);
        scene.import_str(FORWARD).unwrap();

        let kinds = log.kinds();
        assert_eq!(kinds.first(), Some(&EventKind::BatchStart));
        assert_eq!(kinds[1], EventKind::StartImport);
        assert_eq!(log.count(EventKind::SceneModified), 1);
        assert_eq!(log.count(EventKind::SceneImported), 1);
        assert_eq!(kinds.last(), Some(&EventKind::BatchEnd));
    }

    #[test]
    fn malformed_records_leave_scene_untouched() {
        let scene = Scene::default();
        scene.add_node(&Node::with(ScalarVolume::default())).unwrap();
        let log = EventLog::attach_scene(&scene);

        let bad = r#"<MRML><Volume id="a"/><VolumeDisplay id="b" window="wide"/></MRML>"#;
        assert!(matches!(scene.import_str(bad), Err(MrmlError::Parse { .. })));
        let unknown = r#"<MRML><Volume id="a"/><Model id="m"/></MRML>"#;
        assert!(matches!(scene.import_str(unknown), Err(MrmlError::UnknownNodeType(_))));

        assert_eq!(scene.len(), 1);
        assert!(log.kinds().is_empty());
    }

    #[test]
    fn id_conflicts_roll_back() {
        let scene = Scene::default();
        scene.import_str(FORWARD).unwrap();
        let again = r#"<MRML><VolumeDisplay id="fresh"/><Volume id="vol1"/></MRML>"#;

        let err = scene.import_str(again).unwrap_err();
        assert!(matches!(err, MrmlError::DuplicateId(id) if id == "vol1"));
        assert_eq!(scene.len(), 3);
        assert!(scene.node_by_id("fresh").is_none());
        assert!(!scene.is_batch_processing());
    }

    #[test]
    fn rollback_keeps_dangling_slots_of_existing_nodes() {
        let scene = Scene::default();
        let display = scene.add_node(&Node::with(VolumeDisplay::default())).unwrap();
        display.add_reference("colorNode", "lut1").unwrap();
        scene.add_node(&Node::with(ScalarVolume::default())).unwrap();
        let generation = display.generation();
        let edges = scene.reference_edge_count();
        let log = EventLog::attach_node(&display);

        let text = r#"<MRML>
  <ColorTable id="lut1" name="Grey" type="1" numcolors="256"/>
  <Volume id="vtkMRMLScalarVolumeNode1"/>
</MRML>"#;
        let err = scene.import_str(text).unwrap_err();

        assert!(matches!(err, MrmlError::DuplicateId(_)));
        assert!(scene.node_by_id("lut1").is_none());
        assert_eq!(display.reference_slots("colorNode"), vec![Some(NodeId::from("lut1"))]);
        assert_eq!(display.generation(), generation);
        assert!(log.kinds().is_empty());
        assert_eq!(scene.reference_edge_count(), edges);
        assert!(scene.check_consistency().is_empty());
        assert_eq!(scene.dangling_references().len(), 1);
    }

    #[test]
    fn rollback_undoes_singleton_merges() {
        let scene = Scene::default();
        let labels = Node::with(ColorTable::default());
        labels.set_name("Labels");
        labels.set_singleton_tag(Some("Labels".into()));
        labels.set_attribute("origin", "builtin");
        let singleton = scene.add_node(&labels).unwrap();
        scene.add_node(&Node::with(ScalarVolume::default())).unwrap();

        let text = r#"<MRML>
  <ColorTable id="other" name="Clobbered" singletonTag="Labels" type="1" numcolors="4"/>
  <Volume id="vtkMRMLScalarVolumeNode1"/>
</MRML>"#;
        assert!(scene.import_str(text).is_err());

        assert_eq!(scene.len(), 2);
        assert_eq!(singleton.name().as_deref(), Some("Labels"));
        assert_eq!(singleton.attribute("origin").as_deref(), Some("builtin"));
        assert_eq!(
            singleton.with_variant(|t: &ColorTable| t.number_of_colors),
            Some(ColorTable::default().number_of_colors)
        );
    }

    #[test]
    fn rollback_returns_identifiers_to_the_allocator() {
        let scene = Scene::default();
        scene.add_node(&Node::with(ScalarVolume::default())).unwrap();

        let text = r#"<MRML><ColorTable id="vtkMRMLColorTableNode1" type="1" numcolors="2"/><Volume id="vtkMRMLScalarVolumeNode1"/></MRML>"#;
        assert!(scene.import_str(text).is_err());

        let table = scene.add_node(&Node::with(ColorTable::default())).unwrap();
        assert_eq!(table.id(), Some(NodeId::from("vtkMRMLColorTableNode1")));
    }

    #[test]
    fn renumbering_remaps_references() {
        let scene = Scene::new(
            Rc::new(NodeRegistry::with_builtin()),
            SceneConfig {
                id_conflict: IdConflictPolicy::Renumber,
                ..Default::default()
            },
        );
        scene.import_str(FORWARD).unwrap();
        let report = scene.import_str(FORWARD).unwrap();

        assert_eq!(report.renamed.len(), 3);
        let new_vol = &report.renamed[&NodeId::from("vol1")];
        let new_disp = &report.renamed[&NodeId::from("disp1")];
        let vol = scene.node_by_id(new_vol.as_str()).unwrap();
        assert_eq!(vol.reference_id("display").as_ref(), Some(new_disp));
        assert_eq!(scene.len(), 6);
        assert!(scene.check_consistency().is_empty());
    }

    #[test]
    fn missing_targets_are_reported() {
        let scene = Scene::default();
        let text = r#"<MRML><VolumeDisplay id="d" references="colorNode:lut"/></MRML>"#;
        let report = scene.import_str(text).unwrap();
        assert_eq!(report.dangling.len(), 1);
        assert_eq!(report.dangling[0].target.as_ref().unwrap(), "lut");
    }

    #[test]
    fn unknown_attributes_follow_config() {
        let text = r#"<MRML><Volume id="v" futureFlag="1"/></MRML>"#;
        let keep = Scene::default();
        keep.import_str(text).unwrap();
        assert!(keep.write_string().unwrap().contains("futureFlag=\"1\""));

        let strict = Scene::new(
            Rc::new(NodeRegistry::with_builtin()),
            SceneConfig {
                preserve_unknown_attributes: false,
                ..Default::default()
            },
        );
        strict.import_str(text).unwrap();
        assert!(!strict.write_string().unwrap().contains("futureFlag"));
    }

    #[test]
    fn restore_replaces_contents() {
        let scene = Scene::default();
        scene.import_str(FORWARD).unwrap();
        let saved = scene.snapshot();

        scene.remove_node("disp1").unwrap();
        scene.add_node(&Node::with(ScalarVolume::default())).unwrap();
        let log = EventLog::attach_scene(&scene);

        let report = scene.restore(&saved).unwrap();
        assert_eq!(report.restored, 3);
        assert_eq!(report.removed, 3);
        assert!(report.dangling.is_empty());
        assert_eq!(scene.snapshot(), saved);
        assert_eq!(log.count(EventKind::StartRestore), 1);
        assert_eq!(log.count(EventKind::SceneRestored), 1);
        assert_eq!(log.count(EventKind::BatchEnd), 1);
        assert!(scene.check_consistency().is_empty());
    }

    #[test]
    fn failed_restore_keeps_scene() {
        let scene = Scene::default();
        scene.import_str(FORWARD).unwrap();
        let before = scene.snapshot();

        let mut broken = before.clone();
        broken.records[1].tag = "Model".into();
        assert!(scene.restore(&broken).is_err());

        let mut duplicated = before.clone();
        duplicated.records.push(before.records[0].clone());
        assert!(matches!(scene.restore(&duplicated), Err(MrmlError::DuplicateId(_))));

        assert_eq!(scene.snapshot(), before);
    }

    #[test]
    fn connect_replaces_scene() {
        let scene = Scene::default();
        scene.add_node(&Node::with(ScalarVolume::default())).unwrap();
        let log = EventLog::attach_scene(&scene);

        scene.connect_str(FORWARD).unwrap();
        assert_eq!(scene.len(), 3);
        assert!(scene.node_by_id("vtkMRMLScalarVolumeNode1").is_none());
        assert_eq!(log.count(EventKind::BatchStart), 1);
        assert_eq!(log.count(EventKind::SceneClosed), 1);

        assert!(scene.connect_str("<MRML><Bogus id=\"x\"/></MRML>").is_err());
        assert_eq!(scene.len(), 3);
    }
}

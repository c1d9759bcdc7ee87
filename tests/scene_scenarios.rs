//! End-to-end scenarios driven through the public scene API.

use mrml::event::{Event, EventKind};
use mrml::node::{LinearTransform, Node, ScalarVolume, VolumeDisplay};
use mrml::{NodeId, Scene};
use std::cell::RefCell;
use std::rc::Rc;

/// Records the kinds of every event raised on a scene.
fn record(scene: &Scene) -> Rc<RefCell<Vec<EventKind>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    scene.observers().subscribe_all(move |event: &Event| {
        sink.borrow_mut().push(event.kind);
        Ok(())
    });
    log
}

fn count(log: &Rc<RefCell<Vec<EventKind>>>, kind: EventKind) -> usize {
    log.borrow().iter().filter(|k| **k == kind).count()
}

#[test]
fn removing_a_volume_unresolves_the_display_reference() {
    let scene = Scene::default();
    let volume = scene.add_node(&Node::with(ScalarVolume::default())).unwrap();
    assert_eq!(
        volume.id(),
        Some(NodeId::from("vtkMRMLScalarVolumeNode1"))
    );

    let display = scene.add_node(&Node::with(VolumeDisplay::default())).unwrap();
    display
        .add_reference("volume", "vtkMRMLScalarVolumeNode1")
        .unwrap();
    assert_eq!(scene.referencing_nodes("vtkMRMLScalarVolumeNode1").len(), 1);

    scene.remove_node("vtkMRMLScalarVolumeNode1").unwrap();

    assert_eq!(scene.len(), 1);
    assert_eq!(display.reference_slots("volume"), vec![None]);
    assert_eq!(scene.reference_edge_count(), 0);
    assert!(scene.referencing_nodes("vtkMRMLScalarVolumeNode1").is_empty());
    assert!(scene.check_consistency().is_empty());
    assert_eq!(scene.dangling_references().len(), 1);
}

#[test]
fn hundred_forward_references_in_one_batch() {
    let scene = Scene::default();
    let log = record(&scene);

    let guard = scene.batch();
    let mut expected = Vec::new();
    for i in 1..=100 {
        let node = Node::with(LinearTransform::default());
        if i < 100 {
            // Points at the node added next, which does not exist yet.
            node.add_reference("transform", format!("vtkMRMLLinearTransformNode{}", i + 1))
                .unwrap();
        }
        let added = scene.add_node(&node).unwrap();
        expected.push(added.id().unwrap());
    }
    let dangling = guard.finish();

    assert!(dangling.is_empty());
    assert_eq!(count(&log, EventKind::BatchStart), 1);
    assert_eq!(count(&log, EventKind::BatchEnd), 1);
    assert_eq!(count(&log, EventKind::SceneModified), 1);
    assert_eq!(count(&log, EventKind::NodeAdded), 100);

    let ids: Vec<NodeId> = scene.nodes().iter().filter_map(|n| n.id()).collect();
    assert_eq!(ids, expected);
    assert_eq!(scene.reference_edge_count(), 99);
    assert!(scene.check_consistency().is_empty());
}

#[test]
fn unsubscribing_twice_is_harmless() {
    let scene = Scene::default();
    let hits = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&hits);
    let handle = scene.subscribe(EventKind::NodeAdded, move |_| {
        *counter.borrow_mut() += 1;
        Ok(())
    });

    scene.add_node(&Node::with(ScalarVolume::default())).unwrap();
    assert!(scene.unsubscribe(handle));
    assert!(!scene.unsubscribe(handle));
    scene.add_node(&Node::with(ScalarVolume::default())).unwrap();

    assert_eq!(*hits.borrow(), 1);
}

#[test]
fn referencing_node_is_told_while_target_is_still_alive() {
    let scene = Scene::default();
    let volume = scene.add_node(&Node::with(ScalarVolume::default())).unwrap();
    let display = scene.add_node(&Node::with(VolumeDisplay::default())).unwrap();
    volume
        .add_reference("display", display.require_id().unwrap())
        .unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let target = Rc::clone(&display);
    volume.observers().subscribe_all(move |event: &Event| {
        if event.kind == EventKind::NodeRemoved {
            let carried = event.node().expect("NodeRemoved carries the removed node");
            assert!(Rc::ptr_eq(carried, &target));
        }
        sink.borrow_mut().push((event.kind, target.is_owned()));
        Ok(())
    });

    let removed = scene
        .remove_node(display.require_id().unwrap().as_str())
        .unwrap();

    let seen = seen.borrow();
    assert!(seen.contains(&(EventKind::ReferencedNodeRemoved, true)));
    assert!(seen.contains(&(EventKind::NodeRemoved, true)));
    assert!(seen.iter().all(|(_, alive)| *alive));
    assert!(!removed.is_owned());
    assert_eq!(volume.reference_slots("display"), vec![None]);
}

#[test]
fn import_resolves_references_to_later_records() {
    let scene = Scene::default();
    let report = scene
        .import_str(
            r#"<MRML version="Slicer4">
  <VolumeDisplay id="disp" references="colorNode:lut"/>
  <ColorTable id="lut" name="Grey" type="1" numcolors="256"/>
</MRML>"#,
        )
        .unwrap();

    assert_eq!(report.added.len(), 2);
    assert!(report.dangling.is_empty());
    let display = scene.node_by_id("disp").unwrap();
    let lut = display.referenced_node("colorNode", 0).unwrap().unwrap();
    assert_eq!(lut.name().as_deref(), Some("Grey"));
    assert_eq!(scene.referencing_nodes("lut").len(), 1);
}

#[test]
fn failing_import_leaves_scene_untouched() {
    let scene = Scene::default();
    scene.import_str(r#"<MRML><Volume id="v"/></MRML>"#).unwrap();

    let err = scene.import_str(r#"<MRML><LinearTransform id="t"/><Volume id="v"/></MRML>"#);

    assert!(err.is_err());
    assert_eq!(scene.len(), 1);
    assert!(scene.node_by_id("t").is_none());
    assert!(!scene.is_batch_processing());
}

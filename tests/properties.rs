//! Property tests for scene serialization and reference bookkeeping.

use mrml::Scene;
use proptest::prelude::*;

const CLASSES: &[&str] = &[
    "vtkMRMLScalarVolumeNode",
    "vtkMRMLScalarVolumeDisplayNode",
    "vtkMRMLLinearTransformNode",
    "vtkMRMLColorTableNode",
    "vtkMRMLVolumeArchetypeStorageNode",
];

const ROLES: &[&str] = &["display", "storage", "transform", "colorNode", "extra"];

#[derive(Debug, Clone)]
struct NodeSpec {
    class: usize,
    name: String,
    attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Remove(usize),
    Link { from: usize, role: usize, to: usize },
    Unlink { from: usize, role: usize, to: usize },
}

fn arb_node() -> impl Strategy<Value = NodeSpec> {
    (
        0..CLASSES.len(),
        "[a-zA-Z0-9 &<>\"':;]{0,12}",
        prop::collection::vec(("[a-z]{1,6}", "[a-zA-Z0-9 ]{0,8}"), 0..3),
    )
        .prop_map(|(class, name, attributes)| NodeSpec {
            class,
            name,
            attributes,
        })
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..CLASSES.len()).prop_map(Op::Add),
        any::<usize>().prop_map(Op::Remove),
        (any::<usize>(), 0..ROLES.len(), any::<usize>())
            .prop_map(|(from, role, to)| Op::Link { from, role, to }),
        (any::<usize>(), 0..ROLES.len(), any::<usize>())
            .prop_map(|(from, role, to)| Op::Unlink { from, role, to }),
    ]
}

fn build(specs: &[NodeSpec], links: &[(usize, usize, usize)]) -> Scene {
    let scene = Scene::default();
    let mut ids = Vec::new();
    for spec in specs {
        let node = scene
            .add_new_node_by_class(CLASSES[spec.class], &spec.name)
            .unwrap();
        for (key, value) in &spec.attributes {
            node.set_attribute(key.as_str(), value.as_str());
        }
        ids.push(node.require_id().unwrap());
    }
    for &(from, role, to) in links {
        let from = &ids[from % ids.len()];
        let to = &ids[to % ids.len()];
        scene
            .add_reference(from.as_str(), ROLES[role], to.as_str())
            .unwrap();
    }
    scene
}

/// Id of the `index`-th node, wrapping around; `None` on an empty scene.
fn pick(scene: &Scene, index: usize) -> Option<String> {
    if scene.is_empty() {
        return None;
    }
    scene
        .nth_node(index % scene.len())
        .and_then(|n| n.id())
        .map(|id| id.to_string())
}

proptest! {
    #[test]
    fn written_scene_reads_back_identically(
        specs in prop::collection::vec(arb_node(), 1..8),
        links in prop::collection::vec((any::<usize>(), 0..ROLES.len(), any::<usize>()), 0..10),
    ) {
        let scene = build(&specs, &links);
        let text = scene.write_string().unwrap();

        let copy = Scene::default();
        let report = copy.import_str(&text).unwrap();
        prop_assert!(report.renamed.is_empty());
        prop_assert!(report.dangling.is_empty());
        prop_assert_eq!(copy.len(), scene.len());

        for (original, read) in scene.nodes().iter().zip(copy.nodes()) {
            prop_assert_eq!(original.id(), read.id());
            prop_assert_eq!(original.class_name(), read.class_name());
            prop_assert_eq!(original.name(), read.name());
            prop_assert_eq!(original.attributes(), read.attributes());
            prop_assert_eq!(original.references(), read.references());
        }
        prop_assert_eq!(copy.write_string().unwrap(), text);
    }

    #[test]
    fn reference_table_stays_consistent(ops in prop::collection::vec(arb_op(), 1..40)) {
        let scene = Scene::default();
        for op in ops {
            match op {
                Op::Add(class) => {
                    scene.add_new_node_by_class(CLASSES[class], "").unwrap();
                }
                Op::Remove(index) => {
                    if let Some(id) = pick(&scene, index) {
                        scene.remove_node(&id).unwrap();
                    }
                }
                Op::Link { from, role, to } => {
                    if let (Some(from), Some(to)) = (pick(&scene, from), pick(&scene, to)) {
                        scene.add_reference(&from, ROLES[role], &to).unwrap();
                    }
                }
                Op::Unlink { from, role, to } => {
                    if let (Some(from), Some(to)) = (pick(&scene, from), pick(&scene, to)) {
                        scene.remove_reference(&from, ROLES[role], &to).unwrap();
                    }
                }
            }
            prop_assert_eq!(scene.check_consistency(), Vec::<String>::new());
            for node in scene.nodes() {
                let id = node.require_id().unwrap();
                for referrer in scene.referencing_nodes(id.as_str()) {
                    prop_assert!(referrer.is_owned());
                }
            }
        }
    }
}

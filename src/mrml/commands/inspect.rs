use crate::commands::{load_scene, CmdMessage, CmdResult, NodeSummary};
use crate::config::SceneConfig;
use crate::error::Result;
use std::path::Path;

pub fn run(path: &Path, config: &SceneConfig) -> Result<CmdResult> {
    let (scene, report) = load_scene(path, config)?;
    let nodes = scene.nodes().iter().map(NodeSummary::from_node).collect();
    let mut result = CmdResult::default().with_listed_nodes(nodes);

    result.add_message(CmdMessage::info(format!(
        "{} node(s), {} reference(s)",
        scene.len(),
        scene.reference_edge_count()
    )));
    for (from, to) in &report.renamed {
        result.add_message(CmdMessage::warning(format!("Renumbered {} to {}", from, to)));
    }
    if !report.dangling.is_empty() {
        result.add_message(CmdMessage::warning(format!(
            "{} dangling reference(s); run `mrml check` for details",
            report.dangling.len()
        )));
    }
    Ok(result)
}

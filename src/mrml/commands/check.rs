use crate::commands::{load_scene, CmdMessage, CmdResult};
use crate::config::SceneConfig;
use crate::error::Result;
use std::path::Path;

pub fn run(path: &Path, config: &SceneConfig) -> Result<CmdResult> {
    let (scene, report) = load_scene(path, config)?;
    let inconsistencies = scene.check_consistency();
    let mut result = CmdResult::default();

    if report.dangling.is_empty() && inconsistencies.is_empty() {
        result.add_message(CmdMessage::success(format!(
            "No problems found in {} node(s).",
            scene.len()
        )));
        return Ok(result);
    }

    if !report.dangling.is_empty() {
        result.add_message(CmdMessage::warning(format!(
            "{} dangling reference(s):",
            report.dangling.len()
        )));
        for reference in &report.dangling {
            result.add_message(CmdMessage::info(format!("  - {}", reference)));
        }
    }
    if !inconsistencies.is_empty() {
        result.add_message(CmdMessage::error("Reference table is inconsistent:"));
        for problem in &inconsistencies {
            result.add_message(CmdMessage::info(format!("  - {}", problem)));
        }
    }
    result.problems = report.dangling.len() + inconsistencies.len();
    Ok(result)
}

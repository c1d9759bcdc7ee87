use crate::commands::{load_scene, CmdMessage, CmdResult};
use crate::config::SceneConfig;
use crate::error::Result;
use std::path::Path;

/// Re-writes a scene in canonical attribute order. Without `output` the text
/// is returned for printing.
pub fn run(path: &Path, output: Option<&Path>, config: &SceneConfig) -> Result<CmdResult> {
    let (scene, report) = load_scene(path, config)?;
    let mut result = CmdResult::default();

    match output {
        Some(target) => {
            scene.write_path(target)?;
            result.written = Some(target.to_path_buf());
            result.add_message(CmdMessage::success(format!(
                "Wrote {} node(s) to {}",
                scene.len(),
                target.display()
            )));
        }
        None => result.output = Some(scene.write_string()?),
    }
    if !report.dangling.is_empty() {
        result.add_message(CmdMessage::warning(format!(
            "Scene has {} dangling reference(s)",
            report.dangling.len()
        )));
    }
    Ok(result)
}

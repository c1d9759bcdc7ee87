//! # Command Layer
//!
//! The operations behind the `mrml` binary. Each command lives in its own
//! submodule, loads a scene file through the library and returns a
//! [`CmdResult`]: the data to show plus leveled messages. Commands never
//! print and never pick exit codes; the CLI layer does both.
//!
//! - [`inspect`]: List the nodes of a scene file
//! - [`check`]: Report dangling references and table inconsistencies
//! - [`normalize`]: Re-write a scene file in canonical form

use crate::config::SceneConfig;
use crate::error::Result;
use crate::node::NodeRef;
use crate::registry::NodeRegistry;
use crate::scene::{ImportReport, Scene};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub mod check;
pub mod inspect;
pub mod normalize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// One node as shown by `inspect`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NodeSummary {
    pub id: String,
    pub class: String,
    pub name: Option<String>,
    /// Role -> targets; unresolved slots are empty strings.
    pub references: Vec<(String, Vec<String>)>,
}

impl NodeSummary {
    pub fn from_node(node: &NodeRef) -> Self {
        Self {
            id: node.id().map(|id| id.to_string()).unwrap_or_default(),
            class: node.class_name().to_string(),
            name: node.name(),
            references: node
                .references()
                .into_iter()
                .map(|(role, slots)| {
                    let targets = slots
                        .into_iter()
                        .map(|slot| slot.map(|id| id.to_string()).unwrap_or_default())
                        .collect();
                    (role, targets)
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub listed_nodes: Vec<NodeSummary>,
    pub messages: Vec<CmdMessage>,
    /// Scene text to print when no output file was given.
    pub output: Option<String>,
    pub written: Option<PathBuf>,
    /// Number of problems found; the CLI fails when this is non-zero.
    pub problems: usize,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_listed_nodes(mut self, nodes: Vec<NodeSummary>) -> Self {
        self.listed_nodes = nodes;
        self
    }
}

/// Loads `path` into a fresh scene built from the built-in registry.
pub fn load_scene(path: &Path, config: &SceneConfig) -> Result<(Scene, ImportReport)> {
    let scene = Scene::new(Rc::new(NodeRegistry::with_builtin()), config.clone());
    let report = scene.import_path(path)?;
    Ok((scene, report))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    pub const HEAD_CT: &str = r#"<MRML version="Slicer4">
  <Volume id="vtkMRMLScalarVolumeNode1" name="Head CT" references="display:vtkMRMLScalarVolumeDisplayNode1;storage:vtkMRMLVolumeArchetypeStorageNode1"/>
  <VolumeDisplay id="vtkMRMLScalarVolumeDisplayNode1" window="80" level="40" references="colorNode:vtkMRMLColorTableNode1"/>
  <VolumeArchetypeStorage id="vtkMRMLVolumeArchetypeStorageNode1" fileName="head.nrrd"/>
  <ColorTable id="vtkMRMLColorTableNode1" name="Grey" type="1" numcolors="256"/>
</MRML>
"#;

    pub const BROKEN_LINK: &str = r#"<MRML version="Slicer4">
  <VolumeDisplay id="disp" references="colorNode:missingLut"/>
</MRML>
"#;

    pub fn write_scene(content: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.mrml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }
}

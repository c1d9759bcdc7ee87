use crate::error::{MrmlError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "mrml.json";
const DEFAULT_VERSION: &str = "Slicer4";
const DEFAULT_UNDO_STACK_SIZE: usize = 100;

/// What to do when a node arrives with an identifier the scene already uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdConflictPolicy {
    /// Reject the node with `DuplicateId`.
    #[default]
    Fail,
    /// Allocate a fresh identifier and remap references to it.
    Renumber,
}

/// Scene behaviour settings, stored as `mrml.json` in the config directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SceneConfig {
    #[serde(default)]
    pub id_conflict: IdConflictPolicy,

    /// Keep serialized attributes no node type understands, and write them
    /// back out.
    #[serde(default = "default_preserve")]
    pub preserve_unknown_attributes: bool,

    /// Value of the `version` attribute on the `MRML` root element.
    #[serde(default = "default_version")]
    pub version: String,

    /// Undo steps kept before the oldest is dropped.
    #[serde(default = "default_undo_stack_size")]
    pub undo_stack_size: usize,
}

fn default_preserve() -> bool {
    true
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn default_undo_stack_size() -> usize {
    DEFAULT_UNDO_STACK_SIZE
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            id_conflict: IdConflictPolicy::default(),
            preserve_unknown_attributes: default_preserve(),
            version: default_version(),
            undo_stack_size: default_undo_stack_size(),
        }
    }
}

impl SceneConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(MrmlError::Io)?;
        let config: SceneConfig = serde_json::from_str(&content).map_err(MrmlError::Config)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(MrmlError::Io)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(MrmlError::Config)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content).map_err(MrmlError::Io)?;
        Ok(())
    }

    pub fn renumbers(&self) -> bool {
        self.id_conflict == IdConflictPolicy::Renumber
    }
}

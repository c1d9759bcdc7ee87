use crate::ids::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MrmlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Cannot copy a {source_class} node into a {target_class} node")]
    TypeMismatch {
        target_class: String,
        source_class: String,
    },

    #[error("Node {class} is not owned by a scene")]
    NotOwned { class: String },

    #[error("Node {0} already belongs to a scene")]
    AlreadyOwned(NodeId),

    #[error("Duplicate node id: {0}")]
    DuplicateId(NodeId),

    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Parse error at byte {position}: {message}")]
    Parse { position: u64, message: String },

    #[error("Failed to write scene: {0}")]
    Xml(String),
}

impl MrmlError {
    pub fn parse(message: impl Into<String>) -> Self {
        MrmlError::Parse {
            position: 0,
            message: message.into(),
        }
    }

    pub fn parse_at(position: u64, message: impl Into<String>) -> Self {
        MrmlError::Parse {
            position,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MrmlError>;

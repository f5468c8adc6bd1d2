//! Error type shared by the schematic core.

use std::time::Duration;

use crate::network::{EdgeId, NodeId};

#[derive(Debug, thiserror::Error)]
pub enum SchematicError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Edge not found: {0}")]
    EdgeNotFound(EdgeId),

    #[error("Duplicate element id in topology: {0}")]
    DuplicateId(String),

    #[error("Value out of domain for {element}: {value}")]
    OutOfDomain { element: String, value: f64 },

    #[error("Path needs at least two points, got {0}")]
    DegenerateGeometry(usize),

    #[error("Invalid path description at '{token}': {reason}")]
    InvalidPath { token: String, reason: &'static str },

    #[error("Refresh interval must be non-zero, got {0:?}")]
    InvalidRefreshInterval(Duration),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Snapshot encoding failed: {0}")]
    Snapshot(#[from] postcard::Error),
}

pub type Result<T, E = SchematicError> = std::result::Result<T, E>;

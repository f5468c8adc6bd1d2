//! The single "currently inspected" node slot.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::network::{NetworkModel, NodeId};
use crate::status::{ControlCapability, Status};

/// Which node, if any, is being inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    selected: Option<NodeId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `id`. The id must belong to `model`; the render layer only
    /// emits ids it got from the model, so a miss is a caller bug.
    pub fn select(&mut self, model: &NetworkModel, id: &str) -> Result<()> {
        let node = model.node(id)?;
        if self.selected.as_ref() != Some(&node.id) {
            self.selected = Some(node.id.clone());
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, id: &NodeId) -> bool {
        self.selected.as_ref() == Some(id)
    }

    /// Detail panel contents for the selected node.
    pub fn inspect(&self, model: &NetworkModel) -> Option<NodeDetails> {
        let id = self.selected.as_ref()?;
        let node = match model.node(id.as_str()) {
            Ok(node) => node,
            Err(err) => {
                tracing::warn!(%err, "Selected node missing from model");
                return None;
            }
        };
        Some(NodeDetails {
            id: node.id.clone(),
            label: node.label.clone(),
            kind: node.kind.name(),
            status: node.status,
            color: node.status.color(),
            value: node
                .reading
                .as_ref()
                .map(|r| format!("{:.1} {}", r.value, r.unit)),
            control: node.kind.control(),
        })
    }
}

/// What the inspection panel shows for a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDetails {
    pub id: NodeId,
    pub label: String,
    pub kind: &'static str,
    pub status: Status,
    pub color: &'static str,
    /// Reading with one decimal and its unit, e.g. `"90.0 %"`.
    pub value: Option<String>,
    pub control: ControlCapability,
}

//! The live schematic view: model, simulator, viewport and selection behind
//! one owner, plus the read-only snapshot the renderer draws from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{FlowPath, Point, Size};
use crate::interaction::{PointerAction, PointerInteraction};
use crate::network::{EdgeId, NetworkModel, Node, NodeId, StatusCounts};
use crate::selection::{NodeDetails, Selection};
use crate::settings::ViewSettings;
use crate::status::{NodeKind, SensorKind, Status};
use crate::telemetry::{RngSource, TelemetrySimulator, TelemetrySource, TickReport};
use crate::viewport::{ViewTransform, Viewport, ViewportConfig};

/// Everything the renderer needs for one frame.
///
/// Plain data only, so it survives both JSON and postcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub tick: u64,
    pub last_updated: Option<DateTime<Utc>>,
    pub transform: ViewTransform,
    pub css_transform: String,
    pub selected: Option<NodeId>,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub label: String,
    pub kind: String,
    pub sensor: Option<SensorKind>,
    pub position: Point,
    pub size: Size,
    pub rotation: Option<f64>,
    pub status: Status,
    pub color: String,
    pub animated: bool,
    pub value: Option<f64>,
    /// Reading as printed under the node, e.g. `"90%"` or `"1.2mg/L"`.
    pub value_text: Option<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub id: EdgeId,
    pub path: FlowPath,
    pub status: Status,
    pub color: String,
    pub animated: bool,
    pub flow_rate: Option<f64>,
    pub label_anchor: Option<Point>,
    pub label: Option<String>,
}

impl RenderSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to bytes using postcard.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// Deserialize from bytes using postcard.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(postcard::from_bytes(data)?)
    }

    pub fn node(&self, id: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == *id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeSnapshot> {
        self.edges.iter().find(|e| e.id == *id)
    }
}

impl NodeSnapshot {
    fn capture(node: &Node, selected: bool) -> Self {
        let sensor = match node.kind {
            NodeKind::Sensor { sensor } => Some(sensor),
            _ => None,
        };
        let value_text = node.reading.as_ref().map(|r| match node.kind {
            NodeKind::Sensor { .. } => format!("{:.1}{}", r.value, r.unit),
            _ => format!("{:.0}{}", r.value, r.unit),
        });
        Self {
            id: node.id.clone(),
            label: node.label.clone(),
            kind: node.kind.name().to_owned(),
            sensor,
            position: node.geometry.position,
            size: node.geometry.size,
            rotation: node.geometry.rotation,
            status: node.status,
            color: node.status.color().to_owned(),
            animated: node.status.is_animated(),
            value: node.value(),
            value_text,
            selected,
        }
    }
}

/// Owner of the live view state.
///
/// All mutation goes through `&mut self`, so a tick is always applied in full
/// before anything reads the model again.
#[derive(Debug, Clone)]
pub struct SchematicView<S = RngSource> {
    model: NetworkModel,
    simulator: TelemetrySimulator<S>,
    viewport: Viewport,
    selection: Selection,
    pointer: PointerInteraction,
    settings: ViewSettings,
}

impl SchematicView<RngSource> {
    /// Reference plant with a seeded simulator and default viewport.
    pub fn seeded(seed: u64, settings: ViewSettings) -> Self {
        Self::new(
            NetworkModel::initialize(),
            TelemetrySimulator::seeded(seed),
            ViewportConfig::default(),
            settings,
        )
    }
}

impl<S: TelemetrySource> SchematicView<S> {
    pub fn new(
        model: NetworkModel,
        simulator: TelemetrySimulator<S>,
        viewport: ViewportConfig,
        settings: ViewSettings,
    ) -> Self {
        Self {
            model,
            simulator,
            viewport: Viewport::new(viewport),
            selection: Selection::new(),
            pointer: PointerInteraction::default(),
            settings,
        }
    }

    pub fn model(&self) -> &NetworkModel {
        &self.model
    }

    pub fn simulator(&self) -> &TelemetrySimulator<S> {
        &self.simulator
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn settings(&self) -> ViewSettings {
        self.settings
    }

    /// Replaces the settings. Returns `true` when the refresh interval
    /// changed and the caller has to reschedule its timer.
    pub fn set_settings(&mut self, settings: ViewSettings) -> bool {
        let changed = settings.refresh_interval() != self.settings.refresh_interval();
        self.settings = settings;
        changed
    }

    pub fn tick(&mut self) -> TickReport {
        self.simulator.tick(&mut self.model)
    }

    pub fn select(&mut self, id: &str) -> Result<()> {
        self.selection.select(&self.model, id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn inspect(&self) -> Option<NodeDetails> {
        self.selection.inspect(&self.model)
    }

    /// Pointer pressed at a canvas position. The node under it, if any, is
    /// resolved through the current transform. A drag whose release never
    /// arrived is cancelled first.
    pub fn pointer_down(&mut self, screen: Point) -> PointerAction {
        if self.viewport.is_dragging() {
            self.viewport.gesture_cancel();
        }
        let world = self.viewport.to_world(screen);
        let target = self.model.node_at(world).map(|node| node.id.clone());
        self.pointer.press(screen, target)
    }

    pub fn pointer_move(&mut self, screen: Point) -> Result<PointerAction> {
        let action = self.pointer.moved(screen);
        self.apply(&action)?;
        Ok(action)
    }

    pub fn pointer_up(&mut self, screen: Point) -> Result<PointerAction> {
        let action = self.pointer.release(screen);
        self.apply(&action)?;
        Ok(action)
    }

    pub fn pointer_leave(&mut self) -> Result<PointerAction> {
        let action = self.pointer.leave();
        self.apply(&action)?;
        Ok(action)
    }

    fn apply(&mut self, action: &PointerAction) -> Result<()> {
        match action {
            PointerAction::Ignore => {}
            PointerAction::Pan { anchor, pointer } => {
                let anchored = self
                    .viewport
                    .drag_anchor()
                    .is_some_and(|drag| drag.pointer == *anchor);
                if !anchored {
                    self.viewport.gesture_start(*anchor);
                }
                self.viewport.gesture_move(*pointer);
            }
            PointerAction::EndPan { pointer } => {
                self.viewport.gesture_move(*pointer);
                self.viewport.gesture_end();
            }
            PointerAction::CancelPan => self.viewport.gesture_cancel(),
            PointerAction::Select { id } => self.selection.select(&self.model, id.as_str())?,
        }
        Ok(())
    }

    /// Current state, ready to draw.
    pub fn snapshot(&self) -> RenderSnapshot {
        let transform = self.viewport.transform();
        let nodes = self
            .model
            .nodes()
            .iter()
            .map(|node| NodeSnapshot::capture(node, self.selection.is_selected(&node.id)))
            .collect();
        let edges = self
            .model
            .edges()
            .iter()
            .map(|edge| {
                let label_anchor = edge.label_anchor();
                EdgeSnapshot {
                    id: edge.id.clone(),
                    path: edge.path.clone(),
                    status: edge.status,
                    color: edge.status.color().to_owned(),
                    animated: edge.status.is_animated(),
                    flow_rate: edge.flow_rate,
                    label: label_anchor
                        .and(edge.flow_rate)
                        .map(|flow| format!("{flow:.0} gal/min")),
                    label_anchor,
                }
            })
            .collect();

        RenderSnapshot {
            tick: self.simulator.ticks(),
            last_updated: self.simulator.last_updated(),
            transform,
            css_transform: transform.css(),
            selected: self.selection.selected().cloned(),
            nodes,
            edges,
            counts: self.model.status_counts(),
        }
    }

    /// Tears the interactive state down: viewport back to identity, no
    /// selection, no pointer gesture. The model is kept.
    pub fn close(&mut self) {
        self.viewport.reset();
        self.selection.clear();
        self.pointer = PointerInteraction::default();
        tracing::debug!(tick = self.simulator.ticks(), "Schematic view closed");
    }
}

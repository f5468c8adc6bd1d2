//! Schematic Core Library
//!
//! Live model of a water-treatment process network: typed components and
//! flow paths, a stochastic telemetry simulator that keeps their health
//! status in step with their readings, and the pan/zoom/selection state a
//! renderer needs to draw the plant.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod geometry;
pub mod interaction;
pub mod network;
pub mod selection;
pub mod settings;
pub mod status;
pub mod telemetry;
pub mod view;
pub mod viewport;

pub use error::{Result, SchematicError};
pub use geometry::{FlowPath, NodeGeometry, PathCommand, Point, Size, midpoint};
pub use interaction::{CLICK_DRAG_THRESHOLD, PointerAction, PointerInteraction};
pub use network::{Edge, EdgeId, NetworkModel, Node, NodeId, Reading, StatusCounts};
pub use selection::{NodeDetails, Selection};
pub use settings::{REFRESH_PRESETS, ViewSettings};
pub use status::{
    ControlCapability, NodeKind, SensorKind, Status, ValueDomain, derive_edge_status,
    derive_node_status,
};
pub use telemetry::{
    ElementRef, RngSource, StatusChange, TelemetryConfig, TelemetrySimulator, TelemetrySource,
    TickReport,
};
pub use view::{EdgeSnapshot, NodeSnapshot, RenderSnapshot, SchematicView};
pub use viewport::{
    DEFAULT_CANVAS, DragAnchor, GestureState, ViewTransform, Viewport, ViewportConfig,
};

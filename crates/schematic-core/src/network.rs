//! Process network: typed component nodes connected by flow paths.
//!
//! The topology (ids, kinds, geometry, routes) is fixed once the model is
//! built. Only readings, flow rates and the statuses derived from them change
//! afterwards, and only through [`Node::apply_delta`] / [`Edge::apply_delta`].

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchematicError};
use crate::geometry::{FlowPath, NodeGeometry, Point, polyline};
use crate::status::{NodeKind, Status, derive_edge_status, derive_node_status};

/// Stable identifier of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

/// Stable identifier of a flow path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }
    };
}

string_id!(NodeId);
string_id!(EdgeId);

/// Scalar reading of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    pub unit: String,
}

/// One process component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    pub geometry: NodeGeometry,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<Reading>,
}

impl Node {
    pub fn new(
        id: impl Into<String>,
        kind: NodeKind,
        label: impl Into<String>,
        geometry: NodeGeometry,
    ) -> Self {
        Self {
            id: NodeId::new(id),
            kind,
            label: label.into(),
            geometry,
            status: Status::Normal,
            reading: None,
        }
    }

    /// Creates a sensor whose kind (flow or concentration) follows its label.
    pub fn sensor(id: impl Into<String>, label: impl Into<String>, geometry: NodeGeometry) -> Self {
        let label = label.into();
        Self::new(id, NodeKind::sensor_for_label(&label), label, geometry)
    }

    /// Attaches a reading and derives the status from it.
    #[must_use]
    pub fn with_reading(mut self, value: f64, unit: impl Into<String>) -> Self {
        let value = self.kind.value_domain().clamp(value).unwrap_or(0.0);
        self.reading = Some(Reading {
            value,
            unit: unit.into(),
        });
        self.refresh_status();
        self
    }

    /// Sets the configured status of a kind whose status is not value-driven
    /// (tanks, filters). Value-driven kinds keep their derived status.
    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self.refresh_status();
        self
    }

    pub fn value(&self) -> Option<f64> {
        self.reading.as_ref().map(|r| r.value)
    }

    pub fn unit(&self) -> Option<&str> {
        self.reading.as_ref().map(|r| r.unit.as_str())
    }

    /// Adds `delta` to the reading, clamps it into the kind's domain and
    /// re-derives the status. Nodes without a reading are left untouched.
    pub fn apply_delta(&mut self, delta: f64) -> Result<()> {
        let domain = self.kind.value_domain();
        let Some(reading) = self.reading.as_mut() else {
            return Ok(());
        };
        let raw = reading.value + delta;
        let value = domain.clamp(raw).ok_or_else(|| SchematicError::OutOfDomain {
            element: self.id.to_string(),
            value: raw,
        })?;
        reading.value = value;
        self.refresh_status();
        Ok(())
    }

    fn refresh_status(&mut self) {
        if let Some(value) = self.value() {
            if let Some(status) = derive_node_status(self.kind, value) {
                self.status = status;
            }
        }
    }
}

/// Directed flow path between two process stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub path: FlowPath,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_rate: Option<f64>,
}

impl Edge {
    /// Creates an open path carrying `flow_rate`.
    pub fn new(id: impl Into<String>, path: FlowPath, flow_rate: f64) -> Self {
        let flow_rate = flow_rate.max(0.0);
        Self {
            id: EdgeId::new(id),
            path,
            status: derive_edge_status(Some(flow_rate)),
            flow_rate: Some(flow_rate),
        }
    }

    /// Creates a closed path. It stays inactive for the life of the model.
    pub fn closed(id: impl Into<String>, path: FlowPath) -> Self {
        Self {
            id: EdgeId::new(id),
            path,
            status: Status::Inactive,
            flow_rate: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.flow_rate.is_none()
    }

    /// Adds `delta` to the flow rate, floors it at zero and re-derives the
    /// status. Closed paths are left untouched.
    pub fn apply_delta(&mut self, delta: f64) -> Result<()> {
        let Some(flow) = self.flow_rate else {
            return Ok(());
        };
        let raw = flow + delta;
        if !raw.is_finite() {
            return Err(SchematicError::OutOfDomain {
                element: self.id.to_string(),
                value: raw,
            });
        }
        let flow = raw.max(0.0);
        self.flow_rate = Some(flow);
        self.status = derive_edge_status(Some(flow));
        Ok(())
    }

    /// Where the flow rate label is drawn: 10 units above the route's
    /// midpoint. Inactive paths carry no label.
    pub fn label_anchor(&self) -> Option<Point> {
        if self.status == Status::Inactive || self.flow_rate.is_none() {
            return None;
        }
        let mid = self.path.midpoint();
        Some(Point::new(mid.x, mid.y - 10.0))
    }
}

/// Number of elements per status, for the legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub normal: usize,
    pub warning: usize,
    pub critical: usize,
    pub inactive: usize,
}

impl StatusCounts {
    fn add(&mut self, status: Status) {
        match status {
            Status::Normal => self.normal += 1,
            Status::Warning => self.warning += 1,
            Status::Critical => self.critical += 1,
            Status::Inactive => self.inactive += 1,
        }
    }

    pub fn get(&self, status: Status) -> usize {
        match status {
            Status::Normal => self.normal,
            Status::Warning => self.warning,
            Status::Critical => self.critical,
            Status::Inactive => self.inactive,
        }
    }
}

#[derive(Deserialize)]
struct TopologyFile {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// The process network with its current readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkModel {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl NetworkModel {
    /// Builds a model from an arbitrary topology.
    ///
    /// Ids must be unique across nodes and across edges. Readings are clamped
    /// into their domain and every value-driven status is re-derived, so a
    /// hand-written status that disagrees with its reading is corrected.
    /// A sensor's kind always follows its label.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        let mut node_ids = HashSet::new();
        for node in &nodes {
            if !node_ids.insert(node.id.as_str()) {
                return Err(SchematicError::DuplicateId(node.id.to_string()));
            }
        }
        let mut edge_ids = HashSet::new();
        for edge in &edges {
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(SchematicError::DuplicateId(edge.id.to_string()));
            }
        }

        let nodes = nodes
            .into_iter()
            .map(|mut node| -> Result<Node> {
                if let NodeKind::Sensor { sensor } = node.kind {
                    let resolved = NodeKind::sensor_for_label(&node.label);
                    if resolved != node.kind {
                        tracing::warn!(
                            node = %node.id,
                            label = %node.label,
                            ?sensor,
                            "Sensor kind disagrees with label; using the label"
                        );
                        node.kind = resolved;
                    }
                }
                if let Some(reading) = node.reading.as_mut() {
                    reading.value = node
                        .kind
                        .value_domain()
                        .clamp(reading.value)
                        .ok_or_else(|| SchematicError::OutOfDomain {
                            element: node.id.to_string(),
                            value: reading.value,
                        })?;
                }
                node.refresh_status();
                Ok(node)
            })
            .collect::<Result<Vec<_>>>()?;

        let edges = edges
            .into_iter()
            .map(|mut edge| {
                edge.flow_rate = edge.flow_rate.map(|f| f.max(0.0));
                edge.status = derive_edge_status(edge.flow_rate);
                edge
            })
            .collect();

        Ok(Self { nodes, edges })
    }

    /// The reference water-treatment plant: intake, raw water basin, primary
    /// pumps, three-stage treatment, chlorination, clean water reservoir,
    /// distribution pumps and output.
    pub fn initialize() -> Self {
        let nodes = vec![
            Node::sensor("intake1", "Intake Flow", NodeGeometry::new(100.0, 200.0, 40.0, 40.0))
                .with_reading(285.0, "gal/min"),
            Node::new(
                "valve1",
                NodeKind::Valve,
                "Intake Valve",
                NodeGeometry::new(180.0, 200.0, 40.0, 40.0).rotated(0.0),
            )
            .with_reading(90.0, "%"),
            Node::new(
                "tank1",
                NodeKind::Tank,
                "Raw Water Basin",
                NodeGeometry::new(300.0, 180.0, 100.0, 80.0),
            )
            .with_reading(75.0, "%"),
            Node::new(
                "pump1",
                NodeKind::Pump,
                "Primary Pump 1",
                NodeGeometry::new(440.0, 160.0, 60.0, 40.0),
            )
            .with_reading(90.0, "%"),
            Node::new(
                "pump2",
                NodeKind::Pump,
                "Primary Pump 2",
                NodeGeometry::new(440.0, 240.0, 60.0, 40.0),
            )
            .with_reading(75.0, "%"),
            Node::new(
                "filter1",
                NodeKind::Filter,
                "Coagulation",
                NodeGeometry::new(540.0, 200.0, 80.0, 60.0),
            ),
            Node::new(
                "filter2",
                NodeKind::Filter,
                "Sedimentation",
                NodeGeometry::new(660.0, 200.0, 80.0, 60.0),
            ),
            Node::new(
                "filter3",
                NodeKind::Filter,
                "Sand Filtration",
                NodeGeometry::new(780.0, 200.0, 80.0, 60.0),
            ),
            Node::sensor("sensor1", "Chlorine", NodeGeometry::new(900.0, 200.0, 40.0, 40.0))
                .with_reading(1.2, "mg/L"),
            Node::new(
                "tank2",
                NodeKind::Tank,
                "Clean Water Reservoir",
                NodeGeometry::new(1000.0, 180.0, 100.0, 80.0),
            )
            .with_reading(82.0, "%"),
            Node::new(
                "pump3",
                NodeKind::Pump,
                "Distribution Pump 1",
                NodeGeometry::new(1140.0, 160.0, 60.0, 40.0),
            )
            .with_reading(95.0, "%"),
            Node::new(
                "pump4",
                NodeKind::Pump,
                "Distribution Pump 2",
                NodeGeometry::new(1140.0, 240.0, 60.0, 40.0),
            )
            .with_reading(0.0, "%"),
            Node::new(
                "valve2",
                NodeKind::Valve,
                "Output Valve",
                NodeGeometry::new(1240.0, 200.0, 40.0, 40.0).rotated(0.0),
            )
            .with_reading(85.0, "%"),
            Node::sensor("sensor2", "Output Flow", NodeGeometry::new(1320.0, 200.0, 40.0, 40.0))
                .with_reading(265.0, "gal/min"),
        ];

        let edges = vec![
            Edge::new("flow1", polyline(&[(140.0, 200.0), (180.0, 200.0), (300.0, 200.0)]), 285.0),
            Edge::new("flow2", polyline(&[(400.0, 200.0), (440.0, 180.0)]), 150.0),
            Edge::new("flow3", polyline(&[(400.0, 200.0), (440.0, 260.0)]), 135.0),
            Edge::new("flow4", polyline(&[(500.0, 180.0), (520.0, 200.0), (540.0, 200.0)]), 150.0),
            Edge::new("flow5", polyline(&[(500.0, 260.0), (520.0, 200.0)]), 135.0),
            Edge::new("flow6", polyline(&[(620.0, 200.0), (660.0, 200.0)]), 285.0),
            Edge::new("flow7", polyline(&[(740.0, 200.0), (780.0, 200.0)]), 280.0),
            Edge::new("flow8", polyline(&[(860.0, 200.0), (900.0, 200.0)]), 275.0),
            Edge::new("flow9", polyline(&[(940.0, 200.0), (1000.0, 200.0)]), 270.0),
            Edge::new("flow10", polyline(&[(1100.0, 200.0), (1140.0, 180.0)]), 270.0),
            Edge::closed("flow11", polyline(&[(1100.0, 200.0), (1140.0, 260.0)])),
            Edge::new(
                "flow12",
                polyline(&[(1200.0, 180.0), (1220.0, 200.0), (1240.0, 200.0)]),
                265.0,
            ),
            Edge::closed("flow13", polyline(&[(1200.0, 260.0), (1220.0, 200.0)])),
            Edge::new("flow14", polyline(&[(1280.0, 200.0), (1320.0, 200.0)]), 265.0),
        ];

        Self { nodes, edges }
    }

    /// Loads a topology from JSON (`{"nodes": [...], "edges": [...]}`).
    pub fn from_json(json: &str) -> Result<Self> {
        let file: TopologyFile = serde_json::from_str(json)?;
        Self::new(file.nodes, file.edges)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub(crate) fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    /// Looks up a node. An unknown id means the caller used an id that was
    /// never part of this topology.
    pub fn node(&self, id: &str) -> Result<&Node> {
        self.nodes
            .iter()
            .find(|n| n.id == *id)
            .ok_or_else(|| SchematicError::NodeNotFound(NodeId::from(id)))
    }

    pub fn edge(&self, id: &str) -> Result<&Edge> {
        self.edges
            .iter()
            .find(|e| e.id == *id)
            .ok_or_else(|| SchematicError::EdgeNotFound(EdgeId::from(id)))
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == *id)
    }

    /// Topmost node under `point` (schematic coordinates). Later nodes are
    /// drawn on top of earlier ones.
    pub fn node_at(&self, point: Point) -> Option<&Node> {
        self.nodes.iter().rev().find(|n| n.geometry.contains(point))
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for status in self
            .nodes
            .iter()
            .map(|n| n.status)
            .chain(self.edges.iter().map(|e| e.status))
        {
            counts.add(status);
        }
        counts
    }
}

impl Default for NetworkModel {
    fn default() -> Self {
        Self::initialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SensorKind;

    #[test]
    fn test_initialize_topology() {
        let model = NetworkModel::initialize();
        assert_eq!(model.nodes().len(), 14);
        assert_eq!(model.edges().len(), 14);
        assert!(model.edges().iter().all(|e| e.path.points().len() >= 2));
    }

    #[test]
    fn test_initial_statuses() {
        let model = NetworkModel::initialize();
        let valve = model.node("valve1").unwrap();
        assert_eq!(valve.reading.as_ref().map(|r| r.value), Some(90.0));
        assert_eq!(valve.status, Status::Normal);
        assert_eq!(model.node("pump1").unwrap().status, Status::Normal);
        assert_eq!(model.node("pump3").unwrap().status, Status::Normal);
        assert_eq!(model.node("pump4").unwrap().status, Status::Inactive);
        assert_eq!(model.edge("flow11").unwrap().status, Status::Inactive);
        assert_eq!(model.edge("flow13").unwrap().status, Status::Inactive);

        let others = model
            .nodes()
            .iter()
            .filter(|n| n.id != *"pump4")
            .all(|n| n.status == Status::Normal);
        assert!(others);

        let counts = model.status_counts();
        assert_eq!(counts.inactive, 3);
        assert_eq!(counts.normal, 25);
        assert_eq!(counts.warning + counts.critical, 0);
    }

    #[test]
    fn test_sensor_kinds_resolved() {
        let model = NetworkModel::initialize();
        assert_eq!(
            model.node("intake1").unwrap().kind,
            NodeKind::Sensor {
                sensor: SensorKind::Flow
            }
        );
        assert_eq!(
            model.node("sensor1").unwrap().kind,
            NodeKind::Sensor {
                sensor: SensorKind::Concentration
            }
        );
    }

    #[test]
    fn test_lookup_not_found() {
        let model = NetworkModel::initialize();
        assert!(matches!(
            model.node("pump99"),
            Err(SchematicError::NodeNotFound(id)) if id == *"pump99"
        ));
        assert!(matches!(
            model.edge("flow99"),
            Err(SchematicError::EdgeNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let geometry = NodeGeometry::new(0.0, 0.0, 10.0, 10.0);
        let nodes = vec![
            Node::new("a", NodeKind::Filter, "A", geometry),
            Node::new("a", NodeKind::Filter, "B", geometry),
        ];
        assert!(matches!(
            NetworkModel::new(nodes, Vec::new()),
            Err(SchematicError::DuplicateId(id)) if id == "a"
        ));
    }

    #[test]
    fn test_new_rederives_and_clamps() {
        let geometry = NodeGeometry::new(0.0, 0.0, 10.0, 10.0);
        let mut pump = Node::new("p", NodeKind::Pump, "P", geometry).with_reading(75.0, "%");
        pump.status = Status::Critical;
        pump.reading.as_mut().unwrap().value = 140.0;
        let tank = Node::new("t", NodeKind::Tank, "T", geometry)
            .with_reading(40.0, "%")
            .with_status(Status::Warning);

        let model = NetworkModel::new(vec![pump, tank], Vec::new()).unwrap();
        let pump = model.node("p").unwrap();
        assert_eq!(pump.value(), Some(100.0));
        assert_eq!(pump.status, Status::Warning);
        assert_eq!(model.node("t").unwrap().status, Status::Warning);
    }

    #[test]
    fn test_apply_delta_clamps_and_derives() {
        let mut pump = Node::new(
            "p",
            NodeKind::Pump,
            "P",
            NodeGeometry::new(0.0, 0.0, 10.0, 10.0),
        )
        .with_reading(90.0, "%");
        pump.apply_delta(25.0).unwrap();
        assert_eq!(pump.value(), Some(100.0));
        assert_eq!(pump.status, Status::Warning);

        pump.apply_delta(-500.0).unwrap();
        assert_eq!(pump.value(), Some(0.0));
        assert_eq!(pump.status, Status::Inactive);

        assert!(matches!(
            pump.apply_delta(f64::NAN),
            Err(SchematicError::OutOfDomain { .. })
        ));
        assert_eq!(pump.value(), Some(0.0));
    }

    #[test]
    fn test_edge_delta_and_closed() {
        let model = NetworkModel::initialize();
        let mut open = model.edge("flow2").unwrap().clone();
        open.apply_delta(-400.0).unwrap();
        assert_eq!(open.flow_rate, Some(0.0));
        assert_eq!(open.status, Status::Warning);
        open.apply_delta(500.0).unwrap();
        assert_eq!(open.status, Status::Critical);

        let mut closed = model.edge("flow11").unwrap().clone();
        closed.apply_delta(200.0).unwrap();
        assert!(closed.is_closed());
        assert_eq!(closed.status, Status::Inactive);
        assert_eq!(closed.label_anchor(), None);
    }

    #[test]
    fn test_label_anchor() {
        let model = NetworkModel::initialize();
        assert_eq!(
            model.edge("flow1").unwrap().label_anchor(),
            Some(Point::new(180.0, 190.0))
        );
    }

    #[test]
    fn test_node_at() {
        let model = NetworkModel::initialize();
        assert_eq!(
            model.node_at(Point::new(460.0, 170.0)).map(|n| n.id.as_str()),
            Some("pump1")
        );
        assert!(model.node_at(Point::new(10.0, 10.0)).is_none());
    }

    #[test]
    fn test_json_roundtrip_preserves_model() {
        let model = NetworkModel::initialize();
        let json = model.to_json().unwrap();
        let loaded = NetworkModel::from_json(&json).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn test_sensor_kind_follows_label_on_load() {
        let json = r#"{
            "nodes": [{
                "id": "out",
                "kind": {"type": "sensor", "sensor": "concentration"},
                "label": "Output Flow",
                "geometry": {"position": {"x": 0.0, "y": 0.0}, "size": {"width": 40.0, "height": 40.0}},
                "reading": {"value": 265.0, "unit": "gal/min"}
            }],
            "edges": []
        }"#;
        let model = NetworkModel::from_json(json).unwrap();
        let node = model.node("out").unwrap();
        assert_eq!(
            node.kind,
            NodeKind::Sensor {
                sensor: SensorKind::Flow
            }
        );
        // Flow band, not the concentration band (which would be critical).
        assert_eq!(node.status, Status::Normal);
    }

    #[test]
    fn test_json_rejects_short_path() {
        let json = r#"{
            "nodes": [],
            "edges": [{"id": "e1", "path": "M0,0", "flow_rate": 120.0}]
        }"#;
        assert!(NetworkModel::from_json(json).is_err());
    }
}

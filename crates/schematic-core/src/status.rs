//! Component kinds, health status and the threshold rules that tie them together.
//!
//! Status is never stored independently of a reading: every mutation of a
//! value goes through [`derive_node_status`] or [`derive_edge_status`].

use serde::{Deserialize, Serialize};

/// Health status of a node or flow path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Normal,
    Warning,
    Critical,
    Inactive,
}

impl Status {
    /// All statuses in legend order.
    pub const ALL: [Status; 4] = [
        Status::Normal,
        Status::Warning,
        Status::Critical,
        Status::Inactive,
    ];

    /// Fill colour the renderer uses for this status.
    pub fn color(self) -> &'static str {
        match self {
            Status::Normal => "#10B981",
            Status::Warning => "#F59E0B",
            Status::Critical => "#EF4444",
            Status::Inactive => "#9CA3AF",
        }
    }

    /// Whether flow dashes and pump rotors are animated.
    pub fn is_animated(self) -> bool {
        self != Status::Inactive
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Normal => "normal",
            Status::Warning => "warning",
            Status::Critical => "critical",
            Status::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a sensor measures. Decides which threshold band applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Volumetric flow, e.g. gal/min.
    Flow,
    /// Dissolved concentration, e.g. chlorine in mg/L.
    Concentration,
}

impl SensorKind {
    /// Resolves the sensor kind from its display label.
    ///
    /// A label mentioning "Flow" is a flow sensor; anything else is treated
    /// as a concentration reading.
    pub fn from_label(label: &str) -> Self {
        if label.contains("Flow") {
            SensorKind::Flow
        } else {
            SensorKind::Concentration
        }
    }
}

/// Process component kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Pump,
    Valve,
    Tank,
    Sensor { sensor: SensorKind },
    Filter,
}

impl NodeKind {
    /// Builds a sensor kind from the sensor's label.
    pub fn sensor_for_label(label: &str) -> Self {
        NodeKind::Sensor {
            sensor: SensorKind::from_label(label),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Pump => "pump",
            NodeKind::Valve => "valve",
            NodeKind::Tank => "tank",
            NodeKind::Sensor { .. } => "sensor",
            NodeKind::Filter => "filter",
        }
    }

    /// Valid range of this kind's reading.
    pub fn value_domain(self) -> ValueDomain {
        match self {
            NodeKind::Pump | NodeKind::Valve | NodeKind::Tank => ValueDomain::Percentage,
            NodeKind::Sensor { .. } | NodeKind::Filter => ValueDomain::NonNegative,
        }
    }

    /// Operator control offered in the inspection panel.
    pub fn control(self) -> ControlCapability {
        match self {
            NodeKind::Pump | NodeKind::Valve => ControlCapability::Adjustable { min: 0.0, max: 100.0 },
            NodeKind::Sensor { .. } => ControlCapability::ReadOnly,
            NodeKind::Tank => ControlCapability::LevelDisplay,
            NodeKind::Filter => ControlCapability::None,
        }
    }
}

/// Control surface a component exposes to an operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlCapability {
    /// Setpoint slider in percent.
    Adjustable { min: f64, max: f64 },
    /// Measuring device, no control.
    ReadOnly,
    /// Fill level gauge only.
    LevelDisplay,
    None,
}

/// Domain a numeric reading is clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueDomain {
    /// `[0, 100]`.
    Percentage,
    /// `[0, inf)`.
    NonNegative,
}

impl ValueDomain {
    /// Clamps a finite value into the domain. Returns `None` for NaN or
    /// infinite input so callers can keep the previous reading.
    pub fn clamp(self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        Some(match self {
            ValueDomain::Percentage => value.clamp(0.0, 100.0),
            ValueDomain::NonNegative => value.max(0.0),
        })
    }

    pub fn contains(self, value: f64) -> bool {
        match self {
            ValueDomain::Percentage => (0.0..=100.0).contains(&value),
            ValueDomain::NonNegative => value >= 0.0 && value.is_finite(),
        }
    }
}

/// Re-derives a node status from its reading.
///
/// Returns `None` for tanks and filters: their status is configured
/// externally (maintenance, offline) and is not a function of the value.
pub fn derive_node_status(kind: NodeKind, value: f64) -> Option<Status> {
    match kind {
        NodeKind::Pump | NodeKind::Valve => Some(if value < 10.0 {
            Status::Inactive
        } else if value < 50.0 || value > 95.0 {
            Status::Warning
        } else {
            Status::Normal
        }),
        NodeKind::Sensor {
            sensor: SensorKind::Flow,
        } => Some(flow_band(value)),
        NodeKind::Sensor {
            sensor: SensorKind::Concentration,
        } => Some(if value < 0.5 {
            Status::Warning
        } else if value > 2.0 {
            Status::Critical
        } else {
            Status::Normal
        }),
        NodeKind::Tank | NodeKind::Filter => None,
    }
}

/// Derives an edge status from its flow rate. Closed paths (no flow) are
/// permanently inactive.
pub fn derive_edge_status(flow_rate: Option<f64>) -> Status {
    match flow_rate {
        Some(flow) => flow_band(flow),
        None => Status::Inactive,
    }
}

fn flow_band(flow: f64) -> Status {
    if flow < 100.0 {
        Status::Warning
    } else if flow > 350.0 {
        Status::Critical
    } else {
        Status::Normal
    }
}

//! Periodic stochastic telemetry for the process network.
//!
//! Each tick runs an independent Bernoulli trial per element. Elements that
//! win the trial get a bounded uniform perturbation, are clamped into their
//! domain and have their status re-derived. There is no correlation between
//! elements and no mass balance: this is a display simulation.

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::network::{EdgeId, NetworkModel, NodeId};
use crate::status::{NodeKind, SensorKind, Status};

/// Source of randomness for the simulator.
///
/// Kept behind a trait so ticks can be driven by a seeded generator or by a
/// scripted sequence in tests.
pub trait TelemetrySource {
    /// Bernoulli trial with success probability `probability`.
    fn should_update(&mut self, probability: f64) -> bool;

    /// Uniform delta in `[-span, span]`.
    fn delta(&mut self, span: f64) -> f64;
}

/// [`TelemetrySource`] backed by a [`rand::Rng`].
#[derive(Debug, Clone)]
pub struct RngSource<R = ChaCha8Rng> {
    rng: R,
}

impl RngSource<ChaCha8Rng> {
    /// Deterministic source: the same seed yields the same telemetry.
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Source seeded from the thread-local entropy generator.
    pub fn from_entropy() -> Self {
        Self::seeded(rand::random())
    }
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> TelemetrySource for RngSource<R> {
    /// NaN or non-positive probabilities never update.
    fn should_update(&mut self, probability: f64) -> bool {
        if probability.is_nan() || probability <= 0.0 {
            return false;
        }
        self.rng.random_bool(probability.min(1.0))
    }

    /// Non-finite or non-positive spans give a zero delta.
    fn delta(&mut self, span: f64) -> f64 {
        if span.is_finite() && span > 0.0 {
            self.rng.random_range(-span..=span)
        } else {
            0.0
        }
    }
}

/// Tuning of the random walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Probability that an element changes on a given tick.
    pub update_probability: f64,
    /// Half-width of the delta for percentage readings (pumps, valves, tanks).
    pub percentage_span: f64,
    /// Half-width of the delta for flow sensors and flow paths.
    pub flow_span: f64,
    /// Half-width of the delta for concentration sensors.
    pub concentration_span: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            update_probability: 0.3,
            percentage_span: 5.0,
            flow_span: 5.0,
            concentration_span: 0.1,
        }
    }
}

impl TelemetryConfig {
    fn node_span(&self, kind: NodeKind) -> f64 {
        match kind {
            NodeKind::Sensor {
                sensor: SensorKind::Flow,
            } => self.flow_span,
            NodeKind::Sensor {
                sensor: SensorKind::Concentration,
            } => self.concentration_span,
            NodeKind::Pump | NodeKind::Valve | NodeKind::Tank => self.percentage_span,
            NodeKind::Filter => 0.0,
        }
    }
}

/// Element touched by a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ElementRef {
    Node(NodeId),
    Edge(EdgeId),
}

/// A status transition produced by a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub element: ElementRef,
    pub from: Status,
    pub to: Status,
}

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// 1-based tick number.
    pub tick: u64,
    pub at: DateTime<Utc>,
    pub updated_nodes: usize,
    pub updated_edges: usize,
    pub status_changes: Vec<StatusChange>,
    /// Elements whose update failed and were left unchanged.
    pub skipped: Vec<ElementRef>,
}

/// Drives the random walk over a [`NetworkModel`].
#[derive(Debug, Clone)]
pub struct TelemetrySimulator<S = RngSource> {
    config: TelemetryConfig,
    source: S,
    ticks: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl TelemetrySimulator<RngSource> {
    /// Simulator with default tuning and a seeded generator.
    pub fn seeded(seed: u64) -> Self {
        Self::new(TelemetryConfig::default(), RngSource::seeded(seed))
    }
}

impl<S: TelemetrySource> TelemetrySimulator<S> {
    pub fn new(config: TelemetryConfig, source: S) -> Self {
        Self {
            config,
            source,
            ticks: 0,
            last_updated: None,
        }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Time the last tick completed.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Advances the telemetry by one step.
    ///
    /// Never fails: an element whose update errors is logged, recorded in
    /// [`TickReport::skipped`] and left at its previous value while the rest
    /// of the network is still updated.
    pub fn tick(&mut self, model: &mut NetworkModel) -> TickReport {
        let probability = self.config.update_probability;
        let mut report = TickReport {
            tick: self.ticks + 1,
            at: Utc::now(),
            updated_nodes: 0,
            updated_edges: 0,
            status_changes: Vec::new(),
            skipped: Vec::new(),
        };

        for node in model.nodes_mut() {
            if node.reading.is_none() || !self.source.should_update(probability) {
                continue;
            }
            let delta = self.source.delta(self.config.node_span(node.kind));
            let before = node.status;
            match node.apply_delta(delta) {
                Ok(()) => {
                    report.updated_nodes += 1;
                    if node.status != before {
                        report.status_changes.push(StatusChange {
                            element: ElementRef::Node(node.id.clone()),
                            from: before,
                            to: node.status,
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!(node = %node.id, %err, "Skipping node update");
                    report.skipped.push(ElementRef::Node(node.id.clone()));
                }
            }
        }

        for edge in model.edges_mut() {
            if edge.status == Status::Inactive || !self.source.should_update(probability) {
                continue;
            }
            let delta = self.source.delta(self.config.flow_span);
            let before = edge.status;
            match edge.apply_delta(delta) {
                Ok(()) => {
                    report.updated_edges += 1;
                    if edge.status != before {
                        report.status_changes.push(StatusChange {
                            element: ElementRef::Edge(edge.id.clone()),
                            from: before,
                            to: edge.status,
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!(edge = %edge.id, %err, "Skipping edge update");
                    report.skipped.push(ElementRef::Edge(edge.id.clone()));
                }
            }
        }

        self.ticks = report.tick;
        self.last_updated = Some(report.at);
        tracing::debug!(
            tick = report.tick,
            nodes = report.updated_nodes,
            edges = report.updated_edges,
            changes = report.status_changes.len(),
            "Telemetry tick"
        );
        report
    }
}

//! Tick scheduling for a [`SchematicView`].
//!
//! The driver owns the view and handles one event at a time: a timer tick or
//! a message from a [`DriverHandle`]. A tick is always applied in full before
//! the next message is looked at.

use std::time::Duration;

use schematic_core::{
    RenderSnapshot, RngSource, SchematicView, TelemetrySource, TickReport, ViewSettings,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::command::{Command, PointerEvent};

const MESSAGE_BUFFER: usize = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("Driver has stopped")]
    Stopped,
}

/// Emitted after every completed tick.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub report: TickReport,
    pub snapshot: RenderSnapshot,
}

#[derive(Debug)]
enum Message {
    Command(Command),
    Snapshot(oneshot::Sender<RenderSnapshot>),
    Inspect(oneshot::Sender<Option<String>>),
    Shutdown,
}

/// Cloneable sender side of a [`Driver`].
#[derive(Debug, Clone)]
pub struct DriverHandle {
    tx: mpsc::Sender<Message>,
}

impl DriverHandle {
    pub async fn send(&self, command: Command) -> Result<(), DriverError> {
        self.tx
            .send(Message::Command(command))
            .await
            .map_err(|_| DriverError::Stopped)
    }

    pub async fn snapshot(&self) -> Result<RenderSnapshot, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Snapshot(reply))
            .await
            .map_err(|_| DriverError::Stopped)?;
        rx.await.map_err(|_| DriverError::Stopped)
    }

    /// Details of the selected node as JSON, if a node is selected.
    pub async fn inspect(&self) -> Result<Option<String>, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Inspect(reply))
            .await
            .map_err(|_| DriverError::Stopped)?;
        rx.await.map_err(|_| DriverError::Stopped)
    }

    /// Asks the driver to stop. Stopping an already stopped driver is fine.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Message::Shutdown).await;
    }
}

/// Runs telemetry ticks on the view's refresh interval and applies commands
/// in between.
pub struct Driver<S = RngSource> {
    view: SchematicView<S>,
    rx: mpsc::Receiver<Message>,
    outputs: Option<mpsc::UnboundedSender<TickOutput>>,
    tick_limit: Option<u64>,
}

fn schedule(period: Duration) -> Interval {
    // First tick one full period from now, like a browser interval timer.
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

impl<S: TelemetrySource> Driver<S> {
    pub fn new(view: SchematicView<S>) -> (Self, DriverHandle) {
        let (tx, rx) = mpsc::channel(MESSAGE_BUFFER);
        let driver = Self {
            view,
            rx,
            outputs: None,
            tick_limit: None,
        };
        (driver, DriverHandle { tx })
    }

    /// Stop on its own after `ticks` completed ticks.
    #[must_use]
    pub fn with_tick_limit(mut self, ticks: u64) -> Self {
        self.tick_limit = Some(ticks);
        self
    }

    /// Receives a [`TickOutput`] for every tick until the driver stops.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TickOutput> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outputs = Some(tx);
        rx
    }

    /// Runs until shut down, until every handle is dropped or until the tick
    /// limit is reached. The view is closed and handed back.
    pub async fn run(mut self) -> SchematicView<S> {
        let mut period = self.view.settings().refresh_interval();
        let mut interval = schedule(period);
        info!(refresh_ms = period.as_millis(), "Schematic driver started");

        loop {
            if self.limit_reached() {
                info!(ticks = self.view.simulator().ticks(), "Tick limit reached");
                break;
            }

            tokio::select! {
                _ = interval.tick() => self.tick(),
                message = self.rx.recv() => match message {
                    Some(Message::Command(command)) => {
                        self.apply(command);
                        let next = self.view.settings().refresh_interval();
                        if next != period {
                            period = next;
                            interval = schedule(period);
                            info!(refresh_ms = period.as_millis(), "Tick rescheduled");
                        }
                    }
                    Some(Message::Snapshot(reply)) => {
                        let _ = reply.send(self.view.snapshot());
                    }
                    Some(Message::Inspect(reply)) => {
                        let _ = reply.send(self.inspect_json());
                    }
                    Some(Message::Shutdown) | None => break,
                },
            }
        }

        self.view.close();
        info!(ticks = self.view.simulator().ticks(), "Schematic driver stopped");
        self.view
    }

    fn inspect_json(&self) -> Option<String> {
        let details = self.view.inspect()?;
        match serde_json::to_string(&details) {
            Ok(json) => Some(json),
            Err(err) => {
                warn!(node = %details.id, %err, "Failed to encode node details");
                None
            }
        }
    }

    fn limit_reached(&self) -> bool {
        self.tick_limit
            .is_some_and(|limit| self.view.simulator().ticks() >= limit)
    }

    fn tick(&mut self) {
        let report = self.view.tick();
        if let Some(outputs) = &self.outputs {
            let output = TickOutput {
                report,
                snapshot: self.view.snapshot(),
            };
            if outputs.send(output).is_err() {
                debug!("Tick output receiver dropped");
                self.outputs = None;
            }
        }
    }

    fn apply(&mut self, command: Command) {
        let result = match command {
            Command::Tick => {
                self.tick();
                Ok(())
            }
            Command::SetRefresh(period) => self
                .view
                .settings()
                .with_refresh_interval(period)
                .map(|settings: ViewSettings| {
                    self.view.set_settings(settings);
                }),
            Command::Pointer(event) => match event {
                PointerEvent::Down(point) => {
                    self.view.pointer_down(point);
                    Ok(())
                }
                PointerEvent::Move(point) => self.view.pointer_move(point).map(drop),
                PointerEvent::Up(point) => self.view.pointer_up(point).map(drop),
                PointerEvent::Leave => self.view.pointer_leave().map(drop),
            },
            Command::ZoomIn => {
                self.view.viewport_mut().zoom_in();
                Ok(())
            }
            Command::ZoomOut => {
                self.view.viewport_mut().zoom_out();
                Ok(())
            }
            Command::SetZoom(zoom) => {
                self.view.viewport_mut().set_zoom(zoom);
                Ok(())
            }
            Command::ResetView => {
                self.view.viewport_mut().reset();
                Ok(())
            }
            Command::Select(id) => self.view.select(&id),
            Command::ClearSelection => {
                self.view.clear_selection();
                Ok(())
            }
        };

        if let Err(err) = result {
            warn!(%err, "Command rejected");
        }
    }
}

#[cfg(test)]
mod tests {
    use schematic_core::{NodeId, Point};

    use super::*;

    fn driver(refresh: Duration) -> (Driver, DriverHandle) {
        let settings = ViewSettings::new(refresh).unwrap();
        Driver::new(SchematicView::seeded(11, settings))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_refresh_interval() {
        let (driver, handle) = driver(Duration::from_secs(1));
        let task = tokio::spawn(driver.run());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(handle.snapshot().await.unwrap().tick, 3);

        handle.shutdown().await;
        let view = task.await.unwrap();
        assert_eq!(view.simulator().ticks(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_before_first_period() {
        let (driver, handle) = driver(Duration::from_secs(5));
        let task = tokio::spawn(driver.run());

        tokio::time::sleep(Duration::from_millis(4900)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.tick, 0);
        assert!(snapshot.last_updated.is_none());

        handle.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_change_reschedules_without_reset() {
        let (driver, handle) = driver(Duration::from_secs(5));
        let task = tokio::spawn(driver.run());

        tokio::time::sleep(Duration::from_millis(5500)).await;
        let before = handle.snapshot().await.unwrap();
        assert_eq!(before.tick, 1);

        handle
            .send(Command::SetRefresh(Duration::from_secs(1)))
            .await
            .unwrap();
        let unchanged = handle.snapshot().await.unwrap();
        assert_eq!(unchanged.nodes, before.nodes);
        assert_eq!(unchanged.edges, before.edges);

        tokio::time::sleep(Duration::from_millis(2200)).await;
        assert_eq!(handle.snapshot().await.unwrap().tick, 3);

        handle.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_refresh_is_rejected() {
        let (driver, handle) = driver(Duration::from_secs(1));
        let task = tokio::spawn(driver.run());

        handle.send(Command::SetRefresh(Duration::ZERO)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        // Still on the one second schedule.
        assert_eq!(handle.snapshot().await.unwrap().tick, 1);

        handle.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_limit_stops_driver() {
        let (driver, handle) = driver(Duration::from_secs(1));
        let mut driver = driver.with_tick_limit(2);
        let mut outputs = driver.subscribe();
        let task = tokio::spawn(driver.run());

        let first = outputs.recv().await.unwrap();
        let second = outputs.recv().await.unwrap();
        assert_eq!(first.report.tick, 1);
        assert_eq!(second.snapshot.tick, 2);
        assert!(outputs.recv().await.is_none());

        let view = task.await.unwrap();
        assert_eq!(view.simulator().ticks(), 2);
        assert_eq!(handle.snapshot().await, Err(DriverError::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_between_ticks() {
        let (driver, handle) = driver(Duration::from_secs(60));
        let task = tokio::spawn(driver.run());

        handle.send(Command::ZoomIn).await.unwrap();
        handle.send(Command::Select("pump1".to_owned())).await.unwrap();
        handle.send(Command::Select("ghost".to_owned())).await.unwrap();
        handle.send(Command::Tick).await.unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.tick, 1);
        assert!((snapshot.transform.zoom - 1.1).abs() < 1e-12);
        assert_eq!(snapshot.selected, Some(NodeId::from("pump1")));

        let details = handle.inspect().await.unwrap().unwrap();
        assert!(details.contains("Primary Pump 1"));

        handle.send(Command::ClearSelection).await.unwrap();
        assert_eq!(handle.inspect().await.unwrap(), None);

        handle.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_inspect_encodes_selected_node() {
        let (driver, handle) = driver(Duration::from_secs(60));
        let task = tokio::spawn(driver.run());

        handle.send(Command::Select("sensor1".to_owned())).await.unwrap();
        let details = handle.inspect().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&details).unwrap();
        assert_eq!(value["id"], "sensor1");
        assert_eq!(value["label"], "Chlorine");

        handle.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pointer_drag_and_shutdown_closes_view() {
        let (driver, handle) = driver(Duration::from_secs(60));
        let task = tokio::spawn(driver.run());

        for event in [
            PointerEvent::Down(Point::new(20.0, 20.0)),
            PointerEvent::Move(Point::new(60.0, 20.0)),
            PointerEvent::Up(Point::new(70.0, 30.0)),
        ] {
            handle.send(Command::Pointer(event)).await.unwrap();
        }
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.transform.pan, Point::new(50.0, 10.0));

        handle.send(Command::Select("tank1".to_owned())).await.unwrap();
        handle.shutdown().await;
        let view = task.await.unwrap();
        assert!(view.selection().selected().is_none());
        assert_eq!(view.viewport().pan(), Point::ORIGIN);
    }
}

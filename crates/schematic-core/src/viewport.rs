//! Pan and zoom of the schematic canvas.
//!
//! Panning is anchored to the gesture start: while dragging, the pan is the
//! pointer's offset from where the drag began plus the pan at that moment.
//! Accumulating per-move deltas would drift; this does not.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Size};

/// Default drawing area, matching the schematic's view box.
pub const DEFAULT_CANVAS: Size = Size::new(1500.0, 500.0);

/// Limits and step of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub canvas: Size,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            canvas: DEFAULT_CANVAS,
            min_zoom: 0.5,
            max_zoom: 2.0,
            zoom_step: 0.1,
        }
    }
}

/// Pointer and pan captured when a drag begins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragAnchor {
    pub pointer: Point,
    pub pan: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureState {
    Idle,
    Dragging,
}

/// Composed canvas transform: translate by `pan`, then scale by `zoom`
/// about `origin` (the canvas centre).
///
/// `screen = origin + zoom * (world - origin) + pan`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub zoom: f64,
    pub pan: Point,
    pub origin: Point,
}

impl ViewTransform {
    pub fn to_screen(&self, world: Point) -> Point {
        self.origin + (world - self.origin) * self.zoom + self.pan
    }

    pub fn to_world(&self, screen: Point) -> Point {
        self.origin + (screen - self.pan - self.origin) / self.zoom
    }

    /// SVG `matrix(a b c d e f)` coefficients.
    pub fn matrix(&self) -> [f64; 6] {
        [
            self.zoom,
            0.0,
            0.0,
            self.zoom,
            self.origin.x * (1.0 - self.zoom) + self.pan.x,
            self.origin.y * (1.0 - self.zoom) + self.pan.y,
        ]
    }

    /// CSS transform with `transform-origin: center`. The translation is
    /// written in scaled units so it lands at `pan` on screen.
    pub fn css(&self) -> String {
        format!(
            "scale({}) translate({}px, {}px)",
            self.zoom,
            self.pan.x / self.zoom,
            self.pan.y / self.zoom
        )
    }
}

/// Zoom factor, pan offset and the drag gesture state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    config: ViewportConfig,
    zoom: f64,
    pan: Point,
    drag: Option<DragAnchor>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl ViewportConfig {
    /// Puts the zoom limits in order and falls back to the defaults for
    /// non-finite values.
    #[must_use]
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        let finite_or = |value: f64, fallback: f64| if value.is_finite() { value } else { fallback };
        let min = finite_or(self.min_zoom, defaults.min_zoom);
        let max = finite_or(self.max_zoom, defaults.max_zoom);
        Self {
            canvas: self.canvas,
            min_zoom: min.min(max),
            max_zoom: min.max(max),
            zoom_step: finite_or(self.zoom_step, defaults.zoom_step),
        }
    }
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            config: config.normalized(),
            zoom: 1.0,
            pan: Point::ORIGIN,
            drag: None,
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    pub fn drag_anchor(&self) -> Option<DragAnchor> {
        self.drag
    }

    pub fn state(&self) -> GestureState {
        if self.drag.is_some() {
            GestureState::Dragging
        } else {
            GestureState::Idle
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Begins a drag at `pointer`. Starting again mid-drag re-anchors.
    pub fn gesture_start(&mut self, pointer: Point) {
        self.drag = Some(DragAnchor {
            pointer,
            pan: self.pan,
        });
    }

    /// Tracks the pointer while dragging; ignored when idle.
    pub fn gesture_move(&mut self, pointer: Point) {
        if let Some(anchor) = self.drag {
            self.pan = pointer - anchor.pointer + anchor.pan;
        }
    }

    /// Ends the drag, keeping the current pan.
    pub fn gesture_end(&mut self) {
        self.drag = None;
    }

    /// Aborts the drag (pointer left the canvas). The pan is kept as is.
    pub fn gesture_cancel(&mut self) {
        self.drag = None;
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - self.config.zoom_step);
    }

    /// Sets the zoom, clamped to the configured range.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        }
    }

    /// Back to zoom 1 and no pan; any drag in progress is dropped.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan = Point::ORIGIN;
        self.drag = None;
    }

    pub fn transform(&self) -> ViewTransform {
        ViewTransform {
            zoom: self.zoom,
            pan: self.pan,
            origin: Point::new(self.config.canvas.width / 2.0, self.config.canvas.height / 2.0),
        }
    }

    /// Maps a canvas pointer position into schematic coordinates.
    pub fn to_world(&self, screen: Point) -> Point {
        self.transform().to_world(screen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point, b: Point) {
        assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn test_zoom_limits() {
        let mut viewport = Viewport::default();
        for _ in 0..20 {
            viewport.zoom_in();
            assert!(viewport.zoom() <= 2.0);
        }
        assert!((viewport.zoom() - 2.0).abs() < f64::EPSILON);

        for _ in 0..20 {
            viewport.zoom_out();
            assert!(viewport.zoom() >= 0.5);
        }
        assert!((viewport.zoom() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset_from_any_state() {
        let mut viewport = Viewport::default();
        viewport.zoom_in();
        viewport.zoom_in();
        viewport.gesture_start(Point::new(10.0, 10.0));
        viewport.gesture_move(Point::new(80.0, -40.0));

        viewport.reset();
        assert_eq!(viewport.zoom(), 1.0);
        assert_eq!(viewport.pan(), Point::ORIGIN);
        assert_eq!(viewport.state(), GestureState::Idle);
    }

    #[test]
    fn test_drag_tracks_gesture_start() {
        let mut viewport = Viewport::default();
        viewport.gesture_start(Point::new(0.0, 0.0));
        viewport.gesture_move(Point::new(30.0, 15.0));
        viewport.gesture_end();
        assert_eq!(viewport.pan(), Point::new(30.0, 15.0));

        // Second drag starts from pan (30, 15).
        viewport.gesture_start(Point::new(100.0, 100.0));
        assert_eq!(viewport.state(), GestureState::Dragging);
        viewport.gesture_move(Point::new(90.0, 130.0));
        viewport.gesture_move(Point::new(120.0, 140.0));
        assert_eq!(viewport.pan(), Point::new(50.0, 55.0));

        viewport.gesture_end();
        assert_eq!(viewport.pan(), Point::new(50.0, 55.0));
        assert_eq!(viewport.state(), GestureState::Idle);
        assert!(viewport.drag_anchor().is_none());
    }

    #[test]
    fn test_move_while_idle_ignored() {
        let mut viewport = Viewport::default();
        viewport.gesture_move(Point::new(500.0, 500.0));
        assert_eq!(viewport.pan(), Point::ORIGIN);
    }

    #[test]
    fn test_cancel_keeps_pan() {
        let mut viewport = Viewport::default();
        viewport.gesture_start(Point::new(5.0, 5.0));
        viewport.gesture_move(Point::new(25.0, -5.0));
        viewport.gesture_cancel();
        assert_eq!(viewport.pan(), Point::new(20.0, -10.0));
        assert!(!viewport.is_dragging());
    }

    #[test]
    fn test_zoom_during_drag() {
        let mut viewport = Viewport::default();
        viewport.gesture_start(Point::new(0.0, 0.0));
        viewport.zoom_in();
        viewport.gesture_move(Point::new(10.0, 0.0));
        assert!(viewport.is_dragging());
        assert_eq!(viewport.pan(), Point::new(10.0, 0.0));
        assert!((viewport.zoom() - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_transform_roundtrip() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(1.5);
        viewport.gesture_start(Point::ORIGIN);
        viewport.gesture_move(Point::new(-40.0, 25.0));
        viewport.gesture_end();

        let transform = viewport.transform();
        let world = Point::new(440.0, 160.0);
        assert_close(transform.to_world(transform.to_screen(world)), world);

        // The canvas centre moves only by the pan.
        let center = Point::new(750.0, 250.0);
        assert_close(transform.to_screen(center), Point::new(710.0, 275.0));

        let [a, _, _, d, e, f] = transform.matrix();
        assert_close(
            Point::new(a * world.x + e, d * world.y + f),
            transform.to_screen(world),
        );
    }

    #[test]
    fn test_pan_is_not_scaled() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(2.0);
        viewport.gesture_start(Point::ORIGIN);
        viewport.gesture_move(Point::new(100.0, 0.0));
        let transform = viewport.transform();
        let before = Viewport {
            pan: Point::ORIGIN,
            ..viewport.clone()
        }
        .transform()
        .to_screen(Point::new(300.0, 100.0));
        let after = transform.to_screen(Point::new(300.0, 100.0));
        assert_close(after - before, Point::new(100.0, 0.0));
        assert_eq!(transform.css(), "scale(2) translate(50px, 0px)");
    }

    #[test]
    fn test_reversed_zoom_limits() {
        let mut viewport = Viewport::new(ViewportConfig {
            min_zoom: 3.0,
            max_zoom: 0.25,
            ..ViewportConfig::default()
        });
        assert_eq!(viewport.config().min_zoom, 0.25);
        assert_eq!(viewport.config().max_zoom, 3.0);
        viewport.set_zoom(10.0);
        assert_eq!(viewport.zoom(), 3.0);
        viewport.set_zoom(0.0);
        assert_eq!(viewport.zoom(), 0.25);

        let config = ViewportConfig {
            max_zoom: f64::NAN,
            ..ViewportConfig::default()
        }
        .normalized();
        assert_eq!(config.max_zoom, 2.0);
    }

    #[test]
    fn test_set_zoom_rejects_nan() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(f64::NAN);
        assert_eq!(viewport.zoom(), 1.0);
        viewport.set_zoom(9.0);
        assert_eq!(viewport.zoom(), 2.0);
    }
}

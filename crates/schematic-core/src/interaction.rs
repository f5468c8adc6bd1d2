//! Click versus drag disambiguation for pointer input on the canvas.
//!
//! A press turns into a pan once the pointer strays more than
//! [`CLICK_DRAG_THRESHOLD`] pixels from where it went down. A release before
//! that is a click, which selects the node under the press (if any).
//!
//! The tracker does not touch the viewport or the selection. It returns a
//! [`PointerAction`] that the owner applies.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::network::NodeId;

/// Pointer travel, in screen pixels, before a press becomes a drag.
pub const CLICK_DRAG_THRESHOLD: f64 = 4.0;

/// What the owner of the viewport and selection should do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PointerAction {
    /// Nothing to apply.
    Ignore,
    /// Pan with the gesture anchored at `anchor`; start the drag if it is
    /// not running yet.
    Pan { anchor: Point, pointer: Point },
    /// Final pointer position of a drag, then end it.
    EndPan { pointer: Point },
    /// Abort the drag.
    CancelPan,
    /// A click landed on this node.
    Select { id: NodeId },
}

#[derive(Debug, Clone, PartialEq)]
enum Press {
    Pending { origin: Point, target: Option<NodeId> },
    Panning { origin: Point },
}

/// Tracks one pointer from press to release.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerInteraction {
    threshold: f64,
    press: Option<Press>,
}

impl Default for PointerInteraction {
    fn default() -> Self {
        Self::new(CLICK_DRAG_THRESHOLD)
    }
}

impl PointerInteraction {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.max(0.0),
            press: None,
        }
    }

    /// Pointer went down at `pointer`, over `target` if the render layer hit
    /// a node.
    pub fn press(&mut self, pointer: Point, target: Option<NodeId>) -> PointerAction {
        self.press = Some(Press::Pending {
            origin: pointer,
            target,
        });
        PointerAction::Ignore
    }

    pub fn moved(&mut self, pointer: Point) -> PointerAction {
        match &self.press {
            None => PointerAction::Ignore,
            Some(Press::Pending { origin, .. }) => {
                let origin = *origin;
                if (pointer - origin).length() > self.threshold {
                    self.press = Some(Press::Panning { origin });
                    PointerAction::Pan {
                        anchor: origin,
                        pointer,
                    }
                } else {
                    PointerAction::Ignore
                }
            }
            Some(Press::Panning { origin }) => PointerAction::Pan {
                anchor: *origin,
                pointer,
            },
        }
    }

    pub fn release(&mut self, pointer: Point) -> PointerAction {
        match self.press.take() {
            None | Some(Press::Pending { target: None, .. }) => PointerAction::Ignore,
            Some(Press::Pending {
                origin,
                target: Some(id),
            }) => {
                if (pointer - origin).length() > self.threshold {
                    // Moved without intermediate events; still a drag.
                    PointerAction::Ignore
                } else {
                    PointerAction::Select { id }
                }
            }
            Some(Press::Panning { .. }) => PointerAction::EndPan { pointer },
        }
    }

    /// Pointer left the canvas.
    pub fn leave(&mut self) -> PointerAction {
        match self.press.take() {
            Some(Press::Panning { .. }) => PointerAction::CancelPan,
            _ => PointerAction::Ignore,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.press.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_selects() {
        let mut pointer = PointerInteraction::default();
        pointer.press(Point::new(10.0, 10.0), Some(NodeId::from("pump1")));
        assert_eq!(pointer.moved(Point::new(12.0, 11.0)), PointerAction::Ignore);
        assert_eq!(
            pointer.release(Point::new(12.0, 12.0)),
            PointerAction::Select {
                id: NodeId::from("pump1")
            }
        );
        assert!(!pointer.is_pressed());
    }

    #[test]
    fn test_click_on_empty_canvas() {
        let mut pointer = PointerInteraction::default();
        pointer.press(Point::new(10.0, 10.0), None);
        assert_eq!(pointer.release(Point::new(10.0, 10.0)), PointerAction::Ignore);
    }

    #[test]
    fn test_drag_beyond_threshold_pans() {
        let mut pointer = PointerInteraction::default();
        pointer.press(Point::new(0.0, 0.0), Some(NodeId::from("tank1")));
        assert_eq!(
            pointer.moved(Point::new(5.0, 0.0)),
            PointerAction::Pan {
                anchor: Point::ORIGIN,
                pointer: Point::new(5.0, 0.0)
            }
        );
        // Coming back inside the threshold keeps panning.
        assert_eq!(
            pointer.moved(Point::new(1.0, 0.0)),
            PointerAction::Pan {
                anchor: Point::ORIGIN,
                pointer: Point::new(1.0, 0.0)
            }
        );
        assert_eq!(
            pointer.release(Point::new(1.0, 1.0)),
            PointerAction::EndPan {
                pointer: Point::new(1.0, 1.0)
            }
        );
    }

    #[test]
    fn test_jump_release_is_not_a_click() {
        let mut pointer = PointerInteraction::default();
        pointer.press(Point::ORIGIN, Some(NodeId::from("pump2")));
        assert_eq!(pointer.release(Point::new(50.0, 0.0)), PointerAction::Ignore);
    }

    #[test]
    fn test_leave_cancels() {
        let mut pointer = PointerInteraction::default();
        pointer.press(Point::ORIGIN, None);
        pointer.moved(Point::new(0.0, 20.0));
        assert_eq!(pointer.leave(), PointerAction::CancelPan);
        assert_eq!(pointer.moved(Point::new(0.0, 40.0)), PointerAction::Ignore);

        pointer.press(Point::ORIGIN, None);
        assert_eq!(pointer.leave(), PointerAction::Ignore);
    }
}

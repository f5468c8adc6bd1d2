//! Headless host for the plant schematic: drives telemetry ticks on a timer
//! and feeds operator commands to the view.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod command;
pub mod driver;

pub use command::{Command, CommandError, Line, PointerEvent};
pub use driver::{Driver, DriverError, DriverHandle, TickOutput};

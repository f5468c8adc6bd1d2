//! Operator commands and the line syntax read from stdin.

use std::str::FromStr;
use std::time::Duration;

use schematic_core::Point;

/// Pointer input on the canvas, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
    Leave,
}

/// A change the driver applies to the view between ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Run one tick now; the schedule is not touched.
    Tick,
    SetRefresh(Duration),
    Pointer(PointerEvent),
    ZoomIn,
    ZoomOut,
    SetZoom(f64),
    ResetView,
    Select(String),
    ClearSelection,
}

/// One parsed stdin line.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Command(Command),
    /// Print the current snapshot.
    Print,
    /// Print the details of the selected node.
    Inspect,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Missing argument for '{0}'")]
    MissingArgument(&'static str),

    #[error("Invalid argument for '{command}': {value}")]
    InvalidArgument { command: &'static str, value: String },
}

fn number<T: FromStr>(command: &'static str, value: Option<&str>) -> Result<T, CommandError> {
    let value = value.ok_or(CommandError::MissingArgument(command))?;
    value.parse().map_err(|_| CommandError::InvalidArgument {
        command,
        value: value.to_owned(),
    })
}

fn point<'a>(
    command: &'static str,
    args: &mut impl Iterator<Item = &'a str>,
) -> Result<Point, CommandError> {
    let x = number(command, args.next())?;
    let y = number(command, args.next())?;
    Ok(Point::new(x, y))
}

impl FromStr for Line {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let head = words.next().ok_or(CommandError::Empty)?;

        let command = match head {
            "print" | "snapshot" => return Ok(Line::Print),
            "inspect" => return Ok(Line::Inspect),
            "quit" | "exit" => return Ok(Line::Quit),
            "tick" => Command::Tick,
            "refresh" => {
                let millis: u64 = number("refresh", words.next())?;
                Command::SetRefresh(Duration::from_millis(millis))
            }
            "down" => Command::Pointer(PointerEvent::Down(point("down", &mut words)?)),
            "move" => Command::Pointer(PointerEvent::Move(point("move", &mut words)?)),
            "up" => Command::Pointer(PointerEvent::Up(point("up", &mut words)?)),
            "leave" => Command::Pointer(PointerEvent::Leave),
            "zoom-in" => Command::ZoomIn,
            "zoom-out" => Command::ZoomOut,
            "zoom" => Command::SetZoom(number("zoom", words.next())?),
            "reset" => Command::ResetView,
            "select" => {
                let id = words.next().ok_or(CommandError::MissingArgument("select"))?;
                Command::Select(id.to_owned())
            }
            "clear" => Command::ClearSelection,
            other => return Err(CommandError::Unknown(other.to_owned())),
        };
        Ok(Line::Command(command))
    }
}

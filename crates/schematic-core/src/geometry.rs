//! Plane geometry for the schematic: points, node boxes and flow path routes.
//!
//! Flow paths are authored in a compact SVG-like form (`"M140,200 L180,200"`)
//! and parsed once into [`FlowPath`] when the topology is built.

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchematicError};

/// A 2-D point or offset in schematic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length when used as an offset.
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Rotates around `center` by `degrees` (clockwise in screen space).
    pub fn rotate_around(self, center: Point, degrees: f64) -> Point {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let d = self - center;
        Point::new(
            center.x + d.x * cos - d.y * sin,
            center.y + d.x * sin + d.y * cos,
        )
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;

    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

/// Width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Placement of a node on the canvas. `position` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeGeometry {
    pub position: Point,
    pub size: Size,
    /// Rotation in degrees about the box centre.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

impl NodeGeometry {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            position: Point::new(x, y),
            size: Size::new(width, height),
            rotation: None,
        }
    }

    #[must_use]
    pub const fn rotated(mut self, degrees: f64) -> Self {
        self.rotation = Some(degrees);
        self
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.position.x + self.size.width / 2.0,
            self.position.y + self.size.height / 2.0,
        )
    }

    /// Hit test in schematic coordinates, honouring rotation.
    pub fn contains(&self, point: Point) -> bool {
        let local = match self.rotation {
            Some(degrees) if degrees != 0.0 => point.rotate_around(self.center(), -degrees),
            _ => point,
        };
        local.x >= self.position.x
            && local.x <= self.position.x + self.size.width
            && local.y >= self.position.y
            && local.y <= self.position.y + self.size.height
    }
}

/// One drawing command of a flow path route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    CurveTo { ctrl1: Point, ctrl2: Point, end: Point },
}

impl PathCommand {
    /// Point the pen is at after this command.
    pub fn end(&self) -> Point {
        match *self {
            PathCommand::MoveTo(p) | PathCommand::LineTo(p) => p,
            PathCommand::CurveTo { end, .. } => end,
        }
    }

    /// First coordinate pair written for this command.
    pub fn lead(&self) -> Point {
        match *self {
            PathCommand::MoveTo(p) | PathCommand::LineTo(p) => p,
            PathCommand::CurveTo { ctrl1, .. } => ctrl1,
        }
    }
}

impl fmt::Display for PathCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathCommand::MoveTo(p) => write!(f, "M{},{}", p.x, p.y),
            PathCommand::LineTo(p) => write!(f, "L{},{}", p.x, p.y),
            PathCommand::CurveTo { ctrl1, ctrl2, end } => write!(
                f,
                "C{},{} {},{} {},{}",
                ctrl1.x, ctrl1.y, ctrl2.x, ctrl2.y, end.x, end.y
            ),
        }
    }
}

/// Route of a flow path: a move-to followed by at least one drawing command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlowPath {
    commands: Vec<PathCommand>,
}

impl FlowPath {
    /// Builds a polyline through `points`.
    pub fn from_points(points: &[Point]) -> Result<Self> {
        let mut iter = points.iter().copied();
        let Some(first) = iter.next() else {
            return Err(SchematicError::DegenerateGeometry(0));
        };
        let commands = std::iter::once(PathCommand::MoveTo(first))
            .chain(iter.map(PathCommand::LineTo))
            .collect();
        Self::from_commands(commands)
    }

    pub fn from_commands(commands: Vec<PathCommand>) -> Result<Self> {
        if commands.len() < 2 {
            return Err(SchematicError::DegenerateGeometry(commands.len()));
        }
        if !matches!(commands[0], PathCommand::MoveTo(_)) {
            return Err(SchematicError::InvalidPath {
                token: commands[0].to_string(),
                reason: "path must start with a move-to",
            });
        }
        Ok(Self { commands })
    }

    /// Parses `M x,y L x,y C x1,y1 x2,y2 x,y` descriptions. Only absolute
    /// commands are accepted.
    pub fn parse(description: &str) -> Result<Self> {
        let mut commands = Vec::new();
        let mut rest = description.trim();

        while let Some(letter) = rest.chars().next() {
            let body_start = letter.len_utf8();
            let body_end = rest[body_start..]
                .find(|c: char| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
                .map_or(rest.len(), |i| i + body_start);
            let (token, tail) = rest.split_at(body_end);
            let numbers = parse_numbers(&token[body_start..], token)?;

            let command = match (letter, numbers.as_slice()) {
                ('M', &[x, y]) => PathCommand::MoveTo(Point::new(x, y)),
                ('L', &[x, y]) => PathCommand::LineTo(Point::new(x, y)),
                ('C', &[x1, y1, x2, y2, x, y]) => PathCommand::CurveTo {
                    ctrl1: Point::new(x1, y1),
                    ctrl2: Point::new(x2, y2),
                    end: Point::new(x, y),
                },
                ('M' | 'L' | 'C', _) => {
                    return Err(SchematicError::InvalidPath {
                        token: token.trim().to_string(),
                        reason: "wrong number of coordinates",
                    });
                }
                _ => {
                    return Err(SchematicError::InvalidPath {
                        token: token.trim().to_string(),
                        reason: "unsupported command",
                    });
                }
            };
            commands.push(command);
            rest = tail.trim_start();
        }

        Self::from_commands(commands)
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    /// Vertices of the route (end point of every command).
    pub fn points(&self) -> Vec<Point> {
        self.commands.iter().map(PathCommand::end).collect()
    }

    pub fn start(&self) -> Point {
        self.commands[0].end()
    }

    pub fn end(&self) -> Point {
        self.commands[self.commands.len() - 1].end()
    }

    /// Label anchor; see [`midpoint`].
    pub fn midpoint(&self) -> Point {
        midpoint(&self.commands)
    }
}

impl fmt::Display for FlowPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{command}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for FlowPath {
    type Error = SchematicError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<FlowPath> for String {
    fn from(path: FlowPath) -> Self {
        path.to_string()
    }
}

/// Polyline through literal coordinates, for built-in topologies.
pub(crate) fn polyline(points: &[(f64, f64)]) -> FlowPath {
    debug_assert!(points.len() >= 2, "polyline needs two points");
    let commands = points
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            let p = Point::new(x, y);
            if i == 0 {
                PathCommand::MoveTo(p)
            } else {
                PathCommand::LineTo(p)
            }
        })
        .collect();
    FlowPath { commands }
}

/// Coarse label anchor of a route.
///
/// Picks the drawing command at index `len / 2` and returns its first
/// coordinate pair. This is not an arc-length midpoint. With fewer than two
/// commands the anchor falls back to the origin.
pub fn midpoint(commands: &[PathCommand]) -> Point {
    if commands.len() < 2 {
        return Point::ORIGIN;
    }
    commands[commands.len() / 2].lead()
}

fn parse_numbers(body: &str, token: &str) -> Result<Vec<f64>> {
    body.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| SchematicError::InvalidPath {
                    token: token.trim().to_string(),
                    reason: "not a finite number",
                })
        })
        .collect()
}

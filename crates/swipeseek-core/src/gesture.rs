//! Direction model and gesture executor.
//!
//! A search thinks in [`ScrollIntent`]s (move towards later or earlier
//! items). The container's [`Orientation`] turns an intent into a concrete
//! finger [`Direction`], and [`SwipeGesture::endpoints`] turns that into
//! screen coordinates inside the container's bounds.
//!
//! | Orientation  | Forward | Backward |
//! |--------------|---------|----------|
//! | `Vertical`   | `Up`    | `Down`   |
//! | `Horizontal` | `Left`  | `Right`  |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::{AutomationDriver, DriverError};
use crate::element::ElementFrame;

/// Smallest stroke, as a fraction of the container span.
const MIN_RATIO: f64 = 0.01;

/// Inset from the container edge so strokes never start outside it.
const EDGE_INSET: f64 = 1.0;

/// Axis along which a container scrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Items stacked top to bottom.
    Vertical,
    /// Items laid out left to right.
    Horizontal,
}

impl Orientation {
    /// Guesses orientation from the container shape: wider than tall means horizontal.
    pub fn infer(frame: &ElementFrame) -> Self {
        if frame.width > frame.height {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }

    /// Maps a logical intent onto a finger direction for this axis.
    pub fn direction(self, intent: ScrollIntent) -> Direction {
        match (self, intent) {
            (Orientation::Vertical, ScrollIntent::Forward) => Direction::Up,
            (Orientation::Vertical, ScrollIntent::Backward) => Direction::Down,
            (Orientation::Horizontal, ScrollIntent::Forward) => Direction::Left,
            (Orientation::Horizontal, ScrollIntent::Backward) => Direction::Right,
        }
    }
}

/// Logical scroll direction, independent of axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollIntent {
    /// Bring later items (higher values) into view.
    Forward,
    /// Bring earlier items (lower values) into view.
    Backward,
}

impl ScrollIntent {
    /// The opposite intent.
    pub fn reversed(self) -> Self {
        match self {
            ScrollIntent::Forward => ScrollIntent::Backward,
            ScrollIntent::Backward => ScrollIntent::Forward,
        }
    }
}

/// Direction the finger travels during a swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(format!(
                "Invalid swipe direction '{s}'. Use: up, down, left, right"
            )),
        }
    }
}

/// One physical swipe, sized relative to the container it runs in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeGesture {
    /// Finger direction.
    pub direction: Direction,
    /// Stroke length as a fraction of the container span, in `(0, 1]`.
    pub ratio: f64,
    /// Stroke duration.
    pub duration: Duration,
}

impl SwipeGesture {
    /// Creates a gesture, clamping `ratio` into `(0, 1]`.
    ///
    /// A non-finite ratio falls back to a half-span stroke.
    pub fn new(direction: Direction, ratio: f64, duration: Duration) -> Self {
        let ratio = if ratio.is_finite() {
            ratio.clamp(MIN_RATIO, 1.0)
        } else {
            0.5
        };
        Self {
            direction,
            ratio,
            duration,
        }
    }

    /// Start and end points for this stroke inside `bounds`.
    ///
    /// The stroke is centred on the container and runs along the axis of
    /// `direction`, covering `ratio` of the span minus a small edge inset.
    pub fn endpoints(&self, bounds: &ElementFrame) -> ((i32, i32), (i32, i32)) {
        let (cx, cy) = bounds.center();
        let vertical = matches!(self.direction, Direction::Up | Direction::Down);
        let span = if vertical { bounds.height } else { bounds.width };
        let half = ((span * self.ratio) / 2.0).min(span / 2.0 - EDGE_INSET).max(0.0);

        let (start, end) = match self.direction {
            Direction::Up => ((cx, cy + half), (cx, cy - half)),
            Direction::Down => ((cx, cy - half), (cx, cy + half)),
            Direction::Left => ((cx + half, cy), (cx - half, cy)),
            Direction::Right => ((cx - half, cy), (cx + half, cy)),
        };
        let px = |(x, y): (f64, f64)| (x.round() as i32, y.round() as i32);
        (px(start), px(end))
    }
}

/// Issues gestures through an automation driver.
///
/// Purely an action: no search logic. A rejected gesture comes back as an
/// error and the caller decides whether it matters.
#[derive(Clone)]
pub struct GestureExecutor {
    driver: Arc<dyn AutomationDriver>,
}

impl GestureExecutor {
    /// Wraps a driver.
    pub fn new(driver: Arc<dyn AutomationDriver>) -> Self {
        Self { driver }
    }

    /// The driver gestures are sent through.
    pub fn driver(&self) -> &Arc<dyn AutomationDriver> {
        &self.driver
    }

    /// Performs `gesture` inside `bounds`.
    pub async fn execute(
        &self,
        bounds: &ElementFrame,
        gesture: &SwipeGesture,
    ) -> Result<(), DriverError> {
        let ((sx, sy), (ex, ey)) = gesture.endpoints(bounds);
        debug!(direction = %gesture.direction, sx, sy, ex, ey, "swipe");
        self.driver
            .swipe(sx, sy, ex, ey, Some(gesture.duration.as_secs_f64()))
            .await
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Three tilt components in degrees.
///
/// `x` is front-back tilt, `y` is left-right tilt and `z` is the compass
/// heading.  Heading is passed through the pipeline but never used for
/// level or plumb computation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleTriple {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AngleTriple {
    /// The zero triple, used as the initial filtered value and the empty
    /// calibration offset.
    pub const ZERO: AngleTriple = AngleTriple {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A raw device-orientation reading as delivered by the sensor collaborator.
///
/// Any field may be absent; the mapper substitutes `0.0` for missing values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawSample {
    /// Front-to-back tilt, nominally `-180..=180`.
    pub beta: Option<f64>,
    /// Left-to-right tilt, nominally `-90..=90`.
    pub gamma: Option<f64>,
    /// Compass direction, nominally `0..360`.
    pub alpha: Option<f64>,
}

impl RawSample {
    /// A sample with every field present.
    pub fn new(beta: f64, gamma: f64, alpha: f64) -> Self {
        Self {
            beta: Some(beta),
            gamma: Some(gamma),
            alpha: Some(alpha),
        }
    }
}

/// The measuring mode of a session.  Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Bubble level on the left-right axis, target 0°.
    #[default]
    Horizontal,
    /// Bubble level on the front-back axis, target 90° (plumb).
    Vertical,
    /// Protractor read-out of the left-right axis.
    #[serde(alias = "angle")]
    AngleFinder,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Horizontal => write!(f, "horizontal"),
            Mode::Vertical => write!(f, "vertical"),
            Mode::AngleFinder => write!(f, "angle"),
        }
    }
}

impl FromStr for Mode {
    type Err = LevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "horizontal" | "h" => Ok(Mode::Horizontal),
            "vertical" | "v" => Ok(Mode::Vertical),
            "angle" | "angle_finder" | "a" => Ok(Mode::AngleFinder),
            other => Err(LevelError::InvalidConfig(format!("unknown mode '{other}'"))),
        }
    }
}

/// Screen orientation derived from the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenOrientation {
    #[default]
    Portrait,
    Landscape,
}

impl ScreenOrientation {
    /// Landscape when the viewport is strictly wider than it is tall.
    pub fn from_viewport(width: u32, height: u32) -> Self {
        if width > height {
            ScreenOrientation::Landscape
        } else {
            ScreenOrientation::Portrait
        }
    }
}

/// Mode-specific display geometry handed to the render collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geometry {
    /// Bubble offset along a one-dimensional vial, `0..=100` percent.
    Bubble { percent: f64, vertical: bool },
    /// Protractor needle.  `unit` is `(cos θ, sin θ)`; `end_x`/`end_y` is
    /// the needle tip in the caller's screen frame (y grows downward).
    Protractor {
        unit: (f64, f64),
        end_x: f64,
        end_y: f64,
    },
}

/// Text status shown under the angle read-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "degrees", rename_all = "snake_case")]
pub enum LevelStatus {
    Level,
    OffBy(f64),
}

impl fmt::Display for LevelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelStatus::Level => write!(f, "LEVEL"),
            LevelStatus::OffBy(deg) => write!(f, "OFF BY {deg:.1}°"),
        }
    }
}

/// Everything the render collaborator needs for one display tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    pub mode: Mode,
    pub display_angle: f64,
    pub geometry: Geometry,
    pub is_level: bool,
    pub holding: bool,
    pub status: LevelStatus,
}

impl RenderFrame {
    /// The angle read-out: magnitude with one decimal place, e.g. `"5.0°"`.
    pub fn angle_text(&self) -> String {
        format!("{:.1}°", self.display_angle.abs())
    }
}

/// Lifecycle milestones of the display pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    PermissionGranted,
    Started,
    Suspended,
    Resumed,
    Stopped,
}

/// Event envelope routed over the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"plumb-runtime::frame_loop"`
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data that can be routed over the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Frame(RenderFrame),
    /// The device just entered the level (or plumb) window.
    BecameLevel { mode: Mode, display_angle: f64 },
    /// Feedback was dispatched; lists the channels that delivered.
    FeedbackFired { haptic: bool, tone: bool },
    Lifecycle(Lifecycle),
    Fault { component: String, message: String },
}

/// Workspace error type.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LevelError {
    #[error("Permission denied: motion sensor access was refused")]
    PermissionDenied,

    #[error("Unsupported device: no orientation sensor available")]
    UnsupportedDevice,

    #[error("Feedback channel {channel} unavailable: {details}")]
    FeedbackChannelUnavailable { channel: String, details: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Channel closed: {0}")]
    Channel(String),
}

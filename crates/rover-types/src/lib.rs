use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Logic level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

/// Where the line sits relative to the robot's centreline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineOffset {
    Left,
    Center,
    Right,
}

impl LineOffset {
    /// Steering encoding used by the line follower: `-1` left, `0` centre,
    /// `1` right.
    pub fn as_steering(self) -> i8 {
        match self {
            LineOffset::Left => -1,
            LineOffset::Center => 0,
            LineOffset::Right => 1,
        }
    }
}

impl std::fmt::Display for LineOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineOffset::Left => write!(f, "Left"),
            LineOffset::Center => write!(f, "Center"),
            LineOffset::Right => write!(f, "Right"),
        }
    }
}

/// Tone of a single reflectance reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Surface {
    /// Absorptive surface (the line).
    Dark,
    /// Reflective surface (the field).
    Light,
    /// Between the dark and light calibration bounds.
    Ambiguous,
}

/// Discrete colour classes recognised on the target field.
///
/// `Unknown` is returned when a sample falls outside every calibrated range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorCategory {
    Black,
    Green,
    Red,
    Blue,
    White,
    Unknown,
}

impl ColorCategory {
    /// Matching order used by the colour classifier. Calibrated ranges may
    /// overlap, so earlier entries win.
    pub const PRIORITY: [ColorCategory; 5] = [
        ColorCategory::Black,
        ColorCategory::Green,
        ColorCategory::Red,
        ColorCategory::Blue,
        ColorCategory::White,
    ];
}

impl std::fmt::Display for ColorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColorCategory::Black => "Black",
            ColorCategory::Green => "Green",
            ColorCategory::Red => "Red",
            ColorCategory::Blue => "Blue",
            ColorCategory::White => "White",
            ColorCategory::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// One reading of the three filtered channels of the colour sensor.
///
/// Each value is the width in microseconds of one output pulse; a larger
/// width means less light on that channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColorSample {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
}

impl ColorSample {
    pub fn new(red: u32, green: u32, blue: u32) -> Self {
        Self { red, green, blue }
    }
}

/// Photodiode filter selected on the colour sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterChannel {
    Red,
    Green,
    Blue,
}

impl FilterChannel {
    /// Acquisition order for one colour sample.
    pub const SEQUENCE: [FilterChannel; 3] =
        [FilterChannel::Red, FilterChannel::Green, FilterChannel::Blue];

    /// Levels for the `(S2, S3)` filter-select pins.
    pub fn select_levels(self) -> (Level, Level) {
        match self {
            FilterChannel::Red => (Level::Low, Level::Low),
            FilterChannel::Green => (Level::High, Level::High),
            FilterChannel::Blue => (Level::Low, Level::High),
        }
    }
}

/// Output-frequency scaling of the colour sensor, fixed at initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyScaling {
    PowerDown,
    /// 2 %.
    Low,
    /// 20 %.
    #[default]
    Medium,
    /// 100 %.
    High,
}

impl FrequencyScaling {
    /// Levels for the `(S0, S1)` scaling pins.
    pub fn select_levels(self) -> (Level, Level) {
        match self {
            FrequencyScaling::PowerDown => (Level::Low, Level::Low),
            FrequencyScaling::Low => (Level::Low, Level::High),
            FrequencyScaling::Medium => (Level::High, Level::Low),
            FrequencyScaling::High => (Level::High, Level::High),
        }
    }
}

/// Outcome of a single ultrasonic ranging cycle before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RangeReading {
    /// An echo arrived and its distance is within the reliable range.
    Echo { distance_cm: f32 },
    /// No echo arrived within the timeout window.
    NoEcho,
    /// An echo arrived but the distance exceeds the reliable range.
    OutOfRange { distance_cm: f32 },
}

impl RangeReading {
    /// Collapse the reading to a distance, substituting `max_cm` for anything
    /// that is not a valid echo.
    pub fn distance_or(self, max_cm: f32) -> f32 {
        match self {
            RangeReading::Echo { distance_cm } => distance_cm,
            RangeReading::NoEcho | RangeReading::OutOfRange { .. } => max_cm,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, RangeReading::Echo { .. })
    }
}

/// Error type shared by the HAL and perception crates.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SensorError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Invalid calibration for {field}: {details}")]
    InvalidCalibration { field: String, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl SensorError {
    pub fn hardware(component: impl Into<String>, details: impl Into<String>) -> Self {
        SensorError::HardwareFault {
            component: component.into(),
            details: details.into(),
        }
    }

    pub fn calibration(field: impl Into<String>, details: impl Into<String>) -> Self {
        SensorError::InvalidCalibration {
            field: field.into(),
            details: details.into(),
        }
    }
}

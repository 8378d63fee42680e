//! [`CalibrationTable`] – immutable thresholds and colour ranges consumed by
//! every sensor driver.
//!
//! The defaults are the values the competition robot shipped with. Load a
//! tuned table from TOML with [`CalibrationTable::from_toml_str`]; every
//! section and field is optional and falls back to its default. A colour
//! range may be given in part: `[color.green] red = { min = 40 }` changes
//! only that bound and keeps the rest of Green's default range.
//!
//! ```toml
//! [range]
//! obstacle_distance_cm = 25.0
//!
//! [line]
//! threshold = 2000
//!
//! [color.green]
//! red = { min = 50, max = 100 }
//! green = { min = 100, max = 200 }
//! blue = { min = 50, max = 100 }
//! ```
//!
//! Colour ranges are allowed to overlap. The classifier resolves overlaps by
//! its fixed priority order, so [`CalibrationTable::validate`] only rejects
//! ranges that are malformed on their own.

use std::fs;
use std::path::Path;

use rover_types::{ColorCategory, ColorSample, FrequencyScaling, SensorError};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Colour ranges
// ────────────────────────────────────────────────────────────────────────────

/// Closed interval `[min, max]` of pulse widths for one filter channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub min: u32,
    pub max: u32,
}

impl ChannelRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u32) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Acceptance region of one colour: a sample matches when all three channels
/// fall inside their intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub red: ChannelRange,
    pub green: ChannelRange,
    pub blue: ChannelRange,
}

impl ColorRange {
    pub const fn new(red: ChannelRange, green: ChannelRange, blue: ChannelRange) -> Self {
        Self { red, green, blue }
    }

    /// Same interval on every channel.
    pub const fn uniform(min: u32, max: u32) -> Self {
        let ch = ChannelRange::new(min, max);
        Self::new(ch, ch, ch)
    }

    pub fn matches(&self, sample: &ColorSample) -> bool {
        self.red.contains(sample.red)
            && self.green.contains(sample.green)
            && self.blue.contains(sample.blue)
    }
}

/// Colour sensor calibration: one range per named colour plus acquisition
/// timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColorCalibrationOverrides")]
pub struct ColorCalibration {
    pub black: ColorRange,
    pub green: ColorRange,
    pub red: ColorRange,
    pub blue: ColorRange,
    pub white: ColorRange,
    /// Output-frequency scaling applied once at initialisation.
    pub scaling: FrequencyScaling,
    /// Wait after switching filters before the output is valid.
    pub filter_settle_ms: u32,
    /// Upper bound on a single channel pulse measurement.
    pub pulse_timeout_us: u32,
}

impl ColorCalibration {
    /// Range for a named colour. `Unknown` has none.
    pub fn range(&self, category: ColorCategory) -> Option<&ColorRange> {
        match category {
            ColorCategory::Black => Some(&self.black),
            ColorCategory::Green => Some(&self.green),
            ColorCategory::Red => Some(&self.red),
            ColorCategory::Blue => Some(&self.blue),
            ColorCategory::White => Some(&self.white),
            ColorCategory::Unknown => None,
        }
    }
}

impl Default for ColorCalibration {
    fn default() -> Self {
        Self {
            black: ColorRange::uniform(0, 50),
            green: ColorRange::new(
                ChannelRange::new(50, 100),
                ChannelRange::new(100, 200),
                ChannelRange::new(50, 100),
            ),
            red: ColorRange::new(
                ChannelRange::new(150, 255),
                ChannelRange::new(0, 80),
                ChannelRange::new(0, 80),
            ),
            blue: ColorRange::new(
                ChannelRange::new(0, 80),
                ChannelRange::new(0, 100),
                ChannelRange::new(150, 255),
            ),
            white: ColorRange::uniform(200, 255),
            scaling: FrequencyScaling::Medium,
            filter_settle_ms: 10,
            pulse_timeout_us: 1_000_000,
        }
    }
}

// ── Partial overrides ───────────────────────────────────────────────────────
//
// Colour ranges are read as overrides on top of the firmware defaults so a
// file can retune a single bound without restating the whole range.

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ChannelRangeOverride {
    min: Option<u32>,
    max: Option<u32>,
}

impl ChannelRangeOverride {
    fn apply(self, base: ChannelRange) -> ChannelRange {
        ChannelRange::new(self.min.unwrap_or(base.min), self.max.unwrap_or(base.max))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ColorRangeOverride {
    red: ChannelRangeOverride,
    green: ChannelRangeOverride,
    blue: ChannelRangeOverride,
}

impl ColorRangeOverride {
    fn apply(self, base: ColorRange) -> ColorRange {
        ColorRange::new(
            self.red.apply(base.red),
            self.green.apply(base.green),
            self.blue.apply(base.blue),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ColorCalibrationOverrides {
    black: ColorRangeOverride,
    green: ColorRangeOverride,
    red: ColorRangeOverride,
    blue: ColorRangeOverride,
    white: ColorRangeOverride,
    scaling: Option<FrequencyScaling>,
    filter_settle_ms: Option<u32>,
    pulse_timeout_us: Option<u32>,
}

impl From<ColorCalibrationOverrides> for ColorCalibration {
    fn from(o: ColorCalibrationOverrides) -> Self {
        let base = ColorCalibration::default();
        Self {
            black: o.black.apply(base.black),
            green: o.green.apply(base.green),
            red: o.red.apply(base.red),
            blue: o.blue.apply(base.blue),
            white: o.white.apply(base.white),
            scaling: o.scaling.unwrap_or(base.scaling),
            filter_settle_ms: o.filter_settle_ms.unwrap_or(base.filter_settle_ms),
            pulse_timeout_us: o.pulse_timeout_us.unwrap_or(base.pulse_timeout_us),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Range and line thresholds
// ────────────────────────────────────────────────────────────────────────────

/// Ultrasonic thresholds, in centimetres unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeThresholds {
    /// Anything strictly closer than this (and above zero) is an obstacle.
    pub obstacle_distance_cm: f32,
    /// Anything strictly closer than this (and above zero) is the ramp.
    pub ramp_distance_cm: f32,
    /// Largest distance reported; also the no-echo sentinel.
    pub max_distance_cm: f32,
    /// Upper bound on the echo wait, in microseconds.
    pub echo_timeout_us: u32,
}

impl Default for RangeThresholds {
    fn default() -> Self {
        Self {
            obstacle_distance_cm: 20.0,
            ramp_distance_cm: 10.0,
            max_distance_cm: 200.0,
            echo_timeout_us: 30_000,
        }
    }
}

/// Reflectance thresholds in raw ADC counts. Lower counts mean a darker
/// surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineThresholds {
    /// A reading strictly below this is on the line.
    pub threshold: u16,
    /// Readings at or above this are reflective field.
    pub white_min: u16,
    /// Readings at or below this are the line itself.
    pub black_max: u16,
}

impl Default for LineThresholds {
    fn default() -> Self {
        Self {
            threshold: 500,
            white_min: 700,
            black_max: 300,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// CalibrationTable
// ────────────────────────────────────────────────────────────────────────────

/// Complete calibration for the three sensors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationTable {
    pub range: RangeThresholds,
    pub line: LineThresholds,
    pub color: ColorCalibration,
}

impl CalibrationTable {
    /// Parse a table from TOML, filling absent fields with defaults, and
    /// validate it.
    ///
    /// # Errors
    ///
    /// [`SensorError::Config`] when the TOML is malformed,
    /// [`SensorError::InvalidCalibration`] when a value is inconsistent.
    pub fn from_toml_str(raw: &str) -> Result<Self, SensorError> {
        let table: CalibrationTable = toml::from_str(raw)
            .map_err(|e| SensorError::Config(format!("Failed to parse calibration: {e}")))?;
        table.validate()?;
        Ok(table)
    }

    /// Read and parse a TOML calibration file.
    pub fn load_from(path: &Path) -> Result<Self, SensorError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            SensorError::Config(format!(
                "Failed to read calibration at {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Check every value for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns the first [`SensorError::InvalidCalibration`] found.
    pub fn validate(&self) -> Result<(), SensorError> {
        let r = &self.range;
        if !(r.max_distance_cm.is_finite() && r.max_distance_cm > 0.0) {
            return Err(SensorError::calibration(
                "range.max_distance_cm",
                format!("must be positive, got {}", r.max_distance_cm),
            ));
        }
        for (field, value) in [
            ("range.obstacle_distance_cm", r.obstacle_distance_cm),
            ("range.ramp_distance_cm", r.ramp_distance_cm),
        ] {
            // A threshold above the sentinel would report "no echo" as an
            // obstacle.
            if !(value > 0.0 && value <= r.max_distance_cm) {
                return Err(SensorError::calibration(
                    field,
                    format!("must be in (0, {}], got {}", r.max_distance_cm, value),
                ));
            }
        }
        if r.echo_timeout_us == 0 {
            return Err(SensorError::calibration("range.echo_timeout_us", "must be non-zero"));
        }

        let l = &self.line;
        if l.black_max >= l.white_min {
            return Err(SensorError::calibration(
                "line.black_max",
                format!("{} must be below line.white_min {}", l.black_max, l.white_min),
            ));
        }

        for category in ColorCategory::PRIORITY {
            let Some(range) = self.color.range(category) else {
                continue;
            };
            let channels = [("red", range.red), ("green", range.green), ("blue", range.blue)];
            for (channel, ch) in channels {
                if ch.min > ch.max {
                    return Err(SensorError::calibration(
                        format!("color.{}.{}", category.to_string().to_lowercase(), channel),
                        format!("min {} exceeds max {}", ch.min, ch.max),
                    ));
                }
            }
        }
        if self.color.pulse_timeout_us == 0 {
            return Err(SensorError::calibration("color.pulse_timeout_us", "must be non-zero"));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        CalibrationTable::default().validate().expect("defaults must validate");
    }

    #[test]
    fn channel_range_is_closed() {
        let ch = ChannelRange::new(50, 100);
        assert!(ch.contains(50));
        assert!(ch.contains(100));
        assert!(!ch.contains(49));
        assert!(!ch.contains(101));
    }

    #[test]
    fn color_range_requires_all_channels() {
        let green = ColorCalibration::default().green;
        assert!(green.matches(&ColorSample::new(75, 150, 75)));
        assert!(!green.matches(&ColorSample::new(75, 150, 101)));
        assert!(!green.matches(&ColorSample::new(30, 150, 75)));
    }

    #[test]
    fn unknown_has_no_range() {
        let cal = ColorCalibration::default();
        assert!(cal.range(ColorCategory::Unknown).is_none());
        assert_eq!(cal.range(ColorCategory::White), Some(&ColorRange::uniform(200, 255)));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let raw = r#"
            [range]
            obstacle_distance_cm = 25.0

            [line]
            threshold = 2000
            white_min = 3000
            black_max = 1000

            [color]
            scaling = "high"
        "#;
        let table = CalibrationTable::from_toml_str(raw).unwrap();
        assert!((table.range.obstacle_distance_cm - 25.0).abs() < f32::EPSILON);
        assert!((table.range.max_distance_cm - 200.0).abs() < f32::EPSILON);
        assert_eq!(table.line.threshold, 2000);
        assert_eq!(table.color.scaling, FrequencyScaling::High);
        assert_eq!(table.color.black, ColorRange::uniform(0, 50));
    }

    #[test]
    fn toml_color_range_override() {
        let raw = r#"
            [color.black]
            red = { min = 0, max = 40 }
            green = { min = 0, max = 45 }
            blue = { min = 0, max = 60 }
        "#;
        let table = CalibrationTable::from_toml_str(raw).unwrap();
        assert_eq!(table.color.black.red, ChannelRange::new(0, 40));
        assert_eq!(table.color.black.blue, ChannelRange::new(0, 60));
    }

    #[test]
    fn partial_color_range_keeps_remaining_defaults() {
        let table =
            CalibrationTable::from_toml_str("[color.green]\nred = { min = 40, max = 100 }\n")
                .unwrap();
        let default = ColorCalibration::default();
        assert_eq!(table.color.green.red, ChannelRange::new(40, 100));
        assert_eq!(table.color.green.green, default.green.green);
        assert_eq!(table.color.green.blue, default.green.blue);
        assert_eq!(table.color.black, default.black);
    }

    #[test]
    fn single_bound_override_keeps_other_bound() {
        let raw = "[color.white]\nblue = { min = 180 }\n";
        let table = CalibrationTable::from_toml_str(raw).unwrap();
        assert_eq!(table.color.white.blue, ChannelRange::new(180, 255));
        assert_eq!(table.color.white.red, ChannelRange::new(200, 255));
    }

    #[test]
    fn misspelled_channel_is_config_error() {
        let raw = "[color.red]\nredd = { min = 1 }\n";
        let err = CalibrationTable::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, SensorError::Config(_)));
    }

    #[test]
    fn color_calibration_survives_toml_round_trip() {
        let mut table = CalibrationTable::default();
        table.color.blue.green = ChannelRange::new(10, 90);
        table.color.scaling = FrequencyScaling::Low;
        let raw = toml::to_string_pretty(&table).unwrap();
        assert_eq!(CalibrationTable::from_toml_str(&raw).unwrap(), table);
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = CalibrationTable::from_toml_str("[range\nmax = ").unwrap_err();
        assert!(matches!(err, SensorError::Config(_)));
    }

    #[test]
    fn inverted_channel_range_is_rejected() {
        let mut table = CalibrationTable::default();
        table.color.green.blue = ChannelRange::new(120, 80);
        match table.validate() {
            Err(SensorError::InvalidCalibration { field, .. }) => {
                assert_eq!(field, "color.green.blue");
            }
            other => panic!("expected InvalidCalibration, got {other:?}"),
        }
    }

    #[test]
    fn obstacle_threshold_beyond_max_is_rejected() {
        let mut table = CalibrationTable::default();
        table.range.obstacle_distance_cm = 250.0;
        assert!(matches!(
            table.validate(),
            Err(SensorError::InvalidCalibration { .. })
        ));
    }

    #[test]
    fn zero_obstacle_threshold_is_rejected() {
        let mut table = CalibrationTable::default();
        table.range.obstacle_distance_cm = 0.0;
        assert!(table.validate().is_err());
    }

    #[test]
    fn overlapping_color_ranges_are_allowed() {
        let mut table = CalibrationTable::default();
        table.color.green = ColorRange::uniform(0, 100);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn inverted_line_bounds_are_rejected() {
        let mut table = CalibrationTable::default();
        table.line.black_max = 800;
        assert!(table.validate().is_err());
    }

    #[test]
    fn load_from_missing_file_is_config_error() {
        let err =
            CalibrationTable::load_from(Path::new("/nonexistent/rover/cal.toml")).unwrap_err();
        assert!(matches!(err, SensorError::Config(_)));
    }
}

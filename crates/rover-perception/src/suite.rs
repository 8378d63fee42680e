//! [`SensorSuite`] – the boundary the mission controller talks to.
//!
//! [`SensorSuite::initialize_sensors`] takes ownership of every sensor pin,
//! validates the calibration, puts the outputs into a known state and applies
//! the colour sensor's frequency scaling once. After that the four query
//! operations may be called once per control-loop tick:
//!
//! - [`measure_distance`][SensorSuite::measure_distance]
//! - [`detect_obstacle`][SensorSuite::detect_obstacle]
//! - [`resolve_line_position`][SensorSuite::resolve_line_position]
//! - [`classify_color`][SensorSuite::classify_color]
//!
//! Every query takes `&mut self` and blocks until its hardware interaction
//! finishes or times out, so the three sensors can never be driven at the
//! same time.
//!
//! # Example
//!
//! ```rust
//! use rover_hal::sim::SimBoard;
//! use rover_perception::calibration::CalibrationTable;
//! use rover_perception::suite::{PinMap, SensorPins, SensorSuite};
//! use rover_types::{ColorCategory, ColorSample, LineOffset};
//!
//! let board = SimBoard::new();
//! let map = PinMap::default();
//! let pins = SensorPins::simulated(&board, &map);
//! let mut suite = SensorSuite::initialize_sensors(pins, CalibrationTable::default())
//!     .expect("default calibration is valid");
//!
//! board.set_analog(&map.ir_left, 400);
//! board.set_analog(&map.ir_right, 600);
//! board.set_color_sample(Some(ColorSample::new(30, 30, 30)));
//!
//! assert_eq!(suite.resolve_line_position(), LineOffset::Left);
//! assert_eq!(suite.classify_color(), ColorCategory::Black);
//! assert!(!suite.detect_obstacle());
//! ```

use chrono::{DateTime, Utc};
use rover_hal::sim::SimBoard;
use rover_hal::{AnalogInput, Delay, OutputPin, PulseInput};
use rover_types::{
    ColorCategory, ColorSample, FilterChannel, LineOffset, RangeReading, SensorError,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calibration::CalibrationTable;
use crate::color::{ColorSensor, ColorSensorPins};
use crate::line::LineSensor;
use crate::range::{RangeSensor, is_within};

// ────────────────────────────────────────────────────────────────────────────
// Pin wiring
// ────────────────────────────────────────────────────────────────────────────

/// Board pin labels for each sensor line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinMap {
    pub ultrasonic_trig: String,
    pub ultrasonic_echo: String,
    pub ir_left: String,
    pub ir_right: String,
    pub color_s0: String,
    pub color_s1: String,
    pub color_s2: String,
    pub color_s3: String,
    pub color_out: String,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            ultrasonic_trig: "D12".to_string(),
            ultrasonic_echo: "D11".to_string(),
            ir_left: "A0".to_string(),
            ir_right: "A1".to_string(),
            color_s0: "D8".to_string(),
            color_s1: "D13".to_string(),
            color_s2: "A2".to_string(),
            color_s3: "A3".to_string(),
            color_out: "A4".to_string(),
        }
    }
}

/// Every hardware handle the suite takes ownership of.
pub struct SensorPins {
    pub ultrasonic_trig: Box<dyn OutputPin>,
    pub ultrasonic_echo: Box<dyn PulseInput>,
    pub ir_left: Box<dyn AnalogInput>,
    pub ir_right: Box<dyn AnalogInput>,
    pub color: ColorSensorPins,
    pub range_delay: Box<dyn Delay>,
    pub color_delay: Box<dyn Delay>,
}

impl SensorPins {
    /// Wire every sensor to a simulated board using the labels in `map`.
    pub fn simulated(board: &SimBoard, map: &PinMap) -> Self {
        Self {
            ultrasonic_trig: board.output_pin(&map.ultrasonic_trig),
            ultrasonic_echo: board.echo_input(&map.ultrasonic_echo),
            ir_left: board.analog_input(&map.ir_left),
            ir_right: board.analog_input(&map.ir_right),
            color: ColorSensorPins {
                s0: board.output_pin(&map.color_s0),
                s1: board.output_pin(&map.color_s1),
                s2: board.output_pin(&map.color_s2),
                s3: board.output_pin(&map.color_s3),
                out: board.color_output(
                    &map.color_out,
                    (map.color_s0.as_str(), map.color_s1.as_str()),
                    (map.color_s2.as_str(), map.color_s3.as_str()),
                ),
            },
            range_delay: board.delay(),
            color_delay: board.delay(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Snapshot
// ────────────────────────────────────────────────────────────────────────────

/// One pass over all three sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub taken_at: DateTime<Utc>,
    /// Ranging outcome, absent on a trigger or echo fault.
    pub range: Option<RangeReading>,
    pub distance_cm: f32,
    pub obstacle: bool,
    pub ramp: bool,
    /// Raw `[left, right]` reflectance counts, absent on a read fault.
    pub ir: Option<[u16; 2]>,
    pub line: LineOffset,
    /// Raw colour sample, absent on timeout or fault.
    pub sample: Option<ColorSample>,
    pub color: ColorCategory,
}

// ────────────────────────────────────────────────────────────────────────────
// SensorSuite
// ────────────────────────────────────────────────────────────────────────────

/// The three sensor drivers sharing one calibration table.
pub struct SensorSuite {
    range: RangeSensor,
    line: LineSensor,
    color: ColorSensor,
    calibration: CalibrationTable,
}

impl SensorSuite {
    /// Validate `calibration`, configure every output and return the ready
    /// suite.
    ///
    /// Leaves the trigger line low, selects the red filter and applies the
    /// calibrated frequency scaling, which stays fixed for the suite's
    /// lifetime.
    ///
    /// # Errors
    ///
    /// [`SensorError::InvalidCalibration`] for an inconsistent table;
    /// [`SensorError::HardwareFault`] if an output cannot be driven.
    pub fn initialize_sensors(
        pins: SensorPins,
        calibration: CalibrationTable,
    ) -> Result<Self, SensorError> {
        calibration.validate()?;

        let mut trigger = pins.ultrasonic_trig;
        trigger.set_low()?;
        let range = RangeSensor::new(
            trigger,
            pins.ultrasonic_echo,
            pins.range_delay,
            calibration.range,
        );

        let line = LineSensor::new(pins.ir_left, pins.ir_right, calibration.line);

        let mut color = ColorSensor::new(pins.color, pins.color_delay, calibration.color.clone());
        color.select_filter(FilterChannel::Red)?;
        color.set_scaling(calibration.color.scaling)?;

        info!(
            scaling = ?calibration.color.scaling,
            obstacle_cm = calibration.range.obstacle_distance_cm,
            line_threshold = calibration.line.threshold,
            "sensors initialized"
        );

        Ok(Self {
            range,
            line,
            color,
            calibration,
        })
    }

    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    pub fn measure_distance(&mut self) -> f32 {
        self.range.measure_distance()
    }

    pub fn detect_obstacle(&mut self) -> bool {
        self.range.detect_obstacle()
    }

    pub fn detect_ramp(&mut self) -> bool {
        self.range.detect_ramp()
    }

    pub fn resolve_line_position(&mut self) -> LineOffset {
        self.line.resolve_line_position()
    }

    pub fn classify_color(&mut self) -> ColorCategory {
        self.color.classify_color()
    }

    /// Read every sensor once. Uses a single ranging cycle for the distance,
    /// obstacle and ramp fields.
    pub fn snapshot(&mut self) -> SensorSnapshot {
        let thresholds = self.calibration.range;
        let range = match self.range.read() {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!(error = %e, "range sensor fault during snapshot");
                None
            }
        };
        let distance_cm = range.map_or(thresholds.max_distance_cm, |r| {
            r.distance_or(thresholds.max_distance_cm)
        });

        let (ir, line) = match self.line.read_raw() {
            Ok((left, right)) => (Some([left, right]), self.line.offset_for(left, right)),
            Err(e) => {
                warn!(error = %e, "line sensor fault during snapshot");
                (None, LineOffset::Center)
            }
        };

        let (sample, color) = self.color.sample_and_classify();

        SensorSnapshot {
            taken_at: Utc::now(),
            range,
            distance_cm,
            obstacle: is_within(distance_cm, thresholds.obstacle_distance_cm),
            ramp: is_within(distance_cm, thresholds.ramp_distance_cm),
            ir,
            line,
            sample,
            color,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{ChannelRange, ColorRange};
    use crate::range::SPEED_OF_SOUND_CM_PER_US;
    use rover_types::{FrequencyScaling, Level};

    fn suite_with(board: &SimBoard, calibration: CalibrationTable) -> SensorSuite {
        let pins = SensorPins::simulated(board, &PinMap::default());
        SensorSuite::initialize_sensors(pins, calibration).expect("init must succeed")
    }

    #[test]
    fn initialize_sets_known_output_levels() {
        let board = SimBoard::new();
        let _suite = suite_with(&board, CalibrationTable::default());

        assert_eq!(board.level("D12"), Some(Level::Low));
        // Red filter.
        assert_eq!(board.level("A2"), Some(Level::Low));
        assert_eq!(board.level("A3"), Some(Level::Low));
        // 20 % scaling.
        assert_eq!(board.level("D8"), Some(Level::High));
        assert_eq!(board.level("D13"), Some(Level::Low));
    }

    #[test]
    fn initialize_applies_configured_scaling() {
        let board = SimBoard::new();
        let mut cal = CalibrationTable::default();
        cal.color.scaling = FrequencyScaling::Low;
        let _suite = suite_with(&board, cal);
        assert_eq!(board.level("D8"), Some(Level::Low));
        assert_eq!(board.level("D13"), Some(Level::High));
    }

    #[test]
    fn initialize_rejects_invalid_calibration() {
        let board = SimBoard::new();
        let mut cal = CalibrationTable::default();
        cal.color.red.red = ChannelRange::new(255, 150);
        let pins = SensorPins::simulated(&board, &PinMap::default());
        let result = SensorSuite::initialize_sensors(pins, cal);
        assert!(matches!(result, Err(SensorError::InvalidCalibration { .. })));
        // Nothing is driven before validation passes.
        assert!(board.writes().is_empty());
    }

    #[test]
    fn initialize_reports_pin_fault() {
        let board = SimBoard::new();
        board.inject_fault("D8");
        let pins = SensorPins::simulated(&board, &PinMap::default());
        let result = SensorSuite::initialize_sensors(pins, CalibrationTable::default());
        assert!(matches!(result, Err(SensorError::HardwareFault { .. })));
    }

    #[test]
    fn no_echo_scenario() {
        let board = SimBoard::new();
        let mut suite = suite_with(&board, CalibrationTable::default());
        board.set_echo_us(Some(0));
        assert_eq!(suite.measure_distance(), 200.0);
        assert!(!suite.detect_obstacle());
    }

    #[test]
    fn obstacle_scenario() {
        let board = SimBoard::new();
        let mut suite = suite_with(&board, CalibrationTable::default());
        let width = (15.0 * 2.0 / SPEED_OF_SOUND_CM_PER_US).round() as u32;
        board.set_echo_us(Some(width));
        assert!(suite.detect_obstacle());
        assert!(!suite.detect_ramp());
    }

    #[test]
    fn line_scenario() {
        let board = SimBoard::new();
        let mut suite = suite_with(&board, CalibrationTable::default());
        board.set_analog("A0", 400);
        board.set_analog("A1", 600);
        assert_eq!(suite.resolve_line_position(), LineOffset::Left);
    }

    #[test]
    fn color_scenarios() {
        let board = SimBoard::new();
        let mut suite = suite_with(&board, CalibrationTable::default());

        board.set_color_sample(Some(ColorSample::new(30, 30, 30)));
        assert_eq!(suite.classify_color(), ColorCategory::Black);

        board.set_color_sample(Some(ColorSample::new(999, 999, 999)));
        assert_eq!(suite.classify_color(), ColorCategory::Unknown);
    }

    #[test]
    fn per_instance_calibration() {
        let board = SimBoard::new();
        let mut cal = CalibrationTable::default();
        cal.color.white = ColorRange::uniform(900, 1000);
        let mut suite = suite_with(&board, cal);
        board.set_color_sample(Some(ColorSample::new(999, 999, 999)));
        assert_eq!(suite.classify_color(), ColorCategory::White);
    }

    #[test]
    fn snapshot_reads_everything_once() {
        let board = SimBoard::new();
        let mut suite = suite_with(&board, CalibrationTable::default());
        board.set_echo_us(Some(500));
        board.set_analog("A0", 800);
        board.set_analog("A1", 100);
        board.set_color_sample(Some(ColorSample::new(75, 150, 75)));
        board.clear_writes();

        let snap = suite.snapshot();
        assert!(snap.range.is_some_and(|r| r.is_valid()));
        assert!((snap.distance_cm - 8.5).abs() < 1e-3);
        assert!(snap.obstacle);
        assert!(snap.ramp);
        assert_eq!(snap.ir, Some([800, 100]));
        assert_eq!(snap.line, LineOffset::Right);
        assert_eq!(snap.sample, Some(ColorSample::new(75, 150, 75)));
        assert_eq!(snap.color, ColorCategory::Green);

        let trig_pulses = board
            .writes()
            .iter()
            .filter(|(id, l)| id == "D12" && *l == Level::High)
            .count();
        assert_eq!(trig_pulses, 1);
    }

    #[test]
    fn snapshot_survives_faults() {
        let board = SimBoard::new();
        let mut suite = suite_with(&board, CalibrationTable::default());
        board.inject_fault("D11");
        board.inject_fault("A0");
        board.inject_fault("A4");

        let snap = suite.snapshot();
        assert_eq!(snap.range, None);
        assert_eq!(snap.distance_cm, 200.0);
        assert!(!snap.obstacle);
        assert_eq!(snap.ir, None);
        assert_eq!(snap.line, LineOffset::Center);
        assert_eq!(snap.color, ColorCategory::Unknown);
    }

    #[test]
    fn snapshot_tells_ranger_fault_from_empty_field() {
        let board = SimBoard::new();
        let mut suite = suite_with(&board, CalibrationTable::default());
        board.set_echo_us(None);

        let empty = suite.snapshot();
        assert_eq!(empty.range, Some(RangeReading::NoEcho));

        board.inject_fault("D11");
        let faulted = suite.snapshot();
        assert_eq!(faulted.range, None);
        assert_ne!(empty.range, faulted.range);
        // Both still report the sentinel distance to the controller.
        assert_eq!(empty.distance_cm, faulted.distance_cm);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let board = SimBoard::new();
        let mut suite = suite_with(&board, CalibrationTable::default());
        let snap = suite.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains(r#""status":"no_echo""#));
        assert!(json.contains(r#""color":"Unknown""#));
        let back: SensorSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn pin_map_toml_overrides_single_label() {
        let map: PinMap = toml::from_str(r#"ir_left = "GPIO34""#).unwrap();
        assert_eq!(map.ir_left, "GPIO34");
        assert_eq!(map.ir_right, "A1");
    }
}

//! `rover-perception` – sensor interpretation layer.
//!
//! Turns raw pulse widths and ADC counts into the small discrete signals the
//! mission controller acts on. Every classifier is a single-sample,
//! deterministic function of the current hardware reading and an immutable
//! [`CalibrationTable`][calibration::CalibrationTable].
//!
//! # Modules
//!
//! - [`calibration`] – [`CalibrationTable`][calibration::CalibrationTable]:
//!   distance thresholds, line thresholds and per-colour RGB ranges, with
//!   TOML loading and validation.
//! - [`range`] – [`RangeSensor`][range::RangeSensor]: ultrasonic ranging
//!   with the max-distance sentinel and obstacle/ramp detection.
//! - [`line`] – [`LineSensor`][line::LineSensor]: two-sensor line offset
//!   resolver.
//! - [`color`] – [`ColorSensor`][color::ColorSensor]: three-channel colour
//!   acquisition and fixed-priority range matching.
//! - [`suite`] – [`SensorSuite`][suite::SensorSuite]: one-time
//!   initialisation and the query surface for the mission controller.

pub mod calibration;
pub mod color;
pub mod line;
pub mod range;
pub mod suite;

pub use calibration::CalibrationTable;
pub use suite::{PinMap, SensorPins, SensorSnapshot, SensorSuite};

//! Ultrasonic range sensor driver.
//!
//! One ranging cycle drives the trigger line low → high (10 µs) → low, then
//! times the HIGH echo pulse with a bounded wait. The echo width is converted
//! to centimetres with a fixed speed of sound:
//!
//! ```text
//! distance_cm = duration_us × 0.034 / 2
//! ```
//!
//! A missing echo or a distance beyond `max_distance_cm` is reported as
//! `max_distance_cm`, which reads as "nothing in range" to an obstacle
//! detector.
//!
//! # Example
//!
//! ```rust
//! use rover_hal::sim::SimBoard;
//! use rover_perception::calibration::RangeThresholds;
//! use rover_perception::range::RangeSensor;
//!
//! let board = SimBoard::new();
//! let mut sensor = RangeSensor::new(
//!     board.output_pin("trig"),
//!     board.echo_input("echo"),
//!     board.delay(),
//!     RangeThresholds::default(),
//! );
//!
//! board.set_echo_us(None);
//! assert_eq!(sensor.measure_distance(), 200.0);
//! assert!(!sensor.detect_obstacle());
//! ```

use std::time::Duration;

use rover_hal::{Delay, OutputPin, PulseInput};
use rover_types::{Level, RangeReading, SensorError};
use tracing::{debug, warn};

use crate::calibration::RangeThresholds;

/// Round-trip speed of sound, centimetres per microsecond.
pub const SPEED_OF_SOUND_CM_PER_US: f32 = 0.034;

const TRIGGER_SETTLE_US: u32 = 2;
const TRIGGER_PULSE_US: u32 = 10;

/// Convert an echo pulse width to a one-way distance.
pub fn echo_to_distance_cm(duration_us: u32) -> f32 {
    duration_us as f32 * SPEED_OF_SOUND_CM_PER_US / 2.0
}

/// Classify one echo measurement. `None` and `Some(0)` both mean no echo.
pub fn interpret_echo(duration_us: Option<u32>, max_distance_cm: f32) -> RangeReading {
    match duration_us {
        None | Some(0) => RangeReading::NoEcho,
        Some(d) => {
            let distance_cm = echo_to_distance_cm(d);
            if distance_cm > max_distance_cm {
                RangeReading::OutOfRange { distance_cm }
            } else {
                RangeReading::Echo { distance_cm }
            }
        }
    }
}

/// `true` iff `0 < distance_cm < threshold_cm`. Zero means "no valid
/// measurement", never "touching".
pub fn is_within(distance_cm: f32, threshold_cm: f32) -> bool {
    distance_cm > 0.0 && distance_cm < threshold_cm
}

/// Trigger/echo ultrasonic ranger.
pub struct RangeSensor {
    trigger: Box<dyn OutputPin>,
    echo: Box<dyn PulseInput>,
    delay: Box<dyn Delay>,
    thresholds: RangeThresholds,
}

impl RangeSensor {
    pub fn new(
        trigger: Box<dyn OutputPin>,
        echo: Box<dyn PulseInput>,
        delay: Box<dyn Delay>,
        thresholds: RangeThresholds,
    ) -> Self {
        Self {
            trigger,
            echo,
            delay,
            thresholds,
        }
    }

    /// Run one ranging cycle and return the unclamped outcome.
    ///
    /// Blocks for at most `echo_timeout_us` plus the trigger pulse.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::HardwareFault`] when the trigger or echo line
    /// cannot be driven or read.
    pub fn read(&mut self) -> Result<RangeReading, SensorError> {
        self.trigger.set_low()?;
        self.delay.delay_us(TRIGGER_SETTLE_US);
        self.trigger.set_high()?;
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.trigger.set_low()?;

        let timeout = Duration::from_micros(u64::from(self.thresholds.echo_timeout_us));
        let duration = self.echo.pulse_width(Level::High, timeout)?;
        let reading = interpret_echo(duration, self.thresholds.max_distance_cm);
        debug!(echo_us = ?duration, ?reading, "range reading");
        Ok(reading)
    }

    /// Distance in centimetres, in `[0, max_distance_cm]`.
    ///
    /// Never fails: no echo, out-of-range and hardware faults all report
    /// `max_distance_cm`.
    pub fn measure_distance(&mut self) -> f32 {
        let max = self.thresholds.max_distance_cm;
        match self.read() {
            Ok(reading) => reading.distance_or(max),
            Err(e) => {
                warn!(error = %e, "range sensor fault; reporting max distance");
                max
            }
        }
    }

    /// `true` when something is closer than `obstacle_distance_cm`.
    pub fn detect_obstacle(&mut self) -> bool {
        let distance = self.measure_distance();
        is_within(distance, self.thresholds.obstacle_distance_cm)
    }

    /// `true` when something is closer than `ramp_distance_cm`.
    pub fn detect_ramp(&mut self) -> bool {
        let distance = self.measure_distance();
        is_within(distance, self.thresholds.ramp_distance_cm)
    }
}

//! Two-sensor line position resolver.
//!
//! Each reflectance sensor is compared against one shared threshold; a
//! reading below it is dark, i.e. on the line. The pair maps to an offset:
//!
//! | left on | right on | offset |
//! |---|---|---|
//! | yes | no | `Left` |
//! | no | yes | `Right` |
//! | yes | yes | `Center` |
//! | no | no | `Center` |
//!
//! Losing the line entirely keeps the robot going straight. There is no
//! hysteresis, so readings near the threshold may flicker between calls.

use rover_hal::AnalogInput;
use rover_types::{LineOffset, SensorError, Surface};
use tracing::{debug, warn};

use crate::calibration::LineThresholds;

pub fn is_on_line(value: u16, threshold: u16) -> bool {
    value < threshold
}

pub fn resolve_offset(left_on_line: bool, right_on_line: bool) -> LineOffset {
    match (left_on_line, right_on_line) {
        (true, false) => LineOffset::Left,
        (false, true) => LineOffset::Right,
        (true, true) | (false, false) => LineOffset::Center,
    }
}

/// Classify a single reading against the dark/light calibration bounds.
pub fn classify_surface(value: u16, thresholds: &LineThresholds) -> Surface {
    if value <= thresholds.black_max {
        Surface::Dark
    } else if value >= thresholds.white_min {
        Surface::Light
    } else {
        Surface::Ambiguous
    }
}

/// Left/right reflectance pair.
pub struct LineSensor {
    left: Box<dyn AnalogInput>,
    right: Box<dyn AnalogInput>,
    thresholds: LineThresholds,
}

impl LineSensor {
    pub fn new(
        left: Box<dyn AnalogInput>,
        right: Box<dyn AnalogInput>,
        thresholds: LineThresholds,
    ) -> Self {
        Self {
            left,
            right,
            thresholds,
        }
    }

    /// Raw `(left, right)` ADC counts.
    pub fn read_raw(&mut self) -> Result<(u16, u16), SensorError> {
        let left = self.left.read()?;
        let right = self.right.read()?;
        Ok((left, right))
    }

    /// Offset for an already-sampled pair.
    pub fn offset_for(&self, left: u16, right: u16) -> LineOffset {
        let threshold = self.thresholds.threshold;
        resolve_offset(is_on_line(left, threshold), is_on_line(right, threshold))
    }

    /// Sample both sensors and resolve the offset.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::HardwareFault`] if either channel fails.
    pub fn read_offset(&mut self) -> Result<LineOffset, SensorError> {
        let (left, right) = self.read_raw()?;
        let offset = self.offset_for(left, right);
        debug!(left, right, ?offset, "line reading");
        Ok(offset)
    }

    /// Never fails: a hardware fault is treated like a lost line and
    /// reports `Center`.
    pub fn resolve_line_position(&mut self) -> LineOffset {
        self.read_offset().unwrap_or_else(|e| {
            warn!(error = %e, "line sensor fault; reporting center");
            LineOffset::Center
        })
    }

    /// Surface tone under each sensor.
    pub fn surfaces(&mut self) -> Result<(Surface, Surface), SensorError> {
        let (left, right) = self.read_raw()?;
        Ok((
            classify_surface(left, &self.thresholds),
            classify_surface(right, &self.thresholds),
        ))
    }
}

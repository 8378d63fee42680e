//! Filtered-light colour classifier.
//!
//! The sensor is a light-to-frequency converter behind a switchable
//! red/green/blue filter array. One sample is acquired by selecting each
//! filter in turn, waiting for the output to settle, and timing one LOW pulse.
//! The three widths share a single output line, so channel reads are strictly
//! sequential.
//!
//! Classification tests the sample against each calibrated colour range in
//! the fixed order Black, Green, Red, Blue, White and returns the first full
//! match. Hand-tuned ranges can overlap at the edges; the fixed order keeps
//! the result reproducible.
//!
//! # Example
//!
//! ```rust
//! use rover_perception::calibration::ColorCalibration;
//! use rover_perception::color::classify;
//! use rover_types::{ColorCategory, ColorSample};
//!
//! let cal = ColorCalibration::default();
//! assert_eq!(classify(&ColorSample::new(30, 30, 30), &cal), ColorCategory::Black);
//! assert_eq!(classify(&ColorSample::new(999, 999, 999), &cal), ColorCategory::Unknown);
//! ```

use std::time::Duration;

use rover_hal::{Delay, OutputPin, PulseInput};
use rover_types::{ColorCategory, ColorSample, FilterChannel, FrequencyScaling, Level, SensorError};
use tracing::{debug, warn};

use crate::calibration::ColorCalibration;

/// First colour in priority order whose range contains `sample`, or
/// `Unknown`.
pub fn classify(sample: &ColorSample, calibration: &ColorCalibration) -> ColorCategory {
    ColorCategory::PRIORITY
        .into_iter()
        .find(|&category| {
            calibration
                .range(category)
                .is_some_and(|range| range.matches(sample))
        })
        .unwrap_or(ColorCategory::Unknown)
}

/// Pins of a four-select colour sensor.
pub struct ColorSensorPins {
    pub s0: Box<dyn OutputPin>,
    pub s1: Box<dyn OutputPin>,
    pub s2: Box<dyn OutputPin>,
    pub s3: Box<dyn OutputPin>,
    pub out: Box<dyn PulseInput>,
}

/// Light-to-frequency colour sensor driver.
pub struct ColorSensor {
    s0: Box<dyn OutputPin>,
    s1: Box<dyn OutputPin>,
    s2: Box<dyn OutputPin>,
    s3: Box<dyn OutputPin>,
    out: Box<dyn PulseInput>,
    delay: Box<dyn Delay>,
    calibration: ColorCalibration,
}

impl ColorSensor {
    pub fn new(
        pins: ColorSensorPins,
        delay: Box<dyn Delay>,
        calibration: ColorCalibration,
    ) -> Self {
        Self {
            s0: pins.s0,
            s1: pins.s1,
            s2: pins.s2,
            s3: pins.s3,
            out: pins.out,
            delay,
            calibration,
        }
    }

    /// Drive the `S0`/`S1` pins for `scaling`.
    pub fn set_scaling(&mut self, scaling: FrequencyScaling) -> Result<(), SensorError> {
        let (s0, s1) = scaling.select_levels();
        self.s0.set_level(s0)?;
        self.s1.set_level(s1)?;
        debug!(?scaling, "color sensor scaling set");
        Ok(())
    }

    /// Drive the `S2`/`S3` pins for `channel`. Does not wait for settling.
    pub fn select_filter(&mut self, channel: FilterChannel) -> Result<(), SensorError> {
        let (s2, s3) = channel.select_levels();
        self.s2.set_level(s2)?;
        self.s3.set_level(s3)?;
        Ok(())
    }

    /// Select `channel`, wait for the filter to settle, and time one pulse.
    ///
    /// Returns `Ok(None)` when the pulse wait times out.
    pub fn read_channel(&mut self, channel: FilterChannel) -> Result<Option<u32>, SensorError> {
        self.select_filter(channel)?;
        self.delay.delay_ms(self.calibration.filter_settle_ms);
        let timeout = Duration::from_micros(u64::from(self.calibration.pulse_timeout_us));
        self.out.pulse_width(Level::Low, timeout)
    }

    /// Acquire one sample, red then green then blue.
    ///
    /// Returns `Ok(None)` as soon as any channel times out.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::HardwareFault`] when a select pin or the
    /// output line fails.
    pub fn read_sample(&mut self) -> Result<Option<ColorSample>, SensorError> {
        let mut widths = [0u32; 3];
        for (slot, channel) in widths.iter_mut().zip(FilterChannel::SEQUENCE) {
            match self.read_channel(channel)? {
                Some(w) => *slot = w,
                None => {
                    debug!(?channel, "color channel timed out");
                    return Ok(None);
                }
            }
        }
        let [red, green, blue] = widths;
        Ok(Some(ColorSample::new(red, green, blue)))
    }

    /// Acquire a sample and classify it, keeping the raw sample.
    pub fn sample_and_classify(&mut self) -> (Option<ColorSample>, ColorCategory) {
        match self.read_sample() {
            Ok(Some(sample)) => {
                let category = classify(&sample, &self.calibration);
                debug!(?sample, %category, "color reading");
                (Some(sample), category)
            }
            Ok(None) => (None, ColorCategory::Unknown),
            Err(e) => {
                warn!(error = %e, "color sensor fault; reporting unknown");
                (None, ColorCategory::Unknown)
            }
        }
    }

    /// Never fails: timeouts and hardware faults report `Unknown`.
    pub fn classify_color(&mut self) -> ColorCategory {
        self.sample_and_classify().1
    }
}

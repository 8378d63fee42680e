//! Generic `AnalogInput` trait for ADC channels such as reflectance sensors.

use rover_types::SensorError;

/// A single ADC channel.
///
/// The raw value range depends on the converter (10-bit on AVR boards,
/// 12-bit on ESP32). Callers compare it against calibrated thresholds and
/// never scale it.
pub trait AnalogInput: Send + Sync {
    /// Stable identifier for this channel, e.g. `"ir_left"`.
    fn id(&self) -> &str;

    /// Sample the channel once.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::HardwareFault`] if the conversion fails.
    fn read(&mut self) -> Result<u16, SensorError>;
}

//! Generic `OutputPin` trait for digital outputs (trigger lines, filter and
//! scaling selects, …).

use rover_types::{Level, SensorError};

/// A push-pull digital output.
///
/// Sensor drivers in `rover-perception` only ever talk to this trait, so the
/// same classification code runs against real GPIO or the simulated board.
pub trait OutputPin: Send + Sync {
    /// Stable identifier for this pin, e.g. `"ultrasonic_trig"`.
    fn id(&self) -> &str;

    /// Drive the pin to `level`.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::HardwareFault`] if the level cannot be applied.
    fn set_level(&mut self, level: Level) -> Result<(), SensorError>;

    /// Return the level most recently driven on this pin.
    fn level(&self) -> Level;

    fn set_low(&mut self) -> Result<(), SensorError> {
        self.set_level(Level::Low)
    }

    fn set_high(&mut self) -> Result<(), SensorError> {
        self.set_level(Level::High)
    }
}

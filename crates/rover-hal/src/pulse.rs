//! Generic `PulseInput` trait for inputs whose information is carried in the
//! width of a pulse (ultrasonic echo, light-to-frequency output).

use std::time::Duration;

use rover_types::{Level, SensorError};

/// A digital input that can time a single pulse.
pub trait PulseInput: Send + Sync {
    /// Stable identifier for this input, e.g. `"ultrasonic_echo"`.
    fn id(&self) -> &str;

    /// Wait for the next pulse at `level` and return its width in
    /// microseconds.
    ///
    /// Blocks for at most `timeout`. Returns `Ok(None)` when no complete pulse
    /// was observed within the window.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::HardwareFault`] if the input cannot be read at
    /// all (as opposed to simply seeing no pulse).
    fn pulse_width(
        &mut self,
        level: Level,
        timeout: Duration,
    ) -> Result<Option<u32>, SensorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPulse {
        id: String,
        width_us: u32,
    }

    impl PulseInput for FixedPulse {
        fn id(&self) -> &str {
            &self.id
        }

        fn pulse_width(
            &mut self,
            _level: Level,
            timeout: Duration,
        ) -> Result<Option<u32>, SensorError> {
            if u128::from(self.width_us) > timeout.as_micros() {
                return Ok(None);
            }
            Ok(Some(self.width_us))
        }
    }

    #[test]
    fn mock_pulse_respects_timeout() {
        let mut input = FixedPulse {
            id: "echo".to_string(),
            width_us: 500,
        };
        assert_eq!(input.id(), "echo");
        assert_eq!(
            input.pulse_width(Level::High, Duration::from_millis(1)).unwrap(),
            Some(500)
        );
        assert_eq!(
            input.pulse_width(Level::High, Duration::from_micros(100)).unwrap(),
            None
        );
    }
}

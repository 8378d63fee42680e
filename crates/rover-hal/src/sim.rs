//! In-process simulated board for tests and bench runs without hardware.
//!
//! [`SimBoard`] owns a shared model of every pin on the board. It hands out
//! boxed drivers that implement the HAL traits against that model, and keeps
//! a handle so tests can script sensor values and inspect what the drivers
//! did (pin writes in order, virtual time spent in delays).
//!
//! The colour sensor output follows the real device: it produces LOW pulses
//! only while powered (`S0`/`S1` not both low) and reports the channel picked
//! by the current `S2`/`S3` levels.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use rover_hal::sim::SimBoard;
//! use rover_hal::{OutputPin, PulseInput};
//! use rover_types::Level;
//!
//! let board = SimBoard::new();
//! let mut trig = board.output_pin("trig");
//! let mut echo = board.echo_input("echo");
//!
//! board.set_echo_us(Some(882));
//! trig.set_high().unwrap();
//! assert_eq!(board.level("trig"), Some(Level::High));
//! assert_eq!(
//!     echo.pulse_width(Level::High, Duration::from_millis(30)).unwrap(),
//!     Some(882)
//! );
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rover_types::{ColorSample, Level, SensorError};
use tracing::trace;

use crate::analog::AnalogInput;
use crate::delay::Delay;
use crate::output::OutputPin;
use crate::pulse::PulseInput;

// ────────────────────────────────────────────────────────────────────────────
// Shared board model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct BoardState {
    levels: HashMap<String, Level>,
    writes: Vec<(String, Level)>,
    analog: HashMap<String, u16>,
    echo_us: Option<u32>,
    color: Option<ColorSample>,
    faults: HashSet<String>,
    elapsed_us: u64,
}

impl BoardState {
    fn check_fault(&self, id: &str) -> Result<(), SensorError> {
        if self.faults.contains(id) {
            return Err(SensorError::hardware(id, "simulated fault"));
        }
        Ok(())
    }

    fn level(&self, id: &str) -> Level {
        self.levels.get(id).copied().unwrap_or(Level::Low)
    }

    /// Advance the virtual clock by a completed pulse or an expired timeout.
    fn finish_pulse(&mut self, width_us: Option<u32>, timeout: Duration) -> Option<u32> {
        let timeout_us = u64::try_from(timeout.as_micros()).unwrap_or(u64::MAX);
        match width_us {
            Some(w) if u64::from(w) <= timeout_us => {
                self.elapsed_us += u64::from(w);
                Some(w)
            }
            _ => {
                self.elapsed_us = self.elapsed_us.saturating_add(timeout_us);
                None
            }
        }
    }
}

/// Handle to a simulated board. Cloning yields another handle to the same
/// board.
#[derive(Clone, Default)]
pub struct SimBoard {
    state: Arc<Mutex<BoardState>>,
}

impl SimBoard {
    /// Create a board with every pin low, every ADC channel at 0, no echo and
    /// no colour sample.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Driver factories ────────────────────────────────────────────────

    pub fn output_pin(&self, id: impl Into<String>) -> Box<SimOutputPin> {
        Box::new(SimOutputPin {
            id: id.into(),
            board: self.clone(),
        })
    }

    pub fn analog_input(&self, id: impl Into<String>) -> Box<SimAnalogInput> {
        Box::new(SimAnalogInput {
            id: id.into(),
            board: self.clone(),
        })
    }

    /// Ultrasonic echo line. Produces a HIGH pulse of the width set with
    /// [`set_echo_us`][Self::set_echo_us].
    pub fn echo_input(&self, id: impl Into<String>) -> Box<SimEchoInput> {
        Box::new(SimEchoInput {
            id: id.into(),
            board: self.clone(),
        })
    }

    /// Colour sensor output line, gated by the named scaling (`S0`, `S1`) and
    /// filter-select (`S2`, `S3`) pins.
    pub fn color_output(
        &self,
        id: impl Into<String>,
        scaling_pins: (&str, &str),
        filter_pins: (&str, &str),
    ) -> Box<SimColorOutput> {
        Box::new(SimColorOutput {
            id: id.into(),
            s0: scaling_pins.0.to_string(),
            s1: scaling_pins.1.to_string(),
            s2: filter_pins.0.to_string(),
            s3: filter_pins.1.to_string(),
            board: self.clone(),
        })
    }

    pub fn delay(&self) -> Box<SimDelay> {
        Box::new(SimDelay { board: self.clone() })
    }

    // ── Scripting ───────────────────────────────────────────────────────

    /// Set the echo width returned on the next ranging cycle. `None` means no
    /// echo arrives.
    pub fn set_echo_us(&self, width_us: Option<u32>) {
        self.lock().echo_us = width_us;
    }

    pub fn set_analog(&self, id: &str, value: u16) {
        self.lock().analog.insert(id.to_string(), value);
    }

    /// Set the per-channel pulse widths the colour sensor reports. `None`
    /// means the sensor never pulses.
    pub fn set_color_sample(&self, sample: Option<ColorSample>) {
        self.lock().color = sample;
    }

    /// Make every operation on `id` fail with a hardware fault.
    pub fn inject_fault(&self, id: &str) {
        self.lock().faults.insert(id.to_string());
    }

    pub fn clear_fault(&self, id: &str) {
        self.lock().faults.remove(id);
    }

    // ── Inspection ──────────────────────────────────────────────────────

    /// Current level of an output pin, or `None` if it was never driven.
    pub fn level(&self, id: &str) -> Option<Level> {
        self.lock().levels.get(id).copied()
    }

    /// Every pin write since creation (or the last
    /// [`clear_writes`][Self::clear_writes]), in order.
    pub fn writes(&self) -> Vec<(String, Level)> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Virtual time spent in delays and pulse waits.
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.lock().elapsed_us)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub drivers
// ────────────────────────────────────────────────────────────────────────────

/// A simulated digital output that records every write on its board.
pub struct SimOutputPin {
    id: String,
    board: SimBoard,
}

impl OutputPin for SimOutputPin {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_level(&mut self, level: Level) -> Result<(), SensorError> {
        let mut state = self.board.lock();
        state.check_fault(&self.id)?;
        trace!(pin = %self.id, ?level, "sim pin write");
        state.levels.insert(self.id.clone(), level);
        state.writes.push((self.id.clone(), level));
        Ok(())
    }

    fn level(&self) -> Level {
        self.board.lock().level(&self.id)
    }
}

/// A simulated ADC channel returning the value last set on its board.
pub struct SimAnalogInput {
    id: String,
    board: SimBoard,
}

impl AnalogInput for SimAnalogInput {
    fn id(&self) -> &str {
        &self.id
    }

    fn read(&mut self) -> Result<u16, SensorError> {
        let state = self.board.lock();
        state.check_fault(&self.id)?;
        Ok(state.analog.get(&self.id).copied().unwrap_or(0))
    }
}

/// A simulated ultrasonic echo line.
pub struct SimEchoInput {
    id: String,
    board: SimBoard,
}

impl PulseInput for SimEchoInput {
    fn id(&self) -> &str {
        &self.id
    }

    fn pulse_width(&mut self, level: Level, timeout: Duration) -> Result<Option<u32>, SensorError> {
        let mut state = self.board.lock();
        state.check_fault(&self.id)?;
        let width = match level {
            Level::High => state.echo_us,
            Level::Low => None,
        };
        Ok(state.finish_pulse(width, timeout))
    }
}

/// A simulated light-to-frequency colour sensor output.
pub struct SimColorOutput {
    id: String,
    s0: String,
    s1: String,
    s2: String,
    s3: String,
    board: SimBoard,
}

impl PulseInput for SimColorOutput {
    fn id(&self) -> &str {
        &self.id
    }

    fn pulse_width(&mut self, level: Level, timeout: Duration) -> Result<Option<u32>, SensorError> {
        let mut state = self.board.lock();
        state.check_fault(&self.id)?;

        let powered = (state.level(&self.s0), state.level(&self.s1)) != (Level::Low, Level::Low);
        let width = match (level, state.color) {
            (Level::Low, Some(sample)) if powered => {
                match (state.level(&self.s2), state.level(&self.s3)) {
                    (Level::Low, Level::Low) => Some(sample.red),
                    (Level::High, Level::High) => Some(sample.green),
                    (Level::Low, Level::High) => Some(sample.blue),
                    // Clear (unfiltered) photodiodes are not modelled.
                    (Level::High, Level::Low) => None,
                }
            }
            _ => None,
        };
        Ok(state.finish_pulse(width, timeout))
    }
}

/// A simulated delay that advances the board's virtual clock instead of
/// sleeping.
pub struct SimDelay {
    board: SimBoard,
}

impl Delay for SimDelay {
    fn delay_us(&mut self, us: u32) {
        self.board.lock().elapsed_us += u64::from(us);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

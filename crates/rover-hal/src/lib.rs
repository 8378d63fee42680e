//! `rover-hal` – hardware-access capabilities for the perception layer.
//!
//! Sensor drivers never touch GPIO directly. They hold boxed trait objects
//! for the few capabilities they need, which keeps the classification logic
//! testable on any host.
//!
//! # Modules
//!
//! - [`output`] – [`OutputPin`]: drive one digital output.
//! - [`pulse`] – [`PulseInput`]: time one pulse with a bounded wait.
//! - [`analog`] – [`AnalogInput`]: sample one ADC channel.
//! - [`delay`] – [`Delay`]: block for a fixed time; [`StdDelay`] sleeps the
//!   thread.
//! - [`sim`] – [`SimBoard`][sim::SimBoard]: scripted in-process board for
//!   headless tests and the bench console.

pub mod analog;
pub mod delay;
pub mod output;
pub mod pulse;
pub mod sim;

pub use analog::AnalogInput;
pub use delay::{Delay, StdDelay};
pub use output::OutputPin;
pub use pulse::PulseInput;

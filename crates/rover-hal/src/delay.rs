//! Blocking delay capability.

use std::time::Duration;

/// A blocking delay source.
///
/// Sensor drivers use this for trigger pulse shaping and filter settling.
/// [`StdDelay`] sleeps the calling thread; the simulated board advances a
/// virtual clock instead.
pub trait Delay: Send + Sync {
    fn delay_us(&mut self, us: u32);

    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1_000));
    }
}

/// [`Delay`] backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(us)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct CountingDelay {
        total_us: u64,
    }

    impl Delay for CountingDelay {
        fn delay_us(&mut self, us: u32) {
            self.total_us += u64::from(us);
        }
    }

    #[test]
    fn delay_ms_converts_to_microseconds() {
        let mut d = CountingDelay { total_us: 0 };
        d.delay_ms(10);
        d.delay_us(2);
        assert_eq!(d.total_us, 10_002);
    }

    #[test]
    fn std_delay_blocks_at_least_requested_time() {
        let mut d = StdDelay;
        let start = Instant::now();
        d.delay_ms(2);
        assert!(start.elapsed() >= Duration::from_millis(2));
    }
}

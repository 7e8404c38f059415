//! Emission scheduler: the simulation clock that drives the ring.

use std::ops::Range;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::EmissionConfig;
use crate::error::InvalidInputError;
use crate::ring::SlotRing;

/// Clock value past which the time origin is moved forward.
///
/// Keeps the clock and every emission time small enough that f32 still
/// resolves sub-millisecond steps.
pub const REBASE_AFTER: f64 = 256.0;

/// Owns the simulation clock and the slot ring it drives.
///
/// One [`tick`](Self::tick) per frame moves the clock forward and recycles
/// expired slots. Nothing else mutates the ring, so any snapshot taken after
/// `tick` returns sees a fully advanced state.
///
/// Time is accumulated in f64. Once the clock passes [`REBASE_AFTER`] it is
/// reduced by a whole number of lifetimes, along with every emission time, so
/// [`clock`](Self::clock) stays small while [`elapsed`](Self::elapsed) keeps
/// counting.
///
/// ```
/// use ringfx::{EmissionConfig, EmissionScheduler};
///
/// let config = EmissionConfig::new(1000.0, 2.0).unwrap();
/// let mut scheduler = EmissionScheduler::with_seed(config, 1);
///
/// scheduler.tick(0.5).unwrap();
/// assert_eq!(scheduler.visible_count(), 500);
/// assert!(scheduler.tick(-0.01).is_err());
/// assert_eq!(scheduler.clock(), 0.5);
/// ```
#[derive(Debug)]
pub struct EmissionScheduler<R = SmallRng> {
    ring: SlotRing<R>,
    clock: f64,
    elapsed: f64,
}

impl EmissionScheduler<SmallRng> {
    /// Scheduler with a seeded [`SmallRng`], for reproducible runs.
    pub fn with_seed(config: EmissionConfig, seed: u64) -> Self {
        Self::new(config, SmallRng::seed_from_u64(seed))
    }
}

impl<R: Rng> EmissionScheduler<R> {
    /// Allocate the ring and start the clock at zero.
    pub fn new(config: EmissionConfig, rng: R) -> Self {
        Self {
            ring: SlotRing::new(config, rng),
            clock: 0.0,
            elapsed: 0.0,
        }
    }

    /// Advance the clock by `delta_time` seconds and recycle expired slots.
    ///
    /// A negative or non-finite delta is rejected; the clock and ring are left
    /// exactly as they were.
    pub fn tick(&mut self, delta_time: f32) -> Result<u32, InvalidInputError> {
        if !(delta_time >= 0.0) || !delta_time.is_finite() {
            return Err(InvalidInputError::NegativeDelta(delta_time));
        }
        self.clock += f64::from(delta_time);
        self.elapsed += f64::from(delta_time);
        if self.clock >= REBASE_AFTER {
            self.rebase();
        }
        Ok(self.ring.advance(self.clock as f32))
    }

    fn rebase(&mut self) {
        let life = f64::from(self.ring.config().life_duration());
        let shift = (self.clock / life).floor() * life;
        if shift > 0.0 {
            self.clock = (self.clock - shift).max(0.0);
            self.ring.rebase(shift);
            log::trace!("rebased clock by {}s to {}", shift, self.clock);
        }
    }

    /// Start a new configuration epoch.
    ///
    /// The ring is reallocated from `config` and the clock restarts at zero,
    /// so the visible count ramps up again.
    pub fn reconfigure(&mut self, config: EmissionConfig) {
        log::info!(
            "new emission epoch: {} slots, rate {}/s, life {}s",
            config.capacity(),
            config.emit_rate(),
            config.life_duration()
        );
        self.ring.reconfigure(config);
        self.clock = 0.0;
        self.elapsed = 0.0;
    }

    /// Restart the current configuration from time zero.
    pub fn reset(&mut self) {
        let config = *self.ring.config();
        self.reconfigure(config);
    }
}

impl<R> EmissionScheduler<R> {
    /// Current simulation time in seconds, in the same frame as the ring's
    /// emission times.
    #[inline]
    pub fn clock(&self) -> f32 {
        self.clock as f32
    }

    /// Seconds of emission since the epoch started.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Number of instances to draw this frame.
    #[inline]
    pub fn visible_count(&self) -> u32 {
        self.ring.visible_count(self.elapsed)
    }

    /// Slots to draw this frame; see [`SlotRing::visible_range`].
    #[inline]
    pub fn visible_range(&self) -> Range<u32> {
        self.ring.visible_range(self.elapsed)
    }

    /// The ring driven by this scheduler.
    #[inline]
    pub fn ring(&self) -> &SlotRing<R> {
        &self.ring
    }

    /// The active configuration.
    #[inline]
    pub fn config(&self) -> &EmissionConfig {
        self.ring.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(rate: f32, life: f32) -> EmissionScheduler {
        EmissionScheduler::with_seed(EmissionConfig::new(rate, life).unwrap(), 9)
    }

    #[test]
    fn test_tick_advances_clock() {
        let mut s = scheduler(10.0, 1.0);
        s.tick(0.25).unwrap();
        s.tick(0.25).unwrap();
        assert_eq!(s.clock(), 0.5);
        assert_eq!(s.elapsed(), 0.5);
    }

    #[test]
    fn test_zero_delta_is_allowed() {
        let mut s = scheduler(10.0, 1.0);
        s.tick(0.0).unwrap();
        assert_eq!(s.clock(), 0.0);
    }

    #[test]
    fn test_negative_delta_rejected() {
        let mut s = scheduler(10.0, 1.0);
        s.tick(0.3).unwrap();
        let before = s.ring().slots().to_vec();

        assert_eq!(s.tick(-0.01), Err(InvalidInputError::NegativeDelta(-0.01)));
        assert_eq!(s.clock(), 0.3);
        assert_eq!(s.ring().slots(), before.as_slice());
    }

    #[test]
    fn test_non_finite_delta_rejected() {
        let mut s = scheduler(10.0, 1.0);
        assert!(s.tick(f32::NAN).is_err());
        assert!(s.tick(f32::INFINITY).is_err());
        assert_eq!(s.clock(), 0.0);
    }

    #[test]
    fn test_tick_advances_ring() {
        let mut s = scheduler(10.0, 1.0);
        s.tick(0.55).unwrap();
        for slot in s.ring().slots() {
            assert!(slot.age(s.clock()) < 1.0);
        }
    }

    #[test]
    fn test_visible_count_ramps() {
        let mut s = scheduler(1000.0, 2.0);
        assert_eq!(s.visible_count(), 0);
        s.tick(0.5).unwrap();
        assert_eq!(s.visible_count(), 500);
        for _ in 0..9 {
            s.tick(0.5).unwrap();
        }
        assert_eq!(s.visible_count(), 2000);
    }

    #[test]
    fn test_clock_keeps_moving_after_long_run() {
        let mut s = scheduler(100.0, 2.0);
        s.tick(1.0e6).unwrap();
        assert!(f64::from(s.clock()) < REBASE_AFTER);

        for _ in 0..600 {
            let before = s.clock();
            s.tick(1.0 / 60.0).unwrap();
            assert!(s.clock() > before, "clock stuck at {}", before);
            for slot in s.ring().slots() {
                let age = slot.age(s.clock());
                assert!((0.0..2.0).contains(&age), "slot {} age {}", slot.index(), age);
            }
        }
        assert!((s.elapsed() - (1.0e6 + 10.0)).abs() < 1e-3);
        assert_eq!(s.visible_count(), 200);
    }

    #[test]
    fn test_rebase_preserves_phase() {
        let mut s = scheduler(30.0, 0.7);
        for _ in 0..600 {
            s.tick(0.5).unwrap();
        }
        assert_eq!(s.elapsed(), 300.0);
        assert!(s.clock() < 50.0);

        // Same slots advanced straight to t=300 without any rebase.
        let mut reference = SlotRing::new(*s.config(), SmallRng::seed_from_u64(0));
        reference.advance(300.0);
        for (x, y) in s.ring().slots().iter().zip(reference.slots()) {
            let drift = (x.age(s.clock()) - y.age(300.0)).rem_euclid(0.7);
            assert!(drift < 5e-3 || drift > 0.7 - 5e-3, "slot {} drift {}", x.index(), drift);
        }
    }

    #[test]
    fn test_reconfigure_restarts_epoch() {
        let mut s = scheduler(10.0, 1.0);
        s.tick(3.0).unwrap();
        s.reconfigure(EmissionConfig::new(20.0, 0.5).unwrap());
        assert_eq!(s.clock(), 0.0);
        assert_eq!(s.visible_count(), 0);
        assert_eq!(s.ring().capacity(), 10);
        assert!((s.ring().slot(0).unwrap().emission_time() + 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_reset_keeps_config() {
        let mut s = scheduler(10.0, 1.0);
        let config = *s.config();
        s.tick(7.5).unwrap();
        s.reset();
        assert_eq!(s.clock(), 0.0);
        assert_eq!(s.config(), &config);
    }

    #[test]
    fn test_same_seed_same_schedule() {
        let mut a = scheduler(200.0, 1.3);
        let mut b = scheduler(200.0, 1.3);
        for dt in [0.016, 0.017, 0.5, 0.016, 2.0] {
            assert_eq!(a.tick(dt).unwrap(), b.tick(dt).unwrap());
        }
        assert_eq!(a.ring().slots(), b.ring().slots());
    }
}

//! Fixed-capacity particle slot ring.
//!
//! The ring owns one [`ParticleSlot`] per simultaneously-alive particle. Slots
//! are allocated once from an [`EmissionConfig`] and reused forever: when a
//! slot's particle outlives `life_duration`, [`SlotRing::advance`] rolls its
//! emission time forward by whole lifetimes, which retires the old particle and
//! emits its replacement in the same step.
//!
//! # Staggering
//!
//! Slot `i` starts with `emission_time = -(i + 1) / emit_rate`, so particles
//! come due one after another at the emission rate instead of all at once.
//!
//! | `emit_rate` | slot 0 | slot 1 | slot 9 |
//! |-------------|--------|--------|--------|
//! | 10          | -0.1   | -0.2   | -1.0   |
//!
//! The highest slot comes due first and slot 0 last, so during ramp-up the
//! emitted particles are the tail of the ring; see [`SlotRing::visible_range`].
//!
//! # Example
//!
//! ```
//! use rand::{rngs::SmallRng, SeedableRng};
//! use ringfx::{EmissionConfig, SlotRing};
//!
//! let config = EmissionConfig::new(10.0, 1.0).unwrap();
//! let mut ring = SlotRing::new(config, SmallRng::seed_from_u64(7));
//!
//! ring.advance(0.35);
//! assert_eq!(ring.capacity(), 10);
//! assert_eq!(ring.visible_count(0.35), 3);
//! assert_eq!(ring.visible_range(0.35), 7..10);
//! ```

use std::ops::Range;

use rand::rngs::SmallRng;
use rand::Rng;

use crate::config::EmissionConfig;

/// One addressable position in the ring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleSlot {
    slot_index: u32,
    emission_time: f32,
    random_seed: f32,
}

impl ParticleSlot {
    /// Position of this slot in the ring. Never reassigned.
    #[inline]
    pub fn index(&self) -> u32 {
        self.slot_index
    }

    /// Clock time at which the slot's current particle was emitted.
    ///
    /// Negative until the slot's first emission comes due.
    #[inline]
    pub fn emission_time(&self) -> f32 {
        self.emission_time
    }

    /// Per-emission variation seed in `[0, 1)`.
    #[inline]
    pub fn random_seed(&self) -> f32 {
        self.random_seed
    }

    /// Seconds since the current emission.
    #[inline]
    pub fn age(&self, current_time: f32) -> f32 {
        current_time - self.emission_time
    }
}

/// Fixed-capacity collection of particle slots.
///
/// The slot storage is a boxed slice sized from
/// [`EmissionConfig::capacity`]; nothing in the ring can grow or shrink it.
/// The only way to change the slot count is [`SlotRing::reconfigure`], which
/// replaces the storage wholesale.
///
/// Seeds come from the injected generator `R`, so a seeded generator gives a
/// reproducible sequence.
#[derive(Debug)]
pub struct SlotRing<R = SmallRng> {
    config: EmissionConfig,
    slots: Box<[ParticleSlot]>,
    rng: R,
}

impl<R: Rng> SlotRing<R> {
    /// Allocate `config.capacity()` slots with staggered emission times.
    ///
    /// The config has already been validated, so this cannot fail.
    pub fn new(config: EmissionConfig, mut rng: R) -> Self {
        let slots = allocate_slots(&config, &mut rng);
        log::debug!(
            "allocated {} particle slots (rate {}/s, life {}s)",
            slots.len(),
            config.emit_rate(),
            config.life_duration()
        );
        Self { config, slots, rng }
    }

    /// Replace the configuration, discarding every slot.
    ///
    /// The new ring is laid out exactly as [`SlotRing::new`] would lay it out;
    /// no state carries over except the random generator.
    pub fn reconfigure(&mut self, config: EmissionConfig) {
        self.slots = allocate_slots(&config, &mut self.rng);
        self.config = config;
        log::debug!("reconfigured ring to {} slots", self.slots.len());
    }

    /// Recycle every slot whose particle has lived at least one lifetime.
    ///
    /// A recycled slot's emission time moves forward by whole multiples of
    /// `life_duration` (so its age lands in `[0, life_duration)`) and its seed
    /// is redrawn. Slots still inside their lifetime are untouched, which
    /// makes a second call with the same `current_time` a no-op.
    ///
    /// Returns the number of slots recycled.
    pub fn advance(&mut self, current_time: f32) -> u32 {
        let life = self.config.life_duration();
        let now = f64::from(current_time);
        let mut recycled = 0;

        for slot in self.slots.iter_mut() {
            let elapsed = now - f64::from(slot.emission_time);
            if elapsed >= f64::from(life) {
                // Never later than `current_time`: `now` is an f32 value and the
                // remainder is non-negative.
                let mut emission = (now - elapsed % f64::from(life)) as f32;
                // Rounding to f32 can land the age back on a full lifetime.
                if current_time - emission >= life {
                    emission = current_time;
                }
                slot.emission_time = emission;
                slot.random_seed = self.rng.gen();
                recycled += 1;
            }
        }

        if recycled > 0 {
            log::trace!("recycled {} slots at t={}", recycled, current_time);
        }
        recycled
    }
}

impl<R> SlotRing<R> {
    /// Move the time origin forward by `shift` seconds.
    ///
    /// Every emission time is reduced by `shift`, so ages measured against a
    /// clock reduced by the same amount are unchanged. `shift` should be a
    /// whole number of lifetimes. Slots more than two lifetimes overdue are
    /// moved forward by whole lifetimes into `(-2 * life, -life]`; they keep
    /// their phase and are still recycled by the next [`advance`](SlotRing::advance)
    /// at any non-negative time.
    pub fn rebase(&mut self, shift: f64) {
        let life = f64::from(self.config.life_duration());
        for slot in self.slots.iter_mut() {
            let mut emission = f64::from(slot.emission_time) - shift;
            if emission < -2.0 * life {
                emission += ((-emission / life).floor() - 1.0) * life;
            }
            slot.emission_time = emission as f32;
        }
    }

    /// Number of particles to draw after `total_elapsed` seconds of emission.
    ///
    /// Ramps up as `floor(total_elapsed * emit_rate)` until the ring is fully
    /// populated, then stays at capacity.
    pub fn visible_count(&self, total_elapsed: f64) -> u32 {
        if !(total_elapsed > 0.0) {
            return 0;
        }
        let emitted = (total_elapsed * f64::from(self.config.emit_rate())).floor();
        emitted.min(f64::from(self.capacity())) as u32
    }

    /// Slots to draw after `total_elapsed` seconds of emission.
    ///
    /// Always the last [`visible_count`](SlotRing::visible_count) slots: the
    /// stagger makes slot `capacity - 1` the first to be emitted and slot 0
    /// the last, so the tail holds exactly the particles emitted this epoch.
    pub fn visible_range(&self, total_elapsed: f64) -> Range<u32> {
        let capacity = self.capacity();
        capacity - self.visible_count(total_elapsed)..capacity
    }

    /// The configuration this ring was allocated from.
    #[inline]
    pub fn config(&self) -> &EmissionConfig {
        &self.config
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Slot `index`, if it exists.
    #[inline]
    pub fn slot(&self, index: u32) -> Option<&ParticleSlot> {
        self.slots.get(index as usize)
    }

    /// All slots in slot-index order.
    #[inline]
    pub fn slots(&self) -> &[ParticleSlot] {
        &self.slots
    }
}

fn allocate_slots<R: Rng>(config: &EmissionConfig, rng: &mut R) -> Box<[ParticleSlot]> {
    let rate = config.emit_rate();
    (0..config.capacity())
        .map(|slot_index| ParticleSlot {
            slot_index,
            emission_time: -((slot_index + 1) as f32) / rate,
            random_seed: rng.gen(),
        })
        .collect()
}

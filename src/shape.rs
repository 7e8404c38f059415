//! Time-parameterized particle state.
//!
//! A particle's whole visual state is a pure function of its normalized age
//! `t`, its slot index and its seed. Nothing is integrated frame to frame, so
//! the same function can run once per instance in a vertex shader, or on the
//! CPU for headless use, and give the same answer regardless of order.
//!
//! # Motions
//!
//! | Motion | Description |
//! |--------|-------------|
//! | [`Motion::Fall`] | Straight down at constant speed (rain, snow) |
//! | [`Motion::Radial`] | Outward from the origin (bursts, sparks) |
//! | [`Motion::Fountain`] | Parabolic arc up and back down |
//! | [`Motion::Spiral`] | Rising helix |
//!
//! Custom CPU-side shapes are any closure with the [`Shape::evaluate`]
//! signature.

use glam::Vec3;
use rayon::prelude::*;
use std::f32::consts::TAU;

use crate::error::ConfigError;
use crate::stream::InstanceRecord;

/// Largest `f32` below 1.0.
const BELOW_ONE: f32 = 1.0 - f32::EPSILON / 2.0;

/// Golden-ratio conjugate used to decorrelate slot indices.
const GOLDEN: f32 = 0.618_034;

/// Fraction of a lifetime elapsed since `emission_time`, in `[0, 1)`.
///
/// Uses a true modulo, so a clock still behind the emission time (a slot whose
/// staggered first emission has not come due) wraps to the previous cycle
/// rather than clamping to zero.
///
/// `life_duration` must be positive; [`EmissionConfig`](crate::EmissionConfig)
/// guarantees it.
#[inline]
pub fn normalize(current_time: f32, emission_time: f32, life_duration: f32) -> f32 {
    let t = ((current_time - emission_time) / life_duration).rem_euclid(1.0);
    t.min(BELOW_ONE)
}

/// Fully derived look of one particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualState {
    /// Offset from the emitter origin.
    pub offset: Vec3,
    /// RGB color, 0.0-1.0.
    pub color: Vec3,
    /// Opacity, 0.0-1.0.
    pub alpha: f32,
    /// Quad half-size.
    pub scale: f32,
}

/// Read-only constants shared by every instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeConstants {
    /// Quad half-size at birth.
    pub particle_size: f32,
    /// Color at `t = 0`.
    pub start_color: Vec3,
    /// Color at `t = 1`.
    pub end_color: Vec3,
    /// Fade alpha from 1 to 0 over the lifetime.
    pub fade_out: bool,
    /// Shrink scale from `particle_size` to 0 over the lifetime.
    pub shrink_out: bool,
}

impl Default for ShapeConstants {
    fn default() -> Self {
        Self {
            particle_size: crate::config::DEFAULT_PARTICLE_SIZE,
            start_color: Vec3::new(0.7, 0.85, 1.0),
            end_color: Vec3::new(0.2, 0.4, 0.8),
            fade_out: true,
            shrink_out: false,
        }
    }
}

impl ShapeConstants {
    /// Color, alpha and scale at normalized time `t`, shared by every motion.
    pub fn appearance(&self, t: f32) -> (Vec3, f32, f32) {
        let color = self.start_color.lerp(self.end_color, t);
        let alpha = if self.fade_out { 1.0 - t } else { 1.0 };
        let scale = if self.shrink_out {
            self.particle_size * (1.0 - t)
        } else {
            self.particle_size
        };
        (color, alpha, scale)
    }
}

/// The per-instance state function.
///
/// Implementations must be pure: the result may depend only on the arguments.
/// That lets [`evaluate_instances_par`] split instances across threads freely.
pub trait Shape: Sync {
    /// Visual state at normalized time `t` for one slot.
    fn evaluate(
        &self,
        t: f32,
        slot_index: u32,
        random_seed: f32,
        constants: &ShapeConstants,
    ) -> VisualState;
}

impl<F> Shape for F
where
    F: Fn(f32, u32, f32, &ShapeConstants) -> VisualState + Sync,
{
    #[inline]
    fn evaluate(
        &self,
        t: f32,
        slot_index: u32,
        random_seed: f32,
        constants: &ShapeConstants,
    ) -> VisualState {
        self(t, slot_index, random_seed, constants)
    }
}

/// Built-in closed-form motions.
///
/// Each variant evaluates identically on the CPU ([`Shape::evaluate`]) and in
/// the generated vertex shader ([`Motion::to_wgsl`]).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    /// Fall straight down `distance` units over the lifetime.
    ///
    /// Particles are spread across `width` on the X axis by their seed.
    Fall {
        /// Distance travelled over the full lifetime.
        distance: f32,
        /// Horizontal extent of the emission line.
        width: f32,
    },

    /// Fly outward from the origin, reaching `radius` at the end of life.
    Radial {
        /// Distance travelled over the full lifetime.
        radius: f32,
    },

    /// Arc up to `height` at mid-life and back down.
    Fountain {
        /// Apex height, reached at `t = 0.5`.
        height: f32,
        /// Maximum horizontal distance at `t = 1`.
        spread: f32,
    },

    /// Rise along a helix.
    Spiral {
        /// Helix radius.
        radius: f32,
        /// Full turns over the lifetime.
        turns: f32,
        /// Height gained over the lifetime.
        rise: f32,
    },
}

impl Default for Motion {
    fn default() -> Self {
        Motion::Fall {
            distance: 2.0,
            width: 2.0,
        }
    }
}

/// `x - floor(x)`, matching WGSL `fract`.
#[inline]
fn fract(x: f32) -> f32 {
    x - x.floor()
}

impl Motion {
    /// Reject NaN or infinite parameters, which cannot be written as WGSL
    /// literals.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let params = match *self {
            Motion::Fall { distance, width } => vec![("distance", distance), ("width", width)],
            Motion::Radial { radius } => vec![("radius", radius)],
            Motion::Fountain { height, spread } => vec![("height", height), ("spread", spread)],
            Motion::Spiral { radius, turns, rise } => {
                vec![("radius", radius), ("turns", turns), ("rise", rise)]
            }
        };
        match params.iter().find(|(_, value)| !value.is_finite()) {
            Some(&(field, _)) => Err(ConfigError::NonFinite { field }),
            None => Ok(()),
        }
    }

    /// Offset from the origin at normalized time `t`.
    pub fn offset(&self, t: f32, slot_index: u32, random_seed: f32) -> Vec3 {
        let jitter = fract(slot_index as f32 * GOLDEN + random_seed);
        match *self {
            Motion::Fall { distance, width } => Vec3::new(
                (random_seed - 0.5) * width,
                -distance * t,
                (jitter - 0.5) * width,
            ),
            Motion::Radial { radius } => {
                let angle = TAU * random_seed;
                let z = jitter * 2.0 - 1.0;
                let ring = (1.0 - z * z).max(0.0).sqrt();
                Vec3::new(ring * angle.cos(), ring * angle.sin(), z) * (radius * t)
            }
            Motion::Fountain { height, spread } => {
                let angle = TAU * random_seed;
                let reach = spread * t * jitter;
                Vec3::new(
                    angle.cos() * reach,
                    4.0 * height * t * (1.0 - t),
                    angle.sin() * reach,
                )
            }
            Motion::Spiral { radius, turns, rise } => {
                let angle = TAU * (random_seed + turns * t);
                Vec3::new(angle.cos() * radius, rise * t, angle.sin() * radius)
            }
        }
    }

    /// WGSL statements computing `offset: vec3<f32>` from `t`, `seed` and
    /// `slot` (all `f32`) for the render shader.
    pub fn to_wgsl(&self) -> String {
        let prelude = format!(
            "    let jitter = fract(slot * {GOLDEN:?} + seed);\n    let tau = {TAU:?};\n"
        );
        let body = match *self {
            Motion::Fall { distance, width } => format!(
                r#"    // Fall {distance} over life
    let offset = vec3<f32>(
        (seed - 0.5) * {width:?},
        -({distance:?}) * t,
        (jitter - 0.5) * {width:?}
    );"#
            ),
            Motion::Radial { radius } => format!(
                r#"    // Radial burst to {radius}
    let angle = tau * seed;
    let z = jitter * 2.0 - 1.0;
    let ring = sqrt(max(1.0 - z * z, 0.0));
    let offset = vec3<f32>(ring * cos(angle), ring * sin(angle), z) * ({radius:?} * t);"#
            ),
            Motion::Fountain { height, spread } => format!(
                r#"    // Fountain apex {height}
    let angle = tau * seed;
    let reach = {spread:?} * t * jitter;
    let offset = vec3<f32>(
        cos(angle) * reach,
        4.0 * {height:?} * t * (1.0 - t),
        sin(angle) * reach
    );"#
            ),
            Motion::Spiral { radius, turns, rise } => format!(
                r#"    // Spiral {turns} turns
    let angle = tau * (seed + {turns:?} * t);
    let offset = vec3<f32>(cos(angle) * {radius:?}, {rise:?} * t, sin(angle) * {radius:?});"#
            ),
        };
        format!("{prelude}{body}")
    }
}

impl Shape for Motion {
    fn evaluate(
        &self,
        t: f32,
        slot_index: u32,
        random_seed: f32,
        constants: &ShapeConstants,
    ) -> VisualState {
        let (color, alpha, scale) = constants.appearance(t);
        VisualState {
            offset: self.offset(t, slot_index, random_seed),
            color,
            alpha,
            scale,
        }
    }
}

/// Evaluate `shape` for every record, in slot order.
pub fn evaluate_instances<S: Shape + ?Sized>(
    records: &[InstanceRecord],
    current_time: f32,
    life_duration: f32,
    shape: &S,
    constants: &ShapeConstants,
) -> Vec<VisualState> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| evaluate_record(r, i as u32, current_time, life_duration, shape, constants))
        .collect()
}

/// [`evaluate_instances`] across the rayon thread pool.
///
/// Output order and values are identical to the sequential version.
pub fn evaluate_instances_par<S: Shape + ?Sized>(
    records: &[InstanceRecord],
    current_time: f32,
    life_duration: f32,
    shape: &S,
    constants: &ShapeConstants,
) -> Vec<VisualState> {
    records
        .par_iter()
        .enumerate()
        .map(|(i, r)| evaluate_record(r, i as u32, current_time, life_duration, shape, constants))
        .collect()
}

#[inline]
fn evaluate_record<S: Shape + ?Sized>(
    record: &InstanceRecord,
    slot_index: u32,
    current_time: f32,
    life_duration: f32,
    shape: &S,
    constants: &ShapeConstants,
) -> VisualState {
    let t = normalize(current_time, record.emission_time, life_duration);
    shape.evaluate(t, slot_index, record.random_seed, constants)
}

//! # ringfx
//!
//! Fixed-capacity, time-parameterized particle instancing.
//!
//! A particle effect with a constant emission rate and a fixed lifetime never
//! has more than `ceil(emit_rate * life_duration)` particles alive. ringfx
//! allocates exactly that many slots once, keeps only an emission time and a
//! random seed per slot, and derives everything else (position, color, size)
//! from the particle's age at draw time. There is no per-particle simulation
//! state to integrate and nothing to allocate per frame.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ringfx::prelude::*;
//!
//! fn main() -> Result<(), RunError> {
//!     let config = EmissionConfig::new(1000.0, 2.0)?.with_particle_size(0.01)?;
//!     ParticleSystem::new(config)
//!         .with_motion(Motion::Fall { distance: 2.0, width: 2.0 })
//!         .run()
//! }
//! ```
//!
//! ## Headless use
//!
//! The core has no GPU types. Drive it with any [`InstanceSink`]:
//!
//! ```
//! use ringfx::{EmissionConfig, EmissionScheduler, FramePipeline, MemorySink};
//!
//! let config = EmissionConfig::new(100.0, 1.0).unwrap();
//! let mut pipeline = FramePipeline::new(EmissionScheduler::with_seed(config, 42));
//! let mut sink = MemorySink::new();
//!
//! let frame = pipeline.frame(1.0 / 60.0, &mut sink).unwrap();
//! assert_eq!(sink.records.len(), 100);
//! assert_eq!(frame.visible_count, 1);
//! // The highest slot is emitted first.
//! assert_eq!(frame.instances(), 99..100);
//! ```
//!
//! ## Pieces
//!
//! | Piece | Role |
//! |-------|------|
//! | [`EmissionConfig`] | Validated rate, lifetime and size; fixes the capacity |
//! | [`SlotRing`] | The slots; recycles expired ones in place |
//! | [`EmissionScheduler`] | Owns the clock, advances the ring on `tick` |
//! | [`stream`] | Projects slots to [`InstanceRecord`]s for upload |
//! | [`shape`] | Pure state function of normalized age |
//! | [`InstanceSink`] | Render boundary; [`gpu::GpuRenderer`] implements it with wgpu |

mod app;
pub mod config;
pub mod error;
pub mod gpu;
pub mod render;
pub mod ring;
pub mod scheduler;
pub mod shape;
pub mod stream;
pub mod time;

pub use app::ParticleSystem;
pub use config::EmissionConfig;
pub use error::{ConfigError, GpuError, InvalidInputError, RunError};
pub use glam::Vec3;
pub use render::{FrameError, FrameParams, FramePipeline, InstanceSink, MemorySink};
pub use ring::{ParticleSlot, SlotRing};
pub use scheduler::EmissionScheduler;
pub use shape::{normalize, Motion, Shape, ShapeConstants, VisualState};
pub use stream::{snapshot, InstanceBuffer, InstanceRecord};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use ringfx::prelude::*;
/// ```
pub mod prelude {
    pub use crate::gpu::BlendMode;
    pub use crate::shape::{Motion, ShapeConstants};
    pub use crate::{
        EmissionConfig, EmissionScheduler, FramePipeline, ParticleSystem, RunError, Vec3,
    };
}

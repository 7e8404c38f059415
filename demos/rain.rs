//! # Rain
//!
//! Drops fall straight down from a line, fading as they go. Every drop's
//! position is computed in the vertex shader from its emission time alone.
//!
//! Run with: `cargo run --example rain --release`

use ringfx::prelude::*;

fn main() -> Result<(), RunError> {
    env_logger::init();

    let config = EmissionConfig::new(4000.0, 1.5)?.with_particle_size(0.006)?;

    ParticleSystem::new(config)
        .with_title("ringfx - rain")
        .with_origin(Vec3::new(0.0, 1.0, 0.0))
        .with_motion(Motion::Fall {
            distance: 2.0,
            width: 2.5,
        })
        .with_constants(ShapeConstants {
            start_color: Vec3::new(0.75, 0.85, 1.0),
            end_color: Vec3::new(0.3, 0.45, 0.8),
            fade_out: true,
            shrink_out: false,
            ..Default::default()
        })
        .run()
}

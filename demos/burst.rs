//! # Burst
//!
//! A continuous radial spray with additive blending, plus a fountain variant
//! selected by the first argument.
//!
//! Run with: `cargo run --example burst --release [fountain|spiral]`

use ringfx::prelude::*;

fn main() -> Result<(), RunError> {
    env_logger::init();

    let variant = std::env::args().nth(1).unwrap_or_default();
    let motion = match variant.as_str() {
        "fountain" => Motion::Fountain {
            height: 1.2,
            spread: 0.8,
        },
        "spiral" => Motion::Spiral {
            radius: 0.6,
            turns: 2.0,
            rise: 1.5,
        },
        _ => Motion::Radial { radius: 1.2 },
    };
    log::info!("motion: {:?}", motion);

    let config = EmissionConfig::new(20_000.0, 1.2)?.with_particle_size(0.004)?;

    ParticleSystem::new(config)
        .with_title("ringfx - burst")
        .with_seed(2024)
        .with_motion(motion)
        .with_blend_mode(BlendMode::Additive)
        .with_constants(ShapeConstants {
            start_color: Vec3::new(1.0, 0.9, 0.3),
            end_color: Vec3::new(0.8, 0.2, 0.0),
            fade_out: true,
            shrink_out: true,
            ..Default::default()
        })
        .run()
}

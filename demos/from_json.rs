//! # Config from JSON
//!
//! Loads an emission config from a JSON file (or uses a built-in one) and
//! steps it headless, printing what a renderer would draw each second.
//!
//! Run with: `cargo run --example from_json [path/to/config.json]`

use ringfx::shape::evaluate_instances_par;
use ringfx::{EmissionConfig, EmissionScheduler, FramePipeline, MemorySink, Motion, ShapeConstants};

const BUILT_IN: &str = r#"{ "emit_rate": 500.0, "life_duration": 2.0, "particle_size": 0.01 }"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let text = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => BUILT_IN.to_string(),
    };
    let config = EmissionConfig::from_json(&text)?;
    println!("capacity: {} slots", config.capacity());

    let mut pipeline = FramePipeline::new(EmissionScheduler::with_seed(config, 1));
    let mut sink = MemorySink::new();
    let motion = Motion::Radial { radius: 1.0 };
    let constants = ShapeConstants {
        particle_size: config.particle_size(),
        ..Default::default()
    };

    for second in 1..=4 {
        for _ in 0..60 {
            pipeline.frame(1.0 / 60.0, &mut sink)?;
        }
        let frame = sink.draws.last().copied().ok_or("no frame drawn")?;
        // Evaluate every slot so each state keeps its slot index, then keep the drawn tail.
        let all = evaluate_instances_par(
            &sink.records,
            frame.time,
            frame.life_duration,
            &motion,
            &constants,
        );
        let states = &all[frame.first_instance as usize..];
        let mean_alpha = states.iter().map(|s| s.alpha).sum::<f32>() / states.len().max(1) as f32;
        println!(
            "t={}s visible={} mean alpha={:.3}",
            second, frame.visible_count, mean_alpha
        );
    }

    Ok(())
}

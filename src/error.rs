//! Error types for ringfx.
//!
//! Every failure in the core is a caller-input problem detected synchronously:
//! [`ConfigError`] when building or replacing a ring, [`InvalidInputError`]
//! when stepping it. The GPU backend adds [`GpuError`] and [`RunError`].

use thiserror::Error;

/// Invalid emission configuration.
///
/// Returned before any slot is allocated, so a failed initialization never
/// leaves a partial ring behind.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `emit_rate` was zero or negative.
    #[error("emit rate must be positive, got {0}")]
    NonPositiveEmitRate(f32),
    /// `life_duration` was zero or negative.
    #[error("life duration must be positive, got {0}")]
    NonPositiveLifeDuration(f32),
    /// `particle_size` was zero or negative.
    #[error("particle size must be positive, got {0}")]
    NonPositiveParticleSize(f32),
    /// A parameter was NaN or infinite.
    #[error("{field} must be finite")]
    NonFinite {
        /// Name of the offending field.
        field: &'static str,
    },
    /// `ceil(emit_rate * life_duration)` is zero, so the ring would have no slots.
    #[error("emit rate {emit_rate} times life duration {life_duration} gives no slots")]
    ZeroCapacity {
        /// Requested emission rate.
        emit_rate: f32,
        /// Requested lifetime.
        life_duration: f32,
    },
    /// `ceil(emit_rate * life_duration)` does not fit in a `u32` slot index.
    #[error("capacity {0} exceeds the maximum slot count")]
    CapacityOverflow(f64),
    /// Configuration text could not be parsed.
    #[error("failed to parse emission config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Invalid per-frame input.
///
/// The operation that returned it made no state change.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidInputError {
    /// `tick` was called with a negative or non-finite delta.
    #[error("delta time must be finite and non-negative, got {0}")]
    NegativeDelta(f32),
    /// An instance buffer was synced against a ring of another capacity.
    #[error("instance buffer holds {buffer} slots but the ring has {ring}")]
    CapacityMismatch {
        /// Capacity of the instance buffer.
        buffer: u32,
        /// Capacity of the ring.
        ring: u32,
    },
}

/// Errors that can occur during GPU initialization.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The surface reports no texture format or no alpha mode for this adapter.
    #[error("surface has no supported format or alpha mode")]
    IncompatibleSurface,
    /// The device ran out of memory while presenting a frame.
    #[error("GPU out of memory")]
    OutOfMemory,
}

/// Errors that can occur when running a windowed particle system.
#[derive(Debug, Error)]
pub enum RunError {
    /// Failed to create or run the event loop.
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create the window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// GPU initialization failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    /// The emission configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::NonPositiveEmitRate(0.0);
        assert_eq!(err.to_string(), "emit rate must be positive, got 0");

        let err = ConfigError::NonFinite { field: "life_duration" };
        assert_eq!(err.to_string(), "life_duration must be finite");
    }

    #[test]
    fn test_config_error_wraps_into_run_error() {
        let run: RunError = ConfigError::NonPositiveLifeDuration(-1.0).into();
        assert!(matches!(run, RunError::Config(ConfigError::NonPositiveLifeDuration(_))));
        assert!(run.to_string().contains("life duration"));
    }

    #[test]
    fn test_invalid_input_message() {
        let err = InvalidInputError::CapacityMismatch { buffer: 4, ring: 8 };
        assert_eq!(err.to_string(), "instance buffer holds 4 slots but the ring has 8");
    }
}

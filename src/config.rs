//! Emission configuration.
//!
//! An [`EmissionConfig`] fixes everything that determines the size of the
//! slot ring. It is validated once, when built, and never changes for the
//! lifetime of a ring. Replacing it means reallocating the ring.
//!
//! # Example
//!
//! ```
//! use ringfx::EmissionConfig;
//!
//! let config = EmissionConfig::new(1000.0, 2.0)
//!     .unwrap()
//!     .with_particle_size(0.01)
//!     .unwrap();
//! assert_eq!(config.capacity(), 2000);
//! ```
//!
//! Configurations can also be loaded from JSON:
//!
//! ```
//! use ringfx::EmissionConfig;
//!
//! let config = EmissionConfig::from_json(
//!     r#"{ "emit_rate": 10.0, "life_duration": 1.5, "particle_size": 0.02 }"#,
//! ).unwrap();
//! assert_eq!(config.capacity(), 15);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default quad half-size in clip-space units.
pub const DEFAULT_PARTICLE_SIZE: f32 = 0.015;

/// Immutable parameter set for one configuration epoch.
///
/// `capacity` is derived as `ceil(emit_rate * life_duration)`: the number of
/// particles alive at once under a constant emission rate and fixed lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EmissionParams", into = "EmissionParams")]
pub struct EmissionConfig {
    particle_size: f32,
    life_duration: f32,
    emit_rate: f32,
    capacity: u32,
}

/// Unvalidated wire form of [`EmissionConfig`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct EmissionParams {
    emit_rate: f32,
    life_duration: f32,
    #[serde(default = "default_particle_size")]
    particle_size: f32,
}

fn default_particle_size() -> f32 {
    DEFAULT_PARTICLE_SIZE
}

impl TryFrom<EmissionParams> for EmissionConfig {
    type Error = ConfigError;

    fn try_from(params: EmissionParams) -> Result<Self, Self::Error> {
        EmissionConfig::new(params.emit_rate, params.life_duration)?
            .with_particle_size(params.particle_size)
    }
}

impl From<EmissionConfig> for EmissionParams {
    fn from(config: EmissionConfig) -> Self {
        Self {
            emit_rate: config.emit_rate,
            life_duration: config.life_duration,
            particle_size: config.particle_size,
        }
    }
}

impl EmissionConfig {
    /// Validate `emit_rate` (particles per second) and `life_duration`
    /// (seconds) and derive the ring capacity.
    pub fn new(emit_rate: f32, life_duration: f32) -> Result<Self, ConfigError> {
        if !emit_rate.is_finite() {
            return Err(ConfigError::NonFinite { field: "emit_rate" });
        }
        if !life_duration.is_finite() {
            return Err(ConfigError::NonFinite { field: "life_duration" });
        }
        if emit_rate <= 0.0 {
            return Err(ConfigError::NonPositiveEmitRate(emit_rate));
        }
        if life_duration <= 0.0 {
            return Err(ConfigError::NonPositiveLifeDuration(life_duration));
        }

        let capacity = f64::from(emit_rate * life_duration).ceil();
        if !capacity.is_finite() || capacity > f64::from(u32::MAX) {
            return Err(ConfigError::CapacityOverflow(capacity));
        }
        // Tiny factors underflow to a zero product.
        if capacity < 1.0 {
            return Err(ConfigError::ZeroCapacity {
                emit_rate,
                life_duration,
            });
        }

        Ok(Self {
            particle_size: DEFAULT_PARTICLE_SIZE,
            life_duration,
            emit_rate,
            capacity: capacity as u32,
        })
    }

    /// Set the rendered quad half-size.
    pub fn with_particle_size(mut self, particle_size: f32) -> Result<Self, ConfigError> {
        if !particle_size.is_finite() {
            return Err(ConfigError::NonFinite { field: "particle_size" });
        }
        if particle_size <= 0.0 {
            return Err(ConfigError::NonPositiveParticleSize(particle_size));
        }
        self.particle_size = particle_size;
        Ok(self)
    }

    /// Parse and validate a JSON configuration.
    ///
    /// `particle_size` is optional and defaults to [`DEFAULT_PARTICLE_SIZE`].
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let params: EmissionParams = serde_json::from_str(text)?;
        Self::try_from(params)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Particles emitted per second.
    #[inline]
    pub fn emit_rate(&self) -> f32 {
        self.emit_rate
    }

    /// Lifetime of every particle in seconds.
    #[inline]
    pub fn life_duration(&self) -> f32 {
        self.life_duration
    }

    /// Rendered quad half-size.
    #[inline]
    pub fn particle_size(&self) -> f32 {
        self.particle_size
    }

    /// Number of slots in the ring.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_ceiled_product() {
        assert_eq!(EmissionConfig::new(1000.0, 2.0).unwrap().capacity(), 2000);
        assert_eq!(EmissionConfig::new(10.0, 1.0).unwrap().capacity(), 10);
        assert_eq!(EmissionConfig::new(3.0, 0.5).unwrap().capacity(), 2);
        assert_eq!(EmissionConfig::new(0.1, 0.1).unwrap().capacity(), 1);
    }

    #[test]
    fn test_capacity_stable_across_rebuilds() {
        let a = EmissionConfig::new(333.0, 1.7).unwrap();
        let b = EmissionConfig::new(333.0, 1.7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.capacity(), b.capacity());
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(matches!(
            EmissionConfig::new(0.0, 1.0),
            Err(ConfigError::NonPositiveEmitRate(_))
        ));
        assert!(matches!(
            EmissionConfig::new(10.0, 0.0),
            Err(ConfigError::NonPositiveLifeDuration(_))
        ));
        assert!(matches!(
            EmissionConfig::new(-5.0, 1.0),
            Err(ConfigError::NonPositiveEmitRate(_))
        ));
    }

    #[test]
    fn test_rejects_non_finite() {
        assert!(matches!(
            EmissionConfig::new(f32::NAN, 1.0),
            Err(ConfigError::NonFinite { field: "emit_rate" })
        ));
        assert!(matches!(
            EmissionConfig::new(1.0, f32::INFINITY),
            Err(ConfigError::NonFinite { field: "life_duration" })
        ));
    }

    #[test]
    fn test_rejects_overflowing_capacity() {
        assert!(matches!(
            EmissionConfig::new(1.0e9, 1.0e3),
            Err(ConfigError::CapacityOverflow(_))
        ));
    }

    #[test]
    fn test_rejects_underflowing_capacity() {
        let err = EmissionConfig::new(1.0e-30, 1.0e-30).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroCapacity { .. }));
        assert!(EmissionConfig::from_json(
            r#"{ "emit_rate": 1e-30, "life_duration": 1e-30 }"#
        )
        .is_err());

        // Small but non-zero products still round up to one slot.
        assert_eq!(EmissionConfig::new(1.0e-3, 1.0e-3).unwrap().capacity(), 1);
    }

    #[test]
    fn test_particle_size() {
        let config = EmissionConfig::new(10.0, 1.0).unwrap();
        assert_eq!(config.particle_size(), DEFAULT_PARTICLE_SIZE);

        let config = config.with_particle_size(0.05).unwrap();
        assert_eq!(config.particle_size(), 0.05);

        assert!(matches!(
            config.with_particle_size(0.0),
            Err(ConfigError::NonPositiveParticleSize(_))
        ));
    }

    #[test]
    fn test_from_json() {
        let config =
            EmissionConfig::from_json(r#"{ "emit_rate": 1000.0, "life_duration": 2.0 }"#).unwrap();
        assert_eq!(config.capacity(), 2000);
        assert_eq!(config.particle_size(), DEFAULT_PARTICLE_SIZE);
    }

    #[test]
    fn test_from_json_validates() {
        let result = EmissionConfig::from_json(r#"{ "emit_rate": 0.0, "life_duration": 1.0 }"#);
        assert!(result.is_err());

        let result = EmissionConfig::from_json("{ not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_json_keeps_parameters() {
        let config = EmissionConfig::new(250.0, 0.8)
            .unwrap()
            .with_particle_size(0.02)
            .unwrap();
        let text = config.to_json().unwrap();
        assert!(text.contains("\"emit_rate\": 250.0"));
        assert_eq!(EmissionConfig::from_json(&text).unwrap(), config);
    }
}

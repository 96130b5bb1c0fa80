//! Deterministic layered noise mapping 2D coordinates to a bounded scalar.
//!
//! The field is the sole source of a particle's "temperature": attributes are
//! a pure function of `sample(x, y)`, so a particle recycled to a position it
//! has visited before looks exactly as it did then.

use crate::error::StarfieldError;
use noise::{NoiseFn, OpenSimplex};
use serde::{Deserialize, Serialize};

/// Serializable configuration for a [`NoiseField`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoiseConfig {
    pub seed: u32,
    /// Number of summed octaves, at least 1.
    pub octaves: u32,
    /// Frequency of the first octave, in cycles per world unit.
    pub frequency: f64,
    /// Amplitude multiplier applied per octave.
    pub persistence: f64,
    /// Amplitude of the first octave.
    pub amplitude: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 4,
            frequency: 1.0 / 512.0,
            persistence: 1.0 / 16.0,
            amplitude: 1.0,
            min: 0.0,
            max: 1.0,
        }
    }
}

impl NoiseConfig {
    fn validate(&self) -> Result<(), StarfieldError> {
        let bad = |msg: String| Err(StarfieldError::InvalidSchema(format!("field: {msg}")));
        if self.octaves == 0 {
            return bad("octaves must be at least 1".into());
        }
        for (name, v) in [
            ("frequency", self.frequency),
            ("persistence", self.persistence),
            ("amplitude", self.amplitude),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return bad(format!("{name} must be positive and finite, got {v}"));
            }
        }
        if !(self.min.is_finite() && self.max.is_finite() && self.min < self.max) {
            return bad(format!(
                "range must satisfy min < max, got [{}, {}]",
                self.min, self.max
            ));
        }
        Ok(())
    }
}

/// Multi-octave OpenSimplex field normalized into `[min, max]`.
#[derive(Clone)]
pub struct NoiseField {
    config: NoiseConfig,
    noise: OpenSimplex,
    /// Sum of all octave amplitudes, used to normalize the raw sum to [-1, 1].
    amplitude_sum: f64,
}

impl NoiseField {
    /// Builds a field, validating the configuration.
    pub fn new(config: NoiseConfig) -> Result<Self, StarfieldError> {
        config.validate()?;
        let amplitude_sum = (0..config.octaves)
            .fold((0.0, config.amplitude), |(sum, amp), _| {
                (sum + amp, amp * config.persistence)
            })
            .0;
        Ok(Self {
            config,
            noise: OpenSimplex::new(config.seed),
            amplitude_sum,
        })
    }

    /// The brightness field of the classic starfield: long-wavelength noise
    /// mapped to [0.25, 1] so no star is ever fully dark.
    pub fn starfield() -> Self {
        Self::new(NoiseConfig {
            min: 0.25,
            ..NoiseConfig::default()
        })
        .expect("starfield noise config is valid")
    }

    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    /// Samples the field at `(x, y)`. Pure: identical inputs give bit-identical
    /// output for the lifetime of the field.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let (sum, _, _) = (0..self.config.octaves).fold(
            (0.0, self.config.amplitude, self.config.frequency),
            |(sum, amp, freq), _| {
                (
                    sum + self.noise.get([x * freq, y * freq]) * amp,
                    amp * self.config.persistence,
                    freq * 2.0,
                )
            },
        );
        let unit = ((sum / self.amplitude_sum).clamp(-1.0, 1.0) + 1.0) * 0.5;
        let NoiseConfig { min, max, .. } = self.config;
        (min + unit * (max - min)).clamp(min, max)
    }
}

impl Default for NoiseField {
    fn default() -> Self {
        Self::new(NoiseConfig::default()).expect("default noise config is valid")
    }
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PartialEq for NoiseField {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config
    }
}

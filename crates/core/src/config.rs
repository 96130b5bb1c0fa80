//! Construction-time configuration for a [`crate::ParticleField`].
//!
//! A [`FieldConfig`] together with a [`crate::SchemaPatch`] fully determines a
//! field's initial population: the same pair always yields the same particles.

use crate::error::StarfieldError;
use crate::params::{param_f64, param_u32, param_u64, param_usize};
use crate::schema::DEFAULT_MORPH_DURATION;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Viewport size, population and seeding for a particle field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FieldConfig {
    /// Viewport width in world units. The bounding region is twice this.
    pub width: f64,
    pub height: f64,
    /// Number of particles, fixed for the field's lifetime.
    pub density: usize,
    pub seed: u64,
    /// Reads per schema morph.
    pub morph_duration: u32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 500.0,
            height: 500.0,
            density: 500,
            seed: 42,
            morph_duration: DEFAULT_MORPH_DURATION,
        }
    }
}

impl FieldConfig {
    pub fn new(width: f64, height: f64, density: usize) -> Self {
        Self {
            width,
            height,
            density,
            ..Self::default()
        }
    }

    /// Reads a config from a JSON object, taking the default for every
    /// missing or mistyped key.
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        Self {
            width: param_f64(params, "width", d.width),
            height: param_f64(params, "height", d.height),
            density: param_usize(params, "density", d.density),
            seed: param_u64(params, "seed", d.seed),
            morph_duration: param_u32(params, "morph-duration", d.morph_duration),
        }
    }

    /// Sets `density` to `fraction` particles per square unit of viewport.
    pub fn with_density_fraction(mut self, fraction: f64) -> Self {
        let count = (fraction * self.width * self.height).round();
        self.density = if count.is_finite() && count > 0.0 {
            count as usize
        } else {
            0
        };
        self
    }

    /// Checks that the viewport is positive and finite and that morphs last
    /// at least one read.
    pub fn validate(&self) -> Result<(), StarfieldError> {
        validate_size(self.width, self.height)?;
        if self.morph_duration == 0 {
            return Err(StarfieldError::InvalidSchema(
                "morph duration must be at least 1 read".into(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_size(width: f64, height: f64) -> Result<(), StarfieldError> {
    let ok = |v: f64| v.is_finite() && v > 0.0;
    if ok(width) && ok(height) {
        Ok(())
    } else {
        Err(StarfieldError::InvalidDimensions)
    }
}

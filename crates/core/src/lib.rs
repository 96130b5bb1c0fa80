#![deny(unsafe_code)]
//! Core of the procedural starfield.
//!
//! Provides the deterministic `NoiseField`, the `ResponseCurve` easing that
//! shapes its samples, the morphing `AttributeSchema`, `Particle` with its
//! position-derived attributes, and `ParticleField`, a fixed population that
//! wraps around a scrolling viewport. Also `Xorshift64`, colors, presets and
//! lenient JSON parameter helpers.

pub mod bounds;
pub mod color;
pub mod config;
pub mod curve;
pub mod error;
pub mod noise_field;
pub mod params;
pub mod particle;
pub mod particle_field;
pub mod preset;
pub mod prng;
pub mod schema;

pub use bounds::Bounds;
pub use color::{ColorGradient, Rgb};
pub use config::FieldConfig;
pub use curve::{CurvePoints, ResponseCurve};
pub use error::StarfieldError;
pub use noise_field::{NoiseConfig, NoiseField};
pub use particle::{Particle, ParticleAttributes, ParticleBuilder, RenderSample, SharedSchema};
pub use particle_field::{FieldState, ParticleField};
pub use prng::Xorshift64;
pub use schema::{
    AttributeSchema, Range, SchemaKey, SchemaPatch, SchemaSnapshot, SchemaValue, TextureHandle,
    DEFAULT_MORPH_DURATION,
};

#![deny(unsafe_code)]
//! Reference host renderer for `starfield-core`.
//!
//! Turns a [`starfield_core::ParticleField`] into an RGBA8 frame of the
//! viewport, and optionally writes that frame as a PNG. The rasterizer is
//! always available; PNG output sits behind the `png` feature so hosts that
//! only need pixels do not pull in `image`.

pub mod pixel;

#[cfg(feature = "png")]
pub mod snapshot;

pub use pixel::{field_to_rgba, frame_size, BASE_RADIUS};

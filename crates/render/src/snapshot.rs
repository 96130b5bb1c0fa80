//! PNG output of a field's viewport.
//!
//! Gated behind `png` (default on). Rasterization lives in [`crate::pixel`].

use starfield_core::{ParticleField, StarfieldError};
use std::path::Path;
use tracing::debug;

use crate::pixel::{field_to_rgba, frame_size};

/// Renders the viewport and writes it to `path` as a PNG.
///
/// Fails with `InvalidDimensions` if the frame does not fit `u32`, or `Io` if
/// encoding or writing fails.
pub fn write_png(field: &ParticleField, path: &Path) -> Result<(), StarfieldError> {
    let (width, height) = frame_size(field);
    let w = u32::try_from(width).map_err(|_| StarfieldError::InvalidDimensions)?;
    let h = u32::try_from(height).map_err(|_| StarfieldError::InvalidDimensions)?;
    let img = image::RgbaImage::from_raw(w, h, field_to_rgba(field))
        .ok_or_else(|| StarfieldError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path).map_err(|e| StarfieldError::Io(e.to_string()))?;
    debug!(path = %path.display(), width = w, height = h, "wrote png snapshot");
    Ok(())
}

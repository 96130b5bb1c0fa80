//! Software rasterization of a particle field's viewport.

use starfield_core::{ParticleField, Rgb};

/// Disc radius in pixels of a particle with scale 1.
pub const BASE_RADIUS: f64 = 4.0;

/// Frame dimensions in pixels: the viewport size, rounded up.
pub fn frame_size(field: &ParticleField) -> (usize, usize) {
    let size = field.size();
    (size.x.ceil() as usize, size.y.ceil() as usize)
}

/// Draws every visible particle as a soft disc over black.
///
/// Particles are composited in population order with their alpha scaled by a
/// linear radial falloff. Tinted particles use their tint, the rest are
/// white. The buffer is `width * height * 4` bytes with opaque alpha.
pub fn field_to_rgba(field: &ParticleField) -> Vec<u8> {
    let (width, height) = frame_size(field);
    let mut rgb = vec![[0.0_f64; 3]; width * height];
    let offset = field.view_offset();

    for sample in field.render_samples().filter(|s| s.visible) {
        let colour = sample.tint.map_or(Rgb::WHITE, |t| {
            Rgb::from_u8((t >> 16) as u8, (t >> 8) as u8, t as u8)
        });
        let cx = sample.position.0 + offset.x;
        let cy = sample.position.1 + offset.y;
        let radius = BASE_RADIUS * sample.scale as f64;
        if radius <= 0.0 {
            continue;
        }

        let x0 = (cx - radius).floor().max(0.0) as usize;
        let y0 = (cy - radius).floor().max(0.0) as usize;
        let x1 = ((cx + radius).ceil().max(0.0) as usize).min(width);
        let y1 = ((cy + radius).ceil().max(0.0) as usize).min(height);

        for py in y0..y1 {
            for px in x0..x1 {
                let dx = px as f64 + 0.5 - cx;
                let dy = py as f64 + 0.5 - cy;
                let falloff = 1.0 - (dx * dx + dy * dy).sqrt() / radius;
                if falloff <= 0.0 {
                    continue;
                }
                let a = (sample.alpha as f64 * falloff).clamp(0.0, 1.0);
                let cell = &mut rgb[py * width + px];
                cell[0] += (colour.r - cell[0]) * a;
                cell[1] += (colour.g - cell[1]) * a;
                cell[2] += (colour.b - cell[2]) * a;
            }
        }
    }

    rgb.iter()
        .flat_map(|&[r, g, b]| {
            let [r, g, b] = Rgb { r, g, b }.to_u8();
            [r, g, b, 255u8]
        })
        .collect()
}

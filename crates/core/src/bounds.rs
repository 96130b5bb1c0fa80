//! Half-open axis-aligned rectangle and toroidal wrapping inside it.

use glam::DVec2;

/// `[x, x + width) × [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Rectangle spanning `centre ± half_extent`.
    pub fn centred(centre: DVec2, half_extent: DVec2) -> Self {
        let min = centre - half_extent;
        Self {
            x: min.x,
            y: min.y,
            width: half_extent.x * 2.0,
            height: half_extent.y * 2.0,
        }
    }

    pub fn min(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    /// Exclusive upper corner.
    pub fn max(&self) -> DVec2 {
        DVec2::new(self.x + self.width, self.y + self.height)
    }

    pub fn size(&self) -> DVec2 {
        DVec2::new(self.width, self.height)
    }

    pub fn contains(&self, p: DVec2) -> bool {
        let max = self.max();
        p.x >= self.x && p.x < max.x && p.y >= self.y && p.y < max.y
    }

    /// Folds `p` back inside by whole multiples of the extent, per axis.
    ///
    /// An axis already in range is returned bit-for-bit unchanged. A point
    /// one step outside moves by exactly one width or height.
    pub fn wrap(&self, p: DVec2) -> DVec2 {
        DVec2::new(
            wrap_axis(p.x, self.x, self.width),
            wrap_axis(p.y, self.y, self.height),
        )
    }
}

fn wrap_axis(v: f64, min: f64, extent: f64) -> f64 {
    let max = min + extent;
    if v >= min && v < max {
        return v;
    }
    let folded = min + (v - min).rem_euclid(extent);
    // rem_euclid may round up to `extent` for values just below `min`
    if folded >= max {
        min
    } else {
        folded
    }
}

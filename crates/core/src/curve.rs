//! Cubic Bézier easing used to reshape raw noise samples.
//!
//! The curve runs from (0, 0) to (1, 1) through two interior control points.
//! `map(x)` solves the curve's x-polynomial for the parameter `t` and returns
//! the y-polynomial at `t`, the same construction CSS `cubic-bezier()` uses.

use crate::error::StarfieldError;
use serde::{Deserialize, Serialize};

const NEWTON_ITERATIONS: usize = 8;
const NEWTON_MIN_SLOPE: f64 = 0.001;
const SUBDIVISION_PRECISION: f64 = 1e-10;
const SUBDIVISION_MAX_ITERATIONS: usize = 40;
const SAMPLE_TABLE_SIZE: usize = 11;
const SAMPLE_STEP: f64 = 1.0 / (SAMPLE_TABLE_SIZE - 1) as f64;

/// The four control scalars of a [`ResponseCurve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurvePoints {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Monotone cubic Bézier easing curve on [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurvePoints", into = "CurvePoints")]
pub struct ResponseCurve {
    points: CurvePoints,
    /// x(t) sampled at t = 0, 0.1, .., 1 to seed the inverse solve.
    samples: [f64; SAMPLE_TABLE_SIZE],
}

impl ResponseCurve {
    /// Builds a curve from its two interior control points.
    ///
    /// All four values must lie in [0, 1]; within that box the curve is
    /// monotone non-decreasing.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self, StarfieldError> {
        for (name, v) in [("x1", x1), ("y1", y1), ("x2", x2), ("y2", y2)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(StarfieldError::InvalidSchema(format!(
                    "response-curve: {name} must be in [0, 1], got {v}"
                )));
            }
        }
        let mut samples = [0.0; SAMPLE_TABLE_SIZE];
        for (i, s) in samples.iter_mut().enumerate() {
            *s = bezier(i as f64 * SAMPLE_STEP, x1, x2);
        }
        Ok(Self {
            points: CurvePoints { x1, y1, x2, y2 },
            samples,
        })
    }

    /// The identity curve.
    pub fn linear() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0).expect("linear control points are valid")
    }

    pub fn points(&self) -> CurvePoints {
        self.points
    }

    /// Maps `x` through the curve. Inputs outside [0, 1] are clamped first,
    /// NaN maps to 0.
    pub fn map(&self, x: f64) -> f64 {
        let CurvePoints { x1, y1, x2, y2 } = self.points;
        let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
        if x1 == y1 && x2 == y2 {
            return x;
        }
        if x == 0.0 || x == 1.0 {
            return x;
        }
        bezier(self.t_for_x(x), y1, y2).clamp(0.0, 1.0)
    }

    fn t_for_x(&self, x: f64) -> f64 {
        let CurvePoints { x1, x2, .. } = self.points;

        let mut interval_start = 0.0;
        let mut i = 1;
        let last = SAMPLE_TABLE_SIZE - 1;
        while i != last && self.samples[i] <= x {
            interval_start += SAMPLE_STEP;
            i += 1;
        }
        i -= 1;

        let span = self.samples[i + 1] - self.samples[i];
        let dist = if span > 0.0 {
            (x - self.samples[i]) / span
        } else {
            0.0
        };
        let guess = interval_start + dist * SAMPLE_STEP;

        let initial_slope = slope(guess, x1, x2);
        if initial_slope >= NEWTON_MIN_SLOPE {
            newton_raphson(x, guess, x1, x2)
        } else if initial_slope == 0.0 {
            guess
        } else {
            binary_subdivide(x, interval_start, interval_start + SAMPLE_STEP, x1, x2)
        }
    }
}

impl Default for ResponseCurve {
    /// Pushes low and mid samples down so that only the brightest regions of
    /// the field read as bright.
    fn default() -> Self {
        Self::new(0.75, 0.1, 0.9, 0.5).expect("default control points are valid")
    }
}

impl TryFrom<CurvePoints> for ResponseCurve {
    type Error = StarfieldError;

    fn try_from(p: CurvePoints) -> Result<Self, Self::Error> {
        Self::new(p.x1, p.y1, p.x2, p.y2)
    }
}

impl From<ResponseCurve> for CurvePoints {
    fn from(curve: ResponseCurve) -> Self {
        curve.points
    }
}

// Polynomial coefficients for one axis with control values a1, a2.
fn coeff_a(a1: f64, a2: f64) -> f64 {
    1.0 - 3.0 * a2 + 3.0 * a1
}

fn coeff_b(a1: f64, a2: f64) -> f64 {
    3.0 * a2 - 6.0 * a1
}

fn coeff_c(a1: f64) -> f64 {
    3.0 * a1
}

/// Evaluates one axis of the curve at parameter `t`.
fn bezier(t: f64, a1: f64, a2: f64) -> f64 {
    ((coeff_a(a1, a2) * t + coeff_b(a1, a2)) * t + coeff_c(a1)) * t
}

/// d/dt of [`bezier`].
fn slope(t: f64, a1: f64, a2: f64) -> f64 {
    3.0 * coeff_a(a1, a2) * t * t + 2.0 * coeff_b(a1, a2) * t + coeff_c(a1)
}

fn newton_raphson(x: f64, mut guess: f64, x1: f64, x2: f64) -> f64 {
    for _ in 0..NEWTON_ITERATIONS {
        let s = slope(guess, x1, x2);
        if s == 0.0 {
            return guess;
        }
        guess -= (bezier(guess, x1, x2) - x) / s;
    }
    guess
}

fn binary_subdivide(x: f64, mut lo: f64, mut hi: f64, x1: f64, x2: f64) -> f64 {
    let mut t = lo;
    for _ in 0..SUBDIVISION_MAX_ITERATIONS {
        t = lo + (hi - lo) / 2.0;
        let err = bezier(t, x1, x2) - x;
        if err.abs() <= SUBDIVISION_PRECISION {
            break;
        }
        if err > 0.0 {
            hi = t;
        } else {
            lo = t;
        }
    }
    t
}

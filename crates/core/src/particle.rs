//! A single star: an authoritative position plus attributes derived from it.
//!
//! Attributes are a cache. Every reposition re-reads the shared schema,
//! samples its noise field at the new position, shapes the sample through
//! the response curve into a "temperature" in [0, 1], and derives alpha,
//! rotation, tint and visibility from that temperature. Scale and texture are
//! drawn from the particle's own random stream instead.

use crate::bounds::Bounds;
use crate::error::StarfieldError;
use crate::prng::Xorshift64;
use crate::schema::{AttributeSchema, Range, TextureHandle};
use glam::DVec2;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// A schema shared by every particle of one field.
pub type SharedSchema = Rc<RefCell<AttributeSchema>>;

/// Derived per-particle attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleAttributes {
    /// Shaped field sample in [0, 1].
    pub temperature: f64,
    pub alpha: f32,
    pub scale: f32,
    /// Degrees in [0, 360], only when rotation is enabled.
    pub rotation: Option<f32>,
    /// `0xRRGGBB`, only when a color gradient is configured.
    pub tint: Option<u32>,
    pub visible: bool,
    pub texture: TextureHandle,
}

impl Default for ParticleAttributes {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            alpha: 0.0,
            scale: 1.0,
            rotation: None,
            tint: None,
            visible: false,
            texture: TextureHandle::default(),
        }
    }
}

/// What a renderer needs to draw one particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderSample {
    pub position: (f64, f64),
    pub alpha: f32,
    pub scale: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tint: Option<u32>,
    pub visible: bool,
    pub texture: TextureHandle,
}

/// Builder for [`Particle`].
///
/// ```
/// use starfield_core::{AttributeSchema, ParticleBuilder, SchemaPatch};
/// use std::{cell::RefCell, rc::Rc};
///
/// let schema = Rc::new(RefCell::new(AttributeSchema::new(&SchemaPatch::default()).unwrap()));
/// let p = ParticleBuilder::new().schema(schema).position(10.0, 20.0).build().unwrap();
/// assert_eq!(p.derivations(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ParticleBuilder {
    schema: Option<SharedSchema>,
    rng: Option<Xorshift64>,
    position: Option<DVec2>,
}

impl ParticleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(mut self, schema: SharedSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Random stream for scale and texture draws. Defaults to seed 1.
    pub fn rng(mut self, rng: Xorshift64) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Initial position; attributes are derived during `build`.
    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(DVec2::new(x, y));
        self
    }

    pub fn build(self) -> Result<Particle, StarfieldError> {
        let schema = self.schema.ok_or(StarfieldError::MissingSchema)?;
        let mut particle = Particle {
            schema,
            rng: self.rng.unwrap_or_else(|| Xorshift64::new(1)),
            // NaN never compares equal, so the first reposition always derives
            position: DVec2::NAN,
            attributes: ParticleAttributes::default(),
            derivations: 0,
        };
        if let Some(p) = self.position {
            particle.reposition(p.x, p.y);
        }
        Ok(particle)
    }
}

#[derive(Debug)]
pub struct Particle {
    schema: SharedSchema,
    rng: Xorshift64,
    position: DVec2,
    attributes: ParticleAttributes,
    derivations: u64,
}

impl Particle {
    /// World position; NaN on both axes until first placed.
    pub fn position(&self) -> DVec2 {
        self.position
    }

    /// Attributes from the most recent derivation.
    pub fn attributes(&self) -> &ParticleAttributes {
        &self.attributes
    }

    /// Number of times attributes have been recomputed.
    pub fn derivations(&self) -> u64 {
        self.derivations
    }

    /// The schema this particle reads from on every move.
    pub fn schema(&self) -> &SharedSchema {
        &self.schema
    }

    /// Moves the particle and re-derives its attributes.
    ///
    /// Returns `false` without touching the schema when `(x, y)` equals the
    /// current position.
    pub fn reposition(&mut self, x: f64, y: f64) -> bool {
        if self.position.x == x && self.position.y == y {
            return false;
        }
        self.position = DVec2::new(x, y);
        self.derive();
        true
    }

    /// Places the particle uniformly inside `bounds`.
    pub fn random_placement(&mut self, bounds: &Bounds) {
        let x = self.rng.next_range(bounds.x, bounds.x + bounds.width);
        let y = self.rng.next_range(bounds.y, bounds.y + bounds.height);
        self.reposition(x, y);
    }

    pub fn render_sample(&self) -> RenderSample {
        let a = &self.attributes;
        RenderSample {
            position: (self.position.x, self.position.y),
            alpha: a.alpha,
            scale: a.scale,
            rotation: a.rotation,
            tint: a.tint,
            visible: a.visible,
            texture: a.texture,
        }
    }

    fn derive(&mut self) {
        let DVec2 { x, y } = self.position;
        let mut schema = self.schema.borrow_mut();

        let raw = schema.field().map_or(1.0, |f| f.sample(x, y));
        let temperature = schema
            .response_curve()
            .map_or(raw, |c| c.map(raw))
            .clamp(0.0, 1.0);

        let alpha = schema
            .alpha_range()
            .unwrap_or(Range::ALPHA_DEFAULT)
            .at(temperature);
        let scale_range = schema.scale_range().unwrap_or(Range::SCALE_DEFAULT);
        let scale = self.rng.next_range(scale_range.min, scale_range.max);
        let visible = schema
            .visibility_threshold()
            .map_or(true, |threshold| temperature >= threshold);
        let rotation = schema
            .rotation_enabled()
            .unwrap_or(false)
            .then(|| (temperature * 360.0) as f32);
        let tint = schema.color_gradient().map(|g| g.blend(temperature));
        let texture = schema
            .texture_set()
            .and_then(|set| self.rng.next_index(set.len()).map(|i| set[i]))
            .unwrap_or_default();

        self.attributes = ParticleAttributes {
            temperature,
            alpha: alpha as f32,
            scale: scale as f32,
            rotation,
            tint,
            visible,
            texture,
        };
        self.derivations += 1;
    }
}

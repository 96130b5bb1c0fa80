//! Fixed-size particle population inside a scrolling, wrapping region.
//!
//! The bounding region is twice the viewport in each axis, centred on the
//! field's centre. Moving the centre puts the field in
//! [`FieldState::Translating`]; [`ParticleField::reconcile`] then folds every
//! particle that fell out of the region back in by whole region extents, so
//! stars leaving one edge reappear on the opposite one with the look their
//! new position dictates.

use crate::bounds::Bounds;
use crate::config::{validate_size, FieldConfig};
use crate::error::StarfieldError;
use crate::particle::{Particle, ParticleBuilder, RenderSample, SharedSchema};
use crate::prng::Xorshift64;
use crate::schema::{AttributeSchema, SchemaPatch};
use glam::DVec2;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

/// Whether the centre has moved since the last reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Idle,
    Translating,
}

#[derive(Debug)]
pub struct ParticleField {
    /// Viewport width and height.
    size: DVec2,
    centre: DVec2,
    last_centre: DVec2,
    bounds: Bounds,
    state: FieldState,
    schema: SharedSchema,
    particles: Vec<Particle>,
    rng: Xorshift64,
    supports_tint: bool,
}

impl ParticleField {
    /// Builds a field centred on the origin and populates it with
    /// `config.density` randomly placed particles.
    pub fn new(config: &FieldConfig, schema: &SchemaPatch) -> Result<Self, StarfieldError> {
        config.validate()?;
        let schema = AttributeSchema::with_morph_duration(schema, config.morph_duration)?;
        let supports_tint = schema.current().color_gradient().is_some();

        let size = DVec2::new(config.width, config.height);
        let mut field = Self {
            size,
            centre: DVec2::ZERO,
            last_centre: DVec2::ZERO,
            bounds: Bounds::centred(DVec2::ZERO, size),
            state: FieldState::Idle,
            schema: Rc::new(RefCell::new(schema)),
            particles: Vec::with_capacity(config.density),
            rng: Xorshift64::new(config.seed),
            supports_tint,
        };
        for _ in 0..config.density {
            field.create_particle()?;
        }
        debug!(
            width = config.width,
            height = config.height,
            density = config.density,
            seed = config.seed,
            supports_tint,
            "particle field created"
        );
        Ok(field)
    }

    /// Builds a field from a lenient config object and a schema object.
    pub fn from_json(config: &Value, schema: &Value) -> Result<Self, StarfieldError> {
        let patch = SchemaPatch::from_json(schema)?;
        Self::new(&FieldConfig::from_json(config), &patch)
    }

    fn create_particle(&mut self) -> Result<&Particle, StarfieldError> {
        let mut particle = ParticleBuilder::new()
            .schema(Rc::clone(&self.schema))
            .rng(self.rng.fork())
            .build()?;
        particle.random_placement(&self.bounds);
        self.particles.push(particle);
        let index = self.particles.len() - 1;
        Ok(&self.particles[index])
    }

    /// The half-open rectangle particles are kept inside.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// [`FieldState::Translating`] between a centre change and the next
    /// reconcile.
    pub fn state(&self) -> FieldState {
        self.state
    }

    /// Viewport centre in world coordinates.
    pub fn centre(&self) -> DVec2 {
        self.centre
    }

    /// Centre before the most recent move.
    pub fn last_centre(&self) -> DVec2 {
        self.last_centre
    }

    /// Displacement of the most recent move.
    pub fn travel(&self) -> DVec2 {
        self.centre - self.last_centre
    }

    /// Viewport width and height.
    pub fn size(&self) -> DVec2 {
        self.size
    }

    /// Moves the viewport. A no-op when `(x, y)` is the current centre.
    pub fn set_centre(&mut self, x: f64, y: f64) {
        if self.centre.x == x && self.centre.y == y {
            return;
        }
        self.last_centre = self.centre;
        self.centre = DVec2::new(x, y);
        self.bounds = Bounds::centred(self.centre, self.size);
        self.state = FieldState::Translating;
    }

    /// Changes the viewport size. Particles are left where they are and wrap
    /// on the next [`ParticleField::reconcile`] if they now lie outside.
    pub fn set_size(&mut self, width: f64, height: f64) -> Result<(), StarfieldError> {
        validate_size(width, height)?;
        self.size = DVec2::new(width, height);
        self.bounds = Bounds::centred(self.centre, self.size);
        Ok(())
    }

    /// Wraps every out-of-bounds particle back into the region and returns
    /// the field to [`FieldState::Idle`]. Returns the number of particles
    /// moved.
    pub fn reconcile(&mut self) -> usize {
        let bounds = self.bounds;
        let mut wrapped = 0;
        for particle in &mut self.particles {
            let p = particle.position();
            if bounds.contains(p) {
                continue;
            }
            let to = bounds.wrap(p);
            particle.reposition(to.x, to.y);
            wrapped += 1;
        }
        self.state = FieldState::Idle;
        trace!(
            wrapped,
            travel_x = self.travel().x,
            travel_y = self.travel().y,
            "reconciled"
        );
        wrapped
    }

    /// Particles in creation order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Mutable access for hosts that place particles themselves.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Particle count, fixed at construction.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// The schema shared by every particle of this field.
    pub fn schema(&self) -> &SharedSchema {
        &self.schema
    }

    /// Starts a morph of the shared schema toward `patch`.
    pub fn set_schema(&mut self, patch: &SchemaPatch) -> Result<(), StarfieldError> {
        self.schema.borrow_mut().set_many(patch)?;
        Ok(())
    }

    pub fn set_schema_json(&mut self, patch: &Value) -> Result<(), StarfieldError> {
        self.schema.borrow_mut().set_json(patch)?;
        Ok(())
    }

    /// Whether particles carry a tint. Fixed when the field is built.
    pub fn supports_tint(&self) -> bool {
        self.supports_tint
    }

    /// Translation from world to screen coordinates:
    /// `screen = world + view_offset()`.
    pub fn view_offset(&self) -> DVec2 {
        -self.centre + self.size / 2.0
    }

    /// One [`RenderSample`] per particle, in creation order.
    pub fn render_samples(&self) -> impl Iterator<Item = RenderSample> + '_ {
        self.particles.iter().map(Particle::render_sample)
    }
}

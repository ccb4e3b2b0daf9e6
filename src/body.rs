//! Bodies and the system registry.
//!
//! A body owns the particle fields of one physical object. Kernels never own
//! bodies; they refer to them by [`BodyId`] through a [`SphSystem`].

use std::fmt;

use crate::error::{Error, Result};
use crate::math::Real;
use crate::particle::{Particles, Property};
use crate::sph;
use crate::surface;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(usize);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Fluid,
    /// Solid boundary with a static outward normal per particle.
    Wall,
}

/// Reference particle spacing and smoothing length of a body.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Resolution<T: Real> {
    pub spacing: T,
    pub smoothing_length: T,
}

impl<T: Real> Resolution<T> {
    /// Smoothing length ratio used when none is given.
    pub const H_SPACING_RATIO: f64 = 1.3;

    pub fn new(spacing: T) -> Result<Self> {
        Self::with_smoothing_length(spacing, spacing * T::new(Self::H_SPACING_RATIO))
    }

    pub fn with_smoothing_length(spacing: T, smoothing_length: T) -> Result<Self> {
        if !(spacing > T::zero()) {
            return Err(Error::InvalidParameter {
                name: "spacing",
                reason: format!("must be positive, got {:?}", spacing),
            });
        }
        if !(smoothing_length > T::zero()) {
            return Err(Error::InvalidParameter {
                name: "smoothing_length",
                reason: format!("must be positive, got {:?}", smoothing_length),
            });
        }

        Ok(Resolution { spacing, smoothing_length })
    }
}

pub struct Body<T: Real, const D: usize> {
    name: String,
    kind: BodyKind,
    rest_density: T,
    resolution: Resolution<T>,
    particles: Particles,
}

impl<T: Real, const D: usize> Body<T, D> {
    /// Create an empty body with all properties its kind requires.
    pub fn new(name: impl Into<String>, kind: BodyKind, rest_density: T, resolution: Resolution<T>) -> Self {
        let mut particles = Particles::new();
        sph::init::<T, D>(&mut particles);
        match kind {
            BodyKind::Fluid => surface::init::<T, D>(&mut particles),
            BodyKind::Wall => particles.add_property::<sph::property::WallNormal<T, D>>(),
        }

        Body {
            name: name.into(),
            kind,
            rest_density,
            resolution,
            particles,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn rest_density(&self) -> T {
        self.rest_density
    }

    pub fn resolution(&self) -> &Resolution<T> {
        &self.resolution
    }

    pub fn particles(&self) -> &Particles {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut Particles {
        &mut self.particles
    }

    pub fn num_particles(&self) -> usize {
        self.particles.num_particles()
    }

    /// Check a property precondition at setup time.
    pub fn require<P: Property>(&self) -> Result<()> {
        if self.particles.has_property::<P>() {
            Ok(())
        } else {
            Err(Error::BodyMissingProperty {
                body: self.name.clone(),
                property: P::NAME,
            })
        }
    }
}

/// Registry of all bodies taking part in a simulation.
pub struct SphSystem<T: Real, const D: usize> {
    bodies: Vec<Body<T, D>>,
}

impl<T: Real, const D: usize> SphSystem<T, D> {
    pub fn new() -> Self {
        SphSystem { bodies: Vec::new() }
    }

    pub fn add_body(&mut self, body: Body<T, D>) -> BodyId {
        let id = BodyId(self.bodies.len());
        log::debug!("registered body `{}` as {} ({:?})", body.name(), id, body.kind());
        self.bodies.push(body);
        id
    }

    pub fn body(&self, id: BodyId) -> Result<&Body<T, D>> {
        self.bodies.get(id.0).ok_or(Error::UnknownBody(id.0))
    }

    pub fn body_mut(&mut self, id: BodyId) -> Result<&mut Body<T, D>> {
        self.bodies.get_mut(id.0).ok_or(Error::UnknownBody(id.0))
    }
}

impl<T: Real, const D: usize> Default for SphSystem<T, D> {
    fn default() -> Self {
        SphSystem::new()
    }
}

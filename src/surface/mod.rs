//! Free-surface detection and surface normals
//!
//! Stages, run in this order every substep:
//!
//! 1. [`indication`]: position divergence and surface indicator,
//! 2. [`color_gradient`]: color-function gradient and unit normal,
//! 3. [`wall`]: contact-angle correction of normals next to walls.

pub mod color_gradient;
pub mod indication;
pub mod wall;

use crate::body::{BodyId, SphSystem};
use crate::config::SurfaceConfig;
use crate::error::{Error, Result};
use crate::math::Real;
use crate::particle::Particles;
use crate::sph::relation::{ComplexRelation, ContactRelation};

use self::color_gradient::{ColorFunctionGradient, ColorFunctionGradientInterpolation};
use self::indication::FreeSurfaceIndication;
use self::property::SurfaceIndicator;
use self::wall::SurfaceNormWithWall;

pub mod property {
    //! Particle properties written by the surface stages.

    use crate::math::{self, Real, VectorN};
    use crate::particle::Property;

    #[derive(Copy, Clone, Debug)]
    pub struct PositionDivergence<T: Real>(pub T);

    impl<T: Real> Property for PositionDivergence<T> {
        type Subtype = T;
        const NAME: &'static str = "PositionDivergence";
        fn new() -> Self::Subtype {
            T::zero()
        }
    }

    #[derive(Copy, Clone, Debug)]
    pub struct ColorGradient<T: Real, const D: usize>(pub VectorN<T, D>);

    impl<T: Real, const D: usize> Property for ColorGradient<T, D> {
        type Subtype = VectorN<T, D>;
        const NAME: &'static str = "ColorGradient";
        fn new() -> Self::Subtype {
            math::zeros()
        }
    }

    #[derive(Copy, Clone, Debug)]
    pub struct SurfaceNormal<T: Real, const D: usize>(pub VectorN<T, D>);

    impl<T: Real, const D: usize> Property for SurfaceNormal<T, D> {
        type Subtype = VectorN<T, D>;
        const NAME: &'static str = "SurfaceNormal";
        fn new() -> Self::Subtype {
            math::zeros()
        }
    }

    /// Bulk = 0, surface = 1.
    #[derive(Copy, Clone, Debug)]
    pub struct SurfaceIndicator(pub i32);

    impl Property for SurfaceIndicator {
        type Subtype = i32;
        const NAME: &'static str = "SurfaceIndicator";
        fn new() -> Self::Subtype {
            0
        }
    }

    #[derive(Copy, Clone, Debug)]
    pub struct PreviousSurfaceIndicator(pub i32);

    impl Property for PreviousSurfaceIndicator {
        type Subtype = i32;
        const NAME: &'static str = "PreviousSurfaceIndicator";
        fn new() -> Self::Subtype {
            0
        }
    }
}

/// Register the fields written by the surface stages.
pub fn init<T, const D: usize>(particles: &mut Particles)
where
    T: Real,
{
    use self::property::*;

    particles.add_property::<PositionDivergence<T>>();
    particles.add_property::<ColorGradient<T, D>>();
    particles.add_property::<SurfaceNormal<T, D>>();
    particles.add_property::<SurfaceIndicator>();
    particles.add_property::<PreviousSurfaceIndicator>();
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SurfaceSummary {
    pub surface_particles: usize,
    pub total_particles: usize,
}

/// All surface stages of one fluid body.
pub struct SurfaceDynamics<T: Real, const D: usize> {
    body: BodyId,
    indication: FreeSurfaceIndication<T, D>,
    color_gradient: ColorFunctionGradient<T, D>,
    interpolation: Option<ColorFunctionGradientInterpolation<T, D>>,
    wall: Option<SurfaceNormWithWall<T, D>>,
}

impl<T: Real, const D: usize> SurfaceDynamics<T, D> {
    /// `wall_relation` enables the contact-angle correction; it has to
    /// contain wall bodies only.
    pub fn new(
        system: &SphSystem<T, D>,
        relation: &ComplexRelation<T, D>,
        wall_relation: Option<&ContactRelation<T, D>>,
        config: &SurfaceConfig,
    ) -> Result<Self> {
        config.validate()?;

        let indication = FreeSurfaceIndication::new(system, relation, config)?;
        let threshold = indication.threshold_by_dimensions();
        let color_gradient = ColorFunctionGradient::new(system, relation, threshold)?;
        let interpolation = if config.interpolate_color_gradient {
            Some(ColorFunctionGradientInterpolation::new(system, &relation.inner, threshold)?)
        } else {
            None
        };
        let wall = match wall_relation {
            Some(wall_relation) => Some(SurfaceNormWithWall::new(system, wall_relation, T::new(config.contact_angle))?),
            None => None,
        };

        log::info!(
            "surface dynamics for `{}`: {} contact bodies, mode {:?}, wall correction {}",
            system.body(relation.body())?.name(),
            relation.contacts().len(),
            config.indication,
            if wall.is_some() { "on" } else { "off" },
        );

        Ok(SurfaceDynamics {
            body: relation.body(),
            indication,
            color_gradient,
            interpolation,
            wall,
        })
    }

    pub fn threshold_by_dimensions(&self) -> T {
        self.indication.threshold_by_dimensions()
    }

    /// Run all stages once, in order.
    pub fn exec(
        &self,
        system: &SphSystem<T, D>,
        relation: &ComplexRelation<T, D>,
        wall_relation: Option<&ContactRelation<T, D>>,
    ) -> Result<SurfaceSummary> {
        self.indication.interaction(system, relation)?;
        self.indication.update(system, relation)?;
        self.color_gradient.exec(system, relation)?;
        if let Some(ref interpolation) = self.interpolation {
            interpolation.exec(system, &relation.inner)?;
        }
        match (&self.wall, wall_relation) {
            (Some(wall), Some(wall_relation)) => wall.exec(system, wall_relation)?,
            (Some(_), None) => {
                return Err(Error::RelationMismatch {
                    body: system.body(self.body)?.name().to_owned(),
                    reason: "wall correction configured without a wall relation".to_owned(),
                })
            }
            (None, _) => {}
        }

        let body = system.body(self.body)?;
        let indicator = body.particles().read_property::<SurfaceIndicator>()?;
        let summary = SurfaceSummary {
            surface_particles: indicator.iter().filter(|&&flag| flag == 1).count(),
            total_particles: indicator.len(),
        };
        log::debug!(
            "`{}`: {} of {} particles on the surface",
            body.name(),
            summary.surface_particles,
            summary.total_particles
        );

        Ok(summary)
    }
}

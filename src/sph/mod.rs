//! Smoothed particle hydrodynamics building blocks
//!
//! References:
//!     [Wen95] Holger Wendland, 1995,
//!             Piecewise polynomial, positive definite and compactly supported radial functions of minimal degree,
//!             Advances in Computational Mathematics 4, 389-396

pub mod kernel;
pub mod neighbor;
pub mod relation;

use crate::math::Real;
use crate::particle::Particles;

pub mod property {
    //! Common particle properties

    use crate::math::{self, Real, VectorN};
    use crate::particle::Property;

    #[derive(Copy, Clone, Debug)]
    pub struct Position<T: Real, const D: usize>(pub VectorN<T, D>);

    impl<T: Real, const D: usize> Property for Position<T, D> {
        type Subtype = VectorN<T, D>;
        const NAME: &'static str = "Position";
        fn new() -> Self::Subtype {
            math::zeros()
        }
    }

    #[derive(Copy, Clone, Debug)]
    pub struct Density<T: Real>(pub T);

    impl<T: Real> Property for Density<T> {
        type Subtype = T;
        const NAME: &'static str = "Density";
        fn new() -> Self::Subtype {
            T::zero()
        }
    }

    #[derive(Copy, Clone, Debug)]
    pub struct Mass<T: Real>(pub T);

    impl<T: Real> Property for Mass<T> {
        type Subtype = T;
        const NAME: &'static str = "Mass";
        fn new() -> Self::Subtype {
            T::zero()
        }
    }

    /// Particle volume, `mass / density` at rest.
    #[derive(Copy, Clone, Debug)]
    pub struct Volume<T: Real>(pub T);

    impl<T: Real> Property for Volume<T> {
        type Subtype = T;
        const NAME: &'static str = "Volume";
        fn new() -> Self::Subtype {
            T::zero()
        }
    }

    /// Static outward normal of a wall particle.
    #[derive(Copy, Clone, Debug)]
    pub struct WallNormal<T: Real, const D: usize>(pub VectorN<T, D>);

    impl<T: Real, const D: usize> Property for WallNormal<T, D> {
        type Subtype = VectorN<T, D>;
        const NAME: &'static str = "WallNormal";
        fn new() -> Self::Subtype {
            math::zeros()
        }
    }
}

/// Register the properties every body carries.
pub fn init<T, const D: usize>(particles: &mut Particles)
where
    T: Real,
{
    use self::property::*;

    particles.add_property::<Position<T, D>>();
    particles.add_property::<Density<T>>();
    particles.add_property::<Mass<T>>();
    particles.add_property::<Volume<T>>();
}

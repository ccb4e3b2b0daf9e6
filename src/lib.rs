//! Free-surface indication, color-function gradients and wall-corrected
//! surface normals for multi-body particle clouds.
//!
//! The crate works on bodies whose neighbor lists were filled beforehand
//! (see [`sph::relation`]). A substep runs the stages in [`surface`] in a
//! fixed order.

extern crate nalgebra as na;

pub mod body;
pub mod config;
pub mod error;
pub mod math;
pub mod particle;
pub mod sph;
pub mod surface;

pub use body::{Body, BodyId, BodyKind, Resolution, SphSystem};
pub use config::{IndicationMode, SurfaceConfig};
pub use error::{Error, Result};
pub use surface::SurfaceDynamics;

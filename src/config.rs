//! Surface pipeline configuration.
//!
//! ```toml
//! threshold_factor = 0.75
//! contact_angle = 1.0471975511965976
//! indication = "spatial_temporal"
//! interpolate_color_gradient = true
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{Error, Result};
use crate::math::Real;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicationMode {
    /// Classify from the current divergence field only.
    Spatial,
    /// Additionally require proximity to the previous substep's surface.
    SpatialTemporal,
}

impl Default for IndicationMode {
    fn default() -> Self {
        IndicationMode::Spatial
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Divergence threshold per spatial dimension.
    pub threshold_factor: f64,
    /// Static contact angle between free surface and wall, in radians.
    pub contact_angle: f64,
    pub indication: IndicationMode,
    /// Interpolate color gradients onto particles flagged by proximity only.
    pub interpolate_color_gradient: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        SurfaceConfig {
            threshold_factor: 0.75,
            contact_angle: 0.5 * PI,
            indication: IndicationMode::default(),
            interpolate_color_gradient: false,
        }
    }
}

impl SurfaceConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: SurfaceConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_contact_angle_degrees(mut self, degrees: f64) -> Self {
        self.contact_angle = degrees.to_radians();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.threshold_factor.is_finite() && self.threshold_factor > 0.0) {
            return Err(Error::InvalidParameter {
                name: "threshold_factor",
                reason: format!("must be positive, got {}", self.threshold_factor),
            });
        }
        if !(0.0..=PI).contains(&self.contact_angle) {
            return Err(Error::InvalidParameter {
                name: "contact_angle",
                reason: format!("must lie in [0, pi], got {}", self.contact_angle),
            });
        }
        Ok(())
    }

    /// Divergence below which a particle counts as near a surface.
    pub fn threshold_by_dimensions<T: Real>(&self, dimensions: usize) -> T {
        T::new(self.threshold_factor * dimensions as f64)
    }
}

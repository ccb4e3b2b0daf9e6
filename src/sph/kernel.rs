//! Smoothing Kernels

use std::f64::consts::PI;

use crate::error::{Error, Result};
use crate::math::Real;

pub trait Kernel<T: Real>: Sync {
    /// Radius beyond which the kernel vanishes.
    fn cutoff(&self) -> T;

    fn w(&self, radius: T) -> T;

    /// Radial derivative `dW/dr`, non-positive inside the support.
    fn dw(&self, radius: T) -> T;
}

/// Wendland C2 kernel with support radius `2h`.
///
/// Ref: [Wen95]
#[derive(Copy, Clone, Debug)]
pub struct WendlandC2<T: Real> {
    h: T,
    w_const: T,
    dw_const: T,
}

impl<T: Real> WendlandC2<T> {
    pub fn new(smoothing_length: T, dimensions: usize) -> Result<Self> {
        if smoothing_length <= T::zero() {
            return Err(Error::InvalidParameter {
                name: "smoothing_length",
                reason: format!("must be positive, got {:?}", smoothing_length),
            });
        }

        let h = smoothing_length;
        let pi = T::new(PI);
        let w_const = match dimensions {
            1 => T::new(3.0 / 4.0) / h,
            2 => T::new(7.0 / 4.0) / (pi * h.powi(2)),
            3 => T::new(21.0 / 16.0) / (pi * h.powi(3)),
            _ => {
                return Err(Error::InvalidParameter {
                    name: "dimensions",
                    reason: format!("expected 1, 2 or 3, got {}", dimensions),
                })
            }
        };

        Ok(WendlandC2 {
            h,
            w_const,
            dw_const: w_const * T::new(-5.0) / h,
        })
    }

    pub fn smoothing_length(&self) -> T {
        self.h
    }
}

impl<T: Real> Kernel<T> for WendlandC2<T> {
    fn cutoff(&self) -> T {
        self.h * T::new(2.0)
    }

    fn w(&self, radius: T) -> T {
        debug_assert!(radius >= T::zero());

        let q = radius / self.h;
        if q >= T::new(2.0) {
            return T::zero();
        }

        let diff = T::one() - q * T::new(0.5);
        self.w_const * diff.powi(4) * (T::one() + q * T::new(2.0))
    }

    fn dw(&self, radius: T) -> T {
        debug_assert!(radius >= T::zero());

        let q = radius / self.h;
        if q >= T::new(2.0) {
            return T::zero();
        }

        let diff = T::one() - q * T::new(0.5);
        self.dw_const * q * diff.powi(3)
    }
}

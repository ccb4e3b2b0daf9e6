
/// Statically sized column vector used for positions, directions and normals.
pub type VectorN<T, const D: usize> = na::SVector<T, D>;

/// Regularizer added to vector norms before dividing.
pub const TINY_REAL: f64 = 1.0e-15;

pub trait Real: na::RealField + Copy + Send + Sync + 'static {
    fn new(other: f64) -> Self {
        na::convert(other)
    }

    fn tiny() -> Self {
        Self::new(TINY_REAL)
    }
}

impl<T> Real for T where T: na::RealField + Copy + Send + Sync + 'static { }

/// Scale `v` to unit length, guarded against vanishing norms.
///
/// A zero vector stays zero instead of producing NaNs.
pub fn normalize_guarded<T: Real, const D: usize>(v: &VectorN<T, D>) -> VectorN<T, D> {
    v / (v.norm() + T::tiny())
}

pub fn zeros<T: Real, const D: usize>() -> VectorN<T, D> {
    VectorN::<T, D>::zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_unit_length() {
        let v = na::Vector3::new(3.0f64, 0.0, 4.0);
        let n = normalize_guarded(&v);
        assert!((n.norm() - 1.0).abs() < 1.0e-12, "{:?}", n);
        assert!((n[0] - 0.6).abs() < 1.0e-12);
    }

    #[test]
    fn normalize_zero_vector() {
        let v = zeros::<f64, 2>();
        let n = normalize_guarded(&v);
        assert!(n.iter().all(|x| x.is_finite()));
        assert_eq!(n.norm(), 0.0);
    }
}

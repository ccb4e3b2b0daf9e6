//! Color-function gradient and surface normal
//!
//! Only particles below the divergence threshold get a gradient. Deep inside
//! a body the color function is flat and contact neighbors would only add
//! noise, so both the inner and the contact sum are skipped there.

use ndarray::Zip;

use crate::body::{BodyId, SphSystem};
use crate::error::{Error, Result};
use crate::math::{self, Real, VectorN};
use crate::sph::property::Volume;
use crate::sph::relation::{ComplexRelation, Relation};

use super::property::{ColorGradient, PositionDivergence, SurfaceIndicator, SurfaceNormal};

pub struct ColorFunctionGradient<T: Real, const D: usize> {
    body: BodyId,
    threshold_by_dimensions: T,
    num_contacts: usize,
}

impl<T: Real, const D: usize> ColorFunctionGradient<T, D> {
    pub fn new(system: &SphSystem<T, D>, relation: &ComplexRelation<T, D>, threshold_by_dimensions: T) -> Result<Self> {
        let body = relation.body();
        relation.check(system, body)?;

        let owner = system.body(body)?;
        owner.require::<Volume<T>>()?;
        owner.require::<PositionDivergence<T>>()?;
        owner.require::<ColorGradient<T, D>>()?;
        owner.require::<SurfaceNormal<T, D>>()?;
        for contact in relation.contacts() {
            system.body(contact.source_body())?.require::<Volume<T>>()?;
        }

        Ok(ColorFunctionGradient {
            body,
            threshold_by_dimensions,
            num_contacts: relation.contacts().len(),
        })
    }

    pub fn exec(&self, system: &SphSystem<T, D>, relation: &ComplexRelation<T, D>) -> Result<()> {
        if relation.body() != self.body || relation.contacts().len() != self.num_contacts {
            return Err(Error::RelationMismatch {
                body: system.body(self.body)?.name().to_owned(),
                reason: "relation differs from the one used at construction".to_owned(),
            });
        }
        relation.check(system, self.body)?;

        let particles = system.body(self.body)?.particles();
        let pos_div = particles.read_property::<PositionDivergence<T>>()?;
        let volumes = particles.read_property::<Volume<T>>()?;
        let mut color_grad = particles.write_property::<ColorGradient<T, D>>()?;
        let mut surface_norm = particles.write_property::<SurfaceNormal<T, D>>()?;

        let contact_volumes = relation
            .contacts()
            .iter()
            .map(|contact| system.body(contact.source_body())?.particles().read_property::<Volume<T>>())
            .collect::<Result<Vec<_>>>()?;
        let contact_volumes: Vec<&[T]> = contact_volumes.iter().map(|vol| &**vol).collect();

        let pos_div: &[T] = &pos_div;
        let volumes: &[T] = &volumes;
        let inner = &relation.inner;
        let contacts = relation.contacts();
        let threshold = self.threshold_by_dimensions;

        Zip::indexed(&mut color_grad[..])
            .and(&mut surface_norm[..])
            .par_for_each(|i, color_grad, surface_norm| {
                let near_surface = pos_div[i] < threshold;

                let mut gradient = math::zeros::<T, D>();
                if near_surface {
                    for n in inner.neighborhood(i).iter() {
                        gradient -= n.e_ij * (n.dw_ij * volumes[n.j]);
                    }
                }
                *color_grad = gradient;

                let mut gradient = math::zeros::<T, D>();
                if near_surface {
                    for (k, contact) in contacts.iter().enumerate() {
                        let vol_k = contact_volumes[k];
                        for n in contact.neighborhood(i).iter() {
                            gradient -= n.e_ij * (n.dw_ij * vol_k[n.j]);
                        }
                    }
                }
                *color_grad += gradient;
                *surface_norm = math::normalize_guarded(color_grad);
            });

        Ok(())
    }
}

/// Smooth color gradients onto particles flagged only by proximity.
///
/// A particle marked as surface although its own divergence is above the
/// threshold has no gradient of its own. It takes the `W_ij V_j` weighted
/// mean of the gradients of neighboring surface particles below the
/// threshold.
pub struct ColorFunctionGradientInterpolation<T: Real, const D: usize> {
    body: BodyId,
    threshold_by_dimensions: T,
}

impl<T: Real, const D: usize> ColorFunctionGradientInterpolation<T, D> {
    pub fn new(system: &SphSystem<T, D>, inner: &Relation<T, D>, threshold_by_dimensions: T) -> Result<Self> {
        let body = inner.body();
        inner.check(system, body)?;

        let owner = system.body(body)?;
        owner.require::<Volume<T>>()?;
        owner.require::<PositionDivergence<T>>()?;
        owner.require::<SurfaceIndicator>()?;
        owner.require::<ColorGradient<T, D>>()?;
        owner.require::<SurfaceNormal<T, D>>()?;

        Ok(ColorFunctionGradientInterpolation {
            body,
            threshold_by_dimensions,
        })
    }

    pub fn exec(&self, system: &SphSystem<T, D>, inner: &Relation<T, D>) -> Result<()> {
        inner.check(system, self.body)?;

        let particles = system.body(self.body)?.particles();
        let pos_div = particles.read_property::<PositionDivergence<T>>()?;
        let indicator = particles.read_property::<SurfaceIndicator>()?;
        let volumes = particles.read_property::<Volume<T>>()?;
        let mut color_grad = particles.write_property::<ColorGradient<T, D>>()?;
        let mut surface_norm = particles.write_property::<SurfaceNormal<T, D>>()?;

        let source: Vec<VectorN<T, D>> = color_grad.to_vec();
        let pos_div: &[T] = &pos_div;
        let indicator: &[i32] = &indicator;
        let volumes: &[T] = &volumes;
        let threshold = self.threshold_by_dimensions;

        Zip::indexed(&mut color_grad[..])
            .and(&mut surface_norm[..])
            .par_for_each(|i, color_grad, surface_norm| {
                if indicator[i] != 1 || pos_div[i] < threshold {
                    return;
                }

                let mut weight = T::zero();
                let mut gradient = math::zeros::<T, D>();
                for n in inner.neighborhood(i).iter() {
                    if indicator[n.j] == 1 && pos_div[n.j] < threshold {
                        let w = n.w_ij * volumes[n.j];
                        weight += w;
                        gradient += source[n.j] * w;
                    }
                }

                let gradient = gradient / (weight + T::tiny());
                *color_grad = gradient;
                *surface_norm = math::normalize_guarded(&gradient);
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, BodyKind, Resolution};
    use crate::sph::neighbor::Neighbor;
    use na::Vector2;

    fn record(j: usize, dw_ij: f64, e_ij: Vector2<f64>) -> Neighbor<f64, 2> {
        Neighbor {
            j,
            w_ij: 1.0,
            dw_ij,
            r_ij: 0.5,
            e_ij,
        }
    }

    fn setup() -> (SphSystem<f64, 2>, ComplexRelation<f64, 2>) {
        let mut system = SphSystem::new();
        let mut fluid = Body::new("fluid", BodyKind::Fluid, 1.0, Resolution::new(1.0).unwrap());
        fluid.particles_mut().add_particles(2).with::<Volume<f64>>(&[0.25, 0.25]).unwrap();
        let mut wall = Body::new("wall", BodyKind::Wall, 1.0, Resolution::new(1.0).unwrap());
        wall.particles_mut().add_particles(1).with::<Volume<f64>>(&[0.5]).unwrap();
        let fluid = system.add_body(fluid);
        let wall = system.add_body(wall);

        let mut relation = ComplexRelation::new(&system, fluid, &[wall]).unwrap();
        relation.contact.as_mut().unwrap().relations_mut()[0]
            .neighborhood_mut(0)
            .push(record(0, -2.0, Vector2::new(0.0, 1.0)));
        (system, relation)
    }

    fn set_divergence(system: &SphSystem<f64, 2>, relation: &ComplexRelation<f64, 2>, value: f64) {
        let particles = system.body(relation.body()).unwrap().particles();
        particles.write_property::<PositionDivergence<f64>>().unwrap()[0] = value;
    }

    fn color_gradient(system: &SphSystem<f64, 2>, relation: &ComplexRelation<f64, 2>) -> Vector2<f64> {
        let particles = system.body(relation.body()).unwrap().particles();
        particles.read_property::<ColorGradient<f64, 2>>().unwrap()[0]
    }

    fn surface_normal(system: &SphSystem<f64, 2>, relation: &ComplexRelation<f64, 2>) -> Vector2<f64> {
        let particles = system.body(relation.body()).unwrap().particles();
        particles.read_property::<SurfaceNormal<f64, 2>>().unwrap()[0]
    }

    #[test]
    fn contact_contribution_gated_at_threshold() {
        let (system, relation) = setup();
        let gradient = ColorFunctionGradient::new(&system, &relation, 1.5).unwrap();

        set_divergence(&system, &relation, 1.5);
        gradient.exec(&system, &relation).unwrap();
        assert_eq!(color_gradient(&system, &relation), Vector2::zeros());

        set_divergence(&system, &relation, 1.4);
        gradient.exec(&system, &relation).unwrap();
        // -(-2.0) * 0.5 * (0, 1)
        let g = color_gradient(&system, &relation);
        assert!((g - Vector2::new(0.0, 1.0)).norm() < 1.0e-12, "{:?}", g);
        let n = surface_normal(&system, &relation);
        assert!((n.norm() - 1.0).abs() < 1.0e-12);
    }

    #[test]
    fn inner_and_contact_add_up() {
        let (system, mut relation) = setup();
        relation.inner.neighborhood_mut(0).push(record(1, -4.0, Vector2::new(1.0, 0.0)));
        let gradient = ColorFunctionGradient::new(&system, &relation, 1.5).unwrap();

        set_divergence(&system, &relation, 0.5);
        gradient.exec(&system, &relation).unwrap();

        // inner: 4.0 * 0.25 * (1, 0), contact: 2.0 * 0.5 * (0, 1)
        let g = color_gradient(&system, &relation);
        assert!((g - Vector2::new(1.0, 1.0)).norm() < 1.0e-12, "{:?}", g);
        let n = surface_normal(&system, &relation);
        let expected = Vector2::new(1.0, 1.0) / 2.0f64.sqrt();
        assert!((n - expected).norm() < 1.0e-12, "{:?}", n);
    }

    #[test]
    fn cancelling_gradient_gives_finite_normal() {
        let (system, mut relation) = setup();
        relation.contact = None;
        relation.inner.neighborhood_mut(0).push(record(1, -1.0, Vector2::new(1.0, 0.0)));
        relation.inner.neighborhood_mut(0).push(record(1, -1.0, Vector2::new(-1.0, 0.0)));
        let gradient = ColorFunctionGradient::new(&system, &relation, 1.5).unwrap();

        set_divergence(&system, &relation, 0.5);
        gradient.exec(&system, &relation).unwrap();
        let n = surface_normal(&system, &relation);
        assert!(n.iter().all(|x| x.is_finite()));
        assert!(n.norm() < 1.0e-6);
    }

    #[test]
    fn interpolation_fills_proximity_flagged_particles() {
        let mut system = SphSystem::<f64, 2>::new();
        let mut fluid = Body::new("fluid", BodyKind::Fluid, 1.0, Resolution::new(1.0).unwrap());
        fluid.particles_mut().add_particles(3).with::<Volume<f64>>(&[1.0, 1.0, 1.0]).unwrap();
        let fluid = system.add_body(fluid);

        let mut inner = Relation::inner(&system, fluid).unwrap();
        inner.neighborhood_mut(0).push(Neighbor { j: 1, w_ij: 1.0, dw_ij: -1.0, r_ij: 0.5, e_ij: Vector2::new(-1.0, 0.0) });
        inner.neighborhood_mut(0).push(Neighbor { j: 2, w_ij: 3.0, dw_ij: -1.0, r_ij: 0.5, e_ij: Vector2::new(1.0, 0.0) });

        {
            let particles = system.body(fluid).unwrap().particles();
            particles.write_property::<PositionDivergence<f64>>().unwrap().copy_from_slice(&[2.0, 1.0, 1.0]);
            particles.write_property::<SurfaceIndicator>().unwrap().copy_from_slice(&[1, 1, 1]);
            let mut grad = particles.write_property::<ColorGradient<f64, 2>>().unwrap();
            grad[1] = Vector2::new(4.0, 0.0);
            grad[2] = Vector2::new(0.0, 4.0);
        }

        let interpolation = ColorFunctionGradientInterpolation::new(&system, &inner, 1.5).unwrap();
        interpolation.exec(&system, &inner).unwrap();

        let particles = system.body(fluid).unwrap().particles();
        let grad = particles.read_property::<ColorGradient<f64, 2>>().unwrap();
        assert!((grad[0] - Vector2::new(1.0, 3.0)).norm() < 1.0e-9, "{:?}", grad[0]);
        // particles below the threshold keep their own gradient
        assert_eq!(grad[1], Vector2::new(4.0, 0.0));
        let norm = particles.read_property::<SurfaceNormal<f64, 2>>().unwrap();
        assert!((norm[0].norm() - 1.0).abs() < 1.0e-9);
    }
}

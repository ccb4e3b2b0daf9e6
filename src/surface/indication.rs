//! Free-surface indication
//!
//! The position divergence `-Σ dW_ij r_ij V_j` approaches the number of
//! spatial dimensions inside a body and drops where the neighbor support is
//! truncated by a free surface. Contact neighbors contribute with the volume
//! `m_j / ρ0_k` of their body, so a fluid touching a wall or another fluid is
//! not mistaken for a free surface.

use ndarray::Zip;

use crate::body::{BodyId, SphSystem};
use crate::config::{IndicationMode, SurfaceConfig};
use crate::error::{Error, Result};
use crate::math::Real;
use crate::sph::neighbor::Neighborhood;
use crate::sph::property::{Mass, Volume};
use crate::sph::relation::ComplexRelation;

use super::property::{PositionDivergence, PreviousSurfaceIndicator, SurfaceIndicator};

pub struct FreeSurfaceIndication<T: Real, const D: usize> {
    body: BodyId,
    mode: IndicationMode,
    threshold_by_dimensions: T,
    smoothing_length: T,
    contact_inv_rho0: Vec<T>,
}

impl<T: Real, const D: usize> FreeSurfaceIndication<T, D> {
    pub fn new(system: &SphSystem<T, D>, relation: &ComplexRelation<T, D>, config: &SurfaceConfig) -> Result<Self> {
        let body = relation.body();
        relation.check(system, body)?;

        let owner = system.body(body)?;
        owner.require::<Volume<T>>()?;
        owner.require::<PositionDivergence<T>>()?;
        owner.require::<SurfaceIndicator>()?;
        if config.indication == IndicationMode::SpatialTemporal {
            owner.require::<PreviousSurfaceIndicator>()?;
        }

        let contact_inv_rho0 = relation
            .contacts()
            .iter()
            .map(|contact| {
                let contact_body = system.body(contact.source_body())?;
                contact_body.require::<Mass<T>>()?;
                let rho0 = contact_body.rest_density();
                if rho0 <= T::zero() {
                    return Err(Error::InvalidParameter {
                        name: "rest_density",
                        reason: format!("body `{}` has rest density {:?}", contact_body.name(), rho0),
                    });
                }
                Ok(T::one() / rho0)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FreeSurfaceIndication {
            body,
            mode: config.indication,
            threshold_by_dimensions: config.threshold_by_dimensions(D),
            smoothing_length: owner.resolution().smoothing_length,
            contact_inv_rho0,
        })
    }

    pub fn threshold_by_dimensions(&self) -> T {
        self.threshold_by_dimensions
    }

    fn check_relation(&self, system: &SphSystem<T, D>, relation: &ComplexRelation<T, D>) -> Result<()> {
        if relation.body() != self.body || relation.contacts().len() != self.contact_inv_rho0.len() {
            return Err(Error::RelationMismatch {
                body: system.body(self.body)?.name().to_owned(),
                reason: "relation differs from the one used at construction".to_owned(),
            });
        }
        relation.check(system, self.body)
    }

    /// Accumulate the inner and contact position divergence of every particle.
    pub fn interaction(&self, system: &SphSystem<T, D>, relation: &ComplexRelation<T, D>) -> Result<()> {
        self.check_relation(system, relation)?;

        let particles = system.body(self.body)?.particles();
        if self.mode == IndicationMode::SpatialTemporal {
            let indicator = particles.read_property::<SurfaceIndicator>()?;
            let mut previous = particles.write_property::<PreviousSurfaceIndicator>()?;
            previous.copy_from_slice(&indicator);
        }

        let volumes = particles.read_property::<Volume<T>>()?;
        let mut pos_div = particles.write_property::<PositionDivergence<T>>()?;

        let contact_masses = relation
            .contacts()
            .iter()
            .map(|contact| system.body(contact.source_body())?.particles().read_property::<Mass<T>>())
            .collect::<Result<Vec<_>>>()?;
        let contact_masses: Vec<&[T]> = contact_masses.iter().map(|mass| &**mass).collect();

        let volumes: &[T] = &volumes;
        let inner = &relation.inner;
        let contacts = relation.contacts();
        let contact_inv_rho0 = &self.contact_inv_rho0;

        Zip::indexed(&mut pos_div[..]).par_for_each(|i, pos_div| {
            let mut div = T::zero();
            for n in inner.neighborhood(i).iter() {
                div -= n.dw_ij * n.r_ij * volumes[n.j];
            }
            *pos_div = div;

            let mut div = T::zero();
            for (k, contact) in contacts.iter().enumerate() {
                let mass_k = contact_masses[k];
                let inv_rho0_k = contact_inv_rho0[k];
                for n in contact.neighborhood(i).iter() {
                    div -= n.dw_ij * n.r_ij * inv_rho0_k * mass_k[n.j];
                }
            }
            *pos_div += div;
        });

        Ok(())
    }

    /// Classify particles from the divergence field written by [`interaction`].
    ///
    /// [`interaction`]: FreeSurfaceIndication::interaction
    pub fn update(&self, system: &SphSystem<T, D>, relation: &ComplexRelation<T, D>) -> Result<()> {
        self.check_relation(system, relation)?;

        let particles = system.body(self.body)?.particles();
        let pos_div = particles.read_property::<PositionDivergence<T>>()?;
        let previous = match self.mode {
            IndicationMode::Spatial => None,
            IndicationMode::SpatialTemporal => Some(particles.read_property::<PreviousSurfaceIndicator>()?),
        };
        let mut indicator = particles.write_property::<SurfaceIndicator>()?;

        let pos_div: &[T] = &pos_div;
        let previous: Option<&[i32]> = previous.as_deref();
        let inner = &relation.inner;

        Zip::indexed(&mut indicator[..]).par_for_each(|i, indicator| {
            let neighborhood = inner.neighborhood(i);
            let is_surface = pos_div[i] < self.threshold_by_dimensions || {
                let near_surface = self.is_very_near_free_surface(neighborhood, pos_div);
                match previous {
                    Some(previous) => near_surface && is_near_previous_surface(i, neighborhood, previous),
                    None => near_surface,
                }
            };
            *indicator = if is_surface { 1 } else { 0 };
        });

        Ok(())
    }

    /// Some inner neighbor within one smoothing length lies below the threshold.
    fn is_very_near_free_surface(&self, neighborhood: &Neighborhood<T, D>, pos_div: &[T]) -> bool {
        neighborhood
            .iter()
            .any(|n| pos_div[n.j] < self.threshold_by_dimensions && n.r_ij < self.smoothing_length)
    }
}

fn is_near_previous_surface<T: Real, const D: usize>(i: usize, neighborhood: &Neighborhood<T, D>, previous: &[i32]) -> bool {
    previous[i] == 1 || neighborhood.j().iter().any(|&j| previous[j] == 1)
}

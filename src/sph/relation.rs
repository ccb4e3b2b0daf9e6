//! Body relations
//!
//! A relation stores one [`Neighborhood`] per particle of its owning body.
//! The neighbor source is an explicit tag: the owning body itself (inner) or
//! one other body (contact). Contact relations keep their bodies in the order
//! given at construction; every kernel iterates them in that order.

use rayon::prelude::*;

use crate::body::{BodyId, SphSystem};
use crate::error::{Error, Result};
use crate::math::{Real, VectorN};
use crate::sph::kernel::Kernel;
use crate::sph::neighbor::{Neighbor, NeighborSearch, Neighborhood};
use crate::sph::property::Position;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NeighborSource {
    Inner,
    Contact(BodyId),
}

pub struct Relation<T: Real, const D: usize> {
    body: BodyId,
    source: NeighborSource,
    configuration: Vec<Neighborhood<T, D>>,
}

impl<T: Real, const D: usize> Relation<T, D> {
    pub fn inner(system: &SphSystem<T, D>, body: BodyId) -> Result<Self> {
        let num_particles = system.body(body)?.num_particles();
        Ok(Relation {
            body,
            source: NeighborSource::Inner,
            configuration: vec![Neighborhood::new(); num_particles],
        })
    }

    pub fn contact(system: &SphSystem<T, D>, body: BodyId, source: BodyId) -> Result<Self> {
        let owner = system.body(body)?;
        system.body(source)?;
        if body == source {
            return Err(Error::SelfContact { body: owner.name().to_owned() });
        }

        Ok(Relation {
            body,
            source: NeighborSource::Contact(source),
            configuration: vec![Neighborhood::new(); owner.num_particles()],
        })
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn source(&self) -> NeighborSource {
        self.source
    }

    /// Body the neighbor indices refer to.
    pub fn source_body(&self) -> BodyId {
        match self.source {
            NeighborSource::Inner => self.body,
            NeighborSource::Contact(source) => source,
        }
    }

    pub fn len(&self) -> usize {
        self.configuration.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configuration.is_empty()
    }

    pub fn neighborhood(&self, i: usize) -> &Neighborhood<T, D> {
        &self.configuration[i]
    }

    pub fn neighborhood_mut(&mut self, i: usize) -> &mut Neighborhood<T, D> {
        &mut self.configuration[i]
    }

    /// Verify that the relation belongs to `body` and covers all its particles.
    pub fn check(&self, system: &SphSystem<T, D>, body: BodyId) -> Result<()> {
        let owner = system.body(body)?;
        if self.body != body {
            return Err(Error::RelationMismatch {
                body: owner.name().to_owned(),
                reason: format!("relation is owned by body {}", self.body),
            });
        }
        if self.len() != owner.num_particles() {
            return Err(Error::RelationMismatch {
                body: owner.name().to_owned(),
                reason: format!(
                    "{} neighborhoods for {} particles",
                    self.len(),
                    owner.num_particles()
                ),
            });
        }
        Ok(())
    }

    /// Refill all neighborhoods from the current particle positions.
    ///
    /// Neighbor storage is reused; the configuration grows if particles were
    /// added to the owning body since the last update.
    pub fn update_configuration<K, S>(&mut self, system: &SphSystem<T, D>, kernel: &K, search: &mut S) -> Result<()>
    where
        K: Kernel<T>,
        S: NeighborSearch<T, D>,
    {
        let owner = system.body(self.body)?;
        self.configuration.resize(owner.num_particles(), Neighborhood::new());

        let positions_guard = owner.particles().read_property::<Position<T, D>>()?;
        let source_guard = match self.source {
            NeighborSource::Inner => None,
            NeighborSource::Contact(source) => Some(system.body(source)?.particles().read_property::<Position<T, D>>()?),
        };
        let positions: &[VectorN<T, D>] = &positions_guard;
        let source_positions: &[VectorN<T, D>] = match source_guard {
            Some(ref guard) => &**guard,
            None => positions,
        };

        search.build(source_positions);
        let search = &*search;
        let cutoff = kernel.cutoff();
        let inner = self.source == NeighborSource::Inner;

        self.configuration.par_iter_mut().enumerate().for_each(|(i, neighborhood)| {
            neighborhood.clear();
            let pos = positions[i];
            search.for_each_candidate(&pos, |j| {
                if inner && j == i {
                    return;
                }
                let diff = pos - source_positions[j];
                let r_ij = diff.norm();
                // coincident particles are kept, with a vanishing direction
                if r_ij < cutoff {
                    neighborhood.push(Neighbor {
                        j,
                        w_ij: kernel.w(r_ij),
                        dw_ij: kernel.dw(r_ij),
                        r_ij,
                        e_ij: diff / (r_ij + T::tiny()),
                    });
                }
            });
        });

        Ok(())
    }
}

/// Contact relations of one body, one per contacting body, in a fixed order.
pub struct ContactRelation<T: Real, const D: usize> {
    body: BodyId,
    contacts: Vec<Relation<T, D>>,
}

impl<T: Real, const D: usize> ContactRelation<T, D> {
    pub fn new(system: &SphSystem<T, D>, body: BodyId, contact_bodies: &[BodyId]) -> Result<Self> {
        let owner = system.body(body)?;
        if contact_bodies.is_empty() {
            return Err(Error::EmptyContactList { body: owner.name().to_owned() });
        }

        let contacts = contact_bodies
            .iter()
            .map(|&source| Relation::contact(system, body, source))
            .collect::<Result<Vec<_>>>()?;

        Ok(ContactRelation { body, contacts })
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn contact_bodies(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.contacts.iter().map(|relation| relation.source_body())
    }

    pub fn relations(&self) -> &[Relation<T, D>] {
        &self.contacts
    }

    pub fn relations_mut(&mut self) -> &mut [Relation<T, D>] {
        &mut self.contacts
    }

    pub fn check(&self, system: &SphSystem<T, D>, body: BodyId) -> Result<()> {
        self.contacts.iter().try_for_each(|relation| relation.check(system, body))
    }

    pub fn update_configuration<K, S>(&mut self, system: &SphSystem<T, D>, kernel: &K, search: &mut S) -> Result<()>
    where
        K: Kernel<T>,
        S: NeighborSearch<T, D>,
    {
        for relation in &mut self.contacts {
            relation.update_configuration(system, kernel, search)?;
        }
        Ok(())
    }
}

/// Inner relation of a body together with its (optional) contact relations.
pub struct ComplexRelation<T: Real, const D: usize> {
    pub inner: Relation<T, D>,
    pub contact: Option<ContactRelation<T, D>>,
}

impl<T: Real, const D: usize> ComplexRelation<T, D> {
    pub fn new(system: &SphSystem<T, D>, body: BodyId, contact_bodies: &[BodyId]) -> Result<Self> {
        Ok(ComplexRelation {
            inner: Relation::inner(system, body)?,
            contact: Some(ContactRelation::new(system, body, contact_bodies)?),
        })
    }

    pub fn inner_only(system: &SphSystem<T, D>, body: BodyId) -> Result<Self> {
        Ok(ComplexRelation {
            inner: Relation::inner(system, body)?,
            contact: None,
        })
    }

    pub fn body(&self) -> BodyId {
        self.inner.body()
    }

    /// Contact relations, empty for an inner-only relation.
    pub fn contacts(&self) -> &[Relation<T, D>] {
        match self.contact {
            Some(ref contact) => contact.relations(),
            None => &[],
        }
    }

    pub fn check(&self, system: &SphSystem<T, D>, body: BodyId) -> Result<()> {
        self.inner.check(system, body)?;
        match self.contact {
            Some(ref contact) => contact.check(system, body),
            None => Ok(()),
        }
    }

    pub fn update_configuration<K, S>(&mut self, system: &SphSystem<T, D>, kernel: &K, search: &mut S) -> Result<()>
    where
        K: Kernel<T>,
        S: NeighborSearch<T, D>,
    {
        self.inner.update_configuration(system, kernel, search)?;
        if let Some(ref mut contact) = self.contact {
            contact.update_configuration(system, kernel, search)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, BodyKind, Resolution};
    use crate::sph::kernel::WendlandC2;
    use crate::sph::neighbor::AllPairs;
    use na::Vector2;

    fn system() -> (SphSystem<f64, 2>, BodyId, BodyId) {
        let mut system = SphSystem::new();
        let mut fluid = Body::new("fluid", BodyKind::Fluid, 1000.0, Resolution::new(1.0).unwrap());
        fluid.particles_mut().add_particles(3).with::<Position<f64, 2>>(&[
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(10.0, 0.0),
        ]).unwrap();
        let mut wall = Body::new("wall", BodyKind::Wall, 1000.0, Resolution::new(1.0).unwrap());
        wall.particles_mut().add_particles(1).with::<Position<f64, 2>>(&[Vector2::new(0.0, -1.0)]).unwrap();

        let fluid = system.add_body(fluid);
        let wall = system.add_body(wall);
        (system, fluid, wall)
    }

    #[test]
    fn inner_configuration_skips_self() {
        let (system, fluid, _) = system();
        let kernel = WendlandC2::new(1.3, 2).unwrap();
        let mut inner = Relation::inner(&system, fluid).unwrap();
        inner.update_configuration(&system, &kernel, &mut AllPairs::new()).unwrap();

        assert_eq!(inner.neighborhood(0).j(), &[1]);
        assert_eq!(inner.neighborhood(1).j(), &[0]);
        assert!(inner.neighborhood(2).is_empty());

        let n = inner.neighborhood(0).get(0).unwrap();
        assert!((n.r_ij - 1.0).abs() < 1.0e-12);
        // points from neighbor to self
        assert!((n.e_ij - Vector2::new(-1.0, 0.0)).norm() < 1.0e-12);
        assert!(n.dw_ij < 0.0);
    }

    #[test]
    fn contact_configuration_indexes_source_body() {
        let (system, fluid, wall) = system();
        let kernel = WendlandC2::new(1.3, 2).unwrap();
        let mut contact = ContactRelation::new(&system, fluid, &[wall]).unwrap();
        contact.update_configuration(&system, &kernel, &mut AllPairs::new()).unwrap();

        let relation = &contact.relations()[0];
        assert_eq!(relation.source(), NeighborSource::Contact(wall));
        assert_eq!(relation.neighborhood(0).j(), &[0]);
        let n = relation.neighborhood(0).get(0).unwrap();
        assert!((n.e_ij - Vector2::new(0.0, 1.0)).norm() < 1.0e-12);
        assert!(relation.neighborhood(2).is_empty());
    }

    #[test]
    fn construction_errors() {
        let (system, fluid, _) = system();
        match ContactRelation::new(&system, fluid, &[]) {
            Err(Error::EmptyContactList { body }) => assert_eq!(body, "fluid"),
            _ => panic!("expected empty contact list error"),
        }
        assert!(matches!(Relation::contact(&system, fluid, fluid), Err(Error::SelfContact { .. })));
    }

    #[test]
    fn check_detects_stale_configuration() {
        let (mut system, fluid, _) = system();
        let inner = Relation::inner(&system, fluid).unwrap();
        assert!(inner.check(&system, fluid).is_ok());
        assert_eq!(inner.len(), 3);
        assert!(!inner.is_empty());

        system.body_mut(fluid).unwrap().particles_mut().add_particles(1);
        assert!(matches!(inner.check(&system, fluid), Err(Error::RelationMismatch { .. })));
    }

    #[test]
    fn coincident_contact_particle_is_kept() {
        let (mut system, fluid, wall) = system();
        system
            .body_mut(wall)
            .unwrap()
            .particles_mut()
            .add_particles(1)
            .with::<Position<f64, 2>>(&[Vector2::new(1.0, 0.0)])
            .unwrap();

        let kernel = WendlandC2::new(1.3, 2).unwrap();
        let mut contact = ContactRelation::new(&system, fluid, &[wall]).unwrap();
        contact.update_configuration(&system, &kernel, &mut AllPairs::new()).unwrap();

        let neighborhood = contact.relations()[0].neighborhood(1);
        let n = neighborhood.iter().find(|n| n.j == 1).unwrap();
        assert_eq!(n.r_ij, 0.0);
        assert_eq!(n.dw_ij, 0.0);
        assert!(n.e_ij.iter().all(|x| x.is_finite()));
        assert_eq!(n.e_ij.norm(), 0.0);
    }
}

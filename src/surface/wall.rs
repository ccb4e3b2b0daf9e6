//! Contact-angle correction of surface normals next to walls
//!
//! For every surface particle the nearest wall neighbor decides the
//! correction. Its wall normal `n_k` and the tangential part of the fluid
//! normal define the wetting direction
//!
//! ```text
//! n_i_w = normalize(n_i - (n_i . n_k) n_k) sin(theta) + n_k cos(theta)
//! ```
//!
//! which replaces the fluid normal within one smoothing length of the wall
//! and fades out over the next one.

use ndarray::Zip;

use crate::body::{BodyId, BodyKind, SphSystem};
use crate::error::{Error, Result};
use crate::math::{self, Real, VectorN};
use crate::sph::neighbor::Neighbor;
use crate::sph::property::WallNormal;
use crate::sph::relation::ContactRelation;

use super::property::{SurfaceIndicator, SurfaceNormal};

/// Initial nearest-wall distance.
const LARGE_DIST: f64 = 1.0e6;

pub struct SurfaceNormWithWall<T: Real, const D: usize> {
    body: BodyId,
    sin_contact_angle: T,
    cos_contact_angle: T,
    particle_spacing: T,
    smoothing_length: T,
    num_walls: usize,
}

impl<T: Real, const D: usize> SurfaceNormWithWall<T, D> {
    pub fn new(system: &SphSystem<T, D>, wall_relation: &ContactRelation<T, D>, contact_angle: T) -> Result<Self> {
        let body = wall_relation.body();
        wall_relation.check(system, body)?;

        let owner = system.body(body)?;
        owner.require::<SurfaceIndicator>()?;
        owner.require::<SurfaceNormal<T, D>>()?;
        for wall in wall_relation.contact_bodies() {
            let wall = system.body(wall)?;
            if wall.kind() != BodyKind::Wall {
                return Err(Error::NotAWall { body: wall.name().to_owned() });
            }
            wall.require::<WallNormal<T, D>>()?;
        }

        let resolution = owner.resolution();
        log::debug!(
            "wall normal correction for `{}`: contact angle {:?}, spacing {:?}, smoothing length {:?}",
            owner.name(),
            contact_angle,
            resolution.spacing,
            resolution.smoothing_length
        );

        Ok(SurfaceNormWithWall {
            body,
            sin_contact_angle: contact_angle.sin(),
            cos_contact_angle: contact_angle.cos(),
            particle_spacing: resolution.spacing,
            smoothing_length: resolution.smoothing_length,
            num_walls: wall_relation.relations().len(),
        })
    }

    pub fn particle_spacing(&self) -> T {
        self.particle_spacing
    }

    pub fn smoothing_length(&self) -> T {
        self.smoothing_length
    }

    /// Weight of the uncorrected normal at wall-normal distance `r_perp`.
    pub fn smoothing_factor(&self, r_perp: T) -> T {
        let h = self.smoothing_length;
        if r_perp <= h {
            T::zero()
        } else {
            ((r_perp - h) / h).min(T::one())
        }
    }

    /// Corrected normal of a particle with normal `n_i` whose nearest wall
    /// neighbor carries the wall normal `n_k`.
    pub fn corrected_normal(&self, n_i: &VectorN<T, D>, n_k: &VectorN<T, D>, neighbor: &Neighbor<T, D>) -> VectorN<T, D> {
        let n_t = math::normalize_guarded(&(n_i - n_k * n_i.dot(n_k)));
        let n_i_w = n_t * self.sin_contact_angle + n_k * self.cos_contact_angle;

        let r_perp = neighbor.r_ij * n_k.dot(&neighbor.e_ij);
        let s = self.smoothing_factor(r_perp);
        math::normalize_guarded(&(n_i * s + n_i_w * (T::one() - s)))
    }

    pub fn exec(&self, system: &SphSystem<T, D>, wall_relation: &ContactRelation<T, D>) -> Result<()> {
        wall_relation.check(system, self.body)?;
        let walls = wall_relation.relations();
        if walls.len() != self.num_walls {
            return Err(Error::RelationMismatch {
                body: system.body(self.body)?.name().to_owned(),
                reason: format!("{} wall bodies, expected {}", walls.len(), self.num_walls),
            });
        }

        let particles = system.body(self.body)?.particles();
        let indicator = particles.read_property::<SurfaceIndicator>()?;
        let mut surface_norm = particles.write_property::<SurfaceNormal<T, D>>()?;

        let wall_normals = walls
            .iter()
            .map(|wall| system.body(wall.source_body())?.particles().read_property::<WallNormal<T, D>>())
            .collect::<Result<Vec<_>>>()?;
        let wall_normals: Vec<&[VectorN<T, D>]> = wall_normals.iter().map(|n| &**n).collect();
        let indicator: &[i32] = &indicator;

        Zip::indexed(&mut surface_norm[..]).par_for_each(|i, surface_norm| {
            if indicator[i] != 1 {
                return;
            }

            let mut large_dist = T::new(LARGE_DIST);
            let mut nearest = None;
            for (k, wall) in walls.iter().enumerate() {
                for n in wall.neighborhood(i).iter() {
                    if n.r_ij < large_dist {
                        large_dist = n.r_ij;
                        nearest = Some((k, n));
                    }
                }
            }

            if let Some((k, n)) = nearest {
                *surface_norm = self.corrected_normal(surface_norm, &wall_normals[k][n.j], &n);
            }
        });

        Ok(())
    }
}

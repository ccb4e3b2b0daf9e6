//! Surface detection on a water block resting on a floor.
//!
//! Run with `RUST_LOG=debug` to follow the stages. An optional TOML file
//! with a `SurfaceConfig` can be passed as first argument.

use nalgebra::Vector2;
use std::{env, fs};

use sph_surface::sph::kernel::WendlandC2;
use sph_surface::sph::neighbor::AllPairs;
use sph_surface::sph::property::{Density, Mass, Position, Volume, WallNormal};
use sph_surface::sph::relation::{ComplexRelation, ContactRelation};
use sph_surface::surface::property::{SurfaceIndicator, SurfaceNormal};
use sph_surface::{Body, BodyKind, Resolution, SphSystem, SurfaceConfig, SurfaceDynamics};

const DP: f64 = 0.025;
const RHO0: f64 = 1000.0;

fn block(name: &str, kind: BodyKind, nx: usize, ny: usize, y0: f64) -> sph_surface::Result<Body<f64, 2>> {
    let positions = (0..nx)
        .flat_map(|i| (0..ny).map(move |j| Vector2::new((i as f64 + 0.5) * DP, y0 + (j as f64 + 0.5) * DP)))
        .collect::<Vec<_>>();
    let n = positions.len();

    let mut body = Body::new(name, kind, RHO0, Resolution::new(DP)?);
    let mut builder = body.particles_mut().add_particles(n);
    builder
        .with::<Position<f64, 2>>(&positions)?
        .with::<Volume<f64>>(&vec![DP * DP; n])?
        .with::<Mass<f64>>(&vec![RHO0 * DP * DP; n])?
        .with::<Density<f64>>(&vec![RHO0; n])?;
    if kind == BodyKind::Wall {
        builder.with::<WallNormal<f64, 2>>(&vec![Vector2::new(0.0, 1.0); n])?;
    }
    drop(builder);
    Ok(body)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => SurfaceConfig::from_toml_str(&fs::read_to_string(path)?)?,
        None => SurfaceConfig::default().with_contact_angle_degrees(60.0),
    };

    let mut system = SphSystem::new();
    let water = system.add_body(block("water", BodyKind::Fluid, 40, 20, 0.0)?);
    let floor = system.add_body(block("floor", BodyKind::Wall, 40, 3, -3.0 * DP)?);

    let kernel = WendlandC2::new(system.body(water)?.resolution().smoothing_length, 2)?;
    let mut search = AllPairs::new();
    let mut relation = ComplexRelation::new(&system, water, &[floor])?;
    relation.update_configuration(&system, &kernel, &mut search)?;
    let mut wall_relation = ContactRelation::new(&system, water, &[floor])?;
    wall_relation.update_configuration(&system, &kernel, &mut search)?;

    let dynamics = SurfaceDynamics::new(&system, &relation, Some(&wall_relation), &config)?;
    let summary = dynamics.exec(&system, &relation, Some(&wall_relation))?;
    log::info!(
        "{} of {} particles on the surface",
        summary.surface_particles,
        summary.total_particles
    );

    let particles = system.body(water)?.particles();
    let indicator = particles.read_property::<SurfaceIndicator>()?;
    let normal = particles.read_property::<SurfaceNormal<f64, 2>>()?;
    let positions = particles.read_property::<Position<f64, 2>>()?;
    for i in (0..indicator.len()).filter(|&i| indicator[i] == 1 && positions[i].y < 2.0 * DP) {
        println!(
            "x = {:.4}, y = {:.4}, n = ({:.4}, {:.4})",
            positions[i].x, positions[i].y, normal[i].x, normal[i].y
        );
    }

    Ok(())
}

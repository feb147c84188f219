//! The globe: a WGS84 ellipsoid with a latitude/longitude graticule.

use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use glam::DVec3;

use crate::floating_origin::FloatingOrigin;
use crate::geodesy::{GeoPosition, WGS84_SEMI_MAJOR_AXIS, WGS84_SEMI_MINOR_AXIS, geodetic_to_ecef};

/// Spacing between graticule lines, in degrees.
const GRATICULE_STEP_DEG: i32 = 15;

/// Segments per graticule line.
const GRATICULE_SEGMENTS: i32 = 96;

/// Plugin for globe rendering.
pub struct GlobePlugin;

impl Plugin for GlobePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (attach_globe_mesh, draw_graticule));
    }
}

/// Marker for the globe entity of a viewer.
#[derive(Component)]
pub struct Globe;

/// Give newly mounted globes their ellipsoid mesh.
fn attach_globe_mesh(
    mut commands: Commands,
    globes: Query<Entity, Added<Globe>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for entity in &globes {
        // Bevy's UV sphere has its poles on Y; the Earth's axis is ECEF Z.
        #[allow(clippy::cast_possible_truncation)]
        let scale = Vec3::new(
            WGS84_SEMI_MAJOR_AXIS as f32,
            WGS84_SEMI_MINOR_AXIS as f32,
            WGS84_SEMI_MAJOR_AXIS as f32,
        );
        commands.entity(entity).insert((
            Mesh3d(meshes.add(Sphere::new(1.0).mesh().uv(128, 64))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgb(0.16, 0.33, 0.55),
                perceptual_roughness: 0.9,
                ..default()
            })),
            Transform::from_rotation(Quat::from_rotation_x(FRAC_PI_2)).with_scale(scale),
        ));
    }
}

/// Points along a parallel (`latitude` fixed) or meridian (`longitude` fixed).
fn graticule_line(fixed: f64, along_parallel: bool) -> impl Iterator<Item = DVec3> {
    (0..=GRATICULE_SEGMENTS).map(move |i| {
        let t = f64::from(i) / f64::from(GRATICULE_SEGMENTS);
        let position = if along_parallel {
            GeoPosition::new(fixed, -180.0 + 360.0 * t, 0.0)
        } else {
            GeoPosition::new(-90.0 + 180.0 * t, fixed, 0.0)
        };
        geodetic_to_ecef(position)
    })
}

#[allow(clippy::needless_pass_by_value)]
fn draw_graticule(
    mut gizmos: Gizmos,
    origin: Res<FloatingOrigin>,
    globes: Query<(), With<Globe>>,
) {
    if globes.is_empty() {
        return;
    }

    let color = Color::srgba(1.0, 1.0, 1.0, 0.25);
    let relative = |p: DVec3| (p - origin.position).as_vec3();

    for lat in (-90 + GRATICULE_STEP_DEG..90).step_by(GRATICULE_STEP_DEG as usize) {
        gizmos.linestrip(graticule_line(f64::from(lat), true).map(relative), color);
    }
    for lon in (-180..180).step_by(GRATICULE_STEP_DEG as usize) {
        gizmos.linestrip(graticule_line(f64::from(lon), false).map(relative), color);
    }
}

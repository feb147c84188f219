//! Floating origin for rendering an Earth-sized scene with f32 transforms.
//!
//! ECEF coordinates are millions of meters, which is beyond f32 precision.
//! Entities keep their true position in f64 and are rendered relative to
//! the viewer camera, which always sits at the render origin.

use bevy::prelude::*;
use bevy::transform::TransformSystems;
use glam::DVec3;

/// Plugin for the floating origin coordinate system.
pub struct FloatingOriginPlugin;

impl Plugin for FloatingOriginPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FloatingOrigin>().add_systems(
            PostUpdate,
            (sync_floating_origin, update_transforms_relative_to_origin)
                .chain()
                .before(TransformSystems::Propagate),
        );
    }
}

/// The floating origin position in ECEF coordinates.
#[derive(Resource, Default)]
pub struct FloatingOrigin {
    /// Current origin position in ECEF coordinates (meters).
    pub position: DVec3,
}

/// High-precision world position for an entity, in ECEF meters.
///
/// The entity's `Transform` translation is derived from this every frame.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct WorldPosition {
    pub position: DVec3,
}

impl WorldPosition {
    pub fn from_dvec3(position: DVec3) -> Self {
        Self { position }
    }
}

/// Marker for the camera that defines the floating origin.
#[derive(Component, Clone, Copy, Debug)]
pub struct FloatingOriginCamera {
    /// Camera's world position in ECEF coordinates (meters).
    pub position: DVec3,
}

impl FloatingOriginCamera {
    pub fn new(position: DVec3) -> Self {
        Self { position }
    }
}

/// Follow the viewer camera with the origin.
fn sync_floating_origin(mut origin: ResMut<FloatingOrigin>, query: Query<&FloatingOriginCamera>) {
    if let Ok(camera) = query.single() {
        origin.position = camera.position;
    }
}

/// Recompute render-space translations relative to the origin.
///
/// Only root-level entities carry a `WorldPosition`; their children inherit
/// the translation through transform propagation.
fn update_transforms_relative_to_origin(
    origin: Res<FloatingOrigin>,
    mut query: Query<(&WorldPosition, &mut Transform), Without<FloatingOriginCamera>>,
) {
    for (world_pos, mut transform) in &mut query {
        transform.translation = (world_pos.position - origin.position).as_vec3();
    }
}

//! Placing catalog models on the globe.
//!
//! Placing a model replaces whatever was placed before: previous models are
//! despawned, one new entity is spawned at the catalog position and
//! orientation, and the camera starts tracking it.

use std::f64::consts::FRAC_PI_2;

use bevy::prelude::*;
use glam::{DQuat, DVec3};

use crate::camera::CAMERA_FOV_Y;
use crate::catalog::{ModelCatalog, ModelPlacement};
use crate::floating_origin::{FloatingOriginCamera, WorldPosition};
use crate::geodesy::{GeoPosition, HeadingPitchRoll, geodetic_to_ecef, heading_pitch_roll_quaternion};
use crate::mount::{ViewerInstance, ViewerMount};

/// Bounding radius assumed for models when computing on-screen size, in meters.
pub const NOMINAL_MODEL_RADIUS: f64 = 5.0;

/// Plugin for model placement.
pub struct ModelPlugin;

impl Plugin for ModelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ModelCatalog>()
            .init_resource::<ModelRequests>()
            .init_resource::<TrackedEntity>()
            .init_resource::<SelectedEntity>()
            .add_systems(Update, (process_model_requests, clear_stale_targets).chain());
    }
}

/// Plugin that loads the glTF scene of placed models and keeps them visible.
pub struct ModelScenePlugin;

impl Plugin for ModelScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (attach_model_scene, scale_models_to_pixel_size));
    }
}

// ============================================================================
// Components and resources
// ============================================================================

/// A model placed on the globe.
#[derive(Component, Debug, Clone)]
pub struct PlacedModel {
    pub label: String,
    /// Asset path of the glTF model.
    pub model: String,
    pub position: GeoPosition,
    pub orientation: HeadingPitchRoll,
    pub minimum_pixel_size: f32,
    pub maximum_scale: f32,
}

/// Pending placement requests, by catalog label.
#[derive(Resource, Default)]
pub struct ModelRequests {
    pending: Vec<String>,
}

impl ModelRequests {
    /// Request that the catalog entry with `label` be placed.
    pub fn request_place(&mut self, label: impl Into<String>) {
        self.pending.push(label.into());
    }
}

/// The entity the camera follows, if any.
#[derive(Resource, Default, Debug)]
pub struct TrackedEntity(pub Option<Entity>);

/// The entity described by the info box and selection indicator, if any.
#[derive(Resource, Default, Debug)]
pub struct SelectedEntity(pub Option<Entity>);

// ============================================================================
// Placement
// ============================================================================

/// World rotation of a glTF model placed at `position` with `orientation`.
///
/// glTF models are Y-up; they are turned Z-up before the local orientation
/// is applied.
pub fn model_rotation(position: DVec3, orientation: HeadingPitchRoll) -> Quat {
    let y_up_to_z_up = DQuat::from_rotation_x(FRAC_PI_2);
    (heading_pitch_roll_quaternion(position, orientation) * y_up_to_z_up).as_quat()
}

/// Scale that keeps a model at least `minimum_pixel_size` pixels tall.
///
/// Never shrinks the model and never exceeds `maximum_scale`.
pub fn pixel_size_scale(
    distance: f64,
    fov_y: f64,
    viewport_height: f64,
    radius: f64,
    minimum_pixel_size: f64,
    maximum_scale: f64,
) -> f64 {
    if viewport_height <= 0.0 || radius <= 0.0 {
        return 1.0;
    }

    let meters_per_pixel = 2.0 * distance * (fov_y / 2.0).tan() / viewport_height;
    if meters_per_pixel <= 0.0 {
        return 1.0;
    }

    let diameter_pixels = 2.0 * radius / meters_per_pixel;
    if diameter_pixels >= minimum_pixel_size {
        return 1.0;
    }

    (minimum_pixel_size * meters_per_pixel / (2.0 * radius)).min(maximum_scale)
}

/// Replace all placed models under `root` with one built from `placement`.
pub fn place_model(
    commands: &mut Commands,
    root: Entity,
    placement: &ModelPlacement,
    existing: impl IntoIterator<Item = Entity>,
) -> Entity {
    for entity in existing {
        commands.entity(entity).despawn();
    }

    let orientation = placement.orientation.to_heading_pitch_roll();
    let position = geodetic_to_ecef(placement.position);

    commands
        .spawn((
            Name::new(placement.label.clone()),
            PlacedModel {
                label: placement.label.clone(),
                model: placement.model.clone(),
                position: placement.position,
                orientation,
                minimum_pixel_size: placement.minimum_pixel_size,
                maximum_scale: placement.maximum_scale,
            },
            WorldPosition::from_dvec3(position),
            Transform::from_rotation(model_rotation(position, orientation)),
            Visibility::default(),
            ChildOf(root),
        ))
        .id()
}

// ============================================================================
// Systems
// ============================================================================

/// Place the last valid requested model once a viewer is mounted.
#[allow(clippy::needless_pass_by_value)]
fn process_model_requests(
    mut commands: Commands,
    mut requests: ResMut<ModelRequests>,
    catalog: Res<ModelCatalog>,
    mount: Res<ViewerMount>,
    placed: Query<Entity, With<PlacedModel>>,
    mut tracked: ResMut<TrackedEntity>,
    mut selected: ResMut<SelectedEntity>,
) {
    let Some(root) = mount.root() else {
        return;
    };
    if requests.pending.is_empty() {
        return;
    }

    let mut placement = None;
    for label in std::mem::take(&mut requests.pending) {
        match catalog.get(&label) {
            Some(entry) => placement = Some(entry),
            None => tracing::warn!("No catalog entry labelled '{label}'"),
        }
    }
    let Some(placement) = placement else {
        return;
    };

    let entity = place_model(&mut commands, root, placement, placed.iter());
    tracked.0 = Some(entity);
    selected.0 = Some(entity);
    tracing::info!(
        "Placed '{}' at ({:.5}, {:.5}, {:.0} m)",
        placement.label,
        placement.position.latitude,
        placement.position.longitude,
        placement.position.height
    );
}

/// Forget tracked or selected entities that no longer exist.
fn clear_stale_targets(
    mut tracked: ResMut<TrackedEntity>,
    mut selected: ResMut<SelectedEntity>,
    placed: Query<(), With<PlacedModel>>,
) {
    if tracked.0.is_some_and(|entity| !placed.contains(entity)) {
        tracked.0 = None;
    }
    if selected.0.is_some_and(|entity| !placed.contains(entity)) {
        selected.0 = None;
    }
}

fn attach_model_scene(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    models: Query<(Entity, &PlacedModel), Added<PlacedModel>>,
) {
    for (entity, model) in &models {
        tracing::debug!("Loading model scene {}", model.model);
        commands.entity(entity).insert(SceneRoot(
            asset_server.load(GltfAssetLabel::Scene(0).from_asset(model.model.clone())),
        ));
    }
}

#[allow(clippy::cast_possible_truncation)]
fn scale_models_to_pixel_size(
    cameras: Query<&FloatingOriginCamera>,
    viewers: Query<&ViewerInstance>,
    windows: Query<&Window>,
    mut models: Query<(&PlacedModel, &WorldPosition, &mut Transform)>,
) {
    let (Ok(camera), Ok(viewer)) = (cameras.single(), viewers.single()) else {
        return;
    };
    // The mount point may have been resized since construction.
    let Ok(window) = windows.get(viewer.mount_point) else {
        return;
    };

    for (model, world_position, mut transform) in &mut models {
        let distance = (world_position.position - camera.position).length();
        let scale = pixel_size_scale(
            distance,
            f64::from(CAMERA_FOV_Y),
            f64::from(window.height()),
            NOMINAL_MODEL_RADIUS,
            f64::from(model.minimum_pixel_size),
            f64::from(model.maximum_scale),
        );
        transform.scale = Vec3::splat(scale as f32);
    }
}

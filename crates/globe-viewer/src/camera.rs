//! Globe camera: orbiting the Earth, or following a tracked model.
//!
//! Without a tracked entity the camera orbits the Earth's center, looking
//! straight down from a latitude, longitude and altitude. Dragging with the
//! left mouse button moves over the surface and the scroll wheel changes
//! altitude. While a model is tracked the camera circles it instead, and the
//! same inputs change heading, pitch and range.
//!
//! The camera always renders from the origin; its true position lives in
//! [`FloatingOriginCamera`].

use bevy::ecs::message::MessageReader;
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy_egui::input::egui_wants_any_pointer_input;
use glam::DVec3;

use crate::floating_origin::{FloatingOriginCamera, WorldPosition};
use crate::geodesy::{GeoPosition, east_north_up_frame, geodetic_surface_normal, geodetic_to_ecef};
use crate::models::TrackedEntity;

/// Vertical field of view of the viewer camera, in radians.
pub const CAMERA_FOV_Y: f32 = std::f32::consts::FRAC_PI_4;

/// Lowest orbit altitude in meters.
pub const MIN_ALTITUDE: f64 = 100.0;
/// Highest orbit altitude in meters.
pub const MAX_ALTITUDE: f64 = 50_000_000.0;
/// Closest tracking range in meters.
pub const MIN_RANGE: f64 = 10.0;
/// Farthest tracking range in meters.
pub const MAX_RANGE: f64 = 1_000_000.0;

/// Orbit latitudes stop short of the poles.
const MAX_ORBIT_LATITUDE: f64 = 89.0;
/// Tracking pitch limits in radians.
const MIN_TRACKING_PITCH: f64 = -std::f64::consts::FRAC_PI_2 + 0.01;
const MAX_TRACKING_PITCH: f64 = 0.0;

/// Scroll factor per wheel line.
const ZOOM_STEP: f64 = 1.1;
/// Radians per pixel of drag while tracking.
const ROTATE_SENSITIVITY: f64 = 0.005;

/// Plugin for the globe camera.
pub struct CameraControllerPlugin;

impl Plugin for CameraControllerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                attach_camera,
                (camera_drag, camera_zoom).run_if(not(egui_wants_any_pointer_input)),
                update_camera_pose,
            )
                .chain(),
        );
    }
}

/// State of the viewer camera.
#[derive(Component, Debug, Clone, Copy)]
pub struct GlobeCamera {
    /// Orbit latitude in degrees.
    pub latitude: f64,
    /// Orbit longitude in degrees.
    pub longitude: f64,
    /// Orbit height above the ellipsoid in meters.
    pub altitude: f64,
    /// Tracking heading in radians, clockwise from north.
    pub heading: f64,
    /// Tracking pitch in radians; negative looks down at the target.
    pub pitch: f64,
    /// Tracking distance from the target in meters.
    pub range: f64,
}

impl Default for GlobeCamera {
    fn default() -> Self {
        Self {
            latitude: 40.0,
            longitude: -100.0,
            altitude: 20_000_000.0,
            heading: 0.0,
            pitch: -std::f64::consts::FRAC_PI_6,
            range: 250.0,
        }
    }
}

impl GlobeCamera {
    /// Orbit eye position in ECEF.
    pub fn eye(&self) -> DVec3 {
        geodetic_to_ecef(GeoPosition::new(
            self.latitude,
            self.longitude,
            self.altitude,
        ))
    }

    /// Move over the surface by a drag of `delta` pixels.
    ///
    /// The ground moves with the cursor, so the distance covered per pixel
    /// grows with altitude.
    pub fn orbit_drag(&mut self, delta: Vec2, viewport_height: f32) {
        let viewport_height = f64::from(viewport_height.max(1.0));
        let meters_per_pixel =
            2.0 * self.altitude * (f64::from(CAMERA_FOV_Y) / 2.0).tan() / viewport_height;
        let degrees_per_pixel = (meters_per_pixel / 111_320.0).min(1.0);

        self.latitude = (self.latitude + f64::from(delta.y) * degrees_per_pixel)
            .clamp(-MAX_ORBIT_LATITUDE, MAX_ORBIT_LATITUDE);
        self.longitude =
            (self.longitude - f64::from(delta.x) * degrees_per_pixel + 180.0).rem_euclid(360.0)
                - 180.0;
    }

    /// Circle the tracked target by a drag of `delta` pixels.
    pub fn tracking_drag(&mut self, delta: Vec2) {
        self.heading = (self.heading + f64::from(delta.x) * ROTATE_SENSITIVITY)
            .rem_euclid(std::f64::consts::TAU);
        self.pitch = (self.pitch - f64::from(delta.y) * ROTATE_SENSITIVITY)
            .clamp(MIN_TRACKING_PITCH, MAX_TRACKING_PITCH);
    }

    /// Zoom by `lines` scroll lines; positive zooms in.
    pub fn zoom(&mut self, lines: f32, tracking: bool) {
        let factor = ZOOM_STEP.powf(-f64::from(lines));
        if tracking {
            self.range = (self.range * factor).clamp(MIN_RANGE, MAX_RANGE);
        } else {
            self.altitude = (self.altitude * factor).clamp(MIN_ALTITUDE, MAX_ALTITUDE);
        }
    }
}

/// Eye position for looking at `target` from `range` meters away.
///
/// `heading` is clockwise from north and `pitch` is the view's elevation,
/// so a pitch of -90 degrees looks straight down on the target.
pub fn tracking_eye(target: DVec3, heading: f64, pitch: f64, range: f64) -> DVec3 {
    let forward_enu = DVec3::new(
        heading.sin() * pitch.cos(),
        heading.cos() * pitch.cos(),
        pitch.sin(),
    );
    target - east_north_up_frame(target) * forward_enu * range
}

/// Pose of the camera in ECEF: eye position, view direction and up.
fn camera_pose(camera: &GlobeCamera, target: Option<DVec3>) -> (DVec3, DVec3, DVec3) {
    match target {
        Some(target) => {
            let eye = tracking_eye(target, camera.heading, camera.pitch, camera.range);
            (eye, target - eye, geodetic_surface_normal(target))
        }
        None => {
            let eye = camera.eye();
            (eye, -eye, DVec3::Z)
        }
    }
}

// ============================================================================
// Systems
// ============================================================================

fn attach_camera(mut commands: Commands, cameras: Query<Entity, Added<GlobeCamera>>) {
    for entity in &cameras {
        commands.entity(entity).insert((
            Camera3d::default(),
            Projection::Perspective(PerspectiveProjection {
                fov: CAMERA_FOV_Y,
                near: 1.0,
                far: 100_000_000.0,
                ..Default::default()
            }),
        ));
    }
}

#[allow(clippy::needless_pass_by_value)]
fn camera_drag(
    mut mouse_motion: MessageReader<MouseMotion>,
    mouse: Res<ButtonInput<MouseButton>>,
    tracked: Res<TrackedEntity>,
    windows: Query<&Window>,
    mut cameras: Query<&mut GlobeCamera>,
) {
    let mut delta = Vec2::ZERO;
    for event in mouse_motion.read() {
        delta += event.delta;
    }
    if delta == Vec2::ZERO || !mouse.pressed(MouseButton::Left) {
        return;
    }

    let viewport_height = windows.iter().next().map_or(1.0, Window::height);
    for mut camera in &mut cameras {
        if tracked.0.is_some() {
            camera.tracking_drag(delta);
        } else {
            camera.orbit_drag(delta, viewport_height);
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn camera_zoom(
    mut scroll_events: MessageReader<MouseWheel>,
    tracked: Res<TrackedEntity>,
    mut cameras: Query<&mut GlobeCamera>,
) {
    let mut lines = 0.0;
    for event in scroll_events.read() {
        // Normalize scroll value: web reports pixels, native reports lines.
        lines += match event.unit {
            MouseScrollUnit::Line => event.y,
            MouseScrollUnit::Pixel => event.y / 120.0,
        };
    }
    if lines == 0.0 {
        return;
    }

    for mut camera in &mut cameras {
        camera.zoom(lines, tracked.0.is_some());
    }
}

/// Place the camera for the current mode.
#[allow(clippy::needless_pass_by_value)]
fn update_camera_pose(
    tracked: Res<TrackedEntity>,
    targets: Query<&WorldPosition>,
    mut cameras: Query<(&GlobeCamera, &mut FloatingOriginCamera, &mut Transform)>,
) {
    let target = tracked
        .0
        .and_then(|entity| targets.get(entity).ok())
        .map(|world_position| world_position.position);

    for (camera, mut origin_camera, mut transform) in &mut cameras {
        let (eye, direction, up) = camera_pose(camera, target);
        origin_camera.position = eye;
        transform.translation = Vec3::ZERO;
        transform.look_to(direction.normalize().as_vec3(), up.as_vec3());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::ecef_to_geodetic;

    #[test]
    fn test_default_eye_altitude() {
        let camera = GlobeCamera::default();
        let eye = ecef_to_geodetic(camera.eye());
        assert!((eye.latitude - 40.0).abs() < 1e-6);
        assert!((eye.longitude + 100.0).abs() < 1e-6);
        assert!((eye.height - 20_000_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_tracking_eye_straight_down_is_above_target() {
        let target = geodetic_to_ecef(GeoPosition::new(44.05, -123.07, 0.0));
        let eye = tracking_eye(target, 0.7, -std::f64::consts::FRAC_PI_2, 500.0);
        let above = target + geodetic_surface_normal(target) * 500.0;
        assert!((eye - above).length() < 1e-6);
    }

    #[test]
    fn test_tracking_eye_level_heading_north_is_south_of_target() {
        let target = geodetic_to_ecef(GeoPosition::new(10.0, 20.0, 0.0));
        let eye = tracking_eye(target, 0.0, 0.0, 1000.0);
        assert!(((eye - target).length() - 1000.0).abs() < 1e-6);

        // Looking north from south of the target.
        let eye_geo = ecef_to_geodetic(eye);
        assert!(eye_geo.latitude < 10.0);
        assert!((eye_geo.longitude - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = GlobeCamera::default();
        camera.zoom(-1000.0, false);
        assert_eq!(camera.altitude, MAX_ALTITUDE);
        camera.zoom(1000.0, false);
        assert_eq!(camera.altitude, MIN_ALTITUDE);

        camera.zoom(1000.0, true);
        assert_eq!(camera.range, MIN_RANGE);
        // Orbit altitude is untouched while tracking.
        assert_eq!(camera.altitude, MIN_ALTITUDE);
    }

    #[test]
    fn test_orbit_drag_keeps_latitude_off_the_poles() {
        let mut camera = GlobeCamera::default();
        for _ in 0..100 {
            camera.orbit_drag(Vec2::new(0.0, 500.0), 600.0);
        }
        assert_eq!(camera.latitude, MAX_ORBIT_LATITUDE);
        assert!((-180.0..180.0).contains(&camera.longitude));
    }

    #[test]
    fn test_tracking_drag_keeps_pitch_below_horizon() {
        let mut camera = GlobeCamera::default();
        camera.tracking_drag(Vec2::new(0.0, -10_000.0));
        assert_eq!(camera.pitch, MAX_TRACKING_PITCH);
        camera.tracking_drag(Vec2::new(0.0, 10_000.0));
        assert_eq!(camera.pitch, MIN_TRACKING_PITCH);
    }

    #[test]
    fn test_orbit_pose_looks_at_earth_center() {
        let camera = GlobeCamera::default();
        let (eye, direction, _) = camera_pose(&camera, None);
        assert!((direction.normalize() + eye.normalize()).length() < 1e-9);
    }
}

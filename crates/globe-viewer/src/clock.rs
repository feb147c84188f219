//! Viewer clock and sun.
//!
//! The clock starts at the current UTC time of day and only advances while
//! the mounted viewer was constructed with `should_animate`. The sun's
//! direction follows the clock.

use bevy::light::light_consts::lux;
use bevy::prelude::*;
use glam::DVec3;
use web_time::SystemTime;

use crate::mount::ViewerInstance;

/// Seconds in an hour.
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Seconds in a day.
const SECONDS_PER_DAY: f64 = 86400.0;

/// Plugin for the viewer clock and sun lighting.
pub struct ClockPlugin;

impl Plugin for ClockPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewerClock>().add_systems(
            Update,
            (attach_sun_light, tick_clock, update_sun_direction).chain(),
        );
    }
}

/// Simulation time of the viewer.
#[derive(Resource, Debug, Clone, Copy)]
pub struct ViewerClock {
    /// Seconds since midnight UTC (0-86400).
    pub utc_seconds: f64,
    /// Simulation seconds per real second.
    pub multiplier: f64,
}

impl Default for ViewerClock {
    fn default() -> Self {
        Self {
            utc_seconds: current_utc_seconds(),
            multiplier: 1.0,
        }
    }
}

impl ViewerClock {
    /// Advance by `delta_secs` real seconds if animating.
    pub fn advance(&mut self, delta_secs: f64, animate: bool) {
        if !animate {
            return;
        }
        self.utc_seconds = (self.utc_seconds + delta_secs * self.multiplier).rem_euclid(SECONDS_PER_DAY);
    }

    /// Hours since midnight UTC.
    pub fn utc_hours(&self) -> f64 {
        self.utc_seconds / SECONDS_PER_HOUR
    }
}

/// The viewer's sun.
#[derive(Component, Debug, Clone, Copy)]
pub struct Sun {
    /// Whether the sun casts shadows.
    pub shadows: bool,
}

/// Direction from the Earth's center towards the sun, in ECEF.
///
/// Ignores the Earth's axial tilt; the sun stays over the equator.
pub fn sun_direction(utc_seconds: f64) -> DVec3 {
    let hours = utc_seconds / SECONDS_PER_HOUR;
    // At noon UTC the sun is over the prime meridian, moving west 15 degrees an hour.
    let longitude = ((12.0 - hours) * 15.0).to_radians();
    DVec3::new(longitude.cos(), longitude.sin(), 0.0)
}

/// Current UTC time as seconds since midnight.
fn current_utc_seconds() -> f64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
        .rem_euclid(SECONDS_PER_DAY)
}

fn attach_sun_light(mut commands: Commands, suns: Query<(Entity, &Sun), Added<Sun>>) {
    for (entity, sun) in &suns {
        commands.entity(entity).insert(DirectionalLight {
            color: Color::WHITE,
            illuminance: lux::AMBIENT_DAYLIGHT,
            shadows_enabled: sun.shadows,
            ..default()
        });
    }
}

#[allow(clippy::needless_pass_by_value)]
fn tick_clock(time: Res<Time>, mut clock: ResMut<ViewerClock>, viewers: Query<&ViewerInstance>) {
    let Ok(viewer) = viewers.single() else {
        return;
    };
    clock.advance(time.delta_secs_f64(), viewer.options.should_animate);
}

#[allow(clippy::needless_pass_by_value)]
fn update_sun_direction(clock: Res<ViewerClock>, mut suns: Query<&mut Transform, With<Sun>>) {
    let direction = sun_direction(clock.utc_seconds).as_vec3();
    for mut transform in &mut suns {
        // Directional lights shine along their forward axis.
        transform.look_to(-direction, Vec3::Z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_at(utc_seconds: f64) -> ViewerClock {
        ViewerClock {
            utc_seconds,
            multiplier: 1.0,
        }
    }

    #[test]
    fn test_paused_clock_does_not_advance() {
        let mut clock = clock_at(1000.0);
        clock.advance(10.0, false);
        assert_eq!(clock.utc_seconds, 1000.0);
    }

    #[test]
    fn test_clock_advances_with_multiplier() {
        let mut clock = clock_at(1000.0);
        clock.multiplier = 60.0;
        clock.advance(2.0, true);
        assert_eq!(clock.utc_seconds, 1120.0);
    }

    #[test]
    fn test_clock_wraps_at_midnight() {
        let mut clock = clock_at(SECONDS_PER_DAY - 1.0);
        clock.advance(3.0, true);
        assert!((clock.utc_seconds - 2.0).abs() < 1e-9);
        assert!(clock.utc_hours() < 0.001);
    }

    #[test]
    fn test_sun_direction() {
        let noon = sun_direction(12.0 * SECONDS_PER_HOUR);
        assert!((noon - DVec3::X).length() < 1e-9);

        // Six hours later the sun is over 90 degrees west.
        let evening = sun_direction(18.0 * SECONDS_PER_HOUR);
        assert!((evening - DVec3::NEG_Y).length() < 1e-9);
    }
}

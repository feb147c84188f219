//! Geodetic coordinate conversion on the WGS84 ellipsoid.
//!
//! Positions in the viewer are ECEF (Earth-Centered, Earth-Fixed) meters in
//! f64. Geographic positions are latitude/longitude in degrees plus a height
//! above the ellipsoid in meters.

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis in meters.
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS84 semi-minor axis in meters.
pub const WGS84_SEMI_MINOR_AXIS: f64 = 6_356_752.314_245_179;

/// Squared radii of the WGS84 ellipsoid.
const RADII_SQUARED: DVec3 = DVec3::new(
    WGS84_SEMI_MAJOR_AXIS * WGS84_SEMI_MAJOR_AXIS,
    WGS84_SEMI_MAJOR_AXIS * WGS84_SEMI_MAJOR_AXIS,
    WGS84_SEMI_MINOR_AXIS * WGS84_SEMI_MINOR_AXIS,
);

/// Below this distance from the polar axis a point is treated as a pole.
const POLAR_EPSILON: f64 = 1e-9;

/// A geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
    /// Height above the ellipsoid in meters.
    #[serde(default)]
    pub height: f64,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64, height: f64) -> Self {
        Self {
            latitude,
            longitude,
            height,
        }
    }
}

/// Orientation relative to the local east-north-up frame, in radians.
///
/// Heading is the rotation about the negative up axis, pitch about the
/// negative north axis and roll about the east axis. With all three at zero
/// an object's +X axis points east.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeadingPitchRoll {
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl HeadingPitchRoll {
    pub fn from_degrees(heading: f64, pitch: f64, roll: f64) -> Self {
        Self {
            heading: heading.to_radians(),
            pitch: pitch.to_radians(),
            roll: roll.to_radians(),
        }
    }

    /// Rotation in the local frame.
    pub fn to_quaternion(self) -> DQuat {
        let heading = DQuat::from_rotation_z(-self.heading);
        let pitch = DQuat::from_rotation_y(-self.pitch);
        let roll = DQuat::from_rotation_x(self.roll);
        heading * pitch * roll
    }
}

/// Convert a geographic position to ECEF coordinates.
pub fn geodetic_to_ecef(position: GeoPosition) -> DVec3 {
    let lat = position.latitude.to_radians();
    let lon = position.longitude.to_radians();

    let normal = DVec3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin());
    let k = RADII_SQUARED * normal;
    let gamma = normal.dot(k).sqrt();

    k / gamma + normal * position.height
}

/// Convert ECEF coordinates to a geographic position.
///
/// Iterates on the geodetic latitude; converges to sub-millimetre accuracy
/// for any point outside the Earth's core.
pub fn ecef_to_geodetic(position: DVec3) -> GeoPosition {
    let a = WGS84_SEMI_MAJOR_AXIS;
    let b = WGS84_SEMI_MINOR_AXIS;
    let e2 = 1.0 - (b * b) / (a * a);

    let p = position.x.hypot(position.y);
    if p < POLAR_EPSILON {
        let latitude = if position.z >= 0.0 { 90.0 } else { -90.0 };
        return GeoPosition::new(latitude, 0.0, position.z.abs() - b);
    }

    let longitude = position.y.atan2(position.x);
    let mut latitude = position.z.atan2(p * (1.0 - e2));
    let mut height = 0.0;
    for _ in 0..8 {
        let sin_lat = latitude.sin();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        height = p / latitude.cos() - n;
        latitude = position.z.atan2(p * (1.0 - e2 * n / (n + height)));
    }

    GeoPosition::new(latitude.to_degrees(), longitude.to_degrees(), height)
}

/// Unit normal to the ellipsoid surface below `position`.
pub fn geodetic_surface_normal(position: DVec3) -> DVec3 {
    (position / RADII_SQUARED).normalize()
}

/// Local east-north-up frame at `origin`, as columns of a rotation matrix.
///
/// At the poles (and the Earth's center) east is fixed to +Y.
pub fn east_north_up_frame(origin: DVec3) -> DMat3 {
    if origin.x.abs() < POLAR_EPSILON && origin.y.abs() < POLAR_EPSILON {
        let up = if origin.z < 0.0 { -DVec3::Z } else { DVec3::Z };
        let east = DVec3::Y;
        return DMat3::from_cols(east, up.cross(east), up);
    }

    let up = geodetic_surface_normal(origin);
    let east = DVec3::new(-origin.y, origin.x, 0.0).normalize();
    let north = up.cross(east);
    DMat3::from_cols(east, north, up)
}

/// World orientation of an object at `origin` with the given local
/// heading, pitch and roll.
pub fn heading_pitch_roll_quaternion(origin: DVec3, hpr: HeadingPitchRoll) -> DQuat {
    DQuat::from_mat3(&east_north_up_frame(origin)) * hpr.to_quaternion()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_close(a: DVec3, b: DVec3, epsilon: f64) {
        assert!(
            (a - b).length() < epsilon,
            "expected {b:?}, got {a:?} (distance {})",
            (a - b).length()
        );
    }

    #[test]
    fn test_geodetic_to_ecef_equator() {
        let ecef = geodetic_to_ecef(GeoPosition::new(0.0, 0.0, 0.0));
        assert_close(ecef, DVec3::new(WGS84_SEMI_MAJOR_AXIS, 0.0, 0.0), 1e-6);

        let ecef = geodetic_to_ecef(GeoPosition::new(0.0, 90.0, 100.0));
        assert_close(ecef, DVec3::new(0.0, WGS84_SEMI_MAJOR_AXIS + 100.0, 0.0), 1e-6);
    }

    #[test]
    fn test_geodetic_to_ecef_pole() {
        let ecef = geodetic_to_ecef(GeoPosition::new(90.0, 0.0, 0.0));
        assert_close(ecef, DVec3::new(0.0, 0.0, WGS84_SEMI_MINOR_AXIS), 1e-6);
    }

    #[test]
    fn test_ecef_to_geodetic_recovers_catalog_site() {
        let site = GeoPosition::new(44.050_370_6, -123.074_461_9, 5000.0);
        let recovered = ecef_to_geodetic(geodetic_to_ecef(site));
        assert!((recovered.latitude - site.latitude).abs() < 1e-9);
        assert!((recovered.longitude - site.longitude).abs() < 1e-9);
        assert!((recovered.height - site.height).abs() < 1e-3);
    }

    #[test]
    fn test_ecef_to_geodetic_pole() {
        let south = ecef_to_geodetic(DVec3::new(0.0, 0.0, -WGS84_SEMI_MINOR_AXIS - 10.0));
        assert_eq!(south.latitude, -90.0);
        assert!((south.height - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_enu_at_prime_meridian() {
        let frame = east_north_up_frame(DVec3::new(WGS84_SEMI_MAJOR_AXIS, 0.0, 0.0));
        assert_close(frame.x_axis, DVec3::Y, EPSILON);
        assert_close(frame.y_axis, DVec3::Z, EPSILON);
        assert_close(frame.z_axis, DVec3::X, EPSILON);
    }

    #[test]
    fn test_enu_at_north_pole() {
        let frame = east_north_up_frame(DVec3::new(0.0, 0.0, WGS84_SEMI_MINOR_AXIS));
        assert_close(frame.x_axis, DVec3::Y, EPSILON);
        assert_close(frame.y_axis, -DVec3::X, EPSILON);
        assert_close(frame.z_axis, DVec3::Z, EPSILON);
    }

    #[test]
    fn test_zero_orientation_points_east() {
        let origin = DVec3::new(WGS84_SEMI_MAJOR_AXIS, 0.0, 0.0);
        let rotation = heading_pitch_roll_quaternion(origin, HeadingPitchRoll::default());
        assert_close(rotation * DVec3::X, DVec3::Y, EPSILON);
        assert_close(rotation * DVec3::Z, DVec3::X, EPSILON);
    }

    #[test]
    fn test_heading_rotates_clockwise_from_east() {
        let origin = DVec3::new(WGS84_SEMI_MAJOR_AXIS, 0.0, 0.0);
        let rotation =
            heading_pitch_roll_quaternion(origin, HeadingPitchRoll::from_degrees(90.0, 0.0, 0.0));
        // South at the prime meridian is -Z.
        assert_close(rotation * DVec3::X, -DVec3::Z, EPSILON);
    }

    #[test]
    fn test_positive_pitch_raises_nose() {
        let rotation = HeadingPitchRoll::from_degrees(0.0, 90.0, 0.0).to_quaternion();
        assert_close(rotation * DVec3::X, DVec3::Z, EPSILON);
    }

    proptest! {
        #[test]
        fn enu_frame_is_orthonormal(lat in -89.9f64..89.9, lon in -180.0f64..180.0, height in -100.0f64..100_000.0) {
            let frame = east_north_up_frame(geodetic_to_ecef(GeoPosition::new(lat, lon, height)));
            prop_assert!((frame.x_axis.length() - 1.0).abs() < 1e-9);
            prop_assert!((frame.y_axis.length() - 1.0).abs() < 1e-9);
            prop_assert!((frame.z_axis.length() - 1.0).abs() < 1e-9);
            prop_assert!(frame.x_axis.dot(frame.y_axis).abs() < 1e-9);
            prop_assert!(frame.x_axis.cross(frame.y_axis).dot(frame.z_axis) > 0.999_999);
        }
    }
}

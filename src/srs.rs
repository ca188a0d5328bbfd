//! Spatial references and the geocentric (ECEF) conversions the instancer needs.
//!
//! The only question the instancer asks a spatial reference is: where does this
//! point sit in earth-centered coordinates, and which rotation turns a model's up
//! axis (+Z) into the surface normal there? [`SpatialReference::to_ecef_with_rotation`]
//! answers both at once.

use std::fmt::Debug;

use cgmath::{Matrix4, Point3, Vector4};

/// WGS84 semi-major axis in meters.
pub const WGS84_RADIUS_EQUATOR: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

/// Reference ellipsoid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ellipsoid {
    pub radius_equator: f64,
    pub eccentricity_squared: f64,
}

impl Ellipsoid {
    pub fn wgs84() -> Self {
        Self::new(WGS84_RADIUS_EQUATOR, WGS84_FLATTENING)
    }

    pub fn new(radius_equator: f64, flattening: f64) -> Self {
        Self {
            radius_equator,
            eccentricity_squared: flattening * (2.0 - flattening),
        }
    }

    /// Geodetic latitude/longitude (degrees) and height (meters) to ECEF meters.
    pub fn geodetic_to_ecef(&self, lat_deg: f64, lon_deg: f64, height: f64) -> Point3<f64> {
        let (sin_lat, cos_lat) = lat_deg.to_radians().sin_cos();
        let (sin_lon, cos_lon) = lon_deg.to_radians().sin_cos();
        let n = self.radius_equator / (1.0 - self.eccentricity_squared * sin_lat * sin_lat).sqrt();
        Point3::new(
            (n + height) * cos_lat * cos_lon,
            (n + height) * cos_lat * sin_lon,
            (n * (1.0 - self.eccentricity_squared) + height) * sin_lat,
        )
    }

    /// Rotation from the local east/north/up frame at the given location into
    /// ECEF axes. The columns are the east, north and up unit vectors.
    pub fn enu_rotation(&self, lat_deg: f64, lon_deg: f64) -> Matrix4<f64> {
        let (sin_lat, cos_lat) = lat_deg.to_radians().sin_cos();
        let (sin_lon, cos_lon) = lon_deg.to_radians().sin_cos();
        Matrix4::from_cols(
            Vector4::new(-sin_lon, cos_lon, 0.0, 0.0),
            Vector4::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat, 0.0),
            Vector4::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat, 0.0),
            Vector4::new(0.0, 0.0, 0.0, 1.0),
        )
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}

/// A coordinate system feature points are expressed in.
pub trait SpatialReference: Debug + Send + Sync {
    /// `true` for angular (longitude/latitude) coordinates.
    fn is_geographic(&self) -> bool;

    /// The ECEF position of `point` together with the rotation that aligns the
    /// local vertical with the surface normal at that position. The rotation
    /// carries no translation.
    fn to_ecef_with_rotation(&self, point: Point3<f64>) -> (Point3<f64>, Matrix4<f64>);
}

/// Longitude/latitude/height on an ellipsoid.
#[derive(Clone, Debug, Default)]
pub struct GeographicSrs {
    ellipsoid: Ellipsoid,
}

impl GeographicSrs {
    pub fn wgs84() -> Self {
        Self {
            ellipsoid: Ellipsoid::wgs84(),
        }
    }
}

impl SpatialReference for GeographicSrs {
    fn is_geographic(&self) -> bool {
        true
    }

    fn to_ecef_with_rotation(&self, point: Point3<f64>) -> (Point3<f64>, Matrix4<f64>) {
        let (lon, lat, height) = (point.x, point.y, point.z);
        (
            self.ellipsoid.geodetic_to_ecef(lat, lon, height),
            self.ellipsoid.enu_rotation(lat, lon),
        )
    }
}

/// Flat east/north/up meters tangent to the ellipsoid at an origin.
///
/// Every point shares the orientation of the origin, which makes this reference
/// useful for small areas and for testing placements without curvature.
#[derive(Clone, Debug)]
pub struct TangentPlaneSrs {
    origin_ecef: Point3<f64>,
    rotation: Matrix4<f64>,
}

impl TangentPlaneSrs {
    pub fn new(origin_lat_deg: f64, origin_lon_deg: f64, origin_height: f64) -> Self {
        let ellipsoid = Ellipsoid::wgs84();
        Self {
            origin_ecef: ellipsoid.geodetic_to_ecef(origin_lat_deg, origin_lon_deg, origin_height),
            rotation: ellipsoid.enu_rotation(origin_lat_deg, origin_lon_deg),
        }
    }
}

impl SpatialReference for TangentPlaneSrs {
    fn is_geographic(&self) -> bool {
        false
    }

    fn to_ecef_with_rotation(&self, point: Point3<f64>) -> (Point3<f64>, Matrix4<f64>) {
        let offset = self.rotation * point.to_homogeneous();
        let ecef = Point3::new(
            self.origin_ecef.x + offset.x,
            self.origin_ecef.y + offset.y,
            self.origin_ecef.z + offset.z,
        );
        (ecef, self.rotation)
    }
}

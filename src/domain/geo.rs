/// GeoMath - Great-circle distance
///
/// Pure distance helpers used by the eligibility filter. Coordinates follow
/// the GeoJSON convention `[longitude, latitude]` in degrees.
///
/// ## Example
/// ```rust
/// use dispatch_hub::domain::geo::{distance_km, within_radius, GeoPoint};
///
/// let pickup = GeoPoint::new(0.0, 0.0);
/// let driver = GeoPoint::new(0.0, 1.0);
/// assert!((distance_km(pickup, driver) - 111.19).abs() < 0.01);
/// assert!(within_radius(pickup, driver, 1000.0));
/// ```

use serde_json::Value;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A coordinate pair in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Parses a `[lon, lat]` JSON array.
    ///
    /// Returns `None` for anything that cannot take part in a distance
    /// computation: fewer than two elements, non-numeric or non-finite
    /// values, or a latitude outside `[-90, 90]`. Longitude is only required
    /// to be finite; the haversine term is periodic in longitude.
    pub fn from_coordinates(value: &Value) -> Option<Self> {
        let coords = value.as_array()?;
        let lon = coords.first()?.as_f64()?;
        let lat = coords.get(1)?.as_f64()?;
        let point = Self::new(lon, lat);
        point.is_valid().then_some(point)
    }

    pub fn is_valid(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat)
    }

    pub fn to_coordinates(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

/// Haversine distance in kilometers
#[inline]
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    // rounding can push h just past 1 for antipodal points
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// `distance_km(a, b) <= radius_km`; the boundary counts as within
#[inline]
pub fn within_radius(a: GeoPoint, b: GeoPoint, radius_km: f64) -> bool {
    distance_km(a, b) <= radius_km
}

use geo::{Point, VincentyDistance};
use thiserror::Error;

use crate::models::GeoPoint;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistanceError {
    #[error("coordinate out of range: lat {latitude}, lon {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("vincenty formula failed to converge")]
    FailedToConverge,
}

fn to_point(point: GeoPoint) -> Result<Point<f64>, DistanceError> {
    let valid = point.latitude.is_finite()
        && point.longitude.is_finite()
        && (-90.0..=90.0).contains(&point.latitude)
        && (-180.0..=180.0).contains(&point.longitude);

    if !valid {
        return Err(DistanceError::InvalidCoordinate {
            latitude: point.latitude,
            longitude: point.longitude,
        });
    }

    // geo points are (x = lon, y = lat)
    Ok(Point::new(point.longitude, point.latitude))
}

/// Ellipsoidal (WGS-84) great-circle distance between two points in kilometers
///
/// Uses Vincenty's inverse formula, which does not converge for nearly
/// antipodal points; callers decide how to treat that failure.
pub fn vincenty_distance_km(from: GeoPoint, to: GeoPoint) -> Result<f64, DistanceError> {
    let from = to_point(from)?;
    let to = to_point(to)?;

    from.vincenty_distance(&to)
        .map(|meters| meters / 1000.0)
        .map_err(|_| DistanceError::FailedToConverge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vincenty_distance_london_paris() {
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);

        let distance = vincenty_distance_km(london, paris).unwrap();
        assert!((distance - 344.0).abs() < 5.0, "Distance should be ~344km, got {}", distance);
    }

    #[test]
    fn test_same_point_is_zero() {
        let point = GeoPoint::new(40.7128, -74.0060);
        let distance = vincenty_distance_km(point, point).unwrap();
        assert!(distance < 0.001);
    }

    #[test]
    fn test_antipodal_points_fail() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.5, 179.7);
        assert_eq!(vincenty_distance_km(a, b), Err(DistanceError::FailedToConverge));
    }

    #[test]
    fn test_out_of_range_latitude() {
        let a = GeoPoint::new(95.0, 0.0);
        let b = GeoPoint::new(10.0, 10.0);
        assert!(matches!(
            vincenty_distance_km(a, b),
            Err(DistanceError::InvalidCoordinate { .. })
        ));
    }
}

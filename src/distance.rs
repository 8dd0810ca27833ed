//! Great-circle distances on a spherical Earth (haversine).
//!
//! Two entry points with explicit units: meters drive the movement
//! significance filter, kilometers drive everything shown to users.

use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

fn central_angle(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

pub fn distance_meters(a: Coordinates, b: Coordinates) -> f64 {
    EARTH_RADIUS_M * central_angle(a, b)
}

pub fn distance_kilometers(a: Coordinates, b: Coordinates) -> f64 {
    EARTH_RADIUS_KM * central_angle(a, b)
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProximityCheck {
    /// Kilometers.
    pub distance: f64,
    pub is_far: bool,
}

/// A shop beyond `threshold_km` is likely to decline; callers warn the user
/// but let them proceed.
pub fn check_proximity(user: Coordinates, shop: Coordinates, threshold_km: f64) -> ProximityCheck {
    let distance = distance_kilometers(user, shop);

    ProximityCheck {
        distance,
        is_far: distance > threshold_km,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Point `meters` due north of `origin`.
    pub(crate) fn north_of(origin: Coordinates, meters: f64) -> Coordinates {
        Coordinates {
            latitude: origin.latitude + (meters / EARTH_RADIUS_M).to_degrees(),
            longitude: origin.longitude,
        }
    }

    fn manila() -> Coordinates {
        Coordinates::new(14.5995, 120.9842).unwrap()
    }

    fn sampaloc() -> Coordinates {
        Coordinates::new(14.6091, 120.9886).unwrap()
    }

    #[test]
    fn zero_on_same_point() {
        assert_eq!(distance_meters(manila(), manila()), 0.0);
        assert_eq!(distance_kilometers(sampaloc(), sampaloc()), 0.0);
    }

    #[test]
    fn symmetric() {
        let pairs = [
            (manila(), sampaloc()),
            (
                Coordinates::new(-33.8688, 151.2093).unwrap(),
                Coordinates::new(51.5074, -0.1278).unwrap(),
            ),
            (
                Coordinates::new(0.0, 179.9).unwrap(),
                Coordinates::new(0.0, -179.9).unwrap(),
            ),
        ];

        for (a, b) in pairs {
            assert_eq!(distance_meters(a, b), distance_meters(b, a));
            assert_eq!(distance_kilometers(a, b), distance_kilometers(b, a));
        }
    }

    #[test]
    fn units_agree() {
        let meters = distance_meters(manila(), sampaloc());
        let kilometers = distance_kilometers(manila(), sampaloc());

        assert!((kilometers - meters / 1000.0).abs() < 1e-9);
    }

    #[test]
    fn manila_fixture() {
        let kilometers = distance_kilometers(manila(), sampaloc());

        assert!(
            (kilometers - 1.17).abs() < 0.05,
            "unexpected distance {}",
            kilometers
        );
    }

    #[test]
    fn north_offsets_measure_back() {
        let d = distance_meters(manila(), north_of(manila(), 250.0));

        assert!((d - 250.0).abs() < 1e-6);
    }

    #[test]
    fn proximity_threshold() {
        let near = check_proximity(manila(), sampaloc(), 10.0);
        assert!(!near.is_far);

        let far_shop = north_of(manila(), 10_500.0);
        let far = check_proximity(manila(), far_shop, 10.0);
        assert!(far.is_far);
        assert!((far.distance - 10.5).abs() < 1e-6);
    }
}

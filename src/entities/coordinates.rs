use geo_types::{Coord, Point};
use serde::{Deserialize, Serialize};

use crate::error::{invalid_input_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, Error> {
        let coordinates = Self {
            latitude,
            longitude,
        };

        coordinates.validate()?;

        Ok(coordinates)
    }

    /// Rejects non-finite values and anything outside [-90, 90] x [-180, 180].
    pub fn validate(&self) -> Result<(), Error> {
        let valid_latitude = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let valid_longitude =
            self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);

        if !(valid_latitude && valid_longitude) {
            return Err(invalid_input_error());
        }

        Ok(())
    }

    /// Wire form used by routing services: longitude first.
    pub fn to_lon_lat(&self) -> String {
        format!("{},{}", self.longitude, self.latitude)
    }
}

impl std::str::FromStr for Coordinates {
    type Err = Error;

    /// Parses the human form `lat,lon`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (latitude, longitude) = s.split_once(',').ok_or_else(invalid_input_error)?;

        let latitude: f64 = latitude
            .trim()
            .parse()
            .map_err(|_| invalid_input_error())?;
        let longitude: f64 = longitude
            .trim()
            .parse()
            .map_err(|_| invalid_input_error())?;

        Self::new(latitude, longitude)
    }
}

impl From<Coord<f64>> for Coordinates {
    fn from(coord: Coord<f64>) -> Self {
        Self {
            latitude: coord.y,
            longitude: coord.x,
        }
    }
}

impl From<Coordinates> for Coord<f64> {
    fn from(coordinates: Coordinates) -> Self {
        Coord {
            x: coordinates.longitude,
            y: coordinates.latitude,
        }
    }
}

impl From<Coordinates> for Point<f64> {
    fn from(coordinates: Coordinates) -> Self {
        Point::new(coordinates.longitude, coordinates.latitude)
    }
}

impl From<Point<f64>> for Coordinates {
    fn from(point: Point<f64>) -> Self {
        Self {
            latitude: point.y(),
            longitude: point.x(),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::distance::distance_meters;
use crate::entities::Coordinates;

/// Decoded driving path. Fetched whole and replaced whole.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTrace(pub Vec<Coordinates>);

impl RouteTrace {
    pub fn new(points: Vec<Coordinates>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Coordinates] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn length_meters(&self) -> f64 {
        self.0
            .windows(2)
            .map(|leg| distance_meters(leg[0], leg[1]))
            .sum()
    }
}

impl From<Vec<Coordinates>> for RouteTrace {
    fn from(points: Vec<Coordinates>) -> Self {
        Self(points)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteSummary {
    pub origin: Coordinates,
    pub destination: Coordinates,
    pub distance: f64,
    pub trace: RouteTrace,
}

impl RouteSummary {
    pub fn new(origin: Coordinates, destination: Coordinates, trace: RouteTrace) -> Self {
        RouteSummary {
            origin,
            destination,
            distance: trace.length_meters(),
            trace,
        }
    }
}

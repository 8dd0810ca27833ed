pub mod geolocation;
pub mod osrm;

use async_trait::async_trait;

use crate::entities::{Coordinates, RouteTrace};
use crate::error::Error;

pub use geolocation::{ChannelGeolocation, GeolocationProvider, Permission, WatchOptions};
pub use osrm::OsrmClient;

#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Driving path from `start` to `end`. Any transport or decoding failure
    /// is a route-unavailable error; nothing is retried.
    async fn fetch_route(&self, start: Coordinates, end: Coordinates) -> Result<RouteTrace, Error>;
}

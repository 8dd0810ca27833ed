use async_trait::async_trait;
use geo_types::Coord;
use serde::{Deserialize, Serialize};

use crate::{
    entities::{Coordinates, RouteTrace},
    error::{route_unavailable_error, Error},
    external::RouteProvider,
};

pub const DEFAULT_API_BASE: &str = "router.project-osrm.org";

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Geometry {
    /// GeoJSON order: `[longitude, latitude]`.
    coordinates: Vec<[f64; 2]>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Route {
    geometry: Geometry,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Response {
    code: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

pub fn build_route_url(api_base: &str, start: Coordinates, end: Coordinates) -> String {
    format!(
        "https://{}/route/v1/driving/{};{}?overview=full&geometries=geojson",
        api_base,
        start.to_lon_lat(),
        end.to_lon_lat()
    )
}

pub fn decode_route(body: &str) -> Result<RouteTrace, Error> {
    let data: Response = serde_json::from_str(body).map_err(route_unavailable_error)?;

    let route = data
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| route_unavailable_error(data.code))?;

    let points = route
        .geometry
        .coordinates
        .into_iter()
        .map(|[lon, lat]| {
            let coordinates = Coordinates::from(Coord { x: lon, y: lat });
            coordinates.validate().map_err(route_unavailable_error)?;
            Ok(coordinates)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(RouteTrace::new(points))
}

#[derive(Clone, Debug)]
pub struct OsrmClient {
    client: reqwest::Client,
    api_base: String,
}

impl OsrmClient {
    pub fn new(api_base: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
        }
    }
}

impl Default for OsrmClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE.into())
    }
}

#[async_trait]
impl RouteProvider for OsrmClient {
    #[tracing::instrument(skip(self))]
    async fn fetch_route(&self, start: Coordinates, end: Coordinates) -> Result<RouteTrace, Error> {
        let url = build_route_url(&self.api_base, start, end);

        let res = self.client.get(url).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(route_unavailable_error(status));
        }

        let body = res.text().await?;

        decode_route(&body)
    }
}

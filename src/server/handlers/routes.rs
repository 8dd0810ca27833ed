use axum::extract::{Extension, Json, Query};
use serde::{Deserialize, Serialize};

use crate::entities::{Coordinates, RouteSummary};
use crate::error::Error;
use crate::server::DynAPI;

/// Both ends in the human `lat,lon` form.
#[derive(Serialize, Deserialize)]
pub struct FindParams {
    from: String,
    to: String,
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<FindParams>,
) -> Result<Json<RouteSummary>, Error> {
    let origin: Coordinates = params.from.parse()?;
    let destination: Coordinates = params.to.parse()?;

    let route = api.find_route(origin, destination).await?;

    Ok(route.into())
}

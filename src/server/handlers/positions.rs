use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;
use crate::error::Error;
use crate::server::DynAPI;
use crate::tracking::ViewState;

/// One raw fix from the device. `destination` is required on the first fix
/// of a rescue and replaces the current one when given later.
#[derive(Serialize, Deserialize)]
pub struct TrackParams {
    coordinates: Coordinates,
    #[serde(default)]
    destination: Option<Coordinates>,
}

pub async fn track(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
    Json(params): Json<TrackParams>,
) -> Result<Json<ViewState>, Error> {
    let view = api
        .track_position(id, params.coordinates, params.destination)
        .await?;

    Ok(view.into())
}

pub async fn stop(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
) -> Result<Json<()>, Error> {
    api.stop_tracking(id).await?;

    Ok(().into())
}

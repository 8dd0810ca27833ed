use std::collections::BTreeMap;

use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};

use crate::entities::{Coordinates, RescueEntry, RescueRecord, RescueState};
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    user_id: String,
    store_id: String,
    coordinates: Coordinates,
    #[serde(default)]
    specialty: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptParams {
    user_id: String,
    store_id: String,
    coordinates: Coordinates,
}

#[derive(Serialize, Deserialize)]
pub struct UpdateLocationParams {
    coordinates: Coordinates,
}

pub async fn request(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<RequestParams>,
) -> Result<Json<RescueEntry>, Error> {
    let entry = api
        .request_rescue(
            params.user_id,
            params.store_id,
            params.coordinates,
            params.specialty,
        )
        .await?;

    Ok(entry.into())
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    Path(user_id): Path<String>,
) -> Result<Json<BTreeMap<RescueState, Vec<RescueEntry>>>, Error> {
    let groups = api.list_rescues(user_id).await?;

    Ok(groups.into())
}

pub async fn accept(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
    Json(params): Json<AcceptParams>,
) -> Result<Json<RescueRecord>, Error> {
    let record = api
        .accept_rescue(id, params.user_id, params.store_id, params.coordinates)
        .await?;

    Ok(record.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
) -> Result<Json<RescueRecord>, Error> {
    let record = api.find_rescue(id).await?;

    Ok(record.into())
}

pub async fn start(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
) -> Result<Json<RescueRecord>, Error> {
    let record = api.start_rescue(id).await?;

    Ok(record.into())
}

pub async fn update_location(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
    Json(params): Json<UpdateLocationParams>,
) -> Result<Json<RescueRecord>, Error> {
    let record = api.update_rescue_location(id, params.coordinates).await?;

    Ok(record.into())
}

pub async fn end(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
) -> Result<Json<RescueRecord>, Error> {
    let record = api.end_rescue(id).await?;

    Ok(record.into())
}

pub async fn decline(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
) -> Result<Json<RescueRecord>, Error> {
    let record = api.decline_rescue(id).await?;

    Ok(record.into())
}

use axum::extract::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::distance::ProximityCheck;
use crate::entities::{Coordinates, RankedShop, Shop};
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct RankParams {
    origin: Coordinates,
    shops: Vec<Shop>,
    #[serde(default)]
    specialty: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ProximityParams {
    origin: Coordinates,
    shop: Shop,
}

pub async fn rank(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<RankParams>,
) -> Result<Json<Vec<RankedShop>>, Error> {
    let ranked = api.rank_shops(params.origin, params.shops, params.specialty)?;

    Ok(ranked.into())
}

pub async fn proximity(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<ProximityParams>,
) -> Result<Json<ProximityCheck>, Error> {
    let check = api.check_shop_proximity(params.origin, &params.shop)?;

    Ok(check.into())
}

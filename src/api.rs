use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::distance::ProximityCheck;
use crate::entities::{
    Coordinates, RankedShop, RescueEntry, RescueRecord, RescueState, RouteSummary, Shop,
};
use crate::error::Error;
use crate::tracking::ViewState;

#[async_trait]
pub trait RescueAPI {
    /// A user asks `store_id` for help. The record starts out pending.
    async fn request_rescue(
        &self,
        user_id: String,
        store_id: String,
        coordinates: Coordinates,
        specialty: Option<String>,
    ) -> Result<RescueEntry, Error>;

    /// The user's requests grouped by state, newest first within a group.
    async fn list_rescues(
        &self,
        user_id: String,
    ) -> Result<BTreeMap<RescueState, Vec<RescueEntry>>, Error>;

    /// Shop acceptance. A pending request becomes accepted; with no record
    /// yet the session opens directly as ongoing.
    async fn accept_rescue(
        &self,
        request_id: String,
        user_id: String,
        store_id: String,
        coordinates: Coordinates,
    ) -> Result<RescueRecord, Error>;

    async fn find_rescue(&self, request_id: String) -> Result<RescueRecord, Error>;

    /// The shop sets off: accepted becomes ongoing.
    async fn start_rescue(&self, request_id: String) -> Result<RescueRecord, Error>;

    async fn update_rescue_location(
        &self,
        request_id: String,
        coordinates: Coordinates,
    ) -> Result<RescueRecord, Error>;

    async fn end_rescue(&self, request_id: String) -> Result<RescueRecord, Error>;

    async fn decline_rescue(&self, request_id: String) -> Result<RescueRecord, Error>;
}

#[async_trait]
pub trait RouteAPI {
    async fn find_route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteSummary, Error>;
}

pub trait ShopAPI {
    fn rank_shops(
        &self,
        origin: Coordinates,
        shops: Vec<Shop>,
        specialty: Option<String>,
    ) -> Result<Vec<RankedShop>, Error>;

    fn check_shop_proximity(
        &self,
        origin: Coordinates,
        shop: &Shop,
    ) -> Result<ProximityCheck, Error>;
}

/// Device feed for the participant on the move. The first fix of a rescue
/// opens a tracking session; later fixes flow through its movement filter.
#[async_trait]
pub trait TrackingAPI {
    async fn track_position(
        &self,
        request_id: String,
        coordinates: Coordinates,
        destination: Option<Coordinates>,
    ) -> Result<ViewState, Error>;

    async fn stop_tracking(&self, request_id: String) -> Result<(), Error>;
}

pub trait API: RescueAPI + RouteAPI + ShopAPI + TrackingAPI {}

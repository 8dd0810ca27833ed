mod rescue_api;
mod route_api;
mod shop_api;
mod tracking_api;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{api::API, config::TrackingConfig, external::RouteProvider, store::RecordStore};

use tracking_api::TrackedDevice;

pub struct Engine {
    store: Arc<dyn RecordStore>,
    routes: Arc<dyn RouteProvider>,
    config: TrackingConfig,
    /// Live device sessions by request id.
    devices: Mutex<HashMap<String, TrackedDevice>>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        routes: Arc<dyn RouteProvider>,
        config: TrackingConfig,
    ) -> Self {
        Self {
            store,
            routes,
            config,
            devices: Mutex::new(HashMap::new()),
        }
    }
}

impl API for Engine {}

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    entities::{Coordinates, RouteTrace},
    error::Error,
    external::RouteProvider,
    tracking::TrackingView,
};

#[derive(Clone, Debug, PartialEq)]
pub enum RefreshOutcome {
    Applied(RouteTrace),
    /// A newer request was issued while this one was in flight.
    Discarded,
}

/// Keeps the displayed route in step with start/destination changes.
///
/// Every refresh is tagged with a request id and only the most recently
/// issued request may replace the displayed trace. A failed fetch leaves the
/// previous trace on screen.
pub struct RouteFetcher {
    provider: Arc<dyn RouteProvider>,
    latest_request: Mutex<Option<Uuid>>,
}

impl RouteFetcher {
    pub fn new(provider: Arc<dyn RouteProvider>) -> Self {
        Self {
            provider,
            latest_request: Mutex::new(None),
        }
    }

    pub async fn fetch_route(&self, start: Coordinates, end: Coordinates) -> Result<RouteTrace, Error> {
        self.provider.fetch_route(start, end).await
    }

    #[tracing::instrument(skip(self, view))]
    pub async fn refresh(
        &self,
        view: &TrackingView,
        start: Coordinates,
        end: Coordinates,
    ) -> Result<RefreshOutcome, Error> {
        let request_id = Uuid::new_v4();
        *self.latest_request.lock().await = Some(request_id);

        let result = self.provider.fetch_route(start, end).await;

        if *self.latest_request.lock().await != Some(request_id) {
            tracing::info!(%request_id, "discarding stale route response");
            return Ok(RefreshOutcome::Discarded);
        }

        match result {
            Ok(trace) => {
                view.set_route(trace.clone());
                Ok(RefreshOutcome::Applied(trace))
            }
            Err(err) => {
                tracing::warn!(%request_id, "error fetching route, keeping previous: {}", err);
                Err(err)
            }
        }
    }
}

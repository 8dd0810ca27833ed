use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::{
    distance::distance_kilometers,
    entities::{Coordinates, RescueRecord},
    error::{record_not_found_error, Error},
    store::RecordStore,
    subscription::ListenerHandle,
    tracking::{RouteFetcher, TrackingView},
};

/// The counterpart's side of a rescue: follows the shared record and keeps
/// the counterpart's position, distance and route up to date.
pub struct RescueObserver {
    request_id: String,
    view: Arc<TrackingView>,
    listener: Option<ListenerHandle>,
}

async fn apply_snapshot(
    view: &TrackingView,
    routes: &RouteFetcher,
    own_position: Coordinates,
    record: &RescueRecord,
) {
    let counterpart = record.coordinates();

    view.set_counterpart(counterpart, Some(distance_kilometers(own_position, counterpart)));
    view.set_rescue_state(record.state);

    // failures keep the previous route
    let _ = routes.refresh(view, own_position, counterpart).await;
}

impl RescueObserver {
    /// Fails with a not-found error when the rescue record does not exist;
    /// callers show it to the user and do not poll.
    #[tracing::instrument(skip(store, routes))]
    pub async fn observe(
        request_id: &str,
        own_position: Coordinates,
        store: Arc<dyn RecordStore>,
        routes: Arc<RouteFetcher>,
    ) -> Result<Self, Error> {
        let record = store
            .get(request_id)
            .await?
            .ok_or_else(record_not_found_error)?;

        let view = Arc::new(TrackingView::new());
        view.set_current_location(own_position);
        view.set_destination(record.coordinates());
        apply_snapshot(&view, &routes, own_position, &record).await;

        let mut snapshots = store.subscribe(request_id).await?;

        let listener_view = view.clone();
        let mut applied = Some(record);
        let listener = ListenerHandle::spawn(move |active| async move {
            while let Some(record) = snapshots.next().await {
                if !active.load(Ordering::SeqCst) {
                    break;
                }

                // the subscription replays the record applied above first
                let replayed = applied.take().map_or(false, |applied| applied == record);
                if !replayed {
                    listener_view.set_destination(record.coordinates());
                    apply_snapshot(&listener_view, &routes, own_position, &record).await;
                }

                if record.state.is_terminal() {
                    tracing::info!(state = %record.state.name(), "rescue finished, no longer observing");
                    break;
                }
            }
        });

        Ok(Self {
            request_id: request_id.to_string(),
            view,
            listener: Some(listener),
        })
    }

    pub fn view(&self) -> &Arc<TrackingView> {
        &self.view
    }

    pub fn is_observing(&self) -> bool {
        self.listener
            .as_ref()
            .map_or(false, |listener| listener.is_active())
    }

    pub async fn stop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.stop().await;
            tracing::info!(request_id = %self.request_id, "stopped observing rescue");
        }
    }
}

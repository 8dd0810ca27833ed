use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    entities::{Coordinates, RescuePatch, RescueRecord, RescueRequest},
    error::Error,
    store::RecordStore,
    tracking::TrackingView,
};

/// Writes a participant's latest position to the shared rescue record.
///
/// The first publish of a session creates the record by merge-upsert; later
/// ones only touch latitude, longitude and timestamp. Failures are logged and
/// returned, and never stop the caller from publishing again.
pub struct LocationPublisher {
    store: Arc<dyn RecordStore>,
    opened: Mutex<HashSet<String>>,
    mirror: Option<Arc<TrackingView>>,
}

impl LocationPublisher {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            opened: Mutex::new(HashSet::new()),
            mirror: None,
        }
    }

    /// Also reflect each published position in `view`.
    pub fn mirror_to(mut self, view: Arc<TrackingView>) -> Self {
        self.mirror = Some(view);
        self
    }

    #[tracing::instrument(skip(self, rescue), fields(request_id = %rescue.id))]
    pub async fn publish(
        &self,
        rescue: &RescueRequest,
        coordinates: Coordinates,
    ) -> Result<RescueRecord, Error> {
        if let Some(view) = &self.mirror {
            view.set_current_location(coordinates);
        }

        let mut opened = self.opened.lock().await;

        let result = if opened.contains(&rescue.id) {
            self.store
                .update(&rescue.id, RescuePatch::location(coordinates))
                .await
        } else {
            let patch = RescuePatch::opening(
                rescue.user_id.clone(),
                rescue.store_id.clone(),
                coordinates,
            );
            self.store.merge_upsert(&rescue.id, patch).await
        };

        match result {
            Ok(record) => {
                opened.insert(rescue.id.clone());

                if let Some(view) = &self.mirror {
                    view.set_rescue_state(record.state);
                }

                Ok(record)
            }
            Err(err) => {
                tracing::warn!("failed to publish location: {}", err);
                Err(err)
            }
        }
    }
}

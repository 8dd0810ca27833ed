use super::Engine;

use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::RescueAPI,
    entities::{Coordinates, RescueEntry, RescuePatch, RescueRecord, RescueState},
    error::{invalid_input_error, invalid_invocation_error, record_not_found_error, Error},
};

impl Engine {
    async fn transition_rescue(
        &self,
        request_id: &str,
        next: RescueState,
    ) -> Result<RescueRecord, Error> {
        let mut record = self.find_rescue(request_id.to_string()).await?;
        record.transition(next)?;

        let record = self
            .store
            .update(request_id, RescuePatch::state(record.state))
            .await?;

        if record.state.is_terminal() {
            self.release_device(request_id).await;
        }

        Ok(record)
    }
}

#[async_trait]
impl RescueAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn request_rescue(
        &self,
        user_id: String,
        store_id: String,
        coordinates: Coordinates,
        specialty: Option<String>,
    ) -> Result<RescueEntry, Error> {
        coordinates.validate()?;

        if user_id.is_empty() || store_id.is_empty() {
            return Err(invalid_input_error());
        }

        let id = Uuid::new_v4().to_string();
        let record = self
            .store
            .merge_upsert(
                &id,
                RescuePatch::request(user_id, store_id, coordinates, specialty),
            )
            .await?;

        tracing::info!(request_id = %id, "rescue requested");

        Ok(RescueEntry { id, record })
    }

    #[tracing::instrument(skip(self))]
    async fn list_rescues(
        &self,
        user_id: String,
    ) -> Result<BTreeMap<RescueState, Vec<RescueEntry>>, Error> {
        let mut groups: BTreeMap<RescueState, Vec<RescueEntry>> = BTreeMap::new();

        for (id, record) in self.store.list_for_user(&user_id).await? {
            groups
                .entry(record.state)
                .or_default()
                .push(RescueEntry { id, record });
        }

        for entries in groups.values_mut() {
            entries.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));
        }

        Ok(groups)
    }

    #[tracing::instrument(skip(self))]
    async fn accept_rescue(
        &self,
        request_id: String,
        user_id: String,
        store_id: String,
        coordinates: Coordinates,
    ) -> Result<RescueRecord, Error> {
        coordinates.validate()?;

        if request_id.is_empty() || user_id.is_empty() || store_id.is_empty() {
            return Err(invalid_input_error());
        }

        match self.store.get(&request_id).await? {
            None => {
                let record = self
                    .store
                    .merge_upsert(
                        &request_id,
                        RescuePatch::opening(user_id, store_id, coordinates),
                    )
                    .await?;

                tracing::info!(%request_id, "rescue accepted, session opened");

                Ok(record)
            }
            Some(mut record) => {
                record.transition(RescueState::Accepted)?;

                let mut patch = RescuePatch::location(coordinates);
                patch.state = Some(record.state);
                patch.store_id = Some(store_id);

                self.store.update(&request_id, patch).await
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn find_rescue(&self, request_id: String) -> Result<RescueRecord, Error> {
        self.store
            .get(&request_id)
            .await?
            .ok_or_else(record_not_found_error)
    }

    #[tracing::instrument(skip(self))]
    async fn start_rescue(&self, request_id: String) -> Result<RescueRecord, Error> {
        self.transition_rescue(&request_id, RescueState::Ongoing)
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn update_rescue_location(
        &self,
        request_id: String,
        coordinates: Coordinates,
    ) -> Result<RescueRecord, Error> {
        coordinates.validate()?;

        let record = self.find_rescue(request_id.clone()).await?;
        if record.state.is_terminal() {
            return Err(invalid_invocation_error());
        }

        self.store
            .update(&request_id, RescuePatch::location(coordinates))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn end_rescue(&self, request_id: String) -> Result<RescueRecord, Error> {
        self.transition_rescue(&request_id, RescueState::Ended).await
    }

    #[tracing::instrument(skip(self))]
    async fn decline_rescue(&self, request_id: String) -> Result<RescueRecord, Error> {
        self.transition_rescue(&request_id, RescueState::Declined)
            .await
    }
}

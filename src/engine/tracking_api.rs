use super::Engine;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    api::{RescueAPI, TrackingAPI},
    entities::{Coordinates, RescueRequest, RescueState},
    error::{invalid_input_error, invalid_invocation_error, Error},
    external::{ChannelGeolocation, Permission},
    tracking::{RescueSession, Role, SessionOptions, ViewState},
};

/// A device reporting over HTTP and the session consuming its fixes.
pub(super) struct TrackedDevice {
    geolocation: Arc<ChannelGeolocation>,
    session: RescueSession,
}

impl Engine {
    /// Stops and forgets the device session of `request_id`, if any.
    pub(super) async fn release_device(&self, request_id: &str) {
        let device = self.devices.lock().await.remove(request_id);

        if let Some(mut device) = device {
            device.session.stop().await;
        }
    }

    async fn open_device(
        &self,
        request_id: &str,
        coordinates: Coordinates,
        destination: Coordinates,
    ) -> Result<TrackedDevice, Error> {
        let record = self.find_rescue(request_id.to_string()).await?;

        match record.state {
            RescueState::Ongoing => {}
            RescueState::Accepted => {
                self.start_rescue(request_id.to_string()).await?;
            }
            _ => return Err(invalid_invocation_error()),
        }

        let geolocation = Arc::new(ChannelGeolocation::new(Permission::Granted));
        geolocation.push(coordinates).await;

        let mut options = SessionOptions::for_role(Role::Shop);
        options.significant_movement = self.config.significant_movement;
        options.watch.distance_interval = self.config.watch_distance_interval;

        let rescue = RescueRequest {
            id: request_id.to_string(),
            user_id: record.user_id,
            store_id: record.store_id,
            location: destination,
        };

        let mut session = RescueSession::new(
            rescue,
            options,
            geolocation.clone(),
            self.routes.clone(),
            self.store.clone(),
        );
        session.initialize().await?;
        session.start_tracking().await?;

        Ok(TrackedDevice {
            geolocation,
            session,
        })
    }
}

#[async_trait]
impl TrackingAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn track_position(
        &self,
        request_id: String,
        coordinates: Coordinates,
        destination: Option<Coordinates>,
    ) -> Result<ViewState, Error> {
        coordinates.validate()?;
        if let Some(destination) = destination {
            destination.validate()?;
        }

        let mut devices = self.devices.lock().await;

        if let Some(device) = devices.get_mut(&request_id) {
            if let Some(destination) = destination {
                if device.session.rescue().location != destination {
                    device.session.set_destination(destination).await?;
                }
            }

            device.geolocation.push(coordinates).await;

            return Ok(device.session.view().snapshot());
        }

        let destination = destination.ok_or_else(invalid_input_error)?;
        let device = self
            .open_device(&request_id, coordinates, destination)
            .await?;
        let view = device.session.view().snapshot();

        devices.insert(request_id.clone(), device);
        tracing::info!(%request_id, "device tracking opened");

        Ok(view)
    }

    #[tracing::instrument(skip(self))]
    async fn stop_tracking(&self, request_id: String) -> Result<(), Error> {
        self.release_device(&request_id).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{RescueAPI, TrackingAPI};
    use crate::distance::tests::north_of;
    use crate::engine::tests::engine;
    use crate::entities::{Coordinates, RescueState};
    use std::time::Duration;

    fn user_location() -> Coordinates {
        Coordinates::new(14.6091, 120.9886).unwrap()
    }

    fn shop_start() -> Coordinates {
        north_of(user_location(), 2_000.0)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn first_fix_opens_session_and_publishes() {
        let (engine, _) = engine();
        engine
            .accept_rescue(
                "req-1".into(),
                "user-1".into(),
                "shop-1".into(),
                shop_start(),
            )
            .await
            .unwrap();

        let view = engine
            .track_position("req-1".into(), shop_start(), Some(user_location()))
            .await
            .unwrap();

        assert_eq!(view.current_location, Some(shop_start()));
        assert_eq!(view.destination, Some(user_location()));
        assert_eq!(view.route.points(), &[shop_start(), user_location()]);
        assert_eq!(view.rescue_state, Some(RescueState::Ongoing));
    }

    #[tokio::test]
    async fn later_fixes_pass_the_movement_filter() {
        let (engine, _) = engine();
        engine
            .accept_rescue(
                "req-1".into(),
                "user-1".into(),
                "shop-1".into(),
                shop_start(),
            )
            .await
            .unwrap();
        engine
            .track_position("req-1".into(), shop_start(), Some(user_location()))
            .await
            .unwrap();

        engine
            .track_position("req-1".into(), north_of(shop_start(), -50.0), None)
            .await
            .unwrap();
        settle().await;

        let record = engine.find_rescue("req-1".into()).await.unwrap();
        assert_eq!(record.coordinates(), shop_start());

        let moved = north_of(shop_start(), -150.0);
        engine
            .track_position("req-1".into(), moved, None)
            .await
            .unwrap();
        settle().await;

        let record = engine.find_rescue("req-1".into()).await.unwrap();
        assert_eq!(record.coordinates(), moved);
        assert_eq!(record.state, RescueState::Ongoing);
    }

    #[tokio::test]
    async fn accepted_request_is_started_by_the_first_fix() {
        let (engine, _) = engine();
        let entry = engine
            .request_rescue("user-1".into(), "shop-1".into(), user_location(), None)
            .await
            .unwrap();

        let err = engine
            .track_position(entry.id.clone(), shop_start(), Some(user_location()))
            .await
            .unwrap_err();
        assert!(err.is_invalid_invocation_error());

        engine
            .accept_rescue(
                entry.id.clone(),
                "user-1".into(),
                "shop-1".into(),
                shop_start(),
            )
            .await
            .unwrap();

        let view = engine
            .track_position(entry.id.clone(), shop_start(), Some(user_location()))
            .await
            .unwrap();
        assert_eq!(view.rescue_state, Some(RescueState::Ongoing));

        let record = engine.find_rescue(entry.id).await.unwrap();
        assert_eq!(record.state, RescueState::Ongoing);
        assert_eq!(record.user_id, "user-1");
    }

    #[tokio::test]
    async fn first_fix_needs_a_destination() {
        let (engine, _) = engine();
        engine
            .accept_rescue(
                "req-1".into(),
                "user-1".into(),
                "shop-1".into(),
                shop_start(),
            )
            .await
            .unwrap();

        let err = engine
            .track_position("req-1".into(), shop_start(), None)
            .await
            .unwrap_err();

        assert!(err.is_invalid_input_error());
    }

    #[tokio::test]
    async fn ending_the_rescue_releases_the_device() {
        let (engine, _) = engine();
        engine
            .accept_rescue(
                "req-1".into(),
                "user-1".into(),
                "shop-1".into(),
                shop_start(),
            )
            .await
            .unwrap();
        engine
            .track_position("req-1".into(), shop_start(), Some(user_location()))
            .await
            .unwrap();

        engine.end_rescue("req-1".into()).await.unwrap();
        assert!(engine.devices.lock().await.is_empty());

        let err = engine
            .track_position("req-1".into(), user_location(), None)
            .await
            .unwrap_err();
        assert!(err.is_invalid_input_error());

        let err = engine
            .track_position("req-1".into(), user_location(), Some(user_location()))
            .await
            .unwrap_err();
        assert!(err.is_invalid_invocation_error());
    }
}

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    entities::{Coordinates, RescueRequest},
    error::{invalid_invocation_error, Error},
    external::{GeolocationProvider, RouteProvider, WatchOptions},
    store::RecordStore,
    subscription::ListenerHandle,
    tracking::{
        sampler::SIGNIFICANT_MOVEMENT_M, LocationPublisher, PositionSampler, RouteFetcher,
        SignificanceFilter, TrackingView,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Shop,
    User,
}

#[derive(Clone, Copy, Debug)]
pub struct SessionOptions {
    pub role: Role,
    /// Whether this participant writes its position to the shared record.
    pub shares_location: bool,
    /// Meters.
    pub significant_movement: f64,
    pub watch: WatchOptions,
}

impl SessionOptions {
    pub fn for_role(role: Role) -> Self {
        Self {
            role,
            shares_location: role == Role::Shop,
            significant_movement: SIGNIFICANT_MOVEMENT_M,
            watch: WatchOptions::default(),
        }
    }
}

/// An ongoing rescue as seen by the participant on the move.
///
/// `initialize` takes the first fix, loads the route to the destination and
/// opens the shared record; `start_tracking` then follows the device until
/// `stop` or drop. Only permission problems abort the flow. Route and
/// persistence failures are logged and the session carries on with what it
/// last had.
pub struct RescueSession {
    rescue: RescueRequest,
    options: SessionOptions,
    sampler: PositionSampler,
    routes: Arc<RouteFetcher>,
    publisher: Arc<LocationPublisher>,
    view: Arc<TrackingView>,
    tracking: Option<ListenerHandle>,
}

impl RescueSession {
    pub fn new(
        rescue: RescueRequest,
        options: SessionOptions,
        geolocation: Arc<dyn GeolocationProvider>,
        routes: Arc<dyn RouteProvider>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        let view = Arc::new(TrackingView::new());

        Self {
            rescue,
            options,
            sampler: PositionSampler::new(geolocation, options.watch),
            routes: Arc::new(RouteFetcher::new(routes)),
            publisher: Arc::new(LocationPublisher::new(store).mirror_to(view.clone())),
            view,
            tracking: None,
        }
    }

    pub fn view(&self) -> &Arc<TrackingView> {
        &self.view
    }

    pub fn rescue(&self) -> &RescueRequest {
        &self.rescue
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
            .as_ref()
            .map_or(false, |tracking| tracking.is_active())
    }

    #[tracing::instrument(skip(self), fields(request_id = %self.rescue.id))]
    pub async fn initialize(&mut self) -> Result<Coordinates, Error> {
        let position = self.sampler.current_position().await?;

        self.view.set_current_location(position);

        let destination = self.rescue.location;
        self.view.set_destination(destination);

        // route failures leave the map without a route
        let _ = self.routes.refresh(&self.view, position, destination).await;

        if self.options.shares_location {
            let _ = self.publisher.publish(&self.rescue, position).await;
        }

        tracing::info!("rescue session initialized");

        Ok(position)
    }

    #[tracing::instrument(skip(self), fields(request_id = %self.rescue.id))]
    pub async fn start_tracking(&mut self) -> Result<(), Error> {
        if self.is_tracking() {
            return Err(invalid_invocation_error());
        }

        let mut positions = self.sampler.watch().await?;
        let mut filter = SignificanceFilter::starting_at(
            self.view.snapshot().current_location,
            self.options.significant_movement,
        );

        let rescue = self.rescue.clone();
        let shares_location = self.options.shares_location;
        let publisher = self.publisher.clone();
        let view = self.view.clone();

        self.tracking = Some(ListenerHandle::spawn(move |active| async move {
            while let Some(sample) = positions.next().await {
                if !active.load(Ordering::SeqCst) {
                    break;
                }
                if !filter.accept(sample) {
                    continue;
                }

                tracing::debug!(?sample, "significant movement");

                if shares_location {
                    // mirrors into the view, failures already logged
                    let _ = publisher.publish(&rescue, sample).await;
                } else {
                    view.set_current_location(sample);
                }
            }
        }));

        tracing::info!("location tracking started");

        Ok(())
    }

    /// New destination for the route; fetches a fresh route from the current
    /// position.
    #[tracing::instrument(skip(self), fields(request_id = %self.rescue.id))]
    pub async fn set_destination(&mut self, destination: Coordinates) -> Result<(), Error> {
        destination.validate()?;

        self.rescue.location = destination;
        self.view.set_destination(destination);

        if let Some(position) = self.view.snapshot().current_location {
            let _ = self.routes.refresh(&self.view, position, destination).await;
        }

        Ok(())
    }

    /// Releases the position watch. No sample is handled afterwards.
    pub async fn stop(&mut self) {
        if let Some(tracking) = self.tracking.take() {
            tracking.stop().await;
            tracing::info!(request_id = %self.rescue.id, "location tracking stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::tests::north_of;
    use crate::entities::{RescueState, RouteTrace};
    use crate::error::route_unavailable_error;
    use crate::external::{ChannelGeolocation, Permission};
    use crate::store::MemoryStore;
    use crate::tracking::publisher::tests::{manila, request, FlakyStore};
    use crate::tracking::route_fetcher::tests::ScriptedRoutes;
    use std::time::Duration;

    struct Fixture {
        geolocation: Arc<ChannelGeolocation>,
        routes: Arc<ScriptedRoutes>,
        store: Arc<MemoryStore>,
    }

    impl Fixture {
        async fn new() -> Self {
            let geolocation = Arc::new(ChannelGeolocation::new(Permission::Granted));
            geolocation.push(manila()).await;

            Self {
                geolocation,
                routes: Arc::new(ScriptedRoutes::straight()),
                store: Arc::new(MemoryStore::new()),
            }
        }

        fn session(&self, role: Role) -> RescueSession {
            RescueSession::new(
                request(),
                SessionOptions::for_role(role),
                self.geolocation.clone(),
                self.routes.clone(),
                self.store.clone(),
            )
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn initialize_loads_route_and_opens_record() {
        let fixture = Fixture::new().await;
        let mut session = fixture.session(Role::Shop);

        let position = session.initialize().await.unwrap();
        assert_eq!(position, manila());

        let view = session.view().snapshot();
        assert_eq!(view.current_location, Some(manila()));
        assert_eq!(view.destination, Some(request().location));
        assert_eq!(view.route.points(), &[manila(), request().location]);

        let record = fixture.store.get("req-1").await.unwrap().unwrap();
        assert_eq!(record.state, RescueState::Ongoing);
        assert_eq!(record.coordinates(), manila());
    }

    #[tokio::test]
    async fn non_sharing_participant_does_not_write() {
        let fixture = Fixture::new().await;
        let mut session = fixture.session(Role::User);

        session.initialize().await.unwrap();

        assert!(fixture.store.get("req-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn permission_denied_blocks_the_flow() {
        let fixture = Fixture::new().await;
        fixture.geolocation.set_permission(Permission::Denied);
        let mut session = fixture.session(Role::Shop);

        let err = session.initialize().await.unwrap_err();

        assert!(err.is_permission_denied_error());
        assert!(fixture.routes.calls.lock().await.is_empty());
        assert!(fixture.store.get("req-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn route_failure_does_not_fail_initialize() {
        let fixture = Fixture {
            routes: Arc::new(ScriptedRoutes::new(vec![(
                Duration::ZERO,
                Err(route_unavailable_error("dns")),
            )])),
            ..Fixture::new().await
        };
        let mut session = fixture.session(Role::Shop);

        session.initialize().await.unwrap();

        assert_eq!(session.view().snapshot().route, RouteTrace::default());
        assert!(fixture.store.get("req-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn only_significant_movement_is_published() {
        let fixture = Fixture::new().await;
        let mut session = fixture.session(Role::Shop);
        session.initialize().await.unwrap();
        session.start_tracking().await.unwrap();

        fixture.geolocation.push(north_of(manila(), 99.0)).await;
        settle().await;
        let record = fixture.store.get("req-1").await.unwrap().unwrap();
        assert_eq!(record.coordinates(), manila());

        let moved = north_of(manila(), 101.0);
        fixture.geolocation.push(moved).await;
        settle().await;
        let record = fixture.store.get("req-1").await.unwrap().unwrap();
        assert_eq!(record.coordinates(), moved);
        assert_eq!(session.view().snapshot().current_location, Some(moved));
    }

    #[tokio::test]
    async fn persistence_failure_does_not_stop_tracking() {
        let geolocation = Arc::new(ChannelGeolocation::new(Permission::Granted));
        geolocation.push(manila()).await;
        let store = Arc::new(FlakyStore::new(2));

        let mut session = RescueSession::new(
            request(),
            SessionOptions::for_role(Role::Shop),
            geolocation.clone(),
            Arc::new(ScriptedRoutes::straight()),
            store.clone(),
        );
        session.initialize().await.unwrap();
        session.start_tracking().await.unwrap();

        // opening failed during initialize, this one fails too
        geolocation.push(north_of(manila(), 150.0)).await;
        settle().await;
        assert!(store.get("req-1").await.unwrap().is_none());

        let moved = north_of(manila(), 300.0);
        geolocation.push(moved).await;
        settle().await;

        assert!(session.is_tracking());
        let record = store.get("req-1").await.unwrap().unwrap();
        assert_eq!(record.coordinates(), moved);
    }

    #[tokio::test]
    async fn no_samples_handled_after_stop() {
        let fixture = Fixture::new().await;
        let mut session = fixture.session(Role::Shop);
        session.initialize().await.unwrap();
        session.start_tracking().await.unwrap();
        assert_eq!(fixture.geolocation.watcher_count().await, 1);

        session.stop().await;
        assert!(!session.is_tracking());

        let delivered = fixture.geolocation.push(north_of(manila(), 500.0)).await;
        settle().await;

        assert_eq!(delivered, 0);
        assert_eq!(fixture.geolocation.watcher_count().await, 0);
        let record = fixture.store.get("req-1").await.unwrap().unwrap();
        assert_eq!(record.coordinates(), manila());
        assert_eq!(session.view().snapshot().current_location, Some(manila()));
    }

    #[tokio::test]
    async fn dropping_the_session_releases_the_watch() {
        let fixture = Fixture::new().await;
        let mut session = fixture.session(Role::Shop);
        session.initialize().await.unwrap();
        session.start_tracking().await.unwrap();

        drop(session);
        settle().await;

        assert_eq!(fixture.geolocation.push(north_of(manila(), 500.0)).await, 0);
        let record = fixture.store.get("req-1").await.unwrap().unwrap();
        assert_eq!(record.coordinates(), manila());
    }

    #[tokio::test]
    async fn tracking_twice_is_rejected() {
        let fixture = Fixture::new().await;
        let mut session = fixture.session(Role::Shop);
        session.initialize().await.unwrap();
        session.start_tracking().await.unwrap();

        let err = session.start_tracking().await.unwrap_err();
        assert!(err.is_invalid_invocation_error());
    }

    #[tokio::test]
    async fn destination_change_refetches_route() {
        let fixture = Fixture::new().await;
        let mut session = fixture.session(Role::Shop);
        session.initialize().await.unwrap();

        let elsewhere = north_of(manila(), 2_000.0);
        session.set_destination(elsewhere).await.unwrap();

        assert_eq!(fixture.routes.calls.lock().await.len(), 2);
        assert_eq!(session.view().snapshot().route.points(), &[manila(), elsewhere]);
        assert_eq!(session.rescue().location, elsewhere);
    }
}

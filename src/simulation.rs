use std::sync::Arc;
use std::time::Duration;

use rand_distr::{Distribution, Normal};

use crate::{
    config::{SimulationConfig, TrackingConfig},
    distance::{distance_meters, EARTH_RADIUS_M},
    entities::{Coordinates, RescuePatch, RescueRequest, RescueState, RouteTrace},
    error::{unexpected_error, Error},
    external::{ChannelGeolocation, Permission, RouteProvider},
    store::RecordStore,
    tracking::{RescueSession, Role, SessionOptions},
};

/// Meters between consecutive simulated fixes along a route leg.
const STEP_M: f64 = 25.0;

/// A phone walking a route, feeding noisy fixes into a [`ChannelGeolocation`].
pub struct SimulatedDevice {
    geolocation: Arc<ChannelGeolocation>,
    noise: Normal<f64>,
    interval: Duration,
}

impl SimulatedDevice {
    /// `accuracy` is the standard deviation of the GPS error in meters.
    pub fn new(
        geolocation: Arc<ChannelGeolocation>,
        accuracy: f64,
        interval: Duration,
    ) -> Result<Self, Error> {
        let noise = Normal::new(0.0, (accuracy / EARTH_RADIUS_M).to_degrees())
            .map_err(unexpected_error)?;

        Ok(Self {
            geolocation,
            noise,
            interval,
        })
    }

    fn jitter(&self, point: Coordinates) -> Coordinates {
        let mut rng = rand::thread_rng();

        let noisy = Coordinates {
            latitude: point.latitude + self.noise.sample(&mut rng),
            longitude: point.longitude + self.noise.sample(&mut rng),
        };

        if noisy.validate().is_ok() {
            noisy
        } else {
            point
        }
    }

    pub async fn fix(&self, point: Coordinates) {
        self.geolocation.push(self.jitter(point)).await;
    }

    /// Pushes a fix every `STEP_M` along each leg of `route`, ending on its
    /// last point. Returns the number of fixes pushed.
    #[tracing::instrument(skip_all, fields(points = route.len()))]
    pub async fn drive(&self, route: &RouteTrace) -> usize {
        let mut pushed = 0;

        for leg in route.points().windows(2) {
            let (from, to) = (leg[0], leg[1]);
            let steps = (distance_meters(from, to) / STEP_M).ceil().max(1.0) as usize;

            for step in 1..=steps {
                let point = if step == steps {
                    to
                } else {
                    let t = step as f64 / steps as f64;
                    Coordinates {
                        latitude: from.latitude + (to.latitude - from.latitude) * t,
                        longitude: from.longitude + (to.longitude - from.longitude) * t,
                    }
                };

                self.fix(point).await;
                pushed += 1;

                if !self.interval.is_zero() {
                    tokio::time::sleep(self.interval).await;
                }
            }
        }

        tracing::debug!(pushed, "route driven");

        pushed
    }
}

/// Plays a whole rescue from the shop's side: accept, drive the fetched
/// route to the stranded user, then end the session.
#[tracing::instrument(skip(tracking, routes, store))]
pub async fn run(
    config: SimulationConfig,
    tracking: TrackingConfig,
    routes: Arc<dyn RouteProvider>,
    store: Arc<dyn RecordStore>,
    interval: Duration,
) -> Result<(), Error> {
    let geolocation = Arc::new(ChannelGeolocation::new(Permission::Granted));
    let device = SimulatedDevice::new(geolocation.clone(), 5.0, interval)?;
    device.fix(config.origin).await;

    let rescue = RescueRequest {
        id: config.request_id.clone(),
        user_id: "simulated-user".into(),
        store_id: "simulated-shop".into(),
        location: config.destination,
    };

    let mut options = SessionOptions::for_role(Role::Shop);
    options.significant_movement = tracking.significant_movement;
    options.watch.distance_interval = tracking.watch_distance_interval;

    let mut session = RescueSession::new(rescue, options, geolocation, routes, store.clone());
    let start = session.initialize().await?;
    session.start_tracking().await?;

    let mut route = session.view().snapshot().route;
    if route.is_empty() {
        tracing::warn!("no route available, driving straight to the user");
        route = RouteTrace::new(vec![start, config.destination]);
    }

    device.drive(&route).await;
    session.stop().await;

    store
        .update(&config.request_id, RescuePatch::state(RescueState::Ended))
        .await?;

    tracing::info!(request_id = %config.request_id, "simulated rescue finished");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::tests::north_of;
    use crate::external::GeolocationProvider;
    use crate::store::MemoryStore;
    use crate::tracking::ScriptedRoutes;

    fn manila() -> Coordinates {
        Coordinates::new(14.5995, 120.9842).unwrap()
    }

    #[tokio::test]
    async fn drive_ends_on_the_last_point() {
        let geolocation = Arc::new(ChannelGeolocation::new(Permission::Granted));
        let device = SimulatedDevice::new(geolocation.clone(), 0.0, Duration::ZERO).unwrap();
        let destination = north_of(manila(), 90.0);

        let pushed = device
            .drive(&RouteTrace::new(vec![manila(), destination]))
            .await;

        assert_eq!(pushed, 4);
        assert_eq!(geolocation.current_position().await.unwrap(), destination);
    }

    #[tokio::test]
    async fn noise_stays_close() {
        let geolocation = Arc::new(ChannelGeolocation::new(Permission::Granted));
        let device = SimulatedDevice::new(geolocation.clone(), 5.0, Duration::ZERO).unwrap();

        for _ in 0..20 {
            device.fix(manila()).await;
            let fix = geolocation.current_position().await.unwrap();
            assert!(distance_meters(fix, manila()) < 50.0);
        }
    }

    #[tokio::test]
    async fn simulated_rescue_ends_the_record() {
        let store = Arc::new(MemoryStore::new());
        let config = SimulationConfig {
            request_id: "sim-1".into(),
            origin: north_of(manila(), 1_000.0),
            destination: manila(),
        };

        run(
            config,
            TrackingConfig::default(),
            Arc::new(ScriptedRoutes::straight()),
            store.clone(),
            Duration::ZERO,
        )
        .await
        .unwrap();

        let record = store.get("sim-1").await.unwrap().unwrap();
        assert_eq!(record.state, RescueState::Ended);
        assert_eq!(record.store_id, "simulated-shop");
    }
}

use serde::Serialize;
use tokio::sync::watch;

use crate::entities::{Coordinates, RescueState, RouteTrace};

/// What a tracking screen renders.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ViewState {
    pub current_location: Option<Coordinates>,
    pub destination: Option<Coordinates>,
    pub route: RouteTrace,
    pub counterpart_location: Option<Coordinates>,
    /// Kilometers between `current_location` and `counterpart_location`.
    pub counterpart_distance: Option<f64>,
    pub rescue_state: Option<RescueState>,
}

/// Single-writer state container. The owning session writes through the
/// crate-private setters; everyone else reads snapshots or subscribes.
#[derive(Debug)]
pub struct TrackingView {
    state: watch::Sender<ViewState>,
}

impl TrackingView {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self { state }
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub(crate) fn set_current_location(&self, coordinates: Coordinates) {
        self.state
            .send_modify(|state| state.current_location = Some(coordinates));
    }

    pub(crate) fn set_destination(&self, coordinates: Coordinates) {
        self.state
            .send_modify(|state| state.destination = Some(coordinates));
    }

    pub(crate) fn set_route(&self, route: RouteTrace) {
        self.state.send_modify(|state| state.route = route);
    }

    pub(crate) fn set_counterpart(&self, coordinates: Coordinates, distance: Option<f64>) {
        self.state.send_modify(|state| {
            state.counterpart_location = Some(coordinates);
            state.counterpart_distance = distance;
        });
    }

    pub(crate) fn set_rescue_state(&self, rescue_state: RescueState) {
        self.state
            .send_modify(|state| state.rescue_state = Some(rescue_state));
    }
}

impl Default for TrackingView {
    fn default() -> Self {
        Self::new()
    }
}

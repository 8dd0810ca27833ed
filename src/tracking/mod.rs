//! Rescue tracking: device positions in, shared record and route out.

mod observer;
mod publisher;
mod route_fetcher;
mod sampler;
mod session;
mod view;

pub use observer::RescueObserver;
pub use publisher::LocationPublisher;
pub use route_fetcher::{RefreshOutcome, RouteFetcher};
pub use sampler::{PositionSampler, SignificanceFilter, SIGNIFICANT_MOVEMENT_M};
pub use session::{RescueSession, Role, SessionOptions};
pub use view::{TrackingView, ViewState};

#[cfg(test)]
pub(crate) use route_fetcher::tests::ScriptedRoutes;

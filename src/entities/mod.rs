mod coordinates;
mod rescue;
mod route;
mod shop;

pub use coordinates::Coordinates;
pub use rescue::{RescueEntry, RescuePatch, RescueRecord, RescueRequest, RescueState};
pub use route::{RouteSummary, RouteTrace};
pub use shop::{RankedShop, Shop};

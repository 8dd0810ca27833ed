pub mod api;
pub mod config;
pub mod distance;
pub mod engine;
pub mod entities;
pub mod error;
pub mod external;
pub mod server;
pub mod simulation;
pub mod store;
pub mod subscription;
pub mod tracking;

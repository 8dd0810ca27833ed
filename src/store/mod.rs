//! Keyed store for [`RescueRecord`]s with push notifications.

mod memory;
mod postgres;

use async_trait::async_trait;

use crate::entities::{RescuePatch, RescueRecord};
use crate::error::Error;
use crate::subscription::Subscription;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Collection (table / notification channel) holding rescue records.
pub const RESCUES: &str = "rescues";

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Creates the record or merges `patch` over it. Fields absent from the
    /// patch keep their stored values.
    async fn merge_upsert(&self, id: &str, patch: RescuePatch) -> Result<RescueRecord, Error>;

    /// Merges `patch` over an existing record; fails with a not-found error
    /// when there is none.
    async fn update(&self, id: &str, patch: RescuePatch) -> Result<RescueRecord, Error>;

    async fn get(&self, id: &str) -> Result<Option<RescueRecord>, Error>;

    /// Every record owned by `user_id`, keyed by request id.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<(String, RescueRecord)>, Error>;

    /// Current snapshot (if any) followed by every later write to `id`.
    async fn subscribe(&self, id: &str) -> Result<Subscription<RescueRecord>, Error>;
}

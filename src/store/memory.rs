use std::collections::HashMap;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use crate::{
    entities::{RescuePatch, RescueRecord},
    error::{record_not_found_error, Error},
    store::RecordStore,
    subscription::{ListenerHandle, Subscription},
};

/// Process-local store. Writes are broadcast to subscribers of the same key.
#[derive(Debug)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, RescueRecord>>,
    changes: broadcast::Sender<(String, RescueRecord)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);

        Self {
            records: RwLock::new(HashMap::new()),
            changes,
        }
    }

    fn notify(&self, id: &str, record: &RescueRecord) {
        // no subscribers is fine
        let _ = self.changes.send((id.to_string(), record.clone()));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    #[tracing::instrument(skip(self))]
    async fn merge_upsert(&self, id: &str, patch: RescuePatch) -> Result<RescueRecord, Error> {
        let mut records = self.records.write().await;

        let record = RescueRecord::merged(records.get(id).cloned(), patch)?;
        records.insert(id.to_string(), record.clone());

        self.notify(id, &record);

        Ok(record)
    }

    #[tracing::instrument(skip(self))]
    async fn update(&self, id: &str, patch: RescuePatch) -> Result<RescueRecord, Error> {
        let mut records = self.records.write().await;

        let record = records.get_mut(id).ok_or_else(record_not_found_error)?;
        record.apply(patch);
        let record = record.clone();

        self.notify(id, &record);

        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<RescueRecord>, Error> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<(String, RescueRecord)>, Error> {
        let records = self.records.read().await;

        Ok(records
            .iter()
            .filter(|(_, record)| record.user_id == user_id)
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn subscribe(&self, id: &str) -> Result<Subscription<RescueRecord>, Error> {
        let mut changes = self.changes.subscribe();
        let current = self.get(id).await?;

        let (sender, receiver) = async_channel::unbounded();
        let key = id.to_string();

        let forwarder = ListenerHandle::spawn(move |active| async move {
            if let Some(record) = current {
                if sender.send(record).await.is_err() {
                    return;
                }
            }

            loop {
                match changes.recv().await {
                    Ok((changed, record)) => {
                        if !active.load(Ordering::SeqCst) {
                            break;
                        }
                        if changed != key {
                            continue;
                        }
                        if sender.send(record).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped = skipped, "rescue listener lagged, skipped updates");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::with_forwarder(receiver, forwarder))
    }
}

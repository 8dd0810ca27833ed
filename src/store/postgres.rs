use std::sync::atomic::Ordering;

use async_trait::async_trait;
use sqlx::{
    postgres::{PgListener, PgPoolOptions},
    types::Json,
    Executor, Pool, Postgres, Row, Transaction,
};

use crate::{
    entities::{RescuePatch, RescueRecord},
    error::{record_not_found_error, Error},
    store::{RecordStore, RESCUES},
    subscription::{ListenerHandle, Subscription},
};

type Database = Postgres;

/// Rescue records as JSONB documents. Every committed write emits a
/// `pg_notify` on the `rescues` channel with the record id as payload.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: Pool<Database>,
}

impl PgStore {
    #[tracing::instrument(name = "PgStore::new", skip(db_uri))]
    pub async fn new(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS rescues (id VARCHAR PRIMARY KEY, data JSONB NOT NULL)")
            .await?;

        Ok(Self { pool })
    }

    async fn write(&self, id: &str, patch: RescuePatch, upsert: bool) -> Result<RescueRecord, Error> {
        let mut tx = self.pool.begin().await?;

        let existing = fetch_rescue_for_update(&mut tx, id).await?;
        if existing.is_none() && !upsert {
            return Err(record_not_found_error());
        }

        let record = RescueRecord::merged(existing, patch)?;

        save_rescue(&mut tx, id, &record).await?;

        tx.commit().await?;

        Ok(record)
    }
}

#[tracing::instrument(skip(tx))]
async fn fetch_rescue_for_update(
    tx: &mut Transaction<'_, Database>,
    id: &str,
) -> Result<Option<RescueRecord>, Error> {
    let maybe_result = sqlx::query("SELECT data FROM rescues WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

    match maybe_result {
        Some(result) => {
            let Json(record): Json<RescueRecord> = result.try_get("data")?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

#[tracing::instrument(skip(tx, record))]
async fn save_rescue(
    tx: &mut Transaction<'_, Database>,
    id: &str,
    record: &RescueRecord,
) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO rescues (id, data) VALUES ($1, $2) ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
    )
    .bind(id)
    .bind(Json(record))
    .execute(&mut *tx)
    .await?;

    // delivered to listeners on commit
    sqlx::query("SELECT pg_notify($1, $2)")
        .bind(RESCUES)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    Ok(())
}

async fn find_rescue(pool: &Pool<Database>, id: &str) -> Result<Option<RescueRecord>, Error> {
    let maybe_result = pool
        .fetch_optional(sqlx::query("SELECT data FROM rescues WHERE id = $1").bind(id))
        .await?;

    match maybe_result {
        Some(result) => {
            let Json(record): Json<RescueRecord> = result.try_get("data")?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl RecordStore for PgStore {
    #[tracing::instrument(skip(self))]
    async fn merge_upsert(&self, id: &str, patch: RescuePatch) -> Result<RescueRecord, Error> {
        self.write(id, patch, true).await
    }

    #[tracing::instrument(skip(self))]
    async fn update(&self, id: &str, patch: RescuePatch) -> Result<RescueRecord, Error> {
        self.write(id, patch, false).await
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Option<RescueRecord>, Error> {
        find_rescue(&self.pool, id).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<(String, RescueRecord)>, Error> {
        let rows = sqlx::query("SELECT id, data FROM rescues WHERE data->>'userId' = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| -> Result<(String, RescueRecord), Error> {
                let id: String = row.try_get("id")?;
                let Json(record): Json<RescueRecord> = row.try_get("data")?;
                Ok((id, record))
            })
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn subscribe(&self, id: &str) -> Result<Subscription<RescueRecord>, Error> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(RESCUES).await?;

        let current = find_rescue(&self.pool, id).await?;

        let pool = self.pool.clone();
        let key = id.to_string();
        let (sender, receiver) = async_channel::unbounded();

        let forwarder = ListenerHandle::spawn(move |active| async move {
            if let Some(record) = current {
                if sender.send(record).await.is_err() {
                    return;
                }
            }

            loop {
                let notification = match listener.recv().await {
                    Ok(notification) => notification,
                    Err(err) => {
                        tracing::warn!(error = %err, "rescue listener failed");
                        break;
                    }
                };

                if !active.load(Ordering::SeqCst) {
                    break;
                }
                if notification.payload() != key {
                    continue;
                }

                match find_rescue(&pool, &key).await {
                    Ok(Some(record)) => {
                        if sender.send(record).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => continue,
                    Err(err) => tracing::warn!("failed to read rescue {}: {}", key, err),
                }
            }
        });

        Ok(Subscription::with_forwarder(receiver, forwarder))
    }
}

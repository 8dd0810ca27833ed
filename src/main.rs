use std::sync::Arc;
use std::time::Duration;

use rescue_tracker::config::Config;
use rescue_tracker::engine::Engine;
use rescue_tracker::error::Error;
use rescue_tracker::external::{OsrmClient, RouteProvider};
use rescue_tracker::server::serve;
use rescue_tracker::simulation;
use rescue_tracker::store::{MemoryStore, PgStore, RecordStore};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(url) => Arc::new(PgStore::new(url, config.database_max_connections).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, rescue records are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let routes: Arc<dyn RouteProvider> =
        Arc::new(OsrmClient::new(config.routing_api_base.clone()));

    if let Some(simulation) = config.simulation.clone() {
        let tracking = config.tracking;
        let routes = routes.clone();
        let store = store.clone();

        tokio::spawn(async move {
            if let Err(err) =
                simulation::run(simulation, tracking, routes, store, Duration::from_secs(1)).await
            {
                tracing::error!("simulation failed: {}", err);
            }
        });
    }

    let engine = Engine::new(store, routes, config.tracking);

    serve(engine, config.listen_addr).await
}

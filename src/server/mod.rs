mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::api::API;
use crate::error::{unexpected_error, Error};
use crate::server::handlers::{positions, rescues, routes, shops};

pub type DynAPI = Arc<dyn API + Send + Sync>;

pub fn router(api: DynAPI) -> Router {
    Router::new()
        .route("/rescues", post(rescues::request))
        .route("/rescues/:id", get(rescues::find))
        .route("/rescues/:id/accept", post(rescues::accept))
        .route("/rescues/:id/start", patch(rescues::start))
        .route("/rescues/:id/location", patch(rescues::update_location))
        .route("/rescues/:id/end", patch(rescues::end))
        .route("/rescues/:id/decline", patch(rescues::decline))
        .route(
            "/rescues/:id/positions",
            post(positions::track).delete(positions::stop),
        )
        .route("/users/:id/rescues", get(rescues::list))
        .route("/routes", get(routes::find))
        .route("/shops/rank", post(shops::rank))
        .route("/shops/proximity", post(shops::proximity))
        .layer(Extension(api))
}

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) -> Result<(), Error> {
    let app = router(Arc::new(api) as DynAPI);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(unexpected_error)
}

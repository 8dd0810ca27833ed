use super::Engine;

use async_trait::async_trait;

use crate::{
    api::RouteAPI,
    entities::{Coordinates, RouteSummary},
    error::Error,
};

#[async_trait]
impl RouteAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn find_route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteSummary, Error> {
        origin.validate()?;
        destination.validate()?;

        let trace = self.routes.fetch_route(origin, destination).await?;

        Ok(RouteSummary::new(origin, destination, trace))
    }
}

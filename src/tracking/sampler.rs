use std::sync::Arc;

use crate::{
    distance::distance_meters,
    entities::Coordinates,
    error::{permission_denied_error, Error},
    external::{GeolocationProvider, Permission, WatchOptions},
    subscription::Subscription,
};

pub const SIGNIFICANT_MOVEMENT_M: f64 = 100.0;

/// Device positions, one-shot or continuous, behind a foreground permission.
#[derive(Clone)]
pub struct PositionSampler {
    provider: Arc<dyn GeolocationProvider>,
    options: WatchOptions,
}

impl PositionSampler {
    pub fn new(provider: Arc<dyn GeolocationProvider>, options: WatchOptions) -> Self {
        Self { provider, options }
    }

    async fn ensure_permission(&self) -> Result<(), Error> {
        match self.provider.request_foreground_permission().await {
            Permission::Granted => Ok(()),
            Permission::Denied => {
                tracing::warn!("location permission not granted");
                Err(permission_denied_error())
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn current_position(&self) -> Result<Coordinates, Error> {
        self.ensure_permission().await?;
        self.provider.current_position().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn watch(&self) -> Result<Subscription<Coordinates>, Error> {
        self.ensure_permission().await?;
        self.provider.watch_position(self.options).await
    }
}

/// Debounces raw samples: only movement strictly beyond the threshold from
/// the last accepted position gets through.
#[derive(Clone, Debug)]
pub struct SignificanceFilter {
    last_known: Option<Coordinates>,
    /// Meters.
    threshold: f64,
}

impl SignificanceFilter {
    pub fn new(threshold: f64) -> Self {
        Self {
            last_known: None,
            threshold,
        }
    }

    pub fn starting_at(last_known: Option<Coordinates>, threshold: f64) -> Self {
        Self {
            last_known,
            threshold,
        }
    }

    pub fn last_known(&self) -> Option<Coordinates> {
        self.last_known
    }

    pub fn accept(&mut self, sample: Coordinates) -> bool {
        let significant = match self.last_known {
            Some(last) => distance_meters(last, sample) > self.threshold,
            None => true,
        };

        if significant {
            self.last_known = Some(sample);
        }

        significant
    }
}

impl Default for SignificanceFilter {
    fn default() -> Self {
        Self::new(SIGNIFICANT_MOVEMENT_M)
    }
}

use std::sync::atomic::{AtomicBool, Ordering};

use async_channel::Sender;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    distance::distance_meters,
    entities::Coordinates,
    error::{permission_denied_error, position_unavailable_error, Error},
    subscription::Subscription,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WatchOptions {
    /// Minimum movement in meters before the provider reports a new position.
    pub distance_interval: f64,
    pub high_accuracy: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            distance_interval: 10.0,
            high_accuracy: true,
        }
    }
}

#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn request_foreground_permission(&self) -> Permission;

    async fn current_position(&self) -> Result<Coordinates, Error>;

    /// Continuous positions until the returned subscription is released.
    async fn watch_position(&self, options: WatchOptions)
        -> Result<Subscription<Coordinates>, Error>;
}

#[derive(Debug)]
struct Watcher {
    sender: Sender<Coordinates>,
    options: WatchOptions,
    last_delivered: Option<Coordinates>,
}

/// Provider fed from outside through [`ChannelGeolocation::push`]: a device
/// bridge, a simulation, or a test.
#[derive(Debug)]
pub struct ChannelGeolocation {
    granted: AtomicBool,
    last: Mutex<Option<Coordinates>>,
    watchers: Mutex<Vec<Watcher>>,
}

impl ChannelGeolocation {
    pub fn new(permission: Permission) -> Self {
        Self {
            granted: AtomicBool::new(permission == Permission::Granted),
            last: Mutex::new(None),
            watchers: Mutex::new(vec![]),
        }
    }

    pub fn set_permission(&self, permission: Permission) {
        self.granted
            .store(permission == Permission::Granted, Ordering::SeqCst);
    }

    /// Records a raw fix and fans it out to watchers whose distance interval
    /// it satisfies. Returns how many watchers received it.
    pub async fn push(&self, coordinates: Coordinates) -> usize {
        *self.last.lock().await = Some(coordinates);

        let mut watchers = self.watchers.lock().await;
        watchers.retain(|watcher| !watcher.sender.is_closed());

        let mut delivered = 0;
        for watcher in watchers.iter_mut() {
            if let Some(previous) = watcher.last_delivered {
                if distance_meters(previous, coordinates) < watcher.options.distance_interval {
                    continue;
                }
            }

            if watcher.sender.try_send(coordinates).is_ok() {
                watcher.last_delivered = Some(coordinates);
                delivered += 1;
            }
        }

        delivered
    }

    pub async fn watcher_count(&self) -> usize {
        let mut watchers = self.watchers.lock().await;
        watchers.retain(|watcher| !watcher.sender.is_closed());
        watchers.len()
    }
}

#[async_trait]
impl GeolocationProvider for ChannelGeolocation {
    async fn request_foreground_permission(&self) -> Permission {
        if self.granted.load(Ordering::SeqCst) {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    async fn current_position(&self) -> Result<Coordinates, Error> {
        if !self.granted.load(Ordering::SeqCst) {
            return Err(permission_denied_error());
        }

        self.last.lock().await.ok_or_else(position_unavailable_error)
    }

    async fn watch_position(
        &self,
        options: WatchOptions,
    ) -> Result<Subscription<Coordinates>, Error> {
        if !self.granted.load(Ordering::SeqCst) {
            return Err(permission_denied_error());
        }

        let (sender, receiver) = async_channel::unbounded();

        self.watchers.lock().await.push(Watcher {
            sender,
            options,
            last_delivered: None,
        });

        Ok(Subscription::new(receiver))
    }
}

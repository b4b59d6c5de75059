//! Refresh coordination: single-flight fetch cycles, last-good cache, and
//! change listeners.
//!
//! One coordinator exists per configured account. All read-only consumers
//! (display mappers, trackers) read the cached snapshot here and never
//! trigger their own network calls; both the host's periodic scheduler and
//! out-of-band refresh requests funnel through [`RefreshCoordinator::request_refresh`],
//! which collapses overlapping requests into a single fetch.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::cars::{Car, CarApi, CarFetcher};

/// The last successfully fetched vehicle state for one account.
#[derive(Debug, Clone, PartialEq)]
pub struct CarSnapshot {
    /// Merged vehicle records in server list order, VINs unique.
    pub cars: Vec<Car>,
    /// When the fetch cycle that produced this snapshot completed.
    pub fetched_at: DateTime<Utc>,
}

impl CarSnapshot {
    pub fn new(cars: Vec<Car>) -> Self {
        Self {
            cars,
            fetched_at: Utc::now(),
        }
    }

    pub fn car(&self, vin: &str) -> Option<&Car> {
        self.cars.iter().find(|c| c.vin() == Some(vin))
    }
}

/// How a refresh cycle failed, from the host platform's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// Credentials are invalid or expired; the host should start its
    /// re-authentication flow.
    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    /// Transient failure; the previously cached snapshot remains valid and
    /// displayable.
    #[error("update failed: {0}")]
    UpdateFailed(String),
}

impl From<ApiError> for RefreshError {
    fn from(err: ApiError) -> Self {
        if err.is_authentication() {
            RefreshError::AuthenticationRequired(err.to_string())
        } else {
            RefreshError::UpdateFailed(err.to_string())
        }
    }
}

pub type RefreshOutcome = Result<CarSnapshot, RefreshError>;

/// Source of one complete fetch cycle; implemented by [`CarFetcher`].
#[async_trait]
pub trait CarSource: Send + Sync {
    async fn fetch_cars(&self) -> Result<CarSnapshot, ApiError>;
}

#[async_trait]
impl<A: CarApi> CarSource for CarFetcher<A> {
    async fn fetch_cars(&self) -> Result<CarSnapshot, ApiError> {
        CarFetcher::fetch_cars(self).await
    }
}

type Listener = std::sync::Arc<dyn Fn(&CarSnapshot) + Send + Sync>;

struct CoordinatorState {
    snapshot: Option<CarSnapshot>,
    /// Present while a fetch is in flight; joining requesters await the
    /// outcome published on this channel instead of starting a second fetch.
    in_flight: Option<watch::Receiver<Option<RefreshOutcome>>>,
}

/// Clears the in-flight marker when the owning refresh future is dropped
/// before its fetch completes, so a cancelled cycle never blocks later
/// requests. Joiners of the cancelled cycle observe the dropped sender and
/// report the abandonment; the next request starts a fresh fetch.
struct InFlightGuard<'a> {
    state: &'a Mutex<CoordinatorState>,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = match self.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.in_flight = None;
        }
    }
}

/// Owns the cached result and the single-flight refresh state for one
/// account.
pub struct RefreshCoordinator<S: CarSource> {
    source: S,
    state: Mutex<CoordinatorState>,
    listeners: Mutex<Vec<Listener>>,
}

impl<S: CarSource> RefreshCoordinator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: Mutex::new(CoordinatorState {
                snapshot: None,
                in_flight: None,
            }),
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<Listener>> {
        match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The last successfully fetched snapshot, or `None` before the first
    /// success. An empty cache is not an error; consumers render an
    /// unavailable state.
    pub fn snapshot(&self) -> Option<CarSnapshot> {
        self.lock_state().snapshot.clone()
    }

    /// Whether a fetch cycle is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.lock_state().in_flight.is_some()
    }

    /// Register a change listener.
    ///
    /// Listeners are invoked synchronously, in registration order, after a
    /// successful refresh has replaced the cached snapshot; a listener that
    /// re-reads the cache observes the new value. Failed refreshes do not
    /// notify.
    pub fn register_listener(&self, listener: impl Fn(&CarSnapshot) + Send + Sync + 'static) {
        self.lock_listeners().push(std::sync::Arc::new(listener));
    }

    /// Mark a refresh as started, or hand back the channel of the cycle
    /// already in flight.
    fn begin_refresh(
        &self,
    ) -> Result<watch::Sender<Option<RefreshOutcome>>, watch::Receiver<Option<RefreshOutcome>>>
    {
        let mut state = self.lock_state();
        if let Some(rx) = state.in_flight.clone() {
            return Err(rx);
        }
        let (tx, rx) = watch::channel(None);
        state.in_flight = Some(rx);
        Ok(tx)
    }

    /// Run one refresh cycle, or join the cycle already in flight.
    ///
    /// On success the cached snapshot is replaced atomically and listeners
    /// are notified; on failure the cache is left untouched and the
    /// classified error is returned to every caller that joined this cycle.
    pub async fn request_refresh(&self) -> RefreshOutcome {
        let publish = match self.begin_refresh() {
            Ok(tx) => tx,
            Err(rx) => {
                debug!("Refresh already in flight, joining its outcome");
                return join_in_flight(rx).await;
            }
        };
        let mut in_flight = InFlightGuard {
            state: &self.state,
            armed: true,
        };

        debug!("Starting refresh cycle");
        let outcome: RefreshOutcome = self
            .source
            .fetch_cars()
            .await
            .map_err(RefreshError::from);

        let updated = {
            let mut state = self.lock_state();
            state.in_flight = None;
            in_flight.armed = false;
            match &outcome {
                Ok(snapshot) => {
                    state.snapshot = Some(snapshot.clone());
                    Some(snapshot.clone())
                }
                Err(err) => {
                    warn!(error = %err, "Refresh failed, keeping cached result");
                    None
                }
            }
        };

        // Notify after the cache mutation is complete and visible. The list
        // is snapshotted so a listener may register further listeners.
        if let Some(snapshot) = &updated {
            let listeners: Vec<Listener> = self.lock_listeners().clone();
            debug!(cars = snapshot.cars.len(), listeners = listeners.len(), "Refresh complete");
            for listener in &listeners {
                listener(snapshot);
            }
        }

        let _ = publish.send(Some(outcome.clone()));
        outcome
    }
}

async fn join_in_flight(mut rx: watch::Receiver<Option<RefreshOutcome>>) -> RefreshOutcome {
    loop {
        {
            let value = rx.borrow_and_update();
            if let Some(outcome) = value.as_ref() {
                return outcome.clone();
            }
        }
        if rx.changed().await.is_err() {
            // The fetch task dropped its sender without publishing.
            return Err(RefreshError::UpdateFailed(
                "refresh abandoned before completion".to_string(),
            ));
        }
    }
}

//! List + detail fetch orchestration for one refresh cycle.
//!
//! The list endpoint returns cheap identity records; telemetry lives behind a
//! per-VIN detail endpoint. The fetcher fans the detail calls out
//! concurrently, merges whatever succeeds back into the list records, and
//! never lets a single failed enrichment drop a vehicle or abort the cycle.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::coordinator::CarSnapshot;

use super::Car;

/// Capability surface the fetcher needs from an API client.
///
/// `supports_detail` is an explicit flag: clients for server deployments
/// without the detail endpoint return `false` and the fetcher skips
/// enrichment entirely instead of probing at runtime.
#[async_trait]
pub trait CarApi: Send + Sync {
    async fn list_cars(&self) -> Result<Vec<Car>, ApiError>;

    fn supports_detail(&self) -> bool;

    async fn car_detail(&self, vin: &str) -> Result<Car, ApiError>;
}

#[async_trait]
impl<A: CarApi + ?Sized> CarApi for Arc<A> {
    async fn list_cars(&self) -> Result<Vec<Car>, ApiError> {
        (**self).list_cars().await
    }

    fn supports_detail(&self) -> bool {
        (**self).supports_detail()
    }

    async fn car_detail(&self, vin: &str) -> Result<Car, ApiError> {
        (**self).car_detail(vin).await
    }
}

/// Produces the merged vehicle sequence for one refresh cycle.
pub struct CarFetcher<A: CarApi> {
    api: A,
}

impl<A: CarApi> CarFetcher<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetch the car list and enrich each VIN-carrying record with its
    /// detail record.
    ///
    /// List failures propagate unchanged. Detail fetches run concurrently;
    /// an individual failure degrades that car to its list-tier record. Cars
    /// without a VIN pass through unmerged and list order is preserved. The
    /// snapshot timestamp is taken after the combined cycle, whether or not
    /// individual enrichments failed.
    pub async fn fetch_cars(&self) -> Result<CarSnapshot, ApiError> {
        let mut cars = self.api.list_cars().await?;

        if !self.api.supports_detail() {
            debug!(count = cars.len(), "Detail endpoint unsupported, serving list records");
            return Ok(CarSnapshot::new(cars));
        }

        let detail_futures: Vec<_> = cars
            .iter()
            .map(|car| {
                let vin = car.vin().map(str::to_owned);
                async move {
                    match vin {
                        Some(vin) => {
                            let outcome = self.api.car_detail(&vin).await;
                            Some((vin, outcome))
                        }
                        None => None,
                    }
                }
            })
            .collect();
        let outcomes = join_all(detail_futures).await;

        for (car, outcome) in cars.iter_mut().zip(outcomes) {
            match outcome {
                Some((_, Ok(detail))) => car.merge_detail(detail),
                Some((vin, Err(err))) => {
                    warn!(vin = %vin, error = %err, "Detail fetch failed, keeping list record");
                }
                None => {}
            }
        }

        debug!(count = cars.len(), "Fetched car list");
        Ok(CarSnapshot::new(cars))
    }
}

//! Polling bridge for the OpenCARWINGS vehicle telemetry API.
//!
//! OpenCARWINGS is a community service exposing Nissan Leaf EV data. This
//! crate owns the client side of a home-automation integration: the JWT
//! token lifecycle with transparent refresh-on-401, the list + per-VIN
//! detail fetch/merge pipeline, and a single-flight refresh coordinator
//! holding the last good snapshot for read-only consumers.
//!
//! The host platform supplies account configuration and a periodic
//! scheduler, and reads entity values from [`coordinator::RefreshCoordinator`].
//!
//! Typical wiring:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use carwings_bridge::api::ApiClient;
//! use carwings_bridge::cars::CarFetcher;
//! use carwings_bridge::config::AccountConfig;
//! use carwings_bridge::coordinator::RefreshCoordinator;
//!
//! # async fn wire() -> anyhow::Result<()> {
//! let config = AccountConfig::load()?;
//! let client = Arc::new(ApiClient::new(config.base_url.clone())?);
//! client.set_tokens(config.access_token.clone(), config.refresh_token.clone());
//!
//! let coordinator = RefreshCoordinator::new(CarFetcher::new(Arc::clone(&client)));
//! let snapshot = coordinator.request_refresh().await?;
//! for car in &snapshot.cars {
//!     println!("{}: {:?}%", car.display_name(), car.soc());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod cars;
pub mod config;
pub mod coordinator;

pub use api::{ApiClient, ApiError, CarCommand};
pub use auth::TokenSet;
pub use cars::{Car, CarFetcher, CarStatus};
pub use coordinator::{CarSnapshot, RefreshCoordinator, RefreshError};

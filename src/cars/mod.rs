//! Vehicle records and the list + detail fetch pipeline.

pub mod car;
pub mod fetcher;

pub use car::{Car, CarStatus};
pub use fetcher::{CarApi, CarFetcher};

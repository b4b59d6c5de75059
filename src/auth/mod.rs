//! Token storage for JWT bearer authentication.
//!
//! Holds the access/refresh token pair for one account. The API client is
//! the only writer; the host platform persists the pair across restarts via
//! its own configuration storage.

pub mod tokens;

pub use tokens::{TokenSet, TokenStore};

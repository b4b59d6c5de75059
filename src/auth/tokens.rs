use std::sync::{Mutex, MutexGuard};

/// A JWT token pair for one account.
///
/// The access token is short-lived and sent as a bearer header; the refresh
/// token is longer-lived and exchanged for new access tokens. Either may be
/// absent before the first credential exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

/// Holds the current token pair for one account.
///
/// Owned exclusively by the API client; mutated only by the credential
/// exchange, the refresh operation, and configuration load.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: Mutex<TokenSet>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, TokenSet> {
        match self.tokens.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Replace both tokens, e.g. from stored configuration.
    pub fn set_tokens(&self, access: Option<String>, refresh: Option<String>) {
        let mut tokens = self.locked();
        tokens.access = access;
        tokens.refresh = refresh;
    }

    /// Replace only the access token. The refresh token is never rotated by
    /// the upstream service, so refresh operations call this.
    pub fn set_access(&self, access: String) {
        self.locked().access = Some(access);
    }

    pub fn access(&self) -> Option<String> {
        self.locked().access.clone()
    }

    pub fn refresh(&self) -> Option<String> {
        self.locked().refresh.clone()
    }

    pub fn get(&self) -> TokenSet {
        self.locked().clone()
    }
}

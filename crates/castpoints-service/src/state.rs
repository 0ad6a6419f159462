//! Application state.

use std::sync::Arc;
use std::time::Duration;

use castpoints_store::RocksStore;

use crate::auth::JwksCache;
use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// JWKS key cache for JWT validation.
    ///
    /// Owned here and injected into the auth extractors rather than held in
    /// module-level state, so its TTL is configurable and tests get a fresh
    /// cache per instance.
    pub jwks: Arc<JwksCache>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let jwks = Arc::new(JwksCache::new(Duration::from_secs(config.jwks_ttl_seconds)));

        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not configured - generation callbacks will be rejected");
        }
        if config.admin_api_key.is_none() {
            tracing::warn!("ADMIN_API_KEY not configured - admin grants will be rejected");
        }

        Self {
            store,
            config,
            jwks,
        }
    }
}

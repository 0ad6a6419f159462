//! Service configuration.

use castpoints_core::PolicyConfig;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/castpoints").
    pub data_dir: String,

    /// OAuth provider base URL for JWT validation.
    pub auth_base_url: String,

    /// Expected JWT audience (default: "castpoints").
    pub auth_audience: String,

    /// JWKS cache TTL in seconds (default: 3600).
    pub jwks_ttl_seconds: u64,

    /// Service API key for service-to-service auth (generation callbacks).
    pub service_api_key: Option<String>,

    /// Admin API key for manual point adjustments.
    pub admin_api_key: Option<String>,

    /// Tolerance for completion-callback timestamps in seconds (default: 10).
    ///
    /// Callbacks whose `completed_at` deviates from server time by more than
    /// this are rejected. A weak replay defense; the task-reference
    /// idempotency check is the real one.
    pub callback_tolerance_seconds: i64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Points policy (grant amounts and generation costs).
    pub policy: PolicyConfig,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = PolicyConfig::default();
        let policy = PolicyConfig {
            bootstrap_bonus_points: env_parse(
                "BOOTSTRAP_BONUS_POINTS",
                defaults.bootstrap_bonus_points,
            ),
            daily_sign_in_points: env_parse("DAILY_SIGN_IN_POINTS", defaults.daily_sign_in_points),
            generation_base_cost: env_parse("GENERATION_BASE_COST", defaults.generation_base_cost),
            generation_cost_per_minute: env_parse(
                "GENERATION_COST_PER_MINUTE",
                defaults.generation_cost_per_minute,
            ),
        };

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/castpoints".into()),
            auth_base_url: std::env::var("AUTH_BASE_URL")
                .unwrap_or_else(|_| "https://auth.castpoints.dev".into()),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or_else(|_| "castpoints".into()),
            jwks_ttl_seconds: env_parse("JWKS_TTL_SECONDS", 3600),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            callback_tolerance_seconds: env_parse("CALLBACK_TOLERANCE_SECONDS", 10),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES", 1024 * 1024), // 1MB
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS", 30),
            policy,
        }
    }
}

/// Parse an environment variable, falling back to a default.
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/castpoints".into(),
            auth_base_url: "https://auth.castpoints.dev".into(),
            auth_audience: "castpoints".into(),
            jwks_ttl_seconds: 3600,
            service_api_key: None,
            admin_api_key: None,
            callback_tolerance_seconds: 10,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            policy: PolicyConfig::default(),
        }
    }
}

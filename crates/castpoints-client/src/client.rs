//! Castpoints HTTP client implementation.

use reqwest::Client;
use std::time::Duration;

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, BalanceResponse, GenerationChargeResponse, GenerationCheckRequest,
    GenerationCheckResponse, GenerationCompletion,
};

/// Castpoints API client.
///
/// Provides methods for gate checks and completion reporting.
#[derive(Debug, Clone)]
pub struct CastpointsClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_name: String,
}

impl CastpointsClient {
    /// Create a new castpoints client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the castpoints service (e.g., `"http://castpoints:8080"`)
    /// * `api_key` - Service API key for authentication
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new castpoints client with custom options.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with default settings).
    #[must_use]
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            service_name: options.service_name,
        }
    }

    /// Check whether a user can afford a generation of the given estimated
    /// duration. No debit occurs.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn check_generation(
        &self,
        user_id: impl Into<String>,
        estimated_duration_seconds: u64,
    ) -> Result<GenerationCheckResponse, ClientError> {
        let url = format!("{}/v1/generation/check", self.base_url);
        let request = GenerationCheckRequest {
            user_id: user_id.into(),
            estimated_duration_seconds,
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Report a completed generation, debiting its cost from the user.
    ///
    /// Safe to retry: the `task_id` is an idempotency key on the server, so a
    /// repeated report fails with [`ClientError::DuplicateTask`] instead of
    /// charging twice.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn complete_generation(
        &self,
        completion: GenerationCompletion,
    ) -> Result<GenerationChargeResponse, ClientError> {
        let url = format!("{}/v1/generation/complete", self.base_url);
        let task_id = completion.task_id.clone();

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
            .json(&completion)
            .send()
            .await?;

        let result = self.handle_response(response).await;

        if let Err(ref e) = result {
            tracing::debug!(task_id = %task_id, error = %e, "Completion report failed");
        }

        result
    }

    /// Get a user's current balance (requires user JWT, not service API key).
    ///
    /// This method is typically used by the user-facing dashboard, not by services.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_balance(&self, user_jwt: &str) -> Result<BalanceResponse, ClientError> {
        let url = format!("{}/v1/points/balance", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("authorization", format!("Bearer {user_jwt}"))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let code = api_error.error.code.as_str();
                let message = api_error.error.message;

                // Map specific error codes to typed errors
                match code {
                    "insufficient_points" => {
                        let balance = api_error
                            .error
                            .details
                            .as_ref()
                            .and_then(|d| d.get("balance"))
                            .and_then(serde_json::Value::as_i64)
                            .unwrap_or(0);
                        let required = api_error
                            .error
                            .details
                            .as_ref()
                            .and_then(|d| d.get("required"))
                            .and_then(serde_json::Value::as_i64)
                            .unwrap_or(0);

                        Err(ClientError::InsufficientPoints { balance, required })
                    }
                    "duplicate_reference" => Err(ClientError::DuplicateTask { task_id: message }),
                    "not_found" => Err(ClientError::AccountNotFound { message }),
                    _ => Err(ClientError::Api {
                        code: code.to_string(),
                        message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service name to include in requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}

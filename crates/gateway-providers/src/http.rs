//! HTTP plumbing shared by the REST-based adapters.

use gateway_core::{GatewayError, GatewayResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

/// Build a pooled client with the given socket timeout
pub(crate) fn build_client(timeout: Duration) -> GatewayResult<Client> {
    Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(100)
        .build()
        .map_err(|e| GatewayError::internal(format!("Failed to create HTTP client: {e}")))
}

/// Classify a transport failure
pub(crate) fn transport_error(error: &reqwest::Error, timeout: Duration) -> GatewayError {
    if error.is_timeout() {
        GatewayError::timeout(timeout)
    } else {
        GatewayError::network(error.to_string())
    }
}

/// Decode a successful response body, falling back to defaults when the
/// payload does not match the expected shape.
pub(crate) fn decode_or_default<T>(provider: &str, body: &[u8]) -> T
where
    T: DeserializeOwned + Default,
{
    serde_json::from_slice(body).unwrap_or_else(|e| {
        warn!(provider, error = %e, "Unexpected response payload, using empty result");
        T::default()
    })
}

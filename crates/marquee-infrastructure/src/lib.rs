// SPDX-License-Identifier: GPL-3.0-or-later
pub mod backend;

pub use backend::HttpBackendClient;

use marquee_application::{ServiceError, ServiceResult};
use marquee_config::BackendConfig;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use tracing::info;

pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Shared HTTP client carrying the API key and request timeout from config.
pub fn http_client(config: &BackendConfig) -> ServiceResult<Client> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = config.api_key.as_deref() {
        let mut value = HeaderValue::from_str(api_key)
            .map_err(|err| ServiceError::Request(format!("invalid api key: {err}")))?;
        value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, value);
    }

    let client = Client::builder()
        .pool_max_idle_per_host(8)
        .timeout(config.timeout())
        .default_headers(headers)
        .build()
        .map_err(|err| ServiceError::Request(err.to_string()))?;

    info!(
        target: "backend",
        base_url = %config.base_url,
        timeout_secs = config.timeout_secs,
        authenticated = config.api_key.is_some(),
        "http client initialized"
    );
    Ok(client)
}

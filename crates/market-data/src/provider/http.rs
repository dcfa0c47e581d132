//! Shared HTTP plumbing for providers.
//!
//! Every provider request goes through [`ProviderHttp::get_json`], which
//! applies the client timeout and maps transport failures and HTTP statuses
//! into [`MarketDataError`] so raw `reqwest` errors never leave this crate
//! untyped.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::MarketDataError;

/// Browser-like user agent; Yahoo rejects the default reqwest one.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub(crate) struct ProviderHttp {
    client: Client,
    provider: &'static str,
}

impl ProviderHttp {
    pub(crate) fn new(provider: &'static str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, provider }
    }

    pub(crate) fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Send the request and decode a JSON body of type `T`.
    ///
    /// `symbol` is only used to build a `SymbolNotFound` error on HTTP 404.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        symbol: &str,
    ) -> Result<T, MarketDataError> {
        debug!("{} request for '{}'", self.provider, symbol);

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: self.provider.to_string(),
                }
            } else {
                MarketDataError::Network(e)
            }
        })?;

        let status = response.status();
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(MarketDataError::RateLimited {
                    provider: self.provider.to_string(),
                })
            }
            StatusCode::NOT_FOUND => {
                return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(MarketDataError::ProviderError {
                    provider: self.provider.to_string(),
                    message: "Invalid or missing API key".to_string(),
                });
            }
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                return Err(MarketDataError::Timeout {
                    provider: self.provider.to_string(),
                });
            }
            _ => {}
        }

        if !status.is_success() {
            return Err(MarketDataError::ProviderError {
                provider: self.provider.to_string(),
                message: format!("HTTP error: {}", status),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MarketDataError::Timeout {
                        provider: self.provider.to_string(),
                    }
                } else {
                    MarketDataError::InvalidResponse {
                        provider: self.provider.to_string(),
                        message: format!("Failed to parse response: {}", e),
                    }
                }
            })
    }
}

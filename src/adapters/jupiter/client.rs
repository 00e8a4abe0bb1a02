//! Jupiter API Client
//!
//! HTTP client for the Jupiter aggregator quote and swap endpoints, with
//! rate-limit backoff and retry on server errors. Implements the swap venue
//! port so the quote pipeline can price trades against it directly.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::config::JupiterSection;
use crate::domain::TokenInfo;
use crate::ports::{SwapMode, SwapVenue, VenueError, VenueQuote};

use super::types::{QuoteRequest, QuoteResponse, SwapRequest, SwapResponse};

#[derive(Debug, Clone)]
pub struct JupiterApiConfig {
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for JupiterApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.jup.ag/swap/v1".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

impl From<&JupiterSection> for JupiterApiConfig {
    fn from(section: &JupiterSection) -> Self {
        Self {
            api_base_url: section.api_url.clone(),
            api_key: section.api_key.clone(),
            ..Self::default()
        }
    }
}

/// Jupiter aggregator client.
#[derive(Debug, Clone)]
pub struct JupiterClient {
    config: JupiterApiConfig,
    http: Client,
}

impl JupiterClient {
    pub fn new(config: JupiterApiConfig) -> Result<Self, VenueError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VenueError::Request(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// Fetch a quote for one trade.
    pub async fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, VenueError> {
        let url = format!("{}/quote", self.config.api_base_url);
        let mut req = self.http.get(&url).query(&[
            ("inputMint", request.input_mint.as_str()),
            ("outputMint", request.output_mint.as_str()),
            ("amount", &request.amount.to_string()),
            ("slippageBps", &request.slippage_bps.to_string()),
            ("swapMode", request.swap_mode.as_str()),
        ]);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        let response = self
            .execute_with_retry(|| async {
                req.try_clone()
                    .ok_or_else(|| VenueError::Request("failed to clone request".into()))?
                    .send()
                    .await
                    .map_err(|e| VenueError::Request(e.to_string()))
            })
            .await?;
        self.handle_response(response).await
    }

    /// Build the swap transaction for a previously fetched quote.
    pub async fn get_swap_transaction(
        &self,
        request: &SwapRequest,
    ) -> Result<SwapResponse, VenueError> {
        let url = format!("{}/swap", self.config.api_base_url);
        let mut req = self.http.post(&url).json(request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        let response = self
            .execute_with_retry(|| async {
                req.try_clone()
                    .ok_or_else(|| VenueError::Request("failed to clone request".into()))?
                    .send()
                    .await
                    .map_err(|e| VenueError::Request(e.to_string()))
            })
            .await?;
        self.handle_response(response).await
    }

    async fn execute_with_retry<F, Fut>(
        &self,
        request_fn: F,
    ) -> Result<reqwest::Response, VenueError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, VenueError>>,
    {
        let mut last_error = None;

        for attempt in 0..self.config.max_retries {
            match request_fn().await {
                Ok(response) => {
                    if response.status() == StatusCode::TOO_MANY_REQUESTS {
                        let backoff = Duration::from_secs(2u64.pow(attempt + 1));
                        warn!(
                            ?backoff,
                            attempt = attempt + 1,
                            "rate limited by Jupiter API, backing off"
                        );
                        last_error = Some(VenueError::Request("rate limit exceeded".into()));
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    if response.status().is_server_error() {
                        last_error = Some(VenueError::Request(format!(
                            "server error: {}",
                            response.status()
                        )));
                        tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1)))
                            .await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    last_error = Some(e);
                    tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| VenueError::Request("max retries exceeded".into())))
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, VenueError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VenueError::Request(format!("{status}: {error_text}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| VenueError::InvalidPayload(e.to_string()))
    }
}

fn slippage_pct_to_bps(slippage_pct: Decimal) -> u32 {
    use rust_decimal::prelude::ToPrimitive;
    (slippage_pct * Decimal::ONE_HUNDRED)
        .round()
        .to_u32()
        .unwrap_or(0)
}

#[async_trait]
impl SwapVenue for JupiterClient {
    async fn market_quote(
        &self,
        input: &TokenInfo,
        output: &TokenInfo,
        raw_amount: u64,
        mode: SwapMode,
        slippage_pct: Decimal,
    ) -> Result<VenueQuote, VenueError> {
        let request = QuoteRequest::new(
            input.address.clone(),
            output.address.clone(),
            raw_amount,
            slippage_pct_to_bps(slippage_pct),
            mode,
        );
        let quote = self.get_quote(&request).await?;

        let price_impact_pct = quote
            .price_impact_pct
            .parse::<Decimal>()
            .unwrap_or(Decimal::ZERO);
        Ok(VenueQuote {
            in_amount: quote.in_amount()?,
            out_amount: quote.out_amount()?,
            other_amount_threshold: quote.other_amount_threshold()?,
            price_impact_pct,
            payload: serde_json::to_value(&quote)
                .map_err(|e| VenueError::InvalidPayload(e.to_string()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_slippage_pct_to_bps() {
        assert_eq!(slippage_pct_to_bps(dec!(1)), 100);
        assert_eq!(slippage_pct_to_bps(dec!(0.5)), 50);
        assert_eq!(slippage_pct_to_bps(dec!(0.003)), 0);
    }

    #[test]
    fn test_config_from_section() {
        let section = JupiterSection {
            api_url: "https://example.com/v1".to_string(),
            api_key: Some("key".to_string()),
            default_slippage_pct: dec!(1),
        };
        let config = JupiterApiConfig::from(&section);
        assert_eq!(config.api_base_url, "https://example.com/v1");
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.max_retries, 3);
    }
}

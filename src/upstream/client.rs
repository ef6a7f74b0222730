//! HTTP client for the public exchange rate provider.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::UpstreamConfig;
use crate::rates::{CurrencyCode, Quote};
use crate::upstream::error::UpstreamError;
use crate::upstream::models::ProviderPayload;
use crate::upstream::RateSource;

const USER_AGENT: &str = concat!("rate-gateway/", env!("CARGO_PKG_VERSION"));

/// Errors building the client from configuration.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid upstream base url: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("invalid endpoint currency '{0}'")]
    EndpointCurrency(String),

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Fetches quotes from per-currency endpoints under one base URL.
#[derive(Debug, Clone)]
pub struct HttpRateClient {
    client: reqwest::Client,
    base_url: Url,
    endpoints: HashMap<CurrencyCode, String>,
}

impl HttpRateClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(&config.base_url)?;
        // endpoint paths are appended under the base path, never replace it
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut endpoints = HashMap::with_capacity(config.endpoints.len());
        for (code, path) in &config.endpoints {
            let currency: CurrencyCode = code
                .parse()
                .map_err(|_| ClientError::EndpointCurrency(code.clone()))?;
            endpoints.insert(currency, path.clone());
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            endpoints,
        })
    }

    /// Currencies with a configured endpoint, sorted.
    pub fn currencies(&self) -> Vec<CurrencyCode> {
        let mut codes: Vec<_> = self.endpoints.keys().cloned().collect();
        codes.sort();
        codes
    }

    fn endpoint_url(&self, currency: &CurrencyCode) -> Result<Url, UpstreamError> {
        let path = self
            .endpoints
            .get(currency)
            .ok_or_else(|| UpstreamError::NoEndpoint {
                currency: currency.clone(),
            })?;

        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| UpstreamError::Decode {
                currency: currency.clone(),
                reason: format!("bad endpoint path '{path}': {e}"),
            })
    }
}

#[async_trait]
impl RateSource for HttpRateClient {
    async fn fetch(&self, currency: &CurrencyCode) -> Result<Quote, UpstreamError> {
        let url = self.endpoint_url(currency)?;
        tracing::debug!(currency = %currency, url = %url, "Fetching upstream quote");

        let transport = |source| UpstreamError::Transport {
            currency: currency.clone(),
            source,
        };

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                currency: currency.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        ProviderPayload::parse(currency, &body)?.into_quote(currency)
    }

    fn supports(&self, currency: &CurrencyCode) -> bool {
        self.endpoints.contains_key(currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::RetryClass;

    fn code(s: &str) -> CurrencyCode {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_endpoints() {
        let client = HttpRateClient::new(&UpstreamConfig::default()).unwrap();

        assert_eq!(client.currencies(), vec![code("EUR"), code("USD")]);
        assert!(client.supports(&code("usd")));
        assert!(!client.supports(&code("GBP")));

        let url = client.endpoint_url(&code("EUR")).unwrap();
        assert_eq!(url.as_str(), "https://br.dolarapi.com/v1/cotacoes/eur");
    }

    #[test]
    fn test_base_url_path_prefix_is_kept() {
        for base_url in ["https://gw.example.com/dolarapi", "https://gw.example.com/dolarapi/"] {
            let config = UpstreamConfig {
                base_url: base_url.into(),
                ..Default::default()
            };
            let client = HttpRateClient::new(&config).unwrap();

            let url = client.endpoint_url(&code("EUR")).unwrap();
            assert_eq!(url.as_str(), "https://gw.example.com/dolarapi/v1/cotacoes/eur");
        }
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let config = UpstreamConfig {
            base_url: "not a url".into(),
            ..Default::default()
        };
        assert!(matches!(
            HttpRateClient::new(&config),
            Err(ClientError::BaseUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_currency_is_not_found() {
        let client = HttpRateClient::new(&UpstreamConfig::default()).unwrap();
        let err = client.fetch(&code("JPY")).await.unwrap_err();

        assert!(matches!(err, UpstreamError::NoEndpoint { .. }));
        assert_eq!(err.retry_class(), RetryClass::NotFound);
    }
}

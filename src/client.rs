//! HTTP client for the ratios service.
//!
//! Every endpoint except `/health` wraps its payload in an envelope
//! `{success, data, last_updated, error, message}`; [`ApiResponse`] unwraps it.

use crate::model::{
    Company, CompanyDetail, ComparedCompany, RatioSnapshot, RefreshOutcome, SectorMap,
    ServiceHealth,
};
use crate::settings::ApiSettings;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error as _;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),
    #[error("failed to reach {url} after {attempts} attempts: {detail}")]
    Transport {
        url: String,
        attempts: usize,
        detail: String,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("ratios service reported an error: {0}")]
    Service(String),
    #[error("response from {0} carried no data")]
    MissingData(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    fn failure(&self) -> Option<ClientError> {
        if self.success {
            return None;
        }
        let reason = self
            .error
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("request was not successful");
        Some(ClientError::Service(reason.to_string()))
    }

    pub fn into_data(self, url: &str) -> Result<T, ClientError> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        self.data
            .ok_or_else(|| ClientError::MissingData(url.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct RatiosClient {
    http: Client,
    base_url: String,
    max_retries: usize,
    backoff_base: Duration,
}

impl RatiosClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout())
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim().trim_end_matches('/').to_string(),
            max_retries: settings.max_retries.max(1),
            backoff_base: settings.backoff_base(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn companies(&self) -> Result<Vec<Company>, ClientError> {
        self.get_data("companies").await
    }

    pub async fn company(&self, ticker: &str) -> Result<CompanyDetail, ClientError> {
        self.get_data(&format!("company/{}", normalize_ticker(ticker)))
            .await
    }

    pub async fn ratios(&self, ticker: &str) -> Result<RatioSnapshot, ClientError> {
        self.get_data(&format!("ratios/{}", normalize_ticker(ticker)))
            .await
    }

    pub async fn compare(
        &self,
        tickers: &[&str],
    ) -> Result<BTreeMap<String, ComparedCompany>, ClientError> {
        let tickers: Vec<String> = tickers.iter().map(|ticker| normalize_ticker(ticker)).collect();
        let url = self.endpoint("compare");
        let body = json!({ "tickers": tickers });
        let text = self
            .send_with_retry(&url, || self.http.post(&url).json(&body))
            .await?;
        decode::<ApiResponse<_>>(&url, &text)?.into_data(&url)
    }

    pub async fn sectors(&self) -> Result<SectorMap, ClientError> {
        self.get_data("sectors").await
    }

    pub async fn refresh(&self) -> Result<RefreshOutcome, ClientError> {
        let url = self.endpoint("refresh");
        let text = self
            .send_with_retry(&url, || self.http.post(&url))
            .await?;
        let envelope: ApiResponse<serde_json::Value> = decode(&url, &text)?;
        if let Some(err) = envelope.failure() {
            return Err(err);
        }
        Ok(RefreshOutcome {
            message: envelope.message,
            last_updated: envelope.last_updated,
        })
    }

    /// `/health` answers without the envelope.
    pub async fn health(&self) -> Result<ServiceHealth, ClientError> {
        let url = self.endpoint("health");
        let text = self.send_with_retry(&url, || self.http.get(&url)).await?;
        decode(&url, &text)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_data<T>(&self, path: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let text = self.send_with_retry(&url, || self.http.get(&url)).await?;
        decode::<ApiResponse<T>>(&url, &text)?.into_data(&url)
    }

    /// Retries transport failures and 5xx answers with exponential backoff.
    /// A 4xx answer is final. Once retries run out on a 5xx answer, its
    /// envelope error is surfaced like a 4xx one.
    async fn send_with_retry<F>(&self, url: &str, request: F) -> Result<String, ClientError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_detail = String::from("unknown error");
        let mut last_answer: Option<(StatusCode, String)> = None;
        for attempt in 1..=self.max_retries {
            debug!(url, attempt, "requesting");
            match request().send().await {
                Ok(response) => {
                    let status = response.status();
                    match response.text().await {
                        Ok(text) if status.is_success() => return Ok(text),
                        Ok(text) if status.is_client_error() => {
                            return Err(client_failure(url, status, &text));
                        }
                        Ok(text) => {
                            last_detail = format!("HTTP {status}");
                            last_answer = Some((status, text));
                        }
                        Err(err) => {
                            last_detail = describe_error(&err);
                            last_answer = None;
                        }
                    }
                }
                Err(err) => {
                    last_detail = describe_error(&err);
                    last_answer = None;
                }
            }

            if attempt < self.max_retries {
                let delay = calculate_backoff(self.backoff_base, attempt);
                warn!(url, attempt, ?delay, detail = %last_detail, "request failed, retrying");
                sleep(delay).await;
            }
        }

        if let Some((status, body)) = last_answer {
            return Err(client_failure(url, status, &body));
        }
        Err(ClientError::Transport {
            url: url.to_string(),
            attempts: self.max_retries,
            detail: last_detail,
        })
    }
}

pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

fn decode<T>(url: &str, text: &str) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    serde_json::from_str(text).map_err(|source| ClientError::Decode {
        url: url.to_string(),
        source,
    })
}

fn client_failure(url: &str, status: StatusCode, body: &str) -> ClientError {
    serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.failure())
        .unwrap_or_else(|| ClientError::Status {
            url: url.to_string(),
            status,
        })
}

fn calculate_backoff(base: Duration, attempt: usize) -> Duration {
    const MAX_BACKOFF_EXPONENT: u32 = 10;
    let exponent = u32::try_from(attempt)
        .unwrap_or(MAX_BACKOFF_EXPONENT)
        .min(MAX_BACKOFF_EXPONENT);
    base.saturating_mul(2_u32.saturating_pow(exponent))
}

fn describe_error(error: &reqwest::Error) -> String {
    let mut pieces = vec![error.to_string()];
    let mut cause = error.source();
    while let Some(err) = cause {
        let text = err.to_string();
        if !text.is_empty() {
            pieces.push(format!("caused by {text}"));
        }
        cause = err.source();
    }
    pieces.join(" | ")
}

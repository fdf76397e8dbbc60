use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::auth::ApiCredentials;
use crate::config::Config;
use crate::fetch_error::FetchError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_BODY_PREVIEW: usize = 200;

/// Daily totals from `/systems/{id}/summary`.
#[derive(Debug, Clone, Deserialize)]
pub struct DailySummary {
    pub modules: i32,
    pub energy_today: i64,
    pub energy_lifetime: i64,
    #[serde(default)]
    pub summary_date: Option<NaiveDate>,
}

/// One five-minute interval from `/systems/{id}/stats`.
#[derive(Debug, Clone, Deserialize)]
pub struct IntervalSample {
    pub end_at: i64,
    pub powr: i32,
    pub enwh: i32,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(default)]
    intervals: Vec<IntervalSample>,
}

/// Where the collection loop gets a day's data from.
#[async_trait]
pub trait GenerationSource: Send + Sync {
    async fn fetch_summary(&self, day: NaiveDate) -> Result<DailySummary, FetchError>;

    /// Intervals reported from `start_at` (epoch seconds) onwards.
    async fn fetch_intervals(&self, start_at: i64) -> Result<Vec<IntervalSample>, FetchError>;
}

/// Back-off applied to transport failures of a single request.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

#[derive(Clone)]
pub struct EnphaseClient {
    client: reqwest::Client,
    base_url: String,
    system_id: String,
    credentials: ApiCredentials,
    retry: RetryPolicy,
}

impl EnphaseClient {
    pub fn new(
        base_url: String,
        system_id: String,
        credentials: ApiCredentials,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            system_id,
            credentials,
            retry: RetryPolicy::none(),
        })
    }

    /// Client for the configured system, retrying transport failures no
    /// sooner than the rate gate would allow the next call.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let client = Self::new(
            config.api_base_url.clone(),
            config.system_id.clone(),
            config.credentials.clone(),
        )?;
        let min_delay = config.min_call_interval();
        Ok(client.with_retry(RetryPolicy {
            max_retries: config.fetch_max_retries,
            min_delay,
            max_delay: min_delay * 4,
        }))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/systems/{}/{}", self.base_url, self.system_id, resource)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        param: (&'static str, String),
    ) -> Result<T, FetchError> {
        let url = self.endpoint(resource);
        let mut params: Vec<(&str, String)> = vec![param];
        params.extend(
            self.credentials
                .query_params()
                .into_iter()
                .map(|(name, value)| (name, value.to_string())),
        );

        let body = (|| self.get_body(&url, &params))
            .retry(self.retry.backoff())
            .when(FetchError::is_transient)
            .notify(|err: &FetchError, delay: Duration| {
                warn!(
                    url = %url,
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "Remote API request failed, retrying"
                );
            })
            .await?;

        parse_body(&body)
    }

    async fn get_body(&self, url: &str, params: &[(&str, String)]) -> Result<String, FetchError> {
        debug!("Sending HTTP request to {}", url);
        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl GenerationSource for EnphaseClient {
    #[instrument(skip(self), fields(system_id = %self.system_id))]
    async fn fetch_summary(&self, day: NaiveDate) -> Result<DailySummary, FetchError> {
        let summary: DailySummary = self
            .get_json("summary", ("summary_date", day.format("%Y-%m-%d").to_string()))
            .await?;
        debug!(
            modules = summary.modules,
            energy_today = summary.energy_today,
            "Fetched daily summary"
        );
        Ok(summary)
    }

    #[instrument(skip(self), fields(system_id = %self.system_id))]
    async fn fetch_intervals(&self, start_at: i64) -> Result<Vec<IntervalSample>, FetchError> {
        let stats: StatsResponse = self
            .get_json("stats", ("start_at", start_at.to_string()))
            .await?;
        debug!("Fetched {} intervals", stats.intervals.len());
        Ok(stats.intervals)
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))
}

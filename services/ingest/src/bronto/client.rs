use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bronto_config::TapConfig;
use reqwest::{Client, StatusCode};

use super::models::{ActivityKind, ActivityQuery, FaultKind, RawRecord, END_OF_RESULT_SET};
use super::soap;

#[derive(Debug, Clone)]
pub struct BrontoClientConfig {
    pub endpoint: String,
    pub api_token: String,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl From<&TapConfig> for BrontoClientConfig {
    fn from(cfg: &TapConfig) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            api_token: cfg.api_token.clone(),
            max_retries: cfg.max_retries,
            timeout_secs: cfg.timeout_secs,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BrontoClientError {
    #[error("HTTP {status}: {body}")]
    HttpError { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("rate limited, retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<u64> },

    #[error("max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },

    #[error("remote fault {}: {message}", display_code(.code))]
    Fault { code: Option<u32>, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

fn display_code(code: &Option<u32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "without code".to_owned())
}

impl BrontoClientError {
    /// Classify the error for the sync loop. Only this mapping looks at codes.
    pub fn kind(&self) -> FaultKind {
        match self {
            BrontoClientError::Fault {
                code: Some(END_OF_RESULT_SET),
                ..
            } => FaultKind::Exhausted,
            BrontoClientError::Fault { .. } => FaultKind::Fatal,
            BrontoClientError::HttpError { status, .. }
                if *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() =>
            {
                FaultKind::Transient
            }
            BrontoClientError::HttpError { .. } => FaultKind::Fatal,
            BrontoClientError::RequestError(e) if e.is_timeout() || e.is_connect() => {
                FaultKind::Transient
            }
            BrontoClientError::RequestError(_) => FaultKind::Fatal,
            BrontoClientError::RateLimited { .. } => FaultKind::Transient,
            BrontoClientError::MaxRetriesExceeded { .. } => FaultKind::Transient,
            BrontoClientError::MalformedResponse(_) => FaultKind::Fatal,
        }
    }
}

/// The remote activity feed as seen by the sync loop.
#[async_trait]
pub trait ActivityFeed: Send + Sync {
    /// Open a fresh session.
    async fn login(&self) -> Result<(), BrontoClientError>;

    /// Read one page of activities for `query`.
    async fn read_activities(
        &self,
        kind: ActivityKind,
        query: &ActivityQuery,
    ) -> Result<Vec<RawRecord>, BrontoClientError>;
}

#[async_trait]
impl<T> ActivityFeed for std::sync::Arc<T>
where
    T: ActivityFeed + ?Sized,
{
    async fn login(&self) -> Result<(), BrontoClientError> {
        (**self).login().await
    }

    async fn read_activities(
        &self,
        kind: ActivityKind,
        query: &ActivityQuery,
    ) -> Result<Vec<RawRecord>, BrontoClientError> {
        (**self).read_activities(kind, query).await
    }
}

pub struct BrontoClient {
    client: Client,
    config: BrontoClientConfig,
    session_id: Mutex<Option<String>>,
}

impl BrontoClient {
    pub fn new(config: BrontoClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            session_id: Mutex::new(None),
        })
    }

    /// For testing: create a client pointing at a specific endpoint (e.g., wiremock).
    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.config.endpoint = endpoint.to_string();
        self
    }

    fn session(&self) -> Option<String> {
        self.session_id.lock().ok().and_then(|s| s.clone())
    }

    fn set_session(&self, session: String) {
        if let Ok(mut guard) = self.session_id.lock() {
            *guard = Some(session);
        }
    }

    /// POST one envelope and decode the answer. Never retries.
    ///
    /// A SOAP fault comes back as `BrontoClientError::Fault`; a 200 whose body
    /// is not a SOAP response is `MalformedResponse`.
    async fn post(&self, envelope: &str) -> Result<soap::ParsedResponse, BrontoClientError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", "\"\"")
            .body(envelope.to_owned())
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(BrontoClientError::RateLimited { retry_after });
        }

        let body = response.text().await?;

        // Faults come back as 500 with a SOAP body; those are answers, not outages
        if status.is_success() || status == StatusCode::INTERNAL_SERVER_ERROR {
            match soap::parse_response(&body) {
                Ok(mut parsed) => {
                    if let Some(fault) = parsed.fault.take() {
                        return Err(BrontoClientError::Fault {
                            code: fault.code,
                            message: fault.message,
                        });
                    }
                    if status.is_success() {
                        return Ok(parsed);
                    }
                }
                Err(e) if status.is_success() => {
                    return Err(BrontoClientError::MalformedResponse(format!(
                        "{e}: {}",
                        snippet(&body)
                    )));
                }
                Err(_) => {}
            }
        }

        Err(BrontoClientError::HttpError { status, body })
    }

    /// `post` with exponential backoff on transient failures.
    ///
    /// Only for calls that carry no server-side cursor: a retried page read
    /// could silently skip the page the server already advanced past.
    async fn post_with_retry(
        &self,
        action: &str,
        envelope: &str,
    ) -> Result<soap::ParsedResponse, BrontoClientError> {
        let mut last_error = String::new();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff_secs = std::cmp::min(1u64 << attempt, 30);
                tracing::warn!(attempt, backoff_secs, action, "retrying after backoff");
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            }

            match self.post(envelope).await {
                Err(BrontoClientError::RateLimited { retry_after }) => {
                    // Honor Retry-After header for 429
                    if let Some(retry_after) = retry_after {
                        let wait = std::cmp::min(retry_after, 60);
                        tracing::warn!(wait, "rate-limited, waiting Retry-After");
                        tokio::time::sleep(Duration::from_secs(wait)).await;
                    }
                    last_error = "429 Too Many Requests".to_string();
                }
                Err(e) if e.kind() == FaultKind::Transient => {
                    last_error = e.to_string();
                }
                other => return other,
            }
        }

        Err(BrontoClientError::MaxRetriesExceeded {
            attempts: self.config.max_retries + 1,
            last_error,
        })
    }
}

fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_owned(),
    }
}

#[async_trait]
impl ActivityFeed for BrontoClient {
    async fn login(&self) -> Result<(), BrontoClientError> {
        let parsed = self
            .post_with_retry("login", &soap::login_envelope(&self.config.api_token))
            .await?;

        let session = parsed
            .scalar_returns
            .into_iter()
            .find(|s| !s.is_empty())
            .ok_or_else(|| {
                BrontoClientError::MalformedResponse("login response carried no session id".into())
            })?;

        tracing::debug!("bronto session established");
        self.set_session(session);
        Ok(())
    }

    /// One attempt only. The remote cursor may already have moved, so any
    /// failure goes back to the caller.
    async fn read_activities(
        &self,
        kind: ActivityKind,
        query: &ActivityQuery,
    ) -> Result<Vec<RawRecord>, BrontoClientError> {
        let session = match self.session() {
            Some(s) => s,
            None => {
                self.login().await?;
                self.session().ok_or_else(|| {
                    BrontoClientError::MalformedResponse("no session after login".into())
                })?
            }
        };

        let envelope = soap::read_activities_envelope(&session, kind, query);
        let parsed = self.post(&envelope).await?;
        Ok(soap::activity_records(parsed))
    }
}

// Retrying request executor
//
// Wraps `reqwest::Client` with per-attempt request building, bounded
// exponential backoff, cancellation and an overall call deadline. Endpoint
// groups (app pools, websites, files, ...) are inherent methods in
// separate files to keep this module focused on transport mechanics.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{AuthMode, BearerToken};
use crate::error::Error;
use crate::ntlm;
use crate::retry::{RetryPolicy, Verdict};
use crate::transport::TransportConfig;

const HAL_JSON: &str = "application/hal+json";

const DEADLINE_SLACK: Duration = Duration::from_secs(1);

/// Async client for the IIS Administration API.
///
/// Cheap to clone: the connection pool and credentials are shared. Every
/// logical call gets its own retry state; nothing is coordinated across
/// calls.
#[derive(Debug, Clone)]
pub struct IisClient {
    http: reqwest::Client,
    base_url: Url,
    auth: Arc<AuthMode>,
    retry: RetryPolicy,
    attempt_timeout: Duration,
    call_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl IisClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL (e.g. `https://iis01:55539`), credentials and
    /// transport settings.
    pub fn new(base_url: Url, auth: AuthMode, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, auth).with_attempt_timeout(transport.attempt_timeout))
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, auth: AuthMode) -> Self {
        Self {
            http,
            base_url,
            auth: Arc::new(auth),
            retry: RetryPolicy::default(),
            attempt_timeout: TransportConfig::default().attempt_timeout,
            call_timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Override the derived per-call deadline.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// A handle sharing this session whose calls observe `cancel`.
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    /// Add a minted access token to the session's credentials.
    pub fn with_bearer_token(self, bearer: BearerToken) -> Self {
        let auth = Arc::unwrap_or_clone(self.auth).with_bearer(bearer);
        Self {
            auth: Arc::new(auth),
            ..self
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn auth_mode(&self) -> &AuthMode {
        &self.auth
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Deadline for one logical call.
    ///
    /// Unless overridden: every attempt timing out (three requests each
    /// when an NTLM exchange may run), every backoff sleep, plus a second
    /// of slack. Running out of retries always happens before the deadline.
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout.unwrap_or_else(|| {
            let requests = if self.auth.challenge().is_some() { 3 } else { 1 };
            self.attempt_timeout
                .saturating_mul(requests)
                .saturating_mul(self.retry.attempts())
                .saturating_add(self.retry.worst_case_backoff())
                .saturating_add(DEADLINE_SLACK)
        })
    }

    // ── Request building ─────────────────────────────────────────────

    /// Resolve an API path (optionally with a query string) against the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Headers every request to the management API carries. No auth.
    pub(crate) fn base_request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .timeout(self.attempt_timeout)
            .header(ACCEPT, HAL_JSON)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header("X-Requested-With", "XMLHttpRequest")
    }

    /// Materialize one request: fresh body, auth headers. `authorization`
    /// stands in for the Basic credentials during an NTLM exchange.
    fn build_request(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&Bytes>,
        authorization: Option<HeaderValue>,
    ) -> reqwest::RequestBuilder {
        let mut builder = self.base_request(method.clone(), url.clone());
        if let Some(body) = body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }
        match authorization {
            Some(value) => self.auth.apply_bearer(builder).header(AUTHORIZATION, value),
            None => self.auth.apply(builder),
        }
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Run one logical call with retries. Returns the raw response body.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<Bytes, Error> {
        let url = self.url(path)?;
        let deadline = self.call_timeout();
        let call = self.run_attempts(&method, &url, body.as_ref());

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!(%method, %url, "call cancelled");
                Err(Error::Cancelled {
                    method: method.clone(),
                    url: url.to_string(),
                })
            }
            result = tokio::time::timeout(deadline, call) => {
                result.unwrap_or_else(|_| {
                    Err(Error::Timeout {
                        method: method.clone(),
                        url: url.to_string(),
                        timeout_secs: deadline.as_secs(),
                    })
                })
            }
        }
    }

    async fn run_attempts(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&Bytes>,
    ) -> Result<Bytes, Error> {
        let max_attempts = self.retry.attempts();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(%method, %url, attempt, "sending request");

            let sent = ntlm::send(self.auth.challenge(), |authorization| {
                self.build_request(method, url, body, authorization)
            })
            .await;
            match sent {
                Ok(resp) => {
                    let status = resp.status();
                    match self.retry.verdict(status) {
                        Verdict::Success => {
                            return resp.bytes().await.map_err(|source| Error::Transport {
                                method: method.clone(),
                                url: url.to_string(),
                                attempts: attempt,
                                source,
                            });
                        }
                        Verdict::Retry if attempt < max_attempts => {
                            warn!(
                                %method,
                                %url,
                                attempt,
                                status = status.as_u16(),
                                "retryable status"
                            );
                        }
                        Verdict::Retry | Verdict::Terminal => {
                            return Err(api_error(method, url, resp, attempt).await);
                        }
                    }
                }
                Err(source) if attempt < max_attempts => {
                    warn!(%method, %url, attempt, error = %source, "transport error");
                }
                Err(source) => {
                    return Err(Error::Transport {
                        method: method.clone(),
                        url: url.to_string(),
                        attempts: attempt,
                        source,
                    });
                }
            }

            let delay = self.retry.backoff(attempt);
            debug!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                attempt,
                "waiting before retry"
            );
            tokio::time::sleep(delay).await;
        }
    }

    // ── Typed helpers ────────────────────────────────────────────────

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let bytes = self.execute(Method::GET, path, None).await?;
        decode(&bytes)
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let bytes = self.execute(Method::POST, path, Some(encode(body)?)).await?;
        decode(&bytes)
    }

    pub async fn patch_json<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let bytes = self.execute(Method::PATCH, path, Some(encode(body)?)).await?;
        decode(&bytes)
    }

    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        self.execute(Method::DELETE, path, None).await.map(drop)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

async fn api_error(method: &Method, url: &Url, resp: reqwest::Response, attempts: u32) -> Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Error::Api {
        method: method.clone(),
        url: url.to_string(),
        status,
        body,
        attempts,
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Bytes, Error> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .map_err(Error::Encode)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(bytes).map_err(|e| {
        let body = String::from_utf8_lossy(bytes).into_owned();
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

/// Percent-encode a server-assigned id for use in a path or query.
pub(crate) fn escape(id: &str) -> String {
    url::form_urlencoded::byte_serialize(id.as_bytes()).collect()
}

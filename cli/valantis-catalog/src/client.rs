//! Authenticated, retrying client for the catalog endpoint.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::auth::{AUTH_HEADER, auth_token};
use crate::config::{CatalogClientConfig, RetryPolicy};
use crate::error::{CatalogClientError, RequestError};
use crate::types::{FilterSet, Product, ProductId};

pub const GET_IDS: &str = "get_ids";
pub const GET_ITEMS: &str = "get_items";

/// Progress of the request currently handled by a [`CatalogClient`].
///
/// Lets a presentation layer tell "still trying" apart from an empty result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestStatus {
    #[default]
    Idle,
    InFlight { action: String, attempt: u32 },
    /// The given attempt failed, the next one starts after `backoff`.
    Retrying {
        action: String,
        attempt: u32,
        backoff: Duration,
        error: String,
    },
}

/// A client for the catalog service.
///
/// Handles:
/// - HTTP client configuration with timeouts
/// - the daily rotating `X-Auth` token, recomputed on every attempt
/// - retrying failed attempts according to the configured [`RetryPolicy`]
pub struct CatalogClient {
    http: reqwest::Client,
    config: CatalogClientConfig,
    status: watch::Sender<RequestStatus>,
    clock: fn() -> DateTime<Utc>,
}

impl Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("api_url", &self.config.api_url)
            .field("retry", &self.config.retry)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct RequestBody<'a> {
    action: &'a str,
    params: &'a Map<String, Value>,
}

#[derive(Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    result: Option<Value>,
}

#[derive(Serialize)]
struct GetItemsParams<'a> {
    ids: &'a [ProductId],
}

impl CatalogClient {
    /// Create a new catalog client from configuration.
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogClientError> {
        let http = build_http_client(&config)?;
        let (status, _) = watch::channel(RequestStatus::Idle);

        Ok(Self {
            http,
            config,
            status,
            clock: Utc::now,
        })
    }

    /// Replace the source of the current time used for auth tokens.
    #[cfg(any(test, feature = "tests"))]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Watch the progress of requests made through this client.
    pub fn subscribe(&self) -> watch::Receiver<RequestStatus> {
        self.status.subscribe()
    }

    /// Perform one logical call of `action` and return its `result` verbatim.
    ///
    /// Failed attempts are retried with the same action and params until the
    /// retry policy gives up, in which case
    /// [`CatalogClientError::Unavailable`] is returned.
    #[instrument(skip_all, fields(action = %action))]
    pub async fn request(
        &self,
        action: &str,
        params: Map<String, Value>,
    ) -> Result<Value, CatalogClientError> {
        let body = &RequestBody {
            action,
            params: &params,
        };
        let logged_params = Value::Object(params.clone());

        let outcome = retry_with_backoff(
            &self.config.retry,
            move |attempt| {
                debug!(attempt, params = %logged_params, "sending request");
                self.status.send_replace(RequestStatus::InFlight {
                    action: action.to_string(),
                    attempt,
                });
                self.send_once(body)
            },
            move |attempt, err, backoff| {
                info!(attempt, ?backoff, error = %err, "request failed, retrying");
                self.status.send_replace(RequestStatus::Retrying {
                    action: action.to_string(),
                    attempt,
                    backoff,
                    error: err.to_string(),
                });
            },
        )
        .await;

        self.status.send_replace(RequestStatus::Idle);

        outcome.map_err(|exhausted| {
            error!(
                attempts = exhausted.attempts,
                error = %exhausted.last_error,
                "giving up on request"
            );
            CatalogClientError::Unavailable {
                action: action.to_string(),
                attempts: exhausted.attempts,
                last_error: exhausted.last_error,
            }
        })
    }

    async fn send_once(&self, body: &RequestBody<'_>) -> Result<Value, RequestError> {
        let token = auth_token(&self.config.password, (self.clock)());

        let response = self
            .http
            .post(&self.config.api_url)
            .header(AUTH_HEADER, token)
            .json(body)
            .send()
            .await
            .map_err(RequestError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Status(status));
        }

        let bytes = response.bytes().await.map_err(RequestError::Transport)?;
        let envelope: ResponseEnvelope =
            serde_json::from_slice(&bytes).map_err(RequestError::MalformedBody)?;
        debug!(body = %String::from_utf8_lossy(&bytes), "received response");

        envelope.result.ok_or(RequestError::MissingResult)
    }

    async fn request_typed<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &impl Serialize,
    ) -> Result<T, CatalogClientError> {
        let result = self.request(action, to_params(params)?).await?;
        serde_json::from_value(result).map_err(|source| CatalogClientError::UnexpectedResult {
            action: action.to_string(),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog trait
// ---------------------------------------------------------------------------

/// The typed catalog API.
///
/// This trait enables alternate implementations:
/// - **HTTP**: calls to the catalog endpoint via [`CatalogClient`]
/// - **Mock** (tests): canned responses without HTTP
#[allow(async_fn_in_trait)]
pub trait ClientTrait {
    /// Identifiers of products matching `filters`, possibly with duplicates.
    async fn get_ids(&self, filters: &FilterSet) -> Result<Vec<ProductId>, CatalogClientError>;

    /// Products for the given identifiers, in no guaranteed order.
    async fn get_items(&self, ids: &[ProductId]) -> Result<Vec<Product>, CatalogClientError>;
}

impl ClientTrait for CatalogClient {
    async fn get_ids(&self, filters: &FilterSet) -> Result<Vec<ProductId>, CatalogClientError> {
        let ids: Vec<ProductId> = self.request_typed(GET_IDS, filters).await?;
        debug!(n_ids = ids.len(), "received product ids");
        Ok(ids)
    }

    async fn get_items(&self, ids: &[ProductId]) -> Result<Vec<Product>, CatalogClientError> {
        let items: Vec<Product> = self.request_typed(GET_ITEMS, &GetItemsParams { ids }).await?;
        debug!(n_items = items.len(), "received products");
        Ok(items)
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Serialize request parameters into the JSON object the API expects.
fn to_params(params: &impl Serialize) -> Result<Map<String, Value>, CatalogClientError> {
    match serde_json::to_value(params) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CatalogClientError::InvalidParams(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(CatalogClientError::InvalidParams(e.to_string())),
    }
}

/// The last error of a retry loop that ran out of attempts.
#[derive(Debug)]
pub(crate) struct Exhausted<E> {
    pub(crate) attempts: u32,
    pub(crate) last_error: E,
}

/// Run `attempt_fn` until it succeeds or `policy` is exhausted.
///
/// `on_failure` is called for every failed attempt that will be retried,
/// before sleeping for the backoff delay.
pub(crate) async fn retry_with_backoff<T, E, Fut>(
    policy: &RetryPolicy,
    mut attempt_fn: impl FnMut(u32) -> Fut,
    mut on_failure: impl FnMut(u32, &E, Duration),
) -> Result<T, Exhausted<E>>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(last_error) if policy.is_exhausted(attempt) => {
                return Err(Exhausted {
                    attempts: attempt,
                    last_error,
                });
            },
            Err(err) => {
                let backoff = policy.backoff(attempt);
                on_failure(attempt, &err, backoff);
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                } else {
                    tokio::task::yield_now().await;
                }
                attempt = attempt.saturating_add(1);
            },
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP client builder
// ---------------------------------------------------------------------------

fn build_http_client(config: &CatalogClientConfig) -> Result<reqwest::Client, CatalogClientError> {
    let mut headers = HeaderMap::new();

    for (key, value) in &config.extra_headers {
        headers.insert(
            header::HeaderName::from_str(key).map_err(
                |e: reqwest::header::InvalidHeaderName| CatalogClientError::Other(e.to_string()),
            )?,
            header::HeaderValue::from_str(value).map_err(
                |e: reqwest::header::InvalidHeaderValue| CatalogClientError::Other(e.to_string()),
            )?,
        );
    }

    debug!(
        api_url = %config.api_url,
        extra_headers = config.extra_headers.len(),
        "building catalog HTTP client"
    );

    let client_builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(60));

    let client_builder = if let Some(ref user_agent) = config.user_agent {
        client_builder.user_agent(user_agent)
    } else {
        client_builder
    };

    client_builder
        .build()
        .map_err(|e| CatalogClientError::Other(e.to_string()))
}

//! Registry client speaking the dispatch protocol.

use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{self, HeaderMap};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::CatalogClientConfig;
use crate::error::{CatalogClientError, LookupError, rejection_message};
use crate::types::*;

/// A client for the registry's dispatch endpoint.
///
/// Every logical operation is a `POST {dispatch_url}/dispatch` carrying an
/// `event_type` and a `client_payload`.
pub struct CatalogClient {
    http: reqwest::Client,
    endpoint: Url,
    config: CatalogClientConfig,
}

impl Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("authenticated", &self.config.session.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new client from configuration.
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogClientError> {
        let endpoint = dispatch_endpoint(&config.dispatch_url)?;
        let http = build_http_client(&config)?;

        Ok(Self {
            http,
            endpoint,
            config,
        })
    }

    /// Send a single dispatch request and return the raw success body.
    ///
    /// `credential` overrides the session token for this request only.
    async fn dispatch_raw(
        &self,
        event_type: &str,
        payload: Value,
        credential: Option<&CredentialToken>,
    ) -> Result<Vec<u8>, CatalogClientError> {
        let body = DispatchRequest {
            event_type: event_type.to_string(),
            client_payload: payload,
        };

        let mut request = self.http.post(self.endpoint.clone()).json(&body);
        if let Some(token) = credential {
            request = request.bearer_auth(token.secret());
        }

        debug!(event_type, "sending dispatch request");
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = rejection_message(&bytes);
            debug!(event_type, %status, message, "dispatch request rejected");
            return Err(CatalogClientError::Rejection { status, message });
        }

        Ok(bytes.to_vec())
    }

    /// Send a dispatch request and deserialize the response body.
    pub async fn dispatch<T: DeserializeOwned>(
        &self,
        event_type: &str,
        payload: Value,
    ) -> Result<T, CatalogClientError> {
        let body = self.dispatch_raw(event_type, payload, None).await?;
        parse_body(&body)
    }
}

// ---------------------------------------------------------------------------
// Client trait
// ---------------------------------------------------------------------------

/// The registry operations the front-end relies on.
///
/// This trait enables alternate implementations:
/// - **HTTP**: dispatch calls via [`CatalogClient`]
/// - **Test doubles**: canned responses without HTTP
#[allow(async_fn_in_trait)]
pub trait ClientTrait {
    /// List packages matching the given filters.
    ///
    /// Malformed payloads degrade to an empty page with
    /// [`CatalogPage::problem`] set instead of failing.
    async fn fetch_catalog(&self, filters: &FilterState)
    -> Result<CatalogPage, CatalogClientError>;

    /// Look up a single package by exact, case-sensitive name.
    ///
    /// The registry has no single package endpoint, so this lists all
    /// packages and searches the result in memory.
    async fn fetch_one(&self, name: impl AsRef<str> + Send + Sync) -> Result<Package, LookupError> {
        let name = name.as_ref();
        let page = self.fetch_catalog(&FilterState::default()).await?;
        if let Some(problem) = page.problem {
            return Err(CatalogClientError::MalformedResponse(problem).into());
        }
        page.items
            .into_iter()
            .find(|package| package.name == name)
            .ok_or_else(|| LookupError::NotFound(name.to_string()))
    }

    /// Forward a package description to the registry.
    async fn publish(
        &self,
        package: &PublishPackage,
        token: &CredentialToken,
    ) -> Result<PublishResult, CatalogClientError>;

    /// Exchange an OAuth `code` and `state` for a registry credential.
    async fn auth_callback(
        &self,
        code: &str,
        state: &str,
    ) -> Result<AuthCallbackResponse, CatalogClientError>;
}

impl ClientTrait for CatalogClient {
    #[instrument(skip_all, fields(filters = ?filters))]
    async fn fetch_catalog(
        &self,
        filters: &FilterState,
    ) -> Result<CatalogPage, CatalogClientError> {
        let body = self
            .dispatch_raw(EVENT_LIST_PACKAGES, filters.to_payload(), None)
            .await?;

        let page = normalize_listing(&body);
        match &page.problem {
            Some(problem) => warn!(%problem, "listing response was malformed"),
            None => debug!(
                n_items = page.items.len(),
                total = page.total,
                "received package listing"
            ),
        }
        Ok(page)
    }

    #[instrument(skip_all, fields(package = %package.name, version = %package.version))]
    async fn publish(
        &self,
        package: &PublishPackage,
        token: &CredentialToken,
    ) -> Result<PublishResult, CatalogClientError> {
        let payload = json!({
            "package": package,
            "token": token.secret(),
        });
        let body = self
            .dispatch_raw(EVENT_PUBLISH, payload, Some(token))
            .await?;
        let result: PublishResult = parse_body(&body)?;
        debug!(success = result.success, "publish request completed");
        Ok(result)
    }

    #[instrument(skip_all)]
    async fn auth_callback(
        &self,
        code: &str,
        state: &str,
    ) -> Result<AuthCallbackResponse, CatalogClientError> {
        self.dispatch(EVENT_AUTH_CALLBACK, json!({ "code": code, "state": state }))
            .await
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn dispatch_endpoint(base: &str) -> Result<Url, CatalogClientError> {
    let endpoint = format!("{}/dispatch", base.trim_end_matches('/'));
    Url::parse(&endpoint)
        .map_err(|e| CatalogClientError::Other(format!("invalid dispatch url '{base}': {e}")))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, CatalogClientError> {
    serde_json::from_slice(body)
        .map_err(|e| MalformedResponse::InvalidJson(e.to_string()).into())
}

/// Interpret a listing body as `{ packages: Package[], total: number }`.
///
/// Any structural problem degrades the whole page to empty.
/// Individual entries that are not packages are skipped.
fn normalize_listing(body: &[u8]) -> CatalogPage {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => return CatalogPage::degraded(MalformedResponse::InvalidJson(e.to_string())),
    };
    let Value::Object(mut object) = value else {
        return CatalogPage::degraded(MalformedResponse::NotAnObject);
    };

    let total = match object.get("total") {
        None | Some(Value::Null) => {
            return CatalogPage::degraded(MalformedResponse::MissingField("total"));
        },
        Some(total) => match total.as_u64() {
            Some(total) => total,
            None => return CatalogPage::degraded(MalformedResponse::InvalidField("total")),
        },
    };

    let entries = match object.remove("packages") {
        None | Some(Value::Null) => {
            return CatalogPage::degraded(MalformedResponse::MissingField("packages"));
        },
        Some(Value::Array(entries)) => entries,
        Some(_) => return CatalogPage::degraded(MalformedResponse::InvalidField("packages")),
    };

    let items = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Package>(entry) {
            Ok(package) => Some(package),
            Err(err) => {
                warn!(%err, "skipping malformed package entry");
                None
            },
        })
        .collect();

    CatalogPage {
        items,
        total,
        problem: None,
    }
}

// ---------------------------------------------------------------------------
// HTTP client builder
// ---------------------------------------------------------------------------

/// Build the HTTP client with JSON headers and the session's bearer token.
fn build_http_client(config: &CatalogClientConfig) -> Result<reqwest::Client, CatalogClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );

    if let Some(token) = &config.session.token {
        let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token.secret()))
            .map_err(|e| CatalogClientError::Other(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, value);
    }

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
        dispatch_url = %config.dispatch_url,
        has_token = config.session.token.is_some(),
        extra_headers = config.extra_headers.len(),
        "building registry HTTP client"
    );

    let client_builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(15));

    let client_builder = if let Some(ref user_agent) = config.user_agent {
        client_builder.user_agent(user_agent)
    } else {
        client_builder
    };

    client_builder
        .build()
        .map_err(|e| CatalogClientError::Other(e.to_string()))
}

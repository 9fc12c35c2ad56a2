//! OAuth handoff with the registry's identity provider.
//!
//! The registry front-end only constructs the authorization redirect and
//! later hands `code` and `state` to the dispatch API, which performs the
//! token exchange.

use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, CsrfToken, RedirectUrl, Scope};
use rads_catalog::types::Session;
use rads_catalog::{CatalogClientError, ClientTrait};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::session::{SessionStore, SessionStoreError};

pub const DEFAULT_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
pub const DEFAULT_REDIRECT_URI: &str = "https://registry.rads-lang.org/api/auth/callback";
pub const DEFAULT_SCOPES: [&str; 3] = ["read:user", "read:org", "repo"];
const FALLBACK_AUTH_ERROR: &str = "Authentication failed";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        OAuthConfig {
            client_id: String::new(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no OAuth client id configured")]
    MissingClientId,
    #[error("invalid {what}: {source}")]
    InvalidUrl {
        what: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("callback is missing the '{0}' parameter")]
    MissingParameter(&'static str),
    #[error("state returned by the provider does not match the login request")]
    StateMismatch,
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Catalog(#[from] CatalogClientError),
    #[error("could not store session")]
    Store(#[from] SessionStoreError),
}

/// A login request: where to send the user and the state to expect back.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: CsrfToken,
}

/// Build the provider redirect with a fresh anti-forgery state token.
pub fn authorization_request(config: &OAuthConfig) -> Result<AuthorizationRequest, AuthError> {
    if config.client_id.trim().is_empty() {
        return Err(AuthError::MissingClientId);
    }

    let auth_url = AuthUrl::new(config.authorize_url.clone()).map_err(|source| {
        AuthError::InvalidUrl {
            what: "authorize url",
            source,
        }
    })?;
    let redirect_url = RedirectUrl::new(config.redirect_uri.clone()).map_err(|source| {
        AuthError::InvalidUrl {
            what: "redirect uri",
            source,
        }
    })?;

    let client = BasicClient::new(ClientId::new(config.client_id.clone()))
        .set_auth_uri(auth_url)
        .set_redirect_uri(redirect_url);

    let (url, state) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(config.scopes.iter().cloned().map(Scope::new))
        .url();

    debug!(%url, "constructed authorization request");
    Ok(AuthorizationRequest { url, state })
}

/// The `code` and `state` the provider appends to the callback URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

impl CallbackParams {
    /// Parse a full callback URL, e.g. pasted from the browser.
    pub fn from_url(url: &Url) -> Result<Self, AuthError> {
        let mut code = None;
        let mut state = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                _ => {},
            }
        }

        Ok(CallbackParams {
            code: code
                .filter(|c| !c.is_empty())
                .ok_or(AuthError::MissingParameter("code"))?,
            state: state
                .filter(|s| !s.is_empty())
                .ok_or(AuthError::MissingParameter("state"))?,
        })
    }

    /// Parse either a callback URL or a bare `code=...&state=...` query.
    pub fn parse(input: &str) -> Result<Self, AuthError> {
        let input = input.trim();
        match Url::parse(input) {
            Ok(url) => Self::from_url(&url),
            Err(_) => {
                let query = input.trim_start_matches('?');
                let url = Url::parse(&format!("http://callback.invalid/?{query}")).map_err(
                    |source| AuthError::InvalidUrl {
                        what: "callback",
                        source,
                    },
                )?;
                Self::from_url(&url)
            },
        }
    }
}

fn states_match(received: &str, expected: &str) -> bool {
    bool::from(received.as_bytes().ct_eq(expected.as_bytes()))
}

/// Finish a login: check the state, exchange the code, persist the session.
///
/// A mismatched state is rejected before anything is sent.
#[instrument(skip_all)]
pub async fn complete_login(
    client: &impl ClientTrait,
    store: &impl SessionStore,
    expected_state: &CsrfToken,
    params: &CallbackParams,
) -> Result<Session, AuthError> {
    if !states_match(&params.state, expected_state.secret()) {
        return Err(AuthError::StateMismatch);
    }

    let response = client.auth_callback(&params.code, &params.state).await?;

    let data = match response.data {
        Some(data) if response.success => data,
        _ => {
            let message = response
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_AUTH_ERROR.to_string());
            return Err(AuthError::Rejected(message));
        },
    };

    let session = Session {
        token: Some(data.token),
        user: Some(data.user),
    };
    store.save(&session)?;
    debug!(
        login = session.user.as_ref().map(|u| u.login.as_str()),
        "login complete"
    );
    Ok(session)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use httpmock::Method::POST;
    use httpmock::MockServer;
    use pretty_assertions::assert_eq;
    use rads_catalog::{CatalogClient, CatalogClientConfig};
    use rads_catalog::types::{
        AuthCallbackData,
        AuthCallbackResponse,
        CatalogPage,
        CredentialToken,
        FilterState,
        PublishPackage,
        PublishResult,
        UserProfile,
    };
    use serde_json::json;

    use super::*;
    use crate::session::MemorySessionStore;

    struct CannedAuth {
        response: AuthCallbackResponse,
        calls: AtomicUsize,
    }

    impl CannedAuth {
        fn new(response: AuthCallbackResponse) -> Self {
            CannedAuth {
                response,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ClientTrait for CannedAuth {
        async fn fetch_catalog(
            &self,
            _filters: &FilterState,
        ) -> Result<CatalogPage, CatalogClientError> {
            unimplemented!()
        }

        async fn publish(
            &self,
            _package: &PublishPackage,
            _token: &CredentialToken,
        ) -> Result<PublishResult, CatalogClientError> {
            unimplemented!()
        }

        async fn auth_callback(
            &self,
            _code: &str,
            _state: &str,
        ) -> Result<AuthCallbackResponse, CatalogClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn config() -> OAuthConfig {
        OAuthConfig {
            client_id: "Iv1.registry".to_string(),
            ..Default::default()
        }
    }

    fn success() -> AuthCallbackResponse {
        AuthCallbackResponse {
            success: true,
            data: Some(AuthCallbackData {
                token: CredentialToken::new("gho_fresh"),
                user: UserProfile {
                    login: "octocat".to_string(),
                    ..Default::default()
                },
            }),
            error: None,
        }
    }

    #[test]
    fn authorization_url_carries_client_redirect_scopes_and_state() {
        let request = authorization_request(&config()).unwrap();
        let pairs = request
            .url
            .query_pairs()
            .into_owned()
            .collect::<std::collections::HashMap<_, _>>();

        assert_eq!(request.url.host_str(), Some("github.com"));
        assert_eq!(pairs["client_id"], "Iv1.registry");
        assert_eq!(pairs["redirect_uri"], DEFAULT_REDIRECT_URI);
        assert_eq!(pairs["scope"], "read:user read:org repo");
        assert_eq!(&pairs["state"], request.state.secret());
    }

    #[test]
    fn every_request_gets_a_fresh_state() {
        let first = authorization_request(&config()).unwrap();
        let second = authorization_request(&config()).unwrap();
        assert_ne!(first.state.secret(), second.state.secret());
    }

    #[test]
    fn missing_client_id_is_rejected() {
        assert!(matches!(
            authorization_request(&OAuthConfig::default()),
            Err(AuthError::MissingClientId)
        ));
    }

    #[test]
    fn callback_params_from_url_or_query() {
        let expected = CallbackParams {
            code: "abc".to_string(),
            state: "xyz".to_string(),
        };
        assert_eq!(
            CallbackParams::parse("https://registry.rads-lang.org/api/auth/callback?code=abc&state=xyz")
                .unwrap(),
            expected
        );
        assert_eq!(CallbackParams::parse("?state=xyz&code=abc").unwrap(), expected);
        assert!(matches!(
            CallbackParams::parse("code=abc"),
            Err(AuthError::MissingParameter("state"))
        ));
    }

    #[test]
    fn state_comparison() {
        assert!(states_match("xyz", "xyz"));
        assert!(!states_match("xyz", "xyZ"));
        assert!(!states_match("xy", "xyz"));
        assert!(!states_match("", "xyz"));
    }

    #[tokio::test]
    async fn mismatched_state_never_reaches_the_registry() {
        let client = CannedAuth::new(success());
        let store = MemorySessionStore::default();
        let params = CallbackParams {
            code: "abc".to_string(),
            state: "forged".to_string(),
        };

        let result =
            complete_login(&client, &store, &CsrfToken::new("issued".to_string()), &params).await;

        assert!(matches!(result, Err(AuthError::StateMismatch)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        assert!(!store.load().unwrap().is_authenticated());
    }

    #[tokio::test]
    async fn successful_login_persists_session() {
        let client = CannedAuth::new(success());
        let store = MemorySessionStore::default();
        let params = CallbackParams {
            code: "abc".to_string(),
            state: "issued".to_string(),
        };

        let session =
            complete_login(&client, &store, &CsrfToken::new("issued".to_string()), &params)
                .await
                .unwrap();

        assert_eq!(session.token, Some(CredentialToken::new("gho_fresh")));
        assert_eq!(store.load().unwrap(), session);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn login_authenticates_subsequent_clients() {
        let server = MockServer::start_async().await;
        let callback = server.mock(|when, then| {
            when.method(POST).path("/dispatch").json_body(json!({
                "event_type": "api-auth-callback",
                "client_payload": { "code": "abc", "state": "issued" },
            }));
            then.status(200).json_body(json!({
                "success": true,
                "data": { "token": "gho_fresh", "user": { "login": "octocat" } },
            }));
        });
        let listing = server.mock(|when, then| {
            when.method(POST)
                .path("/dispatch")
                .header("authorization", "Bearer gho_fresh")
                .json_body(json!({ "event_type": "api-list-packages", "client_payload": {} }));
            then.status(200).json_body(json!({ "packages": [], "total": 0 }));
        });

        let store = MemorySessionStore::default();
        let anonymous = CatalogClient::new(CatalogClientConfig {
            dispatch_url: server.base_url(),
            ..Default::default()
        })
        .unwrap();
        let params = CallbackParams::parse("code=abc&state=issued").unwrap();
        complete_login(
            &anonymous,
            &store,
            &CsrfToken::new("issued".to_string()),
            &params,
        )
        .await
        .unwrap();
        callback.assert();

        let authenticated = CatalogClient::new(CatalogClientConfig {
            dispatch_url: server.base_url(),
            session: store.load().unwrap(),
            ..Default::default()
        })
        .unwrap();
        let page = authenticated
            .fetch_catalog(&FilterState::default())
            .await
            .unwrap();
        listing.assert();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn rejected_login_surfaces_server_error_or_fallback() {
        let params = CallbackParams {
            code: "abc".to_string(),
            state: "issued".to_string(),
        };
        let state = CsrfToken::new("issued".to_string());

        let client = CannedAuth::new(AuthCallbackResponse {
            success: false,
            data: None,
            error: Some("bad_verification_code".to_string()),
        });
        let err = complete_login(&client, &MemorySessionStore::default(), &state, &params)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bad_verification_code");

        let client = CannedAuth::new(AuthCallbackResponse {
            success: false,
            data: None,
            error: None,
        });
        let err = complete_login(&client, &MemorySessionStore::default(), &state, &params)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), FALLBACK_AUTH_ERROR);
    }
}

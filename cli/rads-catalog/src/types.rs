//! Registry interaction types.
//!
//! These types describe the payloads exchanged with the dispatch endpoint.
//! Field names on the wire follow the registry's camelCase conventions.

use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Dispatch envelope
// ---------------------------------------------------------------------------

pub const EVENT_LIST_PACKAGES: &str = "api-list-packages";
pub const EVENT_PUBLISH: &str = "api-publish";
pub const EVENT_AUTH_CALLBACK: &str = "api-auth-callback";

/// Body of every request sent to the dispatch endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub event_type: String,
    pub client_payload: Value,
}

// ---------------------------------------------------------------------------
// Closed filter vocabularies
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
#[error("unknown {kind} '{value}', expected one of: {expected}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
    expected: String,
}

/// Generates a closed string enum with its wire representation.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .find(|variant| variant.as_str() == s)
                    .copied()
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                        expected: $name::ALL
                            .iter()
                            .map(|variant| variant.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

wire_enum!(
    /// Package category as shown in the registry's category filter.
    Category, "category", {
        Database => "database",
        Web => "web",
        Utils => "utils",
        Media => "media",
        Networking => "networking",
        Testing => "testing",
        Cli => "cli",
        Other => "other",
    }
);

wire_enum!(
    /// License identifiers accepted by the registry.
    License, "license", {
        Mit => "MIT",
        Apache2 => "Apache-2.0",
        Gpl3 => "GPL-3.0",
        Bsd3 => "BSD-3",
        Isc => "ISC",
        Other => "Other",
    }
);

wire_enum!(
    /// Server-side ordering of listing results.
    SortKey, "sort key", {
        Relevance => "relevance",
        Downloads => "downloads",
        Stars => "stars",
        Updated => "updated",
    }
);

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Relevance
    }
}

// ---------------------------------------------------------------------------
// Filter state
// ---------------------------------------------------------------------------

/// The canonical, fully resolved search intent.
///
/// `query` is stored trimmed and is never `Some("")`.
/// Use `rads_sdk::models::filter` to derive new states from user input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterState {
    pub query: Option<String>,
    pub category: Option<Category>,
    pub license: Option<License>,
    pub sort: SortKey,
}

impl FilterState {
    /// Serialize the filters into the `client_payload` of a listing request.
    ///
    /// Unset fields are omitted rather than sent as empty values,
    /// and the default sort order is left to the server.
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        if let Some(query) = self.query.as_deref().map(str::trim) {
            if !query.is_empty() {
                payload.insert("query".into(), Value::String(query.to_string()));
            }
        }
        if let Some(category) = self.category {
            payload.insert("category".into(), category.as_str().into());
        }
        if let Some(license) = self.license {
            payload.insert("license".into(), license.as_str().into());
        }
        if self.sort != SortKey::default() {
            payload.insert("sort".into(), self.sort.as_str().into());
        }
        Value::Object(payload)
    }

    /// Number of active refinements besides the free-text query.
    pub fn active_filter_count(&self) -> usize {
        usize::from(self.category.is_some())
            + usize::from(self.license.is_some())
            + usize::from(self.sort != SortKey::default())
    }
}

// ---------------------------------------------------------------------------
// Packages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageStats {
    pub downloads: u64,
    pub stars: u64,
    pub last_updated: Option<String>,
}

impl PackageStats {
    /// `last_updated` as a timestamp, if it is valid RFC 3339.
    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.last_updated.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|date| date.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageVersion {
    pub version: String,
    pub release_date: Option<String>,
    pub release_url: Option<String>,
    pub download_url: Option<String>,
    pub checksum: Option<String>,
}

/// A package summary as returned by the registry.
///
/// Only `name` is required; everything else defaults so that listings
/// survive partially populated records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub readme: String,
    #[serde(default)]
    pub latest_version: Option<String>,
    #[serde(default)]
    pub versions: Vec<PackageVersion>,
    #[serde(default)]
    pub stats: PackageStats,
}

impl Package {
    /// The human readable name, falling back to the package name.
    pub fn title(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

/// Why a listing payload could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedResponse {
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("response body is not a JSON object")]
    NotAnObject,
    #[error("response is missing the '{0}' field")]
    MissingField(&'static str),
    #[error("response field '{0}' has an unexpected type")]
    InvalidField(&'static str),
}

/// A normalized listing response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPage {
    /// Packages in server order.
    pub items: Vec<Package>,
    /// Total number of matches on the server.
    pub total: u64,
    /// Set when the payload was malformed and the page degraded to empty.
    pub problem: Option<MalformedResponse>,
}

impl CatalogPage {
    pub fn degraded(problem: MalformedResponse) -> Self {
        CatalogPage {
            items: Vec::new(),
            total: 0,
            problem: Some(problem),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.problem.is_some()
    }
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------

/// The package description forwarded to the registry on publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishPackage {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub repository: String,
    pub homepage: String,
    /// Omitted from the request when no category was chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub license: License,
    pub keywords: Vec<String>,
    pub readme: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResult {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
}

// ---------------------------------------------------------------------------
// Session and authentication
// ---------------------------------------------------------------------------

/// An access credential issued by the registry after login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialToken(String);

impl CredentialToken {
    pub fn new(token: impl Into<String>) -> Self {
        CredentialToken(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CredentialToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialToken(***)")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// The authenticated state of a single user.
///
/// Passed explicitly into the client configuration;
/// persisting it is the job of a session store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub token: Option<CredentialToken>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthCallbackData {
    pub token: CredentialToken,
    pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthCallbackResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<AuthCallbackData>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn default_filters_serialize_to_empty_payload() {
        assert_eq!(FilterState::default().to_payload(), json!({}));
    }

    #[test]
    fn payload_contains_only_present_fields() {
        let filters = FilterState {
            category: Some(Category::Database),
            sort: SortKey::Downloads,
            ..Default::default()
        };
        assert_eq!(
            filters.to_payload(),
            json!({"category": "database", "sort": "downloads"})
        );
    }

    #[test]
    fn blank_query_is_not_sent() {
        let filters = FilterState {
            query: Some("   ".to_string()),
            ..Default::default()
        };
        let payload = filters.to_payload();
        assert!(payload.get("query").is_none());
        assert!(payload.get("q").is_none());
    }

    #[test]
    fn license_wire_names_round_trip() {
        for license in License::ALL {
            assert_eq!(license.as_str().parse::<License>().unwrap(), *license);
        }
        assert!("mit".parse::<License>().is_err());
    }

    #[test]
    fn package_tolerates_missing_stats() {
        let package: Package = serde_json::from_value(json!({
            "name": "sqlite-rads",
            "displayName": "SQLite",
        }))
        .unwrap();
        assert_eq!(package.stats, PackageStats::default());
        assert_eq!(package.title(), "SQLite");
    }

    #[test]
    fn last_updated_parses_rfc3339_only() {
        let stats = PackageStats {
            last_updated: Some("2024-05-01T12:00:00+02:00".to_string()),
            ..Default::default()
        };
        assert_eq!(
            stats.last_updated_at().map(|d| d.to_rfc3339()),
            Some("2024-05-01T10:00:00+00:00".to_string())
        );

        let stats = PackageStats {
            last_updated: Some("last tuesday".to_string()),
            ..Default::default()
        };
        assert_eq!(stats.last_updated_at(), None);
    }

    #[test]
    fn unset_publish_category_is_omitted() {
        let mut package = PublishPackage {
            name: "orm".to_string(),
            display_name: "orm".to_string(),
            description: "Object mapper".to_string(),
            version: "0.3.0".to_string(),
            author: "octocat".to_string(),
            repository: "https://github.com/octocat/orm".to_string(),
            homepage: String::new(),
            category: None,
            license: License::Mit,
            keywords: vec![],
            readme: "# orm".to_string(),
        };
        let body = serde_json::to_value(&package).unwrap();
        assert!(body.get("category").is_none());

        package.category = Some(Category::Database);
        let body = serde_json::to_value(&package).unwrap();
        assert_eq!(body["category"], json!("database"));
    }

    #[test]
    fn credential_token_is_redacted_in_debug() {
        let token = CredentialToken::new("gho_secret");
        assert!(!format!("{token:?}").contains("gho_secret"));
    }
}

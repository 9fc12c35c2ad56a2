//! Configuration types for catalog client construction.

use std::collections::BTreeMap;

use crate::types::Session;

pub const DEFAULT_DISPATCH_URL: &str = "https://api.registry.rads-lang.org";

/// Configuration for catalog client construction.
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// Base URL of the registry API; requests go to `{dispatch_url}/dispatch`.
    pub dispatch_url: String,
    /// Credentials attached to every request when present.
    pub session: Session,
    /// Additional headers to include in requests.
    pub extra_headers: BTreeMap<String, String>,
    pub user_agent: Option<String>,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        CatalogClientConfig {
            dispatch_url: DEFAULT_DISPATCH_URL.to_string(),
            session: Session::default(),
            extra_headers: BTreeMap::new(),
            user_agent: None,
        }
    }
}

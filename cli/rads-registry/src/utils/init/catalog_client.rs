use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rads_catalog::{CatalogClient, CatalogClientConfig};
use rads_sdk::session::{FileSessionStore, Session, SessionStore};
use tracing::debug;

use crate::config::Config;

/// The session store in the configured data directory.
pub fn init_session_store(config: &Config) -> FileSessionStore {
    FileSessionStore::new(&config.data_dir)
}

/// Build a client for the configured registry, authenticated with `session`.
pub fn init_catalog_client(config: &Config, session: Session) -> Result<CatalogClient> {
    let mut extra_headers: BTreeMap<String, String> = BTreeMap::new();

    // Pass in a bool if we are running in CI, so requests can reflect this in the headers
    if std::env::var("CI").is_ok() {
        extra_headers.insert("rads-ci".to_string(), "true".to_string());
    };

    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| format!("rads-registry/{}", env!("CARGO_PKG_VERSION")));

    debug!(
        dispatch_url = %config.dispatch_url,
        authenticated = session.is_authenticated(),
        "initializing catalog client"
    );

    CatalogClient::new(CatalogClientConfig {
        dispatch_url: config.dispatch_url.clone(),
        session,
        extra_headers,
        user_agent: Some(user_agent),
    })
    .context("Could not create registry client")
}

/// Build a client using whatever session is stored.
pub fn init_catalog_client_from_store(
    config: &Config,
    store: &impl SessionStore,
) -> Result<CatalogClient> {
    let session = store.load().context("Could not read stored session")?;
    init_catalog_client(config, session)
}

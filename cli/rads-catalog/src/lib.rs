//! HTTP client for the RADS package registry's dispatch API.
//!
//! This crate provides:
//! - Client construction with bearer token authentication from a [`Session`]
//! - The [`ClientTrait`] seam used by the SDK and by test doubles
//! - Typed errors and normalization of listing responses
//!
//! ## Usage
//!
//! ```ignore
//! use rads_catalog::{CatalogClient, CatalogClientConfig, ClientTrait, FilterState};
//!
//! let client = CatalogClient::new(CatalogClientConfig::default())?;
//! let page = client.fetch_catalog(&FilterState::default()).await?;
//! ```

mod client;
mod config;
mod error;
pub mod types;

pub use client::{CatalogClient, ClientTrait};
pub use config::{CatalogClientConfig, DEFAULT_DISPATCH_URL};
pub use error::{CatalogClientError, GENERIC_FAILURE_MESSAGE, LookupError};
pub use types::{
    CatalogPage,
    Category,
    CredentialToken,
    FilterState,
    License,
    MalformedResponse,
    Package,
    PublishPackage,
    PublishResult,
    Session,
    SortKey,
    UserProfile,
};

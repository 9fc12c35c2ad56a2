use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use bpaf::Bpaf;
use rads_catalog::{Category, License};
use rads_sdk::models::publish::{PublishForm, publish_package};
use rads_sdk::session::SessionStore;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::utils::init::{init_catalog_client, init_session_store};
use crate::utils::message;

/// Publish a package to the registry
#[derive(Debug, Bpaf, Clone)]
pub struct Publish {
    /// Human readable name (defaults to the package name)
    #[bpaf(long("display-name"), argument("NAME"))]
    pub display_name: Option<String>,

    /// Short description of the package
    #[bpaf(long, argument("TEXT"))]
    pub description: String,

    /// Version being published
    #[bpaf(long, argument("VERSION"))]
    pub version: String,

    /// URL of the source repository
    #[bpaf(long, argument("URL"))]
    pub repository: String,

    /// URL of the project homepage
    #[bpaf(long, argument("URL"))]
    pub homepage: Option<String>,

    /// Package category
    #[bpaf(long, argument("CATEGORY"))]
    pub category: Option<Category>,

    /// License (default: MIT)
    #[bpaf(long, argument("LICENSE"))]
    pub license: Option<License>,

    /// Comma separated keywords
    #[bpaf(long, argument("KEYWORDS"))]
    pub keywords: Option<String>,

    /// Path to the README in markdown
    #[bpaf(long, argument("PATH"))]
    pub readme: PathBuf,

    /// Package name; lowercase letters, digits and '-'
    #[bpaf(positional("name"))]
    pub name: String,
}

impl Publish {
    fn into_form(self) -> Result<PublishForm> {
        let readme = fs::read_to_string(&self.readme)
            .with_context(|| format!("Could not read README '{}'", self.readme.display()))?;

        Ok(PublishForm {
            name: self.name,
            display_name: self.display_name.unwrap_or_default(),
            description: self.description,
            version: self.version,
            repository: self.repository,
            homepage: self.homepage.unwrap_or_default(),
            category: self.category,
            license: self.license,
            keywords: self.keywords.unwrap_or_default(),
            readme,
        })
    }

    #[instrument(name = "publish", fields(name = self.name, version = self.version), skip_all)]
    pub async fn handle(self, config: Config) -> Result<()> {
        let store = init_session_store(&config);
        let session = store.load().context("Could not read stored session")?;
        let client = init_catalog_client(&config, session.clone())?;

        let form = self.into_form()?;
        let name = form.name.clone();
        let version = form.version.clone();

        match publish_package(&client, form, &session).await {
            Ok(_) => {
                message::created(format!("Published {name}@{version}"));
                Ok(())
            },
            Err(err) => {
                debug!(%err, "publish failed");
                Err(anyhow!(err.user_message()).context("Publish failed"))
            },
        }
    }
}

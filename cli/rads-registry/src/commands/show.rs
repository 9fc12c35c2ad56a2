use anyhow::{Result, bail};
use bpaf::Bpaf;
use rads_catalog::{ClientTrait, LookupError, Package};
use tracing::instrument;

use crate::config::Config;
use crate::utils::display::DisplayPackage;
use crate::utils::init::{init_catalog_client_from_store, init_session_store};

/// Show detailed package information
#[derive(Debug, Bpaf, Clone)]
pub struct Show {
    /// Display package details as JSON
    #[bpaf(long)]
    pub json: bool,

    /// The exact name of the package
    #[bpaf(positional("name"))]
    pub name: String,
}

impl Show {
    #[instrument(name = "show", fields(name = self.name), skip_all)]
    pub async fn handle(self, config: Config) -> Result<()> {
        let store = init_session_store(&config);
        let client = init_catalog_client_from_store(&config, &store)?;

        let package = lookup(&client, &self.name).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&package)?);
        } else {
            print!("{}", DisplayPackage(&package));
        }
        Ok(())
    }
}

/// Look up a package by exact name, with a user facing error if it is missing.
pub(super) async fn lookup(client: &impl ClientTrait, name: &str) -> Result<Package> {
    match client.fetch_one(name).await {
        Ok(package) => Ok(package),
        Err(LookupError::NotFound(name)) => {
            bail!("Package '{name}' not found in registry.")
        },
        Err(LookupError::Catalog(err)) => Err(anyhow::Error::new(err)
            .context(format!("Could not look up package '{name}'"))),
    }
}

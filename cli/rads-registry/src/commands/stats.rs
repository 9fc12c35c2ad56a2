use anyhow::Result;
use bpaf::Bpaf;
use tracing::instrument;

use super::show::lookup;
use crate::config::Config;
use crate::utils::display::DisplayStats;
use crate::utils::init::{init_catalog_client_from_store, init_session_store};

/// Show download statistics for a package
#[derive(Debug, Bpaf, Clone)]
pub struct Stats {
    /// The exact name of the package
    #[bpaf(positional("name"))]
    pub name: String,
}

impl Stats {
    #[instrument(name = "stats", fields(name = self.name), skip_all)]
    pub async fn handle(self, config: Config) -> Result<()> {
        let store = init_session_store(&config);
        let client = init_catalog_client_from_store(&config, &store)?;

        let package = lookup(&client, &self.name).await?;

        println!("{}", package.title());
        println!();
        print!("{}", DisplayStats(&package));
        Ok(())
    }
}

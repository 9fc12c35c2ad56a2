use anyhow::{Context, Result};
use bpaf::Bpaf;
use rads_catalog::{ClientTrait, FilterState};
use serde_json::json;
use tracing::{debug, instrument};

use super::{FilterArgs, filter_args};
use crate::config::Config;
use crate::utils::display::{DisplayListing, listing_summary};
use crate::utils::init::{init_catalog_client_from_store, init_session_store};
use crate::utils::message;

// Search for packages in the registry
#[derive(Debug, Bpaf, Clone)]
pub struct Search {
    /// Display search results as JSON
    #[bpaf(long)]
    pub json: bool,

    #[bpaf(external(filter_args))]
    pub filters: FilterArgs,

    /// Text to match against package names, descriptions and keywords
    #[bpaf(positional("search-term"))]
    pub search_term: Option<String>,
}

impl Search {
    #[instrument(name = "search", fields(json = self.json, search_term = self.search_term), skip_all)]
    pub async fn handle(self, config: Config) -> Result<()> {
        let store = init_session_store(&config);
        let client = init_catalog_client_from_store(&config, &store)?;

        let filters = self.filters.to_filters(self.search_term.as_deref());
        debug!(?filters, "performing search");

        let page = client
            .fetch_catalog(&filters)
            .await
            .context("Could not search the registry")?;

        if let Some(problem) = &page.problem {
            message::warning(format!(
                "The registry returned an unexpected response ({problem}); showing no results."
            ));
        }

        if self.json {
            println!("{}", render_json(&filters, &page)?);
            return Ok(());
        }

        if page.items.is_empty() {
            if !page.is_degraded() {
                message::plain(no_results_message(&filters));
            }
            return Ok(());
        }

        println!("{}", DisplayListing { page: &page });
        message::plain(listing_summary(&filters, &page));
        Ok(())
    }
}

fn render_json(filters: &FilterState, page: &rads_catalog::CatalogPage) -> Result<String> {
    let value = json!({
        "filters": filters.to_payload(),
        "total": page.total,
        "packages": page.items,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

fn no_results_message(filters: &FilterState) -> String {
    match &filters.query {
        Some(query) => format!("No packages matched '{query}'. Try different keywords or filters."),
        None => "No packages matched the selected filters.".to_string(),
    }
}

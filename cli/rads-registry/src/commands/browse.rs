use anyhow::Result;
use bpaf::Bpaf;
use indoc::indoc;
use rads_catalog::{Category, License, SortKey};
use rads_sdk::models::filter::FilterPatch;
use rads_sdk::models::search::{SearchCommand, SearchDriver, SearchSession, SearchUpdate};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use super::{FilterArgs, filter_args};
use crate::config::Config;
use crate::utils::display::{DisplayListing, listing_summary};
use crate::utils::init::{init_catalog_client_from_store, init_session_store};
use crate::utils::message;

const BROWSE_HELP: &str = indoc! {"
    Type to search; results refresh once you stop typing.
      /category <name>   toggle a category filter
      /license <name>    toggle a license filter
      /sort <key>        relevance, downloads, stars or updated
      /clear             clear all filters
      /search            search now
      /quit              exit"};

// Interactively refine a search
#[derive(Debug, Bpaf, Clone)]
pub struct Browse {
    #[bpaf(external(filter_args))]
    pub filters: FilterArgs,

    /// Initial search text
    #[bpaf(positional("search-term"))]
    pub search_term: Option<String>,
}

/// A line of user input.
#[derive(Debug, Clone, PartialEq)]
enum Input {
    Edit(FilterPatch),
    Submit,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let Some(command) = line.trim().strip_prefix('/') else {
        return Ok(Input::Edit(FilterPatch::query(line)));
    };

    let (command, argument) = match command.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (command, ""),
    };

    match command {
        "category" => argument
            .parse::<Category>()
            .map(|c| Input::Edit(FilterPatch::toggle_category(c)))
            .map_err(|e| e.to_string()),
        "license" => argument
            .parse::<License>()
            .map(|l| Input::Edit(FilterPatch::toggle_license(l)))
            .map_err(|e| e.to_string()),
        "sort" => argument
            .parse::<SortKey>()
            .map(|s| Input::Edit(FilterPatch::sort(s)))
            .map_err(|e| e.to_string()),
        "clear" => Ok(Input::Edit(FilterPatch::clear_all())),
        "search" => Ok(Input::Submit),
        "quit" | "q" => Ok(Input::Quit),
        other => Err(format!("unknown command '/{other}'")),
    }
}

impl Browse {
    #[instrument(name = "browse", skip_all)]
    pub async fn handle(self, config: Config) -> Result<()> {
        let store = init_session_store(&config);
        let client = init_catalog_client_from_store(&config, &store)?;

        let initial = self.filters.to_filters(self.search_term.as_deref());
        let session = SearchSession::with_filters(initial, config.debounce());
        let (driver, commands, updates) = SearchDriver::new(&client, session);

        message::plain(BROWSE_HELP);
        // show the starting listing right away
        commands
            .send(SearchCommand::Submit(FilterPatch::default()))
            .await?;

        let (final_filters, input_result, ()) =
            tokio::join!(driver.run(), read_input(commands), print_updates(updates));
        debug!(?final_filters, "browse finished");
        input_result
    }
}

/// Forward stdin lines to the driver until EOF or `/quit`.
async fn read_input(commands: mpsc::Sender<SearchCommand>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse_input(&line) {
            Ok(Input::Edit(patch)) => SearchCommand::Edit(patch),
            Ok(Input::Submit) => SearchCommand::Submit(FilterPatch::default()),
            Ok(Input::Quit) => break,
            Err(e) => {
                message::warning(e);
                continue;
            },
        };
        if commands.send(command).await.is_err() {
            break;
        }
    }
    Ok(())
}

async fn print_updates(mut updates: mpsc::Receiver<SearchUpdate>) {
    while let Some(SearchUpdate { filters, outcome }) = updates.recv().await {
        match outcome {
            Ok(page) => {
                if let Some(problem) = &page.problem {
                    message::warning(format!("Unexpected response from the registry: {problem}"));
                }
                if !page.items.is_empty() {
                    println!("{}", DisplayListing { page: &page });
                }
                message::plain(listing_summary(&filters, &page));
            },
            Err(err) => message::error(err.user_message()),
        }
    }
}

mod auth;
mod browse;
mod publish;
mod search;
mod show;
mod stats;

use std::fmt;

use anyhow::Result;
use bpaf::Bpaf;
use indoc::indoc;
use rads_catalog::{Category, License, SortKey};
use rads_sdk::models::filter::{FilterPatch, FilterState, merge};

use crate::config::Config;

static RADS_DESCRIPTION: &'_ str = indoc! {"
    Search, inspect and publish packages in the RADS package registry."
};

fn vec_len<T>(x: Vec<T>) -> usize {
    Vec::len(&x)
}

#[derive(Bpaf, Clone, Copy, Debug)]
pub enum Verbosity {
    Verbose(
        /// Increase logging verbosity
        ///
        /// Invoke multiple times for increasing detail.
        #[bpaf(short('v'), long("verbose"), req_flag(()), many, map(vec_len))]
        usize,
    ),

    /// Silence logs except for errors
    #[bpaf(short, long)]
    Quiet,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Verbose(0)
    }
}

#[derive(Bpaf)]
#[bpaf(options, descr(RADS_DESCRIPTION))]
pub struct RegistryCli(#[bpaf(external(registry_args))] pub RegistryArgs);

/// Main args parser
///
/// To parse the whole CLI, use [`RegistryCli`] via [`registry_cli()`].
#[derive(Debug, Bpaf)]
#[bpaf(ignore_rustdoc)]
pub struct RegistryArgs {
    /// Verbose mode
    ///
    /// Invoke multiple times for increasing detail.
    #[bpaf(external, fallback(Default::default()))]
    pub verbosity: Verbosity,

    #[bpaf(external(commands))]
    command: Commands,
}

impl RegistryArgs {
    pub async fn handle(self, config: Config) -> Result<()> {
        match self.command {
            Commands::Search(args) => args.handle(config).await,
            Commands::Browse(args) => args.handle(config).await,
            Commands::Show(args) => args.handle(config).await,
            Commands::Stats(args) => args.handle(config).await,
            Commands::Publish(args) => args.handle(config).await,
            Commands::Auth(args) => args.handle(config).await,
        }
    }
}

#[derive(Bpaf, Clone)]
enum Commands {
    /// Search the registry for packages
    #[bpaf(command)]
    Search(#[bpaf(external(search::search))] search::Search),

    /// Interactively refine a search, reading edits from stdin
    #[bpaf(command)]
    Browse(#[bpaf(external(browse::browse))] browse::Browse),

    /// Show details about a single package
    #[bpaf(command)]
    Show(#[bpaf(external(show::show))] show::Show),

    /// Show download statistics for a package
    #[bpaf(command)]
    Stats(#[bpaf(external(stats::stats))] stats::Stats),

    /// Publish a package to the registry
    #[bpaf(command)]
    Publish(#[bpaf(external(publish::publish))] publish::Publish),

    /// Log in to or out of the registry
    #[bpaf(command)]
    Auth(#[bpaf(external(auth::auth))] auth::Auth),
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command")
    }
}

/// Filter flags shared by `search` and `browse`.
#[derive(Debug, Bpaf, Clone, Default)]
pub struct FilterArgs {
    /// Only show packages in this category
    #[bpaf(long, short('c'), argument("CATEGORY"))]
    pub category: Option<Category>,

    /// Only show packages with this license
    #[bpaf(long, short('l'), argument("LICENSE"))]
    pub license: Option<License>,

    /// Sort results by relevance, downloads, stars or updated
    #[bpaf(long, short('s'), argument("SORT"))]
    pub sort: Option<SortKey>,
}

impl FilterArgs {
    /// The filter state these flags select, starting from `query`.
    pub fn to_filters(&self, query: Option<&str>) -> FilterState {
        let mut patch = FilterPatch::default();
        if let Some(query) = query {
            patch = patch.overlay(FilterPatch::query(query));
        }
        if let Some(category) = self.category {
            patch = patch.overlay(FilterPatch::toggle_category(category));
        }
        if let Some(license) = self.license {
            patch = patch.overlay(FilterPatch::toggle_license(license));
        }
        if let Some(sort) = self.sort {
            patch = patch.overlay(FilterPatch::sort(sort));
        }
        merge(&FilterState::default(), &patch)
    }
}

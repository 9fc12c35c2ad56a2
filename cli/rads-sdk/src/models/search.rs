//! Turning a stream of filter edits into listing requests.
//!
//! [SearchSession] is the synchronous state machine deciding *when* to
//! dispatch; [SearchDriver] runs it against a clock and a [ClientTrait].

use std::time::Duration;

use rads_catalog::{CatalogClientError, CatalogPage, ClientTrait};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, trace};

use super::filter::{FilterPatch, FilterState, Trigger, merge};

/// Idle time after the last query edit before a search is sent.
pub const DEFAULT_QUIESCENCE: Duration = Duration::from_millis(300);

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    /// A query edit is waiting for the quiescence window to pass.
    PendingDebounce(Instant),
    Dispatching,
}

/// Owns the filters of one search page and its dispatch timing.
#[derive(Debug, Clone)]
pub struct SearchSession {
    filters: FilterState,
    state: TriggerState,
    quiescence: Duration,
}

impl SearchSession {
    pub fn new(quiescence: Duration) -> Self {
        Self::with_filters(FilterState::default(), quiescence)
    }

    pub fn with_filters(filters: FilterState, quiescence: Duration) -> Self {
        SearchSession {
            filters,
            state: TriggerState::Idle,
            quiescence,
        }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    /// When the pending debounced dispatch is due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TriggerState::PendingDebounce(deadline) => Some(deadline),
            _ => None,
        }
    }

    /// Apply a user edit.
    ///
    /// Returns the filters to dispatch right away for select-style changes.
    /// Query edits (re)start the quiescence window and return `None`.
    /// An immediate dispatch carries the latest query and supersedes any
    /// pending debounced one.
    /// Typing counts as activity even when the trimmed query is unchanged,
    /// so such an edit still pushes out a pending deadline.
    pub fn edit(&mut self, patch: &FilterPatch, now: Instant) -> Option<FilterState> {
        let next = merge(&self.filters, patch);
        let trigger = Trigger::classify(&self.filters, &next);
        self.filters = next;

        match trigger {
            Trigger::None => {
                if patch.query.is_some()
                    && matches!(self.state, TriggerState::PendingDebounce(_))
                {
                    self.state = TriggerState::PendingDebounce(now + self.quiescence);
                }
                None
            },
            Trigger::Debounced => {
                self.state = TriggerState::PendingDebounce(now + self.quiescence);
                None
            },
            Trigger::Immediate => Some(self.begin_dispatch()),
        }
    }

    /// Explicit submission: merge the patch and dispatch immediately,
    /// discarding any pending debounce.
    pub fn submit(&mut self, patch: &FilterPatch) -> FilterState {
        self.filters = merge(&self.filters, patch);
        self.begin_dispatch()
    }

    /// Fire the debounced dispatch once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<FilterState> {
        match self.state {
            TriggerState::PendingDebounce(deadline) if now >= deadline => {
                Some(self.begin_dispatch())
            },
            _ => None,
        }
    }

    /// Mark the in-flight dispatch as finished.
    ///
    /// A debounce armed while dispatching stays pending.
    pub fn dispatch_completed(&mut self) {
        if self.state == TriggerState::Dispatching {
            self.state = TriggerState::Idle;
        }
    }

    fn begin_dispatch(&mut self) -> FilterState {
        self.state = TriggerState::Dispatching;
        self.filters.clone()
    }
}

#[derive(Debug, Clone)]
pub enum SearchCommand {
    /// An edit of the search controls (typing, clicking a filter).
    Edit(FilterPatch),
    /// Explicit submission (enter / search button).
    Submit(FilterPatch),
}

/// The result of one dispatched search.
#[derive(Debug)]
pub struct SearchUpdate {
    pub filters: FilterState,
    pub outcome: Result<CatalogPage, CatalogClientError>,
}

/// Runs a [SearchSession] against a catalog client.
///
/// Commands arrive on a channel, results are published on another.
/// The driver stops once all command senders are dropped,
/// after firing a still pending debounced search.
pub struct SearchDriver<'a, C> {
    client: &'a C,
    session: SearchSession,
    commands: mpsc::Receiver<SearchCommand>,
    updates: mpsc::Sender<SearchUpdate>,
}

impl<'a, C: ClientTrait> SearchDriver<'a, C> {
    pub fn new(
        client: &'a C,
        session: SearchSession,
    ) -> (
        Self,
        mpsc::Sender<SearchCommand>,
        mpsc::Receiver<SearchUpdate>,
    ) {
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (update_tx, update_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let driver = SearchDriver {
            client,
            session,
            commands: command_rx,
            updates: update_tx,
        };
        (driver, command_tx, update_rx)
    }

    /// Process commands until the command channel closes.
    ///
    /// Returns the final filters.
    pub async fn run(mut self) -> FilterState {
        loop {
            let deadline = self.session.deadline();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SearchCommand::Edit(patch)) => {
                        trace!(?patch, "search edit");
                        if let Some(filters) = self.session.edit(&patch, Instant::now()) {
                            self.dispatch(filters).await;
                        }
                    },
                    Some(SearchCommand::Submit(patch)) => {
                        trace!(?patch, "search submitted");
                        let filters = self.session.submit(&patch);
                        self.dispatch(filters).await;
                    },
                    None => {
                        if let Some(deadline) = deadline {
                            sleep_until(deadline).await;
                            if let Some(filters) = self.session.poll(Instant::now()) {
                                self.dispatch(filters).await;
                            }
                        }
                        debug!("search commands closed, stopping driver");
                        break;
                    },
                },

                // Debounce timer expired
                _ = async {
                    match deadline {
                        Some(deadline) => sleep_until(deadline).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    if let Some(filters) = self.session.poll(Instant::now()) {
                        self.dispatch(filters).await;
                    }
                },
            }
        }

        self.session.filters().clone()
    }

    async fn dispatch(&mut self, filters: FilterState) {
        debug!(?filters, "dispatching search");
        let outcome = self.client.fetch_catalog(&filters).await;
        self.session.dispatch_completed();

        if self
            .updates
            .send(SearchUpdate { filters, outcome })
            .await
            .is_err()
        {
            debug!("search update receiver dropped");
        }
    }
}

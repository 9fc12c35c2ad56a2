use anyhow::{Context, Result, bail};
use bpaf::Bpaf;
use indoc::formatdoc;
use rads_sdk::providers::auth::{CallbackParams, authorization_request, complete_login};
use rads_sdk::session::{Session, SessionStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Instrument, debug, instrument};

use crate::config::Config;
use crate::utils::init::{init_catalog_client, init_session_store};
use crate::utils::message;

// Registry authentication commands
#[derive(Clone, Debug, Bpaf)]
pub enum Auth {
    /// Log in with GitHub
    #[bpaf(command)]
    Login,

    /// Log out and forget the stored credential
    #[bpaf(command)]
    Logout,

    /// Print your current login status
    #[bpaf(command)]
    Status,
}

impl Auth {
    #[instrument(name = "auth", skip_all)]
    pub async fn handle(self, config: Config) -> Result<()> {
        let store = init_session_store(&config);

        match self {
            Auth::Login => {
                login(&config, &store)
                    .instrument(tracing::info_span!("login"))
                    .await
            },
            Auth::Logout => {
                let span = tracing::info_span!("logout");
                let _guard = span.enter();
                let session = store.load().context("Could not read stored session")?;
                if !session.is_authenticated() {
                    message::warning("You are not logged in");
                    return Ok(());
                }

                store
                    .clear()
                    .context("Could not remove the stored session")?;
                message::updated("Logout successful");
                Ok(())
            },
            Auth::Status => {
                let span = tracing::info_span!("status");
                let _guard = span.enter();
                let session = store.load().context("Could not read stored session")?;
                message::plain(status_message(&session, &config.dispatch_url));
                Ok(())
            },
        }
    }
}

fn status_message(session: &Session, dispatch_url: &str) -> String {
    match (&session.token, &session.user) {
        (Some(_), Some(user)) => match &user.name {
            Some(name) => format!("You are logged in as {} ({name}) on {dispatch_url}", user.login),
            None => format!("You are logged in as {} on {dispatch_url}", user.login),
        },
        (Some(_), None) => format!("You are logged in on {dispatch_url}"),
        _ => "You are not currently logged in to the registry.".to_string(),
    }
}

/// Run the login flow
///
/// The provider redirects to the registry's callback page;
/// the user pastes that URL (or its query) back into the terminal.
async fn login(config: &Config, store: &impl SessionStore) -> Result<()> {
    let request = authorization_request(&config.oauth).context("Could not start login")?;

    message::plain(formatdoc! {"
        Open the following URL in your browser to log in:

            {url}

        After authorizing, paste the URL you were redirected to:",
        url = request.url,
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let Some(line) = lines.next_line().await? else {
        bail!("No callback URL was entered");
    };
    let params = CallbackParams::parse(&line)?;
    debug!("received callback parameters");

    // The exchange itself is anonymous.
    let client = init_catalog_client(config, Session::default())?;
    let session = complete_login(&client, store, &request.state, &params)
        .await
        .context("Could not log in")?;

    message::updated("Authentication complete");
    if let Some(user) = &session.user {
        message::updated(format!("Logged in as {}", user.login));
    }
    Ok(())
}

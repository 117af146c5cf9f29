//! Command dispatch.
//!
//! Every command renders into a [`HandoffView`]; failures carry a
//! [`CommandError`] next to the view instead of replacing it, so the button
//! and login states are printed either way.

mod fetch;
mod login;
mod run;

use handoff::testing::RecordingBrowser;
use handoff::{BrowserHost, HandoffConfig, Orchestrator};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cdp::{CdpEndpoint, CdpHost};
use crate::cli::{Cli, Commands};
use crate::config::resolve_config;
use crate::error::Result;
use crate::output::{CommandError, ErrorCode, HandoffView};

/// What a command produced.
#[derive(Debug)]
pub struct Outcome {
	pub view: HandoffView,
	pub error: Option<CommandError>,
}

impl Outcome {
	fn ok(view: HandoffView) -> Self {
		Self { view, error: None }
	}

	fn failed(view: HandoffView, code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			view,
			error: Some(CommandError {
				code,
				message: message.into(),
			}),
		}
	}
}

/// Runs the parsed command against a CDP browser, or the recording host for
/// `--dry-run`.
pub async fn dispatch(cli: &Cli) -> Result<Outcome> {
	let config = resolve_config(cli)?;
	let cancel = interrupt_token();

	if cli.dry_run {
		let host = RecordingBrowser::new();
		let mut outcome = execute(&cli.command, config, host.clone(), cancel).await?;
		outcome.view.scripts = host.scripts();
		return Ok(outcome);
	}

	let endpoint = match cli.cdp_endpoint {
		Some(ref url) => CdpEndpoint::WebSocket(url.clone()),
		None => CdpEndpoint::Port(cli.cdp_port),
	};
	debug!(?endpoint, "using CDP browser host");
	execute(&cli.command, config, CdpHost::new(endpoint), cancel).await
}

async fn execute<H: BrowserHost>(
	command: &Commands,
	config: HandoffConfig,
	host: H,
	cancel: CancellationToken,
) -> Result<Outcome> {
	let mut orchestrator = Orchestrator::new(config, host)?;
	let outcome = match command {
		Commands::Fetch { link } => fetch::execute(&mut orchestrator, link).await,
		Commands::Login { query } => login::execute(&orchestrator, query, cancel).await,
		Commands::Run { link } => run::execute(&mut orchestrator, link, cancel).await,
	};
	Ok(outcome)
}

/// Cancelled on Ctrl-C; an interrupted hand-off ends as if the surface closed.
fn interrupt_token() -> CancellationToken {
	let cancel = CancellationToken::new();
	let token = cancel.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			info!("interrupted");
			token.cancel();
		}
	});
	cancel
}

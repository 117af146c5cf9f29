use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// Port Chromium listens on for remote debugging unless told otherwise.
pub const DEFAULT_CDP_PORT: u16 = 9222;

#[derive(Parser, Debug)]
#[command(name = "handoff")]
#[command(about = "Hand a session token off into a browser surface")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default) or json
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Load hand-off configuration from a JSON file
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Connect to this CDP websocket instead of discovering one
	#[arg(long, global = true, value_name = "WS_URL")]
	pub cdp_endpoint: Option<String>,

	/// Discover the CDP websocket from Chromium's debugging port
	#[arg(long, global = true, value_name = "PORT", default_value_t = DEFAULT_CDP_PORT)]
	pub cdp_port: u16,

	/// Record scripts instead of driving a browser, then print them
	#[arg(long, global = true)]
	pub dry_run: bool,

	/// Override the token request timeout
	#[arg(long, global = true, value_name = "MS")]
	pub fetch_timeout_ms: Option<u64>,

	/// Override how long to wait for the landing page to load
	#[arg(long, global = true, value_name = "MS")]
	pub load_timeout_ms: Option<u64>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Fetch the token behind a link and print the login transfer
	Fetch {
		/// Link to the token document
		link: String,
	},

	/// Inject a session from a login transfer query
	Login {
		/// `domain=...&jwt=...`, optionally prefixed by `login.html?`
		query: String,
	},

	/// Fetch and inject in one go
	Run {
		/// Link to the token document
		link: String,
	},
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Fetch { .. } => "fetch",
			Commands::Login { .. } => "login",
			Commands::Run { .. } => "run",
		}
	}
}

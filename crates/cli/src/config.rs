//! Builds the effective [`HandoffConfig`] from an optional file plus flags.

use handoff::HandoffConfig;
use tracing::debug;

use crate::cli::Cli;
use crate::error::{CliError, Result};

pub fn resolve_config(cli: &Cli) -> Result<HandoffConfig> {
	let mut config = match cli.config {
		Some(ref path) => {
			debug!(path = %path.display(), "loading config");
			HandoffConfig::from_file(path).map_err(|source| CliError::Config {
				path: path.clone(),
				source,
			})?
		}
		None => HandoffConfig::default(),
	};

	if let Some(ms) = cli.fetch_timeout_ms {
		config.fetch_timeout_ms = ms;
	}
	if let Some(ms) = cli.load_timeout_ms {
		config.load_timeout_ms = ms;
	}

	Ok(config)
}

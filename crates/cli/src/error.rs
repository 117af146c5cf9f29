use std::path::PathBuf;

use handoff::HandoffError;
use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

/// Failures that stop a command before it has anything to show.
#[derive(Debug, Error)]
pub enum CliError {
	#[error("failed to load config {path}")]
	Config {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error(transparent)]
	Handoff(#[from] HandoffError),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::Config { .. } => ErrorCode::ConfigError,
			CliError::Handoff(e) => e.kind().into(),
		}
	}

	pub fn to_command_error(&self) -> CommandError {
		let message = match self {
			CliError::Config { path, source } => format!("failed to load config {}: {source}", path.display()),
			other => other.to_string(),
		};
		CommandError {
			code: self.code(),
			message,
		}
	}
}

//! Result envelope printed by every command.
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "ok": true,
//!   "command": "run",
//!   "state": "success",
//!   "label": "انجام شد!",
//!   "status": "",
//!   "login": { "status": "succeeded", "message": "ورود موفقیت‌آمیز بود!" },
//!   "timings": { "durationMs": 1234 }
//! }
//! ```
//!
//! On failure `ok` is false and `error` carries a stable code:
//!
//! ```json
//! { "ok": false, "command": "fetch", "state": "apiError", "error": { "code": "REMOTE_ERROR", "message": "..." } }
//! ```

#[cfg(test)]
mod tests;

use std::io::{self, Write};
use std::time::{Duration, Instant};

use handoff::orchestrator::LoginReport;
use handoff::{ButtonState, ErrorKind};
use serde::{Deserialize, Serialize};

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON output
	Json,
}

impl std::str::FromStr for OutputFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"text" => Ok(OutputFormat::Text),
			"json" => Ok(OutputFormat::Json),
			_ => Err(format!("unknown format: {s}")),
		}
	}
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}

/// The envelope returned by all commands.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,

	pub ok: bool,

	pub command: String,

	/// Command-specific fields, inlined into the envelope
	#[serde(flatten)]
	pub data: Option<T>,

	/// Error information (only present on failure)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub timings: Option<Timings>,
}

/// Error information for failed commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,

	/// Human-readable error message
	pub message: String,
}

/// Standardized error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	EmptyInput,
	NetworkError,
	RemoteError,
	MalformedLink,
	InvalidPayload,
	InjectionError,
	UnsupportedDomain,
	IncompleteTransfer,
	/// Configuration file missing or invalid
	ConfigError,
	/// Unknown/internal error
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			ErrorCode::EmptyInput => "EMPTY_INPUT",
			ErrorCode::NetworkError => "NETWORK_ERROR",
			ErrorCode::RemoteError => "REMOTE_ERROR",
			ErrorCode::MalformedLink => "MALFORMED_LINK",
			ErrorCode::InvalidPayload => "INVALID_PAYLOAD",
			ErrorCode::InjectionError => "INJECTION_ERROR",
			ErrorCode::UnsupportedDomain => "UNSUPPORTED_DOMAIN",
			ErrorCode::IncompleteTransfer => "INCOMPLETE_TRANSFER",
			ErrorCode::ConfigError => "CONFIG_ERROR",
			ErrorCode::InternalError => "INTERNAL_ERROR",
		};
		write!(f, "{s}")
	}
}

impl From<ErrorKind> for ErrorCode {
	fn from(kind: ErrorKind) -> Self {
		match kind {
			ErrorKind::EmptyInput => ErrorCode::EmptyInput,
			ErrorKind::NetworkError => ErrorCode::NetworkError,
			ErrorKind::RemoteError => ErrorCode::RemoteError,
			ErrorKind::MalformedLink => ErrorCode::MalformedLink,
			ErrorKind::InvalidPayload => ErrorCode::InvalidPayload,
			ErrorKind::InjectionError => ErrorCode::InjectionError,
			ErrorKind::UnsupportedDomain => ErrorCode::UnsupportedDomain,
			ErrorKind::IncompleteTransfer => ErrorCode::IncompleteTransfer,
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	pub duration_ms: u64,
}

impl From<Duration> for Timings {
	fn from(duration: Duration) -> Self {
		Timings {
			duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
		}
	}
}

/// What a hand-off command shows: the trigger screen's button, the login
/// transfer and the login screen's outcome, as far as the command got.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffView {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub state: Option<ButtonState>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub label: Option<&'static str>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<&'static str>,

	/// Location of the login screen, token included
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transfer: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub login: Option<LoginView>,

	/// Scripts a dry run would have injected, in order
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub scripts: Vec<String>,
}

impl HandoffView {
	pub fn button(state: ButtonState) -> Self {
		let view = state.view();
		Self {
			state: Some(state),
			label: Some(view.label),
			status: Some(view.status_text),
			..Self::default()
		}
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginView {
	pub message: &'static str,
	#[serde(flatten)]
	pub report: LoginReport,
}

impl From<LoginReport> for LoginView {
	fn from(report: LoginReport) -> Self {
		Self {
			message: report.status.message(),
			report,
		}
	}
}

/// Builder for constructing command results
pub struct ResultBuilder<T: Serialize> {
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			data: None,
			error: None,
			start_time: Instant::now(),
		}
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
		self.error = Some(CommandError {
			code,
			message: message.into(),
		});
		self
	}

	pub fn build(self) -> CommandResult<T> {
		CommandResult {
			schema_version: Some(SCHEMA_VERSION),
			ok: self.error.is_none(),
			command: self.command,
			data: self.data,
			error: self.error,
			timings: Some(Timings::from(self.start_time.elapsed())),
		}
	}
}

/// Print a command result to stdout in the specified format
pub fn print_result(result: &CommandResult<HandoffView>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_result_text(result),
	}
}

fn print_result_text(result: &CommandResult<HandoffView>) {
	let mut stdout = io::stdout().lock();

	if let Some(ref view) = result.data {
		if let Some(label) = view.label {
			let _ = writeln!(stdout, "{label}");
		}
		if let Some(status) = view.status.filter(|s| !s.is_empty()) {
			let _ = writeln!(stdout, "{status}");
		}
		if let Some(ref transfer) = view.transfer {
			let _ = writeln!(stdout, "{transfer}");
		}
		if let Some(ref login) = view.login {
			let _ = writeln!(stdout, "{}", login.message);
		}
		for (i, script) in view.scripts.iter().enumerate() {
			let _ = writeln!(stdout, "--- script {} ---\n{script}", i + 1);
		}
	}
}

/// Print an error to stderr in human-readable format
pub fn print_error_stderr(error: &CommandError) {
	eprintln!("Error [{}]: {}", error.code, error.message);
}

//! Abstraction over the embedded browser surface.
//!
//! The surface is hosted outside this crate. It can be opened, navigated,
//! asked to run a script, and it reports two lifecycle events: the page
//! finished loading, and the surface was closed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

/// Lifecycle events emitted by a [`BrowserHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
	/// The current page finished loading.
	Loaded,
	/// The surface was closed, by the user or the host.
	Closed,
}

/// Options applied when a handle navigates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigateOptions {
	/// Show the host's location bar.
	pub show_location: bool,
	/// Clear the browser cache before loading.
	pub clear_cache: bool,
	/// Clear session cookies before loading.
	pub clear_session_cache: bool,
}

impl Default for NavigateOptions {
	fn default() -> Self {
		Self {
			show_location: false,
			clear_cache: true,
			clear_session_cache: true,
		}
	}
}

impl NavigateOptions {
	/// Renders the options in the `key=yes|no` list form webview hosts take.
	pub fn to_host_string(&self) -> String {
		let flag = |on: bool| if on { "yes" } else { "no" };
		format!(
			"location={},clearcache={},clearsessioncache={}",
			flag(self.show_location),
			flag(self.clear_cache),
			flag(self.clear_session_cache)
		)
	}
}

/// Errors reported by a browser host or handle.
#[derive(Debug, Error)]
pub enum BrowserError {
	/// The surface is gone.
	#[error("browser surface closed")]
	Closed,

	/// The surface could not be opened.
	#[error("failed to open browser surface: {0}")]
	Open(String),

	/// Navigation was rejected.
	#[error("navigation failed: {0}")]
	Navigation(String),

	/// An injected script threw or could not be delivered.
	#[error("script failed: {0}")]
	Script(String),

	/// The channel to the host failed.
	#[error("browser transport error: {0}")]
	Transport(String),
}

/// A live embedded browser surface.
///
/// Exclusively owned by the injector for the duration of one hand-off.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
	/// Subscribes to lifecycle events emitted from now on.
	fn events(&self) -> broadcast::Receiver<LifecycleEvent>;

	/// Navigates the surface to `url`.
	async fn navigate(&self, url: &str, options: &NavigateOptions) -> Result<(), BrowserError>;

	/// Runs `code` in the current page and returns its completion value.
	async fn run_script(&self, code: &str) -> Result<Value, BrowserError>;

	/// Closes the surface.
	async fn close(&self) -> Result<(), BrowserError>;
}

/// Opens embedded browser surfaces.
#[async_trait]
pub trait BrowserHost: Send + Sync {
	type Handle: BrowserHandle + 'static;

	/// Opens a fresh, blank surface.
	async fn open(&self) -> Result<Self::Handle, BrowserError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_options_render_like_host_string() {
		assert_eq!(
			NavigateOptions::default().to_host_string(),
			"location=no,clearcache=yes,clearsessioncache=yes"
		);
	}

	#[test]
	fn host_string_reflects_each_flag() {
		let options = NavigateOptions {
			show_location: true,
			clear_cache: false,
			clear_session_cache: true,
		};
		assert_eq!(options.to_host_string(), "location=yes,clearcache=no,clearsessioncache=yes");
	}
}

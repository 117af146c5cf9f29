//! In-memory browser host for tests and dry runs.
//!
//! [`RecordingBrowser`] implements [`BrowserHost`] without any real browser.
//! Every call made through its handles is recorded for later assertion, and
//! the lifecycle it reports can be shaped up front:
//!
//! ```ignore
//! let host = RecordingBrowser::new().close_after_scripts(2);
//! let injector = SessionInjector::new(host.clone(), HandoffConfig::default());
//! // ... run an injection, then
//! assert_eq!(host.scripts().len(), 2);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::browser::{BrowserError, BrowserHandle, BrowserHost, LifecycleEvent, NavigateOptions};
use crate::injector::scripts::COOKIE_SNAPSHOT_JS;

/// Call recorded by [`RecordingBrowser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserCall {
	Open,
	Navigate { url: String, options: NavigateOptions },
	Script { code: String },
	Close,
}

struct Behaviour {
	load_on_navigate: bool,
	close_after_scripts: Option<usize>,
	fail_scripts_containing: Option<String>,
	fail_open: bool,
	page: Value,
}

impl Default for Behaviour {
	fn default() -> Self {
		Self {
			load_on_navigate: true,
			close_after_scripts: None,
			fail_scripts_containing: None,
			fail_open: false,
			page: json!({ "cookie": "", "hostname": "", "pathname": "/" }),
		}
	}
}

#[derive(Default)]
struct Shared {
	calls: Mutex<Vec<BrowserCall>>,
	behaviour: Mutex<Behaviour>,
	events: Mutex<Option<broadcast::Sender<LifecycleEvent>>>,
	closed: AtomicBool,
}

/// Browser host that records calls instead of driving a browser.
///
/// Clones share state, so keep one clone for assertions and hand the other
/// to the code under test.
#[derive(Clone, Default)]
pub struct RecordingBrowser {
	shared: Arc<Shared>,
}

impl RecordingBrowser {
	/// Creates a host whose pages report `Loaded` after each navigation.
	pub fn new() -> Self {
		Self::default()
	}

	/// Never report `Loaded`.
	pub fn without_load(self) -> Self {
		self.shared.behaviour.lock().load_on_navigate = false;
		self
	}

	/// Close the surface once `n` scripts have run.
	pub fn close_after_scripts(self, n: usize) -> Self {
		self.shared.behaviour.lock().close_after_scripts = Some(n);
		self
	}

	/// Fail every script whose source contains `needle`.
	pub fn fail_scripts_containing(self, needle: impl Into<String>) -> Self {
		self.shared.behaviour.lock().fail_scripts_containing = Some(needle.into());
		self
	}

	/// Refuse to open a surface.
	pub fn fail_open(self) -> Self {
		self.shared.behaviour.lock().fail_open = true;
		self
	}

	/// Page state returned to the cookie snapshot script.
	pub fn with_page(self, cookie: &str, hostname: &str, pathname: &str) -> Self {
		self.shared.behaviour.lock().page = json!({
			"cookie": cookie,
			"hostname": hostname,
			"pathname": pathname,
		});
		self
	}

	/// All recorded calls, oldest first.
	pub fn calls(&self) -> Vec<BrowserCall> {
		self.shared.calls.lock().clone()
	}

	/// Source of every script run, oldest first.
	pub fn scripts(&self) -> Vec<String> {
		self.shared
			.calls
			.lock()
			.iter()
			.filter_map(|call| match call {
				BrowserCall::Script { code } => Some(code.clone()),
				_ => None,
			})
			.collect()
	}

	pub fn is_closed(&self) -> bool {
		self.shared.closed.load(Ordering::SeqCst)
	}

	/// Emits `event` to the most recently opened page.
	pub fn emit(&self, event: LifecycleEvent) {
		self.shared.emit(event);
	}
}

impl Shared {
	fn record(&self, call: BrowserCall) {
		self.calls.lock().push(call);
	}

	fn emit(&self, event: LifecycleEvent) {
		if event == LifecycleEvent::Closed {
			self.closed.store(true, Ordering::SeqCst);
		}
		if let Some(tx) = self.events.lock().as_ref() {
			let _ = tx.send(event);
		}
	}

	fn ensure_open(&self) -> Result<(), BrowserError> {
		if self.closed.load(Ordering::SeqCst) {
			Err(BrowserError::Closed)
		} else {
			Ok(())
		}
	}
}

#[async_trait]
impl BrowserHost for RecordingBrowser {
	type Handle = RecordingPage;

	async fn open(&self) -> Result<RecordingPage, BrowserError> {
		self.shared.record(BrowserCall::Open);
		if self.shared.behaviour.lock().fail_open {
			return Err(BrowserError::Open("recording host refused to open".to_string()));
		}

		let (tx, _) = broadcast::channel(16);
		*self.shared.events.lock() = Some(tx.clone());
		self.shared.closed.store(false, Ordering::SeqCst);
		Ok(RecordingPage {
			shared: Arc::clone(&self.shared),
			events: tx,
		})
	}
}

/// Handle returned by [`RecordingBrowser::open`].
pub struct RecordingPage {
	shared: Arc<Shared>,
	events: broadcast::Sender<LifecycleEvent>,
}

#[async_trait]
impl BrowserHandle for RecordingPage {
	fn events(&self) -> broadcast::Receiver<LifecycleEvent> {
		self.events.subscribe()
	}

	async fn navigate(&self, url: &str, options: &NavigateOptions) -> Result<(), BrowserError> {
		self.shared.ensure_open()?;
		self.shared.record(BrowserCall::Navigate {
			url: url.to_string(),
			options: *options,
		});
		if self.shared.behaviour.lock().load_on_navigate {
			let _ = self.events.send(LifecycleEvent::Loaded);
		}
		Ok(())
	}

	async fn run_script(&self, code: &str) -> Result<Value, BrowserError> {
		self.shared.ensure_open()?;
		let ran = {
			let mut calls = self.shared.calls.lock();
			calls.push(BrowserCall::Script { code: code.to_string() });
			calls.iter().filter(|c| matches!(c, BrowserCall::Script { .. })).count()
		};

		let (failing, close_at, page) = {
			let behaviour = self.shared.behaviour.lock();
			let failing = behaviour
				.fail_scripts_containing
				.as_deref()
				.is_some_and(|needle| code.contains(needle));
			(failing, behaviour.close_after_scripts, behaviour.page.clone())
		};

		if failing {
			return Err(BrowserError::Script("recording host rejected script".to_string()));
		}
		if close_at.is_some_and(|n| ran >= n) {
			self.shared.emit(LifecycleEvent::Closed);
		}

		if code == COOKIE_SNAPSHOT_JS {
			Ok(page)
		} else {
			Ok(Value::Bool(true))
		}
	}

	async fn close(&self) -> Result<(), BrowserError> {
		self.shared.record(BrowserCall::Close);
		self.shared.emit(LifecycleEvent::Closed);
		Ok(())
	}
}

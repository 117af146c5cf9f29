//! [`BrowserHost`] over the Chrome DevTools Protocol.
//!
//! Each [`CdpHost::open`] connects to the browser websocket, creates a blank
//! target, attaches to it with a flat session and enables the `Page` and
//! `Runtime` domains. Page events for that session are turned into
//! [`LifecycleEvent`]s by a pump task owned by the returned [`CdpPage`].

mod connection;
mod discovery;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use handoff::{BrowserError, BrowserHandle, BrowserHost, LifecycleEvent, NavigateOptions};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use self::connection::{CdpConnection, CdpEvent};
pub use self::discovery::{CdpVersionInfo, fetch_cdp_endpoint};

pub type Result<T> = std::result::Result<T, CdpError>;

#[derive(Debug, Error)]
pub enum CdpError {
	#[error("CDP discovery failed: {0}")]
	Discovery(String),

	#[error("CDP connection failed: {0}")]
	Connect(String),

	#[error("CDP connection closed")]
	Closed,

	#[error("CDP error {code}: {message}")]
	Protocol { code: i64, message: String },

	#[error("CDP reply missing {0}")]
	MissingField(&'static str),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl From<CdpError> for BrowserError {
	fn from(err: CdpError) -> Self {
		match err {
			CdpError::Closed => BrowserError::Closed,
			CdpError::Discovery(_) | CdpError::Connect(_) => BrowserError::Open(err.to_string()),
			other => BrowserError::Transport(other.to_string()),
		}
	}
}

/// Where the browser websocket is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdpEndpoint {
	/// A `ws://` URL, used as given.
	WebSocket(String),
	/// A remote-debugging port, resolved through `/json/version`.
	Port(u16),
}

impl CdpEndpoint {
	pub async fn resolve(&self) -> Result<String> {
		match self {
			CdpEndpoint::WebSocket(url) => Ok(url.clone()),
			CdpEndpoint::Port(port) => Ok(fetch_cdp_endpoint(*port).await?.web_socket_debugger_url),
		}
	}
}

/// Opens one fresh target per hand-off in a running Chromium.
#[derive(Debug, Clone)]
pub struct CdpHost {
	endpoint: CdpEndpoint,
}

impl CdpHost {
	pub fn new(endpoint: CdpEndpoint) -> Self {
		Self { endpoint }
	}

	async fn open_page(&self) -> Result<CdpPage> {
		let ws_url = self.endpoint.resolve().await?;
		let conn = CdpConnection::connect(&ws_url).await?;

		conn.send("Target.setDiscoverTargets", json!({ "discover": true }), None)
			.await?;
		let created = conn
			.send("Target.createTarget", json!({ "url": "about:blank" }), None)
			.await?;
		let target_id = str_field(&created, "targetId")?;
		let attached = conn
			.send(
				"Target.attachToTarget",
				json!({ "targetId": target_id, "flatten": true }),
				None,
			)
			.await?;
		let session_id = str_field(&attached, "sessionId")?;
		debug!(%target_id, %session_id, "attached to new target");

		let page = CdpPage::start(conn, target_id, session_id);
		page.send("Page.enable", json!({})).await?;
		page.send("Runtime.enable", json!({})).await?;
		Ok(page)
	}
}

#[async_trait]
impl BrowserHost for CdpHost {
	type Handle = CdpPage;

	async fn open(&self) -> std::result::Result<CdpPage, BrowserError> {
		self.open_page().await.map_err(|e| match e {
			CdpError::Closed => BrowserError::Open("browser closed the connection".to_string()),
			other => BrowserError::Open(other.to_string()),
		})
	}
}

/// One attached target.
pub struct CdpPage {
	conn: Arc<CdpConnection>,
	target_id: String,
	session_id: String,
	events: broadcast::Sender<LifecycleEvent>,
	navigated: Arc<AtomicBool>,
	closed: Arc<AtomicBool>,
	pump: JoinHandle<()>,
}

impl CdpPage {
	fn start(conn: Arc<CdpConnection>, target_id: String, session_id: String) -> Self {
		let (events, _) = broadcast::channel(16);
		let navigated = Arc::new(AtomicBool::new(false));
		let closed = Arc::new(AtomicBool::new(false));

		let pump = tokio::spawn(pump_events(
			conn.subscribe(),
			conn.closed(),
			events.clone(),
			target_id.clone(),
			session_id.clone(),
			Arc::clone(&navigated),
			Arc::clone(&closed),
		));

		Self {
			conn,
			target_id,
			session_id,
			events,
			navigated,
			closed,
			pump,
		}
	}

	async fn send(&self, method: &str, params: Value) -> Result<Value> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(CdpError::Closed);
		}
		self.conn.send(method, params, Some(&self.session_id)).await
	}
}

impl Drop for CdpPage {
	fn drop(&mut self) {
		self.pump.abort();
	}
}

async fn pump_events(
	mut rx: broadcast::Receiver<CdpEvent>,
	socket_closed: tokio_util::sync::CancellationToken,
	events: broadcast::Sender<LifecycleEvent>,
	target_id: String,
	session_id: String,
	navigated: Arc<AtomicBool>,
	closed: Arc<AtomicBool>,
) {
	loop {
		let event = tokio::select! {
			_ = socket_closed.cancelled() => None,
			event = rx.recv() => match event {
				Ok(event) => Some(event),
				Err(RecvError::Lagged(n)) => {
					warn!(dropped = n, "CDP event receiver lagged");
					continue;
				}
				Err(RecvError::Closed) => None,
			},
		};

		let lifecycle = match event {
			None => Some(LifecycleEvent::Closed),
			Some(event) => lifecycle_of(&event, &target_id, &session_id, navigated.load(Ordering::SeqCst)),
		};

		match lifecycle {
			Some(LifecycleEvent::Closed) => {
				info!(%target_id, "target closed");
				closed.store(true, Ordering::SeqCst);
				let _ = events.send(LifecycleEvent::Closed);
				return;
			}
			Some(LifecycleEvent::Loaded) => {
				debug!(%target_id, "page loaded");
				let _ = events.send(LifecycleEvent::Loaded);
			}
			None => {}
		}
	}
}

/// Maps a CDP event to a lifecycle event of the page identified by
/// `target_id`/`session_id`. Loads are only reported once a navigation has
/// been issued.
fn lifecycle_of(event: &CdpEvent, target_id: &str, session_id: &str, navigated: bool) -> Option<LifecycleEvent> {
	let param = |key: &str| event.params.get(key).and_then(Value::as_str);
	match event.method.as_str() {
		"Page.loadEventFired" if navigated && event.session_id.as_deref() == Some(session_id) => {
			Some(LifecycleEvent::Loaded)
		}
		"Target.targetDestroyed" if param("targetId") == Some(target_id) => Some(LifecycleEvent::Closed),
		"Target.detachedFromTarget"
			if param("sessionId") == Some(session_id) || param("targetId") == Some(target_id) =>
		{
			Some(LifecycleEvent::Closed)
		}
		_ => None,
	}
}

fn str_field(value: &Value, key: &'static str) -> Result<String> {
	value
		.get(key)
		.and_then(Value::as_str)
		.map(str::to_string)
		.ok_or(CdpError::MissingField(key))
}

#[async_trait]
impl BrowserHandle for CdpPage {
	fn events(&self) -> broadcast::Receiver<LifecycleEvent> {
		self.events.subscribe()
	}

	async fn navigate(&self, url: &str, options: &NavigateOptions) -> std::result::Result<(), BrowserError> {
		if options.clear_cache {
			self.send("Network.clearBrowserCache", json!({})).await?;
		}
		if options.clear_session_cache {
			self.send("Network.clearBrowserCookies", json!({})).await?;
		}

		self.navigated.store(true, Ordering::SeqCst);
		let reply = self.send("Page.navigate", json!({ "url": url })).await?;
		if let Some(reason) = reply.get("errorText").and_then(Value::as_str) {
			return Err(BrowserError::Navigation(format!("{url}: {reason}")));
		}
		Ok(())
	}

	async fn run_script(&self, code: &str) -> std::result::Result<Value, BrowserError> {
		let reply = self
			.send(
				"Runtime.evaluate",
				json!({
					"expression": code,
					"returnByValue": true,
					"awaitPromise": true,
				}),
			)
			.await?;

		if let Some(details) = reply.get("exceptionDetails") {
			let message = details
				.pointer("/exception/description")
				.or_else(|| details.get("text"))
				.and_then(Value::as_str)
				.unwrap_or("uncaught exception");
			return Err(BrowserError::Script(message.to_string()));
		}

		Ok(reply.pointer("/result/value").cloned().unwrap_or(Value::Null))
	}

	async fn close(&self) -> std::result::Result<(), BrowserError> {
		self.conn
			.send("Target.closeTarget", json!({ "targetId": self.target_id }), None)
			.await?;
		Ok(())
	}
}

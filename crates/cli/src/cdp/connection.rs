//! Request/response correlation over a CDP websocket.
//!
//! # Message Flow
//!
//! 1. [`CdpConnection::send`] takes the next id and parks a oneshot sender
//! 2. The request is queued for the writer task
//! 3. The reader task matches each reply to its id and completes the oneshot
//! 4. Messages without an id are events and go to every subscriber
//!
//! When the socket ends, every pending request fails with
//! [`CdpError::Closed`] and [`CdpConnection::closed`] is cancelled.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use super::{CdpError, Result};

/// Pending request callbacks keyed by request ID.
type CallbackMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>>;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Request<'a> {
	id: u64,
	method: &'a str,
	params: Value,
	#[serde(skip_serializing_if = "Option::is_none")]
	session_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Incoming {
	id: Option<u64>,
	result: Option<Value>,
	error: Option<ProtocolError>,
	method: Option<String>,
	#[serde(default)]
	params: Value,
	session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProtocolError {
	code: i64,
	message: String,
}

/// A CDP event.
#[derive(Debug, Clone, PartialEq)]
pub struct CdpEvent {
	pub method: String,
	pub params: Value,
	/// Session the event belongs to; `None` for browser-level events.
	pub session_id: Option<String>,
}

/// Removes the parked callback when a request future is dropped early.
struct CancelGuard {
	id: u64,
	callbacks: CallbackMap,
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.callbacks.lock().remove(&self.id).is_some() {
			debug!(id = self.id, "dropped pending CDP request");
		}
	}
}

pub struct CdpConnection {
	last_id: AtomicU64,
	callbacks: CallbackMap,
	outbound_tx: mpsc::UnboundedSender<Message>,
	events: broadcast::Sender<CdpEvent>,
	closed: CancellationToken,
}

impl CdpConnection {
	/// Opens the websocket at `ws_url` and starts the reader and writer tasks.
	pub async fn connect(ws_url: &str) -> Result<Arc<Self>> {
		let (stream, _) = connect_async(ws_url)
			.await
			.map_err(|e| CdpError::Connect(format!("{ws_url}: {e}")))?;
		debug!(url = ws_url, "CDP websocket connected");

		let (mut write, mut read) = stream.split();
		let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
		let (events, _) = broadcast::channel(EVENT_CAPACITY);

		let conn = Arc::new(Self {
			last_id: AtomicU64::new(0),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			outbound_tx,
			events,
			closed: CancellationToken::new(),
		});

		let closed = conn.closed.clone();
		tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = closed.cancelled() => break,
					message = outbound_rx.recv() => {
						let Some(message) = message else { break };
						if let Err(e) = write.send(message).await {
							error!(error = %e, "CDP write failed");
							closed.cancel();
							break;
						}
					}
				}
			}
			let _ = write.close().await;
		});

		let reader = Arc::clone(&conn);
		tokio::spawn(async move {
			while let Some(message) = read.next().await {
				match message {
					Ok(Message::Text(text)) => reader.dispatch(&text),
					Ok(Message::Close(_)) => break,
					Ok(_) => {}
					Err(e) => {
						error!(error = %e, "CDP read failed");
						break;
					}
				}
			}
			reader.shutdown();
		});

		Ok(conn)
	}

	/// Sends `method` and waits for its reply.
	pub async fn send(&self, method: &str, params: Value, session_id: Option<&str>) -> Result<Value> {
		if self.closed.is_cancelled() {
			return Err(CdpError::Closed);
		}

		let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, tx);
		let _guard = CancelGuard {
			id,
			callbacks: Arc::clone(&self.callbacks),
		};

		let request = serde_json::to_string(&Request {
			id,
			method,
			params,
			session_id,
		})?;
		trace!(id, method, "CDP request");

		if self.outbound_tx.send(Message::Text(request)).is_err() {
			return Err(CdpError::Closed);
		}

		rx.await.map_err(|_| CdpError::Closed)?
	}

	pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
		self.events.subscribe()
	}

	/// Cancelled once the socket has ended.
	pub fn closed(&self) -> CancellationToken {
		self.closed.clone()
	}

	fn dispatch(&self, text: &str) {
		let incoming: Incoming = match serde_json::from_str(text) {
			Ok(incoming) => incoming,
			Err(e) => {
				error!(error = %e, "unparseable CDP message");
				return;
			}
		};

		if let Some(id) = incoming.id {
			let Some(tx) = self.callbacks.lock().remove(&id) else {
				debug!(id, "CDP reply for unknown request");
				return;
			};
			let reply = match incoming.error {
				Some(err) => Err(CdpError::Protocol {
					code: err.code,
					message: err.message,
				}),
				None => Ok(incoming.result.unwrap_or(Value::Null)),
			};
			let _ = tx.send(reply);
		} else if let Some(method) = incoming.method {
			trace!(%method, "CDP event");
			let _ = self.events.send(CdpEvent {
				method,
				params: incoming.params,
				session_id: incoming.session_id,
			});
		}
	}

	fn shutdown(&self) {
		debug!("CDP websocket closed");
		self.closed.cancel();
		let pending: Vec<_> = self.callbacks.lock().drain().collect();
		for (_, tx) in pending {
			let _ = tx.send(Err(CdpError::Closed));
		}
	}
}

#[cfg(test)]
impl CdpConnection {
	/// A connection with no socket; requests are captured on the returned receiver.
	pub(crate) fn detached() -> (Arc<Self>, mpsc::UnboundedReceiver<Message>) {
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		let conn = Arc::new(Self {
			last_id: AtomicU64::new(0),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			outbound_tx,
			events,
			closed: CancellationToken::new(),
		});
		(conn, outbound_rx)
	}

	pub(crate) fn inject(&self, text: &str) {
		self.dispatch(text);
	}

	pub(crate) fn hang_up(&self) {
		self.shutdown();
	}
}

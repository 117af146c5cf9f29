//! Awaitable view of a handle's lifecycle events.
//!
//! The load-wait and every step of the injection race against the surface
//! closing. Observing a close cancels the shared token, so whichever side
//! resolves first stops the other.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_util::sync::CancellationToken;

use super::state::InvalidTransition;
use crate::browser::{BrowserError, LifecycleEvent};

/// Why an injection run stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Interrupt {
	/// The surface closed or the run was cancelled.
	Closed,
	/// A step failed; the message names the step.
	Failed(String),
}

impl From<InvalidTransition> for Interrupt {
	fn from(err: InvalidTransition) -> Self {
		Self::Failed(err.to_string())
	}
}

pub(crate) struct LifecycleMonitor {
	events: broadcast::Receiver<LifecycleEvent>,
	cancel: CancellationToken,
	step_timeout: Duration,
	loaded: bool,
}

impl LifecycleMonitor {
	pub(crate) fn new(
		events: broadcast::Receiver<LifecycleEvent>,
		cancel: CancellationToken,
		step_timeout: Duration,
	) -> Self {
		Self {
			events,
			cancel,
			step_timeout,
			loaded: false,
		}
	}

	/// Drains queued events and reports whether the surface has closed.
	pub(crate) fn poll_closed(&mut self) -> bool {
		loop {
			match self.events.try_recv() {
				Ok(event) => self.observe(event),
				Err(TryRecvError::Lagged(n)) => {
					tracing::warn!(dropped = n, "lifecycle receiver lagged");
				}
				Err(TryRecvError::Closed) => {
					self.cancel.cancel();
					break;
				}
				Err(TryRecvError::Empty) => break,
			}
		}
		self.cancel.is_cancelled()
	}

	/// Forgets any load seen so far. Called right before navigating so a
	/// load of the blank surface is not mistaken for the landing page.
	pub(crate) fn reset_load(&mut self) {
		self.poll_closed();
		self.loaded = false;
	}

	/// Waits for the first `Loaded` event, or the surface closing.
	pub(crate) async fn loaded(&mut self, timeout: Duration) -> Result<(), Interrupt> {
		if self.poll_closed() {
			return Err(Interrupt::Closed);
		}
		if self.loaded {
			return Ok(());
		}

		let deadline = tokio::time::sleep(timeout);
		tokio::pin!(deadline);

		loop {
			tokio::select! {
				biased;
				_ = self.cancel.cancelled() => return Err(Interrupt::Closed),
				event = self.events.recv() => {
					if self.received(event) {
						return Err(Interrupt::Closed);
					}
					if self.loaded {
						return Ok(());
					}
				}
				_ = &mut deadline => {
					return Err(Interrupt::Failed(format!(
						"page did not load within {}ms",
						timeout.as_millis()
					)));
				}
			}
		}
	}

	/// Runs one step against the surface unless it has closed, stopping early
	/// if it closes while the step is pending.
	pub(crate) async fn guard<T, F>(&mut self, step: &str, fut: F) -> Result<T, Interrupt>
	where
		F: Future<Output = Result<T, BrowserError>>,
	{
		if self.poll_closed() {
			return Err(Interrupt::Closed);
		}

		let deadline = tokio::time::sleep(self.step_timeout);
		tokio::pin!(deadline);
		tokio::pin!(fut);

		loop {
			tokio::select! {
				biased;
				_ = self.cancel.cancelled() => return Err(Interrupt::Closed),
				event = self.events.recv() => {
					if self.received(event) {
						return Err(Interrupt::Closed);
					}
				}
				result = &mut fut => {
					return result.map_err(|e| match e {
						BrowserError::Closed => {
							self.cancel.cancel();
							Interrupt::Closed
						}
						other => Interrupt::Failed(format!("{step}: {other}")),
					});
				}
				_ = &mut deadline => {
					return Err(Interrupt::Failed(format!(
						"{step}: no answer within {}ms",
						self.step_timeout.as_millis()
					)));
				}
			}
		}
	}

	fn observe(&mut self, event: LifecycleEvent) {
		match event {
			LifecycleEvent::Loaded => self.loaded = true,
			LifecycleEvent::Closed => self.cancel.cancel(),
		}
	}

	/// Handles one received event; returns `true` once the surface is closed.
	fn received(&mut self, event: Result<LifecycleEvent, RecvError>) -> bool {
		match event {
			Ok(event) => self.observe(event),
			Err(RecvError::Lagged(n)) => {
				tracing::warn!(dropped = n, "lifecycle receiver lagged");
			}
			Err(RecvError::Closed) => self.cancel.cancel(),
		}
		self.cancel.is_cancelled()
	}
}

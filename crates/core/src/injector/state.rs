//! Injection state machine.
//!
//! ```text
//! Idle -> Navigating -> WaitingForLoad -> Injecting -> Reloaded
//!            |               |               |
//!            +---------------+---------------+--> ClosedByUser | Failed
//! ```
//!
//! No state is re-entered; each hand-off builds a fresh machine.

use serde::Serialize;
use thiserror::Error;

/// States of one injection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionState {
	Idle,
	Navigating,
	WaitingForLoad,
	Injecting,
	Reloaded,
	ClosedByUser,
	Failed,
}

impl InjectionState {
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Reloaded | Self::ClosedByUser | Self::Failed)
	}

	/// Whether `next` may directly follow `self`.
	pub fn can_advance_to(self, next: Self) -> bool {
		use InjectionState::*;

		matches!(
			(self, next),
			(Idle, Navigating)
				| (Navigating, WaitingForLoad)
				| (WaitingForLoad, Injecting)
				| (Injecting, Reloaded)
				| (Navigating | WaitingForLoad | Injecting, ClosedByUser | Failed)
		)
	}
}

/// Rejected transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid injection transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
	pub from: InjectionState,
	pub to: InjectionState,
}

/// Tracks the current state and the path taken to reach it.
#[derive(Debug, Clone)]
pub struct InjectionMachine {
	history: Vec<InjectionState>,
}

impl Default for InjectionMachine {
	fn default() -> Self {
		Self::new()
	}
}

impl InjectionMachine {
	pub fn new() -> Self {
		Self {
			history: vec![InjectionState::Idle],
		}
	}

	pub fn current(&self) -> InjectionState {
		self.history.last().copied().unwrap_or(InjectionState::Idle)
	}

	pub fn advance(&mut self, to: InjectionState) -> Result<(), InvalidTransition> {
		let from = self.current();
		if !from.can_advance_to(to) {
			return Err(InvalidTransition { from, to });
		}
		tracing::trace!(?from, ?to, "injection state");
		self.history.push(to);
		Ok(())
	}

	pub fn history(&self) -> &[InjectionState] {
		&self.history
	}

	pub fn into_history(self) -> Vec<InjectionState> {
		self.history
	}
}

//! Wires retrieval, classification and injection behind the two screens.
//!
//! The trigger screen turns a link into a [`HandoffTransfer`]; the login
//! screen turns a transfer into session state in the embedded surface. Every
//! failure ends in a fixed view state; nothing is retried.

use handoff_protocol::{HandoffTransfer, SessionToken, TransferError};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::browser::BrowserHost;
use crate::classifier::{DomainClassifier, InjectionStrategy};
use crate::config::HandoffConfig;
use crate::error::{ErrorKind, HandoffError, Result};
use crate::injector::{InjectionOutcome, InjectionState, SessionInjector};
use crate::retriever::TokenRetriever;
use crate::ui::{ButtonState, ButtonView, LoginStatus};

/// How the login screen ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginReport {
	pub status: LoginStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub strategy: Option<InjectionStrategy>,
	/// Injection states visited, when the injector opened a surface.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub states: Vec<InjectionState>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorKind>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub detail: Option<String>,
}

impl LoginReport {
	fn new(status: LoginStatus) -> Self {
		Self {
			status,
			strategy: None,
			states: Vec::new(),
			error: None,
			detail: None,
		}
	}

	fn failed(status: LoginStatus, strategy: Option<InjectionStrategy>, err: &HandoffError) -> Self {
		Self {
			status,
			strategy,
			states: err.states().to_vec(),
			error: Some(err.kind()),
			detail: Some(err.to_string()),
		}
	}

	pub fn is_success(&self) -> bool {
		!self.status.is_failure()
	}
}

/// Both screens of one end-to-end hand-off.
#[derive(Debug, Clone)]
pub struct HandoffReport {
	pub button: ButtonState,
	/// Why the trigger screen failed.
	pub error: Option<ErrorKind>,
	pub detail: Option<String>,
	pub transfer: Option<HandoffTransfer>,
	/// Present once the trigger screen succeeded.
	pub login: Option<LoginReport>,
}

impl HandoffReport {
	pub fn is_success(&self) -> bool {
		self.button == ButtonState::Success && self.login.as_ref().is_some_and(LoginReport::is_success)
	}
}

/// Owns the trigger screen's state and drives hand-offs through a [`BrowserHost`].
pub struct Orchestrator<H> {
	retriever: TokenRetriever,
	classifier: DomainClassifier,
	injector: SessionInjector<H>,
	state: ButtonState,
}

impl<H: BrowserHost> Orchestrator<H> {
	pub fn new(config: HandoffConfig, host: H) -> Result<Self> {
		let retriever = TokenRetriever::new(&config)?;
		let classifier = DomainClassifier::new(&config);
		Ok(Self::from_parts(retriever, classifier, SessionInjector::new(host, config)))
	}

	pub fn from_parts(retriever: TokenRetriever, classifier: DomainClassifier, injector: SessionInjector<H>) -> Self {
		Self {
			retriever,
			classifier,
			injector,
			state: ButtonState::Default,
		}
	}

	pub fn state(&self) -> ButtonState {
		self.state
	}

	pub fn view(&self) -> ButtonView {
		self.state.view()
	}

	/// Trigger screen: fetches the token behind `link` and builds the transfer
	/// for the login screen.
	///
	/// The button state afterwards is `Success` or the state mapped from the
	/// returned error; the control is left enabled either way.
	pub async fn submit(&mut self, link: &str) -> Result<HandoffTransfer> {
		if link.trim().is_empty() {
			self.state = ButtonState::EmptyInput;
			return Err(HandoffError::EmptyInput);
		}

		self.state = ButtonState::Loading;
		let result = self.fetch_transfer(link.trim()).await;
		self.state = match &result {
			Ok(_) => ButtonState::Success,
			Err(e) => {
				warn!(kind = %e.kind(), error = %e, "hand-off submission failed");
				ButtonState::from_error(e)
			}
		};
		result
	}

	async fn fetch_transfer(&self, link: &str) -> Result<HandoffTransfer> {
		let token = self.retriever.retrieve(link).await?;
		SessionToken::parse(&token)?;
		// The destination is whatever host the submitted link names.
		let host = DomainClassifier::hostname(link)?;
		debug!(%host, "destination taken from submitted link");
		Ok(HandoffTransfer::new(host, token))
	}

	/// Login screen, from a transfer query string.
	pub async fn complete(&self, query: &str) -> LoginReport {
		self.complete_until(query, CancellationToken::new()).await
	}

	/// Like [`complete`](Self::complete); cancelling `cancel` counts as the
	/// user closing the surface.
	pub async fn complete_until(&self, query: &str, cancel: CancellationToken) -> LoginReport {
		match HandoffTransfer::from_query(query) {
			Ok(transfer) => self.complete_transfer(&transfer, cancel).await,
			Err(e) => {
				let err = HandoffError::from(e);
				warn!(error = %err, "login screen opened without a usable transfer");
				LoginReport::failed(LoginStatus::Incomplete, None, &err)
			}
		}
	}

	pub async fn complete_transfer(&self, transfer: &HandoffTransfer, cancel: CancellationToken) -> LoginReport {
		if transfer.domain.is_empty() || transfer.jwt.is_empty() {
			let err = HandoffError::from(TransferError::Incomplete);
			return LoginReport::failed(LoginStatus::Incomplete, None, &err);
		}

		let target = self.classifier.classify_host(&transfer.domain);
		let (preparing, failed) = match target.strategy {
			InjectionStrategy::Cookie => (LoginStatus::ApplyingCookies, LoginStatus::CookieFailed),
			InjectionStrategy::LocalStorage => (LoginStatus::ApplyingStorage, LoginStatus::StorageFailed),
			InjectionStrategy::Unsupported => {
				info!(host = %target.host, "no injection strategy for host");
				let err = HandoffError::UnsupportedDomain { host: target.host };
				return LoginReport::failed(LoginStatus::UnsupportedDomain, Some(target.strategy), &err);
			}
		};
		debug!(status = %preparing, strategy = ?target.strategy, "injecting session");

		match self.injector.inject_until(&transfer.jwt, &target, cancel).await {
			Ok(report) => {
				let status = match report.outcome {
					InjectionOutcome::Reloaded => LoginStatus::Succeeded,
					InjectionOutcome::ClosedByUser => LoginStatus::Closed,
				};
				LoginReport {
					strategy: Some(target.strategy),
					states: report.states,
					..LoginReport::new(status)
				}
			}
			Err(err @ HandoffError::InvalidPayload(_)) => {
				LoginReport::failed(LoginStatus::InvalidToken, Some(target.strategy), &err)
			}
			Err(err) => LoginReport::failed(failed, Some(target.strategy), &err),
		}
	}

	/// Runs both screens for `link`.
	pub async fn run(&mut self, link: &str, cancel: CancellationToken) -> HandoffReport {
		match self.submit(link).await {
			Ok(transfer) => {
				let login = self.complete_transfer(&transfer, cancel).await;
				HandoffReport {
					button: self.state,
					error: None,
					detail: None,
					transfer: Some(transfer),
					login: Some(login),
				}
			}
			Err(e) => HandoffReport {
				button: self.state,
				error: Some(e.kind()),
				detail: Some(e.to_string()),
				transfer: None,
				login: None,
			},
		}
	}
}

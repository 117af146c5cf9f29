//! [`SessionInjector`]: materializes a token as session state in the embedded page.
//!
//! One run opens a surface, navigates it to the strategy's landing page, waits
//! for the first load, clears stale state, writes the new state one statement
//! at a time and reloads. A close at any point ends the run as
//! [`InjectionOutcome::ClosedByUser`].

mod lifecycle;
pub mod scripts;
mod state;
pub mod sweep;

use chrono::{DateTime, TimeDelta, Utc};
use handoff_protocol::{CookieRecord, SameSite, SessionToken, cookie_names};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use self::lifecycle::{Interrupt, LifecycleMonitor};
use self::scripts::CookieSnapshot;
pub use self::state::{InjectionMachine, InjectionState, InvalidTransition};
use crate::browser::{BrowserHandle, BrowserHost};
use crate::classifier::{Classification, InjectionStrategy};
use crate::config::{HandoffConfig, SiteConfig};
use crate::error::{HandoffError, Result};

/// Local-storage keys removed before the token is written.
pub const CLEARED_STORAGE_KEYS: [&str; 2] = ["state", "user-info"];
/// Local-storage key holding the raw token.
pub const TOKEN_STORAGE_KEY: &str = "JWT";
/// Cookie marking the session as a regular membership.
pub const MEMBERSHIP_COOKIE: (&str, &str) = ("UserMembership", "0");

/// How a completed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionOutcome {
	/// State written and reload issued.
	Reloaded,
	/// The surface closed before the run finished.
	ClosedByUser,
}

/// Result of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectionReport {
	pub outcome: InjectionOutcome,
	/// States visited, starting at [`InjectionState::Idle`].
	pub states: Vec<InjectionState>,
}

/// Drives a [`BrowserHost`] through one injection per call.
pub struct SessionInjector<H> {
	host: H,
	config: HandoffConfig,
	now: fn() -> DateTime<Utc>,
}

impl<H: BrowserHost> SessionInjector<H> {
	pub fn new(host: H, config: HandoffConfig) -> Self {
		Self {
			host,
			config,
			now: Utc::now,
		}
	}

	/// Replaces the clock used to compute cookie expiry.
	pub fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
		self.now = now;
		self
	}

	/// Injects `token` for `target`.
	///
	/// See [`inject_until`](Self::inject_until).
	pub async fn inject(&self, token: &str, target: &Classification) -> Result<InjectionReport> {
		self.inject_until(token, target, CancellationToken::new()).await
	}

	/// Injects `token` for `target`, treating `cancel` like the user closing
	/// the surface.
	///
	/// # Errors
	///
	/// - [`HandoffError::InvalidPayload`] when `token` is not a JSON object;
	///   no surface is opened
	/// - [`HandoffError::UnsupportedDomain`] for an unsupported target; no
	///   surface is opened
	/// - [`HandoffError::Injection`] when opening, loading or any write fails
	pub async fn inject_until(
		&self,
		token: &str,
		target: &Classification,
		cancel: CancellationToken,
	) -> Result<InjectionReport> {
		let session = SessionToken::parse(token)?;
		let site = match target.strategy {
			InjectionStrategy::Cookie => &self.config.cookie_site,
			InjectionStrategy::LocalStorage => &self.config.storage_site,
			InjectionStrategy::Unsupported => {
				return Err(HandoffError::UnsupportedDomain {
					host: target.host.clone(),
				});
			}
		};

		let mut machine = InjectionMachine::new();
		machine
			.advance(InjectionState::Navigating)
			.map_err(|e| transition_error(e, &machine))?;

		let result = match self.host.open().await {
			Ok(handle) => {
				let monitor = LifecycleMonitor::new(handle.events(), cancel.child_token(), self.config.script_timeout());
				self.drive(&handle, monitor, &mut machine, &session, site, target.strategy).await
			}
			Err(e) => Err(Interrupt::Failed(e.to_string())),
		};

		match result {
			Ok(()) => {
				machine
					.advance(InjectionState::Reloaded)
					.map_err(|e| transition_error(e, &machine))?;
				info!(strategy = ?target.strategy, host = %target.host, "session injected");
				Ok(InjectionReport {
					outcome: InjectionOutcome::Reloaded,
					states: machine.into_history(),
				})
			}
			Err(Interrupt::Closed) => {
				machine
					.advance(InjectionState::ClosedByUser)
					.map_err(|e| transition_error(e, &machine))?;
				info!(host = %target.host, "embedded surface closed by user");
				Ok(InjectionReport {
					outcome: InjectionOutcome::ClosedByUser,
					states: machine.into_history(),
				})
			}
			Err(Interrupt::Failed(reason)) => {
				machine
					.advance(InjectionState::Failed)
					.map_err(|e| transition_error(e, &machine))?;
				warn!(strategy = ?target.strategy, %reason, "session injection failed");
				Err(HandoffError::Injection {
					reason,
					states: machine.into_history(),
				})
			}
		}
	}

	async fn drive<B: BrowserHandle>(
		&self,
		handle: &B,
		mut monitor: LifecycleMonitor,
		machine: &mut InjectionMachine,
		session: &SessionToken,
		site: &SiteConfig,
		strategy: InjectionStrategy,
	) -> std::result::Result<(), Interrupt> {
		monitor.reset_load();
		debug!(url = %site.landing_url, options = %self.config.navigate.to_host_string(), "opening landing page");
		monitor
			.guard("navigate", handle.navigate(&site.landing_url, &self.config.navigate))
			.await?;

		machine.advance(InjectionState::WaitingForLoad)?;
		monitor.loaded(self.config.load_timeout()).await?;

		machine.advance(InjectionState::Injecting)?;
		match strategy {
			InjectionStrategy::LocalStorage => self.write_storage(handle, &mut monitor, session).await?,
			InjectionStrategy::Cookie | InjectionStrategy::Unsupported => {
				self.write_cookies(handle, &mut monitor, session, site).await?
			}
		}

		monitor.guard("reload", handle.run_script(scripts::RELOAD_JS)).await?;
		Ok(())
	}

	async fn write_cookies<B: BrowserHandle>(
		&self,
		handle: &B,
		monitor: &mut LifecycleMonitor,
		session: &SessionToken,
		site: &SiteConfig,
	) -> std::result::Result<(), Interrupt> {
		let snapshot = monitor
			.guard("read cookies", handle.run_script(scripts::COOKIE_SNAPSHOT_JS))
			.await
			.map(CookieSnapshot::from_value)?;

		let names = cookie_names(&snapshot.cookie);
		let host = if snapshot.hostname.is_empty() {
			site.domain.as_str()
		} else {
			snapshot.hostname.as_str()
		};
		let parent = sweep::parent_domain(&site.domain);
		let mut scopes = vec![site.domain.as_str()];
		scopes.extend(parent.as_deref());

		let directives = sweep::plan(&names, host, &snapshot.pathname, &scopes);
		debug!(cookies = names.len(), directives = directives.len(), "sweeping existing cookies");
		if !directives.is_empty() {
			monitor
				.guard("clear cookies", handle.run_script(&scripts::expire_cookies_js(&directives)))
				.await?;
		}

		let expires = expiry((self.now)(), session.ttl_secs(self.config.default_ttl_secs));
		for cookie in session_cookies(session, &site.domain, expires) {
			let step = format!("write cookie {}", cookie.name);
			monitor.guard(&step, handle.run_script(&scripts::set_cookie_js(&cookie))).await?;
		}
		Ok(())
	}

	async fn write_storage<B: BrowserHandle>(
		&self,
		handle: &B,
		monitor: &mut LifecycleMonitor,
		session: &SessionToken,
	) -> std::result::Result<(), Interrupt> {
		monitor
			.guard(
				"clear local storage",
				handle.run_script(&scripts::remove_storage_keys_js(&CLEARED_STORAGE_KEYS)),
			)
			.await?;
		monitor
			.guard(
				"store token",
				handle.run_script(&scripts::set_storage_item_js(TOKEN_STORAGE_KEY, session.raw())),
			)
			.await?;
		Ok(())
	}
}

/// The five cookies carrying `session`, in write order.
pub fn session_cookies(session: &SessionToken, domain: &str, expires: DateTime<Utc>) -> Vec<CookieRecord> {
	[
		("jwt-access_token", session.access_token()),
		("jwt-token_type", session.token_type()),
		("jwt-refresh_token", session.refresh_token()),
		("jwt-expires_in", session.expires_in()),
		MEMBERSHIP_COOKIE,
	]
	.into_iter()
	.map(|(name, value)| {
		CookieRecord::new(name, value, domain)
			.path("/")
			.expires(expires)
			.same_site(SameSite::Lax)
			.secure(true)
	})
	.collect()
}

/// `now + ttl_secs`, saturating at the latest representable instant.
pub fn expiry(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
	i64::try_from(ttl_secs)
		.ok()
		.and_then(TimeDelta::try_seconds)
		.and_then(|ttl| now.checked_add_signed(ttl))
		.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn transition_error(err: InvalidTransition, machine: &InjectionMachine) -> HandoffError {
	HandoffError::Injection {
		reason: err.to_string(),
		states: machine.history().to_vec(),
	}
}

#[cfg(test)]
mod tests {
	use chrono::TimeZone;

	use super::*;

	#[test]
	fn expiry_adds_ttl() {
		let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
		assert_eq!(expiry(now, 3600), Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap());
	}

	#[test]
	fn expiry_saturates_on_absurd_ttl() {
		let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
		assert_eq!(expiry(now, u64::MAX), DateTime::<Utc>::MAX_UTC);
	}

	#[test]
	fn session_cookies_follow_fixed_order() {
		let session = SessionToken::parse(
			r#"{"access_token":"A","token_type":"Bearer","refresh_token":"R","expires_in":60}"#,
		)
		.unwrap();
		let expires = Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap();
		let cookies = session_cookies(&session, "m.snappfood.ir", expires);

		let pairs: Vec<(&str, &str)> = cookies.iter().map(|c| (c.name.as_str(), c.value.as_str())).collect();
		assert_eq!(
			pairs,
			vec![
				("jwt-access_token", "A"),
				("jwt-token_type", "Bearer"),
				("jwt-refresh_token", "R"),
				("jwt-expires_in", "60"),
				("UserMembership", "0"),
			]
		);
		assert!(cookies.iter().all(|c| c.secure && c.path == "/" && c.domain == "m.snappfood.ir"));
	}

	mod flows {
		use chrono::TimeZone;

		use super::super::*;
		use crate::classifier::DomainClassifier;
		use crate::testing::{BrowserCall, RecordingBrowser};

		const TOKEN: &str = r#"{"access_token":"T","token_type":"Bearer","refresh_token":"R","expires_in":60}"#;

		fn fixed_now() -> DateTime<Utc> {
			Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
		}

		fn injector(host: RecordingBrowser, config: HandoffConfig) -> SessionInjector<RecordingBrowser> {
			SessionInjector::new(host, config).with_clock(fixed_now)
		}

		fn target(host: &str) -> Classification {
			DomainClassifier::new(&HandoffConfig::default()).classify_host(host)
		}

		#[tokio::test]
		async fn cookie_flow_writes_five_cookies_then_reloads() {
			let host = RecordingBrowser::new();
			let report = injector(host.clone(), HandoffConfig::default())
				.inject(TOKEN, &target("m.snappfood.ir"))
				.await
				.unwrap();

			assert_eq!(report.outcome, InjectionOutcome::Reloaded);
			assert_eq!(
				report.states,
				vec![
					InjectionState::Idle,
					InjectionState::Navigating,
					InjectionState::WaitingForLoad,
					InjectionState::Injecting,
					InjectionState::Reloaded,
				]
			);

			let calls = host.calls();
			assert_eq!(calls[0], BrowserCall::Open);
			assert!(matches!(&calls[1], BrowserCall::Navigate { url, .. } if url == "https://m.snappfood.ir/"));

			let scripts = host.scripts();
			assert_eq!(scripts.len(), 7, "snapshot, five cookies, reload");
			assert_eq!(scripts[0], scripts::COOKIE_SNAPSHOT_JS);
			for (script, name) in scripts[1..6].iter().zip([
				"jwt-access_token=T;",
				"jwt-token_type=Bearer;",
				"jwt-refresh_token=R;",
				"jwt-expires_in=60;",
				"UserMembership=0;",
			]) {
				assert!(script.contains(name), "{script}");
				assert!(script.contains("path=/; domain=m.snappfood.ir"), "{script}");
				assert!(script.contains("expires=Mon, 01 Jan 2024 00:01:00 GMT"), "{script}");
			}
			assert_eq!(scripts[6], scripts::RELOAD_JS);
		}

		#[tokio::test]
		async fn cookie_flow_sweeps_existing_cookies_first() {
			let host = RecordingBrowser::new().with_page("old=1; jwt-access_token=x", "m.snappfood.ir", "/a");
			injector(host.clone(), HandoffConfig::default())
				.inject(TOKEN, &target("m.snappfood.ir"))
				.await
				.unwrap();

			let scripts = host.scripts();
			assert_eq!(scripts.len(), 8);
			let sweep = &scripts[1];
			assert!(sweep.contains("old=; expires=Thu, 01 Jan 1970 00:00:00 GMT; domain=m.snappfood.ir; path=/a"), "{sweep}");
			assert!(sweep.contains("jwt-access_token=; expires=Thu, 01 Jan 1970 00:00:00 GMT; domain=ir; path=/"), "{sweep}");
			assert!(scripts[2].contains("jwt-access_token=T;"));
		}

		#[tokio::test]
		async fn storage_flow_clears_then_stores_raw_token() {
			let host = RecordingBrowser::new();
			let report = injector(host.clone(), HandoffConfig::default())
				.inject(TOKEN, &target("food.snapp.ir"))
				.await
				.unwrap();

			assert_eq!(report.outcome, InjectionOutcome::Reloaded);
			assert!(matches!(&host.calls()[1], BrowserCall::Navigate { url, .. } if url == "https://food.snapp.ir/"));
			assert_eq!(
				host.scripts(),
				vec![
					scripts::remove_storage_keys_js(&["state", "user-info"]),
					scripts::set_storage_item_js("JWT", TOKEN),
					scripts::RELOAD_JS.to_string(),
				]
			);
		}

		#[tokio::test]
		async fn close_stops_further_writes() {
			let host = RecordingBrowser::new().close_after_scripts(2);
			let report = injector(host.clone(), HandoffConfig::default())
				.inject(TOKEN, &target("m.snappfood.ir"))
				.await
				.unwrap();

			assert_eq!(report.outcome, InjectionOutcome::ClosedByUser);
			assert_eq!(report.states.last(), Some(&InjectionState::ClosedByUser));
			assert_eq!(host.scripts().len(), 2);
		}

		#[tokio::test]
		async fn cancelled_run_never_navigates() {
			let host = RecordingBrowser::new();
			let cancel = CancellationToken::new();
			cancel.cancel();

			let report = injector(host.clone(), HandoffConfig::default())
				.inject_until(TOKEN, &target("food.snapp.ir"), cancel)
				.await
				.unwrap();

			assert_eq!(report.outcome, InjectionOutcome::ClosedByUser);
			assert_eq!(host.calls(), vec![BrowserCall::Open]);
		}

		#[tokio::test]
		async fn failed_write_names_the_cookie() {
			let host = RecordingBrowser::new().fail_scripts_containing("jwt-refresh_token=R");
			let err = injector(host.clone(), HandoffConfig::default())
				.inject(TOKEN, &target("m.snappfood.ir"))
				.await
				.unwrap_err();

			match err {
				HandoffError::Injection { reason, states } => {
					assert!(reason.contains("write cookie jwt-refresh_token"), "{reason}");
					assert_eq!(
						states,
						vec![
							InjectionState::Idle,
							InjectionState::Navigating,
							InjectionState::WaitingForLoad,
							InjectionState::Injecting,
							InjectionState::Failed,
						]
					);
				}
				other => panic!("unexpected error: {other}"),
			}
			assert!(!host.scripts().iter().any(|s| s == scripts::RELOAD_JS));
		}

		#[tokio::test]
		async fn missing_load_times_out() {
			let config = HandoffConfig {
				load_timeout_ms: 20,
				..HandoffConfig::default()
			};
			let host = RecordingBrowser::new().without_load();
			let err = injector(host.clone(), config)
				.inject(TOKEN, &target("food.snapp.ir"))
				.await
				.unwrap_err();

			assert!(matches!(err, HandoffError::Injection { ref reason, .. } if reason.contains("did not load")));
			assert_eq!(
				err.states(),
				[
					InjectionState::Idle,
					InjectionState::Navigating,
					InjectionState::WaitingForLoad,
					InjectionState::Failed,
				]
			);
			assert!(host.scripts().is_empty());
		}

		#[tokio::test]
		async fn close_while_waiting_for_load_ends_the_run() {
			let host = RecordingBrowser::new().without_load();
			let closer = host.clone();
			tokio::spawn(async move {
				tokio::time::sleep(std::time::Duration::from_millis(30)).await;
				closer.emit(crate::browser::LifecycleEvent::Closed);
			});

			let report = injector(host.clone(), HandoffConfig::default())
				.inject(TOKEN, &target("m.snappfood.ir"))
				.await
				.unwrap();

			assert_eq!(report.outcome, InjectionOutcome::ClosedByUser);
			assert_eq!(
				report.states,
				vec![
					InjectionState::Idle,
					InjectionState::Navigating,
					InjectionState::WaitingForLoad,
					InjectionState::ClosedByUser,
				]
			);
			assert!(host.scripts().is_empty());
			assert!(host.is_closed());
		}

		#[tokio::test]
		async fn open_failure_is_an_injection_error() {
			let host = RecordingBrowser::new().fail_open();
			let err = injector(host, HandoffConfig::default())
				.inject(TOKEN, &target("food.snapp.ir"))
				.await
				.unwrap_err();
			assert!(matches!(err, HandoffError::Injection { .. }));
			assert_eq!(err.states(), [InjectionState::Idle, InjectionState::Navigating, InjectionState::Failed]);
		}

		#[tokio::test]
		async fn bad_payload_and_unsupported_host_never_open() {
			let host = RecordingBrowser::new();
			let inj = injector(host.clone(), HandoffConfig::default());

			let err = inj.inject("not json", &target("m.snappfood.ir")).await.unwrap_err();
			assert!(matches!(err, HandoffError::InvalidPayload(_)));

			let err = inj.inject(TOKEN, &target("example.com")).await.unwrap_err();
			assert!(matches!(err, HandoffError::UnsupportedDomain { ref host } if host == "example.com"));

			assert!(host.calls().is_empty());
		}
	}
}

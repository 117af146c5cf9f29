//! Hostname classification into an injection strategy.

use serde::Serialize;
use url::Url;

use crate::config::HandoffConfig;
use crate::error::{HandoffError, Result};

/// How session state is materialized for a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionStrategy {
	/// Write `jwt-*` cookies.
	Cookie,
	/// Write the raw token to local storage.
	LocalStorage,
	/// No supported destination. Terminal; nothing is injected.
	Unsupported,
}

/// A hostname and the strategy chosen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
	pub host: String,
	pub strategy: InjectionStrategy,
}

/// Selects an [`InjectionStrategy`] by hostname substring, first match wins.
#[derive(Debug, Clone)]
pub struct DomainClassifier {
	cookie_domain: String,
	storage_domain: String,
}

impl DomainClassifier {
	pub fn new(config: &HandoffConfig) -> Self {
		Self {
			cookie_domain: config.cookie_site.domain.clone(),
			storage_domain: config.storage_site.domain.clone(),
		}
	}

	/// Extracts the host from `link`.
	///
	/// # Errors
	///
	/// [`HandoffError::MalformedLink`] when `link` does not parse as a URL or
	/// the URL has no host.
	pub fn hostname(link: &str) -> Result<String> {
		let link = link.trim();
		let url = Url::parse(link).map_err(|e| HandoffError::malformed(link, Some(e)))?;
		match url.host_str() {
			Some(host) if !host.is_empty() => Ok(host.to_string()),
			_ => Err(HandoffError::malformed(link, None)),
		}
	}

	pub fn classify_host(&self, host: &str) -> Classification {
		let strategy = if host.contains(&self.cookie_domain) {
			InjectionStrategy::Cookie
		} else if host.contains(&self.storage_domain) {
			InjectionStrategy::LocalStorage
		} else {
			InjectionStrategy::Unsupported
		};

		Classification {
			host: host.to_string(),
			strategy,
		}
	}

	pub fn classify_link(&self, link: &str) -> Result<Classification> {
		let host = Self::hostname(link)?;
		Ok(self.classify_host(&host))
	}
}

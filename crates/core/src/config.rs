//! Hand-off configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::browser::NavigateOptions;

/// Hostname identifier selecting the cookie strategy.
pub const COOKIE_DOMAIN: &str = "m.snappfood.ir";
/// Landing page opened for the cookie strategy.
pub const COOKIE_LANDING_URL: &str = "https://m.snappfood.ir/";
/// Hostname identifier selecting the local-storage strategy.
pub const STORAGE_DOMAIN: &str = "food.snapp.ir";
/// Landing page opened for the local-storage strategy.
pub const STORAGE_LANDING_URL: &str = "https://food.snapp.ir/";
/// Cookie lifetime when the token carries no usable `expires_in`.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// One supported destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
	/// Identifier matched against hostnames; also the cookie domain.
	pub domain: String,
	/// Page the embedded browser opens before injecting.
	pub landing_url: String,
}

impl SiteConfig {
	pub fn new(domain: impl Into<String>, landing_url: impl Into<String>) -> Self {
		Self {
			domain: domain.into(),
			landing_url: landing_url.into(),
		}
	}
}

/// Fully owned hand-off configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
	/// Destination using cookies. Checked first.
	pub cookie_site: SiteConfig,
	/// Destination using local storage.
	pub storage_site: SiteConfig,
	/// Cookie lifetime when the token has no usable `expires_in`.
	pub default_ttl_secs: u64,
	/// Bound on the token request, connect through body.
	pub fetch_timeout_ms: u64,
	/// Bound on waiting for the landing page to load.
	pub load_timeout_ms: u64,
	/// Bound on each navigation or script call into the embedded surface.
	pub script_timeout_ms: u64,
	/// Options applied when opening the landing page.
	pub navigate: NavigateOptions,
}

impl Default for HandoffConfig {
	fn default() -> Self {
		Self {
			cookie_site: SiteConfig::new(COOKIE_DOMAIN, COOKIE_LANDING_URL),
			storage_site: SiteConfig::new(STORAGE_DOMAIN, STORAGE_LANDING_URL),
			default_ttl_secs: DEFAULT_TTL_SECS,
			fetch_timeout_ms: 30_000,
			load_timeout_ms: 60_000,
			script_timeout_ms: 15_000,
			navigate: NavigateOptions::default(),
		}
	}
}

impl HandoffConfig {
	/// Parses a config from JSON.
	pub fn from_json(json: &str) -> serde_json::Result<Self> {
		serde_json::from_str(json)
	}

	/// Loads a config from a JSON file.
	pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
		let content = std::fs::read_to_string(path)?;
		Self::from_json(&content).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
	}

	pub fn fetch_timeout(&self) -> Duration {
		Duration::from_millis(self.fetch_timeout_ms)
	}

	pub fn load_timeout(&self) -> Duration {
		Duration::from_millis(self.load_timeout_ms)
	}

	pub fn script_timeout(&self) -> Duration {
		Duration::from_millis(self.script_timeout_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_object_yields_defaults() {
		let cfg = HandoffConfig::from_json("{}").unwrap();
		assert_eq!(cfg, HandoffConfig::default());
		assert_eq!(cfg.cookie_site.domain, "m.snappfood.ir");
		assert_eq!(cfg.storage_site.landing_url, "https://food.snapp.ir/");
		assert_eq!(cfg.default_ttl_secs, 3600);
	}

	#[test]
	fn partial_override_keeps_other_defaults() {
		let cfg = HandoffConfig::from_json(
			r#"{"load_timeout_ms": 500, "storage_site": {"domain": "food.test", "landing_url": "http://food.test/"}}"#,
		)
		.unwrap();
		assert_eq!(cfg.load_timeout(), Duration::from_millis(500));
		assert_eq!(cfg.storage_site.domain, "food.test");
		assert_eq!(cfg.cookie_site.domain, COOKIE_DOMAIN);
		assert!(cfg.navigate.clear_cache);
	}

	#[test]
	fn from_file_reports_invalid_json_as_invalid_data() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("bad.json");
		std::fs::write(&path, "{not json").unwrap();

		let err = HandoffConfig::from_file(&path).unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
	}
}

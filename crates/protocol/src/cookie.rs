//! Cookie records written into the embedded page through `document.cookie`.
//!
//! The embedded surface offers no cookie API, so every cookie is materialized
//! as the string a page script would assign to `document.cookie`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// HTTP-date in the past, used to expire cookies.
pub const EXPIRED_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// SameSite cookie attribute.
///
/// Controls when cookies are sent with cross-site requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
	/// Cookie is sent with same-site and cross-site requests
	#[serde(rename = "None")]
	None,
	/// Cookie is sent with same-site requests and cross-site top-level navigations
	#[default]
	#[serde(rename = "Lax")]
	Lax,
	/// Cookie is only sent with same-site requests
	#[serde(rename = "Strict")]
	Strict,
}

impl std::fmt::Display for SameSite {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::None => write!(f, "None"),
			Self::Lax => write!(f, "Lax"),
			Self::Strict => write!(f, "Strict"),
		}
	}
}

/// A cookie to be set from page script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
	/// Cookie name
	pub name: String,

	/// Cookie value, written as-is
	pub value: String,

	/// Domain attribute
	pub domain: String,

	/// Path attribute
	pub path: String,

	/// Absolute expiry
	pub expires: DateTime<Utc>,

	/// SameSite attribute
	pub same_site: SameSite,

	/// Whether the cookie requires HTTPS
	pub secure: bool,
}

impl CookieRecord {
	/// Creates a cookie scoped to `domain` with path `/`, `Lax` and no expiry
	/// beyond the epoch. Set [`expires`](Self::expires) before writing it.
	pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: domain.into(),
			path: "/".to_string(),
			expires: DateTime::<Utc>::UNIX_EPOCH,
			same_site: SameSite::Lax,
			secure: false,
		}
	}

	/// Sets the path for the cookie.
	pub fn path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();
		self
	}

	/// Sets the expiry.
	pub fn expires(mut self, expires: DateTime<Utc>) -> Self {
		self.expires = expires;
		self
	}

	/// Sets the SameSite attribute.
	pub fn same_site(mut self, same_site: SameSite) -> Self {
		self.same_site = same_site;
		self
	}

	/// Sets whether the cookie requires HTTPS.
	pub fn secure(mut self, secure: bool) -> Self {
		self.secure = secure;
		self
	}

	/// Renders the `document.cookie` assignment value.
	pub fn to_document_cookie(&self) -> String {
		let mut out = format!(
			"{}={}; path={}; domain={}; expires={}; SameSite={}",
			self.name,
			self.value,
			self.path,
			self.domain,
			http_date(self.expires),
			self.same_site
		);
		if self.secure {
			out.push_str("; secure");
		}
		out
	}
}

/// Formats `at` as an HTTP-date (`Thu, 01 Jan 1970 00:00:00 GMT`).
pub fn http_date(at: DateTime<Utc>) -> String {
	at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Renders the assignment that expires cookie `name` in one domain/path scope.
pub fn expire_directive(name: &str, domain: &str, path: &str) -> String {
	format!("{name}=; expires={EXPIRED_DATE}; domain={domain}; path={path}")
}

/// Extracts cookie names from a `document.cookie` string.
///
/// Names are returned in order of first appearance without duplicates.
pub fn cookie_names(header: &str) -> Vec<String> {
	let mut names: Vec<String> = Vec::new();
	for pair in header.split(';') {
		let name = pair.split('=').next().unwrap_or_default().trim();
		if !name.is_empty() && !names.iter().any(|n| n == name) {
			names.push(name.to_string());
		}
	}
	names
}

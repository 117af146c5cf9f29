//! Token endpoint body and the session token it carries.
//!
//! The endpoint answers with a JSON document whose `JWT` field holds another
//! JSON document serialized as a string. The outer document is read by the
//! retriever, the inner one by the injector.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// JSON body returned by the token endpoint.
///
/// Only `JWT` is read. It is kept as a raw [`Value`] so a non-string field can
/// be told apart from a missing one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenDocument {
	#[serde(rename = "JWT", default, skip_serializing_if = "Option::is_none")]
	pub jwt: Option<Value>,
}

impl TokenDocument {
	/// Returns the token when `JWT` is a string with non-whitespace content.
	///
	/// The string is returned untrimmed.
	pub fn token(&self) -> Option<&str> {
		match &self.jwt {
			Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
			_ => None,
		}
	}
}

/// Errors raised while parsing a token string into a [`SessionToken`].
#[derive(Debug, Error)]
pub enum PayloadError {
	#[error("token is not valid JSON: {0}")]
	Json(#[from] serde_json::Error),

	#[error("token is JSON but not an object")]
	NotAnObject,
}

/// Session document parsed from the token string.
///
/// Field values keep their textual form so they can be copied verbatim into
/// cookies: strings as-is, numbers and booleans rendered, missing or `null`
/// fields as the empty string. The raw token string is retained for
/// local-storage writes, which store it unparsed.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
	raw: String,
	access_token: String,
	token_type: String,
	refresh_token: String,
	expires_in: String,
}

impl SessionToken {
	/// Parses `raw` as a JSON object.
	pub fn parse(raw: &str) -> Result<Self, PayloadError> {
		let value: Value = serde_json::from_str(raw)?;
		let Value::Object(fields) = value else {
			return Err(PayloadError::NotAnObject);
		};

		Ok(Self {
			raw: raw.to_string(),
			access_token: field_text(&fields, "access_token"),
			token_type: field_text(&fields, "token_type"),
			refresh_token: field_text(&fields, "refresh_token"),
			expires_in: field_text(&fields, "expires_in"),
		})
	}

	/// The token string exactly as retrieved.
	pub fn raw(&self) -> &str {
		&self.raw
	}

	pub fn access_token(&self) -> &str {
		&self.access_token
	}

	pub fn token_type(&self) -> &str {
		&self.token_type
	}

	pub fn refresh_token(&self) -> &str {
		&self.refresh_token
	}

	/// `expires_in` in its textual form.
	pub fn expires_in(&self) -> &str {
		&self.expires_in
	}

	/// `expires_in` as whole seconds, when it is a non-negative integer.
	pub fn expires_in_secs(&self) -> Option<u64> {
		self.expires_in.trim().parse().ok()
	}

	/// Lifetime to use for written state: `expires_in`, or `default_secs` when
	/// the field is missing, unparseable or zero.
	pub fn ttl_secs(&self, default_secs: u64) -> u64 {
		self.expires_in_secs().filter(|secs| *secs > 0).unwrap_or(default_secs)
	}
}

impl std::fmt::Debug for SessionToken {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionToken")
			.field("raw_len", &self.raw.len())
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.finish_non_exhaustive()
	}
}

fn field_text(fields: &Map<String, Value>, key: &str) -> String {
	match fields.get(key) {
		None | Some(Value::Null) => String::new(),
		Some(Value::String(s)) => s.clone(),
		Some(Value::Number(n)) => number_text(n),
		Some(other) => other.to_string(),
	}
}

/// Renders a number the way a page script would: integral values never carry
/// a fractional part, whatever their JSON spelling.
fn number_text(n: &Number) -> String {
	match n.as_f64() {
		Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f}"),
		_ => n.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn token_document_requires_non_blank_string() {
		let doc: TokenDocument = serde_json::from_str(r#"{"JWT": "abc"}"#).unwrap();
		assert_eq!(doc.token(), Some("abc"));

		let blank: TokenDocument = serde_json::from_str(r#"{"JWT": "   "}"#).unwrap();
		assert_eq!(blank.token(), None);

		let number: TokenDocument = serde_json::from_str(r#"{"JWT": 42}"#).unwrap();
		assert_eq!(number.token(), None);

		let missing: TokenDocument = serde_json::from_str(r#"{"jwt": "lowercase"}"#).unwrap();
		assert_eq!(missing.token(), None);
	}

	#[test]
	fn token_document_keeps_surrounding_whitespace() {
		let doc: TokenDocument = serde_json::from_str(r#"{"JWT": " abc "}"#).unwrap();
		assert_eq!(doc.token(), Some(" abc "));
	}

	#[test]
	fn session_token_copies_fields_verbatim() {
		let raw = r#"{"access_token":"A","token_type":"Bearer","refresh_token":"R","expires_in":1800}"#;
		let token = SessionToken::parse(raw).unwrap();

		assert_eq!(token.raw(), raw);
		assert_eq!(token.access_token(), "A");
		assert_eq!(token.token_type(), "Bearer");
		assert_eq!(token.refresh_token(), "R");
		assert_eq!(token.expires_in(), "1800");
		assert_eq!(token.ttl_secs(3600), 1800);
	}

	#[test]
	fn session_token_defaults_ttl_when_expiry_missing_or_zero() {
		let missing = SessionToken::parse(r#"{"access_token":"A"}"#).unwrap();
		assert_eq!(missing.expires_in(), "");
		assert_eq!(missing.ttl_secs(3600), 3600);

		let zero = SessionToken::parse(r#"{"expires_in":0}"#).unwrap();
		assert_eq!(zero.ttl_secs(3600), 3600);

		let textual = SessionToken::parse(r#"{"expires_in":"120"}"#).unwrap();
		assert_eq!(textual.ttl_secs(3600), 120);

		let exponent = SessionToken::parse(r#"{"expires_in":1e3}"#).unwrap();
		assert_eq!(exponent.expires_in(), "1000");
		assert_eq!(exponent.ttl_secs(3600), 1000);

		let decimal = SessionToken::parse(r#"{"expires_in":1800.0}"#).unwrap();
		assert_eq!(decimal.expires_in(), "1800");
		assert_eq!(decimal.ttl_secs(3600), 1800);

		let fractional = SessionToken::parse(r#"{"expires_in":1.5}"#).unwrap();
		assert_eq!(fractional.expires_in(), "1.5");
		assert_eq!(fractional.ttl_secs(3600), 3600);
	}

	#[test]
	fn session_token_rejects_non_objects() {
		assert!(matches!(SessionToken::parse("not json"), Err(PayloadError::Json(_))));
		assert!(matches!(SessionToken::parse("[1,2]"), Err(PayloadError::NotAnObject)));
		assert!(matches!(SessionToken::parse(r#""str""#), Err(PayloadError::NotAnObject)));
	}

	#[test]
	fn session_token_debug_hides_secrets() {
		let token = SessionToken::parse(r#"{"access_token":"secret-value"}"#).unwrap();
		let debug = format!("{token:?}");
		assert!(!debug.contains("secret-value"));
	}
}

//! JavaScript injected into the embedded page.
//!
//! Every value that reaches a script is embedded as a JSON string literal,
//! which is also a valid JavaScript string literal, so values are written
//! byte for byte whatever quotes or backslashes they contain.

use handoff_protocol::CookieRecord;
use serde::Deserialize;
use serde_json::Value;

/// Reads what the sweep needs to know about the page's cookies.
pub const COOKIE_SNAPSHOT_JS: &str = r#"(() => ({
	cookie: document.cookie,
	hostname: location.hostname,
	pathname: location.pathname
}))()"#;

/// Reloads the page so it picks up the injected state.
pub const RELOAD_JS: &str = "location.reload();\ntrue;";

/// Result of [`COOKIE_SNAPSHOT_JS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CookieSnapshot {
	pub cookie: String,
	pub hostname: String,
	pub pathname: String,
}

impl CookieSnapshot {
	/// Reads a snapshot from a script result. Anything unexpected reads as an
	/// empty page, which sweeps nothing.
	pub fn from_value(value: Value) -> Self {
		serde_json::from_value(value).unwrap_or_default()
	}
}

/// Quotes `s` as a JavaScript string literal.
pub fn js_string(s: &str) -> String {
	Value::String(s.to_string()).to_string()
}

/// Assigns each directive to `document.cookie` in turn.
pub fn expire_cookies_js(directives: &[String]) -> String {
	let mut code = String::new();
	for directive in directives {
		code.push_str("document.cookie = ");
		code.push_str(&js_string(directive));
		code.push_str(";\n");
	}
	code.push_str("true;");
	code
}

/// Sets one cookie.
pub fn set_cookie_js(cookie: &CookieRecord) -> String {
	format!("document.cookie = {};\ntrue;", js_string(&cookie.to_document_cookie()))
}

/// Removes `keys` from local storage.
pub fn remove_storage_keys_js(keys: &[&str]) -> String {
	let mut code = String::new();
	for key in keys {
		code.push_str(&format!("localStorage.removeItem({});\n", js_string(key)));
	}
	code.push_str("true;");
	code
}

/// Stores `value` under `key` in local storage.
pub fn set_storage_item_js(key: &str, value: &str) -> String {
	format!("localStorage.setItem({}, {});\ntrue;", js_string(key), js_string(value))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn js_string_escapes_quotes_and_backslashes() {
		assert_eq!(js_string(r#"a"b\c"#), r#""a\"b\\c""#);
		assert_eq!(js_string("`${x}`"), r#""`${x}`""#);
	}

	#[test]
	fn storage_item_value_round_trips_through_literal() {
		let raw = r#"{"access_token":"T","nested":"\"q\""}"#;
		let code = set_storage_item_js("JWT", raw);
		let literal = code
			.strip_prefix(r#"localStorage.setItem("JWT", "#)
			.and_then(|rest| rest.strip_suffix(");\ntrue;"))
			.unwrap();
		let decoded: String = serde_json::from_str(literal).unwrap();
		assert_eq!(decoded, raw);
	}

	#[test]
	fn removal_script_lists_keys_in_order() {
		let code = remove_storage_keys_js(&["state", "user-info"]);
		assert_eq!(
			code,
			"localStorage.removeItem(\"state\");\nlocalStorage.removeItem(\"user-info\");\ntrue;"
		);
	}

	#[test]
	fn snapshot_tolerates_unexpected_results() {
		assert_eq!(CookieSnapshot::from_value(Value::Null), CookieSnapshot::default());
		let snapshot = CookieSnapshot::from_value(serde_json::json!({
			"cookie": "a=1",
			"hostname": "m.snappfood.ir",
		}));
		assert_eq!(snapshot.cookie, "a=1");
		assert_eq!(snapshot.pathname, "");
	}
}

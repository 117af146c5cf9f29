//! Query handed from the trigger screen to the login screen.
//!
//! The token is percent-encoded on its own (`encodeURIComponent` semantics)
//! and then form-encoded again as a query value, so it arrives intact whatever
//! characters the session document contains.

use thiserror::Error;
use url::form_urlencoded;

/// Relative location of the login screen.
pub const LOGIN_PAGE: &str = "login.html";

/// Errors raised while reading a transfer query.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
	/// `domain` or `jwt` is missing or empty.
	#[error("incomplete login information")]
	Incomplete,

	/// The `jwt` value does not decode to UTF-8.
	#[error("jwt parameter is not valid percent-encoding")]
	Encoding,
}

/// Destination hostname plus the token to inject there.
#[derive(Clone, PartialEq, Eq)]
pub struct HandoffTransfer {
	pub domain: String,
	pub jwt: String,
}

impl HandoffTransfer {
	pub fn new(domain: impl Into<String>, jwt: impl Into<String>) -> Self {
		Self {
			domain: domain.into(),
			jwt: jwt.into(),
		}
	}

	/// Encodes the transfer as `domain=…&jwt=…`.
	pub fn to_query(&self) -> String {
		form_urlencoded::Serializer::new(String::new())
			.append_pair("domain", &self.domain)
			.append_pair("jwt", &urlencoding::encode(&self.jwt))
			.finish()
	}

	/// Location of the login screen carrying this transfer.
	pub fn to_location(&self) -> String {
		format!("{LOGIN_PAGE}?{}", self.to_query())
	}

	/// Decodes a transfer from a query string or a full location.
	///
	/// Anything up to and including the first `?` is ignored. When a key
	/// repeats, the first occurrence wins.
	pub fn from_query(query: &str) -> Result<Self, TransferError> {
		let query = query.split_once('?').map_or(query, |(_, rest)| rest);

		let mut domain = None;
		let mut jwt = None;
		for (key, value) in form_urlencoded::parse(query.as_bytes()) {
			match key.as_ref() {
				"domain" if domain.is_none() => domain = Some(value.into_owned()),
				"jwt" if jwt.is_none() => jwt = Some(value.into_owned()),
				_ => {}
			}
		}

		let domain = domain.filter(|d| !d.is_empty()).ok_or(TransferError::Incomplete)?;
		let encoded = jwt.filter(|j| !j.is_empty()).ok_or(TransferError::Incomplete)?;
		let jwt = urlencoding::decode(&encoded)
			.map_err(|_| TransferError::Encoding)?
			.into_owned();

		Ok(Self { domain, jwt })
	}
}

impl std::fmt::Debug for HandoffTransfer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HandoffTransfer")
			.field("domain", &self.domain)
			.field("jwt_len", &self.jwt.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn query_survives_awkward_tokens() {
		let token = r#"{"access_token":"a&b=c","note":"سلام ?#%"}"#;
		let transfer = HandoffTransfer::new("m.snappfood.ir", token);

		let restored = HandoffTransfer::from_query(&transfer.to_query()).unwrap();
		assert_eq!(restored, transfer);
	}

	#[test]
	fn jwt_is_double_encoded_in_query() {
		let transfer = HandoffTransfer::new("food.snapp.ir", "a b");
		// "a b" -> encodeURIComponent "a%20b" -> form-encoded "a%2520b"
		assert_eq!(transfer.to_query(), "domain=food.snapp.ir&jwt=a%2520b");
	}

	#[test]
	fn location_prefix_is_ignored() {
		let transfer = HandoffTransfer::new("food.snapp.ir", "{}");
		let restored = HandoffTransfer::from_query(&transfer.to_location()).unwrap();
		assert_eq!(restored.domain, "food.snapp.ir");
		assert_eq!(restored.jwt, "{}");
	}

	#[test]
	fn missing_or_empty_fields_are_incomplete() {
		assert_eq!(HandoffTransfer::from_query("domain=a.ir"), Err(TransferError::Incomplete));
		assert_eq!(HandoffTransfer::from_query("jwt=abc"), Err(TransferError::Incomplete));
		assert_eq!(HandoffTransfer::from_query("domain=&jwt=abc"), Err(TransferError::Incomplete));
		assert_eq!(HandoffTransfer::from_query(""), Err(TransferError::Incomplete));
	}

	#[test]
	fn first_occurrence_wins() {
		let restored = HandoffTransfer::from_query("domain=a.ir&domain=b.ir&jwt=x").unwrap();
		assert_eq!(restored.domain, "a.ir");
	}
}

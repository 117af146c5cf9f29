//! Token retrieval from a user-supplied link.

use handoff_protocol::TokenDocument;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::HandoffConfig;
use crate::error::{HandoffError, Result};

const RAW_SEGMENT: &str = "/view/raw/";
const RENDERED_SEGMENT: &str = "/view/";

/// Fetches the token string from a link to a token document.
///
/// One GET per call, no retries.
#[derive(Debug, Clone)]
pub struct TokenRetriever {
	client: Client,
}

impl TokenRetriever {
	/// Builds a retriever whose requests are bounded by the configured fetch timeout.
	pub fn new(config: &HandoffConfig) -> Result<Self> {
		let client = Client::builder()
			.timeout(config.fetch_timeout())
			.build()
			.map_err(|e| HandoffError::Network(format!("failed to create HTTP client: {e}")))?;
		Ok(Self { client })
	}

	/// Parses `link` and rewrites a raw-content path to its rendered form.
	///
	/// Only the first `/view/raw/` in the path is rewritten.
	pub fn normalize(link: &str) -> Result<Url> {
		let mut url = Url::parse(link).map_err(|e| HandoffError::malformed(link, Some(e)))?;

		let path = url.path();
		if let Some(idx) = path.find(RAW_SEGMENT) {
			let rewritten = format!(
				"{}{}{}",
				&path[..idx],
				RENDERED_SEGMENT,
				&path[idx + RAW_SEGMENT.len()..]
			);
			url.set_path(&rewritten);
		}

		Ok(url)
	}

	/// Retrieves the `JWT` string from the document at `link`.
	///
	/// # Errors
	///
	/// - [`HandoffError::EmptyInput`] for a blank link, before any request
	/// - [`HandoffError::MalformedLink`] when the link is not a URL
	/// - [`HandoffError::Network`] when the endpoint cannot be reached
	/// - [`HandoffError::Remote`] for any other failure
	pub async fn retrieve(&self, link: &str) -> Result<String> {
		let link = link.trim();
		if link.is_empty() {
			return Err(HandoffError::EmptyInput);
		}

		let url = Self::normalize(link)?;
		debug!(url = %url, "requesting token document");

		let response = self.client.get(url).send().await.map_err(|e| {
			let err = classify_send_error(e);
			warn!(error = %err, "token request failed");
			err
		})?;

		let status = response.status();
		if !status.is_success() {
			warn!(%status, "token endpoint answered with failure status");
			return Err(HandoffError::Remote(format!("endpoint answered {status}")));
		}

		let body = response.bytes().await.map_err(|e| {
			if e.is_timeout() {
				HandoffError::Network(format!("timed out reading response: {e}"))
			} else {
				HandoffError::Remote(format!("failed to read response: {e}"))
			}
		})?;

		let document: TokenDocument = serde_json::from_slice(&body)
			.map_err(|e| HandoffError::Remote(format!("response is not a token document: {e}")))?;

		let token = document
			.token()
			.ok_or_else(|| HandoffError::Remote("response has no usable JWT field".to_string()))?;

		debug!(token_len = token.len(), "token retrieved");
		Ok(token.to_string())
	}
}

/// Sorts a failed send into connectivity failures and everything else.
///
/// A send that errs without any response (connect, DNS, timeout) is a
/// connectivity failure.
fn classify_send_error(err: reqwest::Error) -> HandoffError {
	if err.is_connect() || err.is_timeout() || (err.is_request() && err.status().is_none()) {
		HandoffError::Network(err.to_string())
	} else {
		HandoffError::Remote(err.to_string())
	}
}

//! Finding the browser websocket behind a remote-debugging port.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::{CdpError, Result};

/// `/json/version` response subset from Chrome DevTools Protocol.
#[derive(Debug, Deserialize)]
pub struct CdpVersionInfo {
	#[serde(rename = "webSocketDebuggerUrl")]
	pub web_socket_debugger_url: String,
	#[serde(rename = "Browser")]
	pub browser: Option<String>,
}

/// Resolves CDP version metadata from `/json/version` on `port`.
pub async fn fetch_cdp_endpoint(port: u16) -> Result<CdpVersionInfo> {
	fetch_from_hosts(port, &["127.0.0.1", "localhost", "[::1]"]).await
}

async fn fetch_from_hosts(port: u16, hosts: &[&str]) -> Result<CdpVersionInfo> {
	let client = reqwest::Client::builder()
		.timeout(Duration::from_millis(400))
		.build()
		.map_err(|e| CdpError::Discovery(format!("failed to create HTTP client: {e}")))?;
	let mut last_error = "no response".to_string();

	for host in hosts {
		let url = format!("http://{host}:{port}/json/version");
		let response = match client.get(&url).send().await {
			Ok(r) => r,
			Err(e) => {
				last_error = e.to_string();
				continue;
			}
		};

		if !response.status().is_success() {
			last_error = format!("unexpected status {}", response.status());
			continue;
		}

		let info: CdpVersionInfo = response
			.json()
			.await
			.map_err(|e| CdpError::Discovery(format!("failed to parse CDP response: {e}")))?;
		debug!(browser = ?info.browser, url = %info.web_socket_debugger_url, "found CDP endpoint");
		return Ok(info);
	}

	Err(CdpError::Discovery(format!(
		"no browser with remote debugging on port {port} ({last_error}); \
		 start one with --remote-debugging-port={port}"
	)))
}

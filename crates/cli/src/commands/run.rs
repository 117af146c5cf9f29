use handoff::{BrowserHost, Orchestrator};
use tokio_util::sync::CancellationToken;

use super::Outcome;
use super::login::login_outcome;
use crate::output::{ErrorCode, HandoffView};

pub async fn execute<H: BrowserHost>(orchestrator: &mut Orchestrator<H>, link: &str, cancel: CancellationToken) -> Outcome {
	let report = orchestrator.run(link, cancel).await;
	let view = HandoffView {
		transfer: report.transfer.as_ref().map(|t| t.to_location()),
		..HandoffView::button(report.button)
	};

	match report.login {
		Some(login) => login_outcome(view, login),
		None => {
			let code = report.error.map_or(ErrorCode::InternalError, ErrorCode::from);
			let message = report.detail.unwrap_or_else(|| report.button.label().to_string());
			Outcome::failed(view, code, message)
		}
	}
}

use handoff::orchestrator::LoginReport;
use handoff::{BrowserHost, Orchestrator};
use tokio_util::sync::CancellationToken;

use super::Outcome;
use crate::output::{ErrorCode, HandoffView, LoginView};

pub async fn execute<H: BrowserHost>(orchestrator: &Orchestrator<H>, query: &str, cancel: CancellationToken) -> Outcome {
	let report = orchestrator.complete_until(query, cancel).await;
	login_outcome(HandoffView::default(), report)
}

/// Attaches the login screen's outcome to `view`.
pub(super) fn login_outcome(view: HandoffView, report: LoginReport) -> Outcome {
	let failure = report.status.is_failure().then(|| {
		let code = report.error.map_or(ErrorCode::InternalError, ErrorCode::from);
		let message = report
			.detail
			.clone()
			.unwrap_or_else(|| report.status.message().to_string());
		(code, message)
	});

	let view = HandoffView {
		login: Some(LoginView::from(report)),
		..view
	};
	match failure {
		Some((code, message)) => Outcome::failed(view, code, message),
		None => Outcome::ok(view),
	}
}

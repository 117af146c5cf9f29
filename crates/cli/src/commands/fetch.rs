use handoff::{BrowserHost, Orchestrator};

use super::Outcome;
use crate::output::HandoffView;

pub async fn execute<H: BrowserHost>(orchestrator: &mut Orchestrator<H>, link: &str) -> Outcome {
	match orchestrator.submit(link).await {
		Ok(transfer) => Outcome::ok(HandoffView {
			transfer: Some(transfer.to_location()),
			..HandoffView::button(orchestrator.state())
		}),
		Err(e) => Outcome::failed(HandoffView::button(orchestrator.state()), e.kind().into(), e.to_string()),
	}
}

//! Token retrieval against an in-process HTTP server.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::routing::get;
use handoff::{HandoffConfig, HandoffError, TokenRetriever};
use parking_lot::Mutex;
use serde_json::json;

#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<String>>>);

async fn serve(app: Router) -> String {
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		let _ = axum::serve(listener, app).await;
	});
	format!("http://{addr}")
}

async fn token_server() -> (String, Seen) {
	let seen = Seen::default();
	let app = Router::new()
		.route(
			"/view/{doc}",
			get(|State(seen): State<Seen>, uri: Uri| async move {
				seen.0.lock().push(uri.path().to_string());
				match uri.path() {
					"/view/ok" => (StatusCode::OK, json!({ "JWT": "{\"access_token\":\"T\"}" }).to_string()),
					"/view/blank" => (StatusCode::OK, json!({ "JWT": "   " }).to_string()),
					"/view/number" => (StatusCode::OK, json!({ "JWT": 42 }).to_string()),
					"/view/none" => (StatusCode::OK, json!({ "token": "x" }).to_string()),
					"/view/html" => (StatusCode::OK, "<html></html>".to_string()),
					_ => (StatusCode::NOT_FOUND, String::new()),
				}
			}),
		)
		.with_state(seen.clone());
	(serve(app).await, seen)
}

fn retriever() -> TokenRetriever {
	TokenRetriever::new(&HandoffConfig::default()).unwrap()
}

#[tokio::test]
async fn raw_link_is_fetched_from_rendered_path() -> anyhow::Result<()> {
	let (base, seen) = token_server().await;
	let token = retriever().retrieve(&format!("{base}/view/raw/ok")).await?;

	assert_eq!(token, r#"{"access_token":"T"}"#);
	assert_eq!(*seen.0.lock(), vec!["/view/ok".to_string()]);
	Ok(())
}

#[tokio::test]
async fn surrounding_whitespace_is_ignored() {
	let (base, _) = token_server().await;
	let token = retriever().retrieve(&format!("  {base}/view/raw/ok \n")).await.unwrap();
	assert!(token.contains("access_token"));
}

#[tokio::test]
async fn not_found_is_remote_error() {
	let (base, _) = token_server().await;
	let err = retriever().retrieve(&format!("{base}/view/raw/gone")).await.unwrap_err();
	assert!(matches!(err, HandoffError::Remote(_)), "{err:?}");
}

#[tokio::test]
async fn unusable_jwt_field_is_remote_error() {
	let (base, _) = token_server().await;
	for doc in ["blank", "number", "none", "html"] {
		let err = retriever().retrieve(&format!("{base}/view/raw/{doc}")).await.unwrap_err();
		assert!(matches!(err, HandoffError::Remote(_)), "{doc}: {err:?}");
	}
}

#[tokio::test]
async fn refused_connection_is_network_error() {
	let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
	let port = listener.local_addr().unwrap().port();
	drop(listener);

	let err = retriever()
		.retrieve(&format!("http://127.0.0.1:{port}/view/raw/ok"))
		.await
		.unwrap_err();
	assert!(matches!(err, HandoffError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn blank_and_unparseable_links_fail_before_any_request() {
	let (_, seen) = token_server().await;

	assert!(matches!(retriever().retrieve("  \t").await, Err(HandoffError::EmptyInput)));
	assert!(matches!(
		retriever().retrieve("not a url").await,
		Err(HandoffError::MalformedLink { .. })
	));
	assert!(seen.0.lock().is_empty());
}

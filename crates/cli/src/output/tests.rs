use handoff::LoginStatus;

use super::*;

#[test]
fn envelope_inlines_view_fields() {
	let result = ResultBuilder::new("fetch")
		.data(HandoffView {
			transfer: Some("login.html?domain=food.snapp.ir&jwt=x".into()),
			..HandoffView::button(ButtonState::Success)
		})
		.build();

	let json = serde_json::to_value(&result).unwrap();
	assert_eq!(json["ok"], true);
	assert_eq!(json["command"], "fetch");
	assert_eq!(json["state"], "success");
	assert_eq!(json["label"], "انجام شد!");
	assert_eq!(json["transfer"], "login.html?domain=food.snapp.ir&jwt=x");
	assert!(json.get("error").is_none());
	assert!(json.get("login").is_none());
}

#[test]
fn failed_result_keeps_view_and_error() {
	let result = ResultBuilder::new("fetch")
		.data(HandoffView::button(ButtonState::ApiError))
		.error(ErrorCode::RemoteError, "endpoint answered 404 Not Found")
		.build();

	assert!(!result.ok);
	let json = serde_json::to_value(&result).unwrap();
	assert_eq!(json["state"], "apiError");
	assert_eq!(json["status"], "لینک وارد شده نادرست است");
	assert_eq!(json["error"]["code"], "REMOTE_ERROR");
}

#[test]
fn login_view_carries_message() {
	let view = LoginView::from(LoginReport {
		status: LoginStatus::Closed,
		strategy: None,
		states: Vec::new(),
		error: None,
		detail: None,
	});
	let json = serde_json::to_value(&view).unwrap();
	assert_eq!(json["status"], "closed");
	assert_eq!(json["message"], "این صفحه بسته شد.");
}

#[test]
fn error_code_follows_error_kind() {
	assert_eq!(ErrorCode::from(ErrorKind::NetworkError), ErrorCode::NetworkError);
	assert_eq!(ErrorCode::InjectionError.to_string(), "INJECTION_ERROR");
}

#[test]
fn output_format_parse() {
	assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
	assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
	assert!("toon".parse::<OutputFormat>().is_err());
}

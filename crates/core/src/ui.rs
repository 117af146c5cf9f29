//! View model for the two screens.
//!
//! Views are pure functions of state; the only mutable state lives in the
//! [`Orchestrator`](crate::Orchestrator).

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, HandoffError};

/// State of the trigger screen's button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ButtonState {
	#[default]
	Default,
	Loading,
	Success,
	EmptyInput,
	NetworkError,
	ApiError,
}

/// What the trigger screen shows for a [`ButtonState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonView {
	pub label: &'static str,
	pub disabled: bool,
	pub status_text: &'static str,
}

impl ButtonState {
	pub fn label(self) -> &'static str {
		match self {
			Self::Default => "ارسال",
			Self::Loading => "در حال بارگذاری...",
			Self::Success => "انجام شد!",
			Self::EmptyInput => "لطفا لینک را وارد کنید",
			Self::NetworkError => "اتصال اینترنت را بررسی کنید",
			Self::ApiError => "لینک وارد شده نادرست است",
		}
	}

	/// Error states repeat their label in the status line.
	pub fn status_text(self) -> &'static str {
		match self {
			Self::Default | Self::Loading | Self::Success => "",
			Self::EmptyInput | Self::NetworkError | Self::ApiError => self.label(),
		}
	}

	pub fn view(self) -> ButtonView {
		ButtonView {
			label: self.label(),
			disabled: self == Self::Loading,
			status_text: self.status_text(),
		}
	}

	/// Button state shown after a failed submission.
	pub fn from_error(err: &HandoffError) -> Self {
		Self::from_kind(err.kind())
	}

	pub fn from_kind(kind: ErrorKind) -> Self {
		match kind {
			ErrorKind::EmptyInput => Self::EmptyInput,
			ErrorKind::NetworkError => Self::NetworkError,
			_ => Self::ApiError,
		}
	}
}

/// Message shown on the login screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginStatus {
	Incomplete,
	ApplyingCookies,
	ApplyingStorage,
	InvalidToken,
	Succeeded,
	CookieFailed,
	StorageFailed,
	Closed,
	UnsupportedDomain,
}

impl LoginStatus {
	pub fn message(self) -> &'static str {
		match self {
			Self::Incomplete => "اطلاعات ورود ناقص است.",
			Self::ApplyingCookies => "در حال تنظیم کوکی\u{200c}ها و ورود به m.snappfood.ir...",
			Self::ApplyingStorage => "در حال ورود به food.snapp.ir و تنظیم localStorage...",
			Self::InvalidToken => "توکن JWT نامعتبر است.",
			Self::Succeeded => "ورود موفقیت\u{200c}آمیز بود!",
			Self::CookieFailed => "خطا در تنظیم کوکی\u{200c}ها.",
			Self::StorageFailed => "خطا در تنظیم localStorage.",
			Self::Closed => "این صفحه بسته شد.",
			Self::UnsupportedDomain => "دامنه پشتیبانی نشده است.",
		}
	}

	/// Whether the login screen ended without a session in place.
	pub fn is_failure(self) -> bool {
		matches!(
			self,
			Self::Incomplete | Self::InvalidToken | Self::CookieFailed | Self::StorageFailed | Self::UnsupportedDomain
		)
	}
}

impl std::fmt::Display for LoginStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.message())
	}
}

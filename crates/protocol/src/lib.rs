//! Wire types shared by the hand-off crates.
//!
//! # Main Types
//!
//! - [`TokenDocument`] - JSON body returned by the token endpoint
//! - [`SessionToken`] - the session document carried inside the `JWT` field
//! - [`CookieRecord`] - one cookie rendered as a `document.cookie` assignment
//! - [`HandoffTransfer`] - the `domain` + `jwt` query passed to the login screen

pub mod cookie;
pub mod token;
pub mod transfer;

pub use cookie::{CookieRecord, EXPIRED_DATE, SameSite, cookie_names, expire_directive, http_date};
pub use token::{PayloadError, SessionToken, TokenDocument};
pub use transfer::{HandoffTransfer, LOGIN_PAGE, TransferError};

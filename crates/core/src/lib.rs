//! Session hand-off into an embedded browser.
//!
//! A hand-off takes a link to a token document, fetches the token, decides
//! from the link's hostname how the destination keeps its session, and then
//! drives an embedded browser surface until that session state is in place.
//!
//! # Components
//!
//! - [`TokenRetriever`] fetches and validates the token string
//! - [`DomainClassifier`] maps a hostname to an [`InjectionStrategy`]
//! - [`SessionInjector`] writes cookies or local storage through a [`BrowserHandle`]
//! - [`Orchestrator`] wires the above and maps failures to UI states
//!
//! The embedded browser itself is abstracted behind [`BrowserHost`] and
//! [`BrowserHandle`]; [`testing::RecordingBrowser`] is an in-memory host.

pub mod browser;
pub mod classifier;
pub mod config;
pub mod error;
pub mod injector;
pub mod orchestrator;
pub mod retriever;
pub mod testing;
pub mod ui;

pub use browser::{BrowserError, BrowserHandle, BrowserHost, LifecycleEvent, NavigateOptions};
pub use classifier::{Classification, DomainClassifier, InjectionStrategy};
pub use config::{HandoffConfig, SiteConfig};
pub use error::{ErrorKind, HandoffError, Result};
pub use handoff_protocol::{HandoffTransfer, SessionToken};
pub use injector::{InjectionOutcome, InjectionReport, InjectionState, SessionInjector};
pub use orchestrator::{HandoffReport, LoginReport, Orchestrator};
pub use retriever::TokenRetriever;
pub use ui::{ButtonState, ButtonView, LoginStatus};

//! `handoff` command-line shell.
//!
//! Drives [`handoff::Orchestrator`] against a Chromium reached over the
//! DevTools Protocol, or against the in-memory recording host for dry runs.

pub mod cdp;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;

/*
 * SPDX-FileCopyrightText: 2024 A3Mailer Project
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Health check for the rspamd history of a mailcow instance.
//!
//! This library holds everything behind the `check-mailcow-rspamd` binary:
//! the history API client, the metric derivation over the fetched log
//! entries, and the verdict evaluation that maps freshness and spam-ratio
//! statistics onto the monitoring states OK/WARNING/CRITICAL/UNKNOWN.

pub mod modules;

// Re-export commonly used types for easier access
pub use modules::{
    CheckError, Result,
    cli::{CheckConfig, Cli, Client},
    history::{LogEntry, seconds_since_last_mail},
    metrics::{CounterpartStats, Metrics},
    verdict::{PerfData, State, Verdict, evaluate},
};

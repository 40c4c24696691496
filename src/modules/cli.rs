/*
 * SPDX-FileCopyrightText: 2024 A3Mailer Project
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Command line interface of the check.
//!
//! All thresholds and windows live in an explicit [`CheckConfig`] record
//! built once per invocation; nothing is kept in process-wide state.

use clap::Parser;

/// Seconds since the last received mail before the check turns WARNING.
pub const DEFAULT_WARN_SECONDS: i64 = 1800;

/// Seconds since the last received mail before the check turns CRITICAL.
pub const DEFAULT_CRIT_SECONDS: i64 = 3600;

/// Number of history entries requested from the appliance.
pub const DEFAULT_HISTORY_COUNT: u64 = 400;

/// Lookback window for the action tally, in minutes.
pub const DEFAULT_LOOKBACK_MINUTES: i64 = 5;

/// Length of the per-direction spam-ratio rankings.
pub const TOP_N: usize = 10;

#[derive(Debug, Parser)]
#[command(
    name = "check-mailcow-rspamd",
    version,
    about = "Checks the rspamd history of a mailcow instance"
)]
pub struct Cli {
    /// Server address of the mailcow instance, e.g. https://mail.example.com
    #[arg(long)]
    pub server: String,

    /// Mailcow API key (read-only access is sufficient)
    #[arg(long = "api-key")]
    pub api_key: String,

    /// Number of history entries to request
    #[arg(long, default_value_t = DEFAULT_HISTORY_COUNT)]
    pub count: u64,

    /// Minutes to look back for the action tally
    #[arg(long = "min-back", default_value_t = DEFAULT_LOOKBACK_MINUTES)]
    pub min_back: i64,

    /// Warning threshold in seconds since the last received mail
    #[arg(short, long, default_value_t = DEFAULT_WARN_SECONDS)]
    pub warning: i64,

    /// Critical threshold in seconds since the last received mail
    #[arg(short, long, default_value_t = DEFAULT_CRIT_SECONDS)]
    pub critical: i64,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Always exit with OK regardless of the computed state
    #[arg(long = "always-ok")]
    pub always_ok: bool,
}

/// Threshold and window configuration handed to the analysis components.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub warn_seconds: i64,
    pub crit_seconds: i64,
    pub lookback_minutes: i64,
    pub top_n: usize,
}

impl From<&Cli> for CheckConfig {
    fn from(cli: &Cli) -> Self {
        CheckConfig {
            warn_seconds: cli.warning,
            crit_seconds: cli.critical,
            lookback_minutes: cli.min_back,
            top_n: TOP_N,
        }
    }
}

/// Connection parameters for the mailcow API.
#[derive(Debug, Clone)]
pub struct Client {
    pub url: String,
    pub api_key: String,
    pub timeout: u64,
}

impl From<&Cli> for Client {
    fn from(cli: &Cli) -> Self {
        Client {
            url: cli.server.trim_end_matches('/').to_string(),
            api_key: cli.api_key.clone(),
            timeout: cli.timeout,
        }
    }
}

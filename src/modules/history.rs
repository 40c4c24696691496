/*
 * SPDX-FileCopyrightText: 2024 A3Mailer Project
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Log entry model and freshness analysis.
//!
//! The history returned by the appliance is ordered most-recent-first.
//! Entries are read-only input; the analyzers never mutate or persist them.

use serde::{Deserialize, Deserializer};

use super::{CheckError, Result, UNAUTHENTICATED_USER};

/// One record of the rspamd history.
///
/// Decoding is tolerant: a record missing its timestamp or action still
/// decodes, and each analyzer decides how to treat such entries.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    /// Epoch seconds when the entry was logged
    #[serde(default, deserialize_with = "lenient_unix_time")]
    pub unix_time: Option<i64>,

    /// Action the filter applied, e.g. "no action", "reject", "greylist"
    #[serde(default)]
    pub action: Option<String>,

    /// Authenticated sending user, or "unknown" for incoming mail
    #[serde(default = "unauthenticated")]
    pub user: String,

    /// SMTP envelope recipients
    #[serde(default)]
    pub rcpt_smtp: Vec<String>,
}

impl LogEntry {
    /// Elapsed seconds between `now` and this entry, if it carries a
    /// usable timestamp.
    ///
    /// The difference is absolute: clock skew between checker and appliance
    /// must not produce negative ages.
    pub fn age_seconds(&self, now: i64) -> Option<i64> {
        self.unix_time.map(|received| (now - received).abs())
    }

    /// Whether the entry was submitted by an authenticated user.
    pub fn is_outgoing(&self) -> bool {
        self.user != UNAUTHENTICATED_USER
    }
}

fn unauthenticated() -> String {
    UNAUTHENTICATED_USER.to_string()
}

/// Accepts the timestamp as a JSON integer, float or numeric string.
/// Anything else decodes to `None` and is handled by the analyzers.
fn lenient_unix_time<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(secs) => secs
            .as_i64()
            .or_else(|| secs.as_f64().map(|secs| secs as i64)),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Seconds elapsed since the most recent history entry.
///
/// Only the first entry is consulted, relying on the API's
/// most-recent-first ordering. Fails when the history is empty or the first
/// entry carries no usable timestamp.
pub fn seconds_since_last_mail(entries: &[LogEntry], now: i64) -> Result<i64> {
    let last = entries
        .first()
        .ok_or_else(|| CheckError::parse("history is empty, no mail received"))?;
    last.age_seconds(now)
        .ok_or_else(|| CheckError::parse("last mail time could not be parsed"))
}

/*
 * SPDX-FileCopyrightText: 2024 A3Mailer Project
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Metric derivation over the fetched history.
//!
//! Two independent views of the same entry sequence: a per-action tally over
//! the configured lookback window, and per-counterpart spam statistics over
//! the last 24 hours. A counterpart is the lowercased first recipient for
//! incoming mail, or the authenticated user for outgoing mail.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::debug;

use super::{Result, cli::CheckConfig, history::LogEntry};

/// Actions the tally is seeded with. Actions outside this set get their own
/// counter the first time they are seen.
pub const KNOWN_ACTIONS: [&str; 6] = [
    "no action",
    "reject",
    "soft reject",
    "rewrite subject",
    "add header",
    "greylist",
];

/// Tally key counting every in-window entry regardless of action.
pub const TOTAL_ACTION: &str = "total";

/// Window for throughput and spam-ratio statistics.
const DAY_SECONDS: i64 = 24 * 60 * 60;

/// Spam/ham tally for one counterpart.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CounterpartStats {
    pub spam: u64,
    pub ham: u64,
}

impl CounterpartStats {
    /// Classifiable mail seen for this counterpart.
    pub fn total(&self) -> u64 {
        self.spam + self.ham
    }

    /// Spam share in [0, 1]. A counterpart without classifiable mail counts
    /// as maximal spam ratio.
    pub fn ratio(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            1.0
        } else {
            1.0 - self.ham as f64 / total as f64
        }
    }
}

/// Aggregate metrics handed to the verdict evaluator.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Entries seen within the last 24 hours
    pub throughput_24h: u64,
    /// Per-action counts within the lookback window, seeded with
    /// [`KNOWN_ACTIONS`] and [`TOTAL_ACTION`]
    pub actions: BTreeMap<String, u64>,
    /// Busiest incoming counterparts, ordered by spam ratio
    pub incoming_top: Vec<(String, CounterpartStats)>,
    /// Busiest outgoing counterparts, ordered by spam ratio
    pub outgoing_top: Vec<(String, CounterpartStats)>,
}

impl Metrics {
    /// Run all analyzers over the entry sequence.
    pub fn collect(entries: &[LogEntry], now: i64, config: &CheckConfig) -> Result<Self> {
        let actions = tally_actions(entries, now, config.lookback_minutes);
        let (throughput_24h, incoming, outgoing) = group_by_counterpart(entries, now);
        debug!(
            throughput_24h,
            incoming = incoming.len(),
            outgoing = outgoing.len(),
            "aggregated rspamd history"
        );

        Ok(Metrics {
            throughput_24h,
            actions,
            incoming_top: top_by_spam_ratio(incoming, config.top_n),
            outgoing_top: top_by_spam_ratio(outgoing, config.top_n),
        })
    }
}

/// Count entries per action within the lookback window.
///
/// The result always contains every [`KNOWN_ACTIONS`] key and
/// [`TOTAL_ACTION`]; `total` counts each in-window entry with a non-empty
/// action once, regardless of which action it carries. Entries without a
/// usable timestamp or without an action are skipped.
pub fn tally_actions(
    entries: &[LogEntry],
    now: i64,
    lookback_minutes: i64,
) -> BTreeMap<String, u64> {
    let mut tally: BTreeMap<String, u64> = KNOWN_ACTIONS
        .iter()
        .map(|action| (action.to_string(), 0))
        .chain([(TOTAL_ACTION.to_string(), 0)])
        .collect();
    let window_seconds = lookback_minutes.saturating_mul(60);

    for entry in entries {
        if !entry
            .age_seconds(now)
            .is_some_and(|age| age < window_seconds)
        {
            continue;
        }
        let Some(action) = entry.action.as_deref().filter(|action| !action.is_empty()) else {
            continue;
        };
        *tally.entry(action.to_string()).or_insert(0) += 1;
        *tally.entry(TOTAL_ACTION.to_string()).or_insert(0) += 1;
    }

    tally
}

/// Insertion-ordered grouping, so ranking ties keep first-occurrence order.
type Grouping = IndexMap<String, CounterpartStats>;

/// Single pass over the last 24 hours: throughput plus per-counterpart
/// spam/ham grouping for incoming and outgoing mail.
///
/// Every in-window entry counts toward throughput. Entries joining neither
/// group (unauthenticated without recipients) and entries with an
/// indeterminate action (greylist, soft reject, none) contribute nothing
/// beyond that.
fn group_by_counterpart(entries: &[LogEntry], now: i64) -> (u64, Grouping, Grouping) {
    let mut throughput_24h = 0;
    let mut incoming = Grouping::default();
    let mut outgoing = Grouping::default();

    for entry in entries {
        if !entry.age_seconds(now).is_some_and(|age| age < DAY_SECONDS) {
            continue;
        }
        throughput_24h += 1;

        let (group, counterpart) = if entry.is_outgoing() {
            (&mut outgoing, entry.user.clone())
        } else if let Some(rcpt) = entry.rcpt_smtp.first() {
            (&mut incoming, rcpt.to_lowercase())
        } else {
            continue;
        };

        let is_ham = match entry.action.as_deref() {
            Some("no action") => true,
            Some("greylist") | Some("soft reject") | None => continue,
            Some(_) => false,
        };

        let stats = group.entry(counterpart).or_default();
        if is_ham {
            stats.ham += 1;
        } else {
            stats.spam += 1;
        }
    }

    (throughput_24h, incoming, outgoing)
}

/// Rank a grouping: keep the `n` busiest counterparts, then order those by
/// spam ratio. Both sorts are stable, so ties keep their first-occurrence
/// order in the history.
fn top_by_spam_ratio(group: Grouping, n: usize) -> Vec<(String, CounterpartStats)> {
    let mut ranked: Vec<_> = group.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total().cmp(&a.1.total()));
    ranked.truncate(n);
    ranked.sort_by(|a, b| b.1.ratio().total_cmp(&a.1.ratio()));
    ranked
}

/*
 * SPDX-FileCopyrightText: 2024 A3Mailer Project
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Verdict evaluation and performance-data rendering.
//!
//! Freshness is the primary health signal: it is compared against the
//! warning/critical thresholds, while throughput, action counters and the
//! incoming spam-ratio ranking enrich the OK summary and the perfdata
//! segment consumed by the monitoring system.

use std::fmt::{self, Display};

use prettytable::{Attr, Cell, Row, Table, format};

use super::{
    cli::CheckConfig,
    metrics::{CounterpartStats, KNOWN_ACTIONS, Metrics, TOTAL_ACTION},
};

/// Monitoring states in their conventional exit-code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl State {
    /// Process exit code the monitoring system expects for this state.
    pub fn exit_code(self) -> i32 {
        match self {
            State::Ok => 0,
            State::Warning => 1,
            State::Critical => 2,
            State::Unknown => 3,
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Ok => write!(f, "OK"),
            State::Warning => write!(f, "WARNING"),
            State::Critical => write!(f, "CRITICAL"),
            State::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// One `'label'=value[uom];[warn];[crit];[min];[max]` performance entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PerfData {
    pub label: String,
    pub value: f64,
    pub uom: Option<String>,
    pub warn: Option<f64>,
    pub crit: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PerfData {
    /// Plain counter: no unit, no thresholds, bounded below by zero.
    pub fn counter(label: &str, value: u64) -> Self {
        PerfData {
            label: label.to_string(),
            value: value as f64,
            uom: None,
            warn: None,
            crit: None,
            min: Some(0.0),
            max: None,
        }
    }
}

impl Display for PerfData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'={}", self.label, format_number(self.value))?;
        if let Some(uom) = &self.uom {
            f.write_str(uom)?;
        }
        for threshold in [self.warn, self.crit, self.min, self.max] {
            f.write_str(";")?;
            if let Some(value) = threshold {
                f.write_str(&format_number(value))?;
            }
        }
        Ok(())
    }
}

/// Integral values render without a fractional part.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Final check outcome: state, operator-facing summary, performance data.
#[derive(Debug)]
pub struct Verdict {
    pub state: State,
    pub message: String,
    pub perfdata: Vec<PerfData>,
}

impl Verdict {
    /// Wrap an internal failure. The check must always end in a well-defined
    /// state, so residual errors become UNKNOWN instead of a crash.
    pub fn unknown(reason: impl Display) -> Self {
        Verdict {
            state: State::Unknown,
            message: format!("UNKNOWN - {reason}"),
            perfdata: Vec::new(),
        }
    }

    /// Summary message, followed by the `|`-separated perfdata segment when
    /// there is one.
    pub fn render(&self) -> String {
        let message = self.message.trim();
        if self.perfdata.is_empty() {
            message.to_string()
        } else {
            let perfdata: Vec<String> = self.perfdata.iter().map(PerfData::to_string).collect();
            format!("{}|{}", message, perfdata.join(" "))
        }
    }
}

/// Combine freshness and aggregated metrics into the final verdict.
pub fn evaluate(freshness_seconds: i64, metrics: &Metrics, config: &CheckConfig) -> Verdict {
    let (state, message) = if freshness_seconds > config.crit_seconds {
        (
            State::Critical,
            format!("CRIT threshold reached: {freshness_seconds}s since last mail"),
        )
    } else if freshness_seconds > config.warn_seconds {
        (
            State::Warning,
            format!("WARN threshold reached: {freshness_seconds}s since last mail"),
        )
    } else {
        (
            State::Ok,
            format!(
                "OK - {}s since last mail\nThroughput: {} messages/day\nIncoming 24h Stats:\n{}",
                freshness_seconds,
                metrics.throughput_24h,
                spam_ratio_table(&metrics.incoming_top)
            ),
        )
    };

    Verdict {
        state,
        message,
        perfdata: perfdata(metrics),
    }
}

/// Performance data attached to every computed verdict: the total and
/// per-action tallies plus the 24h throughput, all bounded below by zero.
/// Actions outside the seeded set follow in name order.
fn perfdata(metrics: &Metrics) -> Vec<PerfData> {
    let count = |label: &str| metrics.actions.get(label).copied().unwrap_or(0);

    let mut perfdata = vec![
        PerfData::counter(TOTAL_ACTION, count(TOTAL_ACTION)),
        PerfData::counter("throughput24h", metrics.throughput_24h),
    ];
    perfdata.extend(
        KNOWN_ACTIONS
            .iter()
            .map(|action| PerfData::counter(action, count(action))),
    );
    perfdata.extend(
        metrics
            .actions
            .iter()
            .filter(|(label, _)| {
                *label != TOTAL_ACTION && !KNOWN_ACTIONS.contains(&label.as_str())
            })
            .map(|(label, value)| PerfData::counter(label, *value)),
    );
    perfdata
}

/// Render the incoming ranking as the table operators see in the OK summary.
fn spam_ratio_table(ranking: &[(String, CounterpartStats)]) -> String {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(Row::new(vec![
        Cell::new("Recipient").with_style(Attr::Bold),
        Cell::new("Spam %").with_style(Attr::Bold),
        Cell::new("Mails Total").with_style(Attr::Bold),
    ]));
    for (counterpart, stats) in ranking {
        table.add_row(Row::new(vec![
            Cell::new(counterpart),
            Cell::new(&format!("{:.2}", stats.ratio() * 100.0)),
            Cell::new(&stats.total().to_string()),
        ]));
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::cli::TOP_N;
    use crate::modules::metrics::tally_actions;

    fn config() -> CheckConfig {
        CheckConfig {
            warn_seconds: 1800,
            crit_seconds: 3600,
            lookback_minutes: 5,
            top_n: TOP_N,
        }
    }

    fn metrics() -> Metrics {
        Metrics {
            throughput_24h: 42,
            actions: tally_actions(&[], 0, 5),
            incoming_top: vec![(
                "a@x.com".to_string(),
                CounterpartStats { spam: 1, ham: 1 },
            )],
            outgoing_top: Vec::new(),
        }
    }

    #[test]
    fn test_thresholds_drive_the_state() {
        let config = config();
        assert_eq!(evaluate(10, &metrics(), &config).state, State::Ok);
        assert_eq!(evaluate(2000, &metrics(), &config).state, State::Warning);
        assert_eq!(evaluate(4000, &metrics(), &config).state, State::Critical);
        // thresholds are exclusive
        assert_eq!(evaluate(1800, &metrics(), &config).state, State::Ok);
        assert_eq!(evaluate(3600, &metrics(), &config).state, State::Warning);
    }

    #[test]
    fn test_ok_message_reports_freshness_throughput_and_ranking() {
        let verdict = evaluate(10, &metrics(), &config());
        assert!(verdict.message.starts_with("OK - 10s since last mail"));
        assert!(verdict.message.contains("Throughput: 42 messages/day"));
        assert!(verdict.message.contains("Recipient"));
        assert!(verdict.message.contains("a@x.com"));
        assert!(verdict.message.contains("50.00"));
    }

    #[test]
    fn test_threshold_messages_carry_the_observed_value() {
        let config = config();
        assert!(
            evaluate(2000, &metrics(), &config)
                .message
                .contains("WARN threshold reached: 2000")
        );
        assert!(
            evaluate(4000, &metrics(), &config)
                .message
                .contains("CRIT threshold reached: 4000")
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(State::Ok.exit_code(), 0);
        assert_eq!(State::Warning.exit_code(), 1);
        assert_eq!(State::Critical.exit_code(), 2);
        assert_eq!(State::Unknown.exit_code(), 3);
    }

    #[test]
    fn test_perfdata_is_attached_regardless_of_state() {
        for freshness in [10, 2000, 4000] {
            let verdict = evaluate(freshness, &metrics(), &config());
            let labels: Vec<&str> = verdict
                .perfdata
                .iter()
                .map(|perf| perf.label.as_str())
                .collect();
            assert_eq!(
                labels,
                [
                    "total",
                    "throughput24h",
                    "no action",
                    "reject",
                    "soft reject",
                    "rewrite subject",
                    "add header",
                    "greylist",
                ]
            );
        }
    }

    #[test]
    fn test_dynamic_actions_surface_in_perfdata() {
        let mut metrics = metrics();
        metrics.actions.insert("quarantine".to_string(), 3);
        let verdict = evaluate(10, &metrics, &config());
        let quarantine = verdict
            .perfdata
            .iter()
            .find(|perf| perf.label == "quarantine")
            .expect("dynamic counter missing");
        assert_eq!(quarantine.value, 3.0);
    }

    #[test]
    fn test_perfdata_format() {
        assert_eq!(PerfData::counter("total", 5).to_string(), "'total'=5;;;0;");
        let freshness = PerfData {
            label: "freshness".to_string(),
            value: 12.5,
            uom: Some("s".to_string()),
            warn: Some(1800.0),
            crit: Some(3600.0),
            min: Some(0.0),
            max: None,
        };
        assert_eq!(freshness.to_string(), "'freshness'=12.5s;1800;3600;0;");
    }

    #[test]
    fn test_unknown_verdict_carries_the_reason_and_no_perfdata() {
        let verdict = Verdict::unknown("Parse error: history is empty");
        assert_eq!(verdict.state, State::Unknown);
        assert_eq!(verdict.message, "UNKNOWN - Parse error: history is empty");
        assert!(verdict.perfdata.is_empty());
        assert_eq!(verdict.render(), "UNKNOWN - Parse error: history is empty");
    }

    #[test]
    fn test_render_joins_message_and_perfdata_with_a_pipe() {
        let verdict = Verdict {
            state: State::Ok,
            message: "OK - all quiet\n".to_string(),
            perfdata: vec![
                PerfData::counter("total", 1),
                PerfData::counter("reject", 0),
            ],
        };
        assert_eq!(verdict.render(), "OK - all quiet|'total'=1;;;0; 'reject'=0;;;0;");
    }

    /// Test that a monitoring system can parse the rendered perfdata back
    /// into the same label/value pairs.
    #[test]
    fn test_perfdata_round_trip() {
        fn parse(segment: &str) -> Vec<(String, f64)> {
            // Labels may contain spaces, so entries split on quote boundaries
            segment
                .split(" '")
                .map(|part| {
                    let part = part.strip_prefix('\'').unwrap_or(part);
                    let (label, rest) = part.split_once("'=").expect("label quoting");
                    let value = rest.split(';').next().unwrap().parse().unwrap();
                    (label.to_string(), value)
                })
                .collect()
        }

        let verdict = evaluate(10, &metrics(), &config());
        let rendered = verdict.render();
        let (_, segment) = rendered.split_once('|').expect("perfdata segment");
        let parsed = parse(segment);
        assert_eq!(parsed.len(), verdict.perfdata.len());
        for (perf, (label, value)) in verdict.perfdata.iter().zip(parsed) {
            assert_eq!(perf.label, label);
            assert_eq!(perf.value, value);
        }
    }
}

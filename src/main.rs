/*
 * SPDX-FileCopyrightText: 2024 A3Mailer Project
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Monitoring plugin that checks the rspamd history of a mailcow instance.
//!
//! One invocation fetches the recent history, derives freshness and
//! spam-ratio metrics from it, prints a single summary (plus perfdata) to
//! stdout and exits with the verdict's monitoring state. Diagnostics go to
//! stderr via `RUST_LOG`, keeping stdout machine-parseable.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use check_mailcow_rspamd::modules::{
    Result,
    cli::{CheckConfig, Cli, Client},
    history::seconds_since_last_mail,
    metrics::Metrics,
    verdict::{Verdict, evaluate},
};

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = CheckConfig::from(&args);
    let client = Client::from(&args);

    let verdict = run_check(&client, &config, args.count)
        .await
        .unwrap_or_else(Verdict::unknown);

    println!("{}", verdict.render());
    std::process::exit(if args.always_ok {
        0
    } else {
        verdict.state.exit_code()
    });
}

/// Fetch, analyze, evaluate. Any error funnels into an UNKNOWN verdict in
/// `main`; nothing below this line terminates the process.
async fn run_check(client: &Client, config: &CheckConfig, count: u64) -> Result<Verdict> {
    let entries = client.fetch_history(count).await?;
    let now = chrono::Utc::now().timestamp();
    let freshness = seconds_since_last_mail(&entries, now)?;
    let metrics = Metrics::collect(&entries, now, config)?;
    Ok(evaluate(freshness, &metrics, config))
}

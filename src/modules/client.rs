/*
 * SPDX-FileCopyrightText: 2024 A3Mailer Project
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! HTTP client for the mailcow rspamd history API.
//!
//! One authenticated GET per invocation, no retries. The client only maps
//! transport and status failures onto [`CheckError`]; deciding how to surface
//! them is the caller's job.

use std::time::Duration;

use reqwest::{StatusCode, header::ACCEPT};
use serde::Deserialize;
use tracing::debug;

use super::{CheckError, Result, cli::Client, history::LogEntry, is_localhost};

/// Path of the history endpoint; the requested entry count is appended.
pub const HISTORY_API_PATH: &str = "/api/v1/get/logs/rspamd-history";

/// The endpoint answers with a bare entry array (mailcow) or with the
/// entries wrapped in a `rows` object (rspamd's own controller).
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryResponse {
    Entries(Vec<LogEntry>),
    Rows { rows: Vec<LogEntry> },
}

impl Client {
    /// Fetch the most recent `count` history entries, newest first.
    pub async fn fetch_history(&self, count: u64) -> Result<Vec<LogEntry>> {
        let url = format!(
            "{}{}/{}",
            self.url.trim_end_matches('/'),
            HISTORY_API_PATH,
            count
        );
        debug!(%url, "requesting rspamd history");

        let response = reqwest::Client::builder()
            .danger_accept_invalid_certs(is_localhost(&url))
            .timeout(Duration::from_secs(self.timeout))
            .build()?
            .get(&url)
            .header(ACCEPT, "application/json")
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(CheckError::request(
                    "authentication failed, make sure the API key has read access",
                ));
            }
            status => {
                return Err(CheckError::request(format!(
                    "history request failed with status {status}"
                )));
            }
        }

        let bytes = response.bytes().await?;
        let entries = match serde_json::from_slice::<HistoryResponse>(&bytes)? {
            HistoryResponse::Entries(entries) => entries,
            HistoryResponse::Rows { rows } => rows,
        };
        debug!(entries = entries.len(), "decoded rspamd history");
        Ok(entries)
    }
}

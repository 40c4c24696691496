/*
 * SPDX-FileCopyrightText: 2024 A3Mailer Project
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Check modules: argument handling, history fetch, metric derivation and
//! verdict evaluation, plus the error type shared by all of them.

pub mod cli;
pub mod client;
pub mod history;
pub mod metrics;
pub mod verdict;

/// Result type for check operations
pub type Result<T> = std::result::Result<T, CheckError>;

/// Errors produced while fetching or analyzing the rspamd history.
///
/// Every analysis function reports failure through this type instead of
/// panicking; `main` converts any residual error into an UNKNOWN verdict.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// Malformed or missing fields in the fetched history
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invariant violation while grouping or ranking counterparts
    #[error("Aggregation error: {0}")]
    Aggregation(String),

    /// The history endpoint answered, but not with usable data
    #[error("Request error: {0}")]
    Request(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CheckError {
    /// Create a new parse error
    pub fn parse<T: Into<String>>(msg: T) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new aggregation error
    pub fn aggregation<T: Into<String>>(msg: T) -> Self {
        Self::Aggregation(msg.into())
    }

    /// Create a new request error
    pub fn request<T: Into<String>>(msg: T) -> Self {
        Self::Request(msg.into())
    }
}

/// User value the appliance reports for unauthenticated (incoming) mail.
pub const UNAUTHENTICATED_USER: &str = "unknown";

/// Whether the URL points at the local machine. Self-signed certificates are
/// only tolerated for these targets.
pub fn is_localhost(url: &str) -> bool {
    url.split_once("://")
        .map(|(_, url)| url.split_once('/').map_or(url, |(host, _)| host))
        .is_some_and(|host| {
            let host = host.rsplit_once(':').map_or(host, |(host, _)| host);
            host == "localhost" || host == "127.0.0.1" || host == "[::1]"
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_localhost() {
        assert!(is_localhost("https://localhost"));
        assert!(is_localhost("https://localhost:8443/api"));
        assert!(is_localhost("http://127.0.0.1/api/v1"));
        assert!(!is_localhost("https://mail.example.com"));
        assert!(!is_localhost("https://mail.example.com:443/api"));
        assert!(!is_localhost("mail.example.com"));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            CheckError::parse("bad timestamp").to_string(),
            "Parse error: bad timestamp"
        );
        assert_eq!(
            CheckError::request("status 500").to_string(),
            "Request error: status 500"
        );
        assert_eq!(
            CheckError::aggregation("missing counter").to_string(),
            "Aggregation error: missing counter"
        );
    }
}

//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the crate.

use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use url::Url;

/// Number of random bytes behind a check-in token
const TOKEN_BYTES: usize = 32;

/// Generate an unguessable check-in token
///
/// 256 random bits encoded as unpadded base64url (43 characters).
pub fn generate_token() -> String {
    let mut random_bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Build the deep link a scanned check-in code resolves to
pub fn checkin_deep_link(base_url: &Url, event_id: i64, token: &str) -> Url {
    let mut link = base_url.clone();
    link.query_pairs_mut()
        .append_pair("event", &event_id.to_string())
        .append_pair("token", token);
    link
}

/// Format a timestamp for display
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Redact all but the first few characters of a token for logs
pub fn redact_token(token: &str) -> String {
    let visible: String = token.chars().take(6).collect();
    format!("{}…", visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_is_url_safe_and_unique() {
        let first = generate_token();
        let second = generate_token();
        assert_eq!(first.len(), 43);
        assert_ne!(first, second);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_checkin_deep_link() {
        let base = Url::parse("https://events.example.com/checkin").unwrap();
        let link = checkin_deep_link(&base, 42, "abc-_123");
        assert_eq!(link.as_str(), "https://events.example.com/checkin?event=42&token=abc-_123");
    }

    #[test]
    fn test_redact_token() {
        assert_eq!(redact_token("abcdefghij"), "abcdef…");
        assert_eq!(redact_token("ab"), "ab…");
    }
}

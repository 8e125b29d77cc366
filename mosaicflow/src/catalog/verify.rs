//! Fetch verification.
//!
//! A hub under load may answer a download request with an error document
//! instead of the product archive, e.g. an XML body saying the maximum number
//! of concurrent flows was reached. Verification inspects the first bytes and
//! the checksum of what was written before a fetch counts as a success.

use regex::Regex;
use std::sync::OnceLock;

/// Number of leading bytes handed to verifiers.
pub const SNIFF_LEN: usize = 512;

/// Decides whether downloaded content is the requested product.
#[cfg_attr(test, mockall::automock)]
pub trait FetchVerifier: Send + Sync {
    /// Checks a finished download.
    ///
    /// `head` holds up to [`SNIFF_LEN`] leading bytes, `actual_md5` the hex
    /// digest of the whole content and `expected_md5` the digest the catalog
    /// advertised, if any. Returns the rejection reason on failure.
    fn verify(&self, head: &[u8], actual_md5: &str, expected_md5: Option<String>) -> Result<(), String>;
}

/// Rejects error documents and checksum mismatches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentVerifier;

fn message_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?is)<(?:\w+:)?message[^>]*>(.*?)</(?:\w+:)?message>").ok())
        .as_ref()
}

impl ContentVerifier {
    /// Returns the error text if `head` looks like an XML or HTML error document.
    #[must_use]
    pub fn error_document(head: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(head);
        let trimmed = text.trim_start();
        let lowered = trimmed.get(..trimmed.len().min(16)).unwrap_or("").to_ascii_lowercase();
        if !(lowered.starts_with("<?xml") || lowered.starts_with("<html") || lowered.starts_with("<!doctype")) {
            return None;
        }
        let message = message_pattern()
            .and_then(|p| p.captures(trimmed))
            .and_then(|c| c.get(1))
            .map_or_else(|| "unrecognised error document".to_string(), |m| m.as_str().trim().to_string());
        Some(message)
    }
}

impl FetchVerifier for ContentVerifier {
    fn verify(&self, head: &[u8], actual_md5: &str, expected_md5: Option<String>) -> Result<(), String> {
        if let Some(message) = Self::error_document(head) {
            return Err(format!("catalog returned an error document: {message}"));
        }
        match expected_md5 {
            Some(expected) if !expected.eq_ignore_ascii_case(actual_md5) => Err(format!(
                "checksum mismatch: expected {expected}, got {actual_md5}"
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOW_LIMIT: &[u8] = br#"<?xml version="1.0" encoding="utf-8"?>
<error xmlns="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata">
  <code/>
  <message xml:lang="en">Maximum number of 2 concurrent flows achieved by the user "xyz"</message>
</error>"#;

    #[test]
    fn test_rejects_error_document() {
        let err = ContentVerifier.verify(FLOW_LIMIT, "abc", None).unwrap_err();
        assert!(err.contains("Maximum number of 2 concurrent flows"));
    }

    #[test]
    fn test_rejects_html() {
        let reason = ContentVerifier::error_document(b"  <html><body>502 Bad Gateway</body></html>");
        assert_eq!(reason.as_deref(), Some("unrecognised error document"));
    }

    #[test]
    fn test_accepts_archive() {
        let zip_head = b"PK\x03\x04\x14\x00\x00\x00";
        assert!(ContentVerifier.verify(zip_head, "d41d8cd98f00b204e9800998ecf8427e", None).is_ok());
    }

    #[test]
    fn test_checksum_case_insensitive() {
        let zip_head = b"PK\x03\x04";
        assert!(ContentVerifier
            .verify(zip_head, "d41d8cd98f00b204e9800998ecf8427e", Some("D41D8CD98F00B204E9800998ECF8427E".to_string()))
            .is_ok());

        let err = ContentVerifier
            .verify(zip_head, "d41d8cd98f00b204e9800998ecf8427e", Some("00".to_string()))
            .unwrap_err();
        assert!(err.starts_with("checksum mismatch"));
    }
}

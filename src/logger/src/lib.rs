// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]

//! Structured logging setup and redaction helpers shared by every bridge crate.
//!
//! Initialization is a thin wrapper around `tracing-subscriber`; the interesting part is
//! [`redact_bytes`] and [`redact_password`], which implement the anti-leak policy from the
//! design notes: a byte buffer is only ever logged as structured text if it is printable ASCII,
//! otherwise it is logged as a length so that stray TLS handshake bytes or binary IPMI payloads
//! never end up verbatim in a log line.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static INIT: OnceLock<()> = OnceLock::new();

/// Errors that can occur while installing the global subscriber.
#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum LoggerError {
    /// failed to install global tracing subscriber: {0}
    Install(String),
}

/// Installs the process-wide `tracing` subscriber.
///
/// `default_level` is used when `RUST_LOG` is not set. Safe to call more than once; only the
/// first call takes effect.
pub fn init(default_level: &str) -> Result<(), LoggerError> {
    if INIT.get().is_some() {
        return Ok(());
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| LoggerError::Install(err.to_string()))?;
    let _ = INIT.set(());
    Ok(())
}

/// Redacts a password-like string for logging, keeping only its length.
pub fn redact_password(_value: &str) -> &'static str {
    "<redacted>"
}

/// Redacts a byte buffer for logging.
///
/// Printable-ASCII buffers (the common case for well-formed request bodies) are returned as an
/// owned UTF-8 string. Anything else — binary IPMI payloads, stray TLS handshake bytes that hit
/// a plaintext-on-TLS-port connection — is summarized as a byte count instead of being dumped,
/// so binary noise never reaches the log.
pub fn redact_bytes(data: &[u8]) -> String {
    if is_printable_ascii(data) {
        String::from_utf8_lossy(data).into_owned()
    } else {
        format!("<{} bytes, binary>", data.len())
    }
}

/// Returns true if every byte is printable ASCII (0x20..=0x7e) or common whitespace.
pub fn is_printable_ascii(data: &[u8]) -> bool {
    data.iter()
        .all(|&b| (0x20..=0x7e).contains(&b) || matches!(b, b'\n' | b'\r' | b'\t'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_ascii_is_not_redacted() {
        let body = br#"{"UserName":"admin"}"#;
        assert!(is_printable_ascii(body));
        assert_eq!(redact_bytes(body), r#"{"UserName":"admin"}"#);
    }

    #[test]
    fn binary_noise_is_summarized() {
        let garbage = [0x16, 0x03, 0x01, 0x00, 0x05, 0xfe, 0x00];
        assert!(!is_printable_ascii(&garbage));
        assert_eq!(redact_bytes(&garbage), "<7 bytes, binary>");
    }

    #[test]
    fn password_is_always_redacted() {
        assert_eq!(redact_password("hunter2"), "<redacted>");
    }
}

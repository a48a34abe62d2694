//! Encoding utilities for hex and base64.
//!
//! The REST access API carries scripts, arguments and event payloads as
//! base64; keys and contract code travel as hex.

use base64::Engine;

use crate::error::{Error, Result};

// =============================================================================
// Hex
// =============================================================================

/// Parse a hex string (with or without `0x`) to raw bytes.
///
/// # Arguments
/// * `hex_str` - Hex string
/// * `context` - Description for error messages (e.g., "public key", "contract code")
pub fn parse_hex_bytes(hex_str: &str, context: &str) -> Result<Vec<u8>> {
    let trimmed = hex_str.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(stripped).map_err(|e| Error::parse(context, format!("invalid hex '{}': {}", stripped, e)))
}

// =============================================================================
// Base64
// =============================================================================

/// Encode bytes to a standard base64 string.
pub fn base64_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a base64 string with context-aware error message.
pub fn base64_decode(b64: &str, context: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| Error::parse(context, format!("invalid base64: {}", e)))
}

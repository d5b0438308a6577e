//! Percent-encoding and URL-safe base64 helpers.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters left alone in query keys/values and fragments (RFC 3986 unreserved).
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Path segments additionally keep their `/` separators.
const PATH_ENCODE_SET: &AsciiSet = &COMPONENT_ENCODE_SET.remove(b'/');

pub(crate) fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

pub(crate) fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT_ENCODE_SET).to_string()
}

/// Decode percent escapes. Invalid UTF-8 is replaced rather than rejected.
pub(crate) fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Decode a query component, where `+` stands for a space.
pub(crate) fn decode_query(value: &str) -> String {
    decode(&value.replace('+', " "))
}

/// Encode bytes as URL-safe base64 without padding.
///
/// # Example
///
/// ```
/// assert_eq!(weft_url::encode_base64(b"a?b>c"), "YT9iPmM");
/// ```
pub fn encode_base64(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode URL-safe base64, with or without trailing padding.
///
/// # Errors
///
/// Returns the underlying decode error for malformed input.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(data.trim_end_matches('='))
}

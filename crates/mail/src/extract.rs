//! Field extraction from fetched messages
//!
//! Pure functions: nothing here performs I/O or mutates the message.
//!
//! - Header lookup is case-sensitive and returns the first match.
//! - The body is the *last* `text/plain` or `text/html` part; a later
//!   part overwrites an earlier one.
//! - Part bodies are URL-safe base64 (`-`/`_` in place of `+`/`/`).

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use log::warn;
use regex::Regex;
use std::sync::LazyLock;

use crate::models::{ExtractedEmail, Message};

/// Mime types eligible to become the body
pub const BODY_MIME_TYPES: &[&str] = &["text/plain", "text/html"];

const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// ` <...>` segment removed from a `From` value to leave the display name
static NAME_ADDRESS_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" <(.*)>").expect("valid regex"));

/// Address inside angle brackets
static ANGLE_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(.*)>").expect("valid regex"));

static PLAIN_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("valid regex")
});

/// Extract sender, subject and body from a message
pub fn extract(message: &Message) -> ExtractedEmail {
    let from_raw = header(message, "From").map(str::to_string);

    ExtractedEmail {
        from_name: from_raw.as_deref().map(from_name),
        from_email: from_raw.as_deref().and_then(from_email),
        subject: header(message, "Subject").map(str::to_string),
        body: select_body(message),
        from_raw,
    }
}

/// Value of the first header whose name equals `name` exactly
pub fn header<'a>(message: &'a Message, name: &str) -> Option<&'a str> {
    message
        .headers
        .iter()
        .find(|h| h.name == name)
        .map(|h| h.value.as_str())
}

/// First capture group of `pattern` applied to the first `name` header
///
/// Returns `None` when the header is absent, the pattern does not match,
/// or the pattern has no capture group.
pub fn header_capture(message: &Message, name: &str, pattern: &Regex) -> Option<String> {
    let value = header(message, name)?;
    pattern
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Display name: the raw `From` value with its ` <address>` segment removed
pub fn from_name(raw: &str) -> String {
    NAME_ADDRESS_SUFFIX.replace_all(raw, "").into_owned()
}

/// Bare address: the whole value if it already is one, otherwise the
/// text between angle brackets
pub fn from_email(raw: &str) -> Option<String> {
    if is_plain_address(raw) {
        return Some(raw.to_string());
    }
    ANGLE_ADDRESS
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Whether `s` is a syntactically valid bare `local@domain` address
pub fn is_plain_address(s: &str) -> bool {
    s.len() <= 254
        && s.split_once('@').is_some_and(|(local, _)| local.len() <= 64)
        && PLAIN_ADDRESS.is_match(s)
}

/// Decoded body of the last text part, or empty if there is none
fn select_body(message: &Message) -> String {
    let mut body = String::new();
    for part in &message.parts {
        if BODY_MIME_TYPES.contains(&part.mime_type.as_str()) {
            body = decode_body(&part.encoded_body);
        }
    }
    body
}

/// Decode Gmail's URL-safe base64 body data
///
/// Undecodable data yields an empty body rather than failing the message.
pub fn decode_body(data: &str) -> String {
    let standard: String = data
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    match BODY_ENGINE.decode(standard) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!("Failed to decode message body: {}", e);
            String::new()
        }
    }
}

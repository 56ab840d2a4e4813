//! Fields extracted from a fetched message

use serde::Serialize;

/// Sender, subject and body pulled out of a [`super::Message`].
///
/// Derived deterministically from the message; absent headers yield `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedEmail {
    /// Raw `From` header value
    pub from_raw: Option<String>,
    /// `From` header with any ` <...>` segment removed
    pub from_name: Option<String>,
    /// Bare sender address
    pub from_email: Option<String>,
    /// `Subject` header value
    pub subject: Option<String>,
    /// Decoded text of the last text/plain or text/html part
    pub body: String,
}

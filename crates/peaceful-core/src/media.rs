//! Content negotiation outcome.

use serde::{Deserialize, Serialize};

/// Representation negotiated from the request's `Accept` header.
///
/// # Example
///
/// ```
/// use peaceful_core::MediaType;
///
/// assert_eq!(MediaType::from_accept("application/json"), MediaType::Json);
/// assert_eq!(MediaType::from_accept("text/html, application/xml;q=0.9"), MediaType::Xml);
/// assert_eq!(MediaType::from_accept("*/*"), MediaType::Html);
/// assert_eq!(MediaType::Xml.content_type(), "application/xml");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// `application/json`
    Json,
    /// `application/xml`
    Xml,
    /// `text/html`
    #[default]
    Html,
}

impl MediaType {
    /// Picks a media type from an `Accept` header value.
    ///
    /// JSON is checked before XML; anything else is HTML. Quality values are
    /// not weighed.
    #[must_use]
    pub fn from_accept(accept: &str) -> Self {
        if accept.contains("application/json") {
            Self::Json
        } else if accept.contains("application/xml") {
            Self::Xml
        } else {
            Self::Html
        }
    }

    /// Returns the `Content-Type` value for this media type.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
            Self::Html => "text/html",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.content_type())
    }
}

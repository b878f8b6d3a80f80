//! Content-negotiated serialization of handler results.
//!
//! [`respond`] picks XML when the request's `Accept` header mentions
//! `application/xml` and JSON otherwise. Both are pretty-printed with a
//! two-space indent. A value that cannot be serialized produces a plain
//! `500 Internal Server Error` instead.

use bytes::Bytes;
use http::{header, HeaderMap, StatusCode};
use http_body_util::Full;
use peaceful_core::MediaType;
use peaceful_middleware::{Response, ResponseExt};
use serde::Serialize;

/// Serialization failures inside the responder.
#[derive(Debug, thiserror::Error)]
pub enum RespondError {
    /// JSON encoding failed.
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// XML encoding failed.
    #[error("failed to encode XML: {0}")]
    Xml(String),
}

/// The representations the responder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// `application/json`
    #[default]
    Json,
    /// `application/xml`
    Xml,
}

impl Format {
    /// Chooses a format from request headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let wants_xml = headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("application/xml"));
        if wants_xml {
            Self::Xml
        } else {
            Self::Json
        }
    }

    /// Maps a negotiated media type; anything but XML is served as JSON.
    #[must_use]
    pub fn from_media_type(media_type: MediaType) -> Self {
        match media_type {
            MediaType::Xml => Self::Xml,
            MediaType::Json | MediaType::Html => Self::Json,
        }
    }

    /// Returns the `Content-Type` value.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }

    /// Serializes `data` in this format.
    ///
    /// # Errors
    ///
    /// Returns [`RespondError`] if `data` cannot be represented.
    pub fn encode<T: Serialize + ?Sized>(self, data: &T) -> Result<Bytes, RespondError> {
        match self {
            Self::Json => Ok(Bytes::from(serde_json::to_vec_pretty(data)?)),
            Self::Xml => {
                let mut buffer = String::new();
                let mut serializer = quick_xml::se::Serializer::new(&mut buffer);
                serializer.indent(' ', 2);
                data.serialize(serializer)
                    .map_err(|e| RespondError::Xml(e.to_string()))?;
                Ok(Bytes::from(buffer))
            }
        }
    }
}

/// Serializes `data` in the format the request asked for.
///
/// # Example
///
/// ```
/// use http::{HeaderMap, StatusCode};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Greeting {
///     message: String,
/// }
///
/// let mut headers = HeaderMap::new();
/// headers.insert("accept", "application/xml".parse().unwrap());
///
/// let greeting = Greeting { message: "hi".into() };
/// let response = peaceful::respond(&headers, StatusCode::OK, &greeting);
/// assert_eq!(response.headers()["content-type"], "application/xml");
/// ```
pub fn respond<T: Serialize + ?Sized>(
    request_headers: &HeaderMap,
    status: StatusCode,
    data: &T,
) -> Response {
    respond_as(Format::from_headers(request_headers), status, data)
}

/// Serializes `data` in an explicit format.
pub fn respond_as<T: Serialize + ?Sized>(format: Format, status: StatusCode, data: &T) -> Response {
    match format.encode(data) {
        Ok(body) => http::Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, format.content_type())
            .body(Full::new(body))
            .expect("encoded response parts are valid"),
        Err(err) => {
            tracing::error!(error = %err, format = format.content_type(), "response serialization failed");
            Response::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use http_body_util::BodyExt;
    use serde::ser::Error as _;

    #[derive(Serialize)]
    struct Item {
        id: u32,
        name: String,
    }

    struct Broken;

    impl Serialize for Broken {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot serialize"))
        }
    }

    fn accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(value));
        headers
    }

    async fn body(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn item() -> Item {
        Item {
            id: 7,
            name: "lamp".to_string(),
        }
    }

    #[tokio::test]
    async fn test_json_by_default() {
        let response = respond(&HeaderMap::new(), StatusCode::CREATED, &item());

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body(response).await, "{\n  \"id\": 7,\n  \"name\": \"lamp\"\n}");
    }

    #[tokio::test]
    async fn test_xml_when_accepted() {
        let response = respond(&accept("text/html, application/xml;q=0.9"), StatusCode::OK, &item());

        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/xml");
        let xml = body(response).await;
        assert!(xml.starts_with("<Item>"));
        assert!(xml.contains("\n  <id>7</id>"));
        assert!(xml.contains("<name>lamp</name>"));
    }

    #[tokio::test]
    async fn test_serialization_failure_is_500() {
        let response = respond(&accept("application/json"), StatusCode::OK, &Broken);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(response).await, "Internal server error\n");
    }

    #[test]
    fn test_format_from_media_type() {
        assert_eq!(Format::from_media_type(MediaType::Xml), Format::Xml);
        assert_eq!(Format::from_media_type(MediaType::Html), Format::Json);
    }
}

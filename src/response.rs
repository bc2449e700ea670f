//! Outgoing HTTP response, filled in by controllers and middleware.
//!
//! The response is a plain value on the [`Context`](crate::Context). Nothing
//! reaches the wire until the whole pipeline has succeeded; the server then
//! converts it with [`Response::into_http`].

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;

use crate::error::{Failure, Outcome};

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Response::bytes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    FormData,     // application/x-www-form-urlencoded
    Html,         // text/html; charset=utf-8
    JavaScript,   // application/javascript; charset=utf-8
    Json,         // application/json; charset=utf-8
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml; charset=utf-8
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Html        => "text/html; charset=utf-8",
            Self::JavaScript  => "application/javascript; charset=utf-8",
            Self::Json        => "application/json; charset=utf-8",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml; charset=utf-8",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response. Starts as `200 OK` with no body.
///
/// ```rust
/// use fresco::{Context, Outcome};
/// use fresco::StatusCode;
///
/// fn create(ctx: &mut Context) -> Outcome {
///     ctx.response_mut().json(StatusCode::CREATED, &["Buy milk"])
/// }
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: Bytes::new() }
    }
}

impl Response {
    /// Serialises `value` as the JSON body. A serialisation error is returned
    /// as a [`Failure`] so the calling step can propagate it with `?`.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> Outcome {
        let body = serde_json::to_vec(value).map_err(Failure::from)?;
        self.bytes(status, ContentType::Json, body);
        Ok(())
    }

    pub fn text(&mut self, status: StatusCode, body: impl Into<String>) -> &mut Self {
        self.bytes(status, ContentType::Text, body.into())
    }

    /// Sets status, content type and body in one go. Use this for XML, HTML, binary, etc.
    pub fn bytes(&mut self, status: StatusCode, content_type: ContentType, body: impl Into<Bytes>) -> &mut Self {
        self.status = status;
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
        self.body = body.into();
        self
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Appends a header; earlier values with the same name are kept.
    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.append(name, value);
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Converts into the body type the server hands to hyper.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_empty_ok() {
        let res = Response::default();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.body().is_empty());
        assert!(res.headers().is_empty());
    }

    #[test]
    fn json_sets_status_type_and_body() {
        let mut res = Response::default();
        res.json(StatusCode::CREATED, &serde_json::json!({ "title": "Car wash" })).unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()[CONTENT_TYPE], ContentType::Json.as_str());
        assert_eq!(res.body(), br#"{"title":"Car wash"}"#);
    }

    #[test]
    fn into_http_keeps_status_and_headers() {
        let mut res = Response::default();
        res.text(StatusCode::ACCEPTED, "queued")
            .header(http::header::LOCATION, HeaderValue::from_static("/jobs/1"));
        let wire = res.into_http();
        assert_eq!(wire.status(), StatusCode::ACCEPTED);
        assert_eq!(wire.headers()[http::header::LOCATION], "/jobs/1");
        assert_eq!(wire.headers()[CONTENT_TYPE], ContentType::Text.as_str());
    }
}

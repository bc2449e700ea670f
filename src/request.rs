//! Incoming HTTP request, as seen by controllers and middleware.
//!
//! The server collects the body before dispatch, so every accessor here is
//! synchronous and cheap.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::Failure;
use crate::tree::Params;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// An incoming HTTP request with its body already collected.
#[derive(Debug)]
pub struct Request {
    method: http::Method,
    path: String,
    query: String,
    headers: HeaderMap,
    body: Bytes,
    params: Params,
}

impl Request {
    /// Builds a request from a method and a request target such as
    /// `/todos?done=true`. Used by the server, and handy in tests.
    pub fn new(method: http::Method, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Self {
            method,
            path: path.to_owned(),
            query: query.to_owned(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: Params::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().unwrap_or_default().to_owned(),
            headers: parts.headers,
            body,
            params: Params::new(),
        }
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub fn method(&self) -> &http::Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup; names are case-insensitive. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &Params { &self.params }

    /// The raw query string, without the leading `?`. Empty when absent.
    pub fn query_string(&self) -> &str { &self.query }

    /// First value of a query parameter, percent-decoded.
    pub fn query_param(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Decodes a JSON body. A malformed body fails with `400 Bad Request`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Failure> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Failure::with_status(StatusCode::BAD_REQUEST, format!("invalid json body: {e}")))
    }

    /// Form fields: the url-encoded body for `application/x-www-form-urlencoded`
    /// requests, followed by the query string pairs.
    pub fn form(&self) -> Vec<(String, String)> {
        let body: &[u8] = if self.is_form() { &self.body } else { &[] };
        url::form_urlencoded::parse(body)
            .chain(url::form_urlencoded::parse(self.query.as_bytes()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// First form value for `key`; body fields take precedence over the query.
    pub fn form_value(&self, key: &str) -> Option<String> {
        self.form().into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn is_form(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with(FORM_URLENCODED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn splits_target_into_path_and_query() {
        let req = Request::new(http::Method::GET, "/todos?done=true&q=milk%20run");
        assert_eq!(req.path(), "/todos");
        assert_eq!(req.query_string(), "done=true&q=milk%20run");
        assert_eq!(req.query_param("q").as_deref(), Some("milk run"));
        assert_eq!(req.query_param("missing"), None);
    }

    #[test]
    fn decodes_json_body() {
        #[derive(Deserialize)]
        struct Todo {
            title: String,
        }

        let req = Request::new(http::Method::POST, "/todos").with_body(r#"{"title":"Buy milk"}"#);
        let todo: Todo = req.json().unwrap();
        assert_eq!(todo.title, "Buy milk");
    }

    #[test]
    fn malformed_json_is_a_bad_request() {
        let req = Request::new(http::Method::POST, "/todos").with_body("{");
        let err = req.json::<serde_json::Value>().unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn form_prefers_body_over_query() {
        let req = Request::new(http::Method::POST, "/login?user=query&page=2")
            .with_header(CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED))
            .with_body("user=body&pass=s3cr%21t");
        assert_eq!(req.form_value("user").as_deref(), Some("body"));
        assert_eq!(req.form_value("pass").as_deref(), Some("s3cr!t"));
        assert_eq!(req.form_value("page").as_deref(), Some("2"));
    }

    #[test]
    fn form_ignores_non_form_bodies() {
        let req = Request::new(http::Method::POST, "/login").with_body("user=body");
        assert_eq!(req.form_value("user"), None);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = Request::new(http::Method::GET, "/")
            .with_header(HeaderName::from_static("x-request-id"), HeaderValue::from_static("abc"));
        assert_eq!(req.header("X-Request-Id"), Some("abc"));
    }
}

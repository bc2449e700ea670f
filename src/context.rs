//! Per-request context handed to every controller and middleware.

use crate::request::Request;
use crate::response::Response;
use crate::tree::Params;

/// The request being served and the response being built for it.
///
/// One context exists per request and is dropped when the request completes;
/// it is never shared between requests.
#[derive(Debug)]
pub struct Context {
    request: Request,
    response: Response,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self { request, response: Response::default() }
    }

    pub fn request(&self) -> &Request { &self.request }
    pub fn response(&self) -> &Response { &self.response }
    pub fn response_mut(&mut self) -> &mut Response { &mut self.response }

    /// Shortcut for `ctx.request().param(name)`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.request.param(name)
    }

    pub fn into_response(self) -> Response {
        self.response
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.request.set_params(params);
    }
}

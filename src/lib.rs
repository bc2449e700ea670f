//! # fresco
//!
//! A small HTTP framework built around a segment-trie router with
//! before/after middleware.
//!
//! ## Routing
//!
//! Paths are split on `/`. A segment written `:name` captures whatever the
//! request has at that position, percent-decoded; any other segment must
//! match literally. At every level a literal segment beats a capture, and a level
//! holds at most one capture, so each request matches at most one route.
//!
//! ## Pipeline
//!
//! Each route runs `before` middleware, its controller, then `after`
//! middleware. The first step that returns a [`Failure`] stops the request.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use fresco::{Config, Context, Failure, Outcome, Registrar, Rest, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fresco::Error> {
//!     let mut router = Router::new();
//!     router.get("/todos/:todoUuid", single).before(auth);
//!     router
//!         .resource("tests", Rest::new().list(list).create(create))
//!         .expect("valid resource");
//!
//!     let config = Config::discover(&std::env::current_dir()?)?;
//!     Server::from_config(&config).serve(router).await
//! }
//!
//! fn auth(ctx: &mut Context) -> Outcome {
//!     match ctx.request().header("authorization") {
//!         Some(_) => Ok(()),
//!         None => Err(Failure::with_status(StatusCode::UNAUTHORIZED, "missing token")),
//!     }
//! }
//!
//! fn single(ctx: &mut Context) -> Outcome {
//!     let id = ctx.param("todoUuid").unwrap_or_default().to_owned();
//!     ctx.response_mut().json(StatusCode::OK, &serde_json::json!({ "uuid": id }))
//! }
//!
//! fn list(ctx: &mut Context) -> Outcome {
//!     ctx.response_mut().json(StatusCode::OK, &["Buy milk", "Car wash"])
//! }
//!
//! fn create(ctx: &mut Context) -> Outcome {
//!     let title: String = ctx.request().json()?;
//!     ctx.response_mut().json(StatusCode::CREATED, &title)
//! }
//! ```

mod context;
mod error;
mod handler;
mod method;
mod request;
mod resource;
mod response;
mod router;
mod server;
mod tree;

pub mod config;
pub mod middleware;

pub use config::Config;
pub use context::Context;
pub use error::{DispatchError, Error, Failure, Outcome, RouteError};
pub use handler::Handler;
pub use http::StatusCode;
pub use method::{Method, UnsupportedMethod};
pub use middleware::Phase;
pub use request::Request;
pub use resource::{Resource, Rest};
pub use response::{ContentType, Response};
pub use router::{Group, Registrar, RouteHandle, RouteInfo, Router};
pub use server::Server;
pub use tree::Params;

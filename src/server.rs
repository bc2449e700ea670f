//! HTTP server and graceful shutdown.
//!
//! The server owns everything around the router: it accepts connections,
//! collects each request body, builds the [`Context`], calls
//! [`Router::dispatch`], and turns the outcome into a wire response.
//!
//! | outcome                              | response                                   |
//! |--------------------------------------|--------------------------------------------|
//! | `Ok(())`                             | whatever the pipeline wrote to the context |
//! | [`DispatchError::NotFound`](crate::DispatchError::NotFound) | `404 Not Found` |
//! | middleware or controller failure     | failure's status hint, else `500`, message as text |
//!
//! On SIGTERM or Ctrl-C the server stops accepting, asks every open
//! connection to finish its current request, and waits up to the configured
//! shutdown timeout before aborting whatever is left.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::context::Context;
use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

enum Listen {
    Addr(String),
    Listener(TcpListener),
}

/// The HTTP server.
pub struct Server {
    listen: Listen,
    shutdown_timeout: Duration,
}

impl Server {
    /// Configures the server to bind to `addr` (`host:port`, host names are
    /// resolved) when [`serve`](Server::serve) is called.
    ///
    /// ```rust,no_run
    /// use fresco::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: impl Into<String>) -> Self {
        Self { listen: Listen::Addr(addr.into()), shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT }
    }

    /// Address and shutdown timeout from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self::bind(config.addr()).shutdown_timeout(config.shutdown_timeout())
    }

    /// Serves on an already bound listener.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { listen: Listen::Listener(listener), shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT }
    }

    /// How long in-flight requests may take to finish after shutdown begins.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a graceful shutdown (SIGTERM or Ctrl-C).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but shuts down when `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()> + Send,
    ) -> Result<(), Error> {
        let listener = match self.listen {
            Listen::Addr(addr) => TcpListener::bind(addr).await?,
            Listen::Listener(listener) => listener,
        };

        for route in router.routes() {
            info!(method = %route.method, path = %route.path, before = route.before, after = route.after, "route");
        }

        // From here on the router is shared and read-only.
        let router = Arc::new(router);
        info!(addr = %listener.local_addr()?, "fresco listening");

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let mut stop = stop_rx.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { handle(&router, req).await }
                        });

                        let builder = ConnBuilder::new(TokioExecutor::new());
                        let conn = builder.serve_connection(io, svc);
                        tokio::pin!(conn);

                        let result = tokio::select! {
                            res = conn.as_mut() => res,
                            _ = stop.changed() => {
                                conn.as_mut().graceful_shutdown();
                                conn.await
                            }
                        };
                        if let Err(e) = result {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        stop_tx.send_replace(true);
        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(abandoned = tasks.len(), "shutdown timeout elapsed, aborting connections");
            tasks.shutdown().await;
        }

        info!("fresco stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

async fn handle(
    router: &Router,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("reading request body: {e}");
            return Ok(plain(StatusCode::BAD_REQUEST, "unreadable request body").into_http());
        }
    };
    Ok(respond(router, Request::from_parts(parts, body)).into_http())
}

/// Routes one collected request and translates the outcome into a response.
pub(crate) fn respond(router: &Router, request: Request) -> Response {
    // Methods the router cannot register are indistinguishable from
    // unregistered ones.
    let Ok(method) = Method::try_from(request.method()) else {
        return plain(StatusCode::NOT_FOUND, "");
    };
    let path = request.path().to_owned();
    let mut ctx = Context::new(request);

    match router.dispatch(method, &path, &mut ctx) {
        Ok(()) => ctx.into_response(),
        Err(err) => match err.failure() {
            None => plain(StatusCode::NOT_FOUND, ""),
            Some(failure) => plain(
                failure.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                failure.message(),
            ),
        },
    }
}

fn plain(status: StatusCode, message: &str) -> Response {
    let mut res = Response::default();
    if message.is_empty() {
        res.set_status(status);
    } else {
        res.text(status, message);
    }
    res
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). On Windows only Ctrl-C
/// is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Failure, Outcome};
    use crate::router::Registrar;

    fn hello(ctx: &mut Context) -> Outcome {
        ctx.response_mut().text(StatusCode::OK, "hello");
        Ok(())
    }

    fn unauthorized(_: &mut Context) -> Outcome {
        Err(Failure::with_status(StatusCode::UNAUTHORIZED, "missing token"))
    }

    fn broken(_: &mut Context) -> Outcome {
        Err(Failure::new("database unavailable"))
    }

    fn router() -> Router {
        let mut router = Router::new();
        router.get("/hello", hello);
        router.get("/private", hello).before(unauthorized);
        router.get("/broken", broken);
        router
    }

    #[test]
    fn success_returns_the_context_response() {
        let res = respond(&router(), Request::new(http::Method::GET, "/hello"));
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), b"hello");
    }

    #[test]
    fn unknown_route_method_and_verb_are_404() {
        let router = router();
        for (method, path) in [
            (http::Method::GET, "/nope"),
            (http::Method::POST, "/hello"),
            (http::Method::HEAD, "/hello"),
        ] {
            let res = respond(&router, Request::new(method, path));
            assert_eq!(res.status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn failure_status_hint_is_used() {
        let res = respond(&router(), Request::new(http::Method::GET, "/private"));
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.body(), b"missing token");
    }

    #[test]
    fn failure_without_hint_is_500() {
        let res = respond(&router(), Request::new(http::Method::GET, "/broken"));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body(), b"database unavailable");
    }
}

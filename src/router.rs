//! Segment-trie request router.
//!
//! Build it once at startup, then hand it to [`Server::serve`](crate::Server::serve).
//! Registration needs `&mut Router`; dispatch only needs `&Router`, so once the
//! server has wrapped the router in an `Arc` the tree can no longer change and
//! concurrent requests read it without locks.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{DispatchError, RouteError};
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::{Layers, Phase, Pipeline};
use crate::resource::{Resource, Rest};
use crate::tree::{NodeId, Params, RouteTree};

type GroupId = usize;

/// A controller with its middleware, registered for one method at one node.
struct Endpoint {
    controller: BoxedHandler,
    layers: Layers,
    group: Option<GroupId>,
}

/// The handler table stored at every tree node.
type HandlerTable = HashMap<Method, Endpoint>;

struct GroupState {
    prefix: String,
    layers: Layers,
}

/// One line of the route table, as logged when the server starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: Method,
    pub path: String,
    /// Before-middleware count, group middleware included.
    pub before: usize,
    /// After-middleware count, group middleware included.
    pub after: usize,
}

/// The application router.
///
/// ```rust
/// use fresco::{Context, Outcome, Registrar, Router};
///
/// fn list(_ctx: &mut Context) -> Outcome { Ok(()) }
/// fn single(_ctx: &mut Context) -> Outcome { Ok(()) }
///
/// let mut router = Router::new();
/// router.get("/todos", list);
/// router.get("/todos/:todoUuid", single);
/// ```
#[derive(Default)]
pub struct Router {
    tree: RouteTree<HandlerTable>,
    groups: Vec<GroupState>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a group of routes sharing `prefix` and a set of middleware.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        let id = self.groups.len();
        self.groups.push(GroupState { prefix: prefix.to_owned(), layers: Layers::default() });
        Group { router: self, id }
    }

    /// Routes one request: matches `path`, picks the handler for `method`,
    /// and runs its pipeline against `ctx`.
    ///
    /// An unknown path and a known path without a handler for `method` both
    /// return [`DispatchError::NotFound`]. Captured parameters are stored on
    /// the request only when a handler was found.
    pub fn dispatch(&self, method: Method, path: &str, ctx: &mut Context) -> Result<(), DispatchError> {
        let mut params = Params::new();
        let endpoint = self
            .tree
            .lookup(path, &mut params)
            .and_then(|node| self.tree.get(node).get(&method));
        let Some(endpoint) = endpoint else {
            debug!(%method, path, "no route");
            return Err(DispatchError::NotFound);
        };

        ctx.set_params(params);
        let pipeline = Pipeline {
            group: endpoint.group.map(|g| &self.groups[g].layers),
            route: &endpoint.layers,
            controller: &endpoint.controller,
        };
        pipeline.run(ctx).inspect_err(|e| {
            warn!(%method, path, error = %e, "request pipeline failed");
        })
    }

    /// Every registered handler record, in match order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut routes = Vec::new();
        for node in self.tree.walk() {
            let table = self.tree.get(node);
            let mut methods: Vec<_> = table.keys().copied().collect();
            methods.sort();
            for method in methods {
                let endpoint = &table[&method];
                let group = endpoint.group.map(|g| &self.groups[g].layers);
                routes.push(RouteInfo {
                    method,
                    path: self.tree.path_of(node),
                    before: endpoint.layers.before.len() + group.map_or(0, |g| g.before.len()),
                    after: endpoint.layers.after.len() + group.map_or(0, |g| g.after.len()),
                });
            }
        }
        routes
    }

    fn insert_endpoint(
        &mut self,
        group: Option<GroupId>,
        method: Method,
        path: &str,
        controller: BoxedHandler,
    ) -> Result<NodeId, RouteError> {
        let node = self.tree.insert(path)?;
        // A second registration replaces the record, middleware included.
        self.tree
            .get_mut(node)
            .insert(method, Endpoint { controller, layers: Layers::default(), group });
        debug!(%method, path, "route registered");
        Ok(node)
    }

    pub(crate) fn attach(&mut self, routes: &[(NodeId, Method)], phase: Phase, handler: &BoxedHandler) {
        for (node, method) in routes {
            if let Some(endpoint) = self.tree.get_mut(*node).get_mut(method) {
                endpoint.layers.push(phase, BoxedHandler::clone(handler));
            }
        }
    }
}

// ── Registrar ─────────────────────────────────────────────────────────────────

/// Route registration, shared by [`Router`] and [`Group`].
///
/// Paths are `/`-separated; `:name` segments capture a parameter, every other
/// segment is literal. Leading and trailing slashes are ignored. Request
/// paths are percent-decoded segment by segment before matching.
///
/// The per-method helpers panic on an invalid route, since that is a bug in
/// the program's startup code. Use [`route`](Registrar::route) to handle the
/// error instead.
pub trait Registrar: private::Sealed {
    #[doc(hidden)]
    fn register_boxed(
        &mut self,
        method: Method,
        path: &str,
        controller: BoxedHandler,
    ) -> Result<RouteHandle<'_>, RouteError>;

    #[doc(hidden)]
    fn router_mut(&mut self) -> &mut Router;

    /// Registers `controller` for `method` + `path`, replacing any earlier
    /// registration of the same pair.
    fn route(&mut self, method: Method, path: &str, controller: impl Handler) -> Result<RouteHandle<'_>, RouteError> {
        self.register_boxed(method, path, controller.into_boxed_handler())
    }

    fn get(&mut self, path: &str, controller: impl Handler) -> RouteHandle<'_> {
        expect_route(self.route(Method::Get, path, controller))
    }

    fn post(&mut self, path: &str, controller: impl Handler) -> RouteHandle<'_> {
        expect_route(self.route(Method::Post, path, controller))
    }

    fn put(&mut self, path: &str, controller: impl Handler) -> RouteHandle<'_> {
        expect_route(self.route(Method::Put, path, controller))
    }

    fn patch(&mut self, path: &str, controller: impl Handler) -> RouteHandle<'_> {
        expect_route(self.route(Method::Patch, path, controller))
    }

    fn delete(&mut self, path: &str, controller: impl Handler) -> RouteHandle<'_> {
        expect_route(self.route(Method::Delete, path, controller))
    }

    fn trace(&mut self, path: &str, controller: impl Handler) -> RouteHandle<'_> {
        expect_route(self.route(Method::Trace, path, controller))
    }

    fn options(&mut self, path: &str, controller: impl Handler) -> RouteHandle<'_> {
        expect_route(self.route(Method::Options, path, controller))
    }

    /// Registers the conventional REST handlers of `rest` under `base`.
    ///
    /// The member segment is the literal `{name}`, where `name` is the last
    /// component of `base`: for `"todos"` it is `{todos}`. Being literal, it
    /// coexists with a `:param` route on the same base.
    ///
    /// | handler  | method         | path              |
    /// |----------|----------------|-------------------|
    /// | `list`   | `GET`          | `base`            |
    /// | `create` | `POST`         | `base/{member}`   |
    /// | `update` | `PUT`, `PATCH` | `base/{member}`   |
    /// | `delete` | `DELETE`       | `base/{member}`   |
    fn resource(&mut self, base: &str, rest: Rest) -> Result<Resource<'_>, RouteError> {
        let mut routes = Vec::new();
        for (method, path, controller) in rest.plan(base)? {
            routes.push(self.register_boxed(method, &path, controller)?.key());
        }
        Ok(Resource::new(self.router_mut(), routes))
    }
}

fn expect_route(result: Result<RouteHandle<'_>, RouteError>) -> RouteHandle<'_> {
    result.unwrap_or_else(|e| panic!("invalid route: {e}"))
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Router {}
    impl Sealed for super::Group<'_> {}
}

impl Registrar for Router {
    fn register_boxed(
        &mut self,
        method: Method,
        path: &str,
        controller: BoxedHandler,
    ) -> Result<RouteHandle<'_>, RouteError> {
        let node = self.insert_endpoint(None, method, path, controller)?;
        Ok(RouteHandle { router: self, node, method })
    }

    fn router_mut(&mut self) -> &mut Router {
        self
    }
}

// ── RouteHandle ───────────────────────────────────────────────────────────────

/// Returned by every registration; attaches middleware to that one route.
///
/// ```rust
/// # use fresco::{Context, Outcome, Registrar, Router};
/// # fn list(_: &mut Context) -> Outcome { Ok(()) }
/// # fn auth(_: &mut Context) -> Outcome { Ok(()) }
/// # fn audit(_: &mut Context) -> Outcome { Ok(()) }
/// let mut router = Router::new();
/// router.get("/todos", list).before(auth).after(audit);
/// ```
pub struct RouteHandle<'r> {
    router: &'r mut Router,
    node: NodeId,
    method: Method,
}

impl RouteHandle<'_> {
    /// Appends a middleware that runs before the controller.
    pub fn before(self, middleware: impl Handler) -> Self {
        self.push(Phase::Before, middleware)
    }

    /// Appends a middleware that runs after a successful controller.
    pub fn after(self, middleware: impl Handler) -> Self {
        self.push(Phase::After, middleware)
    }

    fn push(self, phase: Phase, middleware: impl Handler) -> Self {
        let key = self.key();
        self.router.attach(&[key], phase, &middleware.into_boxed_handler());
        self
    }

    pub(crate) fn key(&self) -> (NodeId, Method) {
        (self.node, self.method)
    }
}

// ── Group ─────────────────────────────────────────────────────────────────────

/// Routes registered under a common prefix, with shared middleware.
///
/// Group middleware wraps route middleware: group before-middleware runs
/// first, group after-middleware runs last. Middleware added to the group
/// applies to every route of the group, including routes registered earlier.
///
/// ```rust
/// # use fresco::{Context, Outcome, Registrar, Router};
/// # fn list(_: &mut Context) -> Outcome { Ok(()) }
/// # fn single(_: &mut Context) -> Outcome { Ok(()) }
/// # fn filter(_: &mut Context) -> Outcome { Ok(()) }
/// let mut router = Router::new();
/// let mut todos = router.group("/todos");
/// todos.before(filter).after(filter);
/// todos.get("/", list);
/// todos.get(":todoUuid", single);
/// ```
pub struct Group<'r> {
    router: &'r mut Router,
    id: GroupId,
}

impl Group<'_> {
    pub fn before(&mut self, middleware: impl Handler) -> &mut Self {
        self.router.groups[self.id].layers.push(Phase::Before, middleware.into_boxed_handler());
        self
    }

    pub fn after(&mut self, middleware: impl Handler) -> &mut Self {
        self.router.groups[self.id].layers.push(Phase::After, middleware.into_boxed_handler());
        self
    }
}

impl Registrar for Group<'_> {
    fn register_boxed(
        &mut self,
        method: Method,
        path: &str,
        controller: BoxedHandler,
    ) -> Result<RouteHandle<'_>, RouteError> {
        let full = format!("{}/{}", self.router.groups[self.id].prefix, path);
        let node = self.router.insert_endpoint(Some(self.id), method, &full, controller)?;
        Ok(RouteHandle { router: &mut *self.router, node, method })
    }

    fn router_mut(&mut self) -> &mut Router {
        &mut *self.router
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::{Failure, Outcome};
    use crate::request::Request;

    fn ctx(path: &str) -> Context {
        Context::new(Request::new(http::Method::GET, path))
    }

    fn ok(_: &mut Context) -> Outcome {
        Ok(())
    }

    fn deny(_: &mut Context) -> Outcome {
        Err(Failure::new("denied"))
    }

    fn counter(hits: &Arc<AtomicUsize>) -> impl Handler + use<> {
        let hits = Arc::clone(hits);
        move |_: &mut Context| -> Outcome {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn re_registration_replaces_controller_and_middleware() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let mut router = Router::new();
        router.get("/x", counter(&first)).before(deny);
        router.get("/x", counter(&second));

        assert_eq!(router.dispatch(Method::Get, "/x", &mut ctx("/x")), Ok(()));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn params_are_stored_on_the_request() {
        let mut router = Router::new();
        router.get("/todos/:todoUuid/tests/:testUuid", |ctx: &mut Context| -> Outcome {
            let body = format!("{}:{}", ctx.param("todoUuid").unwrap_or(""), ctx.param("testUuid").unwrap_or(""));
            ctx.response_mut().text(http::StatusCode::OK, body);
            Ok(())
        });

        let mut c = ctx("/todos/a1/tests/b2");
        router.dispatch(Method::Get, "/todos/a1/tests/b2", &mut c).unwrap();
        assert_eq!(c.response().body(), b"a1:b2");
    }

    #[test]
    fn missing_method_is_not_found() {
        let mut router = Router::new();
        router.get("/todos", ok);
        assert_eq!(
            router.dispatch(Method::Delete, "/todos", &mut ctx("/todos")),
            Err(DispatchError::NotFound)
        );
        assert_eq!(
            router.dispatch(Method::Get, "/nope", &mut ctx("/nope")),
            Err(DispatchError::NotFound)
        );
    }

    #[test]
    fn intermediate_nodes_have_no_handlers() {
        let mut router = Router::new();
        router.get("/a/b", ok);
        assert_eq!(router.dispatch(Method::Get, "/a", &mut ctx("/a")), Err(DispatchError::NotFound));
    }

    #[test]
    fn route_reports_conflicting_parameters() {
        let mut router = Router::new();
        router.get("/todos/:id", ok);
        assert!(matches!(
            router.route(Method::Get, "/todos/:uuid", ok),
            Err(RouteError::ConflictingParameter { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn helpers_panic_on_invalid_route() {
        Router::new().get("/todos/:", ok);
    }

    #[test]
    fn group_prefixes_paths_and_wraps_route_middleware() {
        let mut router = Router::new();
        {
            let mut todos = router.group("/todos");
            todos.get("/", ok).before(ok);
            todos.get(":todoUuid", ok).after(ok);
            todos.before(ok).after(ok).after(ok);
        }
        router.get("/tests", ok);

        assert_eq!(
            router.routes(),
            vec![
                RouteInfo { method: Method::Get, path: "/tests".into(), before: 0, after: 0 },
                RouteInfo { method: Method::Get, path: "/todos".into(), before: 2, after: 2 },
                RouteInfo { method: Method::Get, path: "/todos/:todoUuid".into(), before: 1, after: 3 },
            ]
        );
    }

    #[test]
    fn group_before_runs_even_for_routes_registered_earlier() {
        let mut router = Router::new();
        {
            let mut admin = router.group("admin");
            admin.get("stats", ok);
            admin.before(deny);
        }
        assert!(matches!(
            router.dispatch(Method::Get, "/admin/stats", &mut ctx("/admin/stats")),
            Err(DispatchError::Middleware { phase: Phase::Before, .. })
        ));
    }

    #[test]
    fn routes_lists_methods_in_stable_order() {
        let mut router = Router::new();
        router.delete("/x", ok);
        router.get("/x", ok);
        router.options("/x", ok);
        let methods: Vec<_> = router.routes().into_iter().map(|r| r.method).collect();
        assert_eq!(methods, [Method::Get, Method::Delete, Method::Options]);
    }
}

//! REST resource bundles: up to four conventional handlers under one base path.

use crate::error::RouteError;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::Phase;
use crate::router::Router;
use crate::tree::{NodeId, segments};

/// The handlers of a resource. Missing handlers are simply not registered.
///
/// ```rust
/// # use fresco::{Context, Outcome, Registrar, Rest, Router};
/// # fn list(_: &mut Context) -> Outcome { Ok(()) }
/// # fn create(_: &mut Context) -> Outcome { Ok(()) }
/// # fn update(_: &mut Context) -> Outcome { Ok(()) }
/// # fn remove(_: &mut Context) -> Outcome { Ok(()) }
/// # fn auth(_: &mut Context) -> Outcome { Ok(()) }
/// let mut router = Router::new();
/// router
///     .resource("todos", Rest::new().list(list).create(create).update(update).delete(remove))
///     .unwrap()
///     .before(auth);
/// ```
#[derive(Default)]
pub struct Rest {
    list: Option<BoxedHandler>,
    create: Option<BoxedHandler>,
    update: Option<BoxedHandler>,
    delete: Option<BoxedHandler>,
}

impl Rest {
    pub fn new() -> Self {
        Self::default()
    }

    /// `GET base`
    pub fn list(mut self, controller: impl Handler) -> Self {
        self.list = Some(controller.into_boxed_handler());
        self
    }

    /// `POST base/{member}`
    pub fn create(mut self, controller: impl Handler) -> Self {
        self.create = Some(controller.into_boxed_handler());
        self
    }

    /// `PUT base/{member}` and `PATCH base/{member}`
    pub fn update(mut self, controller: impl Handler) -> Self {
        self.update = Some(controller.into_boxed_handler());
        self
    }

    /// `DELETE base/{member}`
    pub fn delete(mut self, controller: impl Handler) -> Self {
        self.delete = Some(controller.into_boxed_handler());
        self
    }

    /// The (method, path, controller) triples to register under `base`.
    pub(crate) fn plan(self, base: &str) -> Result<Vec<(Method, String, BoxedHandler)>, RouteError> {
        let collection = base.trim_matches('/');
        let name = segments(collection).last().unwrap_or_default();
        let member = format!("{collection}/{{{name}}}");
        if name.is_empty() {
            return Err(RouteError::EmptyParameterName { path: member });
        }

        let mut plan = Vec::with_capacity(5);
        if let Some(h) = self.list {
            plan.push((Method::Get, collection.to_owned(), h));
        }
        if let Some(h) = self.create {
            plan.push((Method::Post, member.clone(), h));
        }
        if let Some(h) = self.update {
            plan.push((Method::Put, member.clone(), BoxedHandler::clone(&h)));
            plan.push((Method::Patch, member.clone(), h));
        }
        if let Some(h) = self.delete {
            plan.push((Method::Delete, member, h));
        }
        Ok(plan)
    }
}

/// Handle over every route a resource registered. Middleware added here is
/// attached to each of them, in the same order.
pub struct Resource<'r> {
    router: &'r mut Router,
    routes: Vec<(NodeId, Method)>,
}

impl<'r> Resource<'r> {
    pub(crate) fn new(router: &'r mut Router, routes: Vec<(NodeId, Method)>) -> Self {
        Self { router, routes }
    }

    pub fn before(self, middleware: impl Handler) -> Self {
        self.push(Phase::Before, middleware)
    }

    pub fn after(self, middleware: impl Handler) -> Self {
        self.push(Phase::After, middleware)
    }

    /// Methods registered, in registration order.
    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.routes.iter().map(|&(_, method)| method)
    }

    fn push(self, phase: Phase, middleware: impl Handler) -> Self {
        self.router.attach(&self.routes, phase, &middleware.into_boxed_handler());
        self
    }
}

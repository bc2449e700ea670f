//! Middleware pipeline.
//!
//! A matched handler record runs in three phases:
//!
//! ```text
//! group before → route before → controller → route after → group after
//! ```
//!
//! The first step that returns a [`Failure`](crate::Failure) ends the request:
//! nothing after it runs, and the failure is returned tagged with where it
//! happened. There are no retries.

use std::fmt;

use crate::context::Context;
use crate::error::DispatchError;
use crate::handler::BoxedHandler;

/// Which middleware list a failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Before,
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before => "before",
            Self::After => "after",
        })
    }
}

/// Ordered before/after middleware lists, owned by a route or a group.
#[derive(Default)]
pub(crate) struct Layers {
    pub(crate) before: Vec<BoxedHandler>,
    pub(crate) after: Vec<BoxedHandler>,
}

impl Layers {
    pub(crate) fn push(&mut self, phase: Phase, handler: BoxedHandler) {
        match phase {
            Phase::Before => self.before.push(handler),
            Phase::After => self.after.push(handler),
        }
    }
}

/// Everything needed to run one request through one handler record.
pub(crate) struct Pipeline<'a> {
    pub(crate) group: Option<&'a Layers>,
    pub(crate) route: &'a Layers,
    pub(crate) controller: &'a BoxedHandler,
}

impl Pipeline<'_> {
    pub(crate) fn run(&self, ctx: &mut Context) -> Result<(), DispatchError> {
        let group_before = self.group.map(|g| g.before.as_slice()).unwrap_or_default();
        let group_after = self.group.map(|g| g.after.as_slice()).unwrap_or_default();

        run_phase(Phase::Before, group_before.iter().chain(&self.route.before), ctx)?;
        self.controller.call(ctx).map_err(DispatchError::Controller)?;
        run_phase(Phase::After, self.route.after.iter().chain(group_after), ctx)
    }
}

fn run_phase<'h>(
    phase: Phase,
    handlers: impl Iterator<Item = &'h BoxedHandler>,
    ctx: &mut Context,
) -> Result<(), DispatchError> {
    for handler in handlers {
        handler
            .call(ctx)
            .map_err(|failure| DispatchError::Middleware { phase, failure })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::{Failure, Outcome};
    use crate::handler::Handler;
    use crate::request::Request;

    type Trace = Arc<Mutex<Vec<&'static str>>>;

    fn step(trace: &Trace, name: &'static str, fail: bool) -> BoxedHandler {
        let trace = Arc::clone(trace);
        let f = move |_: &mut Context| -> Outcome {
            trace.lock().unwrap().push(name);
            if fail { Err(Failure::new(name)) } else { Ok(()) }
        };
        f.into_boxed_handler()
    }

    fn ctx() -> Context {
        Context::new(Request::new(http::Method::GET, "/"))
    }

    fn layers(before: Vec<BoxedHandler>, after: Vec<BoxedHandler>) -> Layers {
        Layers { before, after }
    }

    #[test]
    fn runs_group_and_route_layers_in_order() {
        let trace = Trace::default();
        let group = layers(
            vec![step(&trace, "group-before", false)],
            vec![step(&trace, "group-after", false)],
        );
        let route = layers(
            vec![step(&trace, "before-1", false), step(&trace, "before-2", false)],
            vec![step(&trace, "after", false)],
        );
        let controller = step(&trace, "controller", false);

        let pipeline = Pipeline { group: Some(&group), route: &route, controller: &controller };
        assert_eq!(pipeline.run(&mut ctx()), Ok(()));
        assert_eq!(
            *trace.lock().unwrap(),
            ["group-before", "before-1", "before-2", "controller", "after", "group-after"]
        );
    }

    #[test]
    fn failing_before_skips_controller_and_after() {
        let trace = Trace::default();
        let route = layers(
            vec![step(&trace, "deny", true), step(&trace, "never", false)],
            vec![step(&trace, "after", false)],
        );
        let controller = step(&trace, "controller", false);

        let pipeline = Pipeline { group: None, route: &route, controller: &controller };
        assert_eq!(
            pipeline.run(&mut ctx()),
            Err(DispatchError::Middleware { phase: Phase::Before, failure: Failure::new("deny") })
        );
        assert_eq!(*trace.lock().unwrap(), ["deny"]);
    }

    #[test]
    fn failing_controller_skips_after() {
        let trace = Trace::default();
        let route = layers(vec![], vec![step(&trace, "after", false)]);
        let controller = step(&trace, "controller", true);

        let pipeline = Pipeline { group: None, route: &route, controller: &controller };
        assert_eq!(
            pipeline.run(&mut ctx()),
            Err(DispatchError::Controller(Failure::new("controller")))
        );
        assert_eq!(*trace.lock().unwrap(), ["controller"]);
    }

    #[test]
    fn failing_after_stops_remaining_after() {
        let trace = Trace::default();
        let group = layers(vec![], vec![step(&trace, "group-after", false)]);
        let route = layers(vec![], vec![step(&trace, "after", true)]);
        let controller = step(&trace, "controller", false);

        let pipeline = Pipeline { group: Some(&group), route: &route, controller: &controller };
        assert_eq!(
            pipeline.run(&mut ctx()),
            Err(DispatchError::Middleware { phase: Phase::After, failure: Failure::new("after") })
        );
        assert_eq!(*trace.lock().unwrap(), ["controller", "after"]);
    }
}

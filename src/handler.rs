//! Handler trait and type erasure.
//!
//! Controllers and middleware share one shape: a function that receives the
//! request [`Context`] and either lets the request continue or stops it with a
//! [`Failure`](crate::Failure).
//!
//! ```text
//! fn auth(ctx: &mut Context) -> Outcome { … }     ← user writes this
//!        ↓ router.get("/", list).before(auth)
//! auth.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(auth))                       ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(&mut ctx)  at request time         ← one vtable dispatch
//! ```
//!
//! Handlers are synchronous: by the time the pipeline runs, the server has
//! already collected the body, and the response is written after the pipeline
//! returns. Nothing inside the pipeline waits on I/O.
//!
//! Closures must spell out their argument type so the compiler picks the
//! higher-ranked signature: `|ctx: &mut Context| -> Outcome { … }`.

use std::sync::Arc;

use crate::context::Context;
use crate::error::Outcome;

// ── Internal types ────────────────────────────────────────────────────────────

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: &mut Context) -> Outcome;
}

/// A type-erased handler shared by every request, and by every route a
/// resource or group attaches it to.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid controller and middleware.
///
/// You never implement this yourself. It is satisfied by any function with
/// the signature:
///
/// ```text
/// fn name(ctx: &mut Context) -> Outcome
/// ```
///
/// The trait is sealed: only the blanket impls below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F> private::Sealed for F where F: Fn(&mut Context) -> Outcome + Send + Sync + 'static {}

impl<F> Handler for F
where
    F: Fn(&mut Context) -> Outcome + Send + Sync + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F> ErasedHandler for FnHandler<F>
where
    F: Fn(&mut Context) -> Outcome + Send + Sync,
{
    fn call(&self, ctx: &mut Context) -> Outcome {
        (self.0)(ctx)
    }
}

//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! Routes and middleware are the same thing here: a function that receives
//! the request [`Context`] and either writes a response, calls
//! [`Context::next`] to run the rest of the chain, or both. The route table
//! and the group registry both need to hold handlers of *different* concrete
//! types in one collection, so every handler is erased behind
//! `dyn ErasedHandler` once, at registration:
//!
//! ```text
//! fn hello(ctx: &mut Context) { … }           ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_boxed_handler()                  ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                  ← stored as BoxedHandler
//!        ↓
//! handler.call(&mut ctx)  at request time     ← one vtable dispatch
//! ```
//!
//! A request's chain is a `Vec<BoxedHandler>` assembled from `Arc` clones,
//! so building it costs one atomic increment per handler.

use std::sync::Arc;

use crate::context::Context;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: &mut Context);
}

/// A type-erased handler shared by the routing table and every request whose
/// chain includes it.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler and middleware.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the signature:
///
/// ```text
/// fn name(ctx: &mut Context)
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F> private::Sealed for F where F: Fn(&mut Context) + Send + Sync + 'static {}

impl<F> Handler for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F> ErasedHandler for FnHandler<F>
where
    F: Fn(&mut Context) + Send + Sync,
{
    fn call(&self, ctx: &mut Context) {
        (self.0)(ctx);
    }
}

//! Panic containment for a request's chain.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};

use http::StatusCode;
use tracing::error;

use crate::context::Context;
use crate::handler::Handler;

/// Catches a panic from any handler downstream and answers `500` with
/// `{"message":"Internal Server Error"}`.
///
/// Register it first on the root group so it wraps everything else. Whatever
/// the failing chain had already written is discarded, and the panic message
/// plus a backtrace is logged at `error`. Only this request is affected; the
/// routing table is read-only while serving, so nothing shared is left half
/// updated.
///
/// No panic hook is installed, so the default hook still prints its own line
/// to stderr, and that line carries the panic location. The logged trace
/// shows where the panic was caught, starting below this guard.
pub fn recovery() -> impl Handler {
    |ctx: &mut Context| {
        let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| ctx.next())) else {
            return;
        };
        let message = panic_message(payload.as_ref());
        error!(
            method = %ctx.method(),
            path = %ctx.path(),
            "{}",
            trace(&message)
        );
        ctx.reset_response();
        ctx.abort(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

// Captured where the unwind stopped, i.e. inside this guard.
fn trace(message: &str) -> String {
    let backtrace = Backtrace::force_capture().to_string();
    format!(
        "{message}\nTraceback (from the recovery guard; the panic hook on stderr reports the panic site):\n{}",
        skip_guard_frames(&backtrace)
    )
}

/// Drops the leading frames up to and including the last one that belongs to
/// this module. Returns the input untouched if no such run is found.
fn skip_guard_frames(backtrace: &str) -> &str {
    let mut offset = 0;
    let mut in_guard = false;
    for line in backtrace.split_inclusive('\n') {
        if is_frame_header(line) {
            let guard = line.contains(module_path!());
            if in_guard && !guard {
                return &backtrace[offset..];
            }
            in_guard |= guard;
        }
        offset += line.len();
    }
    backtrace
}

// "  12: some::symbol"
fn is_frame_header(line: &str) -> bool {
    line.trim_start()
        .split_once(": ")
        .is_some_and(|(n, _)| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use http::HeaderMap;
    use serde_json::{Value, json};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{self, SubscriberExt};
    use tracing_subscriber::Layer;

    use super::*;
    use crate::handler::BoxedHandler;
    use crate::request::Request;

    fn boxed(f: impl Fn(&mut Context) + Send + Sync + 'static) -> BoxedHandler {
        f.into_boxed_handler()
    }

    fn run(handlers: Vec<BoxedHandler>) -> crate::Response {
        let req = Request::new(http::Method::GET, "/boom".parse().unwrap(), HeaderMap::new(), Bytes::new());
        let mut ctx = Context::new(req, "/boom".to_owned(), None, HashMap::new(), handlers, None);
        ctx.next();
        ctx.into_response()
    }

    #[test]
    fn panic_becomes_500() {
        let after = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&after);
        let res = run(vec![
            recovery().into_boxed_handler(),
            boxed(|ctx| {
                ctx.string(StatusCode::OK, "partial");
                panic!("exploded");
            }),
            boxed(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        ]);

        assert_eq!(after.load(Ordering::SeqCst), 0);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body, json!({ "message": "Internal Server Error" }));
    }

    #[test]
    fn nested_guards_convert_once() {
        let res = run(vec![
            recovery().into_boxed_handler(),
            recovery().into_boxed_handler(),
            boxed(|_| panic!("once")),
        ]);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body_text().lines().count(), 1);
    }

    #[test]
    fn passes_through_when_nothing_panics() {
        let res = run(vec![
            recovery().into_boxed_handler(),
            boxed(|ctx| ctx.string(StatusCode::OK, "fine")),
        ]);
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body_text(), "fine");
    }

    /// Collects (level, message) for every event it sees.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<(Level, String)>>>);

    impl<S: Subscriber> Layer<S> for Captured {
        fn on_event(&self, event: &Event<'_>, _ctx: layer::Context<'_, S>) {
            let mut message = MessageField(String::new());
            event.record(&mut message);
            self.0.lock().unwrap().push((*event.metadata().level(), message.0));
        }
    }

    struct MessageField(String);

    impl Visit for MessageField {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    #[test]
    fn logs_one_error_with_message_and_trace() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());

        let res = tracing::subscriber::with_default(subscriber, || {
            run(vec![
                recovery().into_boxed_handler(),
                recovery().into_boxed_handler(),
                boxed(|_| panic!("disk on fire")),
            ])
        });
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let events = captured.0.lock().unwrap();
        let errors: Vec<&String> = events
            .iter()
            .filter(|(level, _)| *level == Level::ERROR)
            .map(|(_, message)| message)
            .collect();
        assert_eq!(errors.len(), 1, "{events:?}");
        assert!(errors[0].starts_with("disk on fire\n"));
        assert!(errors[0].contains("Traceback"));
    }

    #[test]
    fn trims_leading_guard_frames() {
        let backtrace = [
            "   0: std::backtrace::Backtrace::force_capture\n",
            "   1: weft::middleware::recovery::trace\n",
            "             at ./src/middleware/recovery.rs:54:21\n",
            "   2: weft::middleware::recovery::recovery::{{closure}}\n",
            "   3: weft::context::Context::next\n",
            "   4: weft::router::Router::handle\n",
        ]
        .concat();
        assert_eq!(
            skip_guard_frames(&backtrace),
            "   3: weft::context::Context::next\n   4: weft::router::Router::handle\n"
        );

        let foreign = "   0: main\n   1: start\n";
        assert_eq!(skip_guard_frames(foreign), foreign);
    }

    #[test]
    fn extracts_panic_messages() {
        let from_str: Box<dyn Any + Send> = Box::new("static");
        let from_string: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(from_str.as_ref()), "static");
        assert_eq!(panic_message(from_string.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}

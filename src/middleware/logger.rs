use std::time::Instant;

use tracing::info;

use crate::context::Context;
use crate::handler::Handler;

/// Logs method, path, final status and latency once the rest of the chain
/// has run.
pub fn logger() -> impl Handler {
    |ctx: &mut Context| {
        let started = Instant::now();
        ctx.next();
        info!(
            method = %ctx.method(),
            path = %ctx.path(),
            status = ctx.status_code().as_u16(),
            elapsed = ?started.elapsed(),
            "request"
        );
    }
}

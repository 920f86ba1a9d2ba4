//! Minimal weft example: grouped middleware, parameters, aborts and a panic.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/hello/alice
//!   curl http://localhost:3000/api/users/42
//!   curl -H 'authorization: t' http://localhost:3000/api/users/42
//!   curl -X POST -d 'name=bob' -H 'authorization: t' http://localhost:3000/api/users
//!   curl http://localhost:3000/panic
//!   curl http://localhost:3000/files/Cargo.toml

use serde_json::json;
use weft::{Context, Router, Server, StatusCode, middleware};

#[tokio::main]
async fn main() -> Result<(), weft::Error> {
    tracing_subscriber::fmt::init();

    let mut app = Router::new();
    app.middleware(middleware::logger())
        .middleware(middleware::recovery());
    app.get("/hello/:name", hello)?
        .get("/panic", boom)?
        .static_files("/files", ".")?;

    let mut api = app.group("/api");
    api.middleware(require_token);
    api.get("/users/:id", get_user)?
        .post("/users", create_user)?;

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

// GET /hello/:name
fn hello(ctx: &mut Context) {
    let name = ctx.param("name").unwrap_or_default().to_owned();
    ctx.string(StatusCode::OK, format_args!("hello {name}\n"));
}

// every /api route goes through here first
fn require_token(ctx: &mut Context) {
    if ctx.header("authorization").is_none() {
        ctx.abort(StatusCode::UNAUTHORIZED, "missing authorization header");
    }
}

// GET /api/users/:id
fn get_user(ctx: &mut Context) {
    let id = ctx.param("id").unwrap_or_default().to_owned();
    ctx.json(StatusCode::OK, &json!({ "id": id, "name": "alice" }));
}

// POST /api/users  (form body: name=...)
fn create_user(ctx: &mut Context) {
    let Some(name) = ctx.post_form("name") else {
        ctx.abort(StatusCode::BAD_REQUEST, "name is required");
        return;
    };
    ctx.set_header("location", "/api/users/99");
    ctx.json(StatusCode::CREATED, &json!({ "id": "99", "name": name }));
}

// GET /panic → 500, and the server keeps going
fn boom(_ctx: &mut Context) {
    let items: Vec<u32> = Vec::new();
    let _ = items[3];
}

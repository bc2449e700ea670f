//! Todo API demo: a REST resource, a group with shared middleware, and
//! nested parameters.
//!
//! Run with:
//!   cargo run --example todos
//!
//! The port comes from `fresco.toml` in the working directory, or is random
//! (see the "fresco listening" log line). Try:
//!   curl localhost:$PORT/todos
//!   curl localhost:$PORT/todos/car%20wash
//!   curl -X POST 'localhost:$PORT/todos/%7Btodos%7D' -d '{"title":"Car wash"}'
//!   curl -H 'authorization: Bearer demo' localhost:$PORT/tests/t1/todos/d2

use fresco::{Config, Context, Failure, Outcome, Registrar, Rest, Router, Server, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct Todo {
    #[serde(default)]
    uuid: String,
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), fresco::Error> {
    tracing_subscriber::fmt::init();

    let mut router = Router::new();
    router
        .resource("todos", Rest::new().list(list).create(create).update(create).delete(delete))
        .expect("todos resource")
        .after(no_store);
    router.get("/todos/:todoUuid", single).after(no_store);

    {
        let mut tests = router.group("/tests");
        tests.before(require_token);
        tests.get("/", list);
        tests.get(":testUuid", single);
        tests.get(":testUuid/todos/:todosUuid", single);
    }

    let config = Config::discover(&std::env::current_dir()?)?;
    Server::from_config(&config).serve(router).await
}

fn list(ctx: &mut Context) -> Outcome {
    let todos = [
        Todo { uuid: "1".into(), title: "Buy milk".into() },
        Todo { uuid: "2".into(), title: "Car wash".into() },
    ];
    ctx.response_mut().json(StatusCode::OK, &todos)
}

fn single(ctx: &mut Context) -> Outcome {
    let uuid = ctx
        .param("todosUuid")
        .or_else(|| ctx.param("todoUuid"))
        .or_else(|| ctx.param("testUuid"))
        .unwrap_or_default()
        .to_owned();
    ctx.response_mut().json(StatusCode::OK, &Todo { uuid, title: "Buy milk".into() })
}

fn create(ctx: &mut Context) -> Outcome {
    let mut todo: Todo = ctx.request().json()?;
    todo.uuid = fastrand::u64(..).to_string();
    ctx.response_mut().json(StatusCode::CREATED, &todo)
}

fn delete(ctx: &mut Context) -> Outcome {
    ctx.response_mut().set_status(StatusCode::NO_CONTENT);
    Ok(())
}

fn require_token(ctx: &mut Context) -> Outcome {
    match ctx.request().header("authorization") {
        Some(v) if v.starts_with("Bearer ") => Ok(()),
        _ => Err(Failure::with_status(StatusCode::UNAUTHORIZED, "missing bearer token")),
    }
}

fn no_store(ctx: &mut Context) -> Outcome {
    ctx.response_mut().header(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-store"),
    );
    Ok(())
}

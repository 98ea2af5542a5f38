//! Example demonstrating lifecycle hooks.
//!
//! This example shows how to:
//! - Implement `HttpCallbackHandler`
//! - Observe successes, failures and cancellations
//! - Read the call context from a hook
//!
//! Run with: `cargo run --example lifecycle_handler`

use outcall::{
    ApiResponse, CallContext, Client, Envelope, HttpCallbackHandler, RequestMetadata, Signal,
};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[allow(dead_code)]
struct Todo {
    id: u32,
    title: String,
    completed: bool,
}

type TodoResponse = Envelope<Todo>;

struct ConsoleHandler;

impl HttpCallbackHandler<TodoResponse> for ConsoleHandler {
    fn on_success(&self, response: &TodoResponse, context: &CallContext) {
        println!("  [success] {} {} -> {:?}", context.method(), context.url(), response.title);
    }

    fn on_failed(&self, response: &TodoResponse, context: &CallContext) {
        let code = response.api_result().map(|r| r.result_code().name()).unwrap_or("NONE");
        println!("  [failed] {} {} -> {}", context.method(), context.url(), code);
    }

    fn after_finished(&self, signal: Signal, context: &CallContext) {
        println!(
            "  [finished] {:?} after {} attempt(s) in {:?}",
            signal,
            context.attempts(),
            context.elapsed()
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("outcall=debug,lifecycle_handler=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .retry_count(1)
        .build()?;
    let handler: &dyn HttpCallbackHandler<TodoResponse> = &ConsoleHandler;

    println!("=== Successful call ===");
    let metadata = RequestMetadata::new(http::Method::GET, "/todos/{id}").with_path_variable("id", 1);
    client.call_with_handler::<(), _>(metadata, None, Some(handler)).await?;

    println!("=== Failed call ===");
    let metadata = RequestMetadata::new(http::Method::GET, "/todos/0");
    client.call_with_handler::<(), _>(metadata, None, Some(handler)).await?;

    println!("=== Cancelled call ===");
    let metadata = RequestMetadata::new(http::Method::GET, "/todos");
    let call = client.call_with_handler::<(), _>(metadata, None, Some(handler));
    if tokio::time::timeout(Duration::from_millis(1), call).await.is_err() {
        println!("  Gave up waiting");
    }

    Ok(())
}

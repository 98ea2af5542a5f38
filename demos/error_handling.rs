//! Example demonstrating how failures surface.
//!
//! This example shows how to:
//! - Inspect the result code of a failed call
//! - Read the server's error body from the failure detail
//! - Deal with deserialization failures
//! - Tell network failures apart from HTTP errors
//! - Catch requests that cannot be built
//!
//! Run with: `cargo run --example error_handling`

use outcall::{ApiResponse, ApiResultCode, Client, Envelope, RequestMetadata};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[allow(dead_code)]
struct Post {
    id: u32,
    title: String,
}

fn describe<R: ApiResponse>(response: &R) {
    match response.api_result() {
        Some(result) => {
            println!("  Code: {}", result.code());
            println!("  Message: {}", result.message());
            println!("  Message (ko): {}", result.message_ko());
            println!("  Status: {:?}", result.status());
            println!("  Failure message: {:?}", result.failure_message());
            println!("  Failure detail: {:?}", result.failure_detail());
        }
        None => println!("  No result attached"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("outcall=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .retry_count(2)
        .retry_delay(Duration::from_millis(500))
        .build()?;

    println!("=== Example 1: HTTP Errors ===");
    let missing: Envelope<Post> = client.get("/posts/999999").await?;
    println!("Success: {}", missing.is_success());
    describe(&missing);
    println!();

    println!("=== Example 2: Deserialization Errors ===");
    #[derive(Debug, Default, Deserialize)]
    #[allow(dead_code)]
    struct WrongSchema {
        nonexistent_field: String,
    }

    let wrong: Envelope<WrongSchema> = client.get("/posts/1").await?;
    if wrong.api_result().map(|r| r.result_code()) == Some(ApiResultCode::FailedToDeserialize) {
        println!("Deserialization failed, the body did not match the schema.");
    }
    describe(&wrong);
    println!();

    println!("=== Example 3: Network Errors ===");
    let bad_client = Client::builder()
        .base_url("https://this-domain-does-not-exist-12345.com")?
        .build()?;

    let unreachable: Envelope<serde_json::Value> = bad_client.get("/").await?;
    describe(&unreachable);
    println!();

    println!("=== Example 4: Requests That Cannot Be Built ===");
    let metadata = RequestMetadata::new(http::Method::GET, "/posts/{postId}");
    match client.call::<(), Envelope<Post>>(metadata, None).await {
        Ok(_) => println!("Unexpected success"),
        Err(failure) => {
            println!("Failure: {}", failure);
            println!("  Code: {}", failure.result().code());
            println!("  Answer with status: {}", failure.http_status());
            println!(
                "  Safe to expose: {}",
                serde_json::to_string(&failure.result().redacted())?
            );
        }
    }

    Ok(())
}

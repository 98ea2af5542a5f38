//! Basic example demonstrating simple GET and POST requests.
//!
//! This example shows how to:
//! - Create a client with basic configuration
//! - Make GET requests to fetch data
//! - Make POST requests to create data
//! - Read the result attached to every response
//!
//! Run with: `cargo run --example basic_call`

use outcall::{ApiResponse, Client, Envelope, ListResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("outcall=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .build()?;

    println!("=== GET Request Example ===");
    let post: Envelope<Post> = client.get("/posts/1").await?;

    println!("Post ID: {}", post.id);
    println!("Title: {}", post.title);
    println!("Body: {}", post.body);
    if let Some(result) = post.api_result() {
        println!("Result: {} ({})", result.code(), result.message());
        println!("Status code: {:?}", result.status());
    }
    println!();

    println!("=== GET List Example ===");
    let posts: ListResponse<Post> = client.get("/posts").await?;
    println!("Fetched {} posts, success: {}", posts.len(), posts.is_success());
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };

    let created: Envelope<Post> = client.post("/posts", &new_post).await?;

    println!("Created post ID: {}", created.id);
    println!("Title: {}", created.title);
    println!();

    println!("=== Accessing Response Metadata ===");
    if let Some(result) = created.api_result() {
        let content_type = result
            .response_headers()
            .and_then(|headers| headers.get("content-type"));
        println!("Content-Type: {:?}", content_type);
        println!("As JSON: {}", serde_json::to_string(result)?);
    }

    Ok(())
}

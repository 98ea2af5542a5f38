//! # Outcall - an HTTP API client that always settles
//!
//! Outcall issues HTTP requests, classifies the answers, retries failed
//! attempts with exponential backoff, and decodes bodies into typed
//! envelopes. Every call ends in exactly one typed response carrying an
//! [`ApiResult`], whether it succeeded, was rejected by the server, or never
//! reached it. An optional [`HttpCallbackHandler`] observes each outcome.
//!
//! ## Quick Start
//!
//! ```no_run
//! use outcall::{ApiResponse, Client, Envelope};
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//!     email: String,
//! }
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//!     email: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .timeout(Duration::from_secs(30))
//!         .retry_count(3)
//!         .retry_delay(Duration::from_millis(500))
//!         .build()?;
//!
//!     let user: Envelope<User> = client.get("/users/123").await?;
//!     if user.is_success() {
//!         println!("User: {}", user.name);
//!     } else if let Some(result) = user.api_result() {
//!         println!("Failed with {}: {}", result.code(), result.message());
//!     }
//!
//!     let new_user = CreateUser {
//!         name: "Alice".to_string(),
//!         email: "alice@example.com".to_string(),
//!     };
//!     let created: Envelope<User> = client.post("/users", &new_user).await?;
//!     println!("Created user with ID: {}", created.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Outcomes
//!
//! | what happened                        | result code                                  |
//! |--------------------------------------|----------------------------------------------|
//! | 1xx/2xx/3xx, body decoded            | `SUCCESS`                                    |
//! | 400                                  | `INVALID_PARAMETER`                          |
//! | 401, 403                             | `INVALID_AUTH`                               |
//! | other 4xx, 5xx                       | `INVALID_RESPONSE`                           |
//! | body does not decode                 | `FAILED_TO_DESERIALIZE`                      |
//! | retries ran out on another failure   | `EXHAUSTED_RETIRES`                          |
//! | read timeout / handshake timeout     | `CONNECTION_TIMEOUT` / `CONNECTION_FAIL`     |
//! | DNS failure, refused connection      | `INVALID_NETWORK`                            |
//! | anything else                        | `INVALID_SYSTEM`                             |
//!
//! ## Lifecycle hooks
//!
//! ```no_run
//! use outcall::{
//!     ApiResponse, CallContext, Client, Envelope, HttpCallbackHandler, RequestMetadata, Signal,
//! };
//!
//! struct Logger;
//!
//! impl HttpCallbackHandler<Envelope<serde_json::Value>> for Logger {
//!     fn on_failed(&self, response: &Envelope<serde_json::Value>, context: &CallContext) {
//!         eprintln!("{} failed: {:?}", context.url(), response.api_result());
//!     }
//!
//!     fn after_finished(&self, signal: Signal, context: &CallContext) {
//!         eprintln!("{:?} in {:?}", signal, context.elapsed());
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let client = Client::builder().base_url("https://api.example.com")?.build()?;
//! let metadata = RequestMetadata::new(http::Method::GET, "/status");
//! let _status: Envelope<serde_json::Value> = client
//!     .call_with_handler::<(), Envelope<serde_json::Value>>(metadata, None, Some(&Logger))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod callback;
mod classify;
mod client;
mod error;
pub mod metadata;
mod pipeline;
mod resolve;
mod response;
mod result;
pub mod retry;
pub mod transport;

pub use callback::{CallContext, HttpCallbackHandler, Signal};
pub use classify::classify;
pub use client::{Client, ClientBuilder};
pub use error::{find_classified, BoxError, ClassifiedFailure, Error, Fault, Result, TransportError};
pub use metadata::RequestMetadata;
pub use pipeline::execute;
pub use resolve::resolve;
pub use response::{
    convert_response, ApiResponse, BodyFormat, Envelope, ListResponse, MapResponse, StringBody,
};
pub use result::{ApiResult, ApiResultCode};
pub use retry::RetryPolicy;

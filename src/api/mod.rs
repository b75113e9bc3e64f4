//! HTTP API
//!
//! - `GET /health`: liveness, plain text
//! - `GET /version`: agent CLI version
//! - `POST /prompt`: one-shot prompt
//!
//! Everything else is a JSON 404.

pub mod error;
pub mod health;
pub mod prompt;
pub mod version;

use agentpty_core::{AgentClient, PromptOptions};
use axum::{Extension, Router};
use std::sync::Arc;

pub use error::ApiError;
pub use health::health_routes;
pub use prompt::prompt_routes;
pub use version::version_routes;

/// State shared by the handlers
#[derive(Clone)]
pub struct ApiState {
    /// Agent the requests are forwarded to
    pub agent: Arc<dyn AgentClient>,
    /// Model and working directory used when a request names none
    pub defaults: PromptOptions,
}

impl ApiState {
    pub fn new(agent: Arc<dyn AgentClient>, defaults: PromptOptions) -> Self {
        Self { agent, defaults }
    }
}

/// Create the API router with all endpoints
pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(version_routes())
        .merge(prompt_routes())
        .fallback(not_found)
        .layer(Extension(state))
}

pub(crate) async fn not_found() -> ApiError {
    ApiError::not_found()
}

//! One-shot prompt endpoint
//!
//! The body is read leniently: anything that is not a JSON object counts as
//! an empty one, `text` wins over `prompt`, and non-string prompt values are
//! sent in their JSON form.

use super::{not_found, ApiError, ApiState};
use agentpty_core::PromptOptions;
use axum::body::Bytes;
use axum::extract::Extension;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub output: String,
}

/// Fields read from a `/prompt` body
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PromptRequest {
    pub text: Option<String>,
    pub model: Option<String>,
    pub path: Option<PathBuf>,
}

impl PromptRequest {
    pub fn parse(body: &[u8]) -> Self {
        let fields = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => {
                debug!(error = %e, "Unparsable prompt body, treating as empty");
                Map::new()
            }
        };

        let text = present(&fields, "text")
            .or_else(|| present(&fields, "prompt"))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        let model = present(&fields, "model")
            .and_then(Value::as_str)
            .map(str::to_string);
        let path = present(&fields, "path")
            .and_then(Value::as_str)
            .map(PathBuf::from);

        Self { text, model, path }
    }

    /// Request options, falling back to `defaults` for anything not given.
    pub fn options(&self, defaults: &PromptOptions) -> PromptOptions {
        PromptOptions {
            model: self.model.clone().or_else(|| defaults.model.clone()),
            path: self.path.clone().or_else(|| defaults.path.clone()),
        }
    }
}

fn present<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|v| !v.is_null())
}

async fn send_prompt(
    Extension(state): Extension<ApiState>,
    body: Bytes,
) -> Result<Json<PromptResponse>, ApiError> {
    let request = PromptRequest::parse(&body);
    let text = request
        .text
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing required field: text"))?;

    let output = state
        .agent
        .prompt(text, &request.options(&state.defaults))
        .await?;
    Ok(Json(PromptResponse { output }))
}

/// Create prompt routes
pub fn prompt_routes() -> Router {
    Router::new().route("/prompt", post(send_prompt).fallback(not_found))
}

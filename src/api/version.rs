//! Agent version endpoint

use super::{not_found, ApiError, ApiState};
use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
}

async fn agent_version(
    Extension(state): Extension<ApiState>,
) -> Result<Json<VersionResponse>, ApiError> {
    let version = state.agent.version().await?;
    Ok(Json(VersionResponse { version }))
}

/// Create version routes
pub fn version_routes() -> Router {
    Router::new().route("/version", get(agent_version).fallback(not_found))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{app, body_json, get};
    use agentpty_core::testing::MockAgent;
    use agentpty_core::PromptOptions;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_version_reports_agent_version() {
        let agent = MockAgent::new().with_version("2025.08.08-f57cb59");
        let response = app(&agent, PromptOptions::default())
            .oneshot(get("/version"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "version": "2025.08.08-f57cb59" })
        );
    }
}

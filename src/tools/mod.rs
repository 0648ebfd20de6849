//! MCP tool implementations.
//!
//! Each tool is a thin pass-through to the Azure DevOps REST API:
//!
//! - `projects` - Team projects (1 tool)
//! - `work_items` - Work item tracking (1 tool)
//! - `repositories` - Git repositories (1 tool)
//! - `pipelines` - Build definitions (1 tool)

pub mod pipelines;
pub mod projects;
pub mod repositories;
pub mod work_items;

use serde::Serialize;
use std::sync::Arc;

use crate::devops::{DevOpsClient, DevOpsClientFactory};
use crate::error::Result;
use crate::mcp::handler::{error_result, success_result, McpHandler};
use crate::mcp::protocol::ToolResult;

/// Register all tools with the handler.
pub fn register_all_tools(handler: &mut McpHandler, factory: Arc<DevOpsClientFactory>) {
    handler.register(projects::ListProjectsTool::new(factory.clone()));
    handler.register(work_items::GetWorkItemTool::new(factory.clone()));
    handler.register(repositories::ListRepositoriesTool::new(factory.clone()));
    handler.register(pipelines::GetBuildDefinitionsTool::new(factory));
}

/// Get a freshly authenticated client, or the tool result describing why not.
async fn connect(factory: &DevOpsClientFactory) -> std::result::Result<DevOpsClient, ToolResult> {
    factory.client().await.map_err(|e| {
        error_result(format!(
            "Failed to authenticate with Azure DevOps: {}",
            e
        ))
    })
}

/// Render an API payload as a pretty-printed JSON tool result.
fn json_result<T: Serialize>(value: &T) -> Result<ToolResult> {
    Ok(success_result(serde_json::to_string_pretty(value)?))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Stub Azure DevOps server and token provider shared by tool tests.

    use async_trait::async_trait;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::auth::{AccessToken, TokenProvider};
    use crate::devops::DevOpsClientFactory;
    use crate::error::{Error, Result};
    use crate::mcp::protocol::{ContentBlock, ToolResult};

    pub struct StaticProvider {
        pub signed_in: bool,
    }

    #[async_trait]
    impl TokenProvider for StaticProvider {
        fn name(&self) -> &str {
            "StaticProvider"
        }

        async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
            if !self.signed_in {
                return Err(Error::CredentialUnavailable("not signed in".to_string()));
            }
            Ok(AccessToken::new("stub-token", Utc::now() + Duration::hours(1)))
        }
    }

    /// Serve a stub of the Azure DevOps REST API and return a factory for it.
    pub async fn stub_factory() -> Arc<DevOpsClientFactory> {
        async fn projects(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
            let top = query.get("$top").cloned().unwrap_or_default();
            Json(json!({
                "count": 2,
                "value": [
                    { "id": "p1", "name": "Fabrikam", "description": format!("top={}", top) },
                    { "id": "p2", "name": "Contoso" }
                ]
            }))
        }

        async fn work_item(Path(id): Path<u64>) -> (StatusCode, Json<Value>) {
            if id == 404 {
                return (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "message": "TF401232: Work item 404 does not exist" })),
                );
            }
            (
                StatusCode::OK,
                Json(json!({ "id": id, "rev": 3, "fields": { "System.Title": "Fix login" } })),
            )
        }

        async fn project_work_item(Path((project, id)): Path<(String, u64)>) -> Json<Value> {
            Json(json!({
                "id": id,
                "rev": 1,
                "fields": { "System.TeamProject": project }
            }))
        }

        async fn repositories(Path(project): Path<String>) -> Json<Value> {
            Json(json!({
                "count": 1,
                "value": [{ "id": "r1", "name": format!("{}-repo", project), "defaultBranch": "refs/heads/main" }]
            }))
        }

        async fn definitions(
            Path(project): Path<String>,
            Query(query): Query<HashMap<String, String>>,
        ) -> Json<Value> {
            let name = query
                .get("name")
                .cloned()
                .unwrap_or_else(|| format!("{}-ci", project));
            Json(json!({
                "count": 1,
                "value": [{ "id": 12, "name": name, "path": "\\" }]
            }))
        }

        let app = Router::new()
            .route("/_apis/projects", get(projects))
            .route("/_apis/wit/workitems/{id}", get(work_item))
            .route("/{project}/_apis/wit/workitems/{id}", get(project_work_item))
            .route("/{project}/_apis/git/repositories", get(repositories))
            .route("/{project}/_apis/build/definitions", get(definitions));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Arc::new(DevOpsClientFactory::new(
            format!("http://{}", addr),
            Arc::new(StaticProvider { signed_in: true }),
        ))
    }

    /// Factory whose token provider always fails.
    pub fn signed_out_factory() -> Arc<DevOpsClientFactory> {
        Arc::new(DevOpsClientFactory::new(
            "http://127.0.0.1:9",
            Arc::new(StaticProvider { signed_in: false }),
        ))
    }

    pub fn text(result: &ToolResult) -> &str {
        let ContentBlock::Text { text } = &result.content[0];
        text
    }
}

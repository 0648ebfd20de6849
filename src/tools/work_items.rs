//! Work item tracking tools.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::devops::DevOpsClientFactory;
use crate::error::Result;
use crate::mcp::handler::{error_result, get_optional_string_arg, get_u64_arg, ToolHandler};
use crate::mcp::protocol::{Tool, ToolResult};

use super::{connect, json_result};

/// Get work item tool.
pub struct GetWorkItemTool {
    factory: Arc<DevOpsClientFactory>,
}

impl GetWorkItemTool {
    pub fn new(factory: Arc<DevOpsClientFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl ToolHandler for GetWorkItemTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "wit_get_work_item".to_string(),
            description: "Get a single work item by ID, including all fields and relations."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "integer",
                        "description": "The ID of the work item to retrieve"
                    },
                    "project": {
                        "type": "string",
                        "description": "The name or ID of the project that owns the work item"
                    }
                },
                "required": ["id"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let id = get_u64_arg(&args, "id")?;
        let project = get_optional_string_arg(&args, "project");

        let client = match connect(&self.factory).await {
            Ok(client) => client,
            Err(result) => return Ok(result),
        };

        match client.get_work_item(id, project.as_deref()).await {
            Ok(item) => json_result(&item),
            Err(e) => Ok(error_result(format!("Failed to get work item {}: {}", id, e))),
        }
    }
}

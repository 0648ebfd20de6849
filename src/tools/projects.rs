//! Team project tools.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::devops::DevOpsClientFactory;
use crate::error::Result;
use crate::mcp::handler::{error_result, get_optional_u32_arg, ToolHandler};
use crate::mcp::protocol::{Tool, ToolResult};

use super::{connect, json_result};

/// List projects tool.
pub struct ListProjectsTool {
    factory: Arc<DevOpsClientFactory>,
}

impl ListProjectsTool {
    pub fn new(factory: Arc<DevOpsClientFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl ToolHandler for ListProjectsTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "core_list_projects".to_string(),
            description: "Retrieve a list of projects in your Azure DevOps organization.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "top": {
                        "type": "integer",
                        "description": "The maximum number of projects to return"
                    },
                    "skip": {
                        "type": "integer",
                        "description": "The number of projects to skip for pagination"
                    }
                }
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let top = get_optional_u32_arg(&args, "top");
        let skip = get_optional_u32_arg(&args, "skip");

        let client = match connect(&self.factory).await {
            Ok(client) => client,
            Err(result) => return Ok(result),
        };

        match client.list_projects(top, skip).await {
            Ok(projects) => json_result(&projects.value),
            Err(e) => Ok(error_result(format!("Failed to list projects: {}", e))),
        }
    }
}

//! Build pipeline tools.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::devops::DevOpsClientFactory;
use crate::error::Result;
use crate::mcp::handler::{error_result, get_optional_string_arg, get_string_arg, ToolHandler};
use crate::mcp::protocol::{Tool, ToolResult};

use super::{connect, json_result};

/// Get build definitions tool.
pub struct GetBuildDefinitionsTool {
    factory: Arc<DevOpsClientFactory>,
}

impl GetBuildDefinitionsTool {
    pub fn new(factory: Arc<DevOpsClientFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl ToolHandler for GetBuildDefinitionsTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "pipelines_get_build_definitions".to_string(),
            description: "Retrieve the build definitions of a project, optionally filtered by name."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "project": {
                        "type": "string",
                        "description": "The name or ID of the project"
                    },
                    "name": {
                        "type": "string",
                        "description": "Only return definitions with this name"
                    }
                },
                "required": ["project"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let project = get_string_arg(&args, "project")?;
        let name = get_optional_string_arg(&args, "name");

        let client = match connect(&self.factory).await {
            Ok(client) => client,
            Err(result) => return Ok(result),
        };

        match client.list_build_definitions(&project, name.as_deref()).await {
            Ok(definitions) => json_result(&definitions.value),
            Err(e) => Ok(error_result(format!(
                "Failed to get build definitions for {}: {}",
                project, e
            ))),
        }
    }
}

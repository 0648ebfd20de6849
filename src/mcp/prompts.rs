//! MCP Prompt Templates
//!
//! Pre-defined prompts that steer an assistant towards the Azure DevOps tools.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};

/// A prompt argument definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// A prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// A prompt message (the actual content).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: PromptContent,
}

/// Prompt content types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptContent {
    Text { text: String },
}

/// Result of prompts/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Result of prompts/get.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptResult {
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// Template for generating prompt messages.
///
/// Supports `{{name}}` substitution and `{{#if name}}...{{/if}}` blocks.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Render the template against the given arguments.
    ///
    /// The template is scanned once from left to right; substituted values
    /// are copied verbatim and never expanded again.
    pub fn render(&self, arguments: &HashMap<String, String>) -> String {
        render_segment(&self.template, arguments)
    }
}

const IF_OPEN: &str = "{{#if ";
const IF_CLOSE: &str = "{{/if}}";

fn render_segment(template: &str, arguments: &HashMap<String, String>) -> String {
    let mut text = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        text.push_str(&rest[..start]);
        let tag = &rest[start..];

        if let Some(after) = tag.strip_prefix(IF_OPEN) {
            // {{#if key}}content{{/if}}
            let block = after.find("}}").and_then(|key_end| {
                let body = &after[key_end + 2..];
                body.find(IF_CLOSE).map(|end| {
                    (
                        after[..key_end].trim(),
                        &body[..end],
                        &body[end + IF_CLOSE.len()..],
                    )
                })
            });
            let Some((key, body, remainder)) = block else {
                rest = tag;
                break;
            };
            if arguments.get(key).is_some_and(|v| !v.is_empty()) {
                text.push_str(&render_segment(body, arguments));
            }
            rest = remainder;
        } else if let Some(end) = tag.find("}}") {
            match arguments.get(tag[2..end].trim()) {
                Some(value) => text.push_str(value),
                None => text.push_str(&tag[..end + 2]),
            }
            rest = &tag[end + 2..];
        } else {
            break;
        }
    }

    text.push_str(rest);
    text
}

/// Prompt registry.
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    prompts: BTreeMap<String, (Prompt, PromptTemplate)>,
}

impl PromptRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prompt.
    pub fn register(&mut self, prompt: Prompt, template: PromptTemplate) {
        self.prompts.insert(prompt.name.clone(), (prompt, template));
    }

    /// List all prompts.
    pub fn list(&self) -> Vec<Prompt> {
        self.prompts.values().map(|(p, _)| p.clone()).collect()
    }

    /// Get the number of registered prompts.
    pub fn prompt_count(&self) -> usize {
        self.prompts.len()
    }

    /// Get a prompt by name with arguments substituted.
    pub fn get(&self, name: &str, arguments: &HashMap<String, String>) -> Result<GetPromptResult> {
        let (prompt, template) = self
            .prompts
            .get(name)
            .ok_or_else(|| Error::PromptNotFound(name.to_string()))?;

        for arg in prompt.arguments.iter().filter(|a| a.required) {
            if arguments.get(&arg.name).map_or(true, |v| v.is_empty()) {
                return Err(Error::InvalidArguments(format!(
                    "Missing required prompt argument: {}",
                    arg.name
                )));
            }
        }

        Ok(GetPromptResult {
            description: Some(prompt.description.clone()),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: PromptContent::Text {
                    text: template.render(arguments),
                },
            }],
        })
    }
}

/// Register the Azure DevOps prompts.
pub fn configure_prompts(registry: &mut PromptRegistry) {
    registry.register(
        Prompt {
            name: "Projects".to_string(),
            description: "Lists all projects in the Azure DevOps organization.".to_string(),
            arguments: Vec::new(),
        },
        PromptTemplate::new(
            r#"# Task
Use the 'core_list_projects' tool to retrieve all projects in the current Azure DevOps organization.
Present the results in a table with the following columns: Project ID, Name, and Description."#,
        ),
    );

    registry.register(
        Prompt {
            name: "WorkItem".to_string(),
            description: "Retrieves and summarizes an Azure DevOps work item by ID.".to_string(),
            arguments: vec![
                PromptArgument {
                    name: "id".to_string(),
                    description: "The work item ID".to_string(),
                    required: true,
                },
                PromptArgument {
                    name: "project".to_string(),
                    description: "Project that owns the work item (optional)".to_string(),
                    required: false,
                },
            ],
        },
        PromptTemplate::new(
            r#"# Task
Use the 'wit_get_work_item' tool to retrieve work item {{id}}{{#if project}} in project '{{project}}'{{/if}}.
Summarize its title, state, assignee and description, then list any linked work items."#,
        ),
    );
}

//! HTTP client for the Azure DevOps REST API.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::auth::{devops_token, TokenProvider};
use crate::error::{Error, Result};
use crate::VERSION;

use super::types::{BuildDefinition, GitRepository, ListResponse, TeamProject, WorkItem};

/// Product name reported to Azure DevOps.
pub const PRODUCT_NAME: &str = "AzureDevOps.MCP";

/// REST API version sent with every request.
pub const API_VERSION: &str = "7.1";

/// Characters escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// User agent string for API requests.
pub fn user_agent() -> String {
    format!("{}/{} (rust)", PRODUCT_NAME, VERSION)
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Authenticated connection to one organization.
#[derive(Clone)]
pub struct DevOpsClient {
    client: Client,
    org_url: String,
    token: String,
}

impl std::fmt::Debug for DevOpsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevOpsClient")
            .field("org_url", &self.org_url)
            .finish_non_exhaustive()
    }
}

impl DevOpsClient {
    /// Create a client bound to `org_url` using a bearer token.
    pub fn new(org_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            org_url: org_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }


    /// Make an authenticated GET request against a path below the organization.
    pub async fn get<R: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<R> {
        let url = format!("{}/{}", self.org_url, path.trim_start_matches('/'));
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .header("X-TFS-FedAuthRedirect", "Suppress")
            .query(&[("api-version", API_VERSION)])
            .query(query)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle API response, extracting errors.
    async fn handle_response<R: DeserializeOwned>(&self, response: Response) -> Result<R> {
        let status = response.status();

        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("Unknown");
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), status_text, body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("Failed to parse response: {}", e)))
    }

    // ===== API Endpoints =====

    /// List team projects in the organization.
    pub async fn list_projects(
        &self,
        top: Option<u32>,
        skip: Option<u32>,
    ) -> Result<ListResponse<TeamProject>> {
        let mut query = Vec::new();
        if let Some(top) = top {
            query.push(("$top", top.to_string()));
        }
        if let Some(skip) = skip {
            query.push(("$skip", skip.to_string()));
        }
        self.get("_apis/projects", &query).await
    }

    /// Get a single work item with all fields and relations.
    pub async fn get_work_item(&self, id: u64, project: Option<&str>) -> Result<WorkItem> {
        let path = match project {
            Some(project) => format!("{}/_apis/wit/workitems/{}", encode_segment(project), id),
            None => format!("_apis/wit/workitems/{}", id),
        };
        self.get(&path, &[("$expand", "all".to_string())]).await
    }

    /// List Git repositories of a project.
    pub async fn list_repositories(&self, project: &str) -> Result<ListResponse<GitRepository>> {
        let path = format!("{}/_apis/git/repositories", encode_segment(project));
        self.get(&path, &[]).await
    }

    /// List build definitions of a project, optionally filtered by name.
    pub async fn list_build_definitions(
        &self,
        project: &str,
        name: Option<&str>,
    ) -> Result<ListResponse<BuildDefinition>> {
        let path = format!("{}/_apis/build/definitions", encode_segment(project));
        let query: Vec<(&str, String)> = name.map(|n| ("name", n.to_string())).into_iter().collect();
        self.get(&path, &query).await
    }
}

/// Produces a fresh [`DevOpsClient`] per call.
pub struct DevOpsClientFactory {
    org_url: String,
    provider: Arc<dyn TokenProvider>,
}

impl DevOpsClientFactory {
    pub fn new(org_url: impl Into<String>, provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            org_url: org_url.into(),
            provider,
        }
    }

    /// Acquire a new token and build an independent client.
    pub async fn client(&self) -> Result<DevOpsClient> {
        let token = devops_token(self.provider.as_ref()).await?;
        DevOpsClient::new(self.org_url.clone(), token.token)
    }
}

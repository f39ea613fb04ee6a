//! Authenticated Looker API client.
//!
//! [`ApiGateway`] is the seam between the aggregation core and the wire: the
//! production implementation is [`LookerClient`] (reqwest over the 3.x REST
//! API), tests substitute a canned gateway. Every call is a single
//! request/response exchange with the per-request timeout supplied at
//! connect time; nothing here retries, caches or fans out.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{
    AccessToken, ApiSession, ConnectionTestResult, DbConnection, Explore, GitConnectionTest,
    GitTestResult, LegacyFeature, LookmlModel, Project, ProjectFile, WriteQuery,
};

/// Operations the usage aggregator needs from the Looker API.
#[async_trait]
pub trait ApiGateway: Send + Sync {
    async fn all_projects(&self) -> Result<Vec<Project>>;
    async fn all_project_files(&self, project_id: &str) -> Result<Vec<ProjectFile>>;
    async fn all_lookml_models(&self) -> Result<Vec<LookmlModel>>;
    async fn lookml_model(&self, name: &str) -> Result<LookmlModel>;
    async fn lookml_model_explore(&self, model: &str, explore: &str) -> Result<Explore>;
    /// Ad-hoc tabular query against any model, usage log included. Returns
    /// one JSON object per result row.
    async fn run_inline_query(&self, query: &WriteQuery) -> Result<Vec<serde_json::Value>>;
    /// Toggle the session between the "dev" and "production" workspaces.
    async fn update_session(&self, workspace_id: &str) -> Result<()>;
    async fn all_git_connection_tests(&self, project_id: &str) -> Result<Vec<GitConnectionTest>>;
    async fn run_git_connection_test(
        &self,
        project_id: &str,
        test_id: &str,
    ) -> Result<GitTestResult>;
    async fn all_connections(&self) -> Result<Vec<DbConnection>>;
    async fn test_connection(
        &self,
        name: &str,
        tests: &[String],
    ) -> Result<Vec<ConnectionTestResult>>;
    async fn all_legacy_features(&self) -> Result<Vec<LegacyFeature>>;
}

pub struct LookerClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl LookerClient {
    /// Authenticate against `POST /login` and return a ready client.
    ///
    /// Credential errors are fatal here; there is no anonymous mode.
    pub async fn connect(
        host: &str,
        port: u16,
        client_id: &str,
        client_secret: &str,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(concat!("looker-audit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = format!("https://{host}:{port}/api/3.0");

        debug!(host, port, client_id, "POST /login");
        let response = http
            .post(format!("{base_url}/login"))
            .query(&[("client_id", client_id), ("client_secret", client_secret)])
            .send()
            .await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "authentication failed");
            return Err(Error::Api(format!(
                "authentication failed with status {}; check supplied credentials",
                response.status()
            )));
        }
        let token: AccessToken = response.json().await?;

        Ok(Self {
            http,
            base_url,
            token: token.access_token,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "GET");
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ApiGateway for LookerClient {
    async fn all_projects(&self) -> Result<Vec<Project>> {
        self.get("/projects").await
    }

    async fn all_project_files(&self, project_id: &str) -> Result<Vec<ProjectFile>> {
        self.get(&format!("/projects/{project_id}/files")).await
    }

    async fn all_lookml_models(&self) -> Result<Vec<LookmlModel>> {
        self.get("/lookml_models").await
    }

    async fn lookml_model(&self, name: &str) -> Result<LookmlModel> {
        self.get(&format!("/lookml_models/{name}")).await
    }

    async fn lookml_model_explore(&self, model: &str, explore: &str) -> Result<Explore> {
        self.get(&format!("/lookml_models/{model}/explores/{explore}"))
            .await
    }

    async fn run_inline_query(&self, query: &WriteQuery) -> Result<Vec<serde_json::Value>> {
        debug!(model = %query.model, view = %query.view, "POST /queries/run/json");
        let response = self
            .http
            .post(format!("{}/queries/run/json", self.base_url))
            .bearer_auth(&self.token)
            .json(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn update_session(&self, workspace_id: &str) -> Result<()> {
        debug!(workspace_id, "PATCH /session");
        self.http
            .patch(format!("{}/session", self.base_url))
            .bearer_auth(&self.token)
            .json(&ApiSession {
                workspace_id: workspace_id.to_string(),
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn all_git_connection_tests(&self, project_id: &str) -> Result<Vec<GitConnectionTest>> {
        self.get(&format!("/projects/{project_id}/git_connection_tests"))
            .await
    }

    async fn run_git_connection_test(
        &self,
        project_id: &str,
        test_id: &str,
    ) -> Result<GitTestResult> {
        self.get(&format!(
            "/projects/{project_id}/git_connection_tests/{test_id}"
        ))
        .await
    }

    async fn all_connections(&self) -> Result<Vec<DbConnection>> {
        self.get("/connections").await
    }

    async fn test_connection(
        &self,
        name: &str,
        tests: &[String],
    ) -> Result<Vec<ConnectionTestResult>> {
        debug!(connection = name, "PUT /connections/{{name}}/test");
        let response = self
            .http
            .put(format!("{}/connections/{name}/test", self.base_url))
            .bearer_auth(&self.token)
            .query(&[("tests", tests.join(","))])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn all_legacy_features(&self) -> Result<Vec<LegacyFeature>> {
        self.get("/legacy_features").await
    }
}

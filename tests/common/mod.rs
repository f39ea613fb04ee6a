//! Shared test fixtures: a canned [`ApiGateway`] and builders for the
//! metadata objects the aggregator consumes.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

use looker_audit::error::{Error, Result};
use looker_audit::models::{
    ConnectionTestResult, DbConnection, Explore, ExploreField, ExploreFieldset, ExploreRef,
    GitConnectionTest, GitTestResult, LegacyFeature, LookmlModel, Project, ProjectFile, WriteQuery,
};
use looker_audit::ApiGateway;

/// One usage-log row for the formatted-fields/filters query.
#[derive(Debug, Clone, Default)]
pub struct FieldUsageRow {
    pub model: String,
    pub view: String,
    pub formatted_fields: String,
    pub formatted_filters: String,
    pub count: u64,
}

/// In-memory gateway answering from canned data. Inline queries are
/// dispatched on their requested field list, mirroring what the live usage
/// log would return for each aggregator operation, and honor the query's
/// model/view filters.
#[derive(Default)]
pub struct StubGateway {
    pub projects: Vec<Project>,
    pub project_files: HashMap<String, Vec<ProjectFile>>,
    pub models: Vec<LookmlModel>,
    pub explores: Vec<Explore>,
    /// (model name, query count) rows.
    pub model_usage: Vec<(String, u64)>,
    /// (view name, query count) rows.
    pub explore_usage: Vec<(String, u64)>,
    pub field_usage: Vec<FieldUsageRow>,
    pub git_tests: Vec<GitConnectionTest>,
    pub git_results: HashMap<String, GitTestResult>,
    pub connections: Vec<DbConnection>,
    pub connection_results: HashMap<String, Vec<ConnectionTestResult>>,
    pub legacy_features: Vec<LegacyFeature>,
    pub session_log: Mutex<Vec<String>>,
    pub git_run_log: Mutex<Vec<String>>,
}

fn unescape_filter(value: &str) -> String {
    value.replace("^_", "_")
}

#[async_trait]
impl ApiGateway for StubGateway {
    async fn all_projects(&self) -> Result<Vec<Project>> {
        Ok(self.projects.clone())
    }

    async fn all_project_files(&self, project_id: &str) -> Result<Vec<ProjectFile>> {
        Ok(self.project_files.get(project_id).cloned().unwrap_or_default())
    }

    async fn all_lookml_models(&self) -> Result<Vec<LookmlModel>> {
        Ok(self.models.clone())
    }

    async fn lookml_model(&self, name: &str) -> Result<LookmlModel> {
        self.models
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .ok_or_else(|| Error::Api(format!("model {name} not found")))
    }

    async fn lookml_model_explore(&self, model: &str, explore: &str) -> Result<Explore> {
        self.explores
            .iter()
            .find(|e| e.model_name == model && e.name == explore)
            .cloned()
            .ok_or_else(|| Error::Api(format!("explore {model}/{explore} not found")))
    }

    async fn run_inline_query(&self, query: &WriteQuery) -> Result<Vec<serde_json::Value>> {
        // Health checks query the i__looker system model; usage aggregation
        // queries system__activity.
        if query.model == "i__looker" {
            return Ok(Vec::new());
        }

        if query.fields.iter().any(|f| f == "query.formatted_fields") {
            let model_filter = query.filters.get("query.model").map(|f| unescape_filter(f));
            let view_filter = query.filters.get("query.view").map(|f| unescape_filter(f));
            let rows = self
                .field_usage
                .iter()
                .filter(|row| model_filter.as_deref().map_or(true, |m| row.model == m))
                .filter(|row| view_filter.as_deref().map_or(true, |v| row.view == v))
                .map(|row| {
                    json!({
                        "query.model": row.model,
                        "query.view": row.view,
                        "query.formatted_fields": row.formatted_fields,
                        "query.formatted_filters": row.formatted_filters,
                        "history.query_run_count": row.count,
                    })
                })
                .collect();
            return Ok(rows);
        }

        if query.fields.iter().any(|f| f == "query.view") {
            let view_filter = query.filters.get("query.view").cloned();
            let rows = self
                .explore_usage
                .iter()
                .filter(|(view, _)| view_filter.as_deref().map_or(true, |v| view.as_str() == v))
                .map(|(view, count)| {
                    json!({"query.view": view, "history.query_run_count": count})
                })
                .collect();
            return Ok(rows);
        }

        let rows = self
            .model_usage
            .iter()
            .map(|(model, count)| {
                json!({"query.model": model, "history.query_run_count": count})
            })
            .collect();
        Ok(rows)
    }

    async fn update_session(&self, workspace_id: &str) -> Result<()> {
        self.session_log
            .lock()
            .expect("session log poisoned")
            .push(workspace_id.to_string());
        Ok(())
    }

    async fn all_git_connection_tests(&self, _project_id: &str) -> Result<Vec<GitConnectionTest>> {
        Ok(self.git_tests.clone())
    }

    async fn run_git_connection_test(
        &self,
        _project_id: &str,
        test_id: &str,
    ) -> Result<GitTestResult> {
        self.git_run_log
            .lock()
            .expect("git run log poisoned")
            .push(test_id.to_string());
        self.git_results
            .get(test_id)
            .cloned()
            .ok_or_else(|| Error::Api(format!("git test {test_id} not found")))
    }

    async fn all_connections(&self) -> Result<Vec<DbConnection>> {
        Ok(self.connections.clone())
    }

    async fn test_connection(
        &self,
        name: &str,
        _tests: &[String],
    ) -> Result<Vec<ConnectionTestResult>> {
        Ok(self.connection_results.get(name).cloned().unwrap_or_default())
    }

    async fn all_legacy_features(&self) -> Result<Vec<LegacyFeature>> {
        Ok(self.legacy_features.clone())
    }
}

pub fn project(id: &str) -> Project {
    Project {
        id: id.to_string(),
        pull_request_mode: "off".to_string(),
        validation_required: false,
        git_remote_url: None,
    }
}

pub fn model(name: &str, project: &str, has_content: bool, explores: &[&str]) -> LookmlModel {
    LookmlModel {
        name: name.to_string(),
        project_name: project.to_string(),
        has_content,
        explores: explores
            .iter()
            .map(|e| ExploreRef {
                name: e.to_string(),
            })
            .collect(),
    }
}

/// Builds an explore whose scopes are the base name plus `joins`. Fields are
/// (name, hidden) pairs.
pub fn explore(
    model: &str,
    name: &str,
    joins: &[&str],
    dimensions: &[(&str, bool)],
    measures: &[(&str, bool)],
) -> Explore {
    let mut scopes = vec![name.to_string()];
    scopes.extend(joins.iter().map(|j| j.to_string()));
    Explore {
        name: name.to_string(),
        model_name: model.to_string(),
        hidden: false,
        description: None,
        scopes,
        fields: ExploreFieldset {
            dimensions: fields(dimensions),
            measures: fields(measures),
        },
    }
}

fn fields(specs: &[(&str, bool)]) -> Vec<ExploreField> {
    specs
        .iter()
        .map(|(name, hidden)| ExploreField {
            name: name.to_string(),
            hidden: *hidden,
        })
        .collect()
}

pub fn git_test(id: &str) -> GitConnectionTest {
    GitConnectionTest { id: id.to_string() }
}

pub fn git_result(id: &str, status: &str) -> GitTestResult {
    GitTestResult {
        id: id.to_string(),
        status: status.to_string(),
    }
}

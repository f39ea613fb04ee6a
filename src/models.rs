//! Wire shapes for the Looker 3.x REST API.
//!
//! Only the slices of each payload the audit actually reads are modeled;
//! unknown keys are ignored by serde. Two kinds of types live here:
//!
//! - Metadata objects returned by the listing endpoints ([`Project`],
//!   [`LookmlModel`], [`Explore`] and friends). These are read-only: the tool
//!   fetches them, cross-references them against usage-log rows, and never
//!   writes them back.
//! - [`WriteQuery`], the POST body for the ad-hoc inline-query endpoint the
//!   usage aggregation is built on.
//!
//! Usage counts themselves are plain `HashMap<String, u64>` maps keyed by
//! entity name; see [`crate::fetcher`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub pull_request_mode: String,
    #[serde(default)]
    pub validation_required: bool,
    #[serde(default)]
    pub git_remote_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectFile {
    pub id: String,
    /// "model", "view" or any other LookML file kind.
    #[serde(rename = "type", default)]
    pub file_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookmlModel {
    pub name: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub has_content: bool,
    #[serde(default)]
    pub explores: Vec<ExploreRef>,
}

/// Declared explore name inside a model listing. The full explore body needs
/// a separate per-explore fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct ExploreRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Explore {
    pub name: String,
    pub model_name: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// View names visible in this explore: the base view plus every join.
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub fields: ExploreFieldset,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExploreFieldset {
    #[serde(default)]
    pub dimensions: Vec<ExploreField>,
    #[serde(default)]
    pub measures: Vec<ExploreField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExploreField {
    pub name: String,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConnection {
    pub name: String,
    #[serde(default)]
    pub dialect: Option<Dialect>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dialect {
    #[serde(default)]
    pub connection_tests: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionTestResult {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitConnectionTest {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitTestResult {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
}

impl GitTestResult {
    pub fn passed(&self) -> bool {
        self.status == "pass"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyFeature {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiSession {
    pub workspace_id: String,
}

/// Body for `POST /queries/run/json`.
///
/// Filters are kept ordered so serialized queries are deterministic, which
/// keeps request logs and test assertions sane.
#[derive(Debug, Clone, Serialize)]
pub struct WriteQuery {
    pub model: String,
    pub view: String,
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sorts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
}

impl WriteQuery {
    pub fn new(model: &str, view: &str, fields: &[&str]) -> Self {
        Self {
            model: model.to_string(),
            view: view.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            filters: BTreeMap::new(),
            sorts: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, key: &str, value: impl Into<String>) -> Self {
        self.filters.insert(key.to_string(), value.into());
        self
    }

    pub fn sort(mut self, expr: &str) -> Self {
        self.sorts.push(expr.to_string());
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n.to_string());
        self
    }
}

/// Escape literal underscores for Looker's filter-expression syntax, where a
/// bare `_` is a single-character wildcard.
pub fn escape_filter_value(value: &str) -> String {
    value.replace('_', "^_")
}

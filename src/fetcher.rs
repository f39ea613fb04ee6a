//! Usage aggregation core.
//!
//! [`Fetcher`] reconciles two differently-shaped views of a Looker instance:
//! what exists (the metadata endpoints: projects, models, explores with their
//! declared fields and joins) and what was actually queried (rows from the
//! `system__activity` usage log). Out of that it produces per-entity usage
//! counts and used/unused classifications at every level of the hierarchy:
//!
//! - model: one usage-log query keyed by `query.model`
//! - explore: one usage-log query keyed by `query.view`
//! - field: usage-log rows carrying free-text `query.formatted_fields` /
//!   `query.formatted_filters` columns, tokenized into `view.field` names
//! - join: derived from field stats by the first path segment of each
//!   qualified field name
//!
//! `timeframe` and `min_queries` are fixed per invocation and applied
//! uniformly to every usage query issued by one report. All calls are
//! sequential; the fetcher holds no mutable state between operations.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::client::ApiGateway;
use crate::error::{Error, Result};
use crate::models::{escape_filter_value, Explore, LookmlModel, Project, WriteQuery};

/// Per-entity query-run counts keyed by entity name.
pub type UsageCounts = HashMap<String, u64>;

/// Usage-log model and view the aggregation queries run against.
const ACTIVITY_MODEL: &str = "system__activity";
const ACTIVITY_VIEW: &str = "history";
/// Cap forwarded to every inline usage query.
const QUERY_ROW_LIMIT: u32 = 5000;

/// Matches one `view.field` token inside the free-text formatted columns.
static FIELD_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\w+\.\w+").unwrap_or_else(|e| panic!("invalid field token regex: {e}"))
});

pub struct Fetcher<G> {
    gateway: G,
    /// Looker date-filter expression, e.g. "90 days".
    timeframe: String,
    min_queries: u64,
}

impl<G: ApiGateway> Fetcher<G> {
    pub fn new(gateway: G, timeframe_days: u32, min_queries: u64) -> Self {
        Self {
            gateway,
            timeframe: format!("{timeframe_days} days"),
            min_queries,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// All projects, or a single project matched by id (case-insensitive).
    pub async fn get_projects(&self, id: Option<&str>) -> Result<Vec<Project>> {
        let mut projects = self.gateway.all_projects().await?;
        if let Some(id) = id {
            projects.retain(|p| p.id.eq_ignore_ascii_case(id));
        }
        if projects.is_empty() {
            return Err(Error::not_found("projects", "No projects found."));
        }
        Ok(projects)
    }

    /// Models with content, optionally narrowed by project and/or model name.
    ///
    /// The project filter is validated first so a bad project name fails at
    /// the projects stage, distinctly from a bad model name.
    pub async fn get_models(
        &self,
        project: Option<&str>,
        model: Option<&str>,
    ) -> Result<Vec<LookmlModel>> {
        if let Some(project) = project {
            self.get_projects(Some(project)).await?;
        }

        let mut models = match model {
            Some(name) => {
                let model = self
                    .gateway
                    .lookml_model(name)
                    .await
                    .map_err(|e| Error::not_found("models", e))?;
                vec![model]
            }
            None => self.gateway.all_lookml_models().await?,
        };

        if let Some(project) = project {
            models.retain(|m| m.project_name.eq_ignore_ascii_case(project));
        }
        models.retain(|m| m.has_content);

        if models.is_empty() {
            return Err(Error::not_found("models", "No populated model files found."));
        }
        Ok(models)
    }

    /// Query-run count per model over the configured timeframe. Models absent
    /// from the result are simply unused; that is never an error.
    pub async fn get_used_models(&self) -> Result<UsageCounts> {
        let query = WriteQuery::new(
            ACTIVITY_MODEL,
            ACTIVITY_VIEW,
            &["history.query_run_count", "query.model"],
        )
        .filter("history.created_date", &self.timeframe)
        .filter("query.model", "-system^_^_activity")
        .filter("history.query_run_count", ">0")
        .filter("history.workspace_id", "production")
        .limit(QUERY_ROW_LIMIT);

        let rows = self.gateway.run_inline_query(&query).await?;
        Ok(count_rows(&rows, "query.model", "history.query_run_count"))
    }

    /// Full explore bodies, either one (model, explore) pair or every explore
    /// declared by the matched models.
    pub async fn get_explores(
        &self,
        model: Option<&str>,
        explore: Option<&str>,
    ) -> Result<Vec<Explore>> {
        if let (Some(model), Some(explore)) = (model, explore) {
            // The explore endpoint can silently come back empty for a pair
            // that does not resolve; surface that as an explicit error.
            let explore = self
                .gateway
                .lookml_model_explore(model, explore)
                .await
                .map_err(|e| Error::not_found("models/explores", e))?;
            return Ok(vec![explore]);
        }

        let mut explores = Vec::new();
        for m in self.get_models(None, model).await? {
            for declared in &m.explores {
                let explore = self
                    .gateway
                    .lookml_model_explore(&m.name, &declared.name)
                    .await
                    .map_err(|e| Error::not_found("models/explores", e))?;
                explores.push(explore);
            }
        }
        Ok(explores)
    }

    /// Query-run count per explore (`query.view`), optionally narrowed by
    /// model and/or a single explore name.
    pub async fn get_used_explores(
        &self,
        model: Option<&str>,
        explore: Option<&str>,
    ) -> Result<UsageCounts> {
        let mut query = WriteQuery::new(
            ACTIVITY_MODEL,
            ACTIVITY_VIEW,
            &["query.view", "history.query_run_count"],
        )
        .filter("history.created_date", &self.timeframe)
        .filter("history.query_run_count", ">0")
        .filter("history.workspace_id", "production")
        .limit(QUERY_ROW_LIMIT);

        if let Some(model) = model {
            query = query.filter("query.model", escape_filter_value(model));
        }
        if let Some(explore) = explore {
            query = query.filter("query.view", explore);
        }

        let rows = self.gateway.run_inline_query(&query).await?;
        Ok(count_rows(&rows, "query.view", "history.query_run_count"))
    }

    /// Declared explores of `model` that did not meet the `min_queries`
    /// threshold over the timeframe.
    pub async fn get_unused_explores(&self, model: &str) -> Result<Vec<String>> {
        let declared = self.get_explores(Some(model), None).await?;
        let used = self.get_used_explores(Some(model), None).await?;
        let min_queries = self.min_queries;
        let used = self.filter_counts(Some(&used), |count| count >= min_queries);

        let unused = declared
            .into_iter()
            .filter(|e| !used.contains_key(&e.name))
            .map(|e| e.name)
            .collect();
        Ok(unused)
    }

    /// Sorted, de-duplicated union of the explore's non-hidden dimension and
    /// measure names. Hidden fields never count as exposed.
    pub fn get_explore_fields(&self, explore: &Explore) -> Vec<String> {
        let mut fields: Vec<String> = explore
            .fields
            .dimensions
            .iter()
            .chain(explore.fields.measures.iter())
            .filter(|f| !f.hidden)
            .map(|f| f.name.clone())
            .collect();
        fields.sort();
        fields.dedup();
        fields
    }

    /// Per-field query-run counts parsed out of the usage log's formatted
    /// field and filter columns.
    ///
    /// A field used only as a filter still counts, but a token already
    /// attributed from the fields column of the same row must not be counted
    /// again from the filters column.
    pub async fn get_used_explore_fields(
        &self,
        model: &str,
        explore: Option<&str>,
    ) -> Result<UsageCounts> {
        let mut query = WriteQuery::new(
            ACTIVITY_MODEL,
            ACTIVITY_VIEW,
            &[
                "query.model",
                "query.view",
                "query.formatted_fields",
                "query.formatted_filters",
                "history.query_run_count",
            ],
        )
        .filter("history.created_date", &self.timeframe)
        .filter("query.model", escape_filter_value(model))
        .filter("history.workspace_id", "production")
        .limit(QUERY_ROW_LIMIT);

        if let Some(explore) = explore {
            query = query.filter("query.view", escape_filter_value(explore));
        }

        let rows = self.gateway.run_inline_query(&query).await?;
        let mut used: UsageCounts = HashMap::new();
        for row in &rows {
            let count = row
                .get("history.query_run_count")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0);
            let fields_text = text_column(row, "query.formatted_fields");
            let filters_text = text_column(row, "query.formatted_filters");

            let mut attributed: HashSet<&str> = HashSet::new();
            for token in FIELD_TOKEN.find_iter(fields_text) {
                attributed.insert(token.as_str());
                *used.entry(token.as_str().to_string()).or_insert(0) += count;
            }
            for token in FIELD_TOKEN.find_iter(filters_text) {
                if attributed.insert(token.as_str()) {
                    *used.entry(token.as_str().to_string()).or_insert(0) += count;
                }
            }
        }
        debug!(model, fields = used.len(), "collected field usage");
        Ok(used)
    }

    /// Usage count for every exposed field of the explore, 0 when the log has
    /// no record of it. Log tokens for fields no longer declared are dropped.
    pub async fn get_explore_field_stats(&self, explore: &Explore) -> Result<UsageCounts> {
        let used = self
            .get_used_explore_fields(&explore.model_name, Some(&explore.name))
            .await?;
        let stats = self
            .get_explore_fields(explore)
            .into_iter()
            .map(|field| {
                let count = used.get(&field).copied().unwrap_or(0);
                (field, count)
            })
            .collect();
        Ok(stats)
    }

    /// Roll field stats up to the explore's joins.
    ///
    /// A field belongs to the join named by its first path segment; fields on
    /// the explore's own base view are not join usage. Every declared join
    /// (scopes minus the base name) is present in the result, 0 when unused.
    pub fn get_explore_join_stats(&self, explore: &Explore, field_stats: &UsageCounts) -> UsageCounts {
        let joins: HashSet<&str> = explore
            .scopes
            .iter()
            .map(String::as_str)
            .filter(|scope| *scope != explore.name)
            .collect();

        let mut stats = UsageCounts::new();
        if joins.is_empty() {
            return stats;
        }

        for (field, count) in field_stats {
            let Some(join) = field.split('.').next() else {
                continue;
            };
            if join == explore.name {
                continue;
            }
            *stats.entry(join.to_string()).or_insert(0) += count;
        }
        for join in joins {
            stats.entry(join.to_string()).or_insert(0);
        }
        stats
    }

    /// Run the project's git connection tests in its dev workspace.
    ///
    /// Tests run in declared order, stopping after the first non-pass; the
    /// session is put back on the production workspace no matter how the run
    /// went. Returns "OK" when everything passed, else one `id (status)`
    /// line per executed test.
    pub async fn run_git_connection_tests(&self, project_id: &str) -> Result<String> {
        self.gateway.update_session("dev").await?;
        let outcome = self.run_git_tests_in_dev(project_id).await;
        let restore = self.gateway.update_session("production").await;
        let results = outcome?;
        restore?;

        if results.iter().all(|r| r.passed()) {
            return Ok("OK".to_string());
        }
        let lines: Vec<String> = results
            .iter()
            .map(|r| format!("{} ({})", r.id, r.status))
            .collect();
        Ok(lines.join("\n"))
    }

    async fn run_git_tests_in_dev(
        &self,
        project_id: &str,
    ) -> Result<Vec<crate::models::GitTestResult>> {
        let supported = self.gateway.all_git_connection_tests(project_id).await?;
        let mut results = Vec::with_capacity(supported.len());
        for test in supported {
            let result = self
                .gateway
                .run_git_connection_test(project_id, &test.id)
                .await?;
            let passed = result.passed();
            results.push(result);
            if !passed {
                break;
            }
        }
        Ok(results)
    }

    /// Keep entries matching `condition`; `None` input normalizes to empty.
    pub fn filter_counts(
        &self,
        data: Option<&UsageCounts>,
        condition: impl Fn(u64) -> bool,
    ) -> UsageCounts {
        match data {
            None => UsageCounts::new(),
            Some(data) => data
                .iter()
                .filter(|(_, count)| condition(**count))
                .map(|(name, count)| (name.clone(), *count))
                .collect(),
        }
    }

    /// Default filter: entries at or below the threshold, i.e. vacuum
    /// candidates.
    pub fn below_threshold(&self, data: Option<&UsageCounts>) -> UsageCounts {
        self.filter_counts(data, |count| count <= self.min_queries)
    }
}

fn text_column<'a>(row: &'a serde_json::Value, key: &str) -> &'a str {
    row.get(key).and_then(serde_json::Value::as_str).unwrap_or("")
}

/// Collapse inline-query rows into a name -> count map.
fn count_rows(rows: &[serde_json::Value], name_key: &str, count_key: &str) -> UsageCounts {
    let mut counts = UsageCounts::new();
    for row in rows {
        let Some(name) = row.get(name_key).and_then(serde_json::Value::as_str) else {
            continue;
        };
        let count = row
            .get(count_key)
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        *counts.entry(name.to_string()).or_insert(0) += count;
    }
    counts
}

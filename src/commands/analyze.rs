//! `analyze` reports: descriptive usage statistics per project, model or
//! explore.

use crate::client::ApiGateway;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::output::{Cell, Row};

#[derive(Debug, Clone)]
pub struct ProjectRow {
    pub project: String,
    pub model_count: usize,
    pub view_count: usize,
    pub git_connection_status: String,
    pub pull_request_mode: String,
    pub validation_required: bool,
}

impl Row for ProjectRow {
    fn headers() -> &'static [&'static str] {
        &[
            "Project",
            "# Models",
            "# Views",
            "Git Connection Status",
            "PR Mode",
            "Is Validation Required",
        ]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.project.as_str().into(),
            self.model_count.into(),
            self.view_count.into(),
            self.git_connection_status.as_str().into(),
            self.pull_request_mode.as_str().into(),
            self.validation_required.into(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct ModelRow {
    pub project: String,
    pub model: String,
    pub explore_count: usize,
    pub unused_explore_count: usize,
    pub query_count: u64,
}

impl Row for ModelRow {
    fn headers() -> &'static [&'static str] {
        &[
            "Project",
            "Model",
            "# Explores",
            "# Unused Explores",
            "Query Count",
        ]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.project.as_str().into(),
            self.model.as_str().into(),
            self.explore_count.into(),
            self.unused_explore_count.into(),
            self.query_count.into(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct ExploreRow {
    pub model: String,
    pub explore: String,
    pub is_hidden: bool,
    pub has_description: bool,
    pub join_count: usize,
    pub unused_join_count: usize,
    pub field_count: usize,
    pub unused_field_count: usize,
    pub query_count: u64,
}

impl Row for ExploreRow {
    fn headers() -> &'static [&'static str] {
        &[
            "Model",
            "Explore",
            "Is Hidden",
            "Has Description",
            "# Joins",
            "# Unused Joins",
            "# Fields",
            "# Unused Fields",
            "Query Count",
        ]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.model.as_str().into(),
            self.explore.as_str().into(),
            self.is_hidden.into(),
            if self.has_description { "Yes" } else { "No" }.into(),
            self.join_count.into(),
            self.unused_join_count.into(),
            self.field_count.into(),
            self.unused_field_count.into(),
            self.query_count.into(),
        ]
    }
}

/// One row per project: file composition, git health, validation settings.
pub async fn projects<G: ApiGateway>(
    fetcher: &Fetcher<G>,
    project: Option<&str>,
) -> Result<Vec<ProjectRow>> {
    let mut rows = Vec::new();
    for p in fetcher.get_projects(project).await? {
        let files = fetcher.gateway().all_project_files(&p.id).await?;
        let git_connection_status = fetcher.run_git_connection_tests(&p.id).await?;
        rows.push(ProjectRow {
            model_count: files.iter().filter(|f| f.file_type == "model").count(),
            view_count: files.iter().filter(|f| f.file_type == "view").count(),
            git_connection_status,
            pull_request_mode: p.pull_request_mode,
            validation_required: p.validation_required,
            project: p.id,
        });
    }
    Ok(rows)
}

/// One row per model with declared/unused explore counts and query volume.
pub async fn models<G: ApiGateway>(
    fetcher: &Fetcher<G>,
    project: Option<&str>,
    model: Option<&str>,
) -> Result<Vec<ModelRow>> {
    let all_models = fetcher.get_models(project, model).await?;
    let used = fetcher.get_used_models().await?;

    let mut rows = Vec::new();
    for m in all_models {
        let unused_explore_count = fetcher.get_unused_explores(&m.name).await?.len();
        rows.push(ModelRow {
            project: m.project_name,
            explore_count: m.explores.len(),
            unused_explore_count,
            query_count: used.get(&m.name).copied().unwrap_or(0),
            model: m.name,
        });
    }
    Ok(rows)
}

/// One row per explore with field/join composition and usage breakdown.
pub async fn explores<G: ApiGateway>(
    fetcher: &Fetcher<G>,
    model: Option<&str>,
    explore: Option<&str>,
) -> Result<Vec<ExploreRow>> {
    let all_explores = fetcher.get_explores(model, explore).await?;

    let mut rows = Vec::new();
    for e in all_explores {
        let field_stats = fetcher.get_explore_field_stats(&e).await?;
        let join_stats = fetcher.get_explore_join_stats(&e, &field_stats);
        let query_count = fetcher
            .get_used_explores(Some(&e.model_name), Some(&e.name))
            .await?
            .get(&e.name)
            .copied()
            .unwrap_or(0);
        rows.push(ExploreRow {
            model: e.model_name.clone(),
            explore: e.name.clone(),
            is_hidden: e.hidden,
            has_description: e.description.as_deref().is_some_and(|d| !d.is_empty()),
            join_count: join_stats.len(),
            unused_join_count: fetcher.below_threshold(Some(&join_stats)).len(),
            field_count: field_stats.len(),
            unused_field_count: fetcher.below_threshold(Some(&field_stats)).len(),
            query_count,
        });
    }
    Ok(rows)
}

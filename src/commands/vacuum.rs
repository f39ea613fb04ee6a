//! `vacuum` reports: name exactly what can be deleted.
//!
//! Where `analyze` counts unused objects, `vacuum` lists them — unused
//! explores per model, unused joins and fields per explore — newline-joined
//! so each candidate lands on its own table line and flattens cleanly into
//! CSV.

use crate::client::ApiGateway;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::output::{Cell, Row};

#[derive(Debug, Clone)]
pub struct VacuumModelRow {
    pub model: String,
    pub unused_explores: String,
    pub query_count: u64,
}

impl Row for VacuumModelRow {
    fn headers() -> &'static [&'static str] {
        &["Model", "Unused Explores", "Model Query Count"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.model.as_str().into(),
            self.unused_explores.as_str().into(),
            self.query_count.into(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct VacuumExploreRow {
    pub model: String,
    pub explore: String,
    pub unused_joins: String,
    pub unused_fields: String,
}

impl Row for VacuumExploreRow {
    fn headers() -> &'static [&'static str] {
        &["Model", "Explore", "Unused Joins", "Unused Fields"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.model.as_str().into(),
            self.explore.as_str().into(),
            self.unused_joins.as_str().into(),
            self.unused_fields.as_str().into(),
        ]
    }
}

/// One row per model, listing explores below the usage threshold.
pub async fn models<G: ApiGateway>(
    fetcher: &Fetcher<G>,
    project: Option<&str>,
    model: Option<&str>,
) -> Result<Vec<VacuumModelRow>> {
    let all_models = fetcher.get_models(project, model).await?;
    let used = fetcher.get_used_models().await?;

    let mut rows = Vec::new();
    for m in all_models {
        let mut unused = fetcher.get_unused_explores(&m.name).await?;
        unused.sort();
        rows.push(VacuumModelRow {
            unused_explores: if unused.is_empty() {
                "None".to_string()
            } else {
                unused.join("\n")
            },
            query_count: used.get(&m.name).copied().unwrap_or(0),
            model: m.name,
        });
    }
    Ok(rows)
}

/// One row per explore, listing joins and exposed fields below the usage
/// threshold.
pub async fn explores<G: ApiGateway>(
    fetcher: &Fetcher<G>,
    model: Option<&str>,
    explore: Option<&str>,
) -> Result<Vec<VacuumExploreRow>> {
    let all_explores = fetcher.get_explores(model, explore).await?;

    let mut rows = Vec::new();
    for e in all_explores {
        let field_stats = fetcher.get_explore_field_stats(&e).await?;
        let join_stats = fetcher.get_explore_join_stats(&e, &field_stats);

        let mut unused_joins: Vec<String> =
            fetcher.below_threshold(Some(&join_stats)).into_keys().collect();
        unused_joins.sort();
        let mut unused_fields: Vec<String> =
            fetcher.below_threshold(Some(&field_stats)).into_keys().collect();
        unused_fields.sort();

        rows.push(VacuumExploreRow {
            model: e.model_name.clone(),
            explore: e.name.clone(),
            unused_joins: unused_joins.join("\n"),
            unused_fields: unused_fields.join("\n"),
        });
    }
    Ok(rows)
}

//! Report builders end-to-end over a canned gateway.

mod common;

use common::{explore, git_result, git_test, model, project, FieldUsageRow, StubGateway};
use looker_audit::commands::{analyze, vacuum};
use looker_audit::models::ProjectFile;
use looker_audit::output::Row;
use looker_audit::Fetcher;

/// One model, two explores: `orders` is fully used (all fields and joins
/// above threshold), `refunds` has never been queried.
fn half_used_gateway() -> StubGateway {
    StubGateway {
        projects: vec![project("shop")],
        models: vec![model("shop_model", "shop", true, &["orders", "refunds"])],
        explores: vec![
            explore(
                "shop_model",
                "orders",
                &["customers"],
                &[("orders.id", false), ("customers.name", false)],
                &[("orders.total", false)],
            ),
            explore(
                "shop_model",
                "refunds",
                &["reasons"],
                &[("refunds.id", false), ("reasons.code", false)],
                &[],
            ),
        ],
        model_usage: vec![("shop_model".to_string(), 42)],
        explore_usage: vec![("orders".to_string(), 42)],
        field_usage: vec![FieldUsageRow {
            model: "shop_model".to_string(),
            view: "orders".to_string(),
            formatted_fields: "orders.id, orders.total, customers.name".to_string(),
            formatted_filters: String::new(),
            count: 42,
        }],
        ..Default::default()
    }
}

#[tokio::test]
async fn vacuum_models_reports_exactly_the_unused_explore() {
    let fetcher = Fetcher::new(half_used_gateway(), 90, 1);
    let rows = vacuum::models(&fetcher, None, Some("shop_model")).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].model, "shop_model");
    assert_eq!(rows[0].unused_explores, "refunds");
    assert!(rows[0].query_count > 0);
}

#[tokio::test]
async fn vacuum_models_prints_none_when_everything_is_used() {
    let mut gateway = half_used_gateway();
    gateway.explore_usage.push(("refunds".to_string(), 9));
    let fetcher = Fetcher::new(gateway, 90, 1);
    let rows = vacuum::models(&fetcher, None, Some("shop_model")).await.unwrap();
    assert_eq!(rows[0].unused_explores, "None");
}

#[tokio::test]
async fn vacuum_explores_lists_unused_joins_and_fields_sorted() {
    let fetcher = Fetcher::new(half_used_gateway(), 90, 1);
    let rows = vacuum::explores(&fetcher, Some("shop_model"), None).await.unwrap();
    assert_eq!(rows.len(), 2);

    // orders: everything used, nothing to vacuum.
    assert_eq!(rows[0].explore, "orders");
    assert_eq!(rows[0].unused_joins, "");
    assert_eq!(rows[0].unused_fields, "");

    // refunds: the whole explore is dead weight.
    assert_eq!(rows[1].explore, "refunds");
    assert_eq!(rows[1].unused_joins, "reasons");
    assert_eq!(rows[1].unused_fields, "reasons.code\nrefunds.id");
}

#[tokio::test]
async fn analyze_models_counts_declared_and_unused_explores() {
    let fetcher = Fetcher::new(half_used_gateway(), 90, 1);
    let rows = analyze::models(&fetcher, Some("shop"), None).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].project, "shop");
    assert_eq!(rows[0].model, "shop_model");
    assert_eq!(rows[0].explore_count, 2);
    assert_eq!(rows[0].unused_explore_count, 1);
    assert_eq!(rows[0].query_count, 42);
}

#[tokio::test]
async fn analyze_explores_breaks_down_fields_and_joins() {
    let fetcher = Fetcher::new(half_used_gateway(), 90, 1);
    let rows = analyze::explores(&fetcher, Some("shop_model"), Some("orders"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.model, "shop_model");
    assert_eq!(row.explore, "orders");
    assert_eq!(row.join_count, 1);
    assert_eq!(row.unused_join_count, 0);
    assert_eq!(row.field_count, 3);
    assert_eq!(row.unused_field_count, 0);
    assert_eq!(row.query_count, 42);
}

#[tokio::test]
async fn analyze_projects_combines_files_and_git_health() {
    let mut gateway = half_used_gateway();
    gateway.project_files.insert(
        "shop".to_string(),
        vec![
            ProjectFile {
                id: "shop_model.model.lkml".to_string(),
                file_type: "model".to_string(),
            },
            ProjectFile {
                id: "orders.view.lkml".to_string(),
                file_type: "view".to_string(),
            },
            ProjectFile {
                id: "customers.view.lkml".to_string(),
                file_type: "view".to_string(),
            },
            ProjectFile {
                id: "README.md".to_string(),
                file_type: "other".to_string(),
            },
        ],
    );
    gateway.git_tests = vec![git_test("can_connect")];
    gateway.git_results = [(
        "can_connect".to_string(),
        git_result("can_connect", "pass"),
    )]
    .into_iter()
    .collect();

    let fetcher = Fetcher::new(gateway, 90, 0);
    let rows = analyze::projects(&fetcher, Some("shop")).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].project, "shop");
    assert_eq!(rows[0].model_count, 1);
    assert_eq!(rows[0].view_count, 2);
    assert_eq!(rows[0].git_connection_status, "OK");
}

#[tokio::test]
async fn analyze_projects_errors_for_unknown_project() {
    let fetcher = Fetcher::new(half_used_gateway(), 90, 0);
    let err = analyze::projects(&fetcher, Some("BadProject")).await.unwrap_err();
    assert!(err.to_string().contains("projects"));
}

#[test]
fn row_schemas_match_their_cells() {
    use looker_audit::commands::analyze::{ExploreRow, ModelRow, ProjectRow};
    use looker_audit::commands::vacuum::{VacuumExploreRow, VacuumModelRow};

    let row = VacuumModelRow {
        model: "m".to_string(),
        unused_explores: "None".to_string(),
        query_count: 1,
    };
    assert_eq!(VacuumModelRow::headers().len(), row.cells().len());
    assert_eq!(
        VacuumModelRow::headers(),
        &["Model", "Unused Explores", "Model Query Count"]
    );

    let row = VacuumExploreRow {
        model: "m".to_string(),
        explore: "e".to_string(),
        unused_joins: String::new(),
        unused_fields: String::new(),
    };
    assert_eq!(VacuumExploreRow::headers().len(), row.cells().len());

    let row = ProjectRow {
        project: "p".to_string(),
        model_count: 0,
        view_count: 0,
        git_connection_status: "OK".to_string(),
        pull_request_mode: "off".to_string(),
        validation_required: false,
    };
    assert_eq!(ProjectRow::headers().len(), row.cells().len());

    let row = ModelRow {
        project: "p".to_string(),
        model: "m".to_string(),
        explore_count: 0,
        unused_explore_count: 0,
        query_count: 0,
    };
    assert_eq!(ModelRow::headers().len(), row.cells().len());

    let row = ExploreRow {
        model: "m".to_string(),
        explore: "e".to_string(),
        is_hidden: false,
        has_description: false,
        join_count: 0,
        unused_join_count: 0,
        field_count: 0,
        unused_field_count: 0,
        query_count: 0,
    };
    assert_eq!(ExploreRow::headers().len(), row.cells().len());
}

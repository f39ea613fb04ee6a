//! `pulse`: six instance-health checks, printed progressively.
//!
//! Every check is independent: a failing one reports its error and the next
//! still runs. Health queries go against the `i__looker` system model, which
//! also records activity the `system__activity` usage queries exclude.

use colored::Colorize;
use tracing::warn;

use crate::client::ApiGateway;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::models::WriteQuery;
use crate::output::{print_check_header, print_query_rows, print_rows, Cell, Row};

const SYSTEM_MODEL: &str = "i__looker";

/// Connections Looker runs for itself; uninteresting for a health report.
const RESERVED_CONNECTIONS: [&str; 3] = ["looker__internal__analytics", "looker", "looker__ilooker"];

struct ConnectionRow {
    connection: String,
    status: String,
    query_count: u64,
}

impl Row for ConnectionRow {
    fn headers() -> &'static [&'static str] {
        &["Connection", "Status", "Query Count"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.connection.as_str().into(),
            self.status.as_str().into(),
            self.query_count.into(),
        ]
    }
}

struct FeatureRow {
    feature: String,
}

impl Row for FeatureRow {
    fn headers() -> &'static [&'static str] {
        &["Feature"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![self.feature.as_str().into()]
    }
}

/// Run all checks in order. Always returns Ok; individual failures are
/// reported inline.
pub async fn run<G: ApiGateway>(fetcher: &Fetcher<G>) -> Result<()> {
    if let Err(e) = check_db_connections(fetcher).await {
        report_failure(e);
    }
    if let Err(e) = check_dashboard_performance(fetcher).await {
        report_failure(e);
    }
    if let Err(e) = check_dashboard_errors(fetcher).await {
        report_failure(e);
    }
    if let Err(e) = check_explore_performance(fetcher).await {
        report_failure(e);
    }
    if let Err(e) = check_schedule_failures(fetcher).await {
        report_failure(e);
    }
    if let Err(e) = check_legacy_features(fetcher).await {
        report_failure(e);
    }
    Ok(())
}

fn report_failure(error: crate::error::Error) {
    warn!(%error, "pulse check failed");
    println!("{}\n", format!("Check failed: {error}").red());
}

/// Test every user-facing connection with its dialect's supported tests and
/// show how much each one is queried.
async fn check_db_connections<G: ApiGateway>(fetcher: &Fetcher<G>) -> Result<()> {
    print_check_header("Test 1/6: Checking connections");

    let connections: Vec<_> = fetcher
        .gateway()
        .all_connections()
        .await?
        .into_iter()
        .filter(|c| !RESERVED_CONNECTIONS.contains(&c.name.as_str()))
        .collect();
    if connections.is_empty() {
        return Err(crate::error::Error::not_found(
            "connections",
            "No connections found.",
        ));
    }

    let mut rows = Vec::new();
    for connection in connections {
        let tests = connection
            .dialect
            .as_ref()
            .map(|d| d.connection_tests.clone())
            .unwrap_or_default();
        let results = fetcher
            .gateway()
            .test_connection(&connection.name, &tests)
            .await?;
        let errors: Vec<String> = results
            .iter()
            .filter(|r| r.status == "error")
            .map(|r| format!("- {}", wrap(r.message.as_deref().unwrap_or(""), 100)))
            .collect();

        let query = WriteQuery::new(SYSTEM_MODEL, "history", &["history.query_run_count"])
            .filter("history.connection_name", &connection.name)
            .limit(1);
        let count_rows = fetcher.gateway().run_inline_query(&query).await?;
        let query_count = count_rows
            .first()
            .and_then(|row| row.get("history.query_run_count"))
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);

        rows.push(ConnectionRow {
            connection: connection.name,
            status: if errors.is_empty() {
                "OK".to_string()
            } else {
                errors.join("\n")
            },
            query_count,
        });
    }
    print_rows(&rows);
    Ok(())
}

/// Dashboards that ran queries slower than 30 seconds in the past week.
async fn check_dashboard_performance<G: ApiGateway>(fetcher: &Fetcher<G>) -> Result<()> {
    print_check_header(
        "Test 2/6: Checking for dashboards with queries slower than 30 seconds in the last 7 days",
    );
    let query = WriteQuery::new(SYSTEM_MODEL, "history", &["dashboard.title", "query.count"])
        .filter("history.created_date", "7 days")
        .filter("history.real_dash_id", "-NULL")
        .filter("history.runtime", ">30")
        .filter("history.status", "complete")
        .sort("query.count desc")
        .limit(20);
    let rows = fetcher.gateway().run_inline_query(&query).await?;
    print_query_rows(&rows, &["dashboard.title", "query.count"]);
    Ok(())
}

/// Dashboards whose queries errored in the past week.
async fn check_dashboard_errors<G: ApiGateway>(fetcher: &Fetcher<G>) -> Result<()> {
    print_check_header("Test 3/6: Checking for dashboards with erroring queries in the last 7 days");
    let query = WriteQuery::new(
        SYSTEM_MODEL,
        "history",
        &["dashboard.title", "history.query_run_count"],
    )
    .filter("dashboard.title", "-NULL")
    .filter("history.created_date", "7 days")
    .filter("history.dashboard_session", "-NULL")
    .filter("history.status", "error")
    .sort("history.query_run_count desc")
    .limit(20);
    let rows = fetcher.gateway().run_inline_query(&query).await?;
    print_query_rows(&rows, &["dashboard.title", "history.query_run_count"]);
    Ok(())
}

/// Slowest explores by average runtime, with the instance-wide average for
/// context.
async fn check_explore_performance<G: ApiGateway>(fetcher: &Fetcher<G>) -> Result<()> {
    print_check_header("Test 4/6: Checking for the slowest explores in the past 7 days");
    let query = WriteQuery::new(
        SYSTEM_MODEL,
        "history",
        &["query.model", "query.view", "history.average_runtime"],
    )
    .filter("history.created_date", "7 days")
    .filter("query.model", "-NULL, -system^_^_activity")
    .sort("history.average_runtime desc")
    .limit(20);
    let slowest = fetcher.gateway().run_inline_query(&query).await?;

    let mut average_query = query.clone();
    average_query.fields = vec!["history.average_runtime".to_string()];
    let average_rows = fetcher.gateway().run_inline_query(&average_query).await?;
    if let Some(average) = average_rows
        .first()
        .and_then(|row| row.get("history.average_runtime"))
        .and_then(serde_json::Value::as_f64)
    {
        println!("For context, the average query runtime is {average:.4}s");
    }

    print_query_rows(
        &slowest,
        &["query.model", "query.view", "history.average_runtime"],
    );
    Ok(())
}

/// Scheduled jobs that failed in the past week.
async fn check_schedule_failures<G: ApiGateway>(fetcher: &Fetcher<G>) -> Result<()> {
    print_check_header("Test 5/6: Checking for failing schedules");
    let query = WriteQuery::new(
        SYSTEM_MODEL,
        "scheduled_plan",
        &["scheduled_job.name", "scheduled_job.count"],
    )
    .filter("scheduled_job.created_date", "7 days")
    .filter("scheduled_job.status", "failure")
    .sort("scheduled_job.count desc")
    .limit(500);
    let rows = fetcher.gateway().run_inline_query(&query).await?;
    print_query_rows(&rows, &["scheduled_job.name", "scheduled_job.count"]);
    Ok(())
}

/// Legacy features still switched on. An empty table here is good news, not
/// an error.
async fn check_legacy_features<G: ApiGateway>(fetcher: &Fetcher<G>) -> Result<()> {
    print_check_header("Test 6/6: Checking for enabled legacy features");
    let rows: Vec<FeatureRow> = fetcher
        .gateway()
        .all_legacy_features()
        .await?
        .into_iter()
        .filter(|f| f.enabled)
        .map(|f| FeatureRow { feature: f.name })
        .collect();
    print_rows(&rows);
    Ok(())
}

/// Greedy word wrap for connection-test error messages.
fn wrap(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + word.len() + 1 > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

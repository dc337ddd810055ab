//! Calendar Lambda - serves the month-view deadline calendar.
//!
//! Endpoints:
//! - GET /calendar - month grid for a year/month/tab
//! - GET /calendar/tabs - sidebar tab buckets plus the designer roster
//!
//! The grid is recomputed from the store on every request; there is no
//! cached state to invalidate.

use chrono::{Datelike, NaiveDate, Utc};
use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shared::http::{error_response, json_response, ApiResponse};
use shared::models::{
    Milestones, Project, RoleAssignees, StandaloneTask, TaskCategory, TaskDefinition,
    VisibilityFilter,
};
use shared::{calendar, events, Config};

/// Project row as stored.
#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    customer_name: String,
    archived: bool,
    design_assignee: Option<String>,
    interior_assignee: Option<String>,
    exterior_assignee: Option<String>,
    real_estate_assignee: Option<String>,
    construction_assignee: Option<String>,
    sales_assignee: Option<String>,
    layout_confirmed_on: Option<NaiveDate>,
    construction_permit_on: Option<NaiveDate>,
    pre_contract_meeting_on: Option<NaiveDate>,
    drawing_handoff_on: Option<NaiveDate>,
    task_progress: serde_json::Value,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        // A malformed progress blob degrades to "no dates", not an error.
        let progress = serde_json::from_value(row.task_progress).unwrap_or_default();

        Project {
            id: row.id,
            customer_name: row.customer_name,
            archived: row.archived,
            assignees: RoleAssignees {
                design: row.design_assignee,
                interior: row.interior_assignee,
                exterior: row.exterior_assignee,
                real_estate: row.real_estate_assignee,
                construction: row.construction_assignee,
                sales: row.sales_assignee,
            },
            milestones: Milestones {
                layout_confirmed_on: row.layout_confirmed_on,
                construction_permit_on: row.construction_permit_on,
                pre_contract_meeting_on: row.pre_contract_meeting_on,
                drawing_handoff_on: row.drawing_handoff_on,
            },
            progress,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TaskDefinitionRow {
    key: String,
    name: String,
    category: String,
}

#[derive(Debug, sqlx::FromRow)]
struct StandaloneTaskRow {
    project_id: i64,
    name: String,
    due_on: Option<NaiveDate>,
}

/// Sidebar tab listing.
#[derive(Debug, Serialize)]
struct TabsResponse {
    buckets: Vec<&'static str>,
    designers: Vec<String>,
}

/// Application state
struct AppState {
    db_pool: PgPool,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env().map_err(|e| format!("Missing configuration: {}", e))?;
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws);

        let db_pool = shared::db::create_pool(&config, &secrets_client).await?;

        Ok(Self { db_pool })
    }
}

async fn load_projects(pool: &PgPool) -> Result<Vec<Project>, Error> {
    let rows: Vec<ProjectRow> = sqlx::query_as(
        r#"
        SELECT
            id, customer_name, archived,
            design_assignee, interior_assignee, exterior_assignee,
            real_estate_assignee, construction_assignee, sales_assignee,
            layout_confirmed_on, construction_permit_on,
            pre_contract_meeting_on, drawing_handoff_on,
            task_progress
        FROM projects
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| format!("Failed to fetch projects: {}", e))?;

    Ok(rows.into_iter().map(Project::from).collect())
}

async fn load_catalog(pool: &PgPool) -> Result<Vec<TaskDefinition>, Error> {
    let rows: Vec<TaskDefinitionRow> = sqlx::query_as(
        "SELECT key, name, category FROM task_definitions ORDER BY sort_order",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| format!("Failed to fetch task definitions: {}", e))?;

    let mut catalog = Vec::with_capacity(rows.len());
    for row in rows {
        match TaskCategory::parse(&row.category) {
            Ok(category) => catalog.push(TaskDefinition {
                key: row.key,
                name: row.name,
                category,
            }),
            Err(e) => {
                warn!("Skipping task definition {}: {}", row.key, e);
            }
        }
    }

    Ok(catalog)
}

async fn load_standalone_tasks(pool: &PgPool) -> Result<Vec<StandaloneTask>, Error> {
    let rows: Vec<StandaloneTaskRow> = sqlx::query_as(
        "SELECT project_id, name, due_on FROM project_tasks ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| format!("Failed to fetch project tasks: {}", e))?;

    Ok(rows
        .into_iter()
        .map(|row| StandaloneTask {
            project_id: row.project_id,
            name: row.name,
            due_on: row.due_on,
        })
        .collect())
}

async fn month_view(state: &AppState, event: &Request) -> Result<Response<Body>, Error> {
    let params = event.query_string_parameters();

    let today = match params.first("today") {
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => return error_response(400, format!("Invalid today: {}", raw)),
        },
        None => Utc::now().date_naive(),
    };

    let year: i32 = match params.first("year") {
        Some(raw) => match raw.parse() {
            Ok(year) => year,
            Err(_) => return error_response(400, format!("Invalid year: {}", raw)),
        },
        None => today.year(),
    };

    let month: u32 = match params.first("month") {
        Some(raw) => match raw.parse() {
            Ok(month) => month,
            Err(_) => return error_response(400, format!("Invalid month: {}", raw)),
        },
        None => today.month(),
    };

    let filter = match VisibilityFilter::parse(params.first("tab").unwrap_or("all")) {
        Ok(filter) => filter,
        Err(e) => return error_response(e.status_code(), e.to_string()),
    };

    let projects = load_projects(&state.db_pool).await?;
    let catalog = load_catalog(&state.db_pool).await?;
    let standalone = load_standalone_tasks(&state.db_pool).await?;

    let collected = events::collect(&projects, &catalog, &standalone, &filter);
    info!(
        "Collected {} events from {} projects for {}-{}",
        collected.len(),
        projects.len(),
        year,
        month
    );

    let grid = match calendar::render(year, month, &collected, today) {
        Ok(grid) => grid,
        Err(e) => return error_response(e.status_code(), e.to_string()),
    };

    json_response(200, &ApiResponse::success(grid))
}

async fn tabs(state: &AppState) -> Result<Response<Body>, Error> {
    let designers: Vec<String> =
        sqlx::query_scalar("SELECT name FROM designers ORDER BY sort_order, name")
            .fetch_all(&state.db_pool)
            .await
            .map_err(|e| format!("Failed to fetch designers: {}", e))?;

    json_response(
        200,
        &ApiResponse::success(TabsResponse {
            buckets: vec!["all", "archived", "archived-design", "archived-interior"],
            designers,
        }),
    )
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let raw_path = event.uri().path();
    // Strip /api stage prefix if present (API Gateway REST API includes stage in path)
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);

    info!("Calendar request: {} {}", method, path);

    match (method, path) {
        ("GET", "/calendar") => month_view(&state, &event).await,
        ("GET", "/calendar/tabs") => tabs(&state).await,
        _ => error_response(404, "Not found"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}

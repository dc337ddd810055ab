//! Settings Lambda - CRUD behind the dashboard settings panels.
//!
//! Endpoints:
//! - GET /settings/designers - list the designer roster
//! - POST /settings/designers - add a designer
//! - PUT /settings/designers/{id} - update a designer
//! - DELETE /settings/designers/{id} - remove a designer
//! - GET /settings/tasks - list the task-definition catalog
//! - POST /settings/tasks - add a task definition
//! - PUT /settings/tasks/{id} - update a task definition
//! - DELETE /settings/tasks/{id} - remove a task definition
//! - GET /settings/field-mappings - the kintone field-code mapping document
//! - PUT /settings/field-mappings - replace the mapping document

use chrono::{DateTime, Utc};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use validator::Validate;

use shared::http::{error_response, json_response, ApiResponse};
use shared::models::TaskCategory;
use shared::parse_body;
use shared::Config;

/// Create designer request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateDesignerRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    name: String,
    department: Option<String>,
    sort_order: Option<i32>,
}

/// Update designer request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateDesignerRequest {
    name: Option<String>,
    department: Option<String>,
    sort_order: Option<i32>,
}

/// Create task-definition request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateTaskDefinitionRequest {
    #[validate(length(min = 1, message = "key must not be empty"))]
    key: String,
    #[validate(length(min = 1, message = "name must not be empty"))]
    name: String,
    category: String,
    sort_order: Option<i32>,
}

/// Update task-definition request; the key is immutable once created.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTaskDefinitionRequest {
    name: Option<String>,
    category: Option<String>,
    sort_order: Option<i32>,
}

/// Replace field-mappings request
#[derive(Debug, Deserialize)]
struct PutFieldMappingsRequest {
    mappings: serde_json::Value,
}

/// Designer row from database
#[derive(Debug, sqlx::FromRow)]
struct DesignerRow {
    id: Uuid,
    name: String,
    department: Option<String>,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Designer API response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DesignerResponse {
    id: String,
    name: String,
    department: Option<String>,
    sort_order: i32,
    created_at: String,
    updated_at: String,
}

impl From<DesignerRow> for DesignerResponse {
    fn from(row: DesignerRow) -> Self {
        Self {
            id: row.id.to_string(),
            name: row.name,
            department: row.department,
            sort_order: row.sort_order,
            created_at: row.created_at.to_rfc3339(),
            updated_at: row.updated_at.to_rfc3339(),
        }
    }
}

/// Task-definition row from database
#[derive(Debug, sqlx::FromRow)]
struct TaskDefinitionRow {
    id: Uuid,
    key: String,
    name: String,
    category: String,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Task-definition API response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskDefinitionResponse {
    id: String,
    key: String,
    name: String,
    category: String,
    sort_order: i32,
    created_at: String,
    updated_at: String,
}

impl From<TaskDefinitionRow> for TaskDefinitionResponse {
    fn from(row: TaskDefinitionRow) -> Self {
        Self {
            id: row.id.to_string(),
            key: row.key,
            name: row.name,
            category: row.category,
            sort_order: row.sort_order,
            created_at: row.created_at.to_rfc3339(),
            updated_at: row.updated_at.to_rfc3339(),
        }
    }
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

async fn list_designers(state: &AppState) -> Result<Response<Body>, Error> {
    let rows: Vec<DesignerRow> = sqlx::query_as(
        r#"
        SELECT id, name, department, sort_order, created_at, updated_at
        FROM designers
        ORDER BY sort_order, name
        "#,
    )
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| format!("Failed to fetch designers: {}", e))?;

    let designers: Vec<DesignerResponse> = rows.into_iter().map(DesignerResponse::from).collect();

    json_response(200, &ApiResponse::success(designers))
}

async fn create_designer(state: &AppState, event: &Request) -> Result<Response<Body>, Error> {
    let request: CreateDesignerRequest = parse_body!(event.body());

    if let Err(e) = request.validate() {
        return error_response(400, e.to_string());
    }

    let row: DesignerRow = sqlx::query_as(
        r#"
        INSERT INTO designers (name, department, sort_order)
        VALUES ($1, $2, $3)
        RETURNING id, name, department, sort_order, created_at, updated_at
        "#,
    )
    .bind(request.name.trim())
    .bind(&request.department)
    .bind(request.sort_order.unwrap_or(0))
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| format!("Failed to create designer: {}", e))?;

    json_response(201, &ApiResponse::success(DesignerResponse::from(row)))
}

async fn update_designer(
    state: &AppState,
    id: Uuid,
    event: &Request,
) -> Result<Response<Body>, Error> {
    let request: UpdateDesignerRequest = parse_body!(event.body());

    // Build dynamic update query
    let mut updates = Vec::new();
    let mut param_num = 2;

    if request.name.is_some() {
        updates.push(format!("name = ${}", param_num));
        param_num += 1;
    }
    if request.department.is_some() {
        updates.push(format!("department = ${}", param_num));
        param_num += 1;
    }
    if request.sort_order.is_some() {
        updates.push(format!("sort_order = ${}", param_num));
    }

    if updates.is_empty() {
        return error_response(400, "No fields to update");
    }

    updates.push("updated_at = NOW()".to_string());

    let query = format!(
        r#"
        UPDATE designers
        SET {}
        WHERE id = $1
        RETURNING id, name, department, sort_order, created_at, updated_at
        "#,
        updates.join(", ")
    );

    let mut query_builder = sqlx::query_as::<_, DesignerRow>(&query).bind(id);

    if let Some(ref name) = request.name {
        query_builder = query_builder.bind(name.trim().to_string());
    }
    if let Some(ref department) = request.department {
        query_builder = query_builder.bind(department);
    }
    if let Some(sort_order) = request.sort_order {
        query_builder = query_builder.bind(sort_order);
    }

    let row: Option<DesignerRow> = query_builder
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| format!("Failed to update designer: {}", e))?;

    match row {
        Some(row) => json_response(200, &ApiResponse::success(DesignerResponse::from(row))),
        None => error_response(404, "Designer not found"),
    }
}

async fn delete_designer(state: &AppState, id: Uuid) -> Result<Response<Body>, Error> {
    let result = sqlx::query("DELETE FROM designers WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await
        .map_err(|e| format!("Failed to delete designer: {}", e))?;

    if result.rows_affected() == 0 {
        return error_response(404, "Designer not found");
    }

    json_response(
        200,
        &ApiResponse::success(serde_json::json!({ "deleted": id.to_string() })),
    )
}

async fn list_task_definitions(state: &AppState) -> Result<Response<Body>, Error> {
    let rows: Vec<TaskDefinitionRow> = sqlx::query_as(
        r#"
        SELECT id, key, name, category, sort_order, created_at, updated_at
        FROM task_definitions
        ORDER BY sort_order
        "#,
    )
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| format!("Failed to fetch task definitions: {}", e))?;

    let definitions: Vec<TaskDefinitionResponse> =
        rows.into_iter().map(TaskDefinitionResponse::from).collect();

    json_response(200, &ApiResponse::success(definitions))
}

async fn create_task_definition(
    state: &AppState,
    event: &Request,
) -> Result<Response<Body>, Error> {
    let request: CreateTaskDefinitionRequest = parse_body!(event.body());

    if let Err(e) = request.validate() {
        return error_response(400, e.to_string());
    }

    let category = match TaskCategory::parse(&request.category) {
        Ok(category) => category,
        Err(e) => return error_response(e.status_code(), e.to_string()),
    };

    let key = request.key.trim();
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM task_definitions WHERE key = $1)")
            .bind(key)
            .fetch_one(&state.db_pool)
            .await
            .map_err(|e| format!("Failed to check task key: {}", e))?;

    if exists {
        return error_response(400, format!("Task key already exists: {}", key));
    }

    let row: TaskDefinitionRow = sqlx::query_as(
        r#"
        INSERT INTO task_definitions (key, name, category, sort_order)
        VALUES ($1, $2, $3, $4)
        RETURNING id, key, name, category, sort_order, created_at, updated_at
        "#,
    )
    .bind(key)
    .bind(request.name.trim())
    .bind(category.as_str())
    .bind(request.sort_order.unwrap_or(0))
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| format!("Failed to create task definition: {}", e))?;

    json_response(
        201,
        &ApiResponse::success(TaskDefinitionResponse::from(row)),
    )
}

async fn update_task_definition(
    state: &AppState,
    id: Uuid,
    event: &Request,
) -> Result<Response<Body>, Error> {
    let request: UpdateTaskDefinitionRequest = parse_body!(event.body());

    if let Some(ref category) = request.category {
        if let Err(e) = TaskCategory::parse(category) {
            return error_response(e.status_code(), e.to_string());
        }
    }

    // Build dynamic update query
    let mut updates = Vec::new();
    let mut param_num = 2;

    if request.name.is_some() {
        updates.push(format!("name = ${}", param_num));
        param_num += 1;
    }
    if request.category.is_some() {
        updates.push(format!("category = ${}", param_num));
        param_num += 1;
    }
    if request.sort_order.is_some() {
        updates.push(format!("sort_order = ${}", param_num));
    }

    if updates.is_empty() {
        return error_response(400, "No fields to update");
    }

    updates.push("updated_at = NOW()".to_string());

    let query = format!(
        r#"
        UPDATE task_definitions
        SET {}
        WHERE id = $1
        RETURNING id, key, name, category, sort_order, created_at, updated_at
        "#,
        updates.join(", ")
    );

    let mut query_builder = sqlx::query_as::<_, TaskDefinitionRow>(&query).bind(id);

    if let Some(ref name) = request.name {
        query_builder = query_builder.bind(name.trim().to_string());
    }
    if let Some(ref category) = request.category {
        query_builder = query_builder.bind(category);
    }
    if let Some(sort_order) = request.sort_order {
        query_builder = query_builder.bind(sort_order);
    }

    let row: Option<TaskDefinitionRow> = query_builder
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| format!("Failed to update task definition: {}", e))?;

    match row {
        Some(row) => json_response(
            200,
            &ApiResponse::success(TaskDefinitionResponse::from(row)),
        ),
        None => error_response(404, "Task definition not found"),
    }
}

async fn delete_task_definition(state: &AppState, id: Uuid) -> Result<Response<Body>, Error> {
    let result = sqlx::query("DELETE FROM task_definitions WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await
        .map_err(|e| format!("Failed to delete task definition: {}", e))?;

    if result.rows_affected() == 0 {
        return error_response(404, "Task definition not found");
    }

    json_response(
        200,
        &ApiResponse::success(serde_json::json!({ "deleted": id.to_string() })),
    )
}

async fn get_field_mappings(state: &AppState) -> Result<Response<Body>, Error> {
    let value: Option<serde_json::Value> =
        sqlx::query_scalar("SELECT value FROM dashboard_settings WHERE name = 'field_mappings'")
            .fetch_optional(&state.db_pool)
            .await
            .map_err(|e| format!("Failed to fetch field mappings: {}", e))?;

    json_response(
        200,
        &ApiResponse::success(value.unwrap_or_else(|| serde_json::json!({}))),
    )
}

async fn put_field_mappings(state: &AppState, event: &Request) -> Result<Response<Body>, Error> {
    let request: PutFieldMappingsRequest = parse_body!(event.body());

    if !request.mappings.is_object() {
        return error_response(400, "mappings must be an object");
    }

    sqlx::query(
        r#"
        INSERT INTO dashboard_settings (name, value)
        VALUES ('field_mappings', $1)
        ON CONFLICT (name) DO UPDATE SET
            value = EXCLUDED.value,
            updated_at = NOW()
        "#,
    )
    .bind(&request.mappings)
    .execute(&state.db_pool)
    .await
    .map_err(|e| format!("Failed to store field mappings: {}", e))?;

    json_response(200, &ApiResponse::success(request.mappings))
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let raw_path = event.uri().path();
    // Strip /api stage prefix if present (API Gateway REST API includes stage in path)
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);

    info!("Settings request: {} {}", method, path);

    match (method, path) {
        ("GET", "/settings/designers") => list_designers(&state).await,
        ("POST", "/settings/designers") => create_designer(&state, &event).await,
        ("GET", "/settings/tasks") => list_task_definitions(&state).await,
        ("POST", "/settings/tasks") => create_task_definition(&state, &event).await,
        ("GET", "/settings/field-mappings") => get_field_mappings(&state).await,
        ("PUT", "/settings/field-mappings") => put_field_mappings(&state, &event).await,

        _ if path.starts_with("/settings/designers/") => {
            let raw_id = path.trim_start_matches("/settings/designers/");
            let id = match Uuid::parse_str(raw_id) {
                Ok(id) => id,
                Err(_) => return error_response(400, format!("Invalid id: {}", raw_id)),
            };
            match method {
                "PUT" => update_designer(&state, id, &event).await,
                "DELETE" => delete_designer(&state, id).await,
                _ => error_response(404, "Not found"),
            }
        }

        _ if path.starts_with("/settings/tasks/") => {
            let raw_id = path.trim_start_matches("/settings/tasks/");
            let id = match Uuid::parse_str(raw_id) {
                Ok(id) => id,
                Err(_) => return error_response(400, format!("Invalid id: {}", raw_id)),
            };
            match method {
                "PUT" => update_task_definition(&state, id, &event).await,
                "DELETE" => delete_task_definition(&state, id).await,
                _ => error_response(404, "Not found"),
            }
        }

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

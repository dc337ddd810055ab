//! kintone Proxy Lambda - forwards dashboard CRUD calls to the kintone REST API.
//!
//! Accepts `POST /` with `{action, data}` where action is one of test,
//! getRecords, getRecord, addRecord, updateRecord, getFieldMappings. Each
//! action maps to exactly one kintone call; upstream errors are relayed with
//! their original status code and body.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shared::http::json_response;
use shared::kintone::{KintoneClient, ProxyAction};
use shared::{Error as SharedError, KintoneConfig};

#[derive(Debug, Deserialize)]
struct ProxyRequest {
    action: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Serialize)]
struct ProxySuccess {
    success: bool,
    data: Value,
}

#[derive(Debug, Serialize)]
struct ProxyFailure {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

/// Application state
struct AppState {
    /// Absent until the kintone variables are configured; requests then get
    /// a 400 instead of a failed cold start.
    client: Option<KintoneClient>,
}

impl AppState {
    fn new() -> Self {
        Self {
            client: KintoneConfig::from_env().map(KintoneClient::new),
        }
    }
}

fn failure(
    status: u16,
    error: impl Into<String>,
    details: Option<Value>,
) -> Result<Response<Body>, Error> {
    json_response(
        status,
        &ProxyFailure {
            error: error.into(),
            details,
        },
    )
}

/// Record id from the request data; kintone serves both numeric and string ids.
fn record_id(data: &Value) -> Result<u64, String> {
    match data.get("id") {
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| "Invalid id".to_string()),
        Some(Value::String(s)) => s.parse().map_err(|_| "Invalid id".to_string()),
        _ => Err("Missing id".to_string()),
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    if event.method().as_str() != "POST" {
        return failure(405, "Method not allowed", None);
    }

    let request: ProxyRequest = match serde_json::from_slice(event.body().as_ref()) {
        Ok(parsed) => parsed,
        Err(e) => return failure(400, format!("Invalid request body: {}", e), None),
    };

    let Some(client) = state.client.as_ref() else {
        return failure(400, "kintone connection is not configured", None);
    };

    let action = match ProxyAction::parse(&request.action) {
        Ok(action) => action,
        Err(e) => return failure(400, e.to_string(), None),
    };

    info!("Proxying {:?}", action);

    let data = &request.data;
    let app = data
        .get("app")
        .and_then(Value::as_u64)
        .unwrap_or_else(|| client.app_id());

    let result = match action {
        ProxyAction::Test => client.app_info(app).await,
        ProxyAction::GetRecords => {
            client
                .get_records(app, data.get("query").and_then(Value::as_str))
                .await
        }
        ProxyAction::GetRecord => match record_id(data) {
            Ok(id) => client.get_record(app, id).await,
            Err(message) => return failure(400, message, None),
        },
        ProxyAction::AddRecord => match data.get("record") {
            Some(record) => client.add_record(app, record).await,
            None => return failure(400, "Missing record", None),
        },
        ProxyAction::UpdateRecord => {
            let id = match record_id(data) {
                Ok(id) => id,
                Err(message) => return failure(400, message, None),
            };
            match data.get("record") {
                Some(record) => client.update_record(app, id, record).await,
                None => return failure(400, "Missing record", None),
            }
        }
        ProxyAction::GetFieldMappings => client.form_fields(app).await,
    };

    match result {
        Ok(data) => json_response(
            200,
            &ProxySuccess {
                success: true,
                data,
            },
        ),
        Err(SharedError::Upstream { status, message }) => {
            // Upstream bodies are usually JSON; relay them structured when possible.
            let details = serde_json::from_str(&message).unwrap_or(Value::String(message));
            failure(status, "kintone request failed", Some(details))
        }
        Err(e) => failure(500, e.to_string(), None),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new());

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}

//! Minimal kintone REST API client.
//!
//! One HTTP round trip per operation, no retries. Non-2xx responses are
//! surfaced as [`Error::Upstream`] carrying the kintone status and body so
//! the proxy can relay them untouched.

use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::KintoneConfig;
use crate::{Error, Result};

/// Actions accepted by the proxy endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyAction {
    Test,
    GetRecords,
    GetRecord,
    AddRecord,
    UpdateRecord,
    GetFieldMappings,
}

impl ProxyAction {
    /// Parse the wire-format action name. Unknown names are rejected here,
    /// at the boundary, instead of falling through the dispatch.
    pub fn parse(action: &str) -> Result<Self> {
        match action {
            "test" => Ok(ProxyAction::Test),
            "getRecords" => Ok(ProxyAction::GetRecords),
            "getRecord" => Ok(ProxyAction::GetRecord),
            "addRecord" => Ok(ProxyAction::AddRecord),
            "updateRecord" => Ok(ProxyAction::UpdateRecord),
            "getFieldMappings" => Ok(ProxyAction::GetFieldMappings),
            other => Err(Error::Validation(format!("Unknown action: {}", other))),
        }
    }
}

/// Client for one kintone domain.
pub struct KintoneClient {
    http: reqwest::Client,
    config: KintoneConfig,
}

impl KintoneClient {
    pub fn new(config: KintoneConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Default app id for record operations.
    pub fn app_id(&self) -> u64 {
        self.config.app_id
    }

    /// Fetch app metadata. The cheapest call that proves the token works.
    pub async fn app_info(&self, app: u64) -> Result<Value> {
        self.get("app.json", &[("id", app.to_string())]).await
    }

    /// Fetch records, optionally restricted by a kintone query expression.
    pub async fn get_records(&self, app: u64, query: Option<&str>) -> Result<Value> {
        let mut params = vec![("app", app.to_string())];
        if let Some(query) = query {
            params.push(("query", query.to_string()));
        }
        self.get("records.json", &params).await
    }

    /// Fetch a single record by id.
    pub async fn get_record(&self, app: u64, id: u64) -> Result<Value> {
        self.get(
            "record.json",
            &[("app", app.to_string()), ("id", id.to_string())],
        )
        .await
    }

    /// Create a record.
    pub async fn add_record(&self, app: u64, record: &Value) -> Result<Value> {
        self.send(
            Method::POST,
            "record.json",
            &json!({ "app": app, "record": record }),
        )
        .await
    }

    /// Update a record by id.
    pub async fn update_record(&self, app: u64, id: u64, record: &Value) -> Result<Value> {
        self.send(
            Method::PUT,
            "record.json",
            &json!({ "app": app, "id": id, "record": record }),
        )
        .await
    }

    /// Fetch the form field definitions, used for field-code mapping.
    pub async fn form_fields(&self, app: u64) -> Result<Value> {
        self.get("app/form/fields.json", &[("app", app.to_string())])
            .await
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let mut url = format!("{}/k/v1/{}", self.config.base_url, path);
        for (i, (key, value)) in params.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }

        debug!("kintone GET {}", path);
        let response = self
            .http
            .get(&url)
            .header("X-Cybozu-API-Token", &self.config.api_token)
            .send()
            .await?;

        Self::into_json(response).await
    }

    async fn send(&self, method: Method, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/k/v1/{}", self.config.base_url, path);

        debug!("kintone {} {}", method, path);
        let response = self
            .http
            .request(method, &url)
            .header("X-Cybozu-API-Token", &self.config.api_token)
            .json(body)
            .send()
            .await?;

        Self::into_json(response).await
    }

    async fn into_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        response.json().await.map_err(Error::Http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_actions() {
        assert_eq!(ProxyAction::parse("test").unwrap(), ProxyAction::Test);
        assert_eq!(
            ProxyAction::parse("getRecords").unwrap(),
            ProxyAction::GetRecords
        );
        assert_eq!(
            ProxyAction::parse("getRecord").unwrap(),
            ProxyAction::GetRecord
        );
        assert_eq!(
            ProxyAction::parse("addRecord").unwrap(),
            ProxyAction::AddRecord
        );
        assert_eq!(
            ProxyAction::parse("updateRecord").unwrap(),
            ProxyAction::UpdateRecord
        );
        assert_eq!(
            ProxyAction::parse("getFieldMappings").unwrap(),
            ProxyAction::GetFieldMappings
        );
    }

    #[test]
    fn test_parse_unknown_action_rejected() {
        let err = ProxyAction::parse("deleteRecord").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}

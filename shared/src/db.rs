//! Database connection management.
//!
//! Credentials come from Secrets Manager; the secret payload is cached per
//! container so warm invocations skip the round trip.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::RwLock;

use crate::{Config, Error, Result};

static SECRET_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn cache() -> &'static RwLock<HashMap<String, String>> {
    SECRET_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Database credentials as stored in Secrets Manager.
#[derive(Debug, Deserialize)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
}

/// Get a secret string from Secrets Manager, consulting the cache first.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    if let Some(value) = cache().read().await.get(secret_arn) {
        return Ok(value.clone());
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    cache()
        .write()
        .await
        .insert(secret_arn.to_string(), secret.clone());

    Ok(secret)
}

/// Fetch credentials and open the Postgres pool for `config`.
pub async fn create_pool(config: &Config, secrets: &SecretsClient) -> Result<PgPool> {
    let raw = get_secret(secrets, &config.db_secret_arn).await?;
    let creds: DatabaseCredentials = serde_json::from_str(&raw)
        .map_err(|e| Error::Aws(format!("Failed to parse database credentials: {}", e)))?;

    let host = creds.host.as_deref().unwrap_or(&config.db_host);
    let port = creds.port.unwrap_or(5432);
    let dbname = creds.dbname.as_deref().unwrap_or(&config.db_name);

    let database_url = format!(
        "postgres://{}:{}@{}:{}/{}",
        creds.username, creds.password, host, port, dbname
    );

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .map_err(Error::Database)?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credentials() {
        let json = r#"{"username":"gb_app","password":"secret123","host":"db.internal","port":5432,"dbname":"genba_board"}"#;
        let creds: DatabaseCredentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds.username, "gb_app");
        assert_eq!(creds.password, "secret123");
        assert_eq!(creds.dbname.as_deref(), Some("genba_board"));
    }

    #[test]
    fn test_parse_credentials_minimal() {
        let json = r#"{"username":"gb_app","password":"secret123"}"#;
        let creds: DatabaseCredentials = serde_json::from_str(json).unwrap();
        assert!(creds.host.is_none());
        assert!(creds.port.is_none());
    }
}

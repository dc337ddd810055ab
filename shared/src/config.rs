//! Configuration management for Lambda functions.

use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database host
    pub db_host: String,
    /// Database name
    pub db_name: String,
    /// ARN of the secret containing database credentials
    pub db_secret_arn: String,
    /// AWS region
    pub aws_region: String,
    /// kintone connection settings (if configured)
    pub kintone: Option<KintoneConfig>,
}

/// kintone connection settings. The proxy refuses requests until all three
/// variables are present.
#[derive(Debug, Clone)]
pub struct KintoneConfig {
    /// Base URL of the kintone domain, e.g. `https://example.cybozu.com`
    pub base_url: String,
    /// Default app id for record operations
    pub app_id: u64,
    /// API token sent as `X-Cybozu-API-Token`
    pub api_token: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            db_host: env::var("DATABASE_HOST")?,
            db_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "genba_board".to_string()),
            db_secret_arn: env::var("DATABASE_URL_SECRET_ARN")?,
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            kintone: KintoneConfig::from_env(),
        })
    }
}

impl KintoneConfig {
    /// Load kintone settings, returning `None` unless every variable is set
    /// and well formed.
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("KINTONE_BASE_URL").ok()?;
        let app_id = env::var("KINTONE_APP_ID").ok()?.parse().ok()?;
        let api_token = env::var("KINTONE_API_TOKEN").ok()?;

        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id,
            api_token,
        })
    }
}

use super::toml_config::{ImportConfig, MonitoringConfig};
use crate::utils::error::{ImportError, Result};
use crate::utils::validation::validate_required_field;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "catalog-import")]
#[command(about = "Import products from a CSV file into a catalog service")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// CSV file with the products to import
    #[arg(long)]
    pub source: Option<String>,

    #[arg(long)]
    pub api_url: Option<String>,

    #[arg(long)]
    pub project_key: Option<String>,

    #[arg(long, env = "CATALOG_API_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Number of product groups transformed concurrently
    #[arg(long)]
    pub workers: Option<usize>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Name of the B2B customer group to get or create
    #[arg(long)]
    pub customer_group: Option<String>,

    /// Dry run - transform everything but do not create products
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit JSON formatted logs
    #[arg(long)]
    pub log_json: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    pub monitor: Option<bool>,

    /// Execution id used in logs, defaults to a timestamp
    #[arg(long)]
    pub execution_id: Option<String>,
}

impl CliConfig {
    /// 合併 TOML 配置與命令列覆蓋設定
    pub fn resolve(&self) -> Result<ImportConfig> {
        let mut config = match &self.config {
            Some(path) => ImportConfig::from_file(path).map_err(|e| ImportError::ConfigError {
                message: format!("failed to load config file '{}': {}", path, e),
            })?,
            None => ImportConfig::new(
                validate_required_field("--api-url (or --config)", &self.api_url)?,
                validate_required_field("--project-key (or --config)", &self.project_key)?,
                validate_required_field("--source (or --config)", &self.source)?,
            ),
        };

        if let Some(source) = &self.source {
            config.source.path = source.clone();
        }
        if let Some(api_url) = &self.api_url {
            config.catalog.api_url = api_url.clone();
        }
        if let Some(project_key) = &self.project_key {
            config.catalog.project_key = project_key.clone();
        }
        if let Some(token) = &self.auth_token {
            config.catalog.auth_token = Some(token.clone());
        }
        if let Some(timeout) = self.timeout_seconds {
            config.catalog.timeout_seconds = timeout;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.import.chunk_size = chunk_size;
        }
        if let Some(workers) = self.workers {
            config.import.workers = workers;
        }
        if let Some(group) = &self.customer_group {
            config.import.b2b_customer_group = group.clone();
        }
        if self.dry_run {
            config.import.dry_run = true;
        }
        if let Some(enabled) = self.monitor {
            config.monitoring = Some(MonitoringConfig { enabled });
        }

        Ok(config)
    }
}

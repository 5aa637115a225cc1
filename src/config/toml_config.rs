use crate::core::product_transformer::TransformSettings;
use crate::core::record_grouper::GroupingRule;
use crate::utils::error::{ImportError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub catalog: CatalogConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub import: ImportSettings,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub api_url: String,
    pub project_key: String,
    pub auth_token: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// 商品識別欄位，相同值的連續列屬於同一商品
    #[serde(default = "default_group_by")]
    pub group_by: String,
    #[serde(default = "default_schema_column")]
    pub schema_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_customer_group")]
    pub b2b_customer_group: String,
    #[serde(default = "default_canonical_locale")]
    pub canonical_locale: String,
    #[serde(default = "default_secondary_locale")]
    pub secondary_locale: String,
    #[serde(default = "default_excluded_name_prefix")]
    pub excluded_name_prefix: String,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_group_by() -> String {
    "id".to_string()
}

fn default_schema_column() -> String {
    "productType".to_string()
}

fn default_chunk_size() -> usize {
    20
}

fn default_workers() -> usize {
    4
}

fn default_customer_group() -> String {
    "b2b".to_string()
}

fn default_canonical_locale() -> String {
    "en".to_string()
}

fn default_secondary_locale() -> String {
    "de".to_string()
}

fn default_excluded_name_prefix() -> String {
    "#max".to_string()
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            workers: default_workers(),
            b2b_customer_group: default_customer_group(),
            canonical_locale: default_canonical_locale(),
            secondary_locale: default_secondary_locale(),
            excluded_name_prefix: default_excluded_name_prefix(),
            dry_run: false,
        }
    }
}

impl ImportConfig {
    /// 不經 TOML 檔、全部採用預設值的配置
    pub fn new(api_url: &str, project_key: &str, source_path: &str) -> Self {
        Self {
            catalog: CatalogConfig {
                api_url: api_url.to_string(),
                project_key: project_key.to_string(),
                auth_token: None,
                timeout_seconds: default_timeout_seconds(),
            },
            source: SourceConfig {
                path: source_path.to_string(),
                delimiter: default_delimiter(),
                group_by: default_group_by(),
                schema_column: default_schema_column(),
            },
            import: ImportSettings::default(),
            monitoring: None,
        }
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ImportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CATALOG_API_TOKEN})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("catalog.api_url", &self.catalog.api_url)?;
        validation::validate_non_empty_string("catalog.project_key", &self.catalog.project_key)?;
        validation::validate_positive_number(
            "catalog.timeout_seconds",
            self.catalog.timeout_seconds as usize,
            1,
        )?;

        validation::validate_path("source.path", &self.source.path)?;
        validation::validate_delimiter("source.delimiter", &self.source.delimiter)?;
        validation::validate_non_empty_string("source.group_by", &self.source.group_by)?;
        validation::validate_non_empty_string("source.schema_column", &self.source.schema_column)?;

        validation::validate_positive_number("import.chunk_size", self.import.chunk_size, 1)?;
        validation::validate_positive_number("import.workers", self.import.workers, 1)?;
        validation::validate_non_empty_string(
            "import.b2b_customer_group",
            &self.import.b2b_customer_group,
        )?;
        validation::validate_non_empty_string("import.canonical_locale", &self.import.canonical_locale)?;
        validation::validate_non_empty_string("import.secondary_locale", &self.import.secondary_locale)?;

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.catalog.timeout_seconds)
    }

    pub fn delimiter(&self) -> Result<u8> {
        validation::validate_delimiter("source.delimiter", &self.source.delimiter)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().is_some_and(|m| m.enabled)
    }

    pub fn grouping_rule(&self) -> GroupingRule {
        GroupingRule::new(&self.source.group_by, &self.source.schema_column)
    }

    pub fn transform_settings(&self) -> TransformSettings {
        TransformSettings {
            schema_column: self.source.schema_column.clone(),
            canonical_locale: self.import.canonical_locale.clone(),
            secondary_locale: self.import.secondary_locale.clone(),
            excluded_name_prefix: self.import.excluded_name_prefix.clone(),
        }
    }
}

impl Validate for ImportConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

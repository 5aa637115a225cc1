use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Malformed source file '{path}': {message}")]
    MalformedSource { path: String, message: String },

    #[error("Field mapping failed (line {line}): {message}")]
    FieldMappingError { line: usize, message: String },

    #[error("Cannot parse price: {token}")]
    InvalidPrice { token: String },

    #[error("Not supported attribute type '{kind}' for attribute '{attribute}'")]
    UnsupportedAttributeType { attribute: String, kind: String },

    #[error("Remote call '{operation}' failed with status {status}: {body}")]
    RemoteError {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Remote call '{operation}' timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Chunk write failed: {failed} of {total} requests failed, first error: {first_error}")]
    ChunkWriteFailed {
        failed: usize,
        total: usize,
        first_error: String,
    },
}

pub type Result<T> = std::result::Result<T, ImportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Source,
    Mapping,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ImportError {
    /// 可在單一資料列範圍內吸收的錯誤：記錄後略過該列
    pub fn is_row_recoverable(&self) -> bool {
        matches!(
            self,
            ImportError::FieldMappingError { .. } | ImportError::InvalidPrice { .. }
        )
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ImportError::ConfigError { .. }
            | ImportError::InvalidConfigValueError { .. }
            | ImportError::MissingConfigError { .. }
            | ImportError::ConfigValidationError { .. }
            | ImportError::UnsupportedAttributeType { .. } => ErrorCategory::Configuration,
            ImportError::CsvError(_)
            | ImportError::IoError(_)
            | ImportError::MalformedSource { .. } => ErrorCategory::Source,
            ImportError::FieldMappingError { .. }
            | ImportError::InvalidPrice { .. }
            | ImportError::SerializationError(_) => ErrorCategory::Mapping,
            ImportError::ApiError(_)
            | ImportError::RemoteError { .. }
            | ImportError::Timeout { .. }
            | ImportError::ChunkWriteFailed { .. } => ErrorCategory::Remote,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ImportError::FieldMappingError { .. } | ImportError::InvalidPrice { .. } => {
                ErrorSeverity::Low
            }
            ImportError::ApiError(_)
            | ImportError::Timeout { .. }
            | ImportError::RemoteError { .. }
            | ImportError::ChunkWriteFailed { .. } => ErrorSeverity::Medium,
            ImportError::SerializationError(_)
            | ImportError::CsvError(_)
            | ImportError::MalformedSource { .. } => ErrorSeverity::High,
            ImportError::ConfigError { .. }
            | ImportError::InvalidConfigValueError { .. }
            | ImportError::MissingConfigError { .. }
            | ImportError::ConfigValidationError { .. }
            | ImportError::UnsupportedAttributeType { .. }
            | ImportError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the TOML file and CLI flags, and that every product type only uses supported attribute types"
            }
            ErrorCategory::Source => {
                "Make sure the CSV file exists and its header contains sku, prices, images and the product type column"
            }
            ErrorCategory::Mapping => "Fix the offending rows in the CSV file and re-run the import",
            ErrorCategory::Remote => {
                "Check connectivity and credentials for the catalog API, then restart the run"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ImportError::Timeout { operation, seconds } => {
                format!("The catalog service did not answer '{}' within {}s", operation, seconds)
            }
            ImportError::MalformedSource { path, .. } => {
                format!("The source file '{}' could not be read as a product CSV", path)
            }
            other => other.to_string(),
        }
    }
}

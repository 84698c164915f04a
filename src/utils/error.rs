use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Catalog integrity violated: header declares {declared} objects but {actual} were parsed")]
    Integrity { declared: usize, actual: usize },

    #[error("Parse error in {source_name} at line {line}: {message}")]
    Parse {
        source_name: String,
        line: u64,
        message: String,
    },

    #[error("Run '{source_name}' has {actual} generations but parameter group '{parameter}' expects {expected}")]
    SeriesLengthMismatch {
        parameter: String,
        source_name: String,
        expected: usize,
        actual: usize,
    },

    #[error("File name '{file_name}' does not match run pattern '{pattern}'")]
    FileNameMismatch { file_name: String, pattern: String },

    #[error("Catalog too easy: total {dimension} {total} must exceed {minimal}")]
    CatalogTooEasy {
        dimension: &'static str,
        minimal: u64,
        total: u64,
    },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Io,
    Configuration,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EvalError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EvalError::Integrity { .. }
            | EvalError::Parse { .. }
            | EvalError::SeriesLengthMismatch { .. }
            | EvalError::FileNameMismatch { .. }
            | EvalError::CatalogTooEasy { .. }
            | EvalError::CsvError(_) => ErrorCategory::Input,
            EvalError::IoError(_) => ErrorCategory::Io,
            EvalError::ConfigError { .. }
            | EvalError::ConfigValidationError { .. }
            | EvalError::InvalidConfigValueError { .. }
            | EvalError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EvalError::SerializationError(_)
            | EvalError::ProcessingError { .. }
            | EvalError::ValidationError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // a mismatched catalog silently changes every downstream number
            EvalError::Integrity { .. } => ErrorSeverity::Critical,
            EvalError::IoError(_) => ErrorSeverity::Medium,
            EvalError::CatalogTooEasy { .. } => ErrorSeverity::Medium,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EvalError::Integrity { .. } => {
                "Regenerate the catalog or fix the object count in its header line"
            }
            EvalError::Parse { .. } | EvalError::CsvError(_) => {
                "Every record must hold three comma-separated non-negative integers"
            }
            EvalError::SeriesLengthMismatch { .. } => {
                "Re-run the affected repetitions with the same generation limit and no epsilon"
            }
            EvalError::FileNameMismatch { .. } => {
                "Rename the run files or pass a --pattern with exactly one capture group"
            }
            EvalError::CatalogTooEasy { .. } => {
                "Lower the capacity limits or pass --skip-difficulty-check"
            }
            EvalError::IoError(_) => "Check that the path exists and is readable/writable",
            EvalError::SerializationError(_) => "Report this as a bug",
            EvalError::ConfigError { .. }
            | EvalError::ConfigValidationError { .. }
            | EvalError::InvalidConfigValueError { .. }
            | EvalError::MissingConfigError { .. } => {
                "Fix the configuration value and run again"
            }
            EvalError::ProcessingError { .. } | EvalError::ValidationError { .. } => {
                "Check the input parameters"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Input data rejected: {}", self),
            ErrorCategory::Io => format!("File access failed: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Processing => format!("Processing failed: {}", self),
        }
    }

    /// Exit code for binaries, keyed on severity.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;

use thiserror::Error;

/// 錯誤訊息中引用原始文字時的最大長度
const PREVIEW_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum IntelError {
    #[error("No JSON found in the response: {}", preview(.text))]
    NoStructuredContentFound { text: String },

    #[error("API Error {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Uploaded file '{source_name}' must have a '{column}' column")]
    MissingColumnError { column: String, source_name: String },

    #[error("Required input '{field}' is empty")]
    EmptyInputError { field: String },

    #[error("Access denied: incorrect password")]
    AccessDenied,

    #[error("Unexpected response shape: expected {expected}, found {found}")]
    UnexpectedShape { expected: String, found: String },

    #[error("Invalid completion response: {message}")]
    InvalidResponse { message: String },

    #[error("Unsupported file type for '{path}': {reason}")]
    UnsupportedFileType { path: String, reason: String },

    #[error("HTTP transport error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet read error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

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

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Remote,
    Extraction,
    Configuration,
    Access,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IntelError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IntelError::MissingColumnError { .. }
            | IntelError::EmptyInputError { .. }
            | IntelError::UnsupportedFileType { .. }
            | IntelError::CsvError(_)
            | IntelError::SpreadsheetError(_) => ErrorCategory::Input,
            IntelError::ApiError { .. } | IntelError::HttpError(_) => ErrorCategory::Remote,
            IntelError::NoStructuredContentFound { .. }
            | IntelError::UnexpectedShape { .. }
            | IntelError::InvalidResponse { .. }
            | IntelError::SerializationError(_) => ErrorCategory::Extraction,
            IntelError::ConfigError { .. }
            | IntelError::ConfigValidationError { .. }
            | IntelError::InvalidConfigValueError { .. }
            | IntelError::MissingConfigError { .. } => ErrorCategory::Configuration,
            IntelError::AccessDenied => ErrorCategory::Access,
            IntelError::ZipError(_) | IntelError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 模型回覆不合格，重跑通常就能解決
            ErrorCategory::Extraction => ErrorSeverity::Medium,
            ErrorCategory::Remote => match self {
                IntelError::ApiError { status, .. } if *status == 429 || *status >= 500 => {
                    ErrorSeverity::Medium
                }
                _ => ErrorSeverity::High,
            },
            ErrorCategory::Input | ErrorCategory::Configuration | ErrorCategory::Access => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            IntelError::NoStructuredContentFound { .. } | IntelError::UnexpectedShape { .. } => {
                "The model did not reply with usable JSON; run the request again"
            }
            IntelError::ApiError { status, .. } if *status == 401 || *status == 403 => {
                "Check that the API key in [api].api_key is valid"
            }
            IntelError::ApiError { status, .. } if *status == 429 => {
                "The API is rate limiting requests; increase [workflow].request_delay_ms"
            }
            IntelError::ApiError { .. } | IntelError::InvalidResponse { .. } => {
                "Verify the completion endpoint and model name, then retry"
            }
            IntelError::HttpError(_) => {
                "Check network connectivity; behind an intercepting proxy consider --insecure"
            }
            IntelError::MissingColumnError { .. } => {
                "Add a header cell named exactly COMPANY to the first sheet"
            }
            IntelError::EmptyInputError { .. } => "Provide a non-empty value and run again",
            IntelError::UnsupportedFileType { .. } => "Use an .xlsx, .xls, .ods, .csv or .tsv file",
            IntelError::CsvError(_) | IntelError::SpreadsheetError(_) => {
                "Make sure the uploaded file is a valid spreadsheet"
            }
            IntelError::AccessDenied => "Pass the correct --password or set COMPANY_INTEL_PASSWORD",
            IntelError::ConfigError { .. }
            | IntelError::ConfigValidationError { .. }
            | IntelError::InvalidConfigValueError { .. }
            | IntelError::MissingConfigError { .. } => "Fix the configuration file or CLI flags",
            IntelError::SerializationError(_) => "Report the offending model reply",
            IntelError::ZipError(_) | IntelError::IoError(_) => {
                "Check that the output directory exists and is writable"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Input problem: {}", self),
            ErrorCategory::Remote => format!("Completion API request failed: {}", self),
            ErrorCategory::Extraction => format!("Could not read the model reply: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Access => self.to_string(),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{}…", head)
}

pub type Result<T> = std::result::Result<T, IntelError>;

use crate::adapters::spreadsheet::OutputFormat;
use crate::utils::error::{IntelError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";
pub const DEFAULT_MODEL: &str = "sonar-pro";
pub const API_KEY_ENV: &str = "PERPLEXITY_API_KEY";
pub const PASSWORD_ENV: &str = "COMPANY_INTEL_PASSWORD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub api: ApiSettings,
    pub fields: FieldSettings,
    pub output: OutputSettings,
    pub workflow: WorkflowSettings,
    pub access: AccessSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    /// 關閉 TLS 憑證驗證（例如公司代理攔截 HTTPS 時）
    pub accept_invalid_certs: bool,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: String,
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    pub request_delay_ms: u64,
    pub market_filter: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessSettings {
    pub password: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            accept_invalid_certs: false,
            timeout_seconds: None,
        }
    }
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            extra: vec!["Drug Pipeline".to_string(), "Therapeutic Area".to_string()],
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: "./output".to_string(),
            format: OutputFormat::Xlsx,
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            request_delay_ms: 1500,
            market_filter: "Peptide focused pharma companies working on drug development"
                .to_string(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| IntelError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PERPLEXITY_API_KEY})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| IntelError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 檔案未提供時，從環境變數補上 API 金鑰與密碼
    pub fn apply_env_fallbacks(&mut self) {
        if self.api.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                self.api.api_key = key;
            }
        }
        if self.access.password.is_none() {
            self.access.password = std::env::var(PASSWORD_ENV).ok();
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("api.endpoint", &self.api.endpoint)?;
        validation::validate_non_empty_string("api.model", &self.api.model)?;

        if self.api.api_key.trim().is_empty() || self.api.api_key.contains("${") {
            return Err(IntelError::MissingConfigError {
                field: format!("api.api_key (or the {} environment variable)", API_KEY_ENV),
            });
        }

        if let Some(timeout) = self.api.timeout_seconds {
            validation::validate_range("api.timeout_seconds", timeout, 1, 600)?;
        }

        validation::validate_path("output.directory", &self.output.directory)?;
        validation::validate_range(
            "workflow.request_delay_ms",
            self.workflow.request_delay_ms,
            0,
            60_000,
        )?;

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[api]
endpoint = "https://proxy.internal/chat/completions"
model = "sonar"
api_key = "abc123"
accept_invalid_certs = true
timeout_seconds = 45

[fields]
extra = ["Headcount", "Therapeutic Area"]

[output]
directory = "./reports"
format = "csv"

[workflow]
request_delay_ms = 250
market_filter = "mRNA vaccine developers"

[access]
password = "letmein"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(
            config.api.endpoint,
            "https://proxy.internal/chat/completions"
        );
        assert_eq!(config.api.model, "sonar");
        assert!(config.api.accept_invalid_certs);
        assert_eq!(config.api.timeout_seconds, Some(45));
        assert_eq!(config.fields.extra, vec!["Headcount", "Therapeutic Area"]);
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert_eq!(config.workflow.request_delay_ms, 250);
        assert_eq!(config.access.password.as_deref(), Some("letmein"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.api.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.api.model, DEFAULT_MODEL);
        assert!(!config.api.accept_invalid_certs);
        assert_eq!(config.workflow.request_delay_ms, 1500);
        assert_eq!(config.output.format, OutputFormat::Xlsx);
        assert_eq!(
            config.fields.extra,
            vec!["Drug Pipeline", "Therapeutic Area"]
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("COMPANY_INTEL_TEST_KEY", "pplx-from-env");

        let toml_content = r#"
[api]
api_key = "${COMPANY_INTEL_TEST_KEY}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.api.api_key, "pplx-from-env");

        std::env::remove_var("COMPANY_INTEL_TEST_KEY");
    }

    #[test]
    fn test_unresolved_api_key_fails_validation() {
        let toml_content = r#"
[api]
api_key = "${COMPANY_INTEL_UNSET_VARIABLE}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(IntelError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[api]
endpoint = "invalid-url"
api_key = "abc"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let mut config = TomlConfig::default();
        config.api.api_key = "abc".to_string();
        config.workflow.request_delay_ms = 120_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        assert!(matches!(
            TomlConfig::from_toml_str("[api\nendpoint ="),
            Err(IntelError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[output]
directory = "./from-file"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output.directory, "./from-file");
    }
}

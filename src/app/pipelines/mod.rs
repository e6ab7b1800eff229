pub mod batch_pipeline;
pub mod diff_pipeline;
pub mod search_pipeline;

pub use batch_pipeline::BatchPipeline;
pub use diff_pipeline::DiffPipeline;
pub use search_pipeline::SearchPipeline;

use crate::adapters::spreadsheet::{export_table, OutputFormat};
use crate::config::toml_config::TomlConfig;
use crate::core::flatten::column_headers;
use crate::core::Storage;
use crate::domain::model::{
    value_kind, CompanyRecord, FlatRow, ResultTable, RunReport, TransformResult, Workflow,
};
use crate::utils::error::{IntelError, Result};
use serde_json::Value;
use std::time::Duration;

/// Settings shared by every workflow.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub extra_fields: Vec<String>,
    pub output_format: OutputFormat,
    pub request_delay: Duration,
}

impl WorkflowOptions {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            extra_fields: config.fields.extra.clone(),
            output_format: config.output.format,
            request_delay: Duration::from_millis(config.workflow.request_delay_ms),
        }
    }
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self::from_config(&TomlConfig::default())
    }
}

/// 搜尋回覆可能是陣列、`{"Companies": [...]}`，或單一公司物件
pub(crate) fn records_from_search_reply(reply: Value) -> Result<Vec<CompanyRecord>> {
    let items = match reply {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("Companies") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(IntelError::UnexpectedShape {
                    expected: "\"Companies\" to hold an array".to_string(),
                    found: value_kind(&other).to_string(),
                })
            }
            None => vec![Value::Object(map)],
        },
        other => {
            return Err(IntelError::UnexpectedShape {
                expected: "an array of companies or an object with \"Companies\"".to_string(),
                found: value_kind(&other).to_string(),
            })
        }
    };

    items.into_iter().map(CompanyRecord::from_value).collect()
}

pub(crate) fn result_table(
    workflow: Workflow,
    options: &WorkflowOptions,
    rows: Vec<FlatRow>,
) -> ResultTable {
    ResultTable {
        sheet_name: workflow.sheet_name().to_string(),
        columns: column_headers(&options.extra_fields),
        rows,
    }
}

/// Export the table and write it under the workflow's fixed file name.
pub(crate) async fn write_table<S: Storage>(
    storage: &S,
    workflow: Workflow,
    options: &WorkflowOptions,
    result: TransformResult,
) -> Result<RunReport> {
    let file_name = format!(
        "{}.{}",
        workflow.file_stem(),
        options.output_format.extension()
    );
    let bytes = export_table(&result.table, options.output_format)?;
    tracing::debug!("Writing {} ({} bytes)", file_name, bytes.len());
    let output_path = storage.write_file(&file_name, &bytes).await?;

    Ok(RunReport {
        workflow,
        output_path: Some(output_path),
        rows_written: result.table.len(),
        skipped: result.skipped,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::core::{CompletionClient, Storage};
    use crate::utils::error::{IntelError, Result};
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Replies in order; an `Err` entry becomes an `ApiError` with that status.
    pub struct ScriptedClient {
        replies: Mutex<VecDeque<std::result::Result<String, u16>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        pub fn new(replies: Vec<std::result::Result<&str, u16>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub async fn calls(&self) -> usize {
            self.prompts.lock().await.len()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().await.push(prompt.to_string());
            match self.replies.lock().await.pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(status)) => Err(IntelError::ApiError {
                    status,
                    body: "scripted failure".to_string(),
                }),
                None => Err(IntelError::ApiError {
                    status: 500,
                    body: "no scripted reply left".to_string(),
                }),
            }
        }
    }

    #[derive(Clone, Default)]
    pub struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }

        pub async fn file_count(&self) -> usize {
            self.files.lock().await.len()
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<String> {
            self.files
                .lock()
                .await
                .insert(path.to_string(), data.to_vec());
            Ok(format!("mock://{}", path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_reply_shapes() {
        let wrapped = records_from_search_reply(json!({
            "Companies": [{"Company Name": "X"}, {"Company Name": "Y"}]
        }))
        .unwrap();
        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped[1].company_name, "Y");

        let bare = records_from_search_reply(json!([{"Company Name": "X"}])).unwrap();
        assert_eq!(bare.len(), 1);

        let single = records_from_search_reply(json!({"Company Name": "Solo"})).unwrap();
        assert_eq!(single[0].company_name, "Solo");
    }

    #[test]
    fn test_search_reply_rejects_other_shapes() {
        assert!(matches!(
            records_from_search_reply(json!("no companies")),
            Err(IntelError::UnexpectedShape { .. })
        ));
        assert!(matches!(
            records_from_search_reply(json!({"Companies": "none"})),
            Err(IntelError::UnexpectedShape { .. })
        ));
        assert!(matches!(
            records_from_search_reply(json!({"Companies": ["X"]})),
            Err(IntelError::UnexpectedShape { .. })
        ));
    }
}

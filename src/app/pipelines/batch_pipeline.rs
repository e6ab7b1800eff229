use super::{result_table, write_table, WorkflowOptions};
use crate::adapters::spreadsheet::read_company_column;
use crate::core::flatten::flatten;
use crate::core::prompt::company_prompt;
use crate::core::{CompletionClient, Pipeline, Storage};
use crate::domain::model::{
    CompanyRecord, Extraction, RunReport, SkippedCompany, TransformResult, Workflow,
};
use crate::utils::error::Result;
use std::path::PathBuf;

/// 依上傳清單逐一查詢公司資料；單一公司失敗只記錄警告並略過
pub struct BatchPipeline<S: Storage, C: CompletionClient> {
    pub(crate) storage: S,
    pub(crate) client: C,
    pub(crate) options: WorkflowOptions,
    pub(crate) input: PathBuf,
}

impl<S: Storage, C: CompletionClient> BatchPipeline<S, C> {
    pub fn new(storage: S, client: C, options: WorkflowOptions, input: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            client,
            options,
            input: input.into(),
        }
    }

    /// Runs the lookups for an already-loaded company list.
    pub async fn extract_companies(&self, companies: &[String]) -> Extraction {
        let mut extraction = Extraction::default();

        for (index, company) in companies.iter().enumerate() {
            // 固定間隔，避免觸發 API 速率限制
            if index > 0 && !self.options.request_delay.is_zero() {
                tokio::time::sleep(self.options.request_delay).await;
            }

            tracing::info!("🔍 [{}/{}] {}", index + 1, companies.len(), company);
            let prompt = company_prompt(company, &self.options.extra_fields);

            let outcome = self
                .client
                .fetch_structured(&prompt)
                .await
                .and_then(CompanyRecord::from_value);

            match outcome {
                Ok(record) => extraction.records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", company, e);
                    extraction.skipped.push(SkippedCompany {
                        company: company.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        extraction
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: CompletionClient> Pipeline for BatchPipeline<S, C> {
    fn workflow(&self) -> Workflow {
        Workflow::BatchExtraction
    }

    async fn extract(&self) -> Result<Extraction> {
        let companies = read_company_column(&self.input)?;
        tracing::info!(
            "📋 Loaded {} companies from {}",
            companies.len(),
            self.input.display()
        );
        Ok(self.extract_companies(&companies).await)
    }

    async fn transform(&self, extraction: Extraction) -> Result<TransformResult> {
        let rows = flatten(&extraction.records, &self.options.extra_fields);
        Ok(TransformResult {
            table: result_table(self.workflow(), &self.options, rows),
            skipped: extraction.skipped,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<RunReport> {
        write_table(&self.storage, self.workflow(), &self.options, result).await
    }
}

use super::search_pipeline::run_market_search;
use super::{result_table, write_table, WorkflowOptions};
use crate::adapters::spreadsheet::read_company_column;
use crate::core::flatten::flatten;
use crate::core::reconcile::{find_new, ExistingCompanySet};
use crate::core::{CompletionClient, Pipeline, Storage};
use crate::domain::model::{Extraction, RunReport, TransformResult, Workflow};
use crate::utils::error::Result;
use crate::utils::validation::require_input;
use std::path::PathBuf;

/// Market search that only reports companies missing from an uploaded list.
pub struct DiffPipeline<S: Storage, C: CompletionClient> {
    pub(crate) storage: S,
    pub(crate) client: C,
    pub(crate) options: WorkflowOptions,
    pub(crate) input: PathBuf,
    pub(crate) market_filter: String,
}

impl<S: Storage, C: CompletionClient> DiffPipeline<S, C> {
    pub fn new(
        storage: S,
        client: C,
        options: WorkflowOptions,
        input: impl Into<PathBuf>,
        market_filter: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            client,
            options,
            input: input.into(),
            market_filter: market_filter.into(),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: CompletionClient> Pipeline for DiffPipeline<S, C> {
    fn workflow(&self) -> Workflow {
        Workflow::SearchAndDiff
    }

    async fn extract(&self) -> Result<Extraction> {
        // 所有輸入檢查都在呼叫 API 之前完成
        require_input("market filter", &self.market_filter)?;
        let known_companies = read_company_column(&self.input)?;
        tracing::info!(
            "📋 {} known companies loaded from {}",
            known_companies.len(),
            self.input.display()
        );

        let mut extraction =
            run_market_search(&self.client, &self.market_filter, &self.options).await?;
        extraction.known_companies = known_companies;
        Ok(extraction)
    }

    async fn transform(&self, extraction: Extraction) -> Result<TransformResult> {
        let existing = ExistingCompanySet::from_names(&extraction.known_companies);
        let candidates = flatten(&extraction.records, &self.options.extra_fields);
        let found = candidates.len();
        let rows = find_new(candidates, &existing);
        tracing::info!("🆕 {} of {} companies are new", rows.len(), found);

        Ok(TransformResult {
            table: result_table(self.workflow(), &self.options, rows),
            skipped: extraction.skipped,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<RunReport> {
        if result.table.is_empty() {
            tracing::warn!("No new companies found.");
            return Ok(RunReport {
                workflow: self.workflow(),
                output_path: None,
                rows_written: 0,
                skipped: result.skipped,
            });
        }
        write_table(&self.storage, self.workflow(), &self.options, result).await
    }
}

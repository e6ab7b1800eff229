use super::{records_from_search_reply, result_table, write_table, WorkflowOptions};
use crate::core::flatten::flatten;
use crate::core::prompt::market_search_prompt;
use crate::core::{CompletionClient, Pipeline, Storage};
use crate::domain::model::{Extraction, RunReport, TransformResult, Workflow};
use crate::utils::error::Result;
use crate::utils::validation::require_input;

/// Open-ended market search: one prompt, one call, any failure aborts.
pub struct SearchPipeline<S: Storage, C: CompletionClient> {
    pub(crate) storage: S,
    pub(crate) client: C,
    pub(crate) options: WorkflowOptions,
    pub(crate) market_filter: String,
}

impl<S: Storage, C: CompletionClient> SearchPipeline<S, C> {
    pub fn new(
        storage: S,
        client: C,
        options: WorkflowOptions,
        market_filter: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            client,
            options,
            market_filter: market_filter.into(),
        }
    }
}

/// Shared by search and search & diff.
pub(crate) async fn run_market_search<C: CompletionClient>(
    client: &C,
    market_filter: &str,
    options: &WorkflowOptions,
) -> Result<Extraction> {
    tracing::info!("🌍 Searching for: {}", market_filter.trim());
    let prompt = market_search_prompt(market_filter, &options.extra_fields);
    let reply = client.fetch_structured(&prompt).await?;
    let records = records_from_search_reply(reply)?;
    tracing::info!("Model returned {} companies", records.len());

    Ok(Extraction {
        records,
        ..Extraction::default()
    })
}

#[async_trait::async_trait]
impl<S: Storage, C: CompletionClient> Pipeline for SearchPipeline<S, C> {
    fn workflow(&self) -> Workflow {
        Workflow::MarketSearch
    }

    async fn extract(&self) -> Result<Extraction> {
        require_input("market filter", &self.market_filter)?;
        run_market_search(&self.client, &self.market_filter, &self.options).await
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::spreadsheet::OutputFormat;
    use crate::app::pipelines::test_support::{MockStorage, ScriptedClient};
    use crate::domain::model::FlatRow;
    use crate::utils::error::IntelError;

    fn options() -> WorkflowOptions {
        WorkflowOptions {
            extra_fields: vec![],
            output_format: OutputFormat::Csv,
            ..WorkflowOptions::default()
        }
    }

    #[tokio::test]
    async fn test_companies_wrapper_flattens_in_order() {
        let client = ScriptedClient::new(vec![Ok(
            r#"{"Companies": [{"Company Name":"X"}, {"Company Name":"Y"}]}"#,
        )]);
        let pipeline = SearchPipeline::new(MockStorage::default(), client, options(), "peptides");

        let extraction = pipeline.extract().await.unwrap();
        let transformed = pipeline.transform(extraction).await.unwrap();

        let names: Vec<&str> = transformed
            .table
            .rows
            .iter()
            .map(FlatRow::company_name)
            .collect();
        assert_eq!(names, vec!["X", "Y"]);
    }

    #[tokio::test]
    async fn test_bare_array_with_trailing_note_keeps_all_companies() {
        let client = ScriptedClient::new(vec![Ok(
            "[{\"Company Name\": \"X\"}, {\"Company Name\": \"Y\"}]\n\nNote: figures are approximate.",
        )]);
        let pipeline = SearchPipeline::new(MockStorage::default(), client, options(), "peptides");

        let extraction = pipeline.extract().await.unwrap();
        let names: Vec<&str> = extraction
            .records
            .iter()
            .map(|record| record.company_name.as_str())
            .collect();
        assert_eq!(names, vec!["X", "Y"]);
    }

    #[tokio::test]
    async fn test_blank_filter_fails_without_network() {
        let pipeline = SearchPipeline::new(
            MockStorage::default(),
            ScriptedClient::new(vec![]),
            options(),
            "  \n ",
        );

        assert!(matches!(
            pipeline.extract().await,
            Err(IntelError::EmptyInputError { .. })
        ));
        assert_eq!(pipeline.client.calls().await, 0);
    }

    #[tokio::test]
    async fn test_api_failure_aborts_search() {
        let client = ScriptedClient::new(vec![Err(502)]);
        let pipeline = SearchPipeline::new(MockStorage::default(), client, options(), "peptides");

        assert!(matches!(
            pipeline.extract().await,
            Err(IntelError::ApiError { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_load_writes_csv_with_fixed_name() {
        let client = ScriptedClient::new(vec![Ok(r#"[{"Company Name":"X","City":"Lund"}]"#)]);
        let storage = MockStorage::default();
        let pipeline = SearchPipeline::new(storage.clone(), client, options(), "peptides");

        let extraction = pipeline.extract().await.unwrap();
        let transformed = pipeline.transform(extraction).await.unwrap();
        let report = pipeline.load(transformed).await.unwrap();

        assert_eq!(report.workflow, Workflow::MarketSearch);
        assert_eq!(report.rows_written, 1);
        let csv =
            String::from_utf8(storage.get_file("global_market_search.csv").await.unwrap()).unwrap();
        assert!(csv.starts_with("Company Name,Type,Assets,City,"));
        assert!(csv.contains("X,,,Lund,"));
    }
}

use crate::auth::Session;
use crate::core::Pipeline;
use crate::domain::model::RunReport;
use crate::utils::error::Result;

/// Drives one workflow through extract, transform and load.
pub struct WorkflowEngine<P: Pipeline> {
    pipeline: P,
    session: Session,
}

impl<P: Pipeline> WorkflowEngine<P> {
    /// Requires a session from [`crate::auth::AccessGate::authenticate`].
    pub fn new(pipeline: P, session: &Session) -> Self {
        Self {
            pipeline,
            session: session.clone(),
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let workflow = self.pipeline.workflow();
        tracing::info!(
            "🚀 Starting {} (session opened {})",
            workflow,
            self.session.opened_at().format("%Y-%m-%d %H:%M:%S UTC")
        );

        let extraction = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} records ({} skipped)",
            extraction.records.len(),
            extraction.skipped.len()
        );

        let transformed = self.pipeline.transform(extraction).await?;
        tracing::info!("Transformed into {} rows", transformed.table.len());

        let report = self.pipeline.load(transformed).await?;
        match &report.output_path {
            Some(path) => tracing::info!("📁 Output saved to: {}", path),
            None => tracing::info!("Nothing to export"),
        }

        Ok(report)
    }
}

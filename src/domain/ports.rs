use crate::core::json_recovery::recover_json;
use crate::domain::model::{Extraction, RunReport, TransformResult, Workflow};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Where exported files go. `write_file` returns the full location written.
pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// A remote model that answers a prompt with free text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the raw reply text for one prompt.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// One request, one reply, recovered into JSON.
    async fn fetch_structured(&self, prompt: &str) -> Result<Value> {
        let reply = self.complete(prompt).await?;
        tracing::debug!("Model reply ({} chars)", reply.chars().count());
        recover_json(&reply)
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    fn workflow(&self) -> Workflow;
    async fn extract(&self) -> Result<Extraction>;
    async fn transform(&self, extraction: Extraction) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<RunReport>;
}

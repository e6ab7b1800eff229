pub mod engine;
pub mod flatten;
pub mod json_recovery;
pub mod prompt;
pub mod reconcile;

pub use crate::domain::model::{CompanyRecord, FlatRow, ResultTable, TransformResult};
pub use crate::domain::ports::{CompletionClient, Pipeline, Storage};
pub use crate::utils::error::Result;

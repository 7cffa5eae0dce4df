use crate::domain::model::{CompanyRow, CompletedExport};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// The three stages of an export run: fetch raw company records, flatten
/// them into rows, assemble the workbook artifact.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Value>>;
    async fn transform(&self, records: Vec<Value>) -> Result<Vec<CompanyRow>>;
    async fn load(&self, rows: Vec<CompanyRow>) -> Result<CompletedExport>;
}

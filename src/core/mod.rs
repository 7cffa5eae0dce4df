pub mod client;
pub mod engine;
pub mod flatten;
pub mod pipeline;
pub mod workbook;

pub use crate::domain::model::{
    CompanyRow, CompletedExport, ExportMetadata, ExportOutcome, ExportRequest, ExportResponse,
    SearchParams, ValidatedRequest, FIELDS,
};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;

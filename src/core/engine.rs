use crate::config::ApiSettings;
use crate::core::pipeline::ExportPipeline;
use crate::core::{
    ExportOutcome, ExportRequest, ExportResponse, Pipeline, SearchParams, ValidatedRequest,
};
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::{clamp_int, coerce_number, normalize_ateco, normalize_province};

/// Check and normalize a raw export request. Nothing past this point sees
/// an unvalidated token or filter.
pub fn validate_request(request: &ExportRequest) -> Result<ValidatedRequest> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(ExportError::ValidationError {
            message: "Il token è obbligatorio.".to_string(),
        });
    }

    let ateco_code = normalize_ateco(&request.ateco_code)?;
    let province = normalize_province(&request.province)?;

    let limit = clamp_int(
        coerce_number(request.limit.as_ref(), f64::from(ApiSettings::DEFAULT_LIMIT)),
        ApiSettings::MIN_LIMIT,
        ApiSettings::MAX_RESULTS,
    );
    let max_results = clamp_int(
        coerce_number(
            request.max_results.as_ref(),
            f64::from(ApiSettings::DEFAULT_MAX_RESULTS),
        ),
        ApiSettings::MIN_LIMIT,
        ApiSettings::MAX_RESULTS,
    );

    Ok(ValidatedRequest {
        token: token.to_string(),
        params: SearchParams {
            ateco_code,
            province,
            limit,
            max_results,
            sandbox: request.sandbox,
        },
    })
}

/// Drives a pipeline through its three stages. An extract that returns no
/// records short-circuits: no flattening, no workbook.
pub struct ExportEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ExportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<ExportOutcome> {
        tracing::info!("Starting export");

        let records = self.pipeline.extract().await?;
        tracing::info!("Extracted {} records", records.len());

        if records.is_empty() {
            return Ok(ExportOutcome::Empty);
        }

        let rows = self.pipeline.transform(records).await?;
        tracing::info!("Flattened {} rows", rows.len());

        let export = self.pipeline.load(rows).await?;
        tracing::info!(
            "Workbook ready: {} ({} bytes)",
            export.file_name,
            export.artifact.len()
        );

        Ok(ExportOutcome::Completed(export))
    }
}

/// Full export run for one request: validate, fetch, flatten, build.
/// Every failure mode collapses into a `success: false` payload; this
/// function never errors out.
pub async fn run_export(request: &ExportRequest, settings: &ApiSettings) -> ExportResponse {
    match try_export(request, settings).await {
        Ok(ExportOutcome::Empty) => ExportResponse::empty(),
        Ok(ExportOutcome::Completed(export)) => ExportResponse::completed(&export),
        Err(error) => {
            tracing::warn!("Export failed: {}", error);
            ExportResponse::failure(error.to_string())
        }
    }
}

async fn try_export(request: &ExportRequest, settings: &ApiSettings) -> Result<ExportOutcome> {
    let validated = validate_request(request)?;
    let pipeline = ExportPipeline::new(validated, settings);
    ExportEngine::new(pipeline).run().await
}

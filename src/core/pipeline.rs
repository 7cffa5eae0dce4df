use crate::config::ApiSettings;
use crate::core::client::OpenapiClient;
use crate::core::flatten::flatten_record;
use crate::core::workbook::build_workbook;
use crate::core::{
    CompanyRow, CompletedExport, ExportMetadata, Pipeline, SearchParams, ValidatedRequest,
};
use crate::utils::error::Result;
use serde_json::Value;

/// The company export pipeline: search upstream, flatten, build the
/// workbook. One instance serves one validated request.
pub struct ExportPipeline {
    client: OpenapiClient,
    params: SearchParams,
    source_label: String,
}

impl ExportPipeline {
    pub fn new(request: ValidatedRequest, settings: &ApiSettings) -> Self {
        let client = OpenapiClient::new(request.token, request.params.sandbox, settings);
        Self {
            client,
            params: request.params,
            source_label: settings.search_path.clone(),
        }
    }

    fn metadata(&self, total: usize) -> ExportMetadata {
        ExportMetadata {
            total_records: total,
            ateco_code: self.params.ateco_code.clone(),
            province: self.params.province.clone(),
            sandbox: self.params.sandbox,
            source: self.source_label.clone(),
        }
    }

    fn file_name(&self) -> String {
        format!(
            "openapi_companies_{}_{}.xlsx",
            self.params.province, self.params.ateco_code
        )
    }
}

#[async_trait::async_trait]
impl Pipeline for ExportPipeline {
    async fn extract(&self) -> Result<Vec<Value>> {
        tracing::debug!(
            "Searching companies: ateco {} province {} (sandbox: {})",
            self.params.ateco_code,
            self.params.province,
            self.params.sandbox
        );
        self.client.fetch_companies(&self.params).await
    }

    async fn transform(&self, records: Vec<Value>) -> Result<Vec<CompanyRow>> {
        // Row order mirrors upstream order; no sorting, no filtering.
        Ok(records.iter().map(flatten_record).collect())
    }

    async fn load(&self, rows: Vec<CompanyRow>) -> Result<CompletedExport> {
        let metadata = self.metadata(rows.len());
        let artifact = build_workbook(&rows, &metadata)?;
        Ok(CompletedExport {
            total: rows.len(),
            file_name: self.file_name(),
            artifact,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn validated(limit: u32, max_results: u32) -> ValidatedRequest {
        ValidatedRequest {
            token: "test-token".to_string(),
            params: SearchParams {
                ateco_code: "1071".to_string(),
                province: "VR".to_string(),
                limit,
                max_results,
                sandbox: false,
            },
        }
    }

    fn pipeline_for(server: &MockServer) -> ExportPipeline {
        let settings = ApiSettings::default().with_base_url(server.base_url());
        ExportPipeline::new(validated(100, 500), &settings)
    }

    #[tokio::test]
    async fn test_extract_fetches_from_search_endpoint() {
        let server = MockServer::start();
        let search_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/IT-search")
                .query_param("atecoCode", "1071")
                .query_param("province", "VR");
            then.status(200).json_body(json!({
                "success": true,
                "data": [{"companyName": "FORNO VERONA S.R.L."}]
            }));
        });

        let pipeline = pipeline_for(&server);
        let records = pipeline.extract().await.unwrap();

        search_mock.assert();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_transform_flattens_in_order() {
        let server = MockServer::start();
        let pipeline = pipeline_for(&server);

        let records = vec![
            json!({"companyName": "PRIMA"}),
            json!({"companyName": "SECONDA"}),
        ];
        let rows = pipeline.transform(records).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("company_name"), Some(&json!("PRIMA")));
        assert_eq!(rows[1].get("company_name"), Some(&json!("SECONDA")));
    }

    #[tokio::test]
    async fn test_load_names_file_after_filters() {
        let server = MockServer::start();
        let pipeline = pipeline_for(&server);

        let rows = pipeline
            .transform(vec![json!({"companyName": "PANIFICIO S.N.C."})])
            .await
            .unwrap();
        let export = pipeline.load(rows).await.unwrap();

        assert_eq!(export.file_name, "openapi_companies_VR_1071.xlsx");
        assert_eq!(export.total, 1);
        assert_eq!(export.metadata.total_records, 1);
        assert_eq!(export.metadata.ateco_code, "1071");
        assert_eq!(export.metadata.province, "VR");
        assert_eq!(export.metadata.source, "/IT-search");
        assert!(!export.metadata.sandbox);

        // The artifact is a readable workbook.
        let cursor = std::io::Cursor::new(export.artifact);
        let mut archive = zip::ZipArchive::new(cursor).unwrap();
        assert!(archive.by_name("xl/workbook.xml").is_ok());
    }
}

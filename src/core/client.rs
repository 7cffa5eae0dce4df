use crate::config::ApiSettings;
use crate::domain::model::SearchParams;
use crate::utils::error::{ExportError, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Client for the Openapi company search endpoint.
///
/// Holds the bearer token for the lifetime of one export run; the token is
/// never logged or persisted anywhere.
pub struct OpenapiClient {
    client: Client,
    base_url: String,
    search_path: String,
    token: String,
    timeout: Duration,
}

impl OpenapiClient {
    pub fn new(token: impl Into<String>, sandbox: bool, settings: &ApiSettings) -> Self {
        Self {
            client: Client::new(),
            base_url: settings.base_url(sandbox).trim_end_matches('/').to_string(),
            search_path: settings.search_path.clone(),
            token: token.into(),
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }

    /// Fetch matching companies, paging with `skip` until `max_results`
    /// records are collected or the upstream runs dry. A page with fewer
    /// valid items than asked for means there is nothing further to fetch.
    pub async fn fetch_companies(&self, params: &SearchParams) -> Result<Vec<Value>> {
        let mut collected: Vec<Value> = Vec::new();
        let mut skip: u64 = 0;

        while (collected.len() as u32) < params.max_results {
            let remaining = params.max_results - collected.len() as u32;
            let batch_limit = params.limit.min(remaining);

            let batch = self.request_page(params, batch_limit, skip).await?;
            let received = batch.len();
            collected.extend(batch);
            // The offset moves by what actually arrived, not by batch_limit,
            // so a page padded with invalid entries is not skipped over.
            skip += received as u64;

            tracing::debug!(
                "Received {} records (limit {}), {} collected so far",
                received,
                batch_limit,
                collected.len()
            );

            if (received as u32) < batch_limit {
                break;
            }
        }

        collected.truncate(params.max_results as usize);
        Ok(collected)
    }

    async fn request_page(
        &self,
        params: &SearchParams,
        batch_limit: u32,
        skip: u64,
    ) -> Result<Vec<Value>> {
        let url = format!("{}{}", self.base_url, self.search_path);
        tracing::debug!("GET {} (limit {}, skip {})", url, batch_limit, skip);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("atecoCode", params.ateco_code.clone()),
                ("province", params.province.clone()),
                ("limit", batch_limit.to_string()),
                ("skip", skip.to_string()),
                ("dataEnrichment", "advanced".to_string()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await?;

        // The upstream can flag failure in-band with a 200, so both the
        // HTTP status and the body's own verdict are checked.
        let declared_failure = payload.get("success").and_then(Value::as_bool) == Some(false);
        if !status.is_success() || declared_failure {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Errore Openapi (status {})", status.as_u16()));
            return Err(ExportError::UpstreamError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(extract_items(&payload))
    }
}

/// Pull the record array out of either response layout the upstream uses:
/// a plain array under `data`, or one more level down under `data.data`.
/// Entries that are not JSON objects are dropped.
fn extract_items(payload: &Value) -> Vec<Value> {
    let items: &[Value] = match payload.get("data") {
        Some(Value::Array(items)) => items,
        Some(Value::Object(inner)) => match inner.get("data") {
            Some(Value::Array(items)) => items,
            _ => &[],
        },
        _ => &[],
    };
    items.iter().filter(|item| item.is_object()).cloned().collect()
}

pub mod cli;

use crate::utils::error::Result;
use crate::utils::validation::validate_url;

#[cfg(feature = "cli")]
use crate::domain::model::ExportRequest;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde_json::Value;

/// Endpoints and request bounds for the Openapi company search.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub production_base_url: String,
    pub sandbox_base_url: String,
    pub search_path: String,
    pub timeout_seconds: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            production_base_url: "https://company.openapi.com".to_string(),
            sandbox_base_url: "https://test.company.openapi.com".to_string(),
            search_path: "/IT-search".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl ApiSettings {
    /// Bounds the upstream enforces on `limit` and `skip`-based paging.
    pub const MIN_LIMIT: u32 = 1;
    pub const MAX_RESULTS: u32 = 1000;
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const DEFAULT_MAX_RESULTS: u32 = 500;

    pub fn base_url(&self, sandbox: bool) -> &str {
        if sandbox {
            &self.sandbox_base_url
        } else {
            &self.production_base_url
        }
    }

    /// Point both environments at the same server. Used by tests and the
    /// `--base-url` CLI flag.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.production_base_url = base_url.clone();
        self.sandbox_base_url = base_url;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_url("production_base_url", &self.production_base_url)?;
        validate_url("sandbox_base_url", &self.sandbox_base_url)?;
        Ok(())
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "export_companies")]
#[command(about = "Esporta in XLSX le aziende italiane filtrate per codice ATECO e provincia")]
pub struct CliConfig {
    /// Codice ATECO, ad esempio 1071 o 10.71
    pub ateco_code: String,

    /// Sigla della provincia, ad esempio VR
    pub province: String,

    /// Percorso del file XLSX generato
    #[arg(short, long, default_value = "openapi_companies.xlsx")]
    pub output: String,

    /// Token Openapi; in alternativa usare la variabile OPENAPI_TOKEN
    #[arg(short, long)]
    pub token: Option<String>,

    /// Record per singola richiesta (1-1000)
    #[arg(short, long, default_value_t = ApiSettings::DEFAULT_LIMIT)]
    pub limit: u32,

    /// Numero massimo di record esportati (1-1000)
    #[arg(short, long, default_value_t = ApiSettings::DEFAULT_MAX_RESULTS)]
    pub max_results: u32,

    /// Usa l'ambiente sandbox (test.company.openapi.com)
    #[arg(short, long)]
    pub sandbox: bool,

    /// Base URL alternativa per l'endpoint di ricerca
    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// The boundary request these arguments stand for.
    pub fn to_request(&self, token: String) -> ExportRequest {
        ExportRequest {
            token,
            ateco_code: self.ateco_code.clone(),
            province: self.province.clone(),
            limit: Some(Value::from(self.limit)),
            max_results: Some(Value::from(self.max_results)),
            sandbox: self.sandbox,
        }
    }
}

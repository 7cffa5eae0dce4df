use clap::Parser;
use openapi_exporter::core::engine::{validate_request, ExportEngine};
use openapi_exporter::core::{ExportOutcome, Storage};
use openapi_exporter::utils::logger;
use openapi_exporter::{ApiSettings, CliConfig, ExportPipeline, LocalStorage};
use std::path::Path;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting export_companies CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    let token = match resolve_token(config.token.clone()) {
        Ok(token) => token,
        Err(message) => {
            eprintln!("❌ {}", message);
            std::process::exit(1);
        }
    };

    let mut settings = ApiSettings::default();
    if let Some(base_url) = &config.base_url {
        settings = settings.with_base_url(base_url);
    }
    if let Err(e) = settings.validate() {
        eprintln!("❌ {}", e);
        std::process::exit(2);
    }

    let request = config.to_request(token);
    let validated = match validate_request(&request) {
        Ok(validated) => validated,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(2);
        }
    };

    let pipeline = ExportPipeline::new(validated, &settings);
    let engine = ExportEngine::new(pipeline);

    match engine.run().await {
        Ok(ExportOutcome::Empty) => {
            println!("Nessuna azienda trovata con i criteri specificati.");
        }
        Ok(ExportOutcome::Completed(export)) => {
            if let Err(e) = write_output(&config.output, &export.artifact).await {
                tracing::error!("Write failed: {}", e);
                eprintln!("❌ Impossibile scrivere il file di output: {}", e);
                std::process::exit(3);
            }
            tracing::info!("✅ Export completed: {} records", export.total);
            println!(
                "✅ Esportazione completata: {} ({} record)",
                config.output, export.total
            );
        }
        Err(e) => {
            tracing::error!("Export failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(2);
        }
    }
}

/// Token from the CLI flag, falling back to the OPENAPI_TOKEN environment
/// variable. It lives in memory for the duration of the run and is never
/// written anywhere.
fn resolve_token(argument: Option<String>) -> Result<String, String> {
    let candidate = argument
        .or_else(|| std::env::var("OPENAPI_TOKEN").ok())
        .unwrap_or_default();
    let candidate = candidate.trim().to_string();

    if candidate.is_empty() {
        Err(
            "È necessario fornire un token Openapi tramite parametro oppure impostando la \
             variabile di ambiente OPENAPI_TOKEN."
                .to_string(),
        )
    } else {
        Ok(candidate)
    }
}

async fn write_output(output: &str, artifact: &[u8]) -> openapi_exporter::Result<()> {
    let output_path = Path::new(output);
    let directory = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    let file_name = output_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "openapi_companies.xlsx".to_string());

    let storage = LocalStorage::new(directory);
    storage.write_file(&file_name, artifact).await
}

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use vizzle_core::{
    app_state::AppState,
    config::AppConfig,
    models::job::JobStatus,
    services::{api::TryOnParams, images::ImageSource, tryon::ImageJobSpec},
};

/// Runs one try-on end to end against the configured API: useful for
/// verifying credentials and connectivity without the app shell.
#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(human_path), Some(garment_url)) = (args.next(), args.next()) else {
        eprintln!("usage: vizzle-core <human-image-path> <garment-image-url>");
        return ExitCode::from(2);
    };

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let human_bytes = match std::fs::read(&human_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(path = %human_path, error = %e, "could not read human image");
            return ExitCode::FAILURE;
        }
    };

    let state = AppState::from_config(config);
    let orchestrator = state.orchestrator();

    let mut progress = orchestrator.subscribe();
    let watcher = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let snapshot = progress.borrow_and_update().clone();
            tracing::info!(
                status = snapshot.status.as_ref(),
                progress = snapshot.progress,
                "job progress"
            );
        }
    });

    let spec = ImageJobSpec {
        human: ImageSource::Bytes(human_bytes),
        garment: ImageSource::Url(garment_url),
        garment_name: "garment".to_string(),
        params: TryOnParams::default(),
    };
    let outcome = orchestrator.run_image_job(None, spec).await;
    watcher.abort();

    match outcome {
        Ok(job) if job.status == JobStatus::Succeeded => {
            tracing::info!(result = job.result.as_deref().unwrap_or(""), "try-on complete");
            ExitCode::SUCCESS
        }
        Ok(job) => {
            tracing::error!(
                error = job.error.as_deref().unwrap_or("unknown failure"),
                "try-on failed"
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "could not launch job");
            ExitCode::FAILURE
        }
    }
}

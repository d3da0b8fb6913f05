//! OMERO converter binary.
//!
//! Converts single files from the command line, serves the conversion as an
//! HTTP operation, or prints decoded metadata.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use omero_converter::{
    config::{Cli, Command, ConvertConfig, InspectConfig, ServeConfig, StorageArgs, SubmissionArgs},
    create_router, Converter, DirectorySubmissionClient, HttpSubmissionClient, RouterConfig,
    StorageFileSource, SubmissionClient, SubmissionTarget,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Convert(config) => run_convert(config).await,
        Command::Serve(config) => run_serve(config).await,
        Command::Inspect(config) => run_inspect(config).await,
    }
}

// =============================================================================
// Convert Command
// =============================================================================

async fn run_convert(config: ConvertConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let client = match build_client(&config.submission).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create submission client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let converter = Converter::new(build_source(&config.storage), client);
    let request = config.to_request();

    match converter.convert(&request).await {
        Ok(handles) => {
            for handle in &handles {
                println!("{}\t{}", handle.id, handle.name);
            }
            info!("Created {} representation(s)", handles.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Conversion of {} failed: {}", config.location, e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let client = match build_client(&config.submission).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create submission client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    match &config.submission.api_url {
        Some(url) => info!("  Submitting to: {}", url),
        None => {
            if let Some(dir) = &config.submission.output_dir {
                info!("  Writing submissions to: {}", dir.display());
            }
        }
    }
    if let Some(ref endpoint) = config.storage.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    info!("  S3 region: {}", config.storage.s3_region);

    let converter = Converter::new(build_source(&config.storage), client);
    let router = create_router(converter, build_router_config(&config));

    let addr = config.bind_address();
    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("    curl http://{}/operations", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Build RouterConfig from the ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new();

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Inspect Command
// =============================================================================

async fn run_inspect(config: InspectConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let source = build_source(&config.storage);
    match omero_converter::inspect_file(&source, &config.location).await {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Shared Setup
// =============================================================================

fn build_source(storage: &StorageArgs) -> StorageFileSource {
    StorageFileSource::new(storage.s3_endpoint.clone(), storage.s3_region.clone())
}

async fn build_client(args: &SubmissionArgs) -> Result<Arc<dyn SubmissionClient>, String> {
    match args.target()? {
        SubmissionTarget::Api {
            url,
            token,
            timeout,
        } => {
            let client =
                HttpSubmissionClient::new(&url, token, timeout).map_err(|e| e.to_string())?;
            Ok(Arc::new(client))
        }
        SubmissionTarget::Directory(dir) => {
            let client = DirectorySubmissionClient::create(dir)
                .await
                .map_err(|e| e.to_string())?;
            Ok(Arc::new(client))
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "omero_converter=debug,tower_http=debug"
    } else {
        "omero_converter=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

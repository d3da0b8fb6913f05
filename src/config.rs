//! Configuration management for the converter.
//!
//! This module provides the command-line interface and its validation:
//! - Command-line arguments via clap
//! - Environment variables with `OMC_` prefix
//! - Defaults for all optional settings
//!
//! # Commands
//!
//! - `convert <LOCATION>` - Convert one file and submit its series
//! - `serve` - Expose the conversion as an HTTP operation
//! - `inspect <LOCATION>` - Print the decoded metadata of a file as JSON
//!
//! # Environment Variables
//!
//! - `OMC_API_URL` - Base URL of the data-management service
//! - `OMC_API_TOKEN` - Bearer token for the service
//! - `OMC_OUTPUT_DIR` - Write submissions to a directory instead
//! - `OMC_TIMEOUT_SECS` - Per-request timeout (default: 120)
//! - `OMC_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `OMC_S3_REGION` - AWS region (default: us-east-1)
//! - `OMC_HOST` / `OMC_PORT` - Server bind address (default: 0.0.0.0:3000)
//! - `OMC_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::convert::ConvertRequest;
use crate::format::file_name;
use crate::io::DEFAULT_S3_REGION;
use crate::mapping::{ConversionContext, ConversionOptions, Dataset, Era, OmeroFile, Stage};
use crate::metadata::parse_timestamp;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default per-request timeout for the submission client, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// CLI Arguments
// =============================================================================

/// OMERO converter - turns microscopy files into normalized representations.
#[derive(Parser, Debug, Clone)]
#[command(name = "omero-converter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Convert one file and submit a representation per series
    Convert(ConvertConfig),

    /// Serve the conversion operation over HTTP
    Serve(ServeConfig),

    /// Print the decoded metadata of a file
    Inspect(InspectConfig),
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Where converted representations go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionTarget {
    Api {
        url: String,
        token: Option<String>,
        timeout: Duration,
    },
    Directory(PathBuf),
}

/// Submission client selection, shared by `convert` and `serve`.
#[derive(Args, Debug, Clone, Default)]
pub struct SubmissionArgs {
    /// Base URL of the data-management service.
    #[arg(long, env = "OMC_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token for the data-management service.
    #[arg(long, env = "OMC_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Write submissions as files into this directory instead of calling a service.
    #[arg(long, env = "OMC_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "OMC_TIMEOUT_SECS")]
    pub timeout_secs: u64,
}

impl SubmissionArgs {
    pub fn validate(&self) -> Result<(), String> {
        self.target().map(|_| ())
    }

    /// Resolve the submission target; exactly one of URL and directory must be set.
    pub fn target(&self) -> Result<SubmissionTarget, String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        match (&self.api_url, &self.output_dir) {
            (Some(url), None) => {
                url::Url::parse(url).map_err(|e| format!("Invalid --api-url '{}': {}", url, e))?;
                Ok(SubmissionTarget::Api {
                    url: url.clone(),
                    token: self.api_token.clone(),
                    timeout: Duration::from_secs(self.timeout_secs),
                })
            }
            (None, Some(dir)) => Ok(SubmissionTarget::Directory(dir.clone())),
            (Some(_), Some(_)) => {
                Err("Set either --api-url or --output-dir, not both".to_string())
            }
            (None, None) => Err(
                "No submission target. Set --api-url (OMC_API_URL) or --output-dir (OMC_OUTPUT_DIR)"
                    .to_string(),
            ),
        }
    }
}

/// Object storage settings for `s3://` locations.
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "OMC_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_S3_REGION, env = "OMC_S3_REGION")]
    pub s3_region: String,
}

impl Default for StorageArgs {
    fn default() -> Self {
        Self {
            s3_endpoint: None,
            s3_region: DEFAULT_S3_REGION.to_string(),
        }
    }
}

// =============================================================================
// Convert Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ConvertConfig {
    /// File location: a local path or s3://bucket/key.
    pub location: String,

    /// Display name of the file (defaults to the last path segment).
    #[arg(long)]
    pub name: Option<String>,

    /// ID of the file record (defaults to the file name).
    #[arg(long)]
    pub file_id: Option<String>,

    /// Put the images into this dataset.
    #[arg(long)]
    pub dataset_id: Option<String>,

    #[arg(long, requires = "dataset_id")]
    pub dataset_name: Option<String>,

    /// Stage for derived positions.
    #[arg(long)]
    pub stage_id: Option<String>,

    #[arg(long, requires = "stage_id")]
    pub stage_name: Option<String>,

    /// Era for derived timepoints.
    #[arg(long)]
    pub era_id: Option<String>,

    #[arg(long, requires = "era_id")]
    pub era_name: Option<String>,

    /// Start of the era (RFC 3339).
    #[arg(long, requires = "era_id", value_parser = parse_instant)]
    pub era_start: Option<DateTime<Utc>>,

    /// Use the first plane's position to place images on the stage.
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub position_from_planes: bool,

    /// Derive timepoints from acquisition dates.
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub timepoint_from_time: bool,

    /// Create channel records and one view per channel.
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub channels_from_channels: bool,

    #[arg(long)]
    pub position_tolerance: Option<f64>,

    #[arg(long)]
    pub timepoint_tolerance: Option<f64>,

    #[command(flatten)]
    pub submission: SubmissionArgs,

    #[command(flatten)]
    pub storage: StorageArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(value).ok_or_else(|| format!("'{}' is not an RFC 3339 timestamp", value))
}

impl ConvertConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.location.trim().is_empty() {
            return Err("File location must not be empty".to_string());
        }
        for (flag, value) in [
            ("position_tolerance", self.position_tolerance),
            ("timepoint_tolerance", self.timepoint_tolerance),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(format!("{} must be a non-negative number", flag));
                }
            }
        }
        self.submission.validate()
    }

    /// Build the conversion request described by the arguments.
    pub fn to_request(&self) -> ConvertRequest {
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| file_name(&self.location).to_string());

        let file = OmeroFile {
            id: self.file_id.clone().unwrap_or_else(|| name.clone()),
            name,
            file: Some(self.location.clone()),
            datasets: Vec::new(),
        };

        let context = ConversionContext {
            stage: self.stage_id.as_ref().map(|id| Stage {
                id: id.clone(),
                name: self.stage_name.clone(),
            }),
            era: self.era_id.as_ref().map(|id| Era {
                id: id.clone(),
                name: self.era_name.clone(),
                start: self.era_start,
            }),
            dataset: self.dataset_id.as_ref().map(|id| Dataset {
                id: id.clone(),
                name: self.dataset_name.clone(),
            }),
        };

        let options = ConversionOptions {
            position_from_planes: self.position_from_planes,
            timepoint_from_time: self.timepoint_from_time,
            channels_from_channels: self.channels_from_channels,
            position_tolerance: self.position_tolerance,
            timepoint_tolerance: self.timepoint_tolerance,
        };

        ConvertRequest {
            file,
            context,
            options,
        }
    }
}

// =============================================================================
// Serve Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "OMC_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "OMC_PORT")]
    pub port: u16,

    #[command(flatten)]
    pub submission: SubmissionArgs,

    #[command(flatten)]
    pub storage: StorageArgs,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "OMC_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ServeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("host must not be empty".to_string());
        }
        self.submission.validate()
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Inspect Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// File location: a local path or s3://bucket/key.
    pub location: String,

    #[command(flatten)]
    pub storage: StorageArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl InspectConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.location.trim().is_empty() {
            return Err("File location must not be empty".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

use clap::{Parser, Subcommand};
use s3census::storage::ObjectStore;
use s3census::types::requests::{
    BucketRef, ListObjectsRequest, ObjectRef, ScanRequest, SetBucketPolicyRequest,
    SetBucketVersioningRequest, UploadRequest, from_arguments,
};
use s3census::{Aggregator, Config, S3Client, StorageError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// s3census: inventory and object tooling for S3-compatible storage
#[derive(Parser, Debug)]
#[command(name = "s3census")]
#[command(about = "Signed object-storage client with paginated bucket size scans", long_about = None)]
struct Cli {
    /// Path to a JSON or YAML configuration file
    #[arg(short, long, env = "S3CENSUS_CONFIG")]
    config: Option<PathBuf>,

    /// Object storage endpoint URL (overrides the config file)
    #[arg(long, env = "S3CENSUS_ENDPOINT")]
    endpoint: Option<String>,

    /// Access key ID used to sign requests
    #[arg(long, env = "S3CENSUS_ACCESS_KEY_ID")]
    access_key_id: Option<String>,

    /// Secret access key used to sign requests
    #[arg(long, env = "S3CENSUS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all buckets
    Buckets,
    /// List one page of objects in a bucket
    Ls {
        bucket: String,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        max_keys: Option<u32>,
        #[arg(long)]
        continuation_token: Option<String>,
    },
    /// Count objects and bytes across buckets (all buckets when none are given)
    Scan {
        buckets: Vec<String>,
        #[arg(long)]
        prefix: Option<String>,
        /// Buckets scanned at once
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Upload a local file as an object
    Put {
        bucket: String,
        key: String,
        file: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Download an object
    Get {
        bucket: String,
        key: String,
        /// Write the payload here instead of printing it as base64
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete an object
    Rm { bucket: String, key: String },
    /// Read or replace a bucket policy
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },
    /// Read or change bucket versioning
    Versioning {
        #[command(subcommand)]
        action: VersioningAction,
    },
}

#[derive(Subcommand, Debug)]
enum PolicyAction {
    Get { bucket: String },
    /// Set the policy from a JSON document file
    Set { bucket: String, file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum VersioningAction {
    Get { bucket: String },
    /// Status is Enabled or Suspended
    Set { bucket: String, status: String },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                tracing::error!("Failed to render result: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            let payload = serde_json::to_string_pretty(&e.to_payload())
                .unwrap_or_else(|_| e.to_string());
            eprintln!("{}", payload);
            std::process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, StorageError> {
    let mut config = match &cli.config {
        Some(path) => {
            let cfg = Config::from_file(path).map_err(|e| {
                StorageError::Configuration(format!(
                    "failed to load config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            tracing::info!("Loaded configuration from {}", path.display());
            cfg
        }
        None => Config::default(),
    };

    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if cli.access_key_id.is_some() {
        config.access_key_id = cli.access_key_id.clone();
    }
    if cli.secret_access_key.is_some() {
        config.secret_access_key = cli.secret_access_key.clone();
    }

    Ok(config)
}

async fn read_file(path: &Path) -> Result<Vec<u8>, StorageError> {
    tokio::fs::read(path).await.map_err(|e| {
        StorageError::InvalidRequest(format!("failed to read '{}': {}", path.display(), e))
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StorageError> {
    serde_json::to_value(value).map_err(|e| StorageError::InvalidRequest(e.to_string()))
}

async fn run(cli: Cli) -> Result<serde_json::Value, StorageError> {
    let config = load_config(&cli)?;
    let client = Arc::new(S3Client::new(
        &config.endpoint,
        config.credentials(),
        config.timeouts(),
    )?);
    tracing::info!("Using endpoint: {}", client.endpoint());

    match cli.command {
        Command::Buckets => {
            let names = client.list_buckets().await?;
            Ok(serde_json::json!({ "buckets": names, "count": names.len() }))
        }
        Command::Ls {
            bucket,
            prefix,
            max_keys,
            continuation_token,
        } => {
            let listing = client
                .list_objects(&ListObjectsRequest {
                    bucket_name: bucket,
                    prefix,
                    max_keys: max_keys.or(Some(config.page_size)),
                    continuation_token,
                })
                .await?;
            to_json(&listing)
        }
        Command::Scan {
            buckets,
            prefix,
            concurrency,
        } => {
            let aggregator = Aggregator::new(client.clone())
                .with_page_size(config.page_size)
                .with_concurrency(concurrency.unwrap_or(config.scan_concurrency))
                .with_prefix(prefix);

            let request = ScanRequest {
                bucket_names: Some(buckets),
            };
            to_json(&aggregator.scan(&request).await?)
        }
        Command::Put {
            bucket,
            key,
            file,
            content_type,
        } => {
            let content = read_file(&file).await?;
            let request = UploadRequest::from_bytes(bucket, key, &content, content_type);
            to_json(&client.upload_object(&request).await?)
        }
        Command::Get {
            bucket,
            key,
            output,
        } => {
            let target = ObjectRef {
                bucket_name: bucket,
                object_key: key,
            };
            let mut downloaded = to_json(&client.download_object(&target).await?)?;

            if let Some(path) = output {
                use base64::Engine as _;

                let encoded = downloaded["content_base64"].as_str().unwrap_or_default();
                let content = base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| StorageError::parse(e.to_string(), encoded))?;
                tokio::fs::write(&path, content).await.map_err(|e| {
                    StorageError::InvalidRequest(format!(
                        "failed to write '{}': {}",
                        path.display(),
                        e
                    ))
                })?;

                if let Some(fields) = downloaded.as_object_mut() {
                    fields.remove("content_base64");
                    fields.insert(
                        "output".to_string(),
                        serde_json::Value::String(path.display().to_string()),
                    );
                }
            }
            Ok(downloaded)
        }
        Command::Rm { bucket, key } => {
            let target = ObjectRef {
                bucket_name: bucket,
                object_key: key,
            };
            to_json(&client.delete_object(&target).await?)
        }
        Command::Policy { action } => match action {
            PolicyAction::Get { bucket } => Ok(client
                .get_bucket_policy(&BucketRef {
                    bucket_name: bucket,
                })
                .await?
                .to_json()),
            PolicyAction::Set { bucket, file } => {
                let document = read_file(&file).await?;
                let policy: serde_json::Value = serde_json::from_slice(&document).map_err(|e| {
                    StorageError::InvalidRequest(format!("policy file is not valid JSON: {}", e))
                })?;
                let body = client
                    .set_bucket_policy(&SetBucketPolicyRequest {
                        bucket_name: bucket,
                        policy,
                    })
                    .await?;
                Ok(body.to_json())
            }
        },
        Command::Versioning { action } => match action {
            VersioningAction::Get { bucket } => Ok(client
                .get_bucket_versioning(&BucketRef {
                    bucket_name: bucket,
                })
                .await?
                .to_json()),
            VersioningAction::Set { bucket, status } => {
                let request: SetBucketVersioningRequest = from_arguments(serde_json::json!({
                    "bucket_name": bucket,
                    "status": status,
                }))?;
                Ok(client.set_bucket_versioning(&request).await?.to_json())
            }
        },
    }
}

//! Command-line client for splice.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use splice_cli::config::{client_config_path, load_client_config, save_client_config};
use splice_cli::{
    ApiClient, ExponentialBackoff, NoRetry, RetryPolicy, UploadObserver, UploadOptions,
    UploadPhase, UploadTransport, Uploader,
};
use splice_core::artifact::format_size;
use splice_core::config::ClientConfig;
use splice_core::{ChunkPlan, DigestAlgorithm};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

#[derive(Parser)]
#[command(name = "splicectl")]
#[command(about = "Resumable chunked uploads to a splice server")]
#[command(version)]
struct Cli {
    /// Client config file path
    #[arg(long, global = true, env = "SPLICE_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Server URL (overrides client config)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct TransferArgs {
    /// Chunk size in bytes
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Fingerprint digest
    #[arg(long, value_parser = str::parse::<DigestAlgorithm>)]
    algorithm: Option<DigestAlgorithm>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file, resuming any earlier partial upload
    Push {
        file: PathBuf,

        /// Name of the merged artifact (default: the file's name)
        #[arg(long)]
        name: Option<String>,

        /// Chunks in flight at once
        #[arg(long)]
        parallel: Option<usize>,

        /// Fail on the first request error instead of retrying
        #[arg(long)]
        no_retry: bool,

        /// Upload everything if the resume query fails
        #[arg(long)]
        ignore_resume_errors: bool,

        #[command(flatten)]
        transfer: TransferArgs,
    },
    /// Show how much of a file the server already has
    Status {
        file: PathBuf,

        #[command(flatten)]
        transfer: TransferArgs,
    },
    /// Print a file's fingerprint without contacting the server
    Fingerprint {
        file: PathBuf,

        #[command(flatten)]
        transfer: TransferArgs,
    },
    /// List merged artifacts on the server
    List,
    /// Check server health
    Health,
    /// Client configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Write the effective configuration to the config file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file location
    Path,
}

/// Progress lines on stderr.
struct StderrProgress {
    total: AtomicU32,
    done: AtomicU32,
    bytes: AtomicU64,
}

impl StderrProgress {
    fn new() -> Self {
        Self {
            total: AtomicU32::new(0),
            done: AtomicU32::new(0),
            bytes: AtomicU64::new(0),
        }
    }
}

impl UploadObserver for StderrProgress {
    fn phase(&self, phase: UploadPhase) {
        let label = match phase {
            UploadPhase::Fingerprinting => "fingerprinting",
            UploadPhase::Chunking => "planning chunks",
            UploadPhase::ResumeCheck => "checking stored chunks",
            UploadPhase::Uploading => "uploading",
            UploadPhase::Merging => "merging",
            UploadPhase::Done | UploadPhase::Failed => return,
        };
        eprintln!("{label}...");
    }

    fn planned(&self, total: u32, already_stored: u32) {
        self.total.store(total, Ordering::Relaxed);
        self.done.store(already_stored, Ordering::Relaxed);
        if already_stored > 0 {
            eprintln!("  resuming: {already_stored}/{total} chunks already on server");
        }
    }

    fn chunk_uploaded(&self, index: u32, bytes: u64) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let sent = self.bytes.fetch_add(bytes, Ordering::Relaxed) + bytes;
        let total = self.total.load(Ordering::Relaxed);
        eprintln!(
            "  chunk {index} stored ({done}/{total}, {} sent)",
            format_size(sent)
        );
    }
}

fn init_tracing() {
    let filter =
        tracing_subscriber::EnvFilter::try_from_env("SPLICE_LOG").unwrap_or_else(|_| "warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_transfer_args(config: &mut ClientConfig, args: &TransferArgs) {
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(algorithm) = args.algorithm {
        config.algorithm = algorithm;
    }
}

fn build_uploader(config: &ClientConfig, no_retry: bool) -> Result<Uploader<ApiClient>> {
    let client = ApiClient::new(&config.server, config.request_timeout())?;
    let retry: Arc<dyn RetryPolicy> = if no_retry {
        Arc::new(NoRetry)
    } else {
        Arc::new(ExponentialBackoff::from(&config.retry))
    };
    Ok(Uploader::new(client, retry, UploadOptions::from(config)))
}

fn validated(config: ClientConfig) -> Result<ClientConfig> {
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid client configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config_path = client_config_path(cli.config.as_deref())?;
    let mut config = load_client_config(&config_path)?;
    if let Some(server) = &cli.server {
        config.server = server.clone();
    }

    match cli.command {
        Commands::Push {
            file,
            name,
            parallel,
            no_retry,
            ignore_resume_errors,
            transfer,
        } => {
            apply_transfer_args(&mut config, &transfer);
            if let Some(parallel) = parallel {
                config.parallelism = parallel;
            }
            if ignore_resume_errors {
                config.degrade_on_lookup_error = true;
            }
            let config = validated(config)?;
            handle_push(&config, &file, name.as_deref(), no_retry, cli.quiet).await
        }
        Commands::Status { file, transfer } => {
            apply_transfer_args(&mut config, &transfer);
            let config = validated(config)?;
            handle_status(&config, &file).await
        }
        Commands::Fingerprint { file, transfer } => {
            apply_transfer_args(&mut config, &transfer);
            let config = validated(config)?;
            let uploader = build_uploader(&config, true)?;
            let (fingerprint, size) = uploader.fingerprint(&file).await?;
            println!("{fingerprint}  {size}  {}", file.display());
            Ok(())
        }
        Commands::List => handle_list(&config).await,
        Commands::Health => {
            let client = ApiClient::new(&config.server, config.request_timeout())?;
            let health = client
                .health()
                .await
                .with_context(|| format!("health check against {} failed", config.server))?;
            println!("{}", serde_json::to_string_pretty(&health)?);
            Ok(())
        }
        Commands::Config { command } => handle_config(command, &config_path, &config).await,
    }
}

async fn handle_push(
    config: &ClientConfig,
    file: &Path,
    name: Option<&str>,
    no_retry: bool,
    quiet: bool,
) -> Result<()> {
    let mut uploader = build_uploader(config, no_retry)?;
    if !quiet {
        uploader = uploader.with_observer(Arc::new(StderrProgress::new()));
    }

    let report = uploader
        .push(file, name)
        .await
        .with_context(|| format!("upload of {} failed", file.display()))?;

    if !quiet {
        eprintln!(
            "uploaded {} ({}) in {} chunks, {} sent, {} already stored",
            report.file_name,
            format_size(report.size),
            report.total_chunks,
            report.uploaded.len(),
            report.skipped
        );
    }
    println!("{}", report.url);
    Ok(())
}

async fn handle_status(config: &ClientConfig, file: &Path) -> Result<()> {
    let uploader = build_uploader(config, false)?;
    let (fingerprint, size) = uploader.fingerprint(file).await?;
    let plan = ChunkPlan::new(size, config.chunk_size)?;
    let stored = uploader
        .transport()
        .stored_chunks(&fingerprint)
        .await
        .context("resume query failed")?;

    let expected: Vec<u32> = plan.spans().map(|span| span.index).collect();
    let missing: Vec<u32> = expected
        .iter()
        .copied()
        .filter(|i| !stored.contains(i))
        .collect();

    println!("Fingerprint: {fingerprint}");
    println!("Size:        {} ({size} bytes)", format_size(size));
    println!(
        "Chunks:      {}/{} stored",
        plan.len() as usize - missing.len(),
        plan.len()
    );
    if !missing.is_empty() && missing.len() <= 32 {
        let list: Vec<String> = missing.iter().map(|i| i.to_string()).collect();
        println!("Missing:     {}", list.join(", "));
    }
    let foreign = stored.iter().filter(|i| **i >= plan.len()).count();
    if foreign > 0 {
        println!("Warning:     {foreign} stored chunk(s) outside this file's chunk range");
    }
    Ok(())
}

async fn handle_list(config: &ClientConfig) -> Result<()> {
    let client = ApiClient::new(&config.server, config.request_timeout())?;
    let assets = client.list_assets().await.context("failed to list assets")?;
    if assets.is_empty() {
        println!("No assets found.");
        return Ok(());
    }

    println!("{:<60} {:>12} {:<25} URL", "NAME", "SIZE", "MODIFIED");
    println!("{}", "-".repeat(120));
    for asset in assets {
        println!(
            "{:<60} {:>12} {:<25} {}",
            asset.name,
            asset.formatted_size,
            asset.modified.as_deref().unwrap_or("-"),
            asset.url
        );
    }
    Ok(())
}

async fn handle_config(command: ConfigCommands, path: &Path, config: &ClientConfig) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            print!("{}", toml::to_string_pretty(config)?);
        }
        ConfigCommands::Path => {
            println!("{}", path.display());
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            save_client_config(path, config).await?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

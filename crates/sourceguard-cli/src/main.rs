//! Sourceguard CLI - operator interface for source-integrity baselines

use anyhow::Context;
use clap::Parser;
use sourceguard_core::{
    offload, ActorContext, GuardConfig, IntegrityOrchestrator, IntegrityStatus, RequestContext,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Exit code when the tree or gate fails verification.
const EXIT_FAILED: u8 = 3;

#[derive(Parser)]
#[command(name = "sourceguard")]
#[command(about = "Sourceguard - tamper-evident integrity baselines for deployed code")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config/sourceguard.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Write a configuration file
    Init {
        /// Root of the deployed code tree
        #[arg(long)]
        deployment_root: PathBuf,
        /// Directory for baselines and keys (keep it outside the web root)
        #[arg(long)]
        state_dir: PathBuf,
        /// Files checked on every request
        #[arg(long = "critical", required = true)]
        critical: Vec<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Generate a new signing keypair
    Keygen {
        /// Confirm the caller holds super-admin privilege
        #[arg(long)]
        authorized: bool,
    },
    /// Approve the live tree as the new signed baseline
    Approve {
        /// Confirm the caller holds super-admin privilege
        #[arg(long)]
        authorized: bool,
    },
    /// Compare the live tree with the baseline
    Scan {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current integrity status
    Status,
    /// Full-tree verification; exit code 3 on failure
    Verify,
    /// Run the per-request gate once; exit code 3 on failure
    Gate,
}

fn operator(authorized: bool) -> ActorContext {
    let principal = std::env::var("USER").unwrap_or_else(|_| "cli".to_string());
    if authorized {
        ActorContext::super_admin(principal, None)
    } else {
        ActorContext::unprivileged(principal, None)
    }
}

fn load(path: &Path) -> anyhow::Result<Arc<IntegrityOrchestrator>> {
    let config = GuardConfig::from_file(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    Ok(Arc::new(IntegrityOrchestrator::new(config)?))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init {
            deployment_root,
            state_dir,
            critical,
            force,
        } => {
            if cli.config.exists() && !force {
                anyhow::bail!(
                    "{} already exists; pass --force to overwrite",
                    cli.config.display()
                );
            }
            let critical: Vec<&str> = critical.iter().map(String::as_str).collect();
            let config = GuardConfig::for_deployment(deployment_root, state_dir, &critical);
            config.validate()?;
            config.write_file(&cli.config)?;
            info!(path = %cli.config.display(), "Configuration written");
        }
        Commands::Keygen { authorized } => {
            let guard = load(&cli.config)?;
            let key = guard.generate_keypair(&operator(authorized))?;
            println!("public key:  {}", key.public_key);
            println!("fingerprint: {}", key.fingerprint);
            if let Some(previous) = key.previous_fingerprint {
                println!("replaced:    {}", previous);
            }
            println!("Run `sourceguard approve --authorized` to re-sign the baseline.");
        }
        Commands::Approve { authorized } => {
            let guard = load(&cli.config)?;
            let receipt = offload::approve(guard, operator(authorized)).await?;
            println!(
                "Approved {} files as {} (digest {})",
                receipt.file_count, receipt.generation, receipt.digest
            );
        }
        Commands::Scan { json } => {
            let guard = load(&cli.config)?;
            let report = offload::scan(guard, operator(false)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("status:    {}", report.status);
                println!("signature: {}", report.signature);
                for path in &report.diff.added {
                    println!("  added    {}", path);
                }
                for path in &report.diff.modified {
                    println!("  modified {}", path);
                }
                for path in &report.diff.deleted {
                    println!("  deleted  {}", path);
                }
                println!("{}", report.diff.summary());
            }
            if report.status != IntegrityStatus::Clean {
                return Ok(ExitCode::from(EXIT_FAILED));
            }
        }
        Commands::Status => {
            let guard = load(&cli.config)?;
            println!("{}", guard.status()?);
        }
        Commands::Verify => {
            let guard = load(&cli.config)?;
            if !offload::verify(guard).await {
                println!("FAILED");
                return Ok(ExitCode::from(EXIT_FAILED));
            }
            println!("OK");
        }
        Commands::Gate => {
            let guard = load(&cli.config)?;
            // Audited the same way a blocked request would be.
            let verdict = guard.check_request(&RequestContext::default());
            match verdict.failure() {
                None => println!("PASS"),
                Some(reason) => {
                    println!("FAIL: {}", reason);
                    return Ok(ExitCode::from(EXIT_FAILED));
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

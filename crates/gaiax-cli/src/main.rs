//! gaiax-sd — Gaia-X Self-Description assistant entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use gaiax_cli::commands;
use gaiax_core::AssistantConfig;
use tracing_subscriber::EnvFilter;

/// Gaia-X Self-Description assistant.
///
/// Generates Self-Descriptions from OpenAPI/AsyncAPI specifications, prepares
/// trust-anchor certificates and DID documents, obtains conformity proofs from
/// a Gaia-X Digital Clearing House and validates credential files.
#[derive(Parser, Debug)]
#[command(name = "gaiax-sd", version, about, long_about)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, global = true, default_value = "gaiax-sd.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error). Overrides the config.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Write a default config file and exit.
    #[arg(long)]
    init_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prepare a certificate for use in Self-Descriptions.
    PrepareCert(commands::prepare_cert::PrepareCertArgs),
    /// Retrieve a certificate from a remote server.
    GetCert(commands::get_cert::GetCertArgs),
    /// Build a Decentralized Identifier (DID) document.
    BuildDid(commands::build_did::BuildDidArgs),
    /// Generate Gaia-X Self-Descriptions from API specifications.
    BuildSelfDescription(commands::build_self_description::BuildSelfDescriptionArgs),
    /// Create a well-known directory for hosting DID-related files.
    BuildWellKnown(commands::build_well_known::BuildWellKnownArgs),
    /// Validate Verifiable Credentials against the schema and their proofs.
    ValidateCredentials(commands::validate_credentials::ValidateCredentialsArgs),
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.init_config {
        AssistantConfig::default().save(&cli.config)?;
        println!("Wrote default config to {}", cli.config.display());
        return Ok(());
    }

    let config = AssistantConfig::load(&cli.config)?;
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format);
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    let Some(command) = &cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::PrepareCert(args) => commands::prepare_cert::run(args),
        Commands::GetCert(args) => commands::get_cert::run(args, &config).await,
        Commands::BuildDid(args) => commands::build_did::run(args),
        Commands::BuildSelfDescription(args) => {
            commands::build_self_description::run(args, &config).await
        }
        Commands::BuildWellKnown(args) => commands::build_well_known::run(args),
        Commands::ValidateCredentials(args) => {
            commands::validate_credentials::run(args, &config).await
        }
    }
}

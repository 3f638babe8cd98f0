//! `gaiax-sd validate-credentials` — Validate Self-Description files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use gaiax_core::AssistantConfig;
use gaiax_credentials::{SchemaRegistry, Validator};
use gaiax_crypto::TrustRoots;
use gaiax_identity::{CompositeDidResolver, LocalDidResolver, WebDidResolver};

#[derive(Args, Debug)]
pub struct ValidateCredentialsArgs {
    /// Path(s) to the credentials file(s) to validate.
    #[arg(long, required = true, num_args = 1..)]
    pub credentials_file: Vec<PathBuf>,

    /// Local DID documents, consulted before `did:web` resolution.
    #[arg(long)]
    pub did_document: Vec<PathBuf>,

    /// Additional trust-root certificates (PEM).
    #[arg(long)]
    pub trust_root: Vec<PathBuf>,

    /// Accept self-signed trust anchors.
    #[arg(long)]
    pub allow_self_signed: bool,

    /// Resolve DIDs from local documents only.
    #[arg(long)]
    pub offline: bool,
}

pub async fn run(args: &ValidateCredentialsArgs, config: &AssistantConfig) -> anyhow::Result<()> {
    let registry = SchemaRegistry::new();
    let profile = registry.resolve(&config.schema.profile, &config.schema.required_claims)?;

    let local = LocalDidResolver::new();
    for path in &args.did_document {
        local.load_file(path)?;
    }
    let mut resolver = CompositeDidResolver::new();
    resolver.add_resolver(Box::new(local));
    if !args.offline {
        resolver.add_resolver(Box::new(WebDidResolver::new(Duration::from_secs(
            config.gateway.timeout_secs,
        ))?));
    }

    let mut root_paths = config.trust.roots.clone();
    root_paths.extend(args.trust_root.iter().cloned());
    let roots = TrustRoots::load(&root_paths)?;

    let validator = Validator::new(profile, Arc::new(resolver), roots)
        .allow_self_signed(args.allow_self_signed || config.trust.allow_self_signed);

    println!(
        "Validating {} credential file(s) with profile '{}'...",
        args.credentials_file.len(),
        config.schema.profile
    );
    let results = validator.validate_files(&args.credentials_file).await;

    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(report) => {
                let verdict = if report.is_valid() { "valid" } else { "INVALID" };
                println!("{}: {}", path.display(), verdict);
                for check in &report.checks {
                    println!("  {}", check.to_string().replace('\n', "\n  "));
                }
                for warning in &report.warnings {
                    println!("  warning: {}", warning);
                }
                if !report.is_valid() {
                    failed += 1;
                }
            }
            Err(e) => {
                println!("{}: ERROR {}", path.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} credential file(s) failed validation", failed, results.len());
    }
    println!("Credentials validated successfully!");
    Ok(())
}

mod claims;
mod cli;
mod config;
mod documents;
mod storage;

use clap::Parser;
use claimtrack_core::vault::AttachmentVault;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::ConfigCommand;

/// Entry point wiring the CLI to the claim store and attachment vault.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command {
        cli::Command::Submit(args) => claims::submit(&config, args).await?,
        cli::Command::List { status } => claims::list(&config, status.as_deref())?,
        cli::Command::Show { claim_id } => claims::show(&config, claim_id)?,
        cli::Command::Verify { claim_id } => claims::verify(&config, claim_id)?,
        cli::Command::Approve { claim_id } => claims::approve(&config, claim_id)?,
        cli::Command::Reject { claim_id, role } => claims::reject(&config, claim_id, &role)?,
        cli::Command::Download {
            document_id,
            output,
        } => documents::download(&config, document_id, output).await?,
        cli::Command::Health => run_health_check(&config).await?,
        cli::Command::Version => print_version(),
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info to avoid noisy stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("claimtrack {}", env!("CARGO_PKG_VERSION"));
}

/// Runs a quick health check of the claim store and the encryption vault.
async fn run_health_check(config: &config::Config) -> Result<()> {
    let store = storage::open_store(config)?;
    let drift = if store.is_dirty() { " (snapshot drift!)" } else { "" };
    println!("Store: ok, {} claims{drift}", store.get_all_claims().len());

    let vault = storage::build_vault(config)?;
    run_vault_health(&vault).await?;
    println!("Vault: ok");
    Ok(())
}

/// Round-trips a probe payload through the vault in a throwaway directory
/// (the vault exposes no delete, so the probe never touches real uploads).
async fn run_vault_health<V: AttachmentVault>(vault: &V) -> Result<()> {
    let probe_dir = tempfile::tempdir()?;
    let payload = b"ok";

    let stored = vault
        .save_encrypted(payload, probe_dir.path())
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    let round_trip = vault
        .open_decrypted(probe_dir.path(), &stored)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;

    if round_trip != payload {
        color_eyre::eyre::bail!("vault round-trip failed");
    }
    Ok(())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

use std::path::PathBuf;

use claimtrack_store::ClaimStore;
use claimtrack_vault::{encrypted_vault::EncryptedFileVault, key_manager::FileKeyProvider};
use color_eyre::Result;
use dirs::data_dir;
use tracing::debug;

use crate::config::Config;

/// Snapshot artifact rewritten wholesale on every mutation.
pub const SNAPSHOT_FILE: &str = "claims_data.json";
/// Key artifact holding the base64-encoded symmetric key.
pub const KEY_FILE: &str = "file_key.txt";
/// Flat directory of opaque encrypted blobs.
pub const UPLOADS_DIR: &str = "uploads";

/// Resolve the default data directory for claimtrack.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("claimtrack"))
}

fn resolve_data_dir(config: &Config) -> Result<PathBuf> {
    match &config.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => default_data_dir(),
    }
}

/// Directory where encrypted attachment blobs live.
pub fn uploads_dir(config: &Config) -> Result<PathBuf> {
    match &config.uploads_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(resolve_data_dir(config)?.join(UPLOADS_DIR)),
    }
}

/// Open the claim store backed by the configured snapshot path.
pub fn open_store(config: &Config) -> Result<ClaimStore> {
    let path = resolve_data_dir(config)?.join(SNAPSHOT_FILE);
    debug!(?path, "opening claim store");
    Ok(ClaimStore::open(path))
}

/// Build the attachment vault with the file-persisted key.
pub fn build_vault(config: &Config) -> Result<EncryptedFileVault<FileKeyProvider>> {
    let key_path = resolve_data_dir(config)?.join(KEY_FILE);
    debug!(?key_path, "initializing attachment vault");
    Ok(EncryptedFileVault::new(FileKeyProvider::new(key_path)))
}

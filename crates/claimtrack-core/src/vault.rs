use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by attachment vault implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    /// The named encrypted blob does not exist. This is the one core failure
    /// callers are expected to catch and translate into a user-visible result.
    #[error("encrypted file not found: {name}")]
    NotFound { name: String },
    /// Underlying I/O or cryptographic failure.
    #[error("vault failure: {reason}")]
    Storage { reason: String },
}

/// Contract for encrypting uploaded attachments to disk and decrypting them
/// back. Implementations perform no policy checks: callers hand over a
/// pre-validated, size-capped byte stream.
///
/// Blobs are append-only artifacts; there is no delete or overwrite
/// operation. Concurrent saves are safe because every save targets a freshly
/// generated unique filename, and concurrent opens are read-only.
#[async_trait]
pub trait AttachmentVault: Send + Sync {
    /// Encrypt `plaintext` into a new blob under `uploads_dir`, creating the
    /// directory if absent. Returns the opaque stored filename, which
    /// uniquely identifies the encrypted content for as long as it exists.
    async fn save_encrypted(&self, plaintext: &[u8], uploads_dir: &Path)
        -> Result<String, VaultError>;

    /// Decrypt a stored blob back to its exact original bytes.
    async fn open_decrypted(
        &self,
        uploads_dir: &Path,
        stored_file_name: &str,
    ) -> Result<Vec<u8>, VaultError>;
}

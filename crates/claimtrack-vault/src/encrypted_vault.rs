use std::{
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use claimtrack_core::vault::{AttachmentVault, VaultError};
use tracing::instrument;
use uuid::Uuid;

use crate::key_manager::{KeyMaterial, KeyProvider};

/// Nonce length for AES-GCM, stored as a prefix of every blob.
const NONCE_LEN: usize = 12;

/// AES-256-GCM vault for claim attachments. Each blob is written once under
/// a freshly generated filename and laid out as `nonce || ciphertext`, so no
/// two files ever share a nonce even though the key is shared.
pub struct EncryptedFileVault<P: KeyProvider> {
    key_provider: P,
}

impl<P: KeyProvider> EncryptedFileVault<P> {
    pub fn new(key_provider: P) -> Self {
        Self { key_provider }
    }

    async fn key_material(&self) -> Result<KeyMaterial, VaultError> {
        self.key_provider
            .get_or_create()
            .await
            .map_err(|e| VaultError::Storage {
                reason: format!("key provider: {e}"),
            })
    }
}

#[async_trait]
impl<P: KeyProvider> AttachmentVault for EncryptedFileVault<P> {
    #[instrument(skip_all, fields(bytes = plaintext.len()))]
    async fn save_encrypted(
        &self,
        plaintext: &[u8],
        uploads_dir: &Path,
    ) -> Result<String, VaultError> {
        fs::create_dir_all(uploads_dir).map_err(storage_err)?;

        let key_material = self.key_material().await?;
        let cipher = build_cipher(&key_material)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| VaultError::Storage {
                reason: format!("encrypt failed: {e}"),
            })?;

        let stored_file_name = format!("{}.bin", Uuid::new_v4().simple());
        let path = uploads_dir.join(&stored_file_name);

        // The filename is freshly generated, so an existing file means a
        // collision or a retry racing itself; refuse to overwrite either way.
        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(storage_err)?;
        out.write_all(nonce.as_slice()).map_err(storage_err)?;
        out.write_all(&ciphertext).map_err(storage_err)?;
        out.flush().map_err(storage_err)?;

        Ok(stored_file_name)
    }

    #[instrument(skip_all, fields(stored_file_name))]
    async fn open_decrypted(
        &self,
        uploads_dir: &Path,
        stored_file_name: &str,
    ) -> Result<Vec<u8>, VaultError> {
        let path = blob_path(uploads_dir, stored_file_name)?;
        let blob = read_blob(&path, stored_file_name)?;

        if blob.len() < NONCE_LEN {
            return Err(VaultError::Storage {
                reason: format!("blob truncated: {stored_file_name}"),
            });
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);

        let key_material = self.key_material().await?;
        let cipher = build_cipher(&key_material)?;
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| VaultError::Storage {
                reason: format!("decrypt failed: {e}"),
            })
    }
}

/// Stored names are vault-issued tokens; anything that could walk out of the
/// uploads directory is rejected outright.
fn blob_path(uploads_dir: &Path, stored_file_name: &str) -> Result<PathBuf, VaultError> {
    if stored_file_name.is_empty()
        || stored_file_name.contains(['/', '\\'])
        || stored_file_name.contains("..")
    {
        return Err(VaultError::Storage {
            reason: format!("invalid stored file name: {stored_file_name}"),
        });
    }
    Ok(uploads_dir.join(stored_file_name))
}

fn read_blob(path: &Path, stored_file_name: &str) -> Result<Vec<u8>, VaultError> {
    let mut file = File::open(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            VaultError::NotFound {
                name: stored_file_name.to_string(),
            }
        } else {
            storage_err(err)
        }
    })?;

    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(storage_err)?;
    Ok(buf)
}

fn build_cipher(material: &KeyMaterial) -> Result<Aes256Gcm, VaultError> {
    Aes256Gcm::new_from_slice(&material.bytes).map_err(|e| VaultError::Storage {
        reason: format!("cipher init failed: {e}"),
    })
}

fn storage_err<E: ToString>(err: E) -> VaultError {
    VaultError::Storage {
        reason: err.to_string(),
    }
}

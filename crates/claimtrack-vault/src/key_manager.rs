use std::{
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

/// Key material used for encryption at rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    /// Identifier for logging and exposure outside the vault (never log or
    /// expose key bytes).
    pub id: String,
    /// 256-bit symmetric key.
    pub bytes: [u8; 32],
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key file error: {0}")]
    Io(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("generation error: {0}")]
    Generation(String),
}

/// Provides the single symmetric key for the deployment's lifetime (a file
/// under the data dir in production; memory in tests).
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn get_or_create(&self) -> Result<KeyMaterial, KeyError>;
}

/// File-backed provider. Generates a random 256-bit key on first use and
/// persists it base64-encoded at a fixed location; subsequent calls load the
/// same key. Nonces are not stored here: every blob carries its own.
pub struct FileKeyProvider {
    path: PathBuf,
}

impl FileKeyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl KeyProvider for FileKeyProvider {
    async fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        match fs::read_to_string(&self.path) {
            Ok(encoded) => decode_key(encoded.trim()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let material = generate_key();
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent).map_err(|e| KeyError::Io(e.to_string()))?;
                }
                fs::write(&self.path, encode_key(&material))
                    .map_err(|e| KeyError::Io(e.to_string()))?;
                Ok(material)
            }
            Err(err) => Err(KeyError::Io(err.to_string())),
        }
    }
}

/// In-memory key provider for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyProvider {
    inner: Arc<Mutex<Option<KeyMaterial>>>,
}

#[async_trait]
impl KeyProvider for InMemoryKeyProvider {
    async fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| KeyError::Generation(format!("lock poisoned: {err}")))?;

        if let Some(existing) = guard.clone() {
            return Ok(existing);
        }

        let material = generate_key();
        *guard = Some(material.clone());
        Ok(material)
    }
}

fn generate_key() -> KeyMaterial {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    KeyMaterial {
        id: "default".to_string(),
        bytes,
    }
}

fn encode_key(material: &KeyMaterial) -> String {
    general_purpose::STANDARD.encode(material.bytes)
}

fn decode_key(encoded: &str) -> Result<KeyMaterial, KeyError> {
    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| KeyError::Decode(e.to_string()))?;

    if bytes.len() != 32 {
        return Err(KeyError::Decode(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(KeyMaterial {
        id: "default".to_string(),
        bytes: out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_provider_persists_one_key_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("file_key.txt");

        let first = FileKeyProvider::new(&path)
            .get_or_create()
            .await
            .expect("first key");
        let second = FileKeyProvider::new(&path)
            .get_or_create()
            .await
            .expect("second key");

        assert_eq!(first, second);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn key_file_never_contains_raw_key_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("file_key.txt");
        let material = FileKeyProvider::new(&path)
            .get_or_create()
            .await
            .expect("key");

        let stored = fs::read_to_string(&path).expect("read key file");
        assert_eq!(stored, general_purpose::STANDARD.encode(material.bytes));
    }

    #[tokio::test]
    async fn file_provider_rejects_malformed_key_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("file_key.txt");
        fs::write(&path, "not base64!!").expect("write");

        let err = FileKeyProvider::new(&path)
            .get_or_create()
            .await
            .expect_err("should reject");
        assert!(matches!(err, KeyError::Decode(_)));
    }

    #[tokio::test]
    async fn memory_provider_returns_same_key() {
        let provider = InMemoryKeyProvider::default();
        let first = provider.get_or_create().await.unwrap();
        let second = provider.get_or_create().await.unwrap();

        assert_eq!(first.bytes, second.bytes);
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let err = decode_key("abcd").expect_err("should reject wrong length");
        assert!(matches!(err, KeyError::Decode(_)));
    }
}

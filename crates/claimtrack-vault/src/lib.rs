//! Encryption at rest for claim attachments. AES-256-GCM blobs with a fresh
//! nonce per file; the symmetric key is sourced from a `KeyProvider`.

pub mod encrypted_vault;
pub mod key_manager;

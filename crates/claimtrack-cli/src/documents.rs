use std::{
    fs,
    path::{Path, PathBuf},
};

use claimtrack_core::{
    claims::{Document, NewDocument},
    vault::{AttachmentVault, VaultError},
};
use claimtrack_store::ClaimStore;
use color_eyre::{
    eyre::{bail, eyre},
    Result,
};

use crate::{config::Config, storage};

/// Upload policy enforced here, before the vault is ever invoked. The core
/// assumes a pre-validated byte stream.
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".pdf", ".docx", ".xlsx"];
pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Check an upload against the allowed extensions and the size cap.
/// Returns the normalized (lowercase, dot-prefixed) extension.
pub fn validate_upload(path: &Path, size: u64) -> Result<String> {
    let ext = file_extension(path);
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        bail!("invalid file type; only PDF, DOCX and XLSX allowed");
    }
    if size > MAX_FILE_BYTES {
        bail!("file size exceeds the 5 MB limit");
    }
    Ok(ext)
}

/// Encrypt the file at `path` into the uploads directory and link the
/// resulting blob to `claim_id`. Assumes the upload has already passed
/// [`validate_upload`].
pub async fn attach_file(
    store: &ClaimStore,
    vault: &impl AttachmentVault,
    uploads_dir: &Path,
    claim_id: u32,
    path: &Path,
) -> Result<()> {
    let bytes = fs::read(path)?;
    let ext = file_extension(path);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let stored_file_name = vault
        .save_encrypted(&bytes, uploads_dir)
        .await
        .map_err(|e| eyre!(e.to_string()))?;

    store.add_document_to_claim(
        claim_id,
        NewDocument {
            file_name,
            stored_file_name,
            file_size: bytes.len() as u64,
            file_type: ext,
        },
    );
    Ok(())
}

/// Decrypt a stored document back to a local file.
pub async fn download(config: &Config, document_id: u32, output: Option<PathBuf>) -> Result<()> {
    let store = storage::open_store(config)?;
    let vault = storage::build_vault(config)?;
    let uploads_dir = storage::uploads_dir(config)?;

    let Some(doc) = find_document(&store, document_id) else {
        bail!("document {document_id} not found");
    };

    let plaintext = match vault.open_decrypted(&uploads_dir, &doc.stored_file_name).await {
        Ok(bytes) => bytes,
        Err(VaultError::NotFound { name }) => {
            bail!("encrypted file {name} is missing from the uploads directory")
        }
        Err(err) => return Err(eyre!(err.to_string())),
    };

    let target = output.unwrap_or_else(|| default_target(&doc));
    fs::write(&target, plaintext)?;
    println!("Decrypted {} to {}", doc.file_name, target.display());
    Ok(())
}

/// Locate a document by id across all claims' attachment lists.
pub fn find_document(store: &ClaimStore, document_id: u32) -> Option<Document> {
    store
        .get_all_claims()
        .into_iter()
        .flat_map(|c| c.documents)
        .find(|d| d.document_id == document_id)
}

fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// The display name is untrusted; only its final component may name the
/// output file.
fn default_target(doc: &Document) -> PathBuf {
    Path::new(&doc.file_name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("download.bin"))
}

#[cfg(test)]
mod tests {
    use claimtrack_core::claims::NewClaim;
    use claimtrack_vault::{encrypted_vault::EncryptedFileVault, key_manager::InMemoryKeyProvider};

    use super::*;

    #[test]
    fn accepts_allowed_extensions_in_any_case() {
        assert_eq!(
            validate_upload(Path::new("invoice.PDF"), 10).expect("valid"),
            ".pdf"
        );
        assert_eq!(
            validate_upload(Path::new("timesheet.xlsx"), 10).expect("valid"),
            ".xlsx"
        );
    }

    #[test]
    fn rejects_disallowed_extensions() {
        assert!(validate_upload(Path::new("malware.exe"), 10).is_err());
        assert!(validate_upload(Path::new("noextension"), 10).is_err());
    }

    #[test]
    fn rejects_files_over_the_cap() {
        assert!(validate_upload(Path::new("big.pdf"), MAX_FILE_BYTES + 1).is_err());
        assert!(validate_upload(Path::new("fits.pdf"), MAX_FILE_BYTES).is_ok());
    }

    #[tokio::test]
    async fn attach_and_download_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ClaimStore::open(dir.path().join("claims_data.json"));
        let vault = EncryptedFileVault::new(InMemoryKeyProvider::default());
        let uploads_dir = dir.path().join("uploads");

        let source = dir.path().join("evidence.pdf");
        fs::write(&source, b"timesheet scan bytes").expect("write source");

        let claim_id = store.add_claim(NewClaim::new("Alice", 6.0, 90.0));
        attach_file(&store, &vault, &uploads_dir, claim_id, &source)
            .await
            .expect("attach");

        let doc = find_document(&store, 1).expect("document linked");
        assert_eq!(doc.claim_id, claim_id);
        assert_eq!(doc.file_name, "evidence.pdf");
        assert_eq!(doc.file_type, ".pdf");
        assert_eq!(doc.file_size, 20);

        let decrypted = vault
            .open_decrypted(&uploads_dir, &doc.stored_file_name)
            .await
            .expect("decrypt");
        assert_eq!(decrypted, b"timesheet scan bytes");
    }

    #[test]
    fn find_document_searches_every_claim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ClaimStore::open(dir.path().join("claims_data.json"));
        store.add_claim(NewClaim::new("Alice", 6.0, 90.0));
        let second = store.add_claim(NewClaim::new("Bob", 7.0, 100.0));
        store.add_document_to_claim(
            second,
            NewDocument {
                file_name: "b.pdf".to_string(),
                stored_file_name: "blob.bin".to_string(),
                file_size: 9,
                file_type: ".pdf".to_string(),
            },
        );

        assert_eq!(find_document(&store, 1).expect("found").claim_id, second);
        assert!(find_document(&store, 99).is_none());
    }

    #[test]
    fn default_target_strips_directories_from_display_names() {
        let doc = Document {
            document_id: 1,
            claim_id: 1,
            file_name: "../../etc/passwd".to_string(),
            stored_file_name: "blob.bin".to_string(),
            upload_date: chrono::Utc::now(),
            file_size: 1,
            file_type: ".pdf".to_string(),
        };
        assert_eq!(default_target(&doc), PathBuf::from("passwd"));
    }
}

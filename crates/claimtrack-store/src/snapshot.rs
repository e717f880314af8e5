use std::{
    fs::{self, File},
    io::{ErrorKind, Read, Write},
    path::Path,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use claimtrack_core::claims::{Claim, Document, NewClaim};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

/// Mutable internal representation of a claim. Only this crate can touch it;
/// reads hand out [`Claim`] views built by `to_view`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(crate) struct ClaimRecord {
    pub claim_id: u32,
    pub lecturer_name: String,
    pub hours_worked: f64,
    pub hourly_rate: f64,
    pub notes: Option<String>,
    pub status: String,
    pub submission_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub documents: Vec<DocumentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(crate) struct DocumentRecord {
    pub document_id: u32,
    pub claim_id: u32,
    pub file_name: String,
    pub stored_file_name: String,
    pub upload_date: DateTime<Utc>,
    pub file_size: u64,
    pub file_type: String,
}

impl ClaimRecord {
    pub fn create(claim_id: u32, draft: NewClaim, submission_date: DateTime<Utc>) -> Self {
        Self {
            claim_id,
            lecturer_name: draft.lecturer_name,
            hours_worked: draft.hours_worked,
            hourly_rate: draft.hourly_rate,
            notes: draft.notes,
            status: draft.status,
            submission_date,
            approval_date: None,
            approved_by: None,
            documents: Vec::new(),
        }
    }

    pub fn to_view(&self) -> Claim {
        Claim {
            claim_id: self.claim_id,
            lecturer_name: self.lecturer_name.clone(),
            hours_worked: self.hours_worked,
            hourly_rate: self.hourly_rate,
            notes: self.notes.clone(),
            status: self.status.clone(),
            submission_date: self.submission_date,
            approval_date: self.approval_date,
            approved_by: self.approved_by.clone(),
            documents: self.documents.iter().map(DocumentRecord::to_view).collect(),
        }
    }
}

impl DocumentRecord {
    pub fn to_view(&self) -> Document {
        Document {
            document_id: self.document_id,
            claim_id: self.claim_id,
            file_name: self.file_name.clone(),
            stored_file_name: self.stored_file_name.clone(),
            upload_date: self.upload_date,
            file_size: self.file_size,
            file_type: self.file_type.clone(),
        }
    }
}

/// On-disk artifact: the full claim collection plus both id counters,
/// rewritten wholesale on every mutation.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub claims: Vec<ClaimRecord>,
    pub next_claim_id: u32,
    pub next_document_id: u32,
}

/// Load the snapshot at `path`. `Ok(None)` means no snapshot exists yet (a
/// fresh start); errors mean the artifact is unreadable or malformed.
pub(crate) fn load(path: &Path) -> Result<Option<Snapshot>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).context("open snapshot"),
    };

    let mut buf = Vec::new();
    file.read_to_end(&mut buf).context("read snapshot")?;
    let mut snapshot: Snapshot = serde_json::from_slice(&buf).context("decode snapshot")?;

    // Counters never go below 1, even if the artifact says otherwise.
    snapshot.next_claim_id = snapshot.next_claim_id.max(1);
    snapshot.next_document_id = snapshot.next_document_id.max(1);
    Ok(Some(snapshot))
}

/// Replace the snapshot at `path` with `snapshot`, atomically: the new
/// content is written to a temp file in the same directory and renamed over
/// the old artifact, so a crash mid-write cannot leave a torn snapshot.
pub(crate) fn write(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).context("create snapshot directory")?;

    let mut tmp = NamedTempFile::new_in(parent).context("create temp snapshot")?;
    let json = serde_json::to_vec_pretty(snapshot).context("encode snapshot")?;
    tmp.write_all(&json).context("write snapshot")?;
    tmp.flush().context("flush snapshot")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .context("persist snapshot")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(id: u32) -> ClaimRecord {
        ClaimRecord::create(id, NewClaim::new("Alice", 6.0, 90.0), Utc::now())
    }

    #[test]
    fn load_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = load(&dir.path().join("claims_data.json")).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn round_trips_claims_and_counters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("claims_data.json");

        let snapshot = Snapshot {
            claims: vec![sample_record(1), sample_record(2)],
            next_claim_id: 3,
            next_document_id: 7,
        };
        write(&path, &snapshot).expect("write");

        let loaded = load(&path).expect("load").expect("snapshot present");
        assert_eq!(loaded.claims, snapshot.claims);
        assert_eq!(loaded.next_claim_id, 3);
        assert_eq!(loaded.next_document_id, 7);
    }

    #[test]
    fn load_clamps_counters_to_one() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("claims_data.json");
        write(
            &path,
            &Snapshot {
                claims: Vec::new(),
                next_claim_id: 0,
                next_document_id: 0,
            },
        )
        .expect("write");

        let loaded = load(&path).expect("load").expect("snapshot present");
        assert_eq!(loaded.next_claim_id, 1);
        assert_eq!(loaded.next_document_id, 1);
    }

    #[test]
    fn load_rejects_malformed_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("claims_data.json");
        fs::write(&path, b"{ not json").expect("write garbage");

        assert!(load(&path).is_err());
    }

    #[test]
    fn write_replaces_prior_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("claims_data.json");

        for next in [2u32, 5u32] {
            write(
                &path,
                &Snapshot {
                    claims: Vec::new(),
                    next_claim_id: next,
                    next_document_id: 1,
                },
            )
            .expect("write");
        }

        let loaded = load(&path).expect("load").expect("snapshot present");
        assert_eq!(loaded.next_claim_id, 5);
    }
}

use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::Utc;
use claimtrack_core::claims::{Claim, NewClaim, NewDocument};
use tracing::{debug, error, info, instrument};

use crate::snapshot::{self, ClaimRecord, DocumentRecord, Snapshot};

/// Authoritative, thread-safe collection of claims and their attached
/// document metadata.
///
/// A single coarse lock covers both the in-memory collection and the
/// synchronous snapshot write, so any two operations observe a consistent
/// total order and a snapshot always reflects every mutation that completed
/// before it started. The price is that a slow disk stalls every other store
/// operation while a snapshot is being written.
///
/// Constructed explicitly and passed by handle; tests build independent
/// instances on temp paths.
pub struct ClaimStore {
    state: Mutex<StoreState>,
    snapshot_path: PathBuf,
}

struct StoreState {
    claims: Vec<ClaimRecord>,
    next_claim_id: u32,
    next_document_id: u32,
    /// Set when a snapshot write failed and memory has diverged from disk;
    /// cleared by the next successful write.
    dirty: bool,
}

impl StoreState {
    fn empty() -> Self {
        Self {
            claims: Vec::new(),
            next_claim_id: 1,
            next_document_id: 1,
            dirty: false,
        }
    }

    fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            claims: snapshot.claims,
            next_claim_id: snapshot.next_claim_id,
            next_document_id: snapshot.next_document_id,
            dirty: false,
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            claims: self.claims.clone(),
            next_claim_id: self.next_claim_id,
            next_document_id: self.next_document_id,
        }
    }
}

impl ClaimStore {
    /// Open a store backed by the snapshot at `snapshot_path`. A missing
    /// snapshot yields an empty store; an unreadable or malformed one is
    /// logged and discarded rather than failing startup.
    pub fn open(snapshot_path: impl Into<PathBuf>) -> Self {
        let snapshot_path = snapshot_path.into();
        let state = match snapshot::load(&snapshot_path) {
            Ok(Some(loaded)) => {
                info!(claims = loaded.claims.len(), "loaded claims snapshot");
                StoreState::from_snapshot(loaded)
            }
            Ok(None) => StoreState::empty(),
            Err(err) => {
                error!("discarding unreadable claims snapshot: {err:#}");
                StoreState::empty()
            }
        };

        Self {
            state: Mutex::new(state),
            snapshot_path,
        }
    }

    /// Path of the snapshot artifact this store rewrites on every mutation.
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Add a new claim and return its assigned id. The submission timestamp
    /// is set here, overwriting whatever the caller had in mind. Persistence
    /// failure is logged, not surfaced: the claim is committed in memory
    /// either way.
    #[instrument(skip(self, draft))]
    pub fn add_claim(&self, draft: NewClaim) -> u32 {
        let mut state = self.lock();
        let claim_id = state.next_claim_id;
        state.next_claim_id += 1;
        state
            .claims
            .push(ClaimRecord::create(claim_id, draft, Utc::now()));
        self.persist(&mut state);
        claim_id
    }

    /// Look up a claim by id. Returns an independent copy; absent ids are
    /// `None`, never an error.
    pub fn get_claim_by_id(&self, claim_id: u32) -> Option<Claim> {
        let state = self.lock();
        state
            .claims
            .iter()
            .find(|c| c.claim_id == claim_id)
            .map(ClaimRecord::to_view)
    }

    /// All claims in insertion order, as independent copies.
    pub fn get_all_claims(&self) -> Vec<Claim> {
        let state = self.lock();
        state.claims.iter().map(ClaimRecord::to_view).collect()
    }

    /// Claims whose status matches `status` (case-insensitive), in insertion
    /// order, as independent copies.
    pub fn get_claims_by_status(&self, status: &str) -> Vec<Claim> {
        let state = self.lock();
        state
            .claims
            .iter()
            .filter(|c| c.status.eq_ignore_ascii_case(status))
            .map(ClaimRecord::to_view)
            .collect()
    }

    /// Set a claim's status and approval metadata. An unknown id is a silent
    /// no-op by design, not an error.
    #[instrument(skip(self))]
    pub fn update_claim_status(&self, claim_id: u32, status: &str, approved_by: &str) {
        let mut state = self.lock();
        let Some(idx) = state.claims.iter().position(|c| c.claim_id == claim_id) else {
            debug!(claim_id, "status update for unknown claim ignored");
            return;
        };

        let claim = &mut state.claims[idx];
        claim.status = status.to_string();
        claim.approval_date = Some(Utc::now());
        claim.approved_by = Some(approved_by.to_string());
        self.persist(&mut state);
    }

    /// Attach document metadata to a claim, assigning the next document id.
    /// An unknown claim id is a silent no-op and does not consume an id.
    #[instrument(skip(self, document))]
    pub fn add_document_to_claim(&self, claim_id: u32, document: NewDocument) {
        let mut state = self.lock();
        let Some(idx) = state.claims.iter().position(|c| c.claim_id == claim_id) else {
            debug!(claim_id, "document attach for unknown claim ignored");
            return;
        };

        let document_id = state.next_document_id;
        state.next_document_id += 1;
        state.claims[idx].documents.push(DocumentRecord {
            document_id,
            claim_id,
            file_name: document.file_name,
            stored_file_name: document.stored_file_name,
            upload_date: Utc::now(),
            file_size: document.file_size,
            file_type: document.file_type,
        });
        self.persist(&mut state);
    }

    /// Whether in-memory state has diverged from the snapshot on disk after
    /// a swallowed write failure.
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // Every critical section leaves the state internally consistent, so
        // a poisoned lock still guards valid data.
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn persist(&self, state: &mut StoreState) {
        match snapshot::write(&self.snapshot_path, &state.to_snapshot()) {
            Ok(()) => {
                state.dirty = false;
                debug!(claims = state.claims.len(), "claims snapshot written");
            }
            Err(err) => {
                state.dirty = true;
                error!("snapshot write failed, in-memory state diverges from disk: {err:#}");
            }
        }
    }
}

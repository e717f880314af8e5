use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known claim statuses. The store does not validate transitions (or
/// even membership in this set); callers decide what a status means.
pub mod status {
    pub const PENDING: &str = "Pending";
    pub const VERIFIED: &str = "Verified";
    pub const APPROVED: &str = "Approved";
    pub const REJECTED: &str = "Rejected";
}

/// Read-only view of a claim as returned by the store. Always a deep copy:
/// mutating a returned value never touches the store's internal state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claim {
    pub claim_id: u32,
    pub lecturer_name: String,
    pub hours_worked: f64,
    pub hourly_rate: f64,
    pub notes: Option<String>,
    pub status: String,
    pub submission_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub documents: Vec<Document>,
}

impl Claim {
    /// Amount owed for the claim, rounded to two decimals (half away from
    /// zero). Derived on demand, never stored.
    pub fn total_amount(&self) -> f64 {
        (self.hours_worked * self.hourly_rate * 100.0).round() / 100.0
    }
}

/// Read-only view of one encrypted attachment's metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub document_id: u32,
    pub claim_id: u32,
    /// Original display name. Untrusted; never used as a storage path.
    pub file_name: String,
    /// Opaque token naming the encrypted blob on disk.
    pub stored_file_name: String,
    pub upload_date: DateTime<Utc>,
    pub file_size: u64,
    pub file_type: String,
}

/// Caller-supplied fields for a new claim. The store assigns the id and
/// overwrites the submission timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClaim {
    pub lecturer_name: String,
    pub hours_worked: f64,
    pub hourly_rate: f64,
    pub notes: Option<String>,
    pub status: String,
}

impl NewClaim {
    pub fn new(lecturer_name: impl Into<String>, hours_worked: f64, hourly_rate: f64) -> Self {
        Self {
            lecturer_name: lecturer_name.into(),
            hours_worked,
            hourly_rate,
            notes: None,
            status: status::PENDING.to_string(),
        }
    }
}

/// Caller-supplied fields for a new document. The store assigns the id, the
/// owning claim back-reference, and the upload timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub file_name: String,
    pub stored_file_name: String,
    pub file_size: u64,
    pub file_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(hours: f64, rate: f64) -> Claim {
        Claim {
            claim_id: 1,
            lecturer_name: "Test".to_string(),
            hours_worked: hours,
            hourly_rate: rate,
            notes: None,
            status: status::PENDING.to_string(),
            submission_date: Utc::now(),
            approval_date: None,
            approved_by: None,
            documents: Vec::new(),
        }
    }

    #[test]
    fn total_amount_multiplies_hours_by_rate() {
        assert_eq!(claim(10.0, 150.0).total_amount(), 1500.0);
        assert_eq!(claim(8.0, 120.0).total_amount(), 960.0);
    }

    #[test]
    fn total_amount_rounds_half_away_from_zero() {
        // 0.5 * 240.25 = 120.125; half away from zero gives 120.13, a
        // banker's rounding would give 120.12.
        assert_eq!(claim(0.5, 240.25).total_amount(), 120.13);
        assert_eq!(claim(1.5, 80.25).total_amount(), 120.38);
    }

    #[test]
    fn new_claim_defaults_to_pending() {
        let draft = NewClaim::new("Alice", 6.0, 90.0);
        assert_eq!(draft.status, status::PENDING);
        assert_eq!(draft.notes, None);
    }
}

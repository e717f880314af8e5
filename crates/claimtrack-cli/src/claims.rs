use std::{fs, path::Path};

use claimtrack_core::{
    claims::{status, Claim, NewClaim},
    vault::AttachmentVault,
};
use claimtrack_store::ClaimStore;
use color_eyre::{
    eyre::{bail, eyre},
    Result,
};

use crate::{cli::SubmitArgs, config::Config, documents, storage};

/// Submit a new claim, encrypting and linking the supporting document if one
/// was given. The attachment is validated before the claim is created, then
/// the flow is add claim, encrypt blob, link document.
pub async fn submit(config: &Config, args: SubmitArgs) -> Result<()> {
    validate_claim(&args)?;
    if let Some(path) = &args.file {
        let size = fs::metadata(path)?.len();
        documents::validate_upload(path, size)?;
    }

    let store = storage::open_store(config)?;
    let vault = storage::build_vault(config)?;
    let uploads_dir = storage::uploads_dir(config)?;

    let claim = submit_claim(&store, &vault, &uploads_dir, &args).await?;
    println!(
        "Claim #{} submitted for {}: R{:.2} [{}]",
        claim.claim_id,
        claim.lecturer_name,
        claim.total_amount(),
        claim.status
    );
    if let Some(doc) = claim.documents.first() {
        println!("Attached {} as document #{}", doc.file_name, doc.document_id);
    }
    Ok(())
}

pub(crate) async fn submit_claim(
    store: &ClaimStore,
    vault: &impl AttachmentVault,
    uploads_dir: &Path,
    args: &SubmitArgs,
) -> Result<Claim> {
    let mut draft = NewClaim::new(args.lecturer.clone(), args.hours, args.rate);
    draft.notes = args.notes.clone();

    let claim_id = store.add_claim(draft);
    if let Some(path) = &args.file {
        documents::attach_file(store, vault, uploads_dir, claim_id, path).await?;
    }

    store
        .get_claim_by_id(claim_id)
        .ok_or_else(|| eyre!("claim {claim_id} missing after submit"))
}

/// Pre-submission validation. The store itself accepts anything; these are
/// the caller-enforced ranges.
fn validate_claim(args: &SubmitArgs) -> Result<()> {
    if args.lecturer.trim().is_empty() {
        bail!("lecturer name is required");
    }
    if !(1.0..=200.0).contains(&args.hours) {
        bail!("hours worked must be between 1 and 200");
    }
    if !(50.0..=500.0).contains(&args.rate) {
        bail!("hourly rate must be between 50 and 500");
    }
    if args.notes.as_deref().is_some_and(|n| n.chars().count() > 500) {
        bail!("notes cannot exceed 500 characters");
    }
    Ok(())
}

pub fn list(config: &Config, status_filter: Option<&str>) -> Result<()> {
    let store = storage::open_store(config)?;
    let claims = match status_filter {
        Some(status) => store.get_claims_by_status(status),
        None => store.get_all_claims(),
    };

    if claims.is_empty() {
        println!("No claims found.");
        return Ok(());
    }
    for claim in claims {
        print_summary(&claim);
    }
    Ok(())
}

pub fn show(config: &Config, claim_id: u32) -> Result<()> {
    let store = storage::open_store(config)?;
    let Some(claim) = store.get_claim_by_id(claim_id) else {
        bail!("claim {claim_id} not found");
    };

    print_summary(&claim);
    println!(
        "    submitted: {}",
        claim.submission_date.format("%Y-%m-%d %H:%M UTC")
    );
    if let Some(notes) = &claim.notes {
        println!("    notes: {notes}");
    }
    if let (Some(approved_by), Some(approval_date)) = (&claim.approved_by, claim.approval_date) {
        println!(
            "    decided by {} on {}",
            approved_by,
            approval_date.format("%Y-%m-%d %H:%M UTC")
        );
    }
    for doc in &claim.documents {
        println!(
            "    document #{}: {} ({} bytes, {}) stored as {}",
            doc.document_id, doc.file_name, doc.file_size, doc.file_type, doc.stored_file_name
        );
    }
    Ok(())
}

pub fn verify(config: &Config, claim_id: u32) -> Result<()> {
    set_status(config, claim_id, status::VERIFIED, "Programme Coordinator")
}

pub fn approve(config: &Config, claim_id: u32) -> Result<()> {
    set_status(config, claim_id, status::APPROVED, "Academic Manager")
}

pub fn reject(config: &Config, claim_id: u32, role: &str) -> Result<()> {
    set_status(config, claim_id, status::REJECTED, role)
}

fn set_status(config: &Config, claim_id: u32, new_status: &str, actor: &str) -> Result<()> {
    let store = storage::open_store(config)?;
    store.update_claim_status(claim_id, new_status, actor);
    match store.get_claim_by_id(claim_id) {
        Some(claim) => println!("Claim #{} is now {} (by {actor}).", claim.claim_id, claim.status),
        None => println!("Claim #{claim_id} not found; nothing changed."),
    }
    Ok(())
}

fn print_summary(claim: &Claim) {
    println!(
        "#{} {} {}h @ R{:.2} = R{:.2} [{}]",
        claim.claim_id,
        claim.lecturer_name,
        claim.hours_worked,
        claim.hourly_rate,
        claim.total_amount(),
        claim.status
    );
}

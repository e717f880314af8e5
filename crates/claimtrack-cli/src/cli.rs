use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI surface definition. Subcommands mirror the claim lifecycle: submit,
/// track, verify/approve/reject, download.
#[derive(Parser, Debug)]
#[command(
    name = "claimtrack",
    about = "Claims tracking backend with encrypted attachments",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Submit a new claim, optionally attaching a supporting document.
    Submit(SubmitArgs),
    /// List claims, optionally filtered by status.
    List {
        /// Only show claims with this status (case-insensitive).
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one claim in full, including attached documents.
    Show { claim_id: u32 },
    /// Mark a claim as Verified (Programme Coordinator).
    Verify { claim_id: u32 },
    /// Mark a claim as Approved (Academic Manager).
    Approve { claim_id: u32 },
    /// Mark a claim as Rejected.
    Reject {
        claim_id: u32,
        /// Recorded as the rejecting party.
        #[arg(long, default_value = "Academic Manager")]
        role: String,
    },
    /// Decrypt a stored document back to a local file.
    Download {
        document_id: u32,
        /// Destination path; defaults to the original file name.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run a health check against core subsystems (store, vault).
    Health,
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SubmitArgs {
    /// Lecturer's full name.
    #[arg(long)]
    pub lecturer: String,
    /// Hours worked (1 to 200).
    #[arg(long)]
    pub hours: f64,
    /// Hourly rate in rand (50 to 500).
    #[arg(long)]
    pub rate: f64,
    /// Additional notes (up to 500 characters).
    #[arg(long)]
    pub notes: Option<String>,
    /// Supporting document to encrypt and attach (.pdf, .docx or .xlsx).
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_submit_with_attachment() {
        let cli = Cli::try_parse_from([
            "claimtrack",
            "submit",
            "--lecturer",
            "Alice",
            "--hours",
            "6",
            "--rate",
            "90",
            "--file",
            "invoice.pdf",
        ])
        .expect("parse should succeed");

        assert_eq!(
            cli.command,
            Command::Submit(SubmitArgs {
                lecturer: "Alice".to_string(),
                hours: 6.0,
                rate: 90.0,
                notes: None,
                file: Some(PathBuf::from("invoice.pdf")),
            })
        );
    }

    #[test]
    fn parses_list_with_status_filter() {
        let cli = Cli::try_parse_from(["claimtrack", "list", "--status", "Pending"])
            .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::List {
                status: Some("Pending".to_string())
            }
        );
    }

    #[test]
    fn parses_approve_subcommand() {
        let cli = Cli::try_parse_from(["claimtrack", "approve", "7"]).expect("parse should succeed");
        assert_eq!(cli.command, Command::Approve { claim_id: 7 });
    }

    #[test]
    fn reject_defaults_the_recording_role() {
        let cli = Cli::try_parse_from(["claimtrack", "reject", "3"]).expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Reject {
                claim_id: 3,
                role: "Academic Manager".to_string()
            }
        );
    }

    #[test]
    fn parses_config_init_subcommand() {
        let cli = Cli::try_parse_from(["claimtrack", "config", "init"]).expect("parse should succeed");
        assert_eq!(cli.command, Command::Config(ConfigCommand::Init));
    }

    #[test]
    fn requires_a_subcommand() {
        assert!(Cli::try_parse_from(["claimtrack"]).is_err());
    }
}

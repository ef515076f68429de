use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use pdlc_core::store::FeatureStore;
use pdlc_core::types::ApprovalStatus;
use std::path::Path;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ApprovalSubcommand {
    /// Ask a stakeholder for sign-off (records a pending approval)
    Request { slug: String, approver: String },

    /// Set a stakeholder's approval status
    Set {
        slug: String,
        approver: String,

        /// pending, approved, or rejected
        status: String,
    },

    /// List approvals on a feature
    List { slug: String },
}

pub fn run(root: &Path, subcmd: ApprovalSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ApprovalSubcommand::Request { slug, approver } => {
            set(root, &slug, &approver, ApprovalStatus::Pending, json)
        }
        ApprovalSubcommand::Set {
            slug,
            approver,
            status,
        } => {
            let status = ApprovalStatus::from_str(&status)?;
            set(root, &slug, &approver, status, json)
        }
        ApprovalSubcommand::List { slug } => list(root, &slug, json),
    }
}

// ---------------------------------------------------------------------------
// set
// ---------------------------------------------------------------------------

fn set(
    root: &Path,
    slug: &str,
    approver: &str,
    status: ApprovalStatus,
    json: bool,
) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;

    record.upsert_approval(approver, status);
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record.approvals)?;
    } else {
        println!("Approval from {approver} on '{slug}': {status}.");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let record = store.load(slug)?;

    if json {
        print_json(&record.approvals)?;
        return Ok(());
    }
    if record.approvals.is_empty() {
        println!("No approvals recorded on '{slug}'.");
        return Ok(());
    }

    let rows = record
        .approvals
        .iter()
        .map(|a| vec![a.approver.clone(), a.status.to_string()])
        .collect();
    print_table(&["APPROVER", "STATUS"], rows);
    Ok(())
}

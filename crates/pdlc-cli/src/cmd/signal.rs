use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use pdlc_core::store::FeatureStore;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum SignalSubcommand {
    /// Record the engineering estimate
    Estimate {
        slug: String,

        /// Free-form estimate, e.g. "6 weeks" (empty string clears it)
        estimate: String,
    },

    /// Record the number of open design questions
    Questions { slug: String, count: u32 },
}

pub fn run(root: &Path, subcmd: SignalSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        SignalSubcommand::Estimate { slug, estimate } => set_estimate(root, &slug, &estimate, json),
        SignalSubcommand::Questions { slug, count } => set_questions(root, &slug, count, json),
    }
}

// ---------------------------------------------------------------------------
// estimate
// ---------------------------------------------------------------------------

fn set_estimate(root: &Path, slug: &str, estimate: &str, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;

    if estimate.trim().is_empty() {
        record.clear_estimate();
    } else {
        record.set_estimate(estimate);
    }
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record)?;
    } else {
        match &record.estimate {
            Some(estimate) => println!("Estimate for '{slug}': {estimate}"),
            None => println!("Estimate for '{slug}' cleared."),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// questions
// ---------------------------------------------------------------------------

fn set_questions(root: &Path, slug: &str, count: u32, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;

    record.set_open_design_questions(count);
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record)?;
    } else {
        println!("'{slug}' now has {count} open design questions.");
    }
    Ok(())
}

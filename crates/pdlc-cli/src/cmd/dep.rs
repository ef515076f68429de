use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use pdlc_core::store::FeatureStore;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum DepSubcommand {
    /// Record a dependency
    Add {
        slug: String,

        /// What this feature waits on
        description: String,

        /// Blocking dependencies hold the engineering gate
        #[arg(long)]
        blocking: bool,
    },

    /// Mark a dependency resolved by index
    Resolve { slug: String, index: usize },

    /// List dependencies on a feature
    List { slug: String },
}

pub fn run(root: &Path, subcmd: DepSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        DepSubcommand::Add {
            slug,
            description,
            blocking,
        } => add(root, &slug, &description, blocking, json),
        DepSubcommand::Resolve { slug, index } => resolve(root, &slug, index, json),
        DepSubcommand::List { slug } => list(root, &slug, json),
    }
}

// ---------------------------------------------------------------------------
// add / resolve
// ---------------------------------------------------------------------------

fn add(root: &Path, slug: &str, description: &str, blocking: bool, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;

    record.add_dependency(description, blocking);
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record.dependencies)?;
    } else {
        let kind = if blocking { "blocking" } else { "non-blocking" };
        println!(
            "Dependency #{} recorded on '{slug}' ({kind}).",
            record.dependencies.len() - 1
        );
    }
    Ok(())
}

fn resolve(root: &Path, slug: &str, index: usize, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;

    record.resolve_dependency(index)?;
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record.dependencies)?;
    } else {
        println!("Dependency #{index} on '{slug}' resolved.");
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
        print_json(&record.dependencies)?;
        return Ok(());
    }
    if record.dependencies.is_empty() {
        println!("No dependencies recorded on '{slug}'.");
        return Ok(());
    }

    let rows = record
        .dependencies
        .iter()
        .enumerate()
        .map(|(i, dep)| {
            vec![
                i.to_string(),
                if dep.blocking { "yes" } else { "no" }.to_string(),
                if dep.resolved { "yes" } else { "no" }.to_string(),
                dep.description.clone(),
            ]
        })
        .collect();
    print_table(&["#", "BLOCKING", "RESOLVED", "DESCRIPTION"], rows);
    Ok(())
}

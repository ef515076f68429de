use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use pdlc_core::store::FeatureStore;
use pdlc_core::types::ArtifactType;
use std::path::Path;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ArtifactSubcommand {
    /// Link an artifact URL to a feature
    Link {
        slug: String,

        /// Artifact type (context_doc, prd, business_case, design_spec, engineering_plan)
        artifact: String,

        /// http(s) URL of the document
        url: String,
    },

    /// Remove an artifact link
    Clear {
        slug: String,
        artifact: String,
    },

    /// List artifact slots for a feature
    List { slug: String },
}

pub fn run(root: &Path, subcmd: ArtifactSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ArtifactSubcommand::Link { slug, artifact, url } => link(root, &slug, &artifact, &url, json),
        ArtifactSubcommand::Clear { slug, artifact } => clear(root, &slug, &artifact, json),
        ArtifactSubcommand::List { slug } => list(root, &slug, json),
    }
}

// ---------------------------------------------------------------------------
// link / clear
// ---------------------------------------------------------------------------

fn link(root: &Path, slug: &str, artifact: &str, url: &str, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;
    let artifact = ArtifactType::from_str(artifact)?;

    record.link_artifact(artifact, url)?;
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record)?;
    } else {
        println!("Linked {artifact} for '{slug}'.");
    }
    Ok(())
}

fn clear(root: &Path, slug: &str, artifact: &str, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;
    let artifact = ArtifactType::from_str(artifact)?;

    record.clear_artifact(artifact);
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record)?;
    } else {
        println!("Cleared {artifact} for '{slug}'.");
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
        print_json(&record.artifacts)?;
        return Ok(());
    }

    let rows = record
        .artifacts
        .iter()
        .map(|(artifact, url)| {
            vec![
                artifact.to_string(),
                url.clone().unwrap_or_else(|| "(not linked)".to_string()),
            ]
        })
        .collect();
    print_table(&["ARTIFACT", "URL"], rows);
    Ok(())
}

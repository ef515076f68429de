use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use pdlc_core::store::FeatureStore;
use pdlc_core::types::{Phase, Priority};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum FeatureSubcommand {
    /// Create a feature record
    Create {
        /// Feature slug (lowercase alphanumeric with hyphens)
        slug: String,

        /// Human-readable title
        #[arg(long)]
        title: String,

        /// Owning product
        #[arg(long)]
        product: String,

        /// Priority: p0, p1, p2, or p3
        #[arg(long, default_value = "p2")]
        priority: String,
    },

    /// List all feature records
    List,

    /// Show one feature record in full
    Show { slug: String },

    /// Move a feature to the given phase
    Transition {
        slug: String,

        /// Target phase (e.g. signal_analysis)
        phase: String,
    },
}

pub fn run(root: &Path, subcmd: FeatureSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        FeatureSubcommand::Create {
            slug,
            title,
            product,
            priority,
        } => create(root, &slug, &title, &product, &priority, json),
        FeatureSubcommand::List => list(root, json),
        FeatureSubcommand::Show { slug } => show(root, &slug, json),
        FeatureSubcommand::Transition { slug, phase } => transition(root, &slug, &phase, json),
    }
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

fn create(
    root: &Path,
    slug: &str,
    title: &str,
    product: &str,
    priority: &str,
    json: bool,
) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let priority = Priority::from_str(priority)?;
    let record = store
        .create(slug, title, product, priority)
        .context("failed to create feature")?;

    if json {
        print_json(&record)?;
    } else {
        println!(
            "Created feature '{}' in phase {}.",
            record.slug, record.current_phase
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let records = store.list().context("failed to list features")?;

    if json {
        print_json(&records)?;
        return Ok(());
    }
    if records.is_empty() {
        println!("No features yet. Create one with 'pdlc feature create'.");
        return Ok(());
    }

    let config = store.config()?;
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.slug.clone(),
                r.title.clone(),
                r.current_phase.to_string(),
                r.priority.to_string(),
                format!("{}%", r.progress(&config.weights)),
            ]
        })
        .collect();
    print_table(&["SLUG", "TITLE", "PHASE", "PRIORITY", "PROGRESS"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let record = store.load(slug)?;

    if json {
        print_json(&record)?;
        return Ok(());
    }

    let config = store.config()?;
    println!("{}: {}", record.slug, record.title);
    println!("  product:   {}", record.product);
    println!("  priority:  {}", record.priority);
    println!("  phase:     {}", record.current_phase);
    println!("  progress:  {}%", record.progress(&config.weights));
    println!("  revision:  {}", record.revision);
    println!("  updated:   {}", record.updated_at.format("%Y-%m-%d %H:%M UTC"));
    println!();

    let rows = record
        .tracks
        .values()
        .map(|t| {
            vec![
                t.name.to_string(),
                t.status.to_string(),
                t.version.to_string(),
                t.outcome.map(|o| o.to_string()).unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(&["TRACK", "STATUS", "VERSION", "OUTCOME"], rows);
    println!();

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

    if let Some(estimate) = &record.estimate {
        println!();
        println!("Estimate: {estimate}");
    }
    if record.open_design_questions > 0 {
        println!("Open design questions: {}", record.open_design_questions);
    }
    if !record.approvals.is_empty() {
        let summary: Vec<String> = record
            .approvals
            .iter()
            .map(|a| format!("{} ({})", a.approver, a.status))
            .collect();
        println!("Approvals: {}", summary.join(", "));
    }
    if !record.risks.is_empty() {
        let open = record.risks.iter().filter(|r| !r.is_mitigated()).count();
        println!("Risks: {} ({} unmitigated)", record.risks.len(), open);
    }
    if !record.dependencies.is_empty() {
        let open = record
            .dependencies
            .iter()
            .filter(|d| d.blocking && !d.resolved)
            .count();
        println!(
            "Dependencies: {} ({} blocking unresolved)",
            record.dependencies.len(),
            open
        );
    }
    if let Some(decision) = record.decisions.last() {
        println!(
            "Last decision: {} by {} at {}",
            decision.verdict,
            decision.decided_by,
            decision.decided_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// transition
// ---------------------------------------------------------------------------

fn transition(root: &Path, slug: &str, phase: &str, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;
    let to = Phase::from_str(phase)?;
    let from = record.current_phase;
    store
        .record_phase_transition(&mut record, from, to, BTreeMap::new())
        .context("transition rejected")?;

    if json {
        print_json(&record)?;
    } else {
        println!("'{}' moved from {} to {}.", record.slug, from, to);
    }
    Ok(())
}

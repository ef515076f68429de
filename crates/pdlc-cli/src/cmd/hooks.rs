use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use pdlc_core::hooks::HookRunner;
use pdlc_core::store::FeatureStore;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum HooksSubcommand {
    /// Run validation hooks against a feature
    Run {
        slug: String,

        /// Rerun every hook, ignoring cached results
        #[arg(long)]
        force: bool,
    },
}

pub fn run(root: &Path, subcmd: HooksSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        HooksSubcommand::Run { slug, force } => run_hooks(root, &slug, force, json),
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn run_hooks(root: &Path, slug: &str, force: bool, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let record = store.load(slug)?;
    let config = store.config()?;
    let mut ledger = store.load_hook_ledger(slug)?;

    let report = HookRunner::default().run(&record, &config, &mut ledger, force);
    store
        .save_hook_ledger(slug, &ledger)
        .context("failed to save hook ledger")?;

    if json {
        print_json(&report)?;
    } else {
        let rows = report
            .results
            .iter()
            .map(|r| {
                vec![
                    r.name.clone(),
                    r.severity.to_string(),
                    if r.passed { "pass" } else { "fail" }.to_string(),
                    if r.cached { "yes" } else { "no" }.to_string(),
                    r.message.clone(),
                ]
            })
            .collect();
        print_table(&["HOOK", "SEVERITY", "RESULT", "CACHED", "MESSAGE"], rows);
        println!();
        println!("{}/{} hooks passed.", report.passed_count, report.total_count);
    }

    if report.has_critical_failures {
        anyhow::bail!("critical validation failures on '{slug}'");
    }
    Ok(())
}

use crate::output::{print_json, print_table};
use anyhow::Context;
use pdlc_core::blocker::detect_blockers;
use pdlc_core::hooks::HookRunner;
use pdlc_core::store::FeatureStore;
use std::path::Path;

pub fn run(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let record = store.load(slug)?;
    let config = store.config()?;
    let mut ledger = store.load_hook_ledger(slug)?;

    let hooks = HookRunner::default().run(&record, &config, &mut ledger, false);
    store
        .save_hook_ledger(slug, &ledger)
        .context("failed to save hook ledger")?;

    let report = detect_blockers(&record, &hooks, &config);

    if json {
        print_json(&report)?;
        return Ok(());
    }

    if report.is_empty() {
        println!("No blockers on '{slug}'.");
        return Ok(());
    }

    let rows = report
        .blockers
        .iter()
        .map(|b| vec![b.severity.to_string(), b.description.clone()])
        .collect();
    print_table(&["SEVERITY", "DESCRIPTION"], rows);
    println!();
    println!(
        "{} critical, {} high, {} medium, {} low",
        report.critical_count, report.high_count, report.medium_count, report.low_count
    );
    Ok(())
}

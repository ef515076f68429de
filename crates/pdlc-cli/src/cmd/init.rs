use crate::output::print_json;
use anyhow::Context;
use pdlc_core::store::FeatureStore;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::init(root).context("failed to initialize project")?;

    if json {
        let value = serde_json::json!({
            "root": store.root().display().to_string(),
            "initialized": true,
        });
        print_json(&value)?;
    } else {
        println!("Initialized pdlc project at {}", store.root().display());
        println!("Config written to .pdlc/config.yaml (existing config kept).");
    }
    Ok(())
}

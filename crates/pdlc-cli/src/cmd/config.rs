use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use pdlc_core::config::EngineConfig;
use pdlc_core::track::TrackWeights;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the resolved engine configuration
    Show,

    /// Set the track weights used for progress scoring (must sum to 100)
    SetWeights {
        #[arg(long)]
        context: u32,
        #[arg(long)]
        design: u32,
        #[arg(long = "business-case")]
        business_case: u32,
        #[arg(long)]
        engineering: u32,
    },

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::SetWeights {
            context,
            design,
            business_case,
            engineering,
        } => set_weights(root, context, design, business_case, engineering),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = EngineConfig::load(root).context("failed to load config")?;

    if json {
        print_json(&config)?;
        return Ok(());
    }

    println!("Project:          {}", config.project.name);
    if let Some(description) = &config.project.description {
        println!("Description:      {description}");
    }
    println!("Config version:   {}", config.version);
    println!(
        "Track weights:    context {} / design {} / business_case {} / engineering {}",
        config.weights.context,
        config.weights.design,
        config.weights.business_case,
        config.weights.engineering
    );
    if config.stale_after_days == 0 {
        println!("Staleness window: disabled");
    } else {
        println!("Staleness window: {} days", config.stale_after_days);
    }
    println!("Gates configured: {}", config.gates.gates.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// set-weights
// ---------------------------------------------------------------------------

fn set_weights(
    root: &Path,
    context: u32,
    design: u32,
    business_case: u32,
    engineering: u32,
) -> anyhow::Result<()> {
    let mut config = EngineConfig::load(root).context("failed to load config")?;
    let weights = TrackWeights {
        context,
        design,
        business_case,
        engineering,
    };
    weights.validate()?;
    config.weights = weights;
    config.save(root).context("failed to save config")?;
    println!("Track weights updated.");
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    use pdlc_core::config::WarnLevel;

    let config = EngineConfig::load(root).context("failed to load config")?;
    let warnings = config.validate().context("config validation failed")?;

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}

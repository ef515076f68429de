mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    approval::ApprovalSubcommand, artifact::ArtifactSubcommand, config::ConfigSubcommand,
    decide::DecideSubcommand, dep::DepSubcommand, feature::FeatureSubcommand,
    gate::GateSubcommand, hooks::HooksSubcommand, risk::RiskSubcommand,
    signal::SignalSubcommand, track::TrackSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pdlc",
    about = "Feature lifecycle engine — phases, delivery tracks, gates, and go/no-go decisions",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .pdlc/ or .git/)
    #[arg(long, global = true, env = "PDLC_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize pdlc in the current project
    Init,

    /// Manage feature records
    Feature {
        #[command(subcommand)]
        subcommand: FeatureSubcommand,
    },

    /// Drive the delivery tracks of a feature
    Track {
        #[command(subcommand)]
        subcommand: TrackSubcommand,
    },

    /// Link and inspect external artifacts
    Artifact {
        #[command(subcommand)]
        subcommand: ArtifactSubcommand,
    },

    /// Record delivery signals (estimate, open design questions)
    Signal {
        #[command(subcommand)]
        subcommand: SignalSubcommand,
    },

    /// Track risks on a feature
    Risk {
        #[command(subcommand)]
        subcommand: RiskSubcommand,
    },

    /// Track dependencies on a feature
    Dep {
        #[command(subcommand)]
        subcommand: DepSubcommand,
    },

    /// Manage stakeholder approvals
    Approval {
        #[command(subcommand)]
        subcommand: ApprovalSubcommand,
    },

    /// Evaluate phase gates
    Gate {
        #[command(subcommand)]
        subcommand: GateSubcommand,
    },

    /// Run validation hooks
    Hooks {
        #[command(subcommand)]
        subcommand: HooksSubcommand,
    },

    /// List everything standing in a feature's way
    Blockers { slug: String },

    /// Go/no-go recommendation and decision recording
    Decide {
        #[command(subcommand)]
        subcommand: DecideSubcommand,
    },

    /// Inspect, tune, and validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root_path = cli.root.as_deref();
    let root = root::resolve_root(root_path);

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Feature { subcommand } => cmd::feature::run(&root, subcommand, cli.json),
        Commands::Track { subcommand } => cmd::track::run(&root, subcommand, cli.json),
        Commands::Artifact { subcommand } => cmd::artifact::run(&root, subcommand, cli.json),
        Commands::Signal { subcommand } => cmd::signal::run(&root, subcommand, cli.json),
        Commands::Risk { subcommand } => cmd::risk::run(&root, subcommand, cli.json),
        Commands::Dep { subcommand } => cmd::dep::run(&root, subcommand, cli.json),
        Commands::Approval { subcommand } => cmd::approval::run(&root, subcommand, cli.json),
        Commands::Gate { subcommand } => cmd::gate::run(&root, subcommand, cli.json),
        Commands::Hooks { subcommand } => cmd::hooks::run(&root, subcommand, cli.json),
        Commands::Blockers { slug } => cmd::blockers::run(&root, &slug, cli.json),
        Commands::Decide { subcommand } => cmd::decide::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

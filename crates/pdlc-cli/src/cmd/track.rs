use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use pdlc_core::store::FeatureStore;
use pdlc_core::types::{TrackName, TrackStatus};
use std::path::Path;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum TrackSubcommand {
    /// Start work on a track
    Start { slug: String, track: String },

    /// Mark a track complete
    Complete { slug: String, track: String },

    /// Block a track
    Block {
        slug: String,
        track: String,

        /// Why the track is blocked
        #[arg(long)]
        reason: Option<String>,
    },

    /// Unblock a track (returns it to in_progress)
    Unblock { slug: String, track: String },

    /// Park a track waiting on external input
    AwaitInput { slug: String, track: String },

    /// Park a track waiting on an approval
    AwaitApproval { slug: String, track: String },

    /// Resume a waiting track
    Resume { slug: String, track: String },

    /// Record a new iteration of the track's work
    Bump { slug: String, track: String },

    /// Accept the business case
    Accept { slug: String },

    /// Reject the business case (a complete track goes back to rework)
    Reject { slug: String },
}

pub fn run(root: &Path, subcmd: TrackSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TrackSubcommand::Start { slug, track } => {
            set_status(root, &slug, &track, TrackStatus::InProgress, json)
        }
        TrackSubcommand::Complete { slug, track } => {
            set_status(root, &slug, &track, TrackStatus::Complete, json)
        }
        TrackSubcommand::Block { slug, track, reason } => {
            block(root, &slug, &track, reason.as_deref(), json)
        }
        TrackSubcommand::Unblock { slug, track } => {
            set_status(root, &slug, &track, TrackStatus::InProgress, json)
        }
        TrackSubcommand::AwaitInput { slug, track } => {
            set_status(root, &slug, &track, TrackStatus::PendingInput, json)
        }
        TrackSubcommand::AwaitApproval { slug, track } => {
            set_status(root, &slug, &track, TrackStatus::PendingApproval, json)
        }
        TrackSubcommand::Resume { slug, track } => {
            set_status(root, &slug, &track, TrackStatus::InProgress, json)
        }
        TrackSubcommand::Bump { slug, track } => bump(root, &slug, &track, json),
        TrackSubcommand::Accept { slug } => accept(root, &slug, json),
        TrackSubcommand::Reject { slug } => reject(root, &slug, json),
    }
}

// ---------------------------------------------------------------------------
// Status changes
// ---------------------------------------------------------------------------

fn set_status(
    root: &Path,
    slug: &str,
    track: &str,
    to: TrackStatus,
    json: bool,
) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;
    let track = TrackName::from_str(track)?;

    record.set_track_status(track, to)?;
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record)?;
    } else {
        println!("Track {track} on '{slug}' is now {to}.");
    }
    Ok(())
}

fn block(
    root: &Path,
    slug: &str,
    track: &str,
    reason: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;
    let track = TrackName::from_str(track)?;

    record.set_track_status(track, TrackStatus::Blocked)?;
    if let Some(reason) = reason {
        record.set_track_note(track, "blocked_reason", reason)?;
    }
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record)?;
    } else {
        match reason {
            Some(reason) => println!("Track {track} on '{slug}' blocked: {reason}"),
            None => println!("Track {track} on '{slug}' blocked."),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// bump
// ---------------------------------------------------------------------------

fn bump(root: &Path, slug: &str, track: &str, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;
    let track = TrackName::from_str(track)?;

    let version = record.bump_track_version(track)?;
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record)?;
    } else {
        println!("Track {track} on '{slug}' now at version {version}.");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Business case review
// ---------------------------------------------------------------------------

fn accept(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;

    record.accept_business_case()?;
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record)?;
    } else {
        println!("Business case for '{slug}' accepted.");
    }
    Ok(())
}

fn reject(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;

    record.reject_business_case()?;
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record)?;
    } else {
        let status = record.track_status(TrackName::BusinessCase);
        println!("Business case for '{slug}' rejected; track is {status}.");
    }
    Ok(())
}

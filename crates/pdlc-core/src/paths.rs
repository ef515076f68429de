use crate::error::{PdlcError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PDLC_DIR: &str = ".pdlc";
pub const FEATURES_DIR: &str = ".pdlc/features";

pub const CONFIG_FILE: &str = ".pdlc/config.yaml";
pub const MANIFEST_FILE: &str = "manifest.yaml";
pub const HOOK_LEDGER_FILE: &str = "hooks.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn pdlc_dir(root: &Path) -> PathBuf {
    root.join(PDLC_DIR)
}

pub fn features_dir(root: &Path) -> PathBuf {
    root.join(FEATURES_DIR)
}

pub fn feature_dir(root: &Path, slug: &str) -> PathBuf {
    root.join(FEATURES_DIR).join(slug)
}

pub fn feature_manifest(root: &Path, slug: &str) -> PathBuf {
    feature_dir(root, slug).join(MANIFEST_FILE)
}

pub fn hook_ledger_path(root: &Path, slug: &str) -> PathBuf {
    feature_dir(root, slug).join(HOOK_LEDGER_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// Slug validation
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 || !slug_re().is_match(slug) {
        return Err(PdlcError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::path::{Path, PathBuf};

/// Resolve the pdlc root directory.
///
/// Priority:
/// 1. `--root` flag / `PDLC_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.pdlc/`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    ascend(&cwd, ".pdlc")
        .or_else(|| ascend(&cwd, ".git"))
        .unwrap_or(cwd)
}

/// Nearest ancestor of `start` (inclusive) containing `marker` as a directory.
fn ascend(start: &Path, marker: &str) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        if dir.join(marker).is_dir() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

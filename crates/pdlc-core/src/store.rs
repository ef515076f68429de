use crate::config::EngineConfig;
use crate::error::{PdlcError, Result};
use crate::hooks::HookLedger;
use crate::io::{atomic_write, ensure_dir, write_if_missing};
use crate::paths::{self, validate_slug};
use crate::record::FeatureRecord;
use crate::types::{DecisionVerdict, Phase, Priority};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Filesystem-backed store. One directory per feature under
/// `.pdlc/features/`, each holding the manifest and the hook ledger.
pub struct FeatureStore {
    root: PathBuf,
}

impl FeatureStore {
    /// Create the `.pdlc` layout. Safe to call on an existing project; an
    /// existing config is left alone.
    pub fn init(root: &Path) -> Result<Self> {
        ensure_dir(&paths::features_dir(root))?;
        let project = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        let config = EngineConfig::new(project);
        write_if_missing(
            &paths::config_path(root),
            serde_yaml::to_string(&config)?.as_bytes(),
        )?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn open(root: &Path) -> Result<Self> {
        if !paths::config_path(root).exists() {
            return Err(PdlcError::NotInitialized);
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> Result<EngineConfig> {
        EngineConfig::load(&self.root)
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    pub fn create(
        &self,
        slug: &str,
        title: &str,
        product: &str,
        priority: Priority,
    ) -> Result<FeatureRecord> {
        validate_slug(slug)?;
        let dir = paths::feature_dir(&self.root, slug);
        if dir.exists() {
            return Err(PdlcError::FeatureExists(slug.to_string()));
        }
        let record = FeatureRecord::new(slug, title, product, priority);
        ensure_dir(&dir)?;
        atomic_write(
            &paths::feature_manifest(&self.root, slug),
            serde_yaml::to_string(&record)?.as_bytes(),
        )?;
        Ok(record)
    }

    /// Load and structurally validate a manifest. A record that fails
    /// validation is never handed to callers.
    pub fn load(&self, slug: &str) -> Result<FeatureRecord> {
        let path = paths::feature_manifest(&self.root, slug);
        if !path.exists() {
            return Err(PdlcError::FeatureNotFound(slug.to_string()));
        }
        let raw = std::fs::read_to_string(&path)?;
        let record: FeatureRecord = serde_yaml::from_str(&raw)?;
        record.validate()?;
        Ok(record)
    }

    /// Persist a record. The in-memory revision must match the manifest on
    /// disk; on success the revision is bumped and written back.
    pub fn save(&self, record: &mut FeatureRecord) -> Result<()> {
        let disk = self.load(&record.slug)?;
        if disk.revision != record.revision {
            return Err(PdlcError::ConcurrentModification {
                slug: record.slug.clone(),
                expected: record.revision,
                found: disk.revision,
            });
        }
        record.revision += 1;
        record.updated_at = Utc::now();
        atomic_write(
            &paths::feature_manifest(&self.root, record.slug.as_str()),
            serde_yaml::to_string(record)?.as_bytes(),
        )?;
        Ok(())
    }

    /// All records, oldest first.
    pub fn list(&self) -> Result<Vec<FeatureRecord>> {
        let dir = paths::features_dir(&self.root);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(slug) = name.to_str() else {
                continue;
            };
            match self.load(slug) {
                Ok(record) => records.push(record),
                // A bare directory without a manifest is not a feature.
                Err(PdlcError::FeatureNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.slug.cmp(&b.slug))
        });
        Ok(records)
    }

    // -----------------------------------------------------------------------
    // Phase transitions
    // -----------------------------------------------------------------------

    /// Advance a record along a legal phase edge and persist it. Exits from
    /// DECISION_GATE additionally require a decision recorded during the
    /// current gate visit, pointing the same direction.
    pub fn record_phase_transition(
        &self,
        record: &mut FeatureRecord,
        from: Phase,
        to: Phase,
        metadata: BTreeMap<String, String>,
    ) -> Result<()> {
        if record.current_phase != from {
            return Err(PdlcError::IllegalTransition {
                from: from.to_string(),
                to: to.to_string(),
                reason: format!("record is in phase {}", record.current_phase),
            });
        }
        let forward = from.next() == Some(to);
        let rework = from == Phase::DecisionGate && to == Phase::ParallelTracks;
        if !forward && !rework {
            return Err(PdlcError::IllegalTransition {
                from: from.to_string(),
                to: to.to_string(),
                reason: "no such phase edge".to_string(),
            });
        }

        if from == Phase::DecisionGate {
            let entered_at = record
                .phase_history
                .open_entry()
                .map(|e| e.entered_at)
                .ok_or_else(|| PdlcError::InvalidState("phase history has no open entry".into()))?;
            let decision = record
                .decisions
                .last_for_phase(Phase::DecisionGate)
                .ok_or_else(|| PdlcError::IllegalTransition {
                    from: from.to_string(),
                    to: to.to_string(),
                    reason: "requires a recorded decision for the current gate visit".to_string(),
                })?;
            if decision.decided_at < entered_at {
                return Err(PdlcError::IllegalTransition {
                    from: from.to_string(),
                    to: to.to_string(),
                    reason: "latest decision predates the current gate visit".to_string(),
                });
            }
            let expected = match decision.verdict {
                DecisionVerdict::Approve => Phase::OutputGeneration,
                DecisionVerdict::Reject => Phase::ParallelTracks,
            };
            if to != expected {
                return Err(PdlcError::IllegalTransition {
                    from: from.to_string(),
                    to: to.to_string(),
                    reason: format!("latest decision is {}", decision.verdict),
                });
            }
        }

        record
            .phase_history
            .record_entry(Some(from), to, Utc::now(), metadata);
        record.current_phase = to;
        self.save(record)
    }

    /// Append a decision and persist. The record must currently sit in the
    /// phase the decision is recorded against.
    pub fn record_decision(
        &self,
        record: &mut FeatureRecord,
        phase: Phase,
        verdict: DecisionVerdict,
        rationale: &str,
        decided_by: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<u64> {
        if record.current_phase != phase {
            return Err(PdlcError::InvalidState(format!(
                "cannot record a {phase} decision while in {}",
                record.current_phase
            )));
        }
        let seq = record
            .decisions
            .append(phase, verdict, rationale, decided_by, Utc::now(), metadata);
        self.save(record)?;
        Ok(seq)
    }

    // -----------------------------------------------------------------------
    // Hook ledger
    // -----------------------------------------------------------------------

    pub fn load_hook_ledger(&self, slug: &str) -> Result<HookLedger> {
        if !paths::feature_dir(&self.root, slug).exists() {
            return Err(PdlcError::FeatureNotFound(slug.to_string()));
        }
        let path = paths::hook_ledger_path(&self.root, slug);
        if !path.exists() {
            return Ok(HookLedger::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    pub fn save_hook_ledger(&self, slug: &str, ledger: &HookLedger) -> Result<()> {
        if !paths::feature_dir(&self.root, slug).exists() {
            return Err(PdlcError::FeatureNotFound(slug.to_string()));
        }
        atomic_write(
            &paths::hook_ledger_path(&self.root, slug),
            serde_yaml::to_string(ledger)?.as_bytes(),
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store() -> (TempDir, FeatureStore) {
        let dir = TempDir::new().unwrap();
        let store = FeatureStore::init(dir.path()).unwrap();
        (dir, store)
    }

    fn walk_to_decision_gate(store: &FeatureStore, slug: &str) -> FeatureRecord {
        let mut rec = store.create(slug, "Title", "product", Priority::P2).unwrap();
        for (from, to) in [
            (Phase::Initialization, Phase::SignalAnalysis),
            (Phase::SignalAnalysis, Phase::ContextDoc),
            (Phase::ContextDoc, Phase::ParallelTracks),
            (Phase::ParallelTracks, Phase::DecisionGate),
        ] {
            store
                .record_phase_transition(&mut rec, from, to, BTreeMap::new())
                .unwrap();
        }
        rec
    }

    #[test]
    fn init_creates_layout() {
        let (dir, _store) = store();
        assert!(dir.path().join(".pdlc/config.yaml").is_file());
        assert!(dir.path().join(".pdlc/features").is_dir());
        assert!(FeatureStore::open(dir.path()).is_ok());
    }

    #[test]
    fn init_preserves_existing_config() {
        let (dir, store) = store();
        let mut config = store.config().unwrap();
        config.stale_after_days = 60;
        config.save(dir.path()).unwrap();

        FeatureStore::init(dir.path()).unwrap();
        assert_eq!(store.config().unwrap().stale_after_days, 60);
    }

    #[test]
    fn open_requires_init() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            FeatureStore::open(dir.path()),
            Err(PdlcError::NotInitialized)
        ));
    }

    #[test]
    fn create_and_load_roundtrip() {
        let (_dir, store) = store();
        store
            .create("checkout-v2", "Checkout v2", "storefront", Priority::P1)
            .unwrap();

        let loaded = store.load("checkout-v2").unwrap();
        assert_eq!(loaded.title, "Checkout v2");
        assert_eq!(loaded.revision, 0);
        assert_eq!(loaded.current_phase, Phase::Initialization);
    }

    #[test]
    fn create_rejects_bad_slug_and_duplicates() {
        let (_dir, store) = store();
        assert!(matches!(
            store.create("Checkout!", "t", "p", Priority::P2),
            Err(PdlcError::InvalidSlug(_))
        ));

        store.create("checkout", "t", "p", Priority::P2).unwrap();
        assert!(matches!(
            store.create("checkout", "t", "p", Priority::P2),
            Err(PdlcError::FeatureExists(_))
        ));
    }

    #[test]
    fn load_missing_feature_fails() {
        let (_dir, store) = store();
        assert!(matches!(
            store.load("ghost"),
            Err(PdlcError::FeatureNotFound(_))
        ));
    }

    #[test]
    fn save_bumps_revision() {
        let (_dir, store) = store();
        store.create("checkout", "t", "p", Priority::P2).unwrap();

        let mut rec = store.load("checkout").unwrap();
        rec.set_estimate("6 weeks");
        store.save(&mut rec).unwrap();
        assert_eq!(rec.revision, 1);

        let loaded = store.load("checkout").unwrap();
        assert_eq!(loaded.revision, 1);
        assert_eq!(loaded.estimate.as_deref(), Some("6 weeks"));
    }

    #[test]
    fn concurrent_save_detected() {
        let (_dir, store) = store();
        store.create("checkout", "t", "p", Priority::P2).unwrap();

        let mut first = store.load("checkout").unwrap();
        let mut second = store.load("checkout").unwrap();

        first.set_estimate("6 weeks");
        store.save(&mut first).unwrap();

        second.set_estimate("8 weeks");
        let err = store.save(&mut second).unwrap_err();
        assert!(matches!(
            err,
            PdlcError::ConcurrentModification {
                expected: 0,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn forward_transitions_walk_the_pipeline() {
        let (_dir, store) = store();
        let rec = walk_to_decision_gate(&store, "checkout");
        assert_eq!(rec.current_phase, Phase::DecisionGate);
        assert_eq!(rec.phase_history.len(), 5);
        rec.validate().unwrap();
    }

    #[test]
    fn phase_skip_rejected() {
        let (_dir, store) = store();
        let mut rec = store.create("checkout", "t", "p", Priority::P2).unwrap();
        let err = store
            .record_phase_transition(
                &mut rec,
                Phase::Initialization,
                Phase::ContextDoc,
                BTreeMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, PdlcError::IllegalTransition { .. }));
    }

    #[test]
    fn transition_from_wrong_phase_rejected() {
        let (_dir, store) = store();
        let mut rec = store.create("checkout", "t", "p", Priority::P2).unwrap();
        let err = store
            .record_phase_transition(
                &mut rec,
                Phase::SignalAnalysis,
                Phase::ContextDoc,
                BTreeMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, PdlcError::IllegalTransition { .. }));
    }

    #[test]
    fn decision_gate_exit_requires_decision() {
        let (_dir, store) = store();
        let mut rec = walk_to_decision_gate(&store, "checkout");
        let err = store
            .record_phase_transition(
                &mut rec,
                Phase::DecisionGate,
                Phase::OutputGeneration,
                BTreeMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, PdlcError::IllegalTransition { .. }));
    }

    #[test]
    fn approval_exits_forward() {
        let (_dir, store) = store();
        let mut rec = walk_to_decision_gate(&store, "checkout");
        store
            .record_decision(
                &mut rec,
                Phase::DecisionGate,
                DecisionVerdict::Approve,
                "all clear",
                "pm",
                BTreeMap::new(),
            )
            .unwrap();

        store
            .record_phase_transition(
                &mut rec,
                Phase::DecisionGate,
                Phase::OutputGeneration,
                BTreeMap::new(),
            )
            .unwrap();
        assert_eq!(rec.current_phase, Phase::OutputGeneration);
    }

    #[test]
    fn rejection_exits_backward_only() {
        let (_dir, store) = store();
        let mut rec = walk_to_decision_gate(&store, "checkout");
        store
            .record_decision(
                &mut rec,
                Phase::DecisionGate,
                DecisionVerdict::Reject,
                "engineering blocked",
                "pm",
                BTreeMap::new(),
            )
            .unwrap();

        let err = store
            .record_phase_transition(
                &mut rec,
                Phase::DecisionGate,
                Phase::OutputGeneration,
                BTreeMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, PdlcError::IllegalTransition { .. }));

        store
            .record_phase_transition(
                &mut rec,
                Phase::DecisionGate,
                Phase::ParallelTracks,
                BTreeMap::new(),
            )
            .unwrap();
        assert_eq!(rec.current_phase, Phase::ParallelTracks);
    }

    #[test]
    fn stale_decision_does_not_reopen_gate() {
        let (_dir, store) = store();
        let mut rec = walk_to_decision_gate(&store, "checkout");
        store
            .record_decision(
                &mut rec,
                Phase::DecisionGate,
                DecisionVerdict::Reject,
                "rework",
                "pm",
                BTreeMap::new(),
            )
            .unwrap();
        store
            .record_phase_transition(
                &mut rec,
                Phase::DecisionGate,
                Phase::ParallelTracks,
                BTreeMap::new(),
            )
            .unwrap();

        sleep(Duration::from_millis(5));
        store
            .record_phase_transition(
                &mut rec,
                Phase::ParallelTracks,
                Phase::DecisionGate,
                BTreeMap::new(),
            )
            .unwrap();

        // The rejection from the previous visit must not drive this exit.
        let err = store
            .record_phase_transition(
                &mut rec,
                Phase::DecisionGate,
                Phase::ParallelTracks,
                BTreeMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, PdlcError::IllegalTransition { .. }));
    }

    #[test]
    fn decision_requires_matching_phase() {
        let (_dir, store) = store();
        let mut rec = store.create("checkout", "t", "p", Priority::P2).unwrap();
        let err = store
            .record_decision(
                &mut rec,
                Phase::DecisionGate,
                DecisionVerdict::Approve,
                "premature",
                "pm",
                BTreeMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, PdlcError::InvalidState(_)));
    }

    #[test]
    fn list_sorted_by_creation() {
        let (_dir, store) = store();
        store.create("gamma", "g", "p", Priority::P2).unwrap();
        sleep(Duration::from_millis(5));
        store.create("alpha", "a", "p", Priority::P2).unwrap();
        sleep(Duration::from_millis(5));
        store.create("beta", "b", "p", Priority::P2).unwrap();

        let slugs: Vec<String> = store.list().unwrap().into_iter().map(|r| r.slug).collect();
        assert_eq!(slugs, vec!["gamma", "alpha", "beta"]);
    }

    #[test]
    fn hook_ledger_roundtrip() {
        let (_dir, store) = store();
        store.create("checkout", "t", "p", Priority::P2).unwrap();

        let ledger = store.load_hook_ledger("checkout").unwrap();
        assert!(ledger.entries.is_empty());

        let mut ledger = ledger;
        ledger.entries.insert(
            "phase_history_intact".to_string(),
            crate::hooks::LedgerEntry {
                fingerprint: "abc".to_string(),
                passed: true,
                message: "ok".to_string(),
                last_run: Utc::now(),
            },
        );
        store.save_hook_ledger("checkout", &ledger).unwrap();

        let loaded = store.load_hook_ledger("checkout").unwrap();
        assert_eq!(loaded.entries.len(), 1);

        assert!(matches!(
            store.load_hook_ledger("ghost"),
            Err(PdlcError::FeatureNotFound(_))
        ));
    }
}

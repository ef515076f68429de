use crate::config::EngineConfig;
use crate::record::FeatureRecord;
use crate::types::{validate_artifact_url, HookSeverity, TrackName, TrackStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Hook machinery
// ---------------------------------------------------------------------------

pub struct HookOutcome {
    pub passed: bool,
    pub message: String,
}

impl HookOutcome {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

/// One validation hook. `fingerprint` renders exactly the record fields the
/// check reads; a hook only reruns when that rendering changes.
pub struct Hook {
    pub name: &'static str,
    pub severity: HookSeverity,
    pub check: fn(&FeatureRecord, &EngineConfig) -> HookOutcome,
    pub fingerprint: fn(&FeatureRecord, &EngineConfig) -> String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookResult {
    pub name: String,
    pub severity: HookSeverity,
    pub passed: bool,
    pub message: String,
    /// True when the result was served from the ledger without rerunning.
    #[serde(default)]
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub results: Vec<HookResult>,
    pub passed_count: usize,
    pub total_count: usize,
    pub has_critical_failures: bool,
}

impl ValidationReport {
    fn from_results(results: Vec<HookResult>) -> Self {
        let passed_count = results.iter().filter(|r| r.passed).count();
        let total_count = results.len();
        let has_critical_failures = results
            .iter()
            .any(|r| !r.passed && r.severity == HookSeverity::Critical);
        Self {
            results,
            passed_count,
            total_count,
            has_critical_failures,
        }
    }

    pub fn critical_failures(&self) -> Vec<&HookResult> {
        self.results
            .iter()
            .filter(|r| !r.passed && r.severity == HookSeverity::Critical)
            .collect()
    }

    pub fn failures(&self) -> Vec<&HookResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub fingerprint: String,
    pub passed: bool,
    pub message: String,
    pub last_run: chrono::DateTime<Utc>,
}

/// Per-feature hook cache, stored next to the manifest as `hooks.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookLedger {
    #[serde(default)]
    pub entries: BTreeMap<String, LedgerEntry>,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct HookRunner {
    hooks: Vec<Hook>,
}

impl Default for HookRunner {
    fn default() -> Self {
        Self {
            hooks: default_hooks(),
        }
    }
}

impl HookRunner {
    pub fn run(
        &self,
        record: &FeatureRecord,
        config: &EngineConfig,
        ledger: &mut HookLedger,
        force: bool,
    ) -> ValidationReport {
        let mut results = Vec::with_capacity(self.hooks.len());
        for hook in &self.hooks {
            let input = (hook.fingerprint)(record, config);
            let fingerprint = blake3::hash(input.as_bytes()).to_hex().to_string();

            let cached = if force {
                None
            } else {
                ledger
                    .entries
                    .get(hook.name)
                    .filter(|e| e.fingerprint == fingerprint)
            };

            let result = match cached {
                Some(entry) => HookResult {
                    name: hook.name.to_string(),
                    severity: hook.severity,
                    passed: entry.passed,
                    message: entry.message.clone(),
                    cached: true,
                },
                None => {
                    let outcome = (hook.check)(record, config);
                    ledger.entries.insert(
                        hook.name.to_string(),
                        LedgerEntry {
                            fingerprint,
                            passed: outcome.passed,
                            message: outcome.message.clone(),
                            last_run: Utc::now(),
                        },
                    );
                    HookResult {
                        name: hook.name.to_string(),
                        severity: hook.severity,
                        passed: outcome.passed,
                        message: outcome.message,
                        cached: false,
                    }
                }
            };
            results.push(result);
        }
        ValidationReport::from_results(results)
    }
}

// ---------------------------------------------------------------------------
// Default hooks
// ---------------------------------------------------------------------------

fn check_track_set(record: &FeatureRecord, _config: &EngineConfig) -> HookOutcome {
    for &name in TrackName::all() {
        match record.tracks.get(&name) {
            None => return HookOutcome::fail(format!("missing {name} track")),
            Some(track) if track.name != name => {
                return HookOutcome::fail(format!(
                    "track keyed {name} names itself {}",
                    track.name
                ));
            }
            Some(_) => {}
        }
    }
    HookOutcome::pass("all four tracks present")
}

fn fp_track_set(record: &FeatureRecord, _config: &EngineConfig) -> String {
    record
        .tracks
        .iter()
        .map(|(key, state)| format!("{key}:{};", state.name))
        .collect()
}

fn check_phase_history(record: &FeatureRecord, _config: &EngineConfig) -> HookOutcome {
    let entries = record.phase_history.entries();
    if entries.is_empty() {
        return HookOutcome::fail("phase history is empty");
    }
    let mut open = 0usize;
    for (i, entry) in entries.iter().enumerate() {
        if entry.seq != i as u64 {
            return HookOutcome::fail(format!("seq {} at index {i}", entry.seq));
        }
        let expected_from = if i == 0 {
            None
        } else {
            Some(entries[i - 1].to_phase)
        };
        if entry.from_phase != expected_from {
            return HookOutcome::fail(format!("linkage broken at seq {}", entry.seq));
        }
        if entry.completed_at.is_none() {
            open += 1;
            if i != entries.len() - 1 {
                return HookOutcome::fail(format!("entry {} open but not last", entry.seq));
            }
        }
    }
    if open != 1 {
        return HookOutcome::fail(format!("{open} open entries, expected 1"));
    }
    if let Some(last) = entries.last() {
        if last.to_phase != record.current_phase {
            return HookOutcome::fail(format!(
                "current phase {} disagrees with history ({})",
                record.current_phase, last.to_phase
            ));
        }
    }
    HookOutcome::pass(format!("phase history consistent ({} entries)", entries.len()))
}

fn fp_phase_history(record: &FeatureRecord, _config: &EngineConfig) -> String {
    let mut input = format!("current:{};", record.current_phase);
    for entry in record.phase_history.entries() {
        let from = entry
            .from_phase
            .map(|p| p.as_str())
            .unwrap_or("-");
        let state = if entry.completed_at.is_some() { "c" } else { "o" };
        input.push_str(&format!("{}:{from}>{}:{state};", entry.seq, entry.to_phase));
    }
    input
}

fn check_decision_log(record: &FeatureRecord, _config: &EngineConfig) -> HookOutcome {
    let entries = record.decisions.entries();
    let mut prev = None;
    for (i, decision) in entries.iter().enumerate() {
        if decision.seq != i as u64 {
            return HookOutcome::fail(format!("decision seq {} at index {i}", decision.seq));
        }
        if let Some(prev) = prev {
            if decision.decided_at < prev {
                return HookOutcome::fail(format!(
                    "decision {} decided before its predecessor",
                    decision.seq
                ));
            }
        }
        prev = Some(decision.decided_at);
    }
    HookOutcome::pass(format!("decision log consistent ({} entries)", entries.len()))
}

fn fp_decision_log(record: &FeatureRecord, _config: &EngineConfig) -> String {
    record
        .decisions
        .entries()
        .iter()
        .map(|d| {
            format!(
                "{}:{}:{}:{};",
                d.seq,
                d.phase,
                d.verdict,
                d.decided_at.timestamp()
            )
        })
        .collect()
}

fn check_artifact_links(record: &FeatureRecord, _config: &EngineConfig) -> HookOutcome {
    let mut linked = 0usize;
    for (artifact, url) in &record.artifacts {
        if let Some(url) = url {
            if validate_artifact_url(*artifact, url).is_err() {
                return HookOutcome::fail(format!("malformed url for {artifact}: {url}"));
            }
            linked += 1;
        }
    }
    HookOutcome::pass(format!("{linked} linked artifacts well formed"))
}

fn fp_artifact_links(record: &FeatureRecord, _config: &EngineConfig) -> String {
    record
        .artifacts
        .iter()
        .map(|(artifact, url)| format!("{artifact}={};", url.as_deref().unwrap_or("-")))
        .collect()
}

fn check_approvals_unique(record: &FeatureRecord, _config: &EngineConfig) -> HookOutcome {
    let mut seen = BTreeSet::new();
    for approval in &record.approvals {
        if !seen.insert(approval.approver.as_str()) {
            return HookOutcome::fail(format!("duplicate approver: {}", approval.approver));
        }
    }
    HookOutcome::pass("no duplicate approvers")
}

fn fp_approvals(record: &FeatureRecord, _config: &EngineConfig) -> String {
    record
        .approvals
        .iter()
        .map(|a| format!("{}:{};", a.approver, a.status))
        .collect()
}

fn check_track_versions(record: &FeatureRecord, _config: &EngineConfig) -> HookOutcome {
    for track in record.tracks.values() {
        if track.status == TrackStatus::NotStarted && track.version > 0 {
            return HookOutcome::fail(format!(
                "{} track has version {} but has not started",
                track.name, track.version
            ));
        }
    }
    HookOutcome::pass("track versions consistent")
}

fn fp_track_versions(record: &FeatureRecord, _config: &EngineConfig) -> String {
    record
        .tracks
        .values()
        .map(|t| format!("{}:{}:{};", t.name, t.status, t.version))
        .collect()
}

fn check_timestamps(record: &FeatureRecord, _config: &EngineConfig) -> HookOutcome {
    if record.updated_at < record.created_at {
        return HookOutcome::fail("updated_at precedes created_at");
    }
    let mut prev_entered = None;
    for entry in record.phase_history.entries() {
        if let Some(prev) = prev_entered {
            if entry.entered_at < prev {
                return HookOutcome::fail(format!(
                    "entry {} entered before its predecessor",
                    entry.seq
                ));
            }
        }
        if let Some(completed) = entry.completed_at {
            if completed < entry.entered_at {
                return HookOutcome::fail(format!(
                    "entry {} completed before it was entered",
                    entry.seq
                ));
            }
        }
        prev_entered = Some(entry.entered_at);
    }
    HookOutcome::pass("timestamps ordered")
}

fn fp_timestamps(record: &FeatureRecord, _config: &EngineConfig) -> String {
    let mut input = format!(
        "{}:{};",
        record.created_at.timestamp(),
        record.updated_at.timestamp()
    );
    for entry in record.phase_history.entries() {
        let completed = entry
            .completed_at
            .map(|t| t.timestamp().to_string())
            .unwrap_or_else(|| "-".to_string());
        input.push_str(&format!("{}:{completed};", entry.entered_at.timestamp()));
    }
    input
}

fn check_freshness(record: &FeatureRecord, config: &EngineConfig) -> HookOutcome {
    if config.stale_after_days == 0 {
        return HookOutcome::pass("staleness checks disabled");
    }
    let age_days = (Utc::now() - record.updated_at).num_days();
    if age_days > i64::from(config.stale_after_days) {
        HookOutcome::fail(format!(
            "no activity for {age_days} days (threshold {})",
            config.stale_after_days
        ))
    } else {
        HookOutcome::pass(format!("updated {age_days} days ago"))
    }
}

fn fp_freshness(record: &FeatureRecord, config: &EngineConfig) -> String {
    // The current date is part of the input so a cached verdict expires
    // daily rather than sticking forever.
    format!(
        "{}:{}:{}",
        record.updated_at.timestamp(),
        config.stale_after_days,
        Utc::now().date_naive()
    )
}

pub fn default_hooks() -> Vec<Hook> {
    vec![
        Hook {
            name: "track_set_complete",
            severity: HookSeverity::Critical,
            check: check_track_set,
            fingerprint: fp_track_set,
        },
        Hook {
            name: "phase_history_intact",
            severity: HookSeverity::Critical,
            check: check_phase_history,
            fingerprint: fp_phase_history,
        },
        Hook {
            name: "decision_log_intact",
            severity: HookSeverity::Critical,
            check: check_decision_log,
            fingerprint: fp_decision_log,
        },
        Hook {
            name: "artifact_links_well_formed",
            severity: HookSeverity::High,
            check: check_artifact_links,
            fingerprint: fp_artifact_links,
        },
        Hook {
            name: "approvals_unique",
            severity: HookSeverity::High,
            check: check_approvals_unique,
            fingerprint: fp_approvals,
        },
        Hook {
            name: "track_versions_sane",
            severity: HookSeverity::Medium,
            check: check_track_versions,
            fingerprint: fp_track_versions,
        },
        Hook {
            name: "timestamps_ordered",
            severity: HookSeverity::Medium,
            check: check_timestamps,
            fingerprint: fp_timestamps,
        },
        Hook {
            name: "record_fresh",
            severity: HookSeverity::Warn,
            check: check_freshness,
            fingerprint: fp_freshness,
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Approval;
    use crate::types::{ApprovalStatus, Priority};
    use chrono::Duration;

    fn record() -> FeatureRecord {
        FeatureRecord::new("checkout-v2", "Checkout v2", "storefront", Priority::P1)
    }

    fn config() -> EngineConfig {
        EngineConfig::new("storefront")
    }

    #[test]
    fn fresh_record_passes_all_hooks() {
        let rec = record();
        let mut ledger = HookLedger::default();
        let report = HookRunner::default().run(&rec, &config(), &mut ledger, false);

        assert_eq!(report.total_count, 8);
        assert_eq!(report.passed_count, report.total_count);
        assert!(!report.has_critical_failures);
        assert!(report.results.iter().all(|r| !r.cached));
    }

    #[test]
    fn missing_track_is_critical() {
        let mut rec = record();
        rec.tracks.remove(&TrackName::Design);

        let mut ledger = HookLedger::default();
        let report = HookRunner::default().run(&rec, &config(), &mut ledger, false);

        assert!(report.has_critical_failures);
        assert!(report
            .critical_failures()
            .iter()
            .any(|r| r.name == "track_set_complete"));
    }

    #[test]
    fn second_run_served_from_ledger() {
        let rec = record();
        let cfg = config();
        let runner = HookRunner::default();
        let mut ledger = HookLedger::default();

        runner.run(&rec, &cfg, &mut ledger, false);
        let second = runner.run(&rec, &cfg, &mut ledger, false);
        assert!(second.results.iter().all(|r| r.cached));
    }

    #[test]
    fn force_bypasses_ledger() {
        let rec = record();
        let cfg = config();
        let runner = HookRunner::default();
        let mut ledger = HookLedger::default();

        runner.run(&rec, &cfg, &mut ledger, false);
        let forced = runner.run(&rec, &cfg, &mut ledger, true);
        assert!(forced.results.iter().all(|r| !r.cached));
    }

    #[test]
    fn mutation_invalidates_only_touched_hooks() {
        let mut rec = record();
        let cfg = config();
        let runner = HookRunner::default();
        let mut ledger = HookLedger::default();

        runner.run(&rec, &cfg, &mut ledger, false);
        rec.upsert_approval("dana", ApprovalStatus::Pending);
        let report = runner.run(&rec, &cfg, &mut ledger, false);

        let approvals = report
            .results
            .iter()
            .find(|r| r.name == "approvals_unique")
            .unwrap();
        assert!(!approvals.cached);
        let tracks = report
            .results
            .iter()
            .find(|r| r.name == "track_set_complete")
            .unwrap();
        assert!(tracks.cached);
    }

    #[test]
    fn duplicate_approvers_flagged_high() {
        let mut rec = record();
        // upsert_approval cannot produce duplicates; a hand-edited manifest can.
        rec.approvals.push(Approval {
            approver: "dana".to_string(),
            status: ApprovalStatus::Pending,
        });
        rec.approvals.push(Approval {
            approver: "dana".to_string(),
            status: ApprovalStatus::Approved,
        });

        let mut ledger = HookLedger::default();
        let report = HookRunner::default().run(&rec, &config(), &mut ledger, false);
        let result = report
            .results
            .iter()
            .find(|r| r.name == "approvals_unique")
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.severity, HookSeverity::High);
        assert!(!report.has_critical_failures);
    }

    #[test]
    fn stale_record_fails_freshness() {
        let mut rec = record();
        rec.created_at = Utc::now() - Duration::days(40);
        rec.updated_at = Utc::now() - Duration::days(30);

        let mut ledger = HookLedger::default();
        let report = HookRunner::default().run(&rec, &config(), &mut ledger, false);
        let result = report
            .results
            .iter()
            .find(|r| r.name == "record_fresh")
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.severity, HookSeverity::Warn);
    }

    #[test]
    fn freshness_disabled_at_zero() {
        let mut rec = record();
        rec.created_at = Utc::now() - Duration::days(400);
        rec.updated_at = Utc::now() - Duration::days(365);
        let mut cfg = config();
        cfg.stale_after_days = 0;

        let mut ledger = HookLedger::default();
        let report = HookRunner::default().run(&rec, &cfg, &mut ledger, false);
        let result = report
            .results
            .iter()
            .find(|r| r.name == "record_fresh")
            .unwrap();
        assert!(result.passed);
    }

    #[test]
    fn ledger_roundtrip() {
        let rec = record();
        let mut ledger = HookLedger::default();
        HookRunner::default().run(&rec, &config(), &mut ledger, false);

        let yaml = serde_yaml::to_string(&ledger).unwrap();
        let parsed: HookLedger = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.entries.len(), ledger.entries.len());
        assert!(parsed.entries.contains_key("phase_history_intact"));
    }
}

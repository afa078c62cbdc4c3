//! Pipeline file analysis and rewriting.
//!
//! A pipeline is scanned for bundle references, each one is resolved
//! against the ledger, and the resulting changes are applied to exactly
//! the lines they were found on.

pub mod diff;

use std::collections::BTreeMap;

use crate::bundle::find_bundle_refs;
use crate::ledger::Ledger;
use crate::resolve::{resolve, ResolveRequest, TaskUpdate};
use crate::version::is_newer_version;

/// A resolved update tied to the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedUpdate {
    /// 1-based line number of the reference.
    pub line: usize,
    /// Resolver output for that reference.
    pub update: TaskUpdate,
}

/// Outcome of analysing one pipeline file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisResult {
    /// Changes that will be written.
    pub updates: Vec<LocatedUpdate>,
    /// References left alone for which a newer version exists.
    pub available_upgrades: Vec<LocatedUpdate>,
}

impl AnalysisResult {
    /// Returns `true` when nothing needs writing or reporting.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.updates.is_empty() && self.available_upgrades.is_empty()
    }
}

/// Resolves every bundle reference in `content`.
///
/// `label` is used for `file:line` locations. References whose version is
/// unknown to the ledger are never rewritten; when a newer trusted version
/// exists they are reported as available upgrades instead.
#[must_use]
pub fn analyze(label: &str, content: &str, ledger: &Ledger, upgrade_versions: bool) -> AnalysisResult {
    let mut result = AnalysisResult::default();

    for found in find_bundle_refs(content) {
        let reference = &found.reference;
        let mut update = resolve(&ResolveRequest::new(reference).upgrade(upgrade_versions), ledger);
        update.location = Some(format!("{label}:{}", found.line));

        if let Some(warning) = update.warning.take() {
            tracing::warn!(location = ?update.location, "{warning}");
            if is_newer_version(&update.current_version, &update.target_version) {
                let kept = TaskUpdate {
                    newer_version_available: Some(update.target_version.clone()),
                    newer_version_digest: Some(update.target_digest.clone()),
                    target_version: update.current_version.clone(),
                    target_digest: update.current_digest.clone(),
                    warning: Some(warning),
                    ..update
                };
                result.available_upgrades.push(LocatedUpdate { line: found.line, update: kept });
            }
            continue;
        }

        if update.needs_update() {
            result.updates.push(LocatedUpdate { line: found.line, update });
        } else if update.has_newer_version() {
            result.available_upgrades.push(LocatedUpdate { line: found.line, update });
        }
    }

    result
}

/// Rewrites `content`, replacing each update's current reference with its
/// target on the update's own line only.
///
/// Every other line, including its line ending, is left byte-identical.
#[must_use]
pub fn apply_updates(content: &str, updates: &[LocatedUpdate]) -> String {
    let by_line: BTreeMap<usize, Vec<&TaskUpdate>> =
        updates.iter().fold(BTreeMap::new(), |mut acc, located| {
            acc.entry(located.line).or_default().push(&located.update);
            acc
        });

    content
        .split_inclusive('\n')
        .enumerate()
        .map(|(idx, line)| match by_line.get(&(idx + 1)) {
            Some(changes) => changes.iter().fold(line.to_string(), |text, update| {
                text.replacen(&update.current_ref(), &update.target_ref(), 1)
            }),
            None => line.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TrustedRecord;

    const OLD: &str = "quay.io/ns/task-foo:0.1@sha256:bbb";
    const NEW: &str = "quay.io/ns/task-foo:0.1@sha256:aaa";

    fn ledger(entries: &[(&str, &str)]) -> Ledger {
        Ledger::new(
            entries
                .iter()
                .map(|(k, d)| ((*k).to_string(), vec![TrustedRecord::current(*d)]))
                .collect(),
            "test",
        )
    }

    fn pipeline(refs: &[&str]) -> String {
        let mut out = String::from("spec:\n  tasks:\n");
        for r in refs {
            out.push_str("    - taskRef:\n        params:\n          - name: bundle\n");
            out.push_str(&format!("            value: {r}\n"));
        }
        out
    }

    #[test]
    fn digest_update_is_planned() {
        let l = ledger(&[("oci://quay.io/ns/task-foo:0.1", "sha256:aaa")]);
        let result = analyze("p.yaml", &pipeline(&[OLD]), &l, false);
        assert_eq!(result.updates.len(), 1);
        assert_eq!(result.updates[0].line, 6);
        assert_eq!(result.updates[0].update.location.as_deref(), Some("p.yaml:6"));
        assert!(result.available_upgrades.is_empty());
    }

    #[test]
    fn up_to_date_with_newer_version_is_reported_not_applied() {
        let l = ledger(&[
            ("oci://quay.io/ns/task-foo:0.1", "sha256:aaa"),
            ("oci://quay.io/ns/task-foo:0.2", "sha256:ccc"),
        ]);
        let result = analyze("p.yaml", &pipeline(&[NEW]), &l, false);
        assert!(result.updates.is_empty());
        assert_eq!(result.available_upgrades.len(), 1);
        assert_eq!(result.available_upgrades[0].update.newer_version_available.as_deref(), Some("0.2"));

        let upgraded = analyze("p.yaml", &pipeline(&[NEW]), &l, true);
        assert_eq!(upgraded.updates.len(), 1);
        assert!(upgraded.updates[0].update.is_version_bump());
    }

    #[test]
    fn unknown_version_is_left_alone() {
        let l = ledger(&[("oci://quay.io/ns/task-foo:0.1", "sha256:aaa")]);
        let result = analyze("p.yaml", &pipeline(&["quay.io/ns/task-foo:0.9@sha256:bbb"]), &l, false);
        assert!(result.is_clean());

        let older = analyze("p.yaml", &pipeline(&["quay.io/ns/task-foo:0.0@sha256:bbb"]), &l, false);
        assert!(older.updates.is_empty());
        let upgrade = &older.available_upgrades[0].update;
        assert_eq!(upgrade.target_version, "0.0");
        assert_eq!(upgrade.newer_version_available.as_deref(), Some("0.1"));
        assert!(upgrade.warning.is_some());
    }

    #[test]
    fn rewrite_touches_only_the_matched_line() {
        let l = ledger(&[("oci://quay.io/ns/task-foo:0.1", "sha256:aaa")]);
        let mut content = pipeline(&[OLD]);
        content.push_str(&format!("# keep a note of {OLD}\r\nfinally: []"));
        let result = analyze("p.yaml", &content, &l, false);
        let updated = apply_updates(&content, &result.updates);

        let before: Vec<&str> = content.split_inclusive('\n').collect();
        let after: Vec<&str> = updated.split_inclusive('\n').collect();
        assert_eq!(before.len(), after.len());
        for (idx, (b, a)) in before.iter().zip(&after).enumerate() {
            if idx + 1 == 6 {
                assert_eq!(*a, format!("            value: {NEW}\n"));
            } else {
                assert_eq!(b, a);
            }
        }
        assert!(updated.ends_with("finally: []"));
    }

    #[test]
    fn repeated_reference_on_two_lines_updates_both() {
        let l = ledger(&[("oci://quay.io/ns/task-foo:0.1", "sha256:aaa")]);
        let content = pipeline(&[OLD, OLD]);
        let result = analyze("p.yaml", &content, &l, false);
        assert_eq!(result.updates.len(), 2);
        let updated = apply_updates(&content, &result.updates);
        assert!(!updated.contains(OLD));
        assert_eq!(updated.matches(NEW).count(), 2);
    }
}

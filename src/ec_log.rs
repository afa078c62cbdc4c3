//! Enterprise Contract log parsing.
//!
//! An EC verification log carries a JSON report after a line reading
//! `STEP-REPORT-JSON`. Long lines are wrapped by the log collector, so the
//! report is reassembled line by line until it parses.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const REPORT_MARKER: &str = "STEP-REPORT-JSON";
/// Placeholder for fields an untrusted-task violation does not provide.
pub const UNKNOWN: &str = "unknown";

static UNSUPPORTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"use the '([^']+)' task \(version ([^)]+)\)").expect("unsupported pattern is valid")
});

static UNTRUSTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"Untrusted version of PipelineTask "([^"]+)".*Please upgrade the task version to: (sha256:[a-f0-9]+)"#,
    )
    .expect("untrusted pattern is valid")
});

static OUTDATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"A newer version of task "([^"]+)" exists\. "#,
        r"Please update before ([^.]+)\. ",
        r#"The current bundle is "([^"]+)" and the latest bundle ref is "([^"]+)""#,
    ))
    .expect("outdated pattern is valid")
});

static BUNDLE_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"task-([^:]+):([^@]+)@(sha256:[a-f0-9]+)").expect("bundle pattern is valid")
});

/// One task the EC report says needs attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFinding {
    /// Display name used in the EC message.
    pub friendly_name: String,
    /// Short task name, without the `task-` prefix.
    pub task_name: String,
    /// Version in use, or `unknown`.
    pub current_version: String,
    /// Digest in use, or `unknown`.
    pub current_digest: String,
    /// Digest EC reports as the latest (or requires, for untrusted tasks).
    pub latest_digest: String,
    /// Date after which the current bundle stops being trusted.
    pub expiry_date: String,
    /// Bundle reference from the log.
    pub current_bundle: String,
    /// Version suggested by a `tasks.unsupported` violation.
    pub recommended_version: Option<String>,
    /// Digest demanded by a `trusted_task.trusted` violation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_digest: Option<String>,
    /// The task currently fails the trust check.
    pub is_untrusted: bool,
}

#[derive(Debug, Default, Deserialize)]
struct Report {
    #[serde(default)]
    components: Option<Vec<Component>>,
}

#[derive(Debug, Default, Deserialize)]
struct Component {
    #[serde(default)]
    violations: Option<Vec<PolicyResult>>,
    #[serde(default)]
    warnings: Option<Vec<PolicyResult>>,
}

#[derive(Debug, Default, Deserialize)]
struct PolicyResult {
    #[serde(default)]
    msg: String,
    #[serde(default)]
    metadata: Option<Metadata>,
}

impl PolicyResult {
    fn code(&self) -> &str {
        self.metadata.as_ref().map_or("", |m| m.code.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    code: String,
}

/// Extracts task findings from an EC log.
///
/// A missing marker or a report that never parses yields an empty list and
/// a warning.
#[must_use]
pub fn parse_ec_log(content: &str) -> Vec<TaskFinding> {
    let Some(report) = extract_report(content) else {
        return Vec::new();
    };
    let components = report.components.unwrap_or_default();

    let mut recommendations: BTreeMap<String, String> = BTreeMap::new();
    let mut untrusted: Vec<(String, String)> = Vec::new();
    for violation in components.iter().flat_map(|c| c.violations.iter().flatten()) {
        match violation.code() {
            "tasks.unsupported" => {
                if let Some(caps) = UNSUPPORTED.captures(&violation.msg) {
                    tracing::debug!("Found unsupported task recommendation: {} -> {}", &caps[1], &caps[2]);
                    recommendations.insert(caps[1].to_string(), caps[2].to_string());
                }
            }
            "trusted_task.trusted" => {
                if let Some(caps) = UNTRUSTED.captures(&violation.msg) {
                    tracing::info!("Found untrusted task: {} -> {}", &caps[1], &caps[2]);
                    let entry = (caps[1].to_string(), caps[2].to_string());
                    if let Some(existing) = untrusted.iter_mut().find(|(name, _)| *name == entry.0) {
                        *existing = entry;
                    } else {
                        untrusted.push(entry);
                    }
                }
            }
            _ => {}
        }
    }

    let mut findings: Vec<TaskFinding> = Vec::new();
    for warning in components.iter().flat_map(|c| c.warnings.iter().flatten()) {
        if warning.code() != "trusted_task.current" {
            continue;
        }
        let Some(caps) = OUTDATED.captures(&warning.msg) else {
            continue;
        };
        let current_bundle = &caps[3];
        if findings.iter().any(|f| f.current_bundle == current_bundle) {
            continue;
        }
        let Some(bundle) = BUNDLE_TAIL.captures(current_bundle) else {
            continue;
        };
        let task_name = bundle[1].to_string();
        let required_digest =
            untrusted.iter().find(|(name, _)| *name == task_name).map(|(_, d)| d.clone());
        tracing::debug!("Found outdated task: {} -> {}", &caps[1], &caps[4]);
        findings.push(TaskFinding {
            friendly_name: caps[1].to_string(),
            recommended_version: recommendations.get(&task_name).cloned(),
            is_untrusted: required_digest.is_some(),
            required_digest,
            task_name,
            current_version: bundle[2].to_string(),
            current_digest: bundle[3].to_string(),
            latest_digest: caps[4].to_string(),
            expiry_date: caps[2].to_string(),
            current_bundle: current_bundle.to_string(),
        });
    }

    for (task_name, digest) in untrusted {
        if findings.iter().any(|f| f.task_name == task_name) {
            continue;
        }
        tracing::info!("Added untrusted task: {task_name}");
        findings.push(TaskFinding {
            friendly_name: task_name.clone(),
            current_version: UNKNOWN.to_string(),
            current_digest: UNKNOWN.to_string(),
            latest_digest: digest.clone(),
            expiry_date: "now".to_string(),
            current_bundle: format!("untrusted:{task_name}"),
            recommended_version: None,
            required_digest: Some(digest),
            is_untrusted: true,
            task_name,
        });
    }

    tracing::info!("Found {} tasks needing updates in log", findings.len());
    findings
}

fn extract_report(content: &str) -> Option<Report> {
    let mut lines = content.lines();
    if !lines.by_ref().any(|line| line.trim() == REPORT_MARKER) {
        tracing::warn!("Could not find {REPORT_MARKER} section in log file");
        return None;
    }

    let mut buffer = String::new();
    let mut parts = 0;
    for line in lines.map(str::trim).filter(|l| !l.is_empty()) {
        buffer.push_str(line);
        parts += 1;
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&buffer) {
            tracing::debug!("Parsed JSON from {parts} lines");
            return match serde_json::from_value(value) {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::warn!("Report JSON has an unexpected shape: {e}");
                    None
                }
            };
        }
    }
    tracing::warn!("Could not parse complete JSON from log file");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST_OLD: &str = "sha256:1111111111111111111111111111111111111111111111111111111111111111";
    const DIGEST_NEW: &str = "sha256:2222222222222222222222222222222222222222222222222222222222222222";

    fn log_with(report: &str) -> String {
        format!("step-validate\nsome noise\n{REPORT_MARKER}\n{report}\ntrailing output\n")
    }

    fn outdated_warning(task: &str, version: &str) -> String {
        format!(
            r#"{{"msg":"A newer version of task \"{task}\" exists. Please update before 2026-11-01T00:00:00Z. The current bundle is \"oci://quay.io/konflux-ci/tekton-catalog/task-{task}:{version}@{DIGEST_OLD}\" and the latest bundle ref is \"{DIGEST_NEW}\"","metadata":{{"code":"trusted_task.current"}}}}"#
        )
    }

    #[test]
    fn outdated_warning_becomes_finding() {
        let report = format!(r#"{{"components":[{{"warnings":[{}]}}]}}"#, outdated_warning("init", "0.2"));
        let findings = parse_ec_log(&log_with(&report));
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.task_name, "init");
        assert_eq!(f.current_version, "0.2");
        assert_eq!(f.current_digest, DIGEST_OLD);
        assert_eq!(f.latest_digest, DIGEST_NEW);
        assert_eq!(f.expiry_date, "2026-11-01T00:00:00Z");
        assert!(!f.is_untrusted);
        assert_eq!(f.recommended_version, None);
    }

    #[test]
    fn duplicate_bundles_are_reported_once() {
        let w = outdated_warning("init", "0.2");
        let report = format!(r#"{{"components":[{{"warnings":[{w}]}},{{"warnings":[{w}]}}]}}"#);
        assert_eq!(parse_ec_log(&log_with(&report)).len(), 1);
    }

    #[test]
    fn unsupported_violation_attaches_recommendation() {
        let report = format!(
            r#"{{"components":[{{"violations":[{{"msg":"Task buildah is unsupported. Please use the 'buildah' task (version 0.4)","metadata":{{"code":"tasks.unsupported"}}}}],"warnings":[{}]}}]}}"#,
            outdated_warning("buildah", "0.1")
        );
        let findings = parse_ec_log(&log_with(&report));
        assert_eq!(findings[0].recommended_version.as_deref(), Some("0.4"));
    }

    #[test]
    fn untrusted_only_task_has_unknown_current() {
        let report = format!(
            r#"{{"components":[{{"violations":[{{"msg":"Untrusted version of PipelineTask \"git-clone\" (Task \"git-clone\") was included in the pipeline. Please upgrade the task version to: {DIGEST_NEW}","metadata":{{"code":"trusted_task.trusted"}}}}]}}]}}"#
        );
        let findings = parse_ec_log(&log_with(&report));
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert!(f.is_untrusted);
        assert_eq!(f.current_version, UNKNOWN);
        assert_eq!(f.current_digest, UNKNOWN);
        assert_eq!(f.required_digest.as_deref(), Some(DIGEST_NEW));
        assert_eq!(f.current_bundle, "untrusted:git-clone");
    }

    #[test]
    fn untrusted_task_with_warning_is_merged() {
        let report = format!(
            r#"{{"components":[{{"violations":[{{"msg":"Untrusted version of PipelineTask \"init\" (Task \"init\"). Please upgrade the task version to: {DIGEST_NEW}","metadata":{{"code":"trusted_task.trusted"}}}}],"warnings":[{}]}}]}}"#,
            outdated_warning("init", "0.2")
        );
        let findings = parse_ec_log(&log_with(&report));
        assert_eq!(findings.len(), 1);
        assert!(findings[0].is_untrusted);
        assert_eq!(findings[0].current_version, "0.2");
    }

    #[test]
    fn report_split_across_lines_is_reassembled() {
        let report = format!(r#"{{"components":[{{"warnings":[{}]}}]}}"#, outdated_warning("init", "0.2"));
        let (head, tail) = report.split_at(40);
        let log = format!("{REPORT_MARKER}\n{head}\n\n{tail}\n");
        assert_eq!(parse_ec_log(&log).len(), 1);
    }

    #[test]
    fn missing_marker_or_broken_json_yields_nothing() {
        assert!(parse_ec_log("no report here\n").is_empty());
        assert!(parse_ec_log(&format!("{REPORT_MARKER}\n{{\"components\": [\n")).is_empty());
    }

    #[test]
    fn null_sections_are_tolerated() {
        let log = log_with(r#"{"components":[{"violations":null,"warnings":null}]}"#);
        assert!(parse_ec_log(&log).is_empty());
    }
}

//! Unified diff rendering for in-place reference rewrites.
//!
//! Rewrites never add or remove lines, so the two texts are compared line
//! by line and changed lines are grouped into hunks with surrounding
//! context.

use std::fmt::Write;

const CONTEXT: usize = 3;

/// ANSI colour for added lines.
const GREEN: &str = "\x1b[32m";
/// ANSI colour for removed lines.
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Renders a unified diff between two line-aligned texts.
///
/// Returns an empty string when the texts are identical. When `color` is
/// set, removed and added lines are wrapped in ANSI colours.
#[must_use]
pub fn unified_diff(original: &str, updated: &str, name: &str, color: bool) -> String {
    let before: Vec<&str> = original.split_inclusive('\n').collect();
    let after: Vec<&str> = updated.split_inclusive('\n').collect();
    let len = before.len().max(after.len());

    let changed: Vec<usize> =
        (0..len).filter(|&i| before.get(i) != after.get(i)).collect();
    if changed.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let _ = writeln!(out, "--- a/{name}");
    let _ = writeln!(out, "+++ b/{name}");

    for (start, end) in hunks(&changed, len) {
        let old_count = before.len().min(end).saturating_sub(start);
        let new_count = after.len().min(end).saturating_sub(start);
        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            range(start, old_count),
            range(start, new_count)
        );
        for i in start..end {
            match (before.get(i), after.get(i)) {
                (Some(b), Some(a)) if b == a => push_line(&mut out, " ", b, None),
                (b, a) => {
                    if let Some(b) = b {
                        push_line(&mut out, "-", b, color.then_some(RED));
                    }
                    if let Some(a) = a {
                        push_line(&mut out, "+", a, color.then_some(GREEN));
                    }
                }
            }
        }
    }

    out
}

/// Groups changed line indices into `[start, end)` windows with context,
/// merging windows that touch.
fn hunks(changed: &[usize], len: usize) -> Vec<(usize, usize)> {
    let mut windows: Vec<(usize, usize)> = Vec::new();
    for &i in changed {
        let start = i.saturating_sub(CONTEXT);
        let end = (i + CONTEXT + 1).min(len);
        match windows.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => windows.push((start, end)),
        }
    }
    windows
}

fn range(start: usize, count: usize) -> String {
    if count == 1 {
        format!("{}", start + 1)
    } else {
        format!("{},{count}", if count == 0 { start } else { start + 1 })
    }
}

fn push_line(out: &mut String, prefix: &str, line: &str, color: Option<&str>) {
    let body = line.strip_suffix('\n').unwrap_or(line);
    match color {
        Some(code) => {
            let _ = writeln!(out, "{code}{prefix}{body}{RESET}");
        }
        None => {
            let _ = writeln!(out, "{prefix}{body}");
        }
    }
    if !line.ends_with('\n') {
        out.push_str("\\ No newline at end of file\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_have_no_diff() {
        assert!(unified_diff("a\nb\n", "a\nb\n", "p.yaml", false).is_empty());
    }

    #[test]
    fn single_change_with_context() {
        let original = "1\n2\n3\n4\n5\n6\n7\n8\n9\n";
        let updated = "1\n2\n3\n4\nfive\n6\n7\n8\n9\n";
        let diff = unified_diff(original, updated, "p.yaml", false);
        assert_eq!(
            diff,
            "--- a/p.yaml\n+++ b/p.yaml\n@@ -2,7 +2,7 @@\n 2\n 3\n 4\n-5\n+five\n 6\n 7\n 8\n"
        );
    }

    #[test]
    fn distant_changes_form_separate_hunks() {
        let original: String = (1..=20).map(|i| format!("{i}\n")).collect();
        let updated = original.replace("2\n", "two\n").replacen("19\n", "nineteen\n", 1);
        let diff = unified_diff(&original, &updated, "p.yaml", false);
        assert_eq!(diff.matches("@@ -").count(), 2);
    }

    #[test]
    fn colour_wraps_changed_lines() {
        let diff = unified_diff("a\n", "b\n", "p.yaml", true);
        assert!(diff.contains("\x1b[31m-a\x1b[0m"));
        assert!(diff.contains("\x1b[32m+b\x1b[0m"));
    }

    #[test]
    fn missing_final_newline_is_marked() {
        let diff = unified_diff("a\nb", "a\nc", "p.yaml", false);
        assert!(diff.contains("-b\n\\ No newline at end of file\n+c\n\\ No newline"));
    }
}

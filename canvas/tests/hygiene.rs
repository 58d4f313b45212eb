//! Source hygiene for the rendering core.
//!
//! Scans `canvas/src` (test files excluded) for patterns that panic, swallow
//! errors or bypass `tracing`. Every pattern carries a budget; a budget may
//! only shrink.

use std::fs;
use std::path::{Path, PathBuf};

struct Rule {
    pattern: &'static str,
    budget: usize,
    why: &'static str,
}

const RULES: &[Rule] = &[
    Rule { pattern: ".unwrap()", budget: 0, why: "panics on None/Err" },
    Rule { pattern: ".expect(", budget: 0, why: "panics on None/Err" },
    Rule { pattern: "panic!(", budget: 0, why: "aborts the render worker" },
    Rule { pattern: "unreachable!(", budget: 0, why: "aborts the render worker" },
    Rule { pattern: "todo!(", budget: 0, why: "unfinished code" },
    Rule { pattern: "unimplemented!(", budget: 0, why: "unfinished code" },
    Rule { pattern: "let _ =", budget: 0, why: "discards a result unseen" },
    Rule { pattern: ".ok()", budget: 0, why: "discards an error unseen" },
    Rule { pattern: "#[allow(dead_code)]", budget: 0, why: "hides unused code" },
    Rule { pattern: "println!(", budget: 0, why: "stdout belongs to the protocol; use tracing" },
    Rule { pattern: "eprintln!(", budget: 0, why: "use tracing" },
];

fn production_sources(dir: &Path, out: &mut Vec<(PathBuf, String)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|e| e.path()) {
        if path.is_dir() {
            production_sources(&path, out);
            continue;
        }
        let is_rs = path.extension().is_some_and(|e| e == "rs");
        let is_test = path.to_string_lossy().ends_with("_test.rs");
        if is_rs && !is_test {
            if let Ok(content) = fs::read_to_string(&path) {
                out.push((path, content));
            }
        }
    }
}

#[test]
fn sources_are_found() {
    let mut files = Vec::new();
    production_sources(Path::new("src"), &mut files);
    assert!(files.iter().any(|(p, _)| p.ends_with("engine.rs")), "scan found no engine.rs");
}

#[test]
fn pattern_budgets_hold() {
    let mut files = Vec::new();
    production_sources(Path::new("src"), &mut files);

    let mut failures = Vec::new();
    for rule in RULES {
        let hits: Vec<String> = files
            .iter()
            .flat_map(|(path, content)| {
                content
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| line.contains(rule.pattern))
                    .map(move |(n, _)| format!("    {}:{}", path.display(), n + 1))
            })
            .collect();
        if hits.len() > rule.budget {
            failures.push(format!(
                "`{}` ({}): found {}, budget {}\n{}",
                rule.pattern,
                rule.why,
                hits.len(),
                rule.budget,
                hits.join("\n")
            ));
        }
    }
    assert!(failures.is_empty(), "hygiene budgets exceeded:\n{}", failures.join("\n"));
}

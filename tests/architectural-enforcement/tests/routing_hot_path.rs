//! Integration Test: Routing Hot Path Purity
//!
//! Routing runs on every dispatch, from many threads at once. It may only
//! read resident configuration and in-memory options.
//!
//! **Policy**: Production code under `splitq/core/src/routing` and the
//! topology module MUST NOT perform I/O, spawn processes, or sleep.
//! **Exceptions**: Test code (`#[cfg(test)]` modules). Configuration loading
//! lives in `splitq/core/src/config` and is not scanned.

use std::fs;
use std::path::Path;

use architectural_enforcement::workspace_root;

/// A forbidden pattern and why it is forbidden
struct Rule {
    pattern: &'static str,
    category: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        pattern: "std::fs",
        category: "File I/O",
    },
    Rule {
        pattern: "std::net",
        category: "Network I/O",
    },
    Rule {
        pattern: "std::process",
        category: "Process spawn",
    },
    Rule {
        pattern: "std::io::stdin",
        category: "Console I/O",
    },
    Rule {
        pattern: "std::io::stdout",
        category: "Console I/O",
    },
    Rule {
        pattern: "println!",
        category: "Console I/O",
    },
    Rule {
        pattern: "sleep(",
        category: "Sleep",
    },
    Rule {
        pattern: "park_timeout",
        category: "Sleep",
    },
];

/// Test that routing code stays free of I/O and sleeps
#[test]
fn test_no_io_or_sleep_in_routing() {
    let violations = find_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: I/O or sleep found on the routing hot path!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n✅ ALLOWED on the hot path:");
        eprintln!("  - Reading the catalog and legacy registry");
        eprintln!("  - Reading the option store");
        eprintln!("  - Atomic cursor updates");
        eprintln!("\n✅ Move file access to splitq/core/src/config");

        panic!(
            "\nFound {} hot-path violation(s).\nFix these before merging!",
            violations.len()
        );
    }
}

/// The scanner must actually see the routing sources
#[test]
fn test_routing_sources_are_scanned() {
    let routing = workspace_root().join("splitq/core/src/routing");
    let files = rust_files(&routing);

    assert!(
        files.len() >= 8,
        "expected the routing modules under {}, found {}",
        routing.display(),
        files.len()
    );
}

fn find_violations() -> Vec<String> {
    let root = workspace_root();
    let mut violations = Vec::new();

    for file in rust_files(&root.join("splitq/core/src/routing")) {
        check_file(&file, &mut violations);
    }
    check_file(&root.join("splitq/core/src/topology.rs"), &mut violations);

    violations
}

fn rust_files(dir: &Path) -> Vec<std::path::PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn check_file(path: &Path, violations: &mut Vec<String>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };

    for (idx, line) in content.lines().enumerate() {
        // Everything after the test module marker is test code
        if line.trim_start().starts_with("#[cfg(test)]") {
            break;
        }

        // Skip comments
        let code_part = line.split("//").next().unwrap_or(line);

        for rule in RULES {
            if code_part.contains(rule.pattern) {
                violations.push(format!(
                    "{}:{} - {}: {}",
                    path.display(),
                    idx + 1,
                    rule.category,
                    line.trim()
                ));
            }
        }
    }
}

#[test]
fn test_scanner_flags_sleep() {
    let dir = std::env::temp_dir().join(format!("splitq-arch-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let file = dir.join("bad.rs");
    fs::write(
        &file,
        "fn route() {\n    std::thread::sleep(d); // wait\n}\n#[cfg(test)]\nmod tests { use std::fs; }\n",
    )
    .unwrap();

    let mut violations = Vec::new();
    check_file(&file, &mut violations);
    fs::remove_dir_all(&dir).unwrap();

    assert_eq!(violations.len(), 1, "{violations:?}");
    assert!(violations[0].contains(":2 - Sleep"));
}

//! Architectural Enforcement
//!
//! Source scanners backing the integration tests in `tests/`:
//! - No sleep() calls in production code
//!
//! The game controller only ever waits on channels and I/O; a sleep in a
//! production path means something is polling.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source trees, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["conductor/core/src", "conductor/daemon/src"];

/// Workspace root (two levels above this crate)
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// A forbidden call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the call
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The offending line, trimmed
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Line numbers (0-based) of sleep calls outside comments and test modules
pub fn sleep_calls(source: &str) -> Vec<usize> {
    let mut hits = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        let trimmed = line.trim();

        // Everything after a test module attribute is test code
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }

        let code = line.split("//").next().unwrap_or(line);
        if code.contains("::sleep(") || code.contains(".sleep(") || code.contains("sleep_until(")
        {
            hits.push(idx);
        }
    }
    hits
}

/// Scan every `.rs` file under `dir`
pub fn scan_directory(dir: &Path) -> Vec<Violation> {
    let mut violations = Vec::new();
    if !dir.exists() {
        return violations;
    }

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let Ok(content) = fs::read_to_string(path) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();
        for idx in sleep_calls(&content) {
            violations.push(Violation {
                path: path.to_path_buf(),
                line: idx + 1,
                text: lines[idx].trim().to_string(),
            });
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_tokio_and_thread_sleep() {
        let src = "fn poll() {\n    tokio::time::sleep(d).await;\n    std::thread::sleep(d);\n}\n";
        assert_eq!(sleep_calls(src), vec![1, 2]);
    }

    #[test]
    fn test_ignores_comments_and_test_modules() {
        let src = "\
fn ok() {
    // tokio::time::sleep(d) would be wrong here
    let sleepy = 1;
}

#[cfg(test)]
mod tests {
    fn helper() { tokio::time::sleep(d); }
}
";
        assert!(sleep_calls(src).is_empty());
    }
}

//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the core and daemon MUST NOT call sleep
//! methods. Service calls settle through channels and the daemon blocks on
//! accept/read/signal futures.
//! **Exceptions**: test code (`#[cfg(test)]` modules and `tests/` directories)

use architectural_enforcement::{scan_directory, workspace_root, PRODUCTION_DIRS};

#[test]
fn test_no_sleep_in_production_code() {
    let root = workspace_root();
    let mut violations = Vec::new();
    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        assert!(path.exists(), "missing source tree {}", path.display());
        violations.extend(scan_directory(&path));
    }

    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code:");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nWait on a channel, a Notify or the I/O itself instead.");

        panic!(
            "\nFound {} sleep violation(s) in production code.",
            violations.len()
        );
    }
}

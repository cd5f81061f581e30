use crate::harness::{Assertion, Scenario};
use codeintel_core::{CodeintelError, SymbolKind};

#[test]
fn test_missing_file_does_not_stop_scan() {
    Scenario::new("missing_file")
        .with_file("ok.py", b"def ok():\n    pass\n")
        .scans(&["gone.py", "ok.py"])
        .assert_analyzed(1)
        .assert_failures(1)
        .assert(Assertion::Failed {
            path: "gone.py".into(),
        })
        .assert_symbol("ok.py", "ok", SymbolKind::Function)
        .assert(Assertion::Custom(Box::new(|report| {
            anyhow::ensure!(
                matches!(report.failures[0].error, CodeintelError::Io(_)),
                "expected an io error, got {}",
                report.failures[0].error
            );
            Ok(())
        })))
        .run()
        .unwrap();
}

#[test]
fn test_file_removed_between_scans() {
    Scenario::new("removed_between_scans")
        .with_file("lib.rs", b"pub fn keep() {}\n")
        .scans(&["lib.rs"])
        .assert_analyzed(1)
        .removes("lib.rs")
        .scans(&["lib.rs"])
        .assert_analyzed(0)
        .assert_failures(1)
        .run()
        .unwrap();
}

#[test]
fn test_unrecognized_and_backendless_files() {
    Scenario::new("unrecognized_files")
        .with_file("notes.xyz", b"plain text")
        .with_file("Dockerfile.dev", b"FROM scratch\n")
        .with_file("build.sql", b"SELECT 1;\n")
        .scans(&["notes.xyz", "Dockerfile.dev", "build.sql"])
        .assert_failures(0)
        .assert_language("notes.xyz", "unknown")
        .assert_language("Dockerfile.dev", "dockerfile")
        .assert_language("build.sql", "sql")
        .assert(Assertion::NoSymbols {
            path: "build.sql".into(),
        })
        .run()
        .unwrap();
}

#[test]
fn test_invalid_utf8_and_broken_syntax_still_parse() {
    Scenario::new("damaged_input")
        .with_file("bin.go", b"package main\n\n// caf\xe9 \xff\nfunc Run() {}\n")
        .with_file("broken.rs", b"pub fn ok() {}\n\nfn broken( {\n")
        .scans(&["bin.go", "broken.rs"])
        .assert_failures(0)
        .assert_symbol("bin.go", "Run", SymbolKind::Function)
        .assert_symbol("broken.rs", "ok", SymbolKind::Function)
        .run()
        .unwrap();
}

#[test]
fn test_empty_file() {
    Scenario::new("empty_file")
        .with_file("empty.ts", b"")
        .scans(&["empty.ts"])
        .assert_failures(0)
        .assert(Assertion::NoSymbols {
            path: "empty.ts".into(),
        })
        .run()
        .unwrap();
}

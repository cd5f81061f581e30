use crate::harness::{Assertion, Outcome, Scenario, ScriptedParser};
use codeintel_core::{LspConfig, LspParser, ServerConfig, SymbolKind, Tier};
use std::sync::Arc;

const GO_SOURCE: &[u8] = b"package main\n\nfunc Run() {}\n";

#[test]
fn test_bundled_tiers_without_servers() {
    Scenario::new("bundled_tiers")
        .assert_tier("go", Tier::SyntaxTree)
        .assert_tier("python", Tier::SyntaxTree)
        .assert_tier("rust", Tier::SyntaxTree)
        .assert_tier("typescript", Tier::Pattern)
        .assert_tier("java", Tier::Pattern)
        .assert(Assertion::Unsupported {
            language: "cobol".into(),
        })
        .run()
        .unwrap();
}

#[test]
fn test_available_server_is_preferred() {
    let server = ScriptedParser::new("go", Tier::Lsp, Outcome::Symbol("FromServer".into())).shared();

    Scenario::new("server_preferred")
        .with_file("main.go", GO_SOURCE)
        .registers(server.clone())
        .assert_tier("go", Tier::Lsp)
        .scans(&["main.go"])
        .assert_symbol("main.go", "FromServer", SymbolKind::Function)
        .assert(Assertion::Custom(Box::new(move |_| {
            anyhow::ensure!(server.calls() == 1, "server called {} times", server.calls());
            Ok(())
        })))
        .run()
        .unwrap();
}

#[test]
fn test_failed_server_falls_back_to_syntax_tree() {
    let server = ScriptedParser::new("go", Tier::Lsp, Outcome::ServerGone).shared();

    Scenario::new("server_fallback")
        .with_file("a.go", GO_SOURCE)
        .with_file("b.go", b"package main\n\nfunc Other() {}\n")
        .registers(server.clone())
        .scans(&["a.go", "b.go"])
        .assert_failures(0)
        .assert_symbol("a.go", "Run", SymbolKind::Function)
        .assert_symbol("b.go", "Other", SymbolKind::Function)
        .assert(Assertion::Custom(Box::new(move |_| {
            anyhow::ensure!(server.calls() == 2, "server called {} times", server.calls());
            Ok(())
        })))
        .run()
        .unwrap();
}

#[test]
fn test_unavailable_server_is_skipped() {
    let server = ScriptedParser::new("go", Tier::Lsp, Outcome::Symbol("Never".into()))
        .unavailable()
        .shared();

    Scenario::new("server_unavailable")
        .with_file("main.go", GO_SOURCE)
        .registers(server.clone())
        .assert_tier("go", Tier::SyntaxTree)
        .scans(&["main.go"])
        .assert_symbol("main.go", "Run", SymbolKind::Function)
        .assert(Assertion::Custom(Box::new(move |_| {
            anyhow::ensure!(server.calls() == 0, "unavailable server was called");
            Ok(())
        })))
        .run()
        .unwrap();
}

#[test]
fn test_missing_server_binary_uses_bundled_backend() {
    let missing = LspParser::new(
        "go",
        ServerConfig::new("codeintel-test-missing-server", &[]),
        LspConfig::default(),
    );

    Scenario::new("missing_binary")
        .with_file("main.go", GO_SOURCE)
        .registers(Arc::new(missing))
        .assert_tier("go", Tier::SyntaxTree)
        .scans(&["main.go"])
        .assert_failures(0)
        .assert_symbol("main.go", "Run", SymbolKind::Function)
        .run()
        .unwrap();
}

#[test]
fn test_failing_syntax_backend_is_not_retried() {
    // Only LSP failures fall back; a pattern backend exists but is not tried.
    let broken = ScriptedParser::new("ruby", Tier::SyntaxTree, Outcome::ServerGone).shared();

    Scenario::new("no_fallback_below_lsp")
        .with_file("app.rb", b"def run\nend\n")
        .registers(broken.clone())
        .assert_tier("ruby", Tier::SyntaxTree)
        .scans(&["app.rb"])
        .assert_analyzed(0)
        .assert(Assertion::Failed {
            path: "app.rb".into(),
        })
        .run()
        .unwrap();
}

use crate::harness::{Assertion, Scenario};
use codeintel_core::{RelationshipKind, SymbolKind};

#[test]
fn test_fixture_scan_covers_every_file() {
    Scenario::new("fixture_scan_all")
        .from_fixture("polyglot")
        .scans_all()
        .assert_analyzed(7)
        .assert_failures(0)
        .assert_language("service/main.go", "go")
        .assert_language("tools/report.py", "python")
        .assert_language("core/src/lib.rs", "rust")
        .assert_language("web/app.ts", "typescript")
        .assert_language("scripts/deploy.rb", "ruby")
        .assert_language("Dockerfile", "dockerfile")
        .assert_language("README.md", "markdown")
        .assert(Assertion::NoSymbols {
            path: "Dockerfile".into(),
        })
        .assert(Assertion::NoSymbols {
            path: "README.md".into(),
        })
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_go_service() {
    Scenario::new("go_service")
        .from_fixture("polyglot")
        .scans(&["service/main.go"])
        .assert_symbol("service/main.go", "Greeter", SymbolKind::Class)
        .assert_lines("service/main.go", "Greeter", 9, 11)
        .assert_member("service/main.go", "Greeter", "Prefix")
        .assert_symbol("service/main.go", "Greet", SymbolKind::Method)
        .assert_symbol("service/main.go", "main", SymbolKind::Function)
        .assert_lines("service/main.go", "main", 18, 20)
        .assert_relationship("service/main.go", RelationshipKind::Import, "fmt")
        .assert_relationship("service/main.go", RelationshipKind::Import, "strings")
        .assert_relationship("service/main.go", RelationshipKind::Call, "fmt.Println")
        .assert_relationship("service/main.go", RelationshipKind::Call, "strings.TrimSpace")
        .assert(Assertion::Custom(Box::new(|report| {
            let go = &report.analyses[0];
            let greeter = go
                .symbols
                .iter()
                .find(|s| s.name == "Greeter")
                .ok_or_else(|| anyhow::anyhow!("Greeter missing"))?;
            anyhow::ensure!(greeter.exported, "Greeter should be exported");
            anyhow::ensure!(
                greeter.doc_comment == "Greeter builds greetings.",
                "unexpected doc: {:?}",
                greeter.doc_comment
            );
            Ok(())
        })))
        .run()
        .unwrap();
}

#[test]
fn test_python_tool() {
    Scenario::new("python_tool")
        .from_fixture("polyglot")
        .scans(&["tools/report.py"])
        .assert_symbol("tools/report.py", "Report", SymbolKind::Class)
        .assert_lines("tools/report.py", "Report", 5, 12)
        .assert_member("tools/report.py", "Report", "__init__")
        .assert_member("tools/report.py", "Report", "render")
        .assert_symbol("tools/report.py", "write_report", SymbolKind::Function)
        .assert_relationship("tools/report.py", RelationshipKind::Import, "json")
        .assert_relationship("tools/report.py", RelationshipKind::Import, "pathlib")
        .assert_relationship("tools/report.py", RelationshipKind::Call, "json.dumps")
        .assert_relationship("tools/report.py", RelationshipKind::Call, "Report")
        .run()
        .unwrap();
}

#[test]
fn test_rust_core() {
    Scenario::new("rust_core")
        .from_fixture("polyglot")
        .scans(&["core/src/lib.rs"])
        .assert_symbol("core/src/lib.rs", "Counter", SymbolKind::Class)
        .assert_lines("core/src/lib.rs", "Counter", 4, 6)
        .assert_member("core/src/lib.rs", "Counter", "value")
        .assert_member("core/src/lib.rs", "Counter", "bump")
        .assert_member("core/src/lib.rs", "Counter", "fmt")
        .assert_relationship("core/src/lib.rs", RelationshipKind::Import, "std::fmt")
        .assert_relationship("core/src/lib.rs", RelationshipKind::Implements, "fmt::Display")
        .run()
        .unwrap();
}

#[test]
fn test_pattern_tier_languages() {
    Scenario::new("pattern_tier_languages")
        .from_fixture("polyglot")
        .scans(&["web/app.ts", "scripts/deploy.rb"])
        .assert_analyzed(2)
        .assert_symbol("web/app.ts", "Props", SymbolKind::Interface)
        .assert_symbol("web/app.ts", "App", SymbolKind::Class)
        .assert_lines("web/app.ts", "App", 7, 15)
        .assert_member("web/app.ts", "App", "constructor")
        .assert_member("web/app.ts", "App", "mount")
        .assert_relationship("web/app.ts", RelationshipKind::Import, "./view")
        .assert_relationship("web/app.ts", RelationshipKind::Extends, "Component")
        .assert_relationship("web/app.ts", RelationshipKind::Implements, "Mountable")
        .assert_symbol("scripts/deploy.rb", "Deployer", SymbolKind::Class)
        .assert_lines("scripts/deploy.rb", "Deployer", 3, 11)
        .assert_member("scripts/deploy.rb", "Deployer", "initialize")
        .assert_member("scripts/deploy.rb", "Deployer", "run")
        .assert_relationship("scripts/deploy.rb", RelationshipKind::Import, "fileutils")
        .assert_relationship("scripts/deploy.rb", RelationshipKind::Extends, "Base")
        .run()
        .unwrap();
}

#[test]
fn test_summary_counts_languages() {
    Scenario::new("summary_counts")
        .from_fixture("polyglot")
        .scans_all()
        .assert(Assertion::Custom(Box::new(|report| {
            let summary = report.summary();
            anyhow::ensure!(summary.files == 7, "files: {}", summary.files);
            anyhow::ensure!(summary.failed == 0, "failed: {}", summary.failed);
            for language in ["go", "python", "rust", "typescript", "ruby", "dockerfile", "markdown"] {
                anyhow::ensure!(
                    summary.languages.get(language) == Some(&1),
                    "expected one {} file in {:?}",
                    language,
                    summary.languages
                );
            }
            anyhow::ensure!(summary.symbols >= 15, "symbols: {}", summary.symbols);
            Ok(())
        })))
        .run()
        .unwrap();
}

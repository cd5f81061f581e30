//! Language detection from file paths.

use std::path::Path;

/// Extension (lowercase, no dot) to language tag.
const EXTENSIONS: &[(&str, &str)] = &[
    ("go", "go"),
    ("rs", "rust"),
    ("py", "python"),
    ("pyi", "python"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("mts", "typescript"),
    ("cts", "typescript"),
    ("java", "java"),
    ("kt", "kotlin"),
    ("kts", "kotlin"),
    ("scala", "scala"),
    ("c", "c"),
    ("h", "c"),
    ("cc", "cpp"),
    ("cpp", "cpp"),
    ("cxx", "cpp"),
    ("hpp", "cpp"),
    ("hh", "cpp"),
    ("hxx", "cpp"),
    ("cs", "csharp"),
    ("rb", "ruby"),
    ("php", "php"),
    ("swift", "swift"),
    ("lua", "lua"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("zsh", "shell"),
    ("sql", "sql"),
    ("tf", "terraform"),
    ("hcl", "terraform"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("json", "json"),
    ("toml", "toml"),
    ("proto", "protobuf"),
    ("dockerfile", "dockerfile"),
    ("md", "markdown"),
];

/// Bare file names with no telling extension.
const FILENAMES: &[(&str, &str)] = &[
    ("Dockerfile", "dockerfile"),
    ("Containerfile", "dockerfile"),
    ("Makefile", "make"),
    ("GNUmakefile", "make"),
    ("makefile", "make"),
    ("CMakeLists.txt", "cmake"),
    ("Gemfile", "ruby"),
    ("Rakefile", "ruby"),
    ("Jenkinsfile", "groovy"),
    ("BUILD", "starlark"),
    ("WORKSPACE", "starlark"),
    ("go.mod", "gomod"),
];

/// Detect a language tag for `path`.
///
/// Tries the extension table, then the bare-filename table, then treats
/// `Dockerfile.<anything>` as a Dockerfile. Returns `None` when nothing matches.
pub fn detect_language(path: &Path) -> Option<&'static str> {
    let file_name = path.file_name()?.to_str()?;

    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let ext = ext.to_ascii_lowercase();
        if let Some((_, lang)) = EXTENSIONS.iter().find(|(e, _)| *e == ext) {
            return Some(lang);
        }
    }

    if let Some((_, lang)) = FILENAMES.iter().find(|(name, _)| *name == file_name) {
        return Some(lang);
    }

    if file_name.starts_with("Dockerfile.") {
        return Some("dockerfile");
    }

    None
}

/// `languageId` for `textDocument/didOpen`, inferred from the extension.
pub fn lsp_language_id(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "rs" => "rust",
        "go" => "go",
        "py" | "pyi" => "python",
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "kt" | "kts" => "kotlin",
        "swift" => "swift",
        "lua" => "lua",
        _ => "plaintext",
    }
}

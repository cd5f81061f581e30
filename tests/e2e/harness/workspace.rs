use anyhow::{Context, Result};
use codeintel_core::{detect_language, Config, Registry};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Manages isolated test environments with tempfile
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Fresh temp directory with nothing in it
    pub fn empty() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("codeintel-e2e-")
            .tempdir()
            .context("Failed to create temp directory")?;
        Ok(Self { dir })
    }

    /// Temp directory seeded with `files` (relative path to bytes)
    pub fn with_files(files: HashMap<String, Vec<u8>>) -> Result<Self> {
        let workspace = Self::empty()?;
        files
            .iter()
            .try_for_each(|(path, content)| workspace.write_file(path, content))?;
        Ok(workspace)
    }

    /// Copy a fixture directory into the workspace
    pub fn load_fixture(&self, name: &str) -> Result<()> {
        let fixture_path = fixture_dir(name);
        if !fixture_path.exists() {
            anyhow::bail!("Fixture not found: {}", fixture_path.display());
        }
        copy_dir_recursive(&fixture_path, self.path())
    }

    /// Get workspace path
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a workspace-relative file
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.path().join(path)
    }

    /// Load codeintel.toml from the workspace root (defaults if absent)
    pub fn config(&self) -> Result<Config> {
        Ok(Config::load(self.path())?)
    }

    /// Registry built from the workspace configuration
    pub fn registry(&self) -> Result<Registry> {
        let config = self.config()?;
        Ok(Registry::with_defaults(&config)?)
    }

    /// Write a workspace-relative file, creating parent directories
    pub fn write_file(&self, path: &str, content: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directories for {}", path))?;
        }
        fs::write(&full_path, content).with_context(|| format!("Failed to write {}", path))
    }

    /// Delete a file from the workspace
    pub fn remove_file(&self, path: &str) -> Result<()> {
        fs::remove_file(self.path().join(path))
            .with_context(|| format!("Failed to remove file: {}", path))
    }

    /// Check if file exists
    pub fn file_exists(&self, path: &str) -> bool {
        self.path().join(path).exists()
    }

    /// Every file with a recognized language, sorted, relative to the root
    pub fn source_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        collect_sources(self.path(), self.path(), &mut files)?;
        files.sort();
        Ok(files)
    }
}

fn fixture_dir(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

fn collect_sources(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_sources(root, &path, out)?;
        } else if detect_language(&path).is_some() {
            let rel = path.strip_prefix(root).unwrap_or(&path);
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}

/// Mirror a fixture tree into `dst`
fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    for entry in fs::read_dir(src).with_context(|| format!("Failed to list {}", src.display()))? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            fs::create_dir_all(&target)?;
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

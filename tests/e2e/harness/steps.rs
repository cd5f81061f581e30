use std::sync::Arc;

use codeintel_core::Parser;

use super::assertions::Assertion;

/// All possible actions in a test scenario
pub enum ScenarioStep {
    // Workspace edits
    WriteFile {
        path: String,
        content: Vec<u8>,
    },
    RemoveFile {
        path: String,
    },
    WriteConfig {
        toml: String,
    },

    // Registry control
    RegisterParser {
        parser: Arc<dyn Parser>,
    },
    Rebuild,

    // Extraction
    Scan {
        paths: Vec<String>,
    },
    ScanAll,

    // Assertions (can be interspersed)
    Assert {
        assertion: Assertion,
    },
}

impl std::fmt::Debug for ScenarioStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WriteFile { path, content } => {
                write!(f, "WriteFile {{ path: {:?}, bytes: {} }}", path, content.len())
            }
            Self::RemoveFile { path } => write!(f, "RemoveFile {{ path: {:?} }}", path),
            Self::WriteConfig { .. } => write!(f, "WriteConfig"),
            Self::RegisterParser { parser } => {
                write!(f, "RegisterParser({} {})", parser.language(), parser.name())
            }
            Self::Rebuild => write!(f, "Rebuild"),
            Self::Scan { paths } => write!(f, "Scan({:?})", paths),
            Self::ScanAll => write!(f, "ScanAll"),
            Self::Assert { assertion } => write!(f, "Assert({:?})", assertion),
        }
    }
}

// ============================================================================
// piglet - Compiler Configuration
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};

/// Build settings. Every field has a default, so `{}` is a valid config file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Directory scanned for `*.pig.html` sources
    pub source_dir: PathBuf,
    /// Directory receiving `builtHTML/`, `builtScript/` and `builtComponents/`
    pub output_dir: PathBuf,
    /// Component that renders as `<piglet-root>`
    pub root_component: String,
    /// Import specifier prefixes rewritten to public aliases, longest prefix wins
    pub import_aliases: BTreeMap<String, String>,
    /// Module the emitted class modules import the runtime from
    pub runtime_module: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        let mut import_aliases = BTreeMap::new();
        import_aliases.insert("@piglet/".to_string(), "/piglet/".to_string());
        Self {
            source_dir: PathBuf::from("components"),
            output_dir: PathBuf::from("build"),
            root_component: "App".to_string(),
            import_aliases,
            runtime_module: "/piglet/runtime.mjs".to_string(),
        }
    }
}

impl CompilerConfig {
    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> CompileResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| CompileError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_dirs(mut self, source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        self.source_dir = source_dir.into();
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root_component = root.into();
        self
    }

    pub fn with_alias(mut self, prefix: impl Into<String>, alias: impl Into<String>) -> Self {
        self.import_aliases.insert(prefix.into(), alias.into());
        self
    }

    /// Public specifier for an import path.
    pub fn resolve_alias(&self, specifier: &str) -> Option<String> {
        self.import_aliases
            .iter()
            .filter(|(prefix, _)| specifier.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, alias)| format!("{alias}{}", &specifier[prefix.len()..]))
    }
}

// =============================================================================
// TESTS
// =============================================================================

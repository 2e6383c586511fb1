// ============================================================================
// piglet - Compiler
// Single-file components to HTML fragments, script modules and class modules
// ============================================================================
//
// A build compiles every `*.pig.html` in the source directory. Sibling
// `<Name>.css` and `<Name>.js` files are merged in ahead of the inline
// style and script. A file that fails is logged and skipped; the rest of
// the build carries on.
// ============================================================================

pub mod artifact;
pub mod config;
pub mod literals;
pub mod markup;
pub mod script;
pub mod template;

pub use artifact::Artifacts;
pub use config::CompilerConfig;
pub use script::{ScriptTransformer, TransformedScript};
pub use template::{CompiledTemplate, Sections, TemplateCompiler};

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::constants::SOURCE_EXTENSION;
use crate::error::{CompileError, CompileResult};
use crate::naming::{component_name_from_file, component_tag};

/// Sibling files merged into a component.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Siblings {
    pub css: Option<String>,
    pub script: Option<String>,
}

/// Outcome of one build.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Components whose artifacts were written, in build order
    pub built: Vec<String>,
    /// Files that were skipped, with the reason
    pub skipped: Vec<(String, CompileError)>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Source files in the source directory, sorted by file name.
    pub fn discover(&self) -> CompileResult<Vec<PathBuf>> {
        let dir = &self.config.source_dir;
        let entries = fs::read_dir(dir).map_err(|e| CompileError::io(dir, e))?;
        let mut sources = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| CompileError::io(dir, e))?.path();
            let is_source = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(SOURCE_EXTENSION));
            if is_source && path.is_file() {
                sources.push(path);
            }
        }
        sources.sort();
        Ok(sources)
    }

    /// Compile one component from memory. `known` lists every component
    /// the content may reference.
    pub fn compile_source(
        &self,
        name: &str,
        source: &str,
        siblings: &Siblings,
        known: &BTreeSet<String>,
    ) -> CompileResult<Artifacts> {
        let sections = template::split_sections(name, source)?;
        let template = TemplateCompiler::new(&self.config.root_component)
            .resolving(known)
            .compile(name, &sections, siblings.css.as_deref())?;

        let script = [siblings.script.as_deref(), sections.script]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("\n");
        let script = ScriptTransformer::new(&self.config).transform(&script);

        let tag = component_tag(name, &self.config.root_component);
        Ok(Artifacts::new(name, &tag, &template, &script, &self.config))
    }

    /// Read and compile one source file with its siblings.
    pub fn compile_file(&self, path: &Path, known: &BTreeSet<String>) -> CompileResult<Artifacts> {
        let name = source_name(path)?;
        let source = fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
        let siblings = Siblings {
            css: read_sibling(path, name, "css")?,
            script: read_sibling(path, name, "js")?,
        };
        self.compile_source(name, &source, &siblings, known)
    }

    /// Compile and write every component. Fails only when the source
    /// directory cannot be read.
    pub fn build(&self) -> CompileResult<BuildReport> {
        let sources = self.discover()?;
        let known: BTreeSet<String> = sources
            .iter()
            .filter_map(|p| source_name(p).ok())
            .map(str::to_string)
            .collect();

        let mut report = BuildReport::default();
        for path in &sources {
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let result = self
                .compile_file(path, &known)
                .and_then(|artifacts| artifacts.write(&self.config.output_dir).map(|()| artifacts));
            match result {
                Ok(artifacts) => {
                    debug!(component = %artifacts.name, tag = %artifacts.tag, "component compiled");
                    report.built.push(artifacts.name);
                }
                Err(err) => {
                    warn!(file = %label, %err, "skipping component");
                    report.skipped.push((label, err));
                }
            }
        }

        info!(
            built = report.built.len(),
            skipped = report.skipped.len(),
            output = %self.config.output_dir.display(),
            "build finished"
        );
        Ok(report)
    }
}

fn source_name(path: &Path) -> CompileResult<&str> {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    component_name_from_file(file_name)
        .ok_or_else(|| CompileError::InvalidComponentName(file_name.to_string()))
}

/// `<dir>/<Name>.<ext>` next to a source file, if it exists.
fn read_sibling(path: &Path, name: &str, ext: &str) -> CompileResult<Option<String>> {
    let sibling = path.with_file_name(format!("{name}.{ext}"));
    match fs::read_to_string(&sibling) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CompileError::io(sibling, e)),
    }
}

// =============================================================================
// TESTS
// =============================================================================

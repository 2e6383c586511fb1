// ============================================================================
// piglet - Build Artifacts
// The three outputs of one compiled component
// ============================================================================
//
//   builtHTML/<Name>.html        template body      (/component/html/<Name>)
//   builtScript/<Name>.mjs       transformed script (/component/script/<Name>)
//   builtComponents/<Name>.mjs   class module       (/component/<Name>)
//
// Output depends only on the inputs, so identical sources produce
// byte-identical files.
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use crate::compiler::config::CompilerConfig;
use crate::compiler::script::TransformedScript;
use crate::compiler::template::CompiledTemplate;
use crate::core::constants::{BUILT_COMPONENTS_DIR, BUILT_HTML_DIR, BUILT_SCRIPT_DIR, ELEMENT_PARAM};
use crate::error::{CompileError, CompileResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifacts {
    pub name: String,
    pub tag: String,
    pub html: String,
    pub script: String,
    pub class: String,
}

impl Artifacts {
    pub fn new(
        name: &str,
        tag: &str,
        template: &CompiledTemplate,
        script: &TransformedScript,
        config: &CompilerConfig,
    ) -> Self {
        Self {
            name: name.to_string(),
            tag: tag.to_string(),
            html: template.html.clone(),
            script: script_module(script),
            class: class_module(name, tag, template, config),
        }
    }

    pub fn html_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(BUILT_HTML_DIR).join(format!("{}.html", self.name))
    }

    pub fn script_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(BUILT_SCRIPT_DIR).join(format!("{}.mjs", self.name))
    }

    pub fn class_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(BUILT_COMPONENTS_DIR).join(format!("{}.mjs", self.name))
    }

    /// Write all three files below `out_dir`, creating directories as needed.
    pub fn write(&self, out_dir: &Path) -> CompileResult<()> {
        let files = [
            (self.html_path(out_dir), &self.html),
            (self.script_path(out_dir), &self.script),
            (self.class_path(out_dir), &self.class),
        ];
        for (path, contents) in files {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).map_err(|e| CompileError::io(dir, e))?;
            }
            fs::write(&path, contents).map_err(|e| CompileError::io(&path, e))?;
        }
        Ok(())
    }
}

/// Hoisted imports, then the body as the module's default export.
pub fn script_module(script: &TransformedScript) -> String {
    let mut out = String::new();
    for import in &script.imports {
        out.push_str(import);
        out.push('\n');
    }
    if !script.imports.is_empty() {
        out.push('\n');
    }
    out.push_str(&format!("export default function ({ELEMENT_PARAM}) {{\n"));
    if !script.body.is_empty() {
        out.push_str(&script.body);
        out.push('\n');
    }
    out.push_str("}\n");
    out
}

/// Glue module registering the custom element.
pub fn class_module(name: &str, tag: &str, template: &CompiledTemplate, config: &CompilerConfig) -> String {
    let description = template
        .description
        .as_ref()
        .map_or_else(|| "null".to_string(), |d| d.to_string());
    format!(
        r#"import {{ defineComponent }} from "{runtime}";
import setup from "/component/script/{name}";

const template = `{template}`;
const description = {description};

defineComponent({{ name: "{name}", tag: "{tag}", template, description, setup }});
"#,
        runtime = config.runtime_module,
        template = template.escaped(),
    )
}

// =============================================================================
// TESTS
// =============================================================================

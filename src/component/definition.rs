// ============================================================================
// piglet - Component Definitions
// What a tag upgrades to, and the registry that maps tags to definitions
// ============================================================================

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info};

use crate::component::lifecycle::Component;
use crate::core::constants::BUILT_HTML_DIR;
use crate::error::{RuntimeError, RuntimeResult};
use crate::naming;

/// Script entry point run once per instance when it connects.
pub type SetupFn = Rc<dyn Fn(&Rc<Component>)>;

// =============================================================================
// DEFINITION
// =============================================================================

#[derive(Clone)]
pub struct ComponentDefinition {
    name: String,
    tag: String,
    template: String,
    setup: Option<SetupFn>,
    ignored_attributes: Vec<String>,
    root: bool,
}

impl ComponentDefinition {
    /// Definition for `name` with its derived tag and an empty template.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            tag: naming::tag_name(&name),
            name,
            template: String::new(),
            setup: None,
            ignored_attributes: Vec::new(),
            root: false,
        }
    }

    /// Mark this as the tree root: reserved tag, instance number 0.
    pub fn root(mut self) -> Self {
        self.root = true;
        self.tag = crate::core::constants::ROOT_TAG.to_string();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn template(mut self, html: impl Into<String>) -> Self {
        self.template = html.into();
        self
    }

    pub fn setup(mut self, f: impl Fn(&Rc<Component>) + 'static) -> Self {
        self.setup = Some(Rc::new(f));
        self
    }

    /// Attribute whose mutations never reach the update pipeline.
    pub fn ignore_attribute(mut self, name: impl Into<String>) -> Self {
        self.ignored_attributes.push(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn html(&self) -> &str {
        &self.template
    }

    pub fn setup_fn(&self) -> Option<SetupFn> {
        self.setup.clone()
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn ignores(&self, attribute: &str) -> bool {
        self.ignored_attributes.iter().any(|a| a == attribute)
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("root", &self.root)
            .field("has_setup", &self.setup.is_some())
            .finish()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Tag -> definition map. Redefining a tag replaces the definition for
/// instances constructed (or reloaded) afterwards.
pub struct Registry {
    definitions: RefCell<BTreeMap<String, Rc<ComponentDefinition>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            definitions: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn define(&self, definition: ComponentDefinition) -> Rc<ComponentDefinition> {
        let definition = Rc::new(definition);
        debug!(name = definition.name(), tag = definition.tag(), "component defined");
        self.definitions
            .borrow_mut()
            .insert(definition.tag().to_string(), definition.clone());
        definition
    }

    pub fn get(&self, tag: &str) -> Option<Rc<ComponentDefinition>> {
        self.definitions.borrow().get(tag).cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<Rc<ComponentDefinition>> {
        self.definitions
            .borrow()
            .values()
            .find(|d| d.name() == name)
            .cloned()
    }

    pub fn tags(&self) -> Vec<String> {
        self.definitions.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.borrow().is_empty()
    }

    /// Define every component found in `<dir>/builtHTML/<Name>.html`.
    ///
    /// A component already defined under the same name keeps its setup
    /// function and only has its template replaced. Returns the number of
    /// templates loaded.
    pub fn load_build_dir(&self, dir: impl AsRef<Path>, root: &str) -> RuntimeResult<usize> {
        let html_dir = dir.as_ref().join(BUILT_HTML_DIR);
        let entries = fs::read_dir(&html_dir).map_err(|source| RuntimeError::Io {
            path: html_dir.clone(),
            source,
        })?;

        let mut files: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "html"))
            .collect();
        files.sort();

        let mut loaded = 0;
        for path in files {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !naming::is_component_name(name) {
                continue;
            }
            let html = fs::read_to_string(&path).map_err(|source| RuntimeError::Io {
                path: path.clone(),
                source,
            })?;

            let definition = match self.by_name(name) {
                Some(existing) => (*existing).clone().template(html),
                None => {
                    let fresh = ComponentDefinition::new(name)
                        .with_tag(naming::component_tag(name, root))
                        .template(html);
                    if name == root { fresh.root() } else { fresh }
                }
            };
            self.define(definition);
            loaded += 1;
        }
        info!(dir = %html_dir.display(), loaded, "build output loaded");
        Ok(loaded)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

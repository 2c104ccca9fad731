//! Component Registry — explicit module tree holding component definitions.
//!
//! Projects register their definitions at startup under dotted module paths
//! (`<project>.models.<model_type>.<component_type>`). Every member remembers
//! the module it was declared in, so a member imported into another module
//! with [`ComponentRegistry::reexport`] can be told apart from a native one.
//!
//! Module paths and member names are matched case-insensitively; the casing
//! used at registration is what gets reported back.

use crate::error::{LabError, Result};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Capabilities a definition can declare conformance to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// A model that a trainer can fit.
    TrainableModel,
    Trainer,
    ParameterSchema,
}

/// Trait that all registered component definitions implement.
///
/// Definitions are never instantiated here. Callers recover their concrete
/// type with `downcast_ref` on `dyn ComponentDefinition`.
pub trait ComponentDefinition: Any + Send + Sync + fmt::Debug {
    /// Capabilities this definition declares.
    fn capabilities(&self) -> &[Capability] {
        &[]
    }
}

impl dyn ComponentDefinition {
    /// Recover the concrete definition type.
    pub fn downcast_ref<T: ComponentDefinition>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

/// Lower-case an identifier for comparison.
pub(crate) fn normalize(identifier: &str) -> String {
    identifier.to_lowercase()
}

/// Normalize a dotted module path. Empty segments are rejected.
pub(crate) fn normalize_path(path: &str) -> Result<String> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(LabError::InvalidModulePath {
            path: path.to_string(),
        });
    }
    Ok(normalize(path))
}

/// A named member of a module.
#[derive(Debug, Clone)]
pub struct Member {
    name: String,
    declared_in: String,
    definition: Arc<dyn ComponentDefinition>,
}

impl Member {
    /// Name with the casing used at registration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the module the member was originally defined in.
    pub fn declared_in(&self) -> &str {
        &self.declared_in
    }

    pub fn definition(&self) -> &Arc<dyn ComponentDefinition> {
        &self.definition
    }
}

/// A module: a dotted path plus its top-level members.
#[derive(Debug, Clone)]
pub struct Module {
    path: String,
    members: Vec<Member>,
}

impl Module {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Case-insensitive member lookup.
    pub fn find(&self, name: &str) -> Option<&Member> {
        let wanted = normalize(name);
        self.members.iter().find(|m| normalize(&m.name) == wanted)
    }

    /// Whether `member` was defined here rather than imported.
    pub fn is_native(&self, member: &Member) -> bool {
        normalize(&member.declared_in) == normalize(&self.path)
    }
}

/// Registry of all component modules, keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    modules: BTreeMap<String, Module>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    /// Declare a module and all of its ancestors. Existing modules are kept.
    pub fn declare_module(&mut self, path: &str) -> Result<()> {
        normalize_path(path)?;
        let segments: Vec<&str> = path.split('.').collect();
        for end in 1..=segments.len() {
            let prefix = segments[..end].join(".");
            self.modules
                .entry(normalize(&prefix))
                .or_insert_with(|| {
                    debug!(module = %prefix, "Declaring module");
                    Module {
                        path: prefix.clone(),
                        members: Vec::new(),
                    }
                });
        }
        Ok(())
    }

    /// Define a new member in `module_path`.
    pub fn define<D: ComponentDefinition>(
        &mut self,
        module_path: &str,
        name: &str,
        definition: D,
    ) -> Result<()> {
        self.define_shared(module_path, name, Arc::new(definition))
    }

    /// Define a member from an already shared definition.
    pub fn define_shared(
        &mut self,
        module_path: &str,
        name: &str,
        definition: Arc<dyn ComponentDefinition>,
    ) -> Result<()> {
        self.declare_module(module_path)?;
        let declared_in = self
            .module(module_path)
            .map(|m| m.path.clone())
            .unwrap_or_else(|| module_path.to_string());
        self.insert(
            module_path,
            Member {
                name: name.to_string(),
                declared_in,
                definition,
            },
        )
    }

    /// Import member `name` of `from_module` into `module_path`.
    ///
    /// The member keeps its original declaring module.
    pub fn reexport(&mut self, module_path: &str, name: &str, from_module: &str) -> Result<()> {
        let member = self
            .module(from_module)
            .and_then(|m| m.find(name))
            .cloned()
            .ok_or_else(|| LabError::ComponentNotFound {
                name: name.to_string(),
                module: from_module.to_string(),
            })?;
        self.declare_module(module_path)?;
        self.insert(module_path, member)
    }

    /// Register the three conventional components of a model type:
    /// `<ModelType>`, `<ModelType>Trainer` and `<ModelType>Parameters`.
    pub fn register_model_type<M, T, P>(
        &mut self,
        project: &str,
        model_type: &str,
        model: M,
        trainer: T,
        parameters: P,
    ) -> Result<()>
    where
        M: ComponentDefinition,
        T: ComponentDefinition,
        P: ComponentDefinition,
    {
        let base = format!("{project}.models.{model_type}");
        self.define(&format!("{base}.model"), model_type, model)?;
        self.define(
            &format!("{base}.trainer"),
            &format!("{model_type}Trainer"),
            trainer,
        )?;
        self.define(
            &format!("{base}.config"),
            &format!("{model_type}Parameters"),
            parameters,
        )?;
        debug!(project, model_type, "Registered model type");
        Ok(())
    }

    /// Look up a module by case-insensitive path.
    pub fn module(&self, path: &str) -> Option<&Module> {
        let key = normalize_path(path).ok()?;
        self.modules.get(&key)
    }

    /// Module paths in registration casing, sorted by normalized path.
    pub fn module_paths(&self) -> impl Iterator<Item = &str> {
        self.modules.values().map(|m| m.path.as_str())
    }

    /// Number of declared modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn insert(&mut self, module_path: &str, member: Member) -> Result<()> {
        let key = normalize_path(module_path)?;
        let module = self
            .modules
            .get_mut(&key)
            .ok_or_else(|| LabError::InvalidModulePath {
                path: module_path.to_string(),
            })?;
        if module.find(&member.name).is_some() {
            return Err(LabError::DuplicateComponent {
                name: member.name,
                module: module.path.clone(),
            });
        }
        debug!(module = %module.path, member = %member.name, "Registering component");
        module.members.push(member);
        Ok(())
    }
}

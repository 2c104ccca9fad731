//! Component Resolver — locates a model type's components by naming convention.
//!
//! For a project and a model type the resolver looks in
//! `<project>.models.<model_type>.<component_type>` for a member whose name
//! matches case-insensitively:
//!
//! | Component | Module      | Member name                   |
//! |-----------|-------------|-------------------------------|
//! | model     | `model`     | `<model_type>`                |
//! | trainer   | `trainer`   | `<model_type>trainer`         |
//! | parameters| `config`    | `<model_type>parameters`      |

use crate::error::{LabError, ModuleLevel, Result};
use crate::registry::{Capability, ComponentDefinition, ComponentRegistry, normalize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The three conventional component categories of a model type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Model,
    Trainer,
    Config,
}

impl ComponentKind {
    /// Name of the submodule holding this kind of component.
    pub fn module_name(self) -> &'static str {
        match self {
            ComponentKind::Model => "model",
            ComponentKind::Trainer => "trainer",
            ComponentKind::Config => "config",
        }
    }

    /// Conventional member name for `model_type`.
    pub fn component_name(self, model_type: &str) -> String {
        match self {
            ComponentKind::Model => model_type.to_string(),
            ComponentKind::Trainer => format!("{model_type}trainer"),
            ComponentKind::Config => format!("{model_type}parameters"),
        }
    }

    /// Capability a definition of this kind is expected to declare.
    pub fn expected_capability(self) -> Capability {
        match self {
            ComponentKind::Model => Capability::TrainableModel,
            ComponentKind::Trainer => Capability::Trainer,
            ComponentKind::Config => Capability::ParameterSchema,
        }
    }

    fn missing_capability_message(self) -> &'static str {
        match self {
            ComponentKind::Model => "Model is not a trainable model",
            ComponentKind::Trainer => "Trainer does not declare the trainer capability",
            ComponentKind::Config => "Parameters do not declare a parameter schema",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.module_name())
    }
}

/// What was asked for, in the caller's casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    pub project: String,
    pub model_type: String,
    pub component_type: String,
    pub component_name: String,
}

impl ComponentDescriptor {
    pub fn new(project: &str, model_type: &str, component_type: &str, component_name: &str) -> Self {
        Self {
            project: project.to_string(),
            model_type: model_type.to_string(),
            component_type: component_type.to_string(),
            component_name: component_name.to_string(),
        }
    }

    fn model_module_path(&self) -> String {
        normalize(&format!("{}.models.{}", self.project, self.model_type))
    }

    fn component_module_path(&self) -> String {
        normalize(&format!(
            "{}.models.{}.{}",
            self.project, self.model_type, self.component_type
        ))
    }
}

/// A located component definition.
///
/// Two resolutions are equal when they point at the same member of the same
/// module, regardless of the casing used to request them.
#[derive(Debug, Clone)]
pub struct ResolvedComponent {
    descriptor: ComponentDescriptor,
    name: String,
    module: String,
    declared_in: String,
    definition: Arc<dyn ComponentDefinition>,
}

impl ResolvedComponent {
    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    /// Declared name of the member, in its registration casing.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module the component was resolved from.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Module the component was originally defined in.
    pub fn declared_in(&self) -> &str {
        &self.declared_in
    }

    pub fn is_reexport(&self) -> bool {
        normalize(&self.declared_in) != normalize(&self.module)
    }

    pub fn definition(&self) -> &Arc<dyn ComponentDefinition> {
        &self.definition
    }

    pub fn downcast_ref<T: ComponentDefinition>(&self) -> Option<&T> {
        self.definition.downcast_ref::<T>()
    }
}

impl PartialEq for ResolvedComponent {
    fn eq(&self, other: &Self) -> bool {
        normalize(&self.module) == normalize(&other.module)
            && self.name == other.name
            && Arc::ptr_eq(&self.definition, &other.definition)
    }
}

impl Eq for ResolvedComponent {}

/// Model, trainer and parameter schema of one model type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedComponents {
    pub model: ResolvedComponent,
    pub trainer: ResolvedComponent,
    pub parameters: ResolvedComponent,
}

/// Resolves components against a shared, immutable registry.
#[derive(Debug, Clone)]
pub struct ComponentResolver {
    registry: Arc<ComponentRegistry>,
}

impl ComponentResolver {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Resolve `component_name` inside
    /// `<project>.models.<model_type>.<component_type>`.
    pub fn resolve(
        &self,
        project: &str,
        model_type: &str,
        component_type: &str,
        component_name: &str,
    ) -> Result<ResolvedComponent> {
        let descriptor =
            ComponentDescriptor::new(project, model_type, component_type, component_name);

        let model_path = descriptor.model_module_path();
        if self.registry.module(&model_path).is_none() {
            error!(model_type, module = %model_path, "Cannot find model type, make sure the model exists");
            return Err(LabError::ModuleNotFound {
                level: ModuleLevel::ModelType,
                name: model_type.to_string(),
                path: model_path,
            });
        }

        let component_path = descriptor.component_module_path();
        let Some(module) = self.registry.module(&component_path) else {
            error!(model_type, component_type, "Model type has no such component module");
            return Err(LabError::ModuleNotFound {
                level: ModuleLevel::ComponentType,
                name: component_type.to_string(),
                path: component_path,
            });
        };

        let Some(member) = module.find(component_name) else {
            error!(component_name, module = %module.path(), "Model component does not exist");
            return Err(LabError::ComponentNotFound {
                name: component_name.to_string(),
                module: module.path().to_string(),
            });
        };

        if !module.is_native(member) {
            warn!(
                component = %member.name(),
                module = %module.path(),
                declared_in = %member.declared_in(),
                "Component is extern to its component module"
            );
        }

        debug!(component = %member.name(), module = %module.path(), "Resolved component");
        Ok(ResolvedComponent {
            descriptor,
            name: member.name().to_string(),
            module: module.path().to_string(),
            declared_in: member.declared_in().to_string(),
            definition: Arc::clone(member.definition()),
        })
    }

    /// Resolve a conventional component of `model_type`.
    ///
    /// Warns when the definition does not declare the capability expected of
    /// `kind`; the component is returned either way.
    pub fn resolve_kind(
        &self,
        project: &str,
        model_type: &str,
        kind: ComponentKind,
    ) -> Result<ResolvedComponent> {
        let component = self.resolve(
            project,
            model_type,
            kind.module_name(),
            &kind.component_name(model_type),
        )?;
        let expected = kind.expected_capability();
        if !component.definition().has_capability(expected) {
            warn!(
                model_type,
                component = %component.name(),
                capability = ?expected,
                "{}",
                kind.missing_capability_message()
            );
        }
        Ok(component)
    }

    /// Resolve the model definition.
    pub fn model(&self, project: &str, model_type: &str) -> Result<ResolvedComponent> {
        self.resolve_kind(project, model_type, ComponentKind::Model)
    }

    pub fn trainer(&self, project: &str, model_type: &str) -> Result<ResolvedComponent> {
        self.resolve_kind(project, model_type, ComponentKind::Trainer)
    }

    pub fn parameters(&self, project: &str, model_type: &str) -> Result<ResolvedComponent> {
        self.resolve_kind(project, model_type, ComponentKind::Config)
    }

    /// Resolve model, trainer and parameter schema, in that order.
    pub fn resolve_all(&self, project: &str, model_type: &str) -> Result<ResolvedComponents> {
        Ok(ResolvedComponents {
            model: self.model(project, model_type)?,
            trainer: self.trainer(project, model_type)?,
            parameters: self.parameters(project, model_type)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    /// In-memory sink for formatted log lines.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Run `f` with a WARN-level subscriber and return what it logged.
    fn warnings_from<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        let logged = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        (out, logged)
    }

    #[derive(Debug)]
    struct Net;

    impl ComponentDefinition for Net {
        fn capabilities(&self) -> &[Capability] {
            &[Capability::TrainableModel]
        }
    }

    #[derive(Debug)]
    struct Plain;

    impl ComponentDefinition for Plain {}

    #[derive(Debug)]
    struct Fit;

    impl ComponentDefinition for Fit {
        fn capabilities(&self) -> &[Capability] {
            &[Capability::Trainer]
        }
    }

    #[derive(Debug)]
    struct Schema;

    impl ComponentDefinition for Schema {
        fn capabilities(&self) -> &[Capability] {
            &[Capability::ParameterSchema]
        }
    }

    fn resolver() -> ComponentResolver {
        let mut registry = ComponentRegistry::new();
        registry
            .register_model_type("demo", "ResNet", Net, Plain, Plain)
            .unwrap();
        registry.declare_module("demo.models.empty").unwrap();
        ComponentResolver::new(Arc::new(registry))
    }

    #[test]
    fn test_kind_conventions() {
        assert_eq!(ComponentKind::Model.component_name("mlp"), "mlp");
        assert_eq!(ComponentKind::Trainer.component_name("mlp"), "mlptrainer");
        assert_eq!(ComponentKind::Config.component_name("mlp"), "mlpparameters");
        assert_eq!(ComponentKind::Config.to_string(), "config");
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let resolver = resolver();
        let a = resolver.resolve("demo", "ResNet", "model", "RESNET").unwrap();
        let b = resolver.resolve("DEMO", "resnet", "MODEL", "resnet").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.name(), "ResNet");
        assert_eq!(a.descriptor().component_name, "RESNET");
        assert_eq!(b.descriptor().component_name, "resnet");
    }

    #[test]
    fn test_missing_model_type_is_module_not_found() {
        let err = resolver()
            .resolve("demo", "transformer", "model", "transformer")
            .unwrap_err();
        assert!(matches!(
            err,
            LabError::ModuleNotFound {
                level: ModuleLevel::ModelType,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_project_is_module_not_found() {
        let err = resolver()
            .resolve("other", "resnet", "model", "resnet")
            .unwrap_err();
        assert!(matches!(err, LabError::ModuleNotFound { .. }));
    }

    #[test]
    fn test_missing_component_module() {
        let err = resolver().trainer("demo", "empty").unwrap_err();
        assert!(matches!(
            err,
            LabError::ModuleNotFound {
                level: ModuleLevel::ComponentType,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_component_name() {
        let err = resolver()
            .resolve("demo", "resnet", "model", "VisionTransformer")
            .unwrap_err();
        match err {
            LabError::ComponentNotFound { name, module } => {
                assert_eq!(name, "VisionTransformer");
                assert_eq!(module, "demo.models.ResNet.model");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_all_follows_convention() {
        let all = resolver().resolve_all("demo", "resnet").unwrap();
        assert_eq!(all.model.name(), "ResNet");
        assert_eq!(all.trainer.name(), "ResNetTrainer");
        assert_eq!(all.parameters.name(), "ResNetParameters");
        assert!(all.model.downcast_ref::<Net>().is_some());
        assert!(all.trainer.downcast_ref::<Net>().is_none());
    }

    #[test]
    fn test_kind_capabilities() {
        assert_eq!(
            ComponentKind::Model.expected_capability(),
            Capability::TrainableModel
        );
        assert_eq!(ComponentKind::Trainer.expected_capability(), Capability::Trainer);
        assert_eq!(
            ComponentKind::Config.expected_capability(),
            Capability::ParameterSchema
        );
    }

    #[test]
    fn test_model_without_capability_warns_but_resolves() {
        let mut registry = ComponentRegistry::new();
        registry
            .register_model_type("demo", "mlp", Plain, Fit, Schema)
            .unwrap();
        let resolver = ComponentResolver::new(Arc::new(registry));

        let (model, logged) = warnings_from(|| resolver.model("demo", "mlp"));
        assert_eq!(model.unwrap().name(), "mlp");
        assert!(logged.contains("WARN"), "{logged}");
        assert!(logged.contains("Model is not a trainable model"), "{logged}");
        assert!(logged.contains("TrainableModel"), "{logged}");
    }

    #[test]
    fn test_trainer_and_parameters_without_capability_warn() {
        let resolver = resolver();

        let (trainer, logged) = warnings_from(|| resolver.trainer("demo", "resnet"));
        assert!(trainer.is_ok());
        assert!(
            logged.contains("Trainer does not declare the trainer capability"),
            "{logged}"
        );

        let (parameters, logged) = warnings_from(|| resolver.parameters("demo", "resnet"));
        assert!(parameters.is_ok());
        assert!(
            logged.contains("Parameters do not declare a parameter schema"),
            "{logged}"
        );
    }

    #[test]
    fn test_native_components_with_capabilities_log_nothing() {
        let mut registry = ComponentRegistry::new();
        registry
            .register_model_type("demo", "Mlp", Net, Fit, Schema)
            .unwrap();
        let resolver = ComponentResolver::new(Arc::new(registry));

        let (all, logged) = warnings_from(|| resolver.resolve_all("demo", "mlp"));
        assert!(all.is_ok());
        assert_eq!(logged, "");
    }

    #[test]
    fn test_failed_lookup_logs_error() {
        let (result, logged) = warnings_from(|| resolver().model("demo", "transformer"));
        assert!(result.is_err());
        assert!(logged.contains("ERROR"), "{logged}");
        assert!(logged.contains("Cannot find model type"), "{logged}");
    }

    #[test]
    fn test_reexported_component_resolves() {
        let mut registry = ComponentRegistry::new();
        registry.define("demo.shared", "Mlp", Net).unwrap();
        registry
            .reexport("demo.models.mlp.model", "mlp", "demo.shared")
            .unwrap();
        let resolver = ComponentResolver::new(Arc::new(registry));
        let (model, logged) = warnings_from(|| resolver.model("demo", "mlp"));
        let model = model.unwrap();
        assert!(model.is_reexport());
        assert_eq!(model.declared_in(), "demo.shared");
        assert_eq!(model.module(), "demo.models.mlp.model");

        assert!(
            logged.contains("Component is extern to its component module"),
            "{logged}"
        );
        assert!(logged.contains("declared_in=demo.shared"), "{logged}");
        assert!(!logged.contains("not a trainable model"), "{logged}");
    }
}

//! Property-based tests for case-insensitive component resolution.

mod common;

use common::demo_registry;
use labbook_core::{ComponentResolver, LabError, ModuleLevel};
use proptest::prelude::*;

/// Re-case `s` according to `mask`.
fn recase(s: &str, mask: &[bool]) -> String {
    s.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| {
            if *upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn resolution_ignores_casing(
        mask in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        let resolver = ComponentResolver::new(demo_registry());
        let reference = resolver.resolve("demo", "mlp", "trainer", "mlptrainer").unwrap();
        let recased = resolver
            .resolve(
                &recase("demo", &mask),
                &recase("mlp", &mask),
                &recase("trainer", &mask),
                &recase("mlptrainer", &mask),
            )
            .unwrap();
        prop_assert_eq!(&recased, &reference);
        prop_assert_eq!(recased.name(), "MlpTrainer");
    }

    #[test]
    fn unknown_model_type_is_always_module_not_found(
        model_type in "[a-z]{1,12}",
        component in "[a-z]{1,12}",
    ) {
        prop_assume!(model_type != "mlp" && model_type != "resnet");
        let resolver = ComponentResolver::new(demo_registry());
        let err = resolver.resolve("demo", &model_type, "model", &component).unwrap_err();
        let is_model_level = matches!(
            err,
            LabError::ModuleNotFound { level: ModuleLevel::ModelType, .. }
        );
        prop_assert!(is_model_level);
    }

    #[test]
    fn absent_name_in_existing_module_is_component_not_found(
        name in "[a-z]{1,12}",
    ) {
        prop_assume!(name != "mlp");
        let resolver = ComponentResolver::new(demo_registry());
        let err = resolver.resolve("demo", "mlp", "model", &name).unwrap_err();
        let is_component = matches!(err, LabError::ComponentNotFound { .. });
        prop_assert!(is_component);
    }
}

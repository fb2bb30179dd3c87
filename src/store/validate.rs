//! Consistency rules over the loaded resources.
//!
//! Rules are evaluated across all resources at once, so cross-file
//! references and cross-file id collisions are caught. Each finding names
//! the resource it came from.

use std::collections::{BTreeMap, BTreeSet};

use crate::outcome::ValidationOutcome;

use super::resource::ModelResource;

/// Validate `resources`, folding in any `load_errors` carried from loading.
///
/// Errors (invalidate the model state):
/// - a resource that failed to load
/// - duplicate component ids (within or across resources)
/// - a `requires` entry naming a component that does not exist
/// - a component with an empty name
///
/// Warnings (valid, but suspicious):
/// - a system with zero components
/// - an isolated component (requires nothing, required by nothing)
#[must_use]
pub fn run(resources: &[ModelResource], load_errors: &[String]) -> ValidationOutcome {
    let mut errors: Vec<String> = load_errors.to_vec();
    let mut warnings = Vec::new();

    // First pass: collect ids and where they live.
    let mut id_owner: BTreeMap<&str, &ModelResource> = BTreeMap::new();
    for resource in resources {
        for component in &resource.system.components {
            if let Some(first) = id_owner.get(component.id.as_str()) {
                errors.push(format!(
                    "{}: duplicate component id '{}' (first defined in {})",
                    resource.path.display(),
                    component.id,
                    first.path.display(),
                ));
            } else {
                id_owner.insert(&component.id, resource);
            }
        }
    }

    // Ids that appear on the requiring or required side of any edge.
    let mut connected: BTreeSet<&str> = BTreeSet::new();

    for resource in resources {
        if resource.system.components.is_empty() {
            warnings.push(format!(
                "{}: system '{}' has no components",
                resource.path.display(),
                resource.system.name,
            ));
        }
        for component in &resource.system.components {
            if component.name.trim().is_empty() {
                errors.push(format!(
                    "{}: component '{}' has an empty name",
                    resource.path.display(),
                    component.id,
                ));
            }
            for required in &component.requires {
                if id_owner.contains_key(required.as_str()) {
                    connected.insert(component.id.as_str());
                    connected.insert(required.as_str());
                } else {
                    errors.push(format!(
                        "{}: component '{}' requires unknown component '{}'",
                        resource.path.display(),
                        component.id,
                        required,
                    ));
                }
            }
        }
    }

    for resource in resources {
        for component in &resource.system.components {
            if !connected.contains(component.id.as_str()) {
                warnings.push(format!(
                    "{}: component '{}' is isolated (requires nothing, required by nothing)",
                    resource.path.display(),
                    component.id,
                ));
            }
        }
    }

    ValidationOutcome::from_parts(errors, warnings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::resource::{Component, System};
    use std::path::PathBuf;

    fn resource(path: &str, components: Vec<Component>) -> ModelResource {
        ModelResource {
            path: PathBuf::from(path),
            system: System {
                name: path.trim_end_matches(".model.json").to_owned(),
                components,
            },
        }
    }

    fn component(id: &str, requires: &[&str]) -> Component {
        Component {
            id: id.to_owned(),
            name: id.to_uppercase(),
            requires: requires.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[test]
    fn connected_pair_is_clean() {
        let outcome = run(
            &[resource(
                "a.model.json",
                vec![component("x", &["y"]), component("y", &[])],
            )],
            &[],
        );
        assert_eq!(outcome, ValidationOutcome::Success);
    }

    #[test]
    fn dangling_requires_is_an_error() {
        let outcome = run(
            &[resource("a.model.json", vec![component("x", &["ghost"])])],
            &[],
        );
        assert!(!outcome.is_valid());
        assert!(outcome.errors()[0].contains("ghost"));
    }

    #[test]
    fn duplicate_ids_across_resources_are_errors() {
        let outcome = run(
            &[
                resource("a.model.json", vec![component("x", &[])]),
                resource("b.model.json", vec![component("x", &[])]),
            ],
            &[],
        );
        assert!(!outcome.is_valid());
        assert!(outcome.errors()[0].contains("duplicate"));
    }

    #[test]
    fn empty_system_is_a_warning() {
        let outcome = run(&[resource("a.model.json", vec![])], &[]);
        assert!(outcome.is_valid());
        assert!(outcome.has_warnings());
    }

    #[test]
    fn isolated_component_is_a_warning() {
        let outcome = run(
            &[resource(
                "a.model.json",
                vec![
                    component("x", &["y"]),
                    component("y", &[]),
                    component("z", &[]),
                ],
            )],
            &[],
        );
        assert!(outcome.is_valid());
        assert!(outcome.warnings().iter().any(|w| w.contains("'z'")));
    }

    #[test]
    fn single_unconnected_component_is_isolated() {
        let outcome = run(&[resource("a.model.json", vec![component("x", &[])])], &[]);
        assert!(outcome.is_valid());
        assert!(outcome.warnings().iter().any(|w| w.contains("isolated")));
    }

    #[test]
    fn load_errors_fold_into_the_outcome() {
        let outcome = run(&[], &["broken.model.json: bad json".to_owned()]);
        assert!(!outcome.is_valid());
        assert_eq!(outcome.errors().len(), 1);
    }

    #[test]
    fn errors_and_warnings_combine() {
        let outcome = run(
            &[
                resource("a.model.json", vec![]),
                resource("b.model.json", vec![component("x", &["ghost"])]),
            ],
            &[],
        );
        assert!(!outcome.is_valid());
        assert!(outcome.has_warnings());
    }
}

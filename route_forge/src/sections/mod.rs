//! Section generators: one per section kind, each turning a normalized
//! [`SectionSpec`] into its route descriptors.

mod analytics;
mod dashboard;
mod resource;
mod settings;
mod utilities;

pub use analytics::AnalyticsGenerator;
pub use dashboard::DashboardGenerator;
pub use resource::ResourceGenerator;
pub use settings::SettingsGenerator;
pub use utilities::UtilitiesGenerator;

use crate::error::{Error, Result};
use crate::route::{HandlerKey, RouteDescriptor};
use crate::schema::{ActionSpec, HttpMethod, SectionSlot, SectionSpec};
use std::collections::HashSet;

pub trait SectionGenerator: Sync {
    /// Produces the section's routes. `section` is expected to be normalized
    /// (see [`crate::schema::ModuleDefinition::normalize`]).
    fn generate(&self, module_id: &str, section: &SectionSpec) -> Result<Vec<RouteDescriptor>>;
}

pub fn generator_for(slot: SectionSlot) -> &'static dyn SectionGenerator {
    match slot {
        SectionSlot::Dashboard => &DashboardGenerator,
        SectionSlot::PrimaryResource
        | SectionSlot::SecondaryResourceA
        | SectionSlot::SecondaryResourceB => &ResourceGenerator,
        SectionSlot::Analytics => &AnalyticsGenerator,
        SectionSlot::Settings => &SettingsGenerator,
        SectionSlot::Utilities => &UtilitiesGenerator,
    }
}

/// Dispatches to the generator for the section's slot.
///
/// Generated tables never use PATCH, so an action declaring it is rejected
/// before any generator runs.
pub fn generate(module_id: &str, section: &SectionSpec) -> Result<Vec<RouteDescriptor>> {
    if let Some(action) = section.actions.iter().find(|a| a.method == HttpMethod::Patch) {
        return Err(Error::convention(
            section.kind,
            &action.name,
            "PATCH is not a generated method; use PUT",
        ));
    }
    generator_for(section.kind).generate(module_id, section)
}

fn expect_arity(section: &SectionSpec) -> Result<()> {
    let expected = section.kind.arity();
    if section.actions.len() != expected {
        return Err(Error::Arity {
            slot: section.kind,
            expected,
            found: section.actions.len(),
        });
    }
    Ok(())
}

fn expect_unique_names(section: &SectionSpec) -> Result<()> {
    let mut seen = HashSet::new();
    for action in &section.actions {
        if !seen.insert(action.name.as_str()) {
            return Err(Error::DuplicateAction {
                slot: section.kind,
                action: action.name.clone(),
            });
        }
    }
    Ok(())
}

fn reject_item_addressing(section: &SectionSpec, action: &ActionSpec) -> Result<()> {
    if action.needs_id {
        return Err(Error::convention(
            section.kind,
            &action.name,
            format!("{} routes cannot address an item", section.kind.kind()),
        ));
    }
    Ok(())
}

fn descriptor(
    module_id: &str,
    section: &SectionSpec,
    action: &ActionSpec,
    path: String,
) -> RouteDescriptor {
    let key = HandlerKey::new(
        module_id,
        section.kind.kind(),
        section.resource_name.as_deref(),
        &action.name,
    );
    RouteDescriptor {
        path,
        method: action.method,
        handler_key: key,
        response_shape: action.response_shape.clone(),
    }
}

/// Shared layout of dashboard and analytics: the first action sits on the
/// section root, the rest on `root/<name>`.
fn anchored_routes(
    module_id: &str,
    section: &SectionSpec,
    root: &str,
    check: impl Fn(&ActionSpec) -> Result<()>,
) -> Result<Vec<RouteDescriptor>> {
    expect_arity(section)?;
    expect_unique_names(section)?;

    section
        .actions
        .iter()
        .enumerate()
        .map(|(index, action)| -> Result<RouteDescriptor> {
            check(action)?;
            reject_item_addressing(section, action)?;
            let path = if index == 0 {
                root.to_string()
            } else {
                format!("{root}/{}", action.name)
            };
            Ok(descriptor(module_id, section, action, path))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ModuleDefinition;

    #[test]
    fn test_every_template_section_meets_its_arity() {
        let def = ModuleDefinition::series_template("m", "views", "media", "renders")
            .normalize()
            .unwrap();
        for section in &def.sections {
            let routes = generate(&def.module_id, section).unwrap();
            assert_eq!(routes.len(), section.kind.arity(), "{}", section.kind);
        }
    }

    #[test]
    fn test_wrong_arity_is_reported_per_slot() {
        let def = ModuleDefinition::series_template("m", "views", "media", "renders");
        for slot in SectionSlot::ALL {
            let mut section = def.find_section(slot).unwrap().clone();
            section.actions.pop();
            let err = generate("m", &section).unwrap_err();
            match err {
                Error::Arity { slot: got, expected, found } => {
                    assert_eq!(got, slot);
                    assert_eq!(expected, slot.arity());
                    assert_eq!(found, slot.arity() - 1);
                }
                other => panic!("expected arity error for {slot}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_patch_is_rejected_in_every_section() {
        let def = ModuleDefinition::series_template("m", "views", "media", "renders")
            .normalize()
            .unwrap();
        for (slot, index) in [
            (SectionSlot::PrimaryResource, 5),
            (SectionSlot::Analytics, 2),
            (SectionSlot::Utilities, 3),
        ] {
            let mut section = def.find_section(slot).unwrap().clone();
            section.actions[index].method = HttpMethod::Patch;
            match generate("m", &section).unwrap_err() {
                Error::Convention { slot: got, action, detail } => {
                    assert_eq!(got, slot);
                    assert_eq!(action, section.actions[index].name);
                    assert!(detail.contains("PATCH"), "{detail}");
                }
                other => panic!("expected a convention error for {slot}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_duplicate_action_names_are_rejected() {
        let section = SectionSpec::new(
            SectionSlot::Analytics,
            vec![
                ActionSpec::get("analytics"),
                ActionSpec::get("overview"),
                ActionSpec::get("overview"),
            ],
        );
        assert!(matches!(
            generate("m", &section),
            Err(Error::DuplicateAction { slot: SectionSlot::Analytics, .. })
        ));
    }
}

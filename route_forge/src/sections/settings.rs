use super::{descriptor, expect_arity, expect_unique_names, reject_item_addressing, SectionGenerator};
use crate::error::{Error, Result};
use crate::route::RouteDescriptor;
use crate::schema::{HttpMethod, SectionSpec};

/// `GET /settings` then `PUT /settings`.
pub struct SettingsGenerator;

impl SectionGenerator for SettingsGenerator {
    fn generate(&self, module_id: &str, section: &SectionSpec) -> Result<Vec<RouteDescriptor>> {
        expect_arity(section)?;
        expect_unique_names(section)?;

        let methods: Vec<HttpMethod> = section.actions.iter().map(|a| a.method).collect();
        if methods != [HttpMethod::Get, HttpMethod::Put] {
            let offending = section
                .actions
                .iter()
                .zip([HttpMethod::Get, HttpMethod::Put])
                .find(|(action, expected)| action.method != *expected)
                .map(|(action, _)| action.name.as_str())
                .unwrap_or("-");
            return Err(Error::convention(
                section.kind,
                offending,
                "settings must be exactly GET /settings then PUT /settings",
            ));
        }

        section
            .actions
            .iter()
            .map(|action| -> Result<RouteDescriptor> {
                reject_item_addressing(section, action)?;
                Ok(descriptor(module_id, section, action, "/settings".to_string()))
            })
            .collect()
    }
}

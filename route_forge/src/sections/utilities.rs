use super::{descriptor, expect_arity, expect_unique_names, reject_item_addressing, SectionGenerator};
use crate::error::Result;
use crate::route::RouteDescriptor;
use crate::schema::SectionSpec;

/// Four module-root routes, one `/<name>` per action.
pub struct UtilitiesGenerator;

impl SectionGenerator for UtilitiesGenerator {
    fn generate(&self, module_id: &str, section: &SectionSpec) -> Result<Vec<RouteDescriptor>> {
        expect_arity(section)?;
        expect_unique_names(section)?;

        section
            .actions
            .iter()
            .map(|action| -> Result<RouteDescriptor> {
                reject_item_addressing(section, action)?;
                let path = format!("/{}", action.name);
                Ok(descriptor(module_id, section, action, path))
            })
            .collect()
    }
}

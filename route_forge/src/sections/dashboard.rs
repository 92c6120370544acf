use super::{anchored_routes, SectionGenerator};
use crate::error::{Error, Result};
use crate::route::RouteDescriptor;
use crate::schema::{HttpMethod, SectionSpec};

/// Five read-only routes: `GET /dashboard` and four `GET /dashboard/<name>`
/// siblings named verbatim after `actions[1..4]`.
pub struct DashboardGenerator;

impl SectionGenerator for DashboardGenerator {
    fn generate(&self, module_id: &str, section: &SectionSpec) -> Result<Vec<RouteDescriptor>> {
        anchored_routes(module_id, section, "/dashboard", |action| {
            if action.method != HttpMethod::Get {
                return Err(Error::convention(
                    section.kind,
                    &action.name,
                    format!("dashboard routes are GET-only, found {}", action.method),
                ));
            }
            Ok(())
        })
    }
}

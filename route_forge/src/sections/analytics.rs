use super::{anchored_routes, SectionGenerator};
use crate::error::Result;
use crate::route::RouteDescriptor;
use crate::schema::SectionSpec;

/// `/analytics` plus two `/analytics/<name>` routes; methods come from the
/// action specs.
pub struct AnalyticsGenerator;

impl SectionGenerator for AnalyticsGenerator {
    fn generate(&self, module_id: &str, section: &SectionSpec) -> Result<Vec<RouteDescriptor>> {
        anchored_routes(module_id, section, "/analytics", |_| Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::schema::{ActionSpec, HttpMethod, SectionSlot};

    #[test]
    fn test_analytics_layout_keeps_declared_methods() {
        let section = SectionSpec::new(
            SectionSlot::Analytics,
            vec![
                ActionSpec::get("analytics"),
                ActionSpec::get("overview"),
                ActionSpec::post("export"),
            ],
        );
        let routes = AnalyticsGenerator.generate("m", &section).unwrap();
        assert_eq!(routes[0].path, "/analytics");
        assert_eq!(routes[2].path, "/analytics/export");
        assert_eq!(routes[2].method, HttpMethod::Post);
    }

    #[test]
    fn test_analytics_cannot_address_items() {
        let section = SectionSpec::new(
            SectionSlot::Analytics,
            vec![
                ActionSpec::get("analytics"),
                ActionSpec::get("overview"),
                ActionSpec::get("report").with_id(),
            ],
        );
        assert!(matches!(
            AnalyticsGenerator.generate("m", &section),
            Err(Error::Convention { .. })
        ));
    }
}

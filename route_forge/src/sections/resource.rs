use super::{descriptor, expect_arity, expect_unique_names, SectionGenerator};
use crate::error::{Error, Result};
use crate::naming::{canonical_shape, is_canonical_verb, CANONICAL_VERBS};
use crate::route::RouteDescriptor;
use crate::schema::{ActionSpec, IdStyle, SectionSlot, SectionSpec};

/// Verbs every primary resource must declare.
const PRIMARY_REQUIRED: [&str; 4] = ["list", "detail", "create", "update"];

/// CRUD-plus-custom routes under `/<resourceName>`.
///
/// Canonical verbs come first in [`CANONICAL_VERBS`] order, each on its fixed
/// method and path; custom actions follow in authored order.
pub struct ResourceGenerator;

impl SectionGenerator for ResourceGenerator {
    fn generate(&self, module_id: &str, section: &SectionSpec) -> Result<Vec<RouteDescriptor>> {
        expect_arity(section)?;
        expect_unique_names(section)?;
        let base = format!("/{}", section.resource_name()?);

        if section.kind == SectionSlot::PrimaryResource {
            for verb in PRIMARY_REQUIRED {
                if !section.actions.iter().any(|a| a.name == verb) {
                    return Err(Error::convention(
                        section.kind,
                        verb,
                        "primary resource must declare list, detail, create and update",
                    ));
                }
            }
        }

        let mut routes = Vec::with_capacity(section.actions.len());
        for verb in CANONICAL_VERBS {
            if let Some(action) = section.actions.iter().find(|a| a.name == verb) {
                check_canonical_shape(section, action)?;
                let path = canonical_path(section.id_style, &base, verb);
                routes.push(descriptor(module_id, section, action, path));
            }
        }
        for action in section
            .actions
            .iter()
            .filter(|a| !is_canonical_verb(&a.name))
        {
            let path = match (action.needs_id, section.id_style) {
                (true, IdStyle::PathParam) => format!("{base}/:id/{}", action.name),
                _ => format!("{base}/{}", action.name),
            };
            routes.push(descriptor(module_id, section, action, path));
        }
        Ok(routes)
    }
}

fn check_canonical_shape(section: &SectionSpec, action: &ActionSpec) -> Result<()> {
    let Some((method, needs_id)) = canonical_shape(&action.name) else {
        return Ok(());
    };
    if action.method != method {
        return Err(Error::convention(
            section.kind,
            &action.name,
            format!("`{}` must use {method}, found {}", action.name, action.method),
        ));
    }
    if action.needs_id != needs_id {
        let detail = if needs_id {
            format!("`{}` addresses an item and must set needsId", action.name)
        } else {
            format!("`{}` operates on the collection and cannot set needsId", action.name)
        };
        return Err(Error::convention(section.kind, &action.name, detail));
    }
    Ok(())
}

fn canonical_path(style: IdStyle, base: &str, verb: &str) -> String {
    match verb {
        "list" | "create" => base.to_string(),
        _ => match style {
            IdStyle::PathParam => format!("{base}/:id"),
            IdStyle::Queryless => format!("{base}/{verb}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listings(id_style: IdStyle) -> SectionSpec {
        SectionSpec::resource(
            SectionSlot::PrimaryResource,
            "listings",
            id_style,
            vec![
                ActionSpec::post("analyze").with_id(),
                ActionSpec::get("list"),
                ActionSpec::get("detail").with_id(),
                ActionSpec::post("create"),
                ActionSpec::put("update").with_id(),
                ActionSpec::post("bulk-allocate"),
            ],
        )
    }

    fn layout(routes: &[RouteDescriptor]) -> Vec<String> {
        routes
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    #[test]
    fn test_path_param_layout() {
        let routes = ResourceGenerator
            .generate("seo", &listings(IdStyle::PathParam))
            .unwrap();
        assert_eq!(
            layout(&routes),
            [
                "GET /listings",
                "GET /listings/:id",
                "POST /listings",
                "PUT /listings/:id",
                "POST /listings/:id/analyze",
                "POST /listings/bulk-allocate",
            ]
        );
        assert_eq!(
            routes[4].handler_key.to_string(),
            "seo/resource/listings/analyze"
        );
    }

    #[test]
    fn test_queryless_layout() {
        let routes = ResourceGenerator
            .generate("seo", &listings(IdStyle::Queryless))
            .unwrap();
        assert_eq!(
            layout(&routes),
            [
                "GET /listings",
                "GET /listings/detail",
                "POST /listings",
                "PUT /listings/update",
                "POST /listings/analyze",
                "POST /listings/bulk-allocate",
            ]
        );
    }

    #[test]
    fn test_canonical_verb_with_wrong_method() {
        let mut section = listings(IdStyle::PathParam);
        section.actions[3] = ActionSpec::get("create");
        let err = ResourceGenerator.generate("seo", &section).unwrap_err();
        assert!(matches!(err, Error::Convention { ref action, .. } if action == "create"));
    }

    #[test]
    fn test_canonical_verb_with_wrong_addressing() {
        let mut section = listings(IdStyle::PathParam);
        section.actions[2] = ActionSpec::get("detail");
        let err = ResourceGenerator.generate("seo", &section).unwrap_err();
        assert!(matches!(err, Error::Convention { ref action, .. } if action == "detail"));
    }

    #[test]
    fn test_primary_requires_core_verbs() {
        let mut section = listings(IdStyle::PathParam);
        section.actions[4] = ActionSpec::post("archive").with_id();
        let err = ResourceGenerator.generate("seo", &section).unwrap_err();
        assert!(matches!(err, Error::Convention { ref action, .. } if action == "update"));
    }

    #[test]
    fn test_secondary_may_skip_verbs() {
        let section = SectionSpec::resource(
            SectionSlot::SecondaryResourceA,
            "price-rules",
            IdStyle::PathParam,
            vec![
                ActionSpec::get("list"),
                ActionSpec::delete("delete").with_id(),
                ActionSpec::post("apply").with_id(),
                ActionSpec::get("preview"),
            ],
        );
        let routes = ResourceGenerator.generate("m", &section).unwrap();
        assert_eq!(
            layout(&routes),
            [
                "GET /price-rules",
                "DELETE /price-rules/:id",
                "POST /price-rules/:id/apply",
                "GET /price-rules/preview",
            ]
        );
    }

    #[test]
    fn test_missing_resource_name() {
        let mut section = listings(IdStyle::PathParam);
        section.resource_name = None;
        assert!(matches!(
            ResourceGenerator.generate("m", &section),
            Err(Error::MissingResourceName(SectionSlot::PrimaryResource))
        ));
    }
}

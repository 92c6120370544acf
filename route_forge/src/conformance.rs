//! Diffs an existing module's routes against its canonical route table.
//!
//! Drift is data, not failure: [`check`] always returns a report.

use crate::naming::{canonical_action_for, normalize};
use crate::route::{HandlerFamily, RouteDescriptor, RouteTable};
use crate::schema::{HttpMethod, SectionKind};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Declaration order is the within-group report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DriftClass {
    Missing,
    Extra,
    PathMismatch,
    Matched,
}

impl DriftClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftClass::Missing => "missing",
            DriftClass::Extra => "extra",
            DriftClass::PathMismatch => "pathMismatch",
            DriftClass::Matched => "matched",
        }
    }
}

impl fmt::Display for DriftClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of path drift a `pathMismatch` most likely is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MismatchHint {
    /// `/x/analyze/:id` where `/x/:id/analyze` was expected.
    IdAfterAction,
    /// Expected an id segment, observed none.
    IdMissing,
    /// Observed an id segment where none was expected.
    IdUnexpected,
    /// A literal `detail` segment stands in for (or next to) the id.
    LiteralDetail,
    /// Same shape, different parameter name (`/:sku` vs `/:id`).
    ParamName,
    Other,
}

impl MismatchHint {
    pub fn classify(expected: &str, observed: &str) -> Self {
        let exp = segments(expected);
        let obs = segments(observed);

        if exp.contains(&"detail") != obs.contains(&"detail") {
            return MismatchHint::LiteralDetail;
        }

        let exp_param = exp.iter().position(|s| is_param(s));
        let obs_param = obs.iter().position(|s| is_param(s));
        match (exp_param, obs_param) {
            (Some(e), Some(o)) => {
                let exp_literals: Vec<_> = exp.iter().filter(|s| !is_param(s)).collect();
                let obs_literals: Vec<_> = obs.iter().filter(|s| !is_param(s)).collect();
                if exp_literals != obs_literals {
                    MismatchHint::Other
                } else if o > e {
                    MismatchHint::IdAfterAction
                } else if o == e {
                    MismatchHint::ParamName
                } else {
                    MismatchHint::Other
                }
            }
            (Some(_), None) => MismatchHint::IdMissing,
            (None, Some(_)) => MismatchHint::IdUnexpected,
            (None, None) => MismatchHint::Other,
        }
    }
}

impl fmt::Display for MismatchHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MismatchHint::IdAfterAction => "idAfterAction",
            MismatchHint::IdMissing => "idMissing",
            MismatchHint::IdUnexpected => "idUnexpected",
            MismatchHint::LiteralDetail => "literalDetail",
            MismatchHint::ParamName => "paramName",
            MismatchHint::Other => "other",
        };
        f.write_str(text)
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn is_param(segment: &str) -> bool {
    segment.starts_with(':') || (segment.starts_with('{') && segment.ends_with('}'))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub class: DriftClass,
    pub section: SectionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub action: String,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<MismatchHint>,
}

impl Finding {
    fn new(class: DriftClass, family: &HandlerFamily, method: HttpMethod) -> Self {
        Self {
            class,
            section: family.kind,
            resource: family.resource.clone(),
            action: family.action.clone(),
            method,
            expected_path: None,
            observed_path: None,
            hint: None,
        }
    }

    fn path(&self) -> &str {
        self.expected_path
            .as_deref()
            .or(self.observed_path.as_deref())
            .unwrap_or_default()
    }

    fn sort_key(&self) -> (SectionKind, &str, DriftClass, Option<&str>, &str) {
        (
            self.section,
            self.action.as_str(),
            self.class,
            self.resource.as_deref(),
            self.path(),
        )
    }

    fn family(&self) -> String {
        match &self.resource {
            Some(resource) => format!("{}/{}/{}", self.section, resource, self.action),
            None => format!("{}/{}", self.section, self.action),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<13} {:<6} ", self.class, self.method)?;
        match (&self.expected_path, &self.observed_path) {
            (Some(expected), Some(observed)) if expected != observed => {
                write!(f, "{expected} (observed {observed})")?
            }
            _ => write!(f, "{}", self.path())?,
        }
        write!(f, "  [{}]", self.family())?;
        if let Some(hint) = self.hint {
            write!(f, " {hint}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConformanceReport {
    pub module_id: String,
    /// Matched routes, in expected-table order.
    pub matched: Vec<Finding>,
    /// Missing, extra and mismatched routes in report order.
    pub drift: Vec<Finding>,
}

impl ConformanceReport {
    pub fn is_clean(&self) -> bool {
        self.drift.is_empty()
    }

    pub fn count(&self, class: DriftClass) -> usize {
        match class {
            DriftClass::Matched => self.matched.len(),
            other => self.drift.iter().filter(|f| f.class == other).count(),
        }
    }

    pub fn of_class(&self, class: DriftClass) -> impl Iterator<Item = &Finding> {
        self.matched
            .iter()
            .chain(self.drift.iter())
            .filter(move |f| f.class == class)
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} matched, {} missing, {} extra, {} path mismatch",
            self.module_id,
            self.count(DriftClass::Matched),
            self.count(DriftClass::Missing),
            self.count(DriftClass::Extra),
            self.count(DriftClass::PathMismatch),
        )?;
        let mut section = None;
        for finding in &self.drift {
            if section != Some(finding.section) {
                writeln!(f, "[{}]", finding.section)?;
                section = Some(finding.section);
            }
            writeln!(f, "  {finding}")?;
        }
        Ok(())
    }
}

/// Observed family with a resource action alias mapped onto its verb, so
/// `show` and `detail` compare equal. Actions the expected table names
/// verbatim, or whose route lacks the verb's method and item addressing,
/// keep their own name.
fn comparable_family(route: &RouteDescriptor, expected: &[HandlerFamily]) -> HandlerFamily {
    let mut family = route.handler_key.family();
    if family.kind != SectionKind::Resource || expected.contains(&family) {
        return family;
    }
    if let Ok(token) = normalize(&family.action) {
        let has_id = segments(&route.path).iter().any(|s| is_param(s));
        family.action = canonical_action_for(&token, route.method, has_id).into_string();
    }
    family
}

/// Classifies every expected and observed route.
///
/// Exact matches are paired first; the leftovers are paired by method and
/// family as path mismatches; whatever remains is missing or extra.
pub fn check(expected: &RouteTable, observed: &[RouteDescriptor]) -> ConformanceReport {
    let expected_families: Vec<_> = expected.iter().map(|r| r.handler_key.family()).collect();
    let observed_families: Vec<_> = observed
        .iter()
        .map(|r| comparable_family(r, &expected_families))
        .collect();
    let mut expected_paired = vec![false; expected.len()];
    let mut observed_paired = vec![false; observed.len()];

    let mut matched = Vec::new();
    let mut drift = Vec::new();

    for (i, exp) in expected.iter().enumerate() {
        let hit = (0..observed.len()).find(|&j| {
            !observed_paired[j]
                && observed[j].method == exp.method
                && observed[j].path == exp.path
                && observed_families[j] == expected_families[i]
        });
        if let Some(j) = hit {
            expected_paired[i] = true;
            observed_paired[j] = true;
            let mut finding = Finding::new(DriftClass::Matched, &expected_families[i], exp.method);
            finding.expected_path = Some(exp.path.clone());
            finding.observed_path = Some(observed[j].path.clone());
            matched.push(finding);
        }
    }

    for (i, exp) in expected.iter().enumerate() {
        if expected_paired[i] {
            continue;
        }
        let hit = (0..observed.len()).find(|&j| {
            !observed_paired[j]
                && observed[j].method == exp.method
                && observed_families[j] == expected_families[i]
        });
        let mut finding = match hit {
            Some(j) => {
                observed_paired[j] = true;
                let mut finding =
                    Finding::new(DriftClass::PathMismatch, &expected_families[i], exp.method);
                finding.observed_path = Some(observed[j].path.clone());
                finding.hint = Some(MismatchHint::classify(&exp.path, &observed[j].path));
                finding
            }
            None => Finding::new(DriftClass::Missing, &expected_families[i], exp.method),
        };
        finding.expected_path = Some(exp.path.clone());
        drift.push(finding);
    }

    for (j, obs) in observed.iter().enumerate() {
        if observed_paired[j] {
            continue;
        }
        let mut finding = Finding::new(DriftClass::Extra, &observed_families[j], obs.method);
        finding.observed_path = Some(obs.path.clone());
        drift.push(finding);
    }

    drift.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let report = ConformanceReport {
        module_id: expected.module_id.clone(),
        matched,
        drift,
    };
    if !report.is_clean() {
        warn!(
            module = %report.module_id,
            missing = report.count(DriftClass::Missing),
            extra = report.count(DriftClass::Extra),
            path_mismatch = report.count(DriftClass::PathMismatch),
            "module drifts from its canonical routes"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::route::HandlerKey;
    use crate::schema::{ActionSpec, IdStyle, ModuleDefinition, SectionSlot, SectionSpec};

    fn listings_module() -> ModuleDefinition {
        let mut def = ModuleDefinition::series_template("seo", "listings", "keywords", "audits");
        def.sections.retain(|s| s.kind != SectionSlot::PrimaryResource);
        def.section(SectionSpec::resource(
            SectionSlot::PrimaryResource,
            "listings",
            IdStyle::PathParam,
            vec![
                ActionSpec::get("list"),
                ActionSpec::get("detail").with_id(),
                ActionSpec::post("create"),
                ActionSpec::put("update").with_id(),
                ActionSpec::post("analyze").with_id(),
                ActionSpec::post("optimize").with_id(),
            ],
        ))
    }

    fn route(method: HttpMethod, path: &str, key: &str) -> RouteDescriptor {
        RouteDescriptor::new(path, method, key.parse::<HandlerKey>().unwrap())
    }

    #[test]
    fn test_table_conforms_to_itself() {
        let table = compile(&listings_module()).unwrap();
        let report = check(&table, &table.routes);
        assert!(report.is_clean(), "{report}");
        assert_eq!(report.count(DriftClass::Matched), table.len());
    }

    #[test]
    fn test_module_slug_is_ignored() {
        let table = compile(&listings_module()).unwrap();
        let observed: Vec<_> = table
            .iter()
            .map(|r| {
                let mut r = r.clone();
                r.handler_key.module_id = "ebay-seo-optimizer".to_string();
                r
            })
            .collect();
        assert!(check(&table, &observed).is_clean());
    }

    #[test]
    fn test_classifies_real_world_drift() {
        let table = compile(&listings_module()).unwrap();
        let mut observed: Vec<_> = table
            .iter()
            .filter(|r| r.section() == SectionKind::Resource && r.path.starts_with("/listings"))
            .cloned()
            .collect();
        observed.retain(|r| {
            !["/listings/:id/analyze", "/listings/:id/optimize"].contains(&r.path.as_str())
                && !(r.path == "/listings/:id" && r.method == HttpMethod::Get)
        });
        observed.push(route(HttpMethod::Post, "/listings/analyze", "other/resource/listings/analyze"));
        observed.push(route(HttpMethod::Get, "/listings/detail/:id", "other/resource/listings/show"));
        observed.push(route(HttpMethod::Get, "/listings/stats", "other/resource/listings/stats"));

        let mut table = table;
        table.routes.retain(|r| r.path.starts_with("/listings"));
        let report = check(&table, &observed);

        let summary: Vec<_> = report
            .drift
            .iter()
            .map(|f| (f.class, f.action.as_str(), f.hint))
            .collect();
        assert_eq!(
            summary,
            [
                (DriftClass::PathMismatch, "analyze", Some(MismatchHint::IdMissing)),
                (DriftClass::PathMismatch, "detail", Some(MismatchHint::LiteralDetail)),
                (DriftClass::Missing, "optimize", None),
                (DriftClass::Extra, "stats", None),
            ]
        );
        assert_eq!(report.count(DriftClass::Matched), 3);
    }

    #[test]
    fn test_alias_named_actions_are_compared_by_shape() {
        let mut def = ModuleDefinition::series_template("alerts-hub", "alerts", "widgets", "activities");
        def.sections[1].actions[5] = ActionSpec::put("read").with_id();
        let mut table = compile(&def).unwrap();
        table.routes.retain(|r| r.path.starts_with("/alerts"));

        let mut observed: Vec<_> = table
            .iter()
            .filter(|r| r.path != "/alerts/:id/read" && r.path != "/alerts/:id")
            .cloned()
            .collect();
        observed.push(route(HttpMethod::Put, "/alerts/read/:id", "old/resource/alerts/read"));
        observed.push(route(HttpMethod::Get, "/alerts/:id", "old/resource/alerts/view"));
        observed.push(route(HttpMethod::Put, "/alerts/:id", "old/resource/alerts/edit"));
        observed.push(route(HttpMethod::Delete, "/alerts/:id", "old/resource/alerts/remove"));
        observed.push(route(HttpMethod::Put, "/alerts/:id/view", "old/resource/alerts/view"));

        let report = check(&table, &observed);
        let summary: Vec<_> = report
            .drift
            .iter()
            .map(|f| (f.class, f.action.as_str(), f.hint))
            .collect();
        assert_eq!(
            summary,
            [
                (DriftClass::PathMismatch, "read", Some(MismatchHint::IdAfterAction)),
                (DriftClass::Extra, "view", None),
            ]
        );
        let matched: Vec<_> = report.matched.iter().map(|f| f.action.as_str()).collect();
        assert_eq!(matched, ["list", "detail", "create", "update", "delete"]);
    }

    #[test]
    fn test_missing_sorts_before_extra_within_a_group() {
        let table = RouteTable {
            module_id: "m".into(),
            theme: String::new(),
            mount: "/api/m".into(),
            routes: vec![route(HttpMethod::Get, "/summary", "m/utilities/summary")],
        };
        let observed = vec![
            route(HttpMethod::Post, "/summary", "m/utilities/summary"),
            route(HttpMethod::Get, "/health", "m/utilities/health"),
        ];
        let report = check(&table, &observed);
        let classes: Vec<_> = report.drift.iter().map(|f| (f.action.as_str(), f.class)).collect();
        assert_eq!(
            classes,
            [
                ("health", DriftClass::Extra),
                ("summary", DriftClass::Missing),
                ("summary", DriftClass::Extra),
            ]
        );
    }

    #[test]
    fn test_mismatch_hints() {
        use MismatchHint::*;
        let cases = [
            ("/x/:id/analyze", "/x/analyze/:id", IdAfterAction),
            ("/x/:id/analyze", "/x/analyze", IdMissing),
            ("/x/analyze", "/x/:id/analyze", IdUnexpected),
            ("/x/:id", "/x/detail", LiteralDetail),
            ("/x/detail", "/x/:id", LiteralDetail),
            ("/x/:id", "/x/:sku", ParamName),
            ("/x/:id", "/y/:id", Other),
        ];
        for (expected, observed, hint) in cases {
            assert_eq!(MismatchHint::classify(expected, observed), hint, "{expected} vs {observed}");
        }
    }

    #[test]
    fn test_report_renders_and_serializes() {
        let table = compile(&listings_module()).unwrap();
        let mut observed = table.routes.clone();
        observed.pop();
        let report = check(&table, &observed);
        let text = report.to_string();
        assert!(text.starts_with("seo: 27 matched, 1 missing, 0 extra, 0 path mismatch"));
        assert!(text.contains("[utilities]"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["drift"][0]["class"], "missing");
        assert_eq!(json["drift"][0]["expectedPath"], "/sync");
    }
}

//! The declarative description of one tool module.
//!
//! A [`ModuleDefinition`] is pure configuration: it is authored once (by hand
//! or by a catalog generator), loaded from TOML or JSON, normalized and
//! compiled on every build, and never mutated afterwards.

use crate::error::{Error, Result};
use crate::naming::{self, canonical_action_for, normalize, plural_noun};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            other => Err(format!("unknown HTTP method `{other}`")),
        }
    }
}

/// The structural role of a section. Declaration order is the order the
/// conformance report groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Dashboard,
    Resource,
    Analytics,
    Settings,
    Utilities,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Dashboard => "dashboard",
            SectionKind::Resource => "resource",
            SectionKind::Analytics => "analytics",
            SectionKind::Settings => "settings",
            SectionKind::Utilities => "utilities",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "dashboard" => Ok(SectionKind::Dashboard),
            "resource" => Ok(SectionKind::Resource),
            "analytics" => Ok(SectionKind::Analytics),
            "settings" => Ok(SectionKind::Settings),
            "utilities" => Ok(SectionKind::Utilities),
            other => Err(format!("unknown section kind `{other}`")),
        }
    }
}

/// One of the seven section positions of a module. Declaration order is
/// compile order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionSlot {
    Dashboard,
    PrimaryResource,
    SecondaryResourceA,
    SecondaryResourceB,
    Analytics,
    Settings,
    Utilities,
}

impl SectionSlot {
    pub const ALL: [SectionSlot; 7] = [
        SectionSlot::Dashboard,
        SectionSlot::PrimaryResource,
        SectionSlot::SecondaryResourceA,
        SectionSlot::SecondaryResourceB,
        SectionSlot::Analytics,
        SectionSlot::Settings,
        SectionSlot::Utilities,
    ];

    pub fn kind(&self) -> SectionKind {
        match self {
            SectionSlot::Dashboard => SectionKind::Dashboard,
            SectionSlot::PrimaryResource
            | SectionSlot::SecondaryResourceA
            | SectionSlot::SecondaryResourceB => SectionKind::Resource,
            SectionSlot::Analytics => SectionKind::Analytics,
            SectionSlot::Settings => SectionKind::Settings,
            SectionSlot::Utilities => SectionKind::Utilities,
        }
    }

    /// Number of actions (and therefore routes) the slot must declare.
    pub fn arity(&self) -> usize {
        match self {
            SectionSlot::Dashboard => 5,
            SectionSlot::PrimaryResource => 6,
            SectionSlot::SecondaryResourceA | SectionSlot::SecondaryResourceB => 4,
            SectionSlot::Analytics => 3,
            SectionSlot::Settings => 2,
            SectionSlot::Utilities => 4,
        }
    }

    pub fn is_resource(&self) -> bool {
        self.kind() == SectionKind::Resource
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionSlot::Dashboard => "dashboard",
            SectionSlot::PrimaryResource => "primaryResource",
            SectionSlot::SecondaryResourceA => "secondaryResourceA",
            SectionSlot::SecondaryResourceB => "secondaryResourceB",
            SectionSlot::Analytics => "analytics",
            SectionSlot::Settings => "settings",
            SectionSlot::Utilities => "utilities",
        }
    }
}

impl fmt::Display for SectionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Total routes of every valid module: the sum of all slot arities.
pub const MODULE_ROUTE_COUNT: usize = 28;

/// How item-addressing actions of a resource locate their item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdStyle {
    /// `/listings/:id`, `/listings/:id/analyze`
    #[default]
    PathParam,
    /// `/listings/detail`, `/listings/analyze`
    Queryless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NounStyle {
    #[default]
    AsWritten,
    Plural,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSpec {
    pub name: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub needs_id: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_shape: Option<String>,
}

impl ActionSpec {
    pub fn new(name: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            name: name.into(),
            method,
            needs_id: false,
            response_shape: None,
        }
    }

    pub fn get(name: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Get)
    }

    pub fn post(name: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Post)
    }

    pub fn put(name: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Put)
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Delete)
    }

    pub fn with_id(mut self) -> Self {
        self.needs_id = true;
        self
    }

    pub fn shape(mut self, response_shape: impl Into<String>) -> Self {
        self.response_shape = Some(response_shape.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSpec {
    pub kind: SectionSlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(default)]
    pub id_style: IdStyle,
    pub actions: Vec<ActionSpec>,
}

impl SectionSpec {
    pub fn new(kind: SectionSlot, actions: Vec<ActionSpec>) -> Self {
        Self {
            kind,
            resource_name: None,
            id_style: IdStyle::default(),
            actions,
        }
    }

    pub fn resource(
        kind: SectionSlot,
        resource_name: impl Into<String>,
        id_style: IdStyle,
        actions: Vec<ActionSpec>,
    ) -> Self {
        Self {
            kind,
            resource_name: Some(resource_name.into()),
            id_style,
            actions,
        }
    }

    /// The normalized resource noun, or `MissingResourceName` for resource
    /// slots that lack one.
    pub fn resource_name(&self) -> Result<&str> {
        self.resource_name
            .as_deref()
            .ok_or(Error::MissingResourceName(self.kind))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDefinition {
    pub module_id: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount: Option<String>,
    #[serde(default)]
    pub noun_style: NounStyle,
    pub sections: Vec<SectionSpec>,
}

impl ModuleDefinition {
    pub fn new(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            theme: String::new(),
            mount: None,
            noun_style: NounStyle::default(),
            sections: Vec::new(),
        }
    }

    pub fn theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    pub fn section(mut self, section: SectionSpec) -> Self {
        self.sections.push(section);
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Loads a definition, picking the decoder from the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&source),
            Some("json") => Self::from_json_str(&source),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    pub fn find_section(&self, slot: SectionSlot) -> Option<&SectionSpec> {
        self.sections.iter().find(|s| s.kind == slot)
    }

    /// Returns a copy with every name canonicalized.
    ///
    /// Resource nouns are pluralized under [`NounStyle::Plural`]. Action names
    /// in resource sections that alias a canonical verb, already have its
    /// method and item addressing, and do not sit beside the verb itself, are
    /// renamed to that verb.
    pub fn normalize(&self) -> Result<ModuleDefinition> {
        let mount = self
            .mount
            .as_deref()
            .map(normalize_mount)
            .transpose()?;

        let sections = self
            .sections
            .iter()
            .map(|section| {
                self.normalize_section(section)
                    .map_err(|e| e.in_section(section.kind))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ModuleDefinition {
            module_id: normalize(&self.module_id)?.into_string(),
            theme: self.theme.clone(),
            mount,
            noun_style: self.noun_style,
            sections,
        })
    }

    fn normalize_section(&self, section: &SectionSpec) -> Result<SectionSpec> {
        let resource_name = match &section.resource_name {
            Some(raw) => {
                let noun = normalize(raw)?;
                Some(match self.noun_style {
                    NounStyle::AsWritten => noun.into_string(),
                    NounStyle::Plural => plural_noun(&noun).into_string(),
                })
            }
            None => None,
        };

        let names = section
            .actions
            .iter()
            .map(|action| normalize(&action.name))
            .collect::<Result<Vec<_>>>()?;
        let actions = section
            .actions
            .iter()
            .zip(&names)
            .map(|(action, name)| {
                let name = if section.kind.is_resource() {
                    let canonical = canonical_action_for(name, action.method, action.needs_id);
                    // a verb declared verbatim leaves its aliases as custom actions
                    if canonical != *name && names.contains(&canonical) {
                        name.clone()
                    } else {
                        canonical
                    }
                } else {
                    name.clone()
                };
                ActionSpec {
                    name: name.into_string(),
                    ..action.clone()
                }
            })
            .collect();

        Ok(SectionSpec {
            kind: section.kind,
            resource_name,
            id_style: section.id_style,
            actions,
        })
    }

    /// Checks that every slot is declared exactly once and that resource
    /// names appear exactly where they are meaningful.
    pub fn validate_slots(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for section in &self.sections {
            if !seen.insert(section.kind) {
                return Err(Error::DuplicateSection(section.kind));
            }
            if section.kind.is_resource() {
                section.resource_name()?;
            } else if section.resource_name.is_some() {
                return Err(Error::convention(
                    section.kind,
                    "-",
                    "resourceName is only valid on resource sections",
                ));
            }
        }
        if let Some(missing) = SectionSlot::ALL.iter().find(|slot| !seen.contains(*slot)) {
            return Err(Error::MissingSection(*missing));
        }
        Ok(())
    }

    /// The module layout the corpus generator scripts stamp out: a primary
    /// resource with `process`, two plain CRUD secondaries, and the fixed
    /// dashboard/analytics/settings/utilities vocabulary.
    pub fn series_template(
        module_id: impl Into<String>,
        primary: &str,
        secondary_a: &str,
        secondary_b: &str,
    ) -> Self {
        let crud = |extra: Vec<ActionSpec>| {
            let mut actions = vec![
                ActionSpec::get("list"),
                ActionSpec::get("detail").with_id(),
                ActionSpec::post("create"),
                ActionSpec::put("update").with_id(),
            ];
            actions.extend(extra);
            actions
        };

        ModuleDefinition::new(module_id)
            .section(SectionSpec::new(
                SectionSlot::Dashboard,
                ["dashboard", "summary", "metrics", "recent", "alerts"]
                    .into_iter()
                    .map(ActionSpec::get)
                    .collect(),
            ))
            .section(SectionSpec::resource(
                SectionSlot::PrimaryResource,
                primary,
                IdStyle::PathParam,
                crud(vec![
                    ActionSpec::delete("delete").with_id(),
                    ActionSpec::post("process").with_id(),
                ]),
            ))
            .section(SectionSpec::resource(
                SectionSlot::SecondaryResourceA,
                secondary_a,
                IdStyle::PathParam,
                crud(Vec::new()),
            ))
            .section(SectionSpec::resource(
                SectionSlot::SecondaryResourceB,
                secondary_b,
                IdStyle::PathParam,
                crud(Vec::new()),
            ))
            .section(SectionSpec::new(
                SectionSlot::Analytics,
                ["analytics", "overview", "trends"]
                    .into_iter()
                    .map(ActionSpec::get)
                    .collect(),
            ))
            .section(SectionSpec::new(
                SectionSlot::Settings,
                vec![ActionSpec::get("get"), ActionSpec::put("put")],
            ))
            .section(SectionSpec::new(
                SectionSlot::Utilities,
                vec![
                    ActionSpec::get("health"),
                    ActionSpec::get("export"),
                    ActionSpec::post("import"),
                    ActionSpec::post("sync"),
                ],
            ))
    }
}

fn normalize_mount(raw: &str) -> Result<String> {
    let segments = raw
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| naming::normalize(segment).map(String::from))
        .collect::<Result<Vec<_>>>()?;
    if segments.is_empty() {
        return Err(Error::InvalidName {
            raw: raw.to_string(),
            reason: "mount path has no segments".to_string(),
        });
    }
    Ok(format!("/{}", segments.join("/")))
}

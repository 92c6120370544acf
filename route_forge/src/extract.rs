//! Reverse-extracts observed routes from existing modules so they can be
//! checked against their canonical table.

use crate::error::{Error, Result};
use crate::naming::normalize;
use crate::route::{HandlerKey, RouteDescriptor};
use crate::schema::{HttpMethod, ModuleDefinition, SectionKind, SectionSlot};
use std::path::Path;
use tracing::debug;

/// Loads observed routes from a JSON descriptor array or an Express router
/// source (`.ts`/`.js`).
pub fn load_observed(path: impl AsRef<Path>, def: &ModuleDefinition) -> Result<Vec<RouteDescriptor>> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(serde_json::from_str(&source)?),
        Some("ts") | Some("js") => Ok(extract_routes(&source, def)),
        _ => Err(Error::UnsupportedFormat(path.display().to_string())),
    }
}

/// Scans `router.<method>('<path>'` registrations.
///
/// The family of each route comes from the `section: '…', action: '…'`
/// literal of its stub body when there is one, and is otherwise inferred
/// from the path shape using the resource names `def` declares.
pub fn extract_routes(source: &str, def: &ModuleDefinition) -> Vec<RouteDescriptor> {
    let context = Context::new(def);
    let mut routes = Vec::new();
    let mut pending: Option<Pending> = None;

    for (line_no, line) in source.lines().enumerate() {
        if let Some((method, path)) = parse_registration(line) {
            if let Some(done) = pending.take() {
                routes.extend(context.resolve(done));
            }
            pending = Some(Pending {
                line: line_no + 1,
                method,
                path,
                literal: None,
            });
        }
        if let Some(current) = pending.as_mut() {
            if current.literal.is_none() {
                current.literal = parse_stub_literal(line);
            }
        }
    }
    if let Some(done) = pending.take() {
        routes.extend(context.resolve(done));
    }
    routes
}

struct Pending {
    line: usize,
    method: HttpMethod,
    path: String,
    literal: Option<(String, String)>,
}

struct Context {
    module_id: String,
    resources: Vec<String>,
    dashboard_root: String,
    analytics_root: String,
    settings: Vec<String>,
}

impl Context {
    fn new(def: &ModuleDefinition) -> Self {
        let def = def.normalize().unwrap_or_else(|_| def.clone());
        let first_action = |slot: SectionSlot, fallback: &str| {
            def.find_section(slot)
                .and_then(|s| s.actions.first())
                .map(|a| a.name.clone())
                .unwrap_or_else(|| fallback.to_string())
        };
        let settings = def
            .find_section(SectionSlot::Settings)
            .map(|s| s.actions.iter().map(|a| a.name.clone()).collect())
            .unwrap_or_else(|| vec!["get".to_string(), "put".to_string()]);

        Self {
            module_id: def.module_id.clone(),
            resources: def
                .sections
                .iter()
                .filter_map(|s| s.resource_name.clone())
                .collect(),
            dashboard_root: first_action(SectionSlot::Dashboard, "dashboard"),
            analytics_root: first_action(SectionSlot::Analytics, "analytics"),
            settings,
        }
    }

    fn resolve(&self, pending: Pending) -> Option<RouteDescriptor> {
        let path = clean_path(&pending.path);
        let key = match &pending.literal {
            Some((section, action)) => self.from_literal(pending.method, section, action),
            None => self.from_path(pending.method, &path),
        };
        match key {
            Some(key) => Some(RouteDescriptor::new(path, pending.method, key)),
            None => {
                debug!(line = pending.line, method = %pending.method, path = %pending.path, "skipping route with no recognizable family");
                None
            }
        }
    }

    fn key(&self, kind: SectionKind, resource: Option<&str>, action: &str) -> HandlerKey {
        HandlerKey::new(&self.module_id, kind, resource, action)
    }

    /// GET and PUT land on the declared settings actions; any other method
    /// keeps `fallback` so the checker reports it as extra.
    fn settings_key(&self, method: HttpMethod, fallback: &str) -> HandlerKey {
        let index = match method {
            HttpMethod::Get => Some(0),
            HttpMethod::Put => Some(1),
            _ => None,
        };
        let action = index
            .and_then(|i| self.settings.get(i))
            .map_or(fallback, String::as_str);
        self.key(SectionKind::Settings, None, action)
    }

    fn from_literal(&self, method: HttpMethod, section: &str, action: &str) -> Option<HandlerKey> {
        let section = normalize(section).ok()?;
        let action = normalize(action).ok()?;
        let key = match section.as_str() {
            "dashboard" => self.key(SectionKind::Dashboard, None, &action),
            "analytics" => self.key(SectionKind::Analytics, None, &action),
            "utilities" => self.key(SectionKind::Utilities, None, &action),
            "settings" => self.settings_key(method, &action),
            resource => self.key(SectionKind::Resource, Some(resource), &action),
        };
        Some(key)
    }

    /// Aliases are left as written; the checker resolves them against the
    /// expected table.
    fn resource_key(&self, resource: &str, action: &str) -> Option<HandlerKey> {
        let token = normalize(action).ok()?;
        Some(self.key(SectionKind::Resource, Some(resource), &token))
    }

    fn from_path(&self, method: HttpMethod, path: &str) -> Option<HandlerKey> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            ["dashboard"] => Some(self.key(SectionKind::Dashboard, None, &self.dashboard_root)),
            ["dashboard", action] => Some(self.key(SectionKind::Dashboard, None, action)),
            ["analytics"] => Some(self.key(SectionKind::Analytics, None, &self.analytics_root)),
            ["analytics", action] => Some(self.key(SectionKind::Analytics, None, action)),
            ["settings"] => Some(self.settings_key(method, &method_action(method))),
            [resource, rest @ ..] if self.resources.iter().any(|r| r == resource) => {
                match rest {
                    [] => match method {
                        HttpMethod::Get => self.resource_key(resource, "list"),
                        HttpMethod::Post => self.resource_key(resource, "create"),
                        other => self.resource_key(resource, &method_action(other)),
                    },
                    [param] if is_param(param) => match method {
                        HttpMethod::Get => self.resource_key(resource, "detail"),
                        HttpMethod::Put | HttpMethod::Patch => self.resource_key(resource, "update"),
                        HttpMethod::Delete => self.resource_key(resource, "delete"),
                        HttpMethod::Post => self.resource_key(resource, &method_action(method)),
                    },
                    ["detail", ..] => self.resource_key(resource, "detail"),
                    [param, action] if is_param(param) => self.resource_key(resource, action),
                    [action] | [action, _] if !is_param(action) => self.resource_key(resource, action),
                    _ => None,
                }
            }
            [action] if !is_param(action) => Some(self.key(SectionKind::Utilities, None, action)),
            _ => None,
        }
    }
}

/// Action name for a route whose method has no conventional action, e.g.
/// `post` for `POST /listings/:id`.
fn method_action(method: HttpMethod) -> String {
    method.as_str().to_ascii_lowercase()
}

fn is_param(segment: &str) -> bool {
    segment.starts_with(':')
}

fn clean_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// `router.get('/listings/:id', ...` → `(GET, "/listings/:id")`
fn parse_registration(line: &str) -> Option<(HttpMethod, String)> {
    let start = line.find("router.")? + "router.".len();
    let rest = &line[start..];
    let open = rest.find('(')?;
    let method: HttpMethod = rest[..open].trim().parse().ok()?;
    let path = quoted(&rest[open + 1..])?;
    Some((method, path.to_string()))
}

/// `res.json({ section: 'metrics', action: 'detail' })` → `("metrics", "detail")`
fn parse_stub_literal(line: &str) -> Option<(String, String)> {
    let section = after_key(line, "section:")?;
    let action = after_key(line, "action:")?;
    Some((section.to_string(), action.to_string()))
}

fn after_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let start = line.find(key)? + key.len();
    quoted(&line[start..])
}

/// The contents of the first quoted string at the start of `text`, ignoring
/// leading whitespace.
fn quoted(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let quote = text.chars().next().filter(|c| matches!(c, '\'' | '"' | '`'))?;
    let body = &text[1..];
    let end = body.find(quote)?;
    Some(&body[..end])
}

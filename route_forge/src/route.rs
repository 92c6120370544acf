use crate::error::Error;
use crate::schema::{HttpMethod, SectionKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier binding a generated route to a caller-supplied handler:
/// `moduleId/kind/resourceName?/action`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HandlerKey {
    pub module_id: String,
    pub kind: SectionKind,
    pub resource: Option<String>,
    pub action: String,
}

/// A handler key with the module id dropped. Two modules following the same
/// convention produce the same families.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandlerFamily {
    pub kind: SectionKind,
    pub resource: Option<String>,
    pub action: String,
}

impl HandlerKey {
    pub fn new(
        module_id: impl Into<String>,
        kind: SectionKind,
        resource: Option<&str>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            kind,
            resource: resource.map(str::to_string),
            action: action.into(),
        }
    }

    pub fn family(&self) -> HandlerFamily {
        HandlerFamily {
            kind: self.kind,
            resource: self.resource.clone(),
            action: self.action.clone(),
        }
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource {
            Some(resource) => write!(f, "{}/{}/{}/{}", self.module_id, self.kind, resource, self.action),
            None => write!(f, "{}/{}/{}", self.module_id, self.kind, self.action),
        }
    }
}

impl FromStr for HandlerKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::InvalidHandlerKey {
            key: s.to_string(),
            reason: reason.to_string(),
        };
        let parts: Vec<&str> = s.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("empty segment"));
        }
        let kind = |raw: &str| SectionKind::from_str(raw).map_err(|e| invalid(&e));

        match parts.as_slice() {
            [module, kind_raw, action] => {
                let kind = kind(*kind_raw)?;
                if kind == SectionKind::Resource {
                    return Err(invalid("resource keys need a resource segment"));
                }
                Ok(HandlerKey::new(*module, kind, None, *action))
            }
            [module, kind_raw, resource, action] => {
                let kind = kind(*kind_raw)?;
                if kind != SectionKind::Resource {
                    return Err(invalid("only resource keys carry a resource segment"));
                }
                Ok(HandlerKey::new(*module, kind, Some(*resource), *action))
            }
            _ => Err(invalid("expected module/kind/action or module/resource/name/action")),
        }
    }
}

impl TryFrom<String> for HandlerKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HandlerKey> for String {
    fn from(key: HandlerKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for HandlerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource {
            Some(resource) => write!(f, "{}/{}/{}", self.kind, resource, self.action),
            None => write!(f, "{}/{}", self.kind, self.action),
        }
    }
}

/// One compiled endpoint. Paths are relative to the module mount and use
/// `:id` for the item parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
    pub path: String,
    pub method: HttpMethod,
    pub handler_key: HandlerKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_shape: Option<String>,
}

impl RouteDescriptor {
    pub fn new(path: impl Into<String>, method: HttpMethod, handler_key: HandlerKey) -> Self {
        Self {
            path: path.into(),
            method,
            handler_key,
            response_shape: None,
        }
    }

    pub fn section(&self) -> SectionKind {
        self.handler_key.kind
    }
}

impl fmt::Display for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<6} {:<36} -> {}", self.method, self.path, self.handler_key)
    }
}

/// The ordered route list of one compiled module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTable {
    pub module_id: String,
    pub theme: String,
    pub mount: String,
    pub routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter()
    }

    pub fn find(&self, method: HttpMethod, path: &str) -> Option<&RouteDescriptor> {
        self.routes
            .iter()
            .find(|route| route.method == method && route.path == path)
    }

    pub fn handler_keys(&self) -> impl Iterator<Item = &HandlerKey> {
        self.routes.iter().map(|route| &route.handler_key)
    }
}

impl fmt::Display for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} routes, mounted at {})", self.module_id, self.len(), self.mount)?;
        for route in &self.routes {
            writeln!(f, "  {route}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_key_display_and_parse() {
        let key = HandlerKey::new(
            "inventory-auto-reorder",
            SectionKind::Resource,
            Some("allocations"),
            "bulk-allocate",
        );
        let text = key.to_string();
        assert_eq!(text, "inventory-auto-reorder/resource/allocations/bulk-allocate");
        assert_eq!(text.parse::<HandlerKey>().unwrap(), key);

        let dash: HandlerKey = "inventory-auto-reorder/dashboard/summary".parse().unwrap();
        assert_eq!(dash.kind, SectionKind::Dashboard);
        assert_eq!(dash.resource, None);
    }

    #[test]
    fn test_handler_key_rejects_bad_shapes() {
        for bad in [
            "m/resource/list",
            "m/dashboard/x/summary",
            "m/widgets/list",
            "m//list",
            "m",
        ] {
            assert!(bad.parse::<HandlerKey>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_descriptor_json_shape() {
        let route = RouteDescriptor::new(
            "/listings/:id/analyze",
            HttpMethod::Post,
            "m/resource/listings/analyze".parse().unwrap(),
        );
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "path": "/listings/:id/analyze",
                "method": "POST",
                "handlerKey": "m/resource/listings/analyze"
            })
        );
        let back: RouteDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, route);
    }
}

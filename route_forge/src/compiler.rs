//! Turns a [`ModuleDefinition`] into its canonical [`RouteTable`].

use crate::error::{Error, Result};
use crate::naming;
use crate::route::{RouteDescriptor, RouteTable};
use crate::schema::{HttpMethod, ModuleDefinition, SectionSlot};
use crate::sections;
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_API_PREFIX: &str = "/api";

/// Compiles definitions. The only knob is the prefix used to derive a mount
/// for definitions that do not declare one.
#[derive(Debug, Clone)]
pub struct Compiler {
    api_prefix: String,
}

impl Default for Compiler {
    fn default() -> Self {
        Self {
            api_prefix: DEFAULT_API_PREFIX.to_string(),
        }
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_prefix(prefix: impl AsRef<str>) -> Self {
        let trimmed = prefix.as_ref().trim().trim_matches('/');
        let api_prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };
        Self { api_prefix }
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    /// Normalizes `def`, validates its slots and runs every section
    /// generator in slot order.
    ///
    /// Errors are wrapped in [`Error::Compile`] with the module id.
    pub fn compile(&self, def: &ModuleDefinition) -> Result<RouteTable> {
        self.compile_normalized(def).map_err(|e| {
            let module_id = naming::normalize(&def.module_id)
                .map(String::from)
                .unwrap_or_else(|_| def.module_id.clone());
            e.in_module(module_id)
        })
    }

    fn compile_normalized(&self, def: &ModuleDefinition) -> Result<RouteTable> {
        let def = def.normalize()?;
        def.validate_slots()?;

        let mut routes = Vec::new();
        for slot in SectionSlot::ALL {
            let section = def.find_section(slot).ok_or(Error::MissingSection(slot))?;
            let generated = sections::generate(&def.module_id, section)?;
            debug!(module = %def.module_id, section = %slot, routes = generated.len(), "generated section");
            routes.extend(generated);
        }
        detect_collisions(&routes)?;

        let mount = def
            .mount
            .clone()
            .unwrap_or_else(|| format!("{}/{}", self.api_prefix, def.module_id));
        debug!(module = %def.module_id, %mount, routes = routes.len(), "compiled module");

        Ok(RouteTable {
            module_id: def.module_id,
            theme: def.theme,
            mount,
            routes,
        })
    }
}

/// Compiles with the default `/api` prefix.
pub fn compile(def: &ModuleDefinition) -> Result<RouteTable> {
    Compiler::default().compile(def)
}

fn detect_collisions(routes: &[RouteDescriptor]) -> Result<()> {
    let mut seen: HashMap<(&str, HttpMethod), &RouteDescriptor> = HashMap::new();
    for route in routes {
        if let Some(first) = seen.insert((route.path.as_str(), route.method), route) {
            return Err(Error::RouteCollision {
                first: Box::new(first.clone()),
                second: Box::new(route.clone()),
            });
        }
    }
    Ok(())
}

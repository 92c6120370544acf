//! Binds a compiled route table to handlers.

use crate::error::{Error, Result};
use crate::handler::{Handler, HandlerMap};
use crate::route::{HandlerKey, RouteTable};
use crate::schema::HttpMethod;
use serde::Serialize;
use std::fmt;
use tracing::info;

pub struct EmittedRoute {
    pub method: HttpMethod,
    pub path: String,
    pub handler_key: HandlerKey,
    pub handler: Handler,
}

impl fmt::Debug for EmittedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmittedRoute")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handler_key", &self.handler_key)
            .finish()
    }
}

/// A module whose every route is bound. Framework adapters consume this.
#[derive(Debug)]
pub struct EmittedModule {
    pub module_id: String,
    pub mount: String,
    pub routes: Vec<EmittedRoute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub method: HttpMethod,
    pub path: String,
    pub handler_key: HandlerKey,
}

impl EmittedModule {
    /// The `(method, path, handlerKey)` triples in route order.
    pub fn manifest(&self) -> Vec<ManifestEntry> {
        self.routes
            .iter()
            .map(|route| ManifestEntry {
                method: route.method,
                path: route.path.clone(),
                handler_key: route.handler_key.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Binds every route of `table` to its handler.
///
/// All or nothing: if any key is unbound, no module is produced and the
/// error lists every unbound key, sorted.
pub fn emit(table: &RouteTable, handlers: &HandlerMap) -> Result<EmittedModule> {
    let mut unbound: Vec<HandlerKey> = table
        .handler_keys()
        .filter(|key| !handlers.contains(key))
        .cloned()
        .collect();
    if !unbound.is_empty() {
        unbound.sort();
        unbound.dedup();
        return Err(Error::UnboundHandler {
            module_id: table.module_id.clone(),
            keys: unbound,
        });
    }

    let routes = table
        .iter()
        .filter_map(|route| {
            handlers.get(&route.handler_key).map(|handler| EmittedRoute {
                method: route.method,
                path: route.path.clone(),
                handler_key: route.handler_key.clone(),
                handler: handler.clone(),
            })
        })
        .collect::<Vec<_>>();

    info!(module = %table.module_id, mount = %table.mount, routes = routes.len(), "emitted module");
    Ok(EmittedModule {
        module_id: table.module_id.clone(),
        mount: table.mount.clone(),
        routes,
    })
}

use crate::error::{Error, Result};
use crate::route::{HandlerKey, RouteTable};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type HandlerResult = std::result::Result<Value, HandlerError>;

pub type DynHandlerFuture = BoxFuture<'static, HandlerResult>;

/// Opaque request-in/response-out capability bound to one handler key. The
/// request is the merged JSON of path params, query string and body.
pub type Handler = Arc<dyn Fn(Value) -> DynHandlerFuture + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Wraps an async closure as a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |request| -> DynHandlerFuture { Box::pin(f(request)) })
}

/// Link-time registration emitted by `#[handler("...")]`.
pub struct HandlerInventory {
    pub key: &'static str,
    pub handler: fn(Value) -> DynHandlerFuture,
}

inventory::collect!(HandlerInventory);

/// Caller-owned binding of handler keys to handlers.
#[derive(Clone, Default)]
pub struct HandlerMap {
    handlers: HashMap<HandlerKey, Handler>,
}

impl HandlerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key`, returning the handler it replaces.
    pub fn insert(&mut self, key: HandlerKey, handler: Handler) -> Option<Handler> {
        self.handlers.insert(key, handler)
    }

    /// Builder-style [`insert`](Self::insert) for async closures.
    pub fn with<F, Fut>(mut self, key: HandlerKey, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.insert(key, handler_fn(f));
        self
    }

    pub fn get(&self, key: &HandlerKey) -> Option<&Handler> {
        self.handlers.get(key)
    }

    pub fn contains(&self, key: &HandlerKey) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn remove(&mut self, key: &HandlerKey) -> Option<Handler> {
        self.handlers.remove(key)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &HandlerKey> {
        self.handlers.keys()
    }

    /// Collects every handler registered with `#[handler]` in the binary.
    pub fn from_inventory() -> Result<Self> {
        let mut map = Self::new();
        for registered in inventory::iter::<HandlerInventory> {
            let key: HandlerKey = registered.key.parse()?;
            let registered_fn = registered.handler;
            if map.insert(key, Arc::new(registered_fn)).is_some() {
                return Err(Error::InvalidHandlerKey {
                    key: registered.key.to_string(),
                    reason: "registered more than once".to_string(),
                });
            }
            debug!(key = registered.key, "discovered handler");
        }
        Ok(map)
    }

    /// Placeholder handlers for every route of `table`, answering
    /// `{"section": ..., "action": ...}` where the section is the resource
    /// noun for resource routes and the section kind otherwise.
    pub fn stubs_for(table: &RouteTable) -> Self {
        let mut map = Self::new();
        for key in table.handler_keys() {
            let section = key
                .resource
                .clone()
                .unwrap_or_else(|| key.kind.to_string());
            let body = json!({ "section": section, "action": key.action });
            map.insert(
                key.clone(),
                handler_fn(move |_request| {
                    let body = body.clone();
                    async move { Ok(body) }
                }),
            );
        }
        map
    }
}

impl Extend<(HandlerKey, Handler)> for HandlerMap {
    fn extend<T: IntoIterator<Item = (HandlerKey, Handler)>>(&mut self, iter: T) {
        self.handlers.extend(iter);
    }
}

impl std::fmt::Debug for HandlerMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.handlers.keys().map(|k| k.to_string()).collect();
        keys.sort();
        f.debug_struct("HandlerMap").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::schema::ModuleDefinition;

    #[tokio::test]
    async fn test_stub_handlers_echo_their_family() {
        let table = compile(&ModuleDefinition::series_template("m", "listings", "tags", "audits")).unwrap();
        let stubs = HandlerMap::stubs_for(&table);
        assert_eq!(stubs.len(), table.len());

        let key: HandlerKey = "m/resource/listings/process".parse().unwrap();
        let response = (stubs.get(&key).unwrap())(json!({"id": "7"})).await.unwrap();
        assert_eq!(response, json!({"section": "listings", "action": "process"}));

        let key: HandlerKey = "m/settings/get".parse().unwrap();
        let response = (stubs.get(&key).unwrap())(Value::Null).await.unwrap();
        assert_eq!(response, json!({"section": "settings", "action": "get"}));
    }

    #[tokio::test]
    async fn test_closure_handlers_see_the_request() {
        let key: HandlerKey = "m/utilities/echo".parse().unwrap();
        let map = HandlerMap::new().with(key.clone(), |request| async move {
            match request.get("name") {
                Some(name) => Ok(json!({ "hello": name })),
                None => Err(HandlerError::BadRequest("name is required".into())),
            }
        });
        let handler = map.get(&key).unwrap();
        assert_eq!(
            handler(json!({"name": "kit"})).await.unwrap(),
            json!({"hello": "kit"})
        );
        assert!(matches!(
            handler(json!({})).await,
            Err(HandlerError::BadRequest(_))
        ));
    }
}

use crate::emitter::EmittedModule;
use crate::error::{Error, Result};
use crate::handler::{Handler, HandlerError};
use crate::schema::HttpMethod;
use axum::{
    body::Body,
    extract::{FromRequestParts, Path},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, on, MethodFilter, MethodRouter},
    Json, Router,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use utoipa::openapi::OpenApi;

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = match &self {
            HandlerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HandlerError::NotFound(_) => StatusCode::NOT_FOUND,
            HandlerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Path params, query string and JSON body merged into one object; later
/// sources win on key clashes.
async fn extract_and_merge_params(req: Request<Body>) -> std::result::Result<Value, Response> {
    let (mut parts, body) = req.into_parts();

    let path_params: HashMap<String, String> =
        match Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await {
            Ok(path) => path.0,
            Err(e) => return Err(e.into_response()),
        };
    let mut merged = serde_json::Map::new();
    for (k, v) in path_params {
        merged.insert(k, Value::String(v));
    }

    if let Some(query_str) = parts.uri.query() {
        if let Ok(pairs) = serde_urlencoded::from_str::<Vec<(String, String)>>(query_str) {
            for (k, v) in pairs {
                merged.insert(k, query_value(v));
            }
        }
    }

    let is_json = parts
        .headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));
    if is_json {
        let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to read request body: {}", e),
                )
                    .into_response())
            }
        };
        if !body_bytes.is_empty() {
            match serde_json::from_slice::<Value>(&body_bytes) {
                Ok(Value::Object(body_obj)) => merged.extend(body_obj),
                Ok(other) => {
                    merged.insert("body".to_string(), other);
                }
                Err(e) => {
                    return Err(HandlerError::BadRequest(format!("invalid JSON body: {e}")).into_response())
                }
            }
        }
    }

    Ok(Value::Object(merged))
}

fn query_value(raw: String) -> Value {
    if let Ok(n) = raw.parse::<f64>() {
        serde_json::json!(n)
    } else if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false") {
        Value::Bool(raw.eq_ignore_ascii_case("true"))
    } else {
        Value::String(raw)
    }
}

/// `/listings/:id/analyze` → `/listings/{id}/analyze`
pub fn to_axum_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Delete => MethodFilter::DELETE,
        HttpMethod::Patch => MethodFilter::PATCH,
    }
}

fn route_handler(handler: Handler) -> impl Fn(Request<Body>) -> crate::handler::BoxFuture<'static, Response> + Clone + Send + Sync + 'static {
    move |req: Request<Body>| {
        let handler = handler.clone();
        Box::pin(async move {
            match extract_and_merge_params(req).await {
                Ok(params) => match handler(params).await {
                    Ok(value) => Json(value).into_response(),
                    Err(e) => e.into_response(),
                },
                Err(response) => response,
            }
        })
    }
}

/// Mounts emitted modules on an `axum::Router`, each nested under its mount.
#[derive(Default)]
pub struct RestRouterBuilder {
    modules: Vec<EmittedModule>,
    openapi: Option<OpenApi>,
}

impl RestRouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, module: EmittedModule) -> Self {
        self.modules.push(module);
        self
    }

    pub fn modules(mut self, modules: impl IntoIterator<Item = EmittedModule>) -> Self {
        self.modules.extend(modules);
        self
    }

    /// Also serve `openapi` at `/openapi.json`.
    pub fn openapi(mut self, openapi: OpenApi) -> Self {
        self.openapi = Some(openapi);
        self
    }

    pub fn build(self) -> Result<Router> {
        let mut mounts = HashSet::new();
        let mut router = Router::new();

        for module in self.modules {
            if !mounts.insert(module.mount.clone()) {
                return Err(Error::DuplicateMount(module.mount));
            }

            // One MethodRouter per path, in first-seen order.
            let mut order: Vec<String> = Vec::new();
            let mut by_path: HashMap<String, MethodRouter> = HashMap::new();
            for route in module.routes {
                let path = to_axum_path(&route.path);
                let method_router = match by_path.remove(&path) {
                    Some(existing) => existing.on(method_filter(route.method), route_handler(route.handler)),
                    None => {
                        order.push(path.clone());
                        on(method_filter(route.method), route_handler(route.handler))
                    }
                };
                by_path.insert(path, method_router);
            }

            let mut module_router = Router::new();
            for path in order {
                if let Some(method_router) = by_path.remove(&path) {
                    module_router = module_router.route(&path, method_router);
                }
            }
            debug!(module = %module.module_id, mount = %module.mount, "mounted module");
            router = router.nest(&module.mount, module_router);
        }

        if let Some(openapi) = self.openapi {
            router = router.route(
                "/openapi.json",
                get(move || {
                    let openapi = openapi.clone();
                    async move { Json(openapi) }
                }),
            );
        }
        Ok(router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_axum_path() {
        assert_eq!(to_axum_path("/listings/:id/analyze"), "/listings/{id}/analyze");
        assert_eq!(to_axum_path("/listings/:id"), "/listings/{id}");
        assert_eq!(to_axum_path("/dashboard/summary"), "/dashboard/summary");
    }

    #[test]
    fn test_query_values_are_typed() {
        assert_eq!(query_value("42".into()), serde_json::json!(42.0));
        assert_eq!(query_value("TRUE".into()), Value::Bool(true));
        assert_eq!(query_value("sku-1".into()), Value::String("sku-1".into()));
    }
}

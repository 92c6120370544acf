#![cfg(feature = "macros")]

use route_forge::serde_json::{json, Value};
use route_forge::{emit, HandlerError, HandlerKey, HandlerMap, HandlerResult, RouteDescriptor, RouteTable};
use route_forge::HttpMethod;

#[route_forge::handler("inventory-auto-reorder/resource/reorder-rules/toggle")]
async fn toggle_rule(request: Value) -> HandlerResult {
    let id = request["id"]
        .as_str()
        .ok_or_else(|| HandlerError::BadRequest("missing id".to_string()))?;
    Ok(json!({ "id": id, "enabled": true }))
}

#[route_forge::handler("inventory-auto-reorder/utilities/health")]
async fn health(_request: Value) -> HandlerResult {
    Ok(json!({ "status": "ok" }))
}

fn key(raw: &str) -> HandlerKey {
    raw.parse().unwrap()
}

#[tokio::test]
async fn test_inventory_collects_annotated_handlers() {
    let handlers = HandlerMap::from_inventory().unwrap();
    assert_eq!(handlers.len(), 2);

    let toggle = handlers
        .get(&key("inventory-auto-reorder/resource/reorder-rules/toggle"))
        .unwrap();
    assert_eq!(
        toggle(json!({ "id": "42" })).await.unwrap(),
        json!({ "id": "42", "enabled": true })
    );
    assert!(matches!(
        toggle(json!({})).await,
        Err(HandlerError::BadRequest(_))
    ));

    let health = handlers.get(&key("inventory-auto-reorder/utilities/health")).unwrap();
    assert_eq!(health(Value::Null).await.unwrap(), json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_annotated_handlers_bind_on_emit() {
    let table = RouteTable {
        module_id: "inventory-auto-reorder".to_string(),
        theme: String::new(),
        mount: "/api/inventory-auto-reorder".to_string(),
        routes: vec![
            RouteDescriptor::new(
                "/reorder-rules/:id/toggle",
                HttpMethod::Post,
                key("inventory-auto-reorder/resource/reorder-rules/toggle"),
            ),
            RouteDescriptor::new("/health", HttpMethod::Get, key("inventory-auto-reorder/utilities/health")),
        ],
    };

    let module = emit(&table, &HandlerMap::from_inventory().unwrap()).unwrap();
    assert_eq!(module.len(), 2);
    let response = (module.routes[1].handler)(Value::Null).await.unwrap();
    assert_eq!(response["status"], "ok");
}

use crate::route::{RouteDescriptor, RouteTable};
use crate::schema::HttpMethod;
use utoipa::openapi::{self, Required, Schema};
use utoipa::openapi::path::{OperationBuilder, ParameterBuilder, ParameterIn};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::schema::{ObjectBuilder, Type};
use utoipa::openapi::tag::TagBuilder;

/// `/listings/:id/analyze` → `/listings/{id}/analyze`, plus the parameter names.
fn openapi_path(mount: &str, path: &str) -> (String, Vec<String>) {
    let mut params = Vec::new();
    let segments: Vec<String> = path
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => {
                params.push(name.to_string());
                format!("{{{name}}}")
            }
            None => segment.to_string(),
        })
        .collect();
    (format!("{}{}", mount.trim_end_matches('/'), segments.join("/")), params)
}

fn object_schema() -> openapi::RefOr<Schema> {
    openapi::RefOr::T(Schema::Object(ObjectBuilder::new().schema_type(Type::Object).build()))
}

fn operation(table: &RouteTable, route: &RouteDescriptor, params: &[String]) -> openapi::path::Operation {
    let key = route.handler_key.to_string();
    let mut operation_builder = OperationBuilder::new()
        .operation_id(Some(key.clone()))
        .summary(Some(route.handler_key.family().to_string()))
        .tag(table.module_id.clone());

    for name in params {
        let string_schema = openapi::RefOr::T(Schema::Object(ObjectBuilder::new().schema_type(Type::String).build()));
        let built_parameter = ParameterBuilder::new()
            .name(name)
            .required(Required::True)
            .parameter_in(ParameterIn::Path)
            .schema(Some(string_schema))
            .build();
        operation_builder = operation_builder.parameter(built_parameter);
    }

    if matches!(route.method, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch) {
        let request_body = RequestBodyBuilder::new()
            .required(Some(Required::False))
            .content(
                "application/json",
                openapi::ContentBuilder::new().schema(Some(object_schema())).build(),
            )
            .build();
        operation_builder = operation_builder.request_body(Some(request_body));
    }

    let description = match &route.response_shape {
        Some(shape) => format!("`{shape}` response"),
        None => "OK".to_string(),
    };
    let response = openapi::ResponseBuilder::new()
        .description(description)
        .content(
            "application/json",
            openapi::ContentBuilder::new().schema(Some(object_schema())).build(),
        )
        .build();
    operation_builder = operation_builder.responses(
        openapi::ResponsesBuilder::new().response("200", response).build(),
    );

    operation_builder.build()
}

/// Renders compiled route tables as one OpenAPI document: an operation per
/// route, `operationId` = handler key, tagged with the module id.
pub fn build_openapi(tables: &[RouteTable], title: &str, version: &str) -> openapi::OpenApi {
    let mut openapi = openapi::OpenApiBuilder::new()
        .info(openapi::InfoBuilder::new().title(title).version(version).build())
        .paths(openapi::Paths::new())
        .build();

    let mut tags = Vec::new();
    for table in tables {
        let mut tag = TagBuilder::new().name(table.module_id.clone());
        if !table.theme.is_empty() {
            tag = tag.description(Some(format!("theme: {}", table.theme)));
        }
        tags.push(tag.build());

        for route in table.iter() {
            let (path, params) = openapi_path(&table.mount, &route.path);
            let operation = operation(table, route, &params);
            let path_item = openapi.paths.paths.entry(path).or_default();
            match route.method {
                HttpMethod::Get => path_item.get = Some(operation),
                HttpMethod::Post => path_item.post = Some(operation),
                HttpMethod::Put => path_item.put = Some(operation),
                HttpMethod::Delete => path_item.delete = Some(operation),
                HttpMethod::Patch => path_item.patch = Some(operation),
            }
        }
    }
    openapi.tags = Some(tags);

    openapi
}

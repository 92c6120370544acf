extern crate proc_macro;

use heck::ToKebabCase;
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, Error, ItemFn, LitStr};

const SECTION_KINDS: [&str; 5] = ["dashboard", "resource", "analytics", "settings", "utilities"];

/// Registers an async function as the handler bound to a route_forge handler key.
///
/// ```ignore
/// /// Recomputes reorder points for one rule.
/// #[handler("inventory-auto-reorder/resource/reorder-rules/process")]
/// async fn process_rule(request: Value) -> HandlerResult {
///     Ok(json!({ "id": request["id"] }))
/// }
/// ```
///
/// The key is validated at compile time: `module/kind/action` for singleton
/// sections, `module/resource/<noun>/action` for resources, every segment in
/// kebab case. The function must be `async fn(serde_json::Value) ->
/// route_forge::HandlerResult`; it is collected into the link-time inventory
/// that `HandlerMap::from_inventory()` reads.
#[proc_macro_attribute]
pub fn handler(args: TokenStream, input: TokenStream) -> TokenStream {
    let key = parse_macro_input!(args as LitStr);
    let item = parse_macro_input!(input as ItemFn);

    match expand(&key, &item) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(key: &LitStr, item: &ItemFn) -> syn::Result<proc_macro2::TokenStream> {
    validate_key(&key.value()).map_err(|reason| Error::new(key.span(), reason))?;

    if item.sig.asyncness.is_none() {
        return Err(Error::new(item.sig.fn_token.span(), "#[handler] functions must be async"));
    }
    if item.sig.inputs.len() != 1 {
        return Err(Error::new(
            item.sig.inputs.span(),
            "#[handler] functions take exactly one `serde_json::Value` argument",
        ));
    }
    if !item.sig.generics.params.is_empty() {
        return Err(Error::new(item.sig.generics.span(), "#[handler] functions cannot be generic"));
    }

    let fn_name = &item.sig.ident;
    let wrapper = format_ident!("__route_forge_handler_{}", fn_name);

    Ok(quote! {
        #item

        #[doc(hidden)]
        fn #wrapper(
            request: ::route_forge::serde_json::Value,
        ) -> ::route_forge::handler::DynHandlerFuture {
            ::std::boxed::Box::pin(#fn_name(request))
        }

        ::route_forge::inventory::submit! {
            ::route_forge::handler::HandlerInventory {
                key: #key,
                handler: #wrapper,
            }
        }
    })
}

fn validate_key(key: &str) -> Result<(), String> {
    let segments: Vec<&str> = key.split('/').collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(format!("handler key `{key}` has an empty segment"));
        }
        if segment.to_kebab_case() != *segment {
            return Err(format!(
                "segment `{segment}` of handler key `{key}` is not kebab case (expected `{}`)",
                segment.to_kebab_case()
            ));
        }
    }

    let kind = match segments.as_slice() {
        [_, kind, _] | [_, kind, _, _] => *kind,
        _ => {
            return Err(format!(
                "handler key `{key}` must be `module/kind/action` or `module/resource/<noun>/action`"
            ))
        }
    };
    if !SECTION_KINDS.contains(&kind) {
        return Err(format!(
            "unknown section kind `{kind}`, expected one of {}",
            SECTION_KINDS.join(", ")
        ));
    }
    match (kind, segments.len()) {
        ("resource", 3) => Err(format!("resource handler key `{key}` needs a resource segment")),
        (other, 4) if other != "resource" => {
            Err(format!("only resource handler keys carry a resource segment, `{key}` is `{other}`"))
        }
        _ => Ok(()),
    }
}

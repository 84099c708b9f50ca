use fxhash::FxHashSet;
use proc_macro2::{Span, TokenStream, TokenTree};
use quote::quote;
use syn::{Attribute, ItemFn, ItemStruct, LitStr};

const METHODS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];
const API_PREFIX: &str = "/api/v1/";
const SYSTEM_PATHS: &[&str] = &["/health"];

/// Expands `#[api_model]`: fills in the missing `Debug`, serde and `ToSchema` derives and
/// refuses unknown fields unless the struct already configures serde itself.
pub fn expand_api_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    if !args.is_empty() {
        return syn::Error::new_spanned(args, "api_model takes no arguments").to_compile_error();
    }
    let derives = derived_trait_names(&input.attrs);
    let deny_unknown = if serde_flag(&input.attrs, "deny_unknown_fields") {
        quote! {}
    } else {
        quote! { #[serde(deny_unknown_fields)] }
    };

    let mut missing = Vec::new();
    if !derives.contains("Debug") {
        missing.push(quote! { Debug });
    }
    if !derives.contains("Serialize") {
        missing.push(quote! { ::serde::Serialize });
    }
    if !derives.contains("Deserialize") {
        missing.push(quote! { ::serde::Deserialize });
    }
    let derive = if missing.is_empty() { quote! {} } else { quote! { #[derive(#(#missing),*)] } };
    let schema = if derives.contains("ToSchema") {
        quote! {}
    } else {
        quote! { #[cfg_attr(feature = "server", derive(::utoipa::ToSchema))] }
    };

    quote! {
        #derive
        #schema
        #deny_unknown
        #input
    }
}

/// Route facts `#[api_handler]` checks before handing the arguments to `utoipa::path`.
#[derive(Debug, Default)]
struct RouteArgs {
    methods: Vec<String>,
    path: Option<LitStr>,
    tagged: bool,
}

/// Splits `args` on top-level commas and records the method, `path` and `tag` entries.
fn route_args(args: TokenStream) -> RouteArgs {
    let mut route = RouteArgs::default();
    let mut segment: Vec<TokenTree> = Vec::new();
    for token in args.into_iter().chain(std::iter::once(TokenTree::Punct(proc_macro2::Punct::new(
        ',',
        proc_macro2::Spacing::Alone,
    )))) {
        if matches!(&token, TokenTree::Punct(p) if p.as_char() == ',') {
            inspect_segment(&segment, &mut route);
            segment.clear();
        } else {
            segment.push(token);
        }
    }
    route
}

fn inspect_segment(segment: &[TokenTree], route: &mut RouteArgs) {
    let Some(TokenTree::Ident(key)) = segment.first() else {
        return;
    };
    let key = key.to_string();
    match (key.as_str(), segment.get(1), segment.get(2)) {
        (method, None, None) if METHODS.contains(&method) => route.methods.push(key),
        ("tag", Some(TokenTree::Punct(eq)), Some(_)) if eq.as_char() == '=' => route.tagged = true,
        ("path", Some(TokenTree::Punct(eq)), Some(TokenTree::Literal(lit))) if eq.as_char() == '=' => {
            route.path = syn::parse2::<LitStr>(TokenTree::Literal(lit.clone()).into()).ok();
        },
        _ => {},
    }
}

fn check_route(route: &RouteArgs, span: Span) -> syn::Result<()> {
    if route.methods.len() != 1 {
        return Err(syn::Error::new(span, "api_handler needs exactly one HTTP method"));
    }
    let Some(path) = &route.path else {
        return Err(syn::Error::new(span, "api_handler needs `path = \"...\"`"));
    };
    let value = path.value();
    if !(value.starts_with(API_PREFIX) || SYSTEM_PATHS.contains(&value.as_str())) || value.ends_with('/') {
        return Err(syn::Error::new_spanned(
            path,
            format!("routes live under `{API_PREFIX}` without a trailing slash"),
        ));
    }
    if !route.tagged {
        return Err(syn::Error::new(span, "api_handler needs a `tag` so the route is grouped in the API reference"));
    }
    Ok(())
}

/// Expands `#[api_handler]`: checks the route arguments and forwards them to `utoipa::path`.
pub fn expand_api_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    if let Err(err) = check_route(&route_args(args.clone()), input.sig.ident.span()) {
        return err.to_compile_error();
    }
    let ItemFn { attrs, vis, sig, block } = &input;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[cfg_attr(feature = "server", ::utoipa::path(#args))]
        #vis #sig #block
    }
}

fn serde_flag(attrs: &[Attribute], flag: &str) -> bool {
    let mut found = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(flag) {
                found = true;
            } else if meta.input.peek(syn::Token![=]) {
                meta.value()?.parse::<syn::Expr>()?;
            }
            Ok(())
        });
    }
    found
}

fn derived_trait_names(attrs: &[Attribute]) -> FxHashSet<String> {
    let mut traits = FxHashSet::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(last) = meta.path.segments.last() {
                traits.insert(last.ident.to_string());
            }
            Ok(())
        });
    }
    traits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> ItemFn {
        syn::parse_quote! { pub async fn list() -> u32 { 0 } }
    }

    fn expand(args: TokenStream) -> String {
        expand_api_handler(args, handler()).to_string()
    }

    #[test]
    fn complete_routes_expand_to_utoipa_path() {
        let out = expand(quote! {
            post,
            path = "/api/v1/rocketfuel/collections/{key}/reorder",
            request_body = Vec<ListingId>,
            responses((status = OK, body = CollectionView)),
            tag = COLLECTIONS_TAG
        });
        assert!(out.contains("utoipa :: path"));
        assert!(!out.contains("compile_error"));
        assert!(!expand(quote! { get, path = "/health", tag = SYSTEM_TAG }).contains("compile_error"));
    }

    #[test]
    fn incomplete_routes_fail_to_compile() {
        assert!(expand(quote! { path = "/api/v1/apps/app", tag = LISTINGS_TAG }).contains("compile_error"));
        assert!(expand(quote! { get, put, path = "/api/v1/apps/app", tag = LISTINGS_TAG }).contains("compile_error"));
        assert!(expand(quote! { get, path = "/api/v1/apps/app" }).contains("compile_error"));
        assert!(expand(quote! { get, path = "/apps/app", tag = LISTINGS_TAG }).contains("compile_error"));
        assert!(expand(quote! { get, path = "/api/v1/apps/app/", tag = LISTINGS_TAG }).contains("compile_error"));
    }

    #[test]
    fn models_deny_unknown_fields_once() {
        let item: ItemStruct = syn::parse_quote! {
            #[derive(Clone)]
            pub struct TermsDecision { pub accept: bool }
        };
        let out = expand_api_model(TokenStream::new(), item).to_string();
        assert!(out.contains("deny_unknown_fields"));
        assert!(out.contains(":: serde :: Serialize"));

        let item: ItemStruct = syn::parse_quote! {
            #[derive(serde::Serialize, serde::Deserialize)]
            #[serde(default, deny_unknown_fields)]
            pub struct AccountForm { pub city: String }
        };
        let out = expand_api_model(TokenStream::new(), item).to_string();
        assert_eq!(out.matches("deny_unknown_fields").count(), 1);
        assert!(!out.contains(":: serde :: Serialize"));
    }

    #[test]
    fn models_take_no_arguments() {
        let item: ItemStruct = syn::parse_quote! { pub struct RatingsView { pub count: u32 } };
        assert!(expand_api_model(quote! { rename_all = "camelCase" }, item).to_string().contains("compile_error"));
    }
}

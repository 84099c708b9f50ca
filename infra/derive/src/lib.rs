#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the marketplace crates.
//! They remove the boilerplate around error enums, feature slices and the
//! `OpenAPI`-documented HTTP surface.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! mkt-derive.workspace = true
//! ```
//!
//! Examples below are `ignore`d because proc-macro crates cannot use their own macros.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Attribute macro for request and response bodies.
///
/// * Adds `Debug`, `Serialize` and `Deserialize` when they are not derived already.
/// * Adds `utoipa::ToSchema` when the `server` feature is enabled.
/// * Adds `#[serde(deny_unknown_fields)]` unless the struct sets it itself.
///
/// Takes no arguments. Field names are serialized as written.
///
/// # Example
///
/// ```rust,ignore
/// use mkt_derive::api_model;
///
/// #[api_model]
/// pub struct ListingSummary {
///     pub id: u64,
///     pub slug: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_api_model(attr.into(), input).into()
}

/// Attribute macro to bridge Axum handlers with `OpenAPI` documentation.
///
/// Accepts `utoipa::path` arguments. Exactly one HTTP method, a `path` under `/api/v1/`
/// (or `/health`) without a trailing slash and a `tag` are required; anything else fails
/// to compile.
///
/// # Example
///
/// ```rust,ignore
/// use mkt_derive::api_handler;
///
/// #[api_handler(
///     get,
///     path = "/api/v1/apps/search",
///     responses((status = OK, body = SearchPage)),
///     tag = "Search"
/// )]
/// pub async fn search_handler() -> Result<(), ()> {
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_api_handler(args.into(), input).into()
}

/// Attribute macro for domain error enums.
///
/// # Features
///
/// * **Automatic Derives**: injects `#[derive(Debug, thiserror::Error)]`.
/// * **Context Support**: generates a companion `...Ext` trait that adds `.context()`
///   to any `Result` that can be converted into this error type.
/// * **Standard Conversions**: implements `From<T>` for variants containing a source field.
/// * **Internal Fallback**: `From<&str>` and `From<String>` when an `Internal` variant exists.
/// * **HTTP Mapping**: a variant annotated with `#[http(409)]` reports that status from the
///   generated `http_status()` method. Unannotated variants report `500`.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with named-field variants.
/// 2. Variants that support context must include a `context: Option<Cow<'static, str>>` field.
/// 3. Variants wrapping external errors must include a `source: T` field or a field marked
///    with `#[source]`/`#[from]`.
///
/// # Example
///
/// ```rust,ignore
/// use mkt_derive::mkt_error;
/// use std::borrow::Cow;
///
/// #[mkt_error]
/// pub enum PaymentsError {
///     #[http(409)]
///     #[error("Conflict{}: {message}", format_context(.context))]
///     Conflict { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// assert_eq!(PaymentsError::from("boom").http_status(), 500);
/// ```
#[proc_macro_attribute]
pub fn mkt_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Attribute macro to define a Vertical Slice handle.
///
/// 1. Generates a thread-safe `Arc` wrapper around `<Name>Inner`.
/// 2. Implements `Deref` for transparent access to the inner state.
/// 3. Implements `FeatureSlice` and `Into<InitializedSlice>` for registration in the kernel
///    state, under `NAME`: the lowercased type name or `#[mkt_slice(name = "...")]`.
///
/// # Example
/// ```rust,ignore
/// #[mkt_derive::mkt_slice]
/// pub struct Search {
///     pub max_results: usize,
/// }
///
/// let slice = Search::new(SearchInner { max_results: 100 });
/// assert_eq!(Search::NAME, "search");
/// ```
#[proc_macro_attribute]
pub fn mkt_slice(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemStruct);
    macros::slice::expand_slice(attr.into(), input).into()
}

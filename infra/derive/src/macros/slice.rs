use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::parse::Parser;
use syn::{ItemStruct, LitStr, Meta};

/// Parses `#[mkt_slice]` or `#[mkt_slice(name = "...")]`.
///
/// Without a name the slice is registered under its lowercased type name, which is the
/// name the facade lists in `features::ENABLED`.
fn slice_name(args: TokenStream, input: &ItemStruct) -> syn::Result<LitStr> {
    let metas = syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated.parse2(args)?;
    let mut name = None;
    for meta in metas {
        let Meta::NameValue(nv) = meta else {
            return Err(syn::Error::new_spanned(meta, "expected `name = \"...\"`"));
        };
        if !nv.path.is_ident("name") {
            return Err(syn::Error::new_spanned(nv.path, "unsupported argument; expected `name`"));
        }
        if name.is_some() {
            return Err(syn::Error::new_spanned(nv, "duplicate `name`"));
        }
        let syn::Expr::Lit(syn::ExprLit { lit: syn::Lit::Str(lit), .. }) = nv.value else {
            return Err(syn::Error::new_spanned(nv.value, "`name` must be a string literal"));
        };
        if lit.value().is_empty() || lit.value().chars().any(|c| !(c.is_ascii_lowercase() || c == '-')) {
            return Err(syn::Error::new_spanned(lit, "slice names are lowercase ascii or `-`"));
        }
        name = Some(lit);
    }
    Ok(name.unwrap_or_else(|| LitStr::new(&input.ident.to_string().to_lowercase(), input.ident.span())))
}

pub fn expand_slice(args: TokenStream, input: ItemStruct) -> TokenStream {
    let name = match slice_name(args, &input) {
        Ok(name) => name,
        Err(err) => return err.to_compile_error(),
    };
    let ItemStruct { attrs, vis, ident, fields, .. } = &input;
    let inner = format_ident!("{ident}Inner");

    quote! {
        #(#attrs)*
        #[derive(Debug, Clone)]
        #vis struct #inner #fields

        /// Shared, cheaply cloned handle to the slice state.
        #[derive(Debug, Clone)]
        #vis struct #ident(std::sync::Arc<#inner>);

        impl #ident {
            /// Registry name of the slice.
            pub const NAME: &'static str = #name;

            pub fn new(inner: #inner) -> Self {
                Self(std::sync::Arc::new(inner))
            }
        }

        impl std::ops::Deref for #ident {
            type Target = #inner;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<#inner> for #ident {
            fn from(inner: #inner) -> Self {
                Self::new(inner)
            }
        }

        impl ::mkt_kernel::domain::registry::FeatureSlice for #ident {
            fn name(&self) -> &'static str {
                Self::NAME
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }

        impl From<#ident> for ::mkt_kernel::domain::registry::InitializedSlice {
            fn from(slice: #ident) -> Self {
                Self::new(slice)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listings() -> ItemStruct {
        syn::parse_quote! { pub struct Listings { pub max_limit: usize } }
    }

    #[test]
    fn default_name_is_lowercased_type_name() {
        let out = expand_slice(TokenStream::new(), listings()).to_string();
        assert!(out.contains("\"listings\""));
        assert!(out.contains("struct ListingsInner"));
    }

    #[test]
    fn explicit_name_must_be_lowercase() {
        let out = expand_slice(quote! { name = "app-listings" }, listings()).to_string();
        assert!(out.contains("\"app-listings\""));

        let out = expand_slice(quote! { name = "Listings" }, listings()).to_string();
        assert!(out.contains("compile_error"));
        let out = expand_slice(quote! { label = "x" }, listings()).to_string();
        assert!(out.contains("compile_error"));
    }
}

//! `#[handler]` expansion
//!
//! Input:
//! ```ignore
//! #[handler]
//! async fn add((a, b): (i64, i64)) -> Result<i64> {
//!     Ok(a + b)
//! }
//! ```
//!
//! Generated output:
//! ```ignore
//! fn add() -> Box<dyn ::rpcbase_server::Handler> {
//!     async fn __rpcbase_handler((a, b): (i64, i64)) -> Result<i64> {
//!         Ok(a + b)
//!     }
//!
//!     ::rpcbase_server::from_typed_fn(__rpcbase_handler)
//! }
//! ```

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{FnArg, ItemFn};

/// Expand the attributed function, or explain why it cannot be a handler
pub fn handler_impl(input_fn: ItemFn) -> syn::Result<TokenStream> {
    let sig = &input_fn.sig;

    if sig.asyncness.is_none() {
        return Err(syn::Error::new(
            sig.fn_token.span(),
            "#[handler] requires an async fn",
        ));
    }
    if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "#[handler] does not support generic functions",
        ));
    }
    if let Some(receiver) = sig.inputs.iter().find(|arg| matches!(arg, FnArg::Receiver(_))) {
        return Err(syn::Error::new(
            receiver.span(),
            "#[handler] cannot be used on methods taking self",
        ));
    }

    let fn_name = &sig.ident;
    let fn_vis = &input_fn.vis;
    let fn_attrs = &input_fn.attrs;
    let fn_block = &input_fn.block;

    // The original signature survives on the inner fn, so patterns in the
    // argument list keep working
    let inner_name = format_ident!("__rpcbase_handler");
    let mut inner_sig = sig.clone();
    inner_sig.ident = inner_name.clone();

    let adapter = match sig.inputs.len() {
        0 => quote! {
            ::rpcbase_server::from_typed_fn(
                |_: ::rpcbase_server::__private::IgnoredAny| #inner_name()
            )
        },
        1 => quote! { ::rpcbase_server::from_typed_fn(#inner_name) },
        2 => quote! { ::rpcbase_server::from_typed_fn_with_context(#inner_name) },
        _ => {
            return Err(syn::Error::new(
                sig.inputs.span(),
                "#[handler] functions take at most two arguments: params and a RequestContext",
            ))
        }
    };

    Ok(quote! {
        #(#fn_attrs)*
        #fn_vis fn #fn_name() -> ::std::boxed::Box<dyn ::rpcbase_server::Handler> {
            #inner_sig #fn_block

            #adapter
        }
    })
}

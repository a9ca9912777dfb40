//! Procedural macros for the rpcbase JSON-RPC engine
//!
//! # `#[handler]`
//!
//! Turns a typed async function into a factory returning
//! `Box<dyn rpcbase_server::Handler>`, ready to pass to
//! `DispatcherBuilder::method`. Params are deserialized into the argument
//! type and the result is serialized back, exactly as with
//! `from_typed_fn`.
//!
//! Without the macro:
//!
//! ```ignore
//! pub fn add() -> Box<dyn Handler> {
//!     from_typed_fn(|params: AddParams| async move {
//!         Ok(params.a + params.b)
//!     })
//! }
//! ```
//!
//! With it:
//!
//! ```ignore
//! #[rpcbase::handler]
//! pub async fn add(params: AddParams) -> Result<i32> {
//!     Ok(params.a + params.b)
//! }
//!
//! let dispatcher = DispatcherBuilder::new().method("add", add()).build()?;
//! ```
//!
//! The generated code names `::rpcbase_server`, so the calling crate must
//! depend on `rpcbase-server` (directly or through `rpcbase`'s re-export).

mod handler;

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemFn};

/// Attribute macro for defining JSON-RPC handlers
///
/// Three shapes are accepted:
///
/// - `async fn name() -> Result<R>`: any params, including none, are ignored
/// - `async fn name(params: P) -> Result<R>`
/// - `async fn name(params: P, ctx: RequestContext) -> Result<R>`
///
/// `P` must implement `serde::Deserialize` and `R` must implement
/// `serde::Serialize`. The error type is `rpcbase_core::Error`; params that
/// fail to deserialize are answered with Invalid params.
///
/// Visibility, doc comments and other attributes move to the generated
/// factory function.
///
/// # Errors
///
/// Compilation fails for non-async functions, generic functions, methods
/// taking `self`, and functions with more than two arguments.
#[proc_macro_attribute]
pub fn handler(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);
    handler::handler_impl(input_fn)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

mod app;
mod service;

use proc_macro::TokenStream;

// ============================================================================
// #[rpc_service] attribute macro
// ============================================================================

/// Expose the public methods of an inherent impl block as RPC methods.
///
/// Emits an `RpcService` impl for the block's type. The block itself is
/// passed through unchanged apart from the `#[rpc(..)]` attributes.
///
/// # Usage
///
/// ```ignore
/// #[rpc_service]
/// impl UserService {
///     pub fn get_name(&self, id: u64) -> Result<String, ServiceError> { /* ... */ }
///
///     // Leading context, not counted as a positional argument
///     pub fn whoami(&self, ctx: &RequestContext) -> Option<String> { /* ... */ }
///
///     // Exposed as "lookup" instead of "find_by_email"
///     #[rpc(name = "lookup")]
///     pub fn find_by_email(&self, email: String) -> Json<User> { /* ... */ }
///
///     // Public but not exposed
///     #[rpc(skip)]
///     pub fn cache_stats(&self) -> usize { /* ... */ }
/// }
/// ```
///
/// A method is exposed when it is `pub`, takes `&self`, is neither `async`,
/// `unsafe`, generic nor variadic, takes its data arguments by value, and
/// does not return `impl Trait` or a non-`'static` reference. Others are
/// left out silently.
///
/// The reserved methods below are never exposed. When present they are
/// forwarded to the service's registration hooks:
///
/// - `fn rpc_namespace(&self) -> impl Into<String>`: the namespace name;
/// - `fn excluded_methods(&self) -> Vec<impl Into<String>>`: methods to hide;
/// - `fn constructor(&mut self)`: one-time setup before methods are scanned.
#[proc_macro_attribute]
pub fn rpc_service(attr: TokenStream, item: TokenStream) -> TokenStream {
    service::expand(attr, item)
}

// ============================================================================
// #[derive(RpcApp)] derive macro
// ============================================================================

/// Derive macro for the `RpcApp` trait.
///
/// # Usage
///
/// ```ignore
/// #[derive(RpcApp)]
/// #[rpc_app(exclude("debug_dump"))]
/// struct App {
///     #[rpc]
///     users: UserService,
///     #[rpc(name = "acct")]
///     accounts: Accounts,
///     config: Config,
/// }
/// ```
///
/// - `#[rpc]` registers the field under its own or its type-derived name.
/// - `#[rpc(name = "...")]` registers it under the given namespace.
/// - `#[rpc_app(exclude(...))]` hides the listed method names from every
///   service registered afterwards.
///
/// Fields are registered in declaration order. Unmarked fields are dropped.
#[proc_macro_derive(RpcApp, attributes(rpc, rpc_app))]
pub fn derive_rpc_app(input: TokenStream) -> TokenStream {
    app::derive_rpc_app(input)
}

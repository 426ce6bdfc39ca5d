//! Container registration.
//!
//! An application struct that owns its services can register them all at
//! once. `#[derive(RpcApp)]` registers every field marked `#[rpc]`, in
//! declaration order:
//!
//! ```ignore
//! #[derive(RpcApp)]
//! #[rpc_app(exclude("health_detail"))]
//! struct App {
//!     #[rpc]
//!     users: UserService,
//!     #[rpc(name = "acct")]
//!     accounts: Accounts,
//!     db: Pool,
//! }
//!
//! server.register_app(App { .. });
//! ```

use crate::registry::RegistryError;
use crate::server::Server;

/// A container of services.
pub trait RpcApp {
    /// Method names hidden from every service registered after this app.
    fn excluded_methods(&self) -> Vec<String> {
        Vec::new()
    }

    /// Register the container's services.
    fn register_services(self, server: &mut Server) -> Result<(), RegistryError>;
}

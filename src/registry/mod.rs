//! Namespace registry.
//!
//! Maps `namespace -> method -> CallablePlan`. Populated at startup through
//! [`Server`](crate::Server) and read-only once serving starts.

mod app;
mod service;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::RpcError;
use crate::naming::{NamingConvention, METHOD_SEPARATOR};
use crate::plan::CallablePlan;

pub use app::RpcApp;
pub use service::{RpcService, ServiceDef, RESERVED_METHODS};

pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("namespace [{0}] exists")]
    DuplicateNamespace(String),
    #[error("invalid namespace [{0}]: must be non-empty and must not contain '.'")]
    InvalidNamespace(String),
}

/// A registered service: its namespace, the instance backing it, and its
/// exposed methods keyed by normalized name.
#[derive(Clone)]
pub struct ServiceEntry {
    name: String,
    type_name: &'static str,
    instance: Option<Arc<dyn Any + Send + Sync>>,
    methods: HashMap<String, CallablePlan>,
}

impl ServiceEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type the service was registered from, or `"ServiceDef"`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The backing instance, if it is a `T`.
    pub fn instance<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.instance.clone()?.downcast::<T>().ok()
    }

    pub fn method(&self, name: &str) -> Option<&CallablePlan> {
        self.methods.get(name)
    }

    /// Exposed method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("methods", &self.method_names())
            .finish()
    }
}

/// Everything needed to add one service, before naming rules are applied.
pub(crate) struct Registration {
    pub(crate) name: String,
    pub(crate) type_name: &'static str,
    pub(crate) instance: Option<Arc<dyn Any + Send + Sync>>,
    pub(crate) plans: Vec<CallablePlan>,
    pub(crate) excluded: Vec<String>,
}

/// The namespace table.
#[derive(Debug, Default)]
pub struct Registry {
    naming: NamingConvention,
    services: HashMap<String, ServiceEntry>,
    global_excludes: Vec<String>,
}

impl Registry {
    pub fn new(naming: NamingConvention) -> Self {
        Self {
            naming,
            services: HashMap::new(),
            global_excludes: Vec::new(),
        }
    }

    pub fn naming(&self) -> NamingConvention {
        self.naming
    }

    /// Replace the method names hidden from every later registration.
    pub fn set_global_excludes(&mut self, names: Vec<String>) {
        self.global_excludes = names;
    }

    pub fn global_excludes(&self) -> &[String] {
        &self.global_excludes
    }

    /// Add a service.
    ///
    /// Reserved hook names, the service's own excludes and the global excludes
    /// are skipped. When two methods normalize to the same name the first one
    /// declared wins. A service left with no methods is not added and
    /// `Ok(false)` is returned.
    pub(crate) fn add(&mut self, registration: Registration) -> Result<bool, RegistryError> {
        let Registration {
            name,
            type_name,
            instance,
            plans,
            excluded,
        } = registration;

        let namespace = self.naming.apply(&name);
        if namespace.is_empty() || namespace.contains(METHOD_SEPARATOR) {
            return Err(RegistryError::InvalidNamespace(namespace));
        }

        let skipped: Vec<String> = RESERVED_METHODS
            .iter()
            .map(|s| s.to_string())
            .chain(excluded)
            .chain(self.global_excludes.iter().cloned())
            .map(|s| self.naming.apply(&s))
            .collect();

        let mut methods = HashMap::with_capacity(plans.len());
        for plan in plans {
            let method = self.naming.apply(plan.method_name());
            if skipped.contains(&method) {
                debug!(target: REGISTRY_TARGET, namespace = %namespace, method = %method, "method excluded");
                continue;
            }
            if methods.contains_key(&method) {
                warn!(
                    target: REGISTRY_TARGET,
                    namespace = %namespace,
                    method = %method,
                    declared = plan.method_name(),
                    "duplicate method after normalization, keeping the first"
                );
                continue;
            }
            methods.insert(method, plan);
        }

        if methods.is_empty() {
            warn!(target: REGISTRY_TARGET, namespace = %namespace, type_name, "service exposes no methods, not registered");
            return Ok(false);
        }
        if self.services.contains_key(&namespace) {
            return Err(RegistryError::DuplicateNamespace(namespace));
        }

        debug!(
            target: REGISTRY_TARGET,
            namespace = %namespace,
            type_name,
            methods = methods.len(),
            "service registered"
        );
        self.services.insert(
            namespace.clone(),
            ServiceEntry {
                name: namespace,
                type_name,
                instance,
                methods,
            },
        );
        Ok(true)
    }

    /// Find the plan for an already-normalized `namespace` and `method`.
    pub fn resolve(&self, namespace: &str, method: &str) -> Result<&CallablePlan, RpcError> {
        let service = self
            .services
            .get(namespace)
            .ok_or_else(|| RpcError::method_not_found("no namespace"))?;
        service
            .method(method)
            .ok_or_else(|| RpcError::method_not_found("no method"))
    }

    pub fn service(&self, namespace: &str) -> Option<&ServiceEntry> {
        self.services.get(namespace)
    }

    /// Registered namespaces, sorted.
    pub fn namespaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

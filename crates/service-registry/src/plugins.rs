//! # Backend Factory
//!
//! Maps backend names to constructors. Nothing is registered implicitly:
//! call [`register_builtin_backends`] (or [`BackendFactory::register`]) during
//! startup, then select a backend by `RegistryConfig::backend`.
//!
//! ```text
//! RegistryConfig { backend: "bus", .. }
//!         │
//!         ▼
//! ┌─────────────────────┐    "bus"   ─▶ BusRegistry (shared connector)
//! │   BackendFactory    │    "local" ─▶ LocalRegistry (private bus)
//! └─────────────────────┘    other   ─▶ UnknownBackend
//! ```

use crate::domain::{RegistryConfig, RegistryError, BACKEND_BUS, BACKEND_LOCAL};
use crate::ports::Registry;
use crate::service::{BusRegistry, LocalRegistry};
use parking_lot::RwLock;
use shared_bus::BusConnector;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// Dependencies handed to backend constructors.
#[derive(Clone, Default)]
pub struct BackendDeps {
    /// Opens bus connections for bus-backed registries.
    pub connector: Option<Arc<dyn BusConnector>>,
}

impl BackendDeps {
    pub fn with_connector(connector: Arc<dyn BusConnector>) -> Self {
        Self {
            connector: Some(connector),
        }
    }
}

/// Builds a registry from its configuration.
pub type BackendConstructor =
    fn(RegistryConfig, &BackendDeps) -> Result<Arc<dyn Registry>, RegistryError>;

/// Name-indexed registry constructors.
#[derive(Default)]
pub struct BackendFactory {
    constructors: RwLock<BTreeMap<String, BackendConstructor>>,
}

impl BackendFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide factory. Empty until something registers into it.
    pub fn global() -> &'static BackendFactory {
        static GLOBAL: OnceLock<BackendFactory> = OnceLock::new();
        GLOBAL.get_or_init(BackendFactory::new)
    }

    /// Register a constructor. Returns `false` if it replaced an existing one.
    pub fn register(&self, name: &str, constructor: BackendConstructor) -> bool {
        let replaced = self
            .constructors
            .write()
            .insert(name.to_string(), constructor)
            .is_some();
        if replaced {
            warn!(backend = name, "Replacing registry backend");
        } else {
            info!(backend = name, "Registry backend registered");
        }
        !replaced
    }

    /// Registered backend names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.constructors.read().keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.read().contains_key(name)
    }

    /// Build the backend named by `config.backend`.
    pub fn create(
        &self,
        config: RegistryConfig,
        deps: &BackendDeps,
    ) -> Result<Arc<dyn Registry>, RegistryError> {
        config.validate()?;
        let constructor = self
            .constructors
            .read()
            .get(&config.backend)
            .copied()
            .ok_or_else(|| RegistryError::UnknownBackend(config.backend.clone()))?;
        constructor(config, deps)
    }
}

/// Register the `bus` and `local` backends.
pub fn register_builtin_backends(factory: &BackendFactory) {
    factory.register(BACKEND_BUS, build_bus_backend);
    factory.register(BACKEND_LOCAL, build_local_backend);
}

fn build_bus_backend(config: RegistryConfig, deps: &BackendDeps) -> Result<Arc<dyn Registry>, RegistryError> {
    let connector = deps.connector.as_ref().ok_or_else(|| {
        RegistryError::InvalidConfig("the bus backend needs a bus connector".into())
    })?;
    Ok(Arc::new(BusRegistry::connect(config, connector.as_ref())?))
}

fn build_local_backend(config: RegistryConfig, _deps: &BackendDeps) -> Result<Arc<dyn Registry>, RegistryError> {
    Ok(Arc::new(LocalRegistry::new(config)?))
}

//! Handler Registry
//!
//! Maps the `object_type` tag of an update to the factory that builds its
//! handler. The registry is assembled once at startup through explicit
//! registration calls, one per handler module, and is read-only afterwards.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_replay::registry::{HandlerRegistry, install_global};
//!
//! fn register_purchase_orders(builder: HandlerRegistryBuilder) -> HandlerRegistryBuilder {
//!     builder.register_typed("FOUR", |order: PurchaseOrderReception| ReceivePurchaseOrder::new(order))
//! }
//!
//! let registry = HandlerRegistry::builder()
//!     .apply(register_purchase_orders)
//!     .apply(register_inventories)
//!     .build()?;
//!
//! // Optionally make it the process-wide registry
//! let registry = install_global(registry)?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::error::ReplayError;
use crate::handler::{typed_factory, HandlerError, HandlerFactory, ObjectTypeHandler};

static GLOBAL_REGISTRY: OnceCell<Arc<HandlerRegistry>> = OnceCell::new();

/// Read-only map from object type to handler factory
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("object_types", &self.object_types())
            .finish()
    }
}

impl HandlerRegistry {
    /// Starts an empty registry builder
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::new()
    }

    /// Returns the factory registered for `object_type`
    ///
    /// # Errors
    ///
    /// `ReplayError::UnknownObjectType` if nothing is registered under that key
    pub fn resolve(&self, object_type: &str) -> Result<&HandlerFactory, ReplayError> {
        self.factories
            .get(object_type)
            .ok_or_else(|| ReplayError::UnknownObjectType(object_type.to_string()))
    }

    pub fn contains(&self, object_type: &str) -> bool {
        self.factories.contains_key(object_type)
    }

    /// Registered object types, sorted
    pub fn object_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Builder for the handler registry
///
/// Duplicate registrations are collected and reported by `build`, so a
/// misconfigured startup fails instead of silently keeping one of them.
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    factories: HashMap<String, HandlerFactory>,
    duplicates: Vec<String>,
}

impl HandlerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory working on the raw JSON payload
    pub fn register<F>(mut self, object_type: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<Box<dyn ObjectTypeHandler>, HandlerError> + Send + Sync + 'static,
    {
        self.insert(object_type.into(), Arc::new(factory));
        self
    }

    /// Registers a constructor taking the payload deserialized into `T`
    pub fn register_typed<T, H, F>(mut self, object_type: impl Into<String>, constructor: F) -> Self
    where
        T: DeserializeOwned,
        H: ObjectTypeHandler + 'static,
        F: Fn(T) -> H + Send + Sync + 'static,
    {
        self.insert(object_type.into(), typed_factory(constructor));
        self
    }

    /// Runs a module's registration function against this builder
    pub fn apply(self, module: impl FnOnce(Self) -> Self) -> Self {
        module(self)
    }

    fn insert(&mut self, object_type: String, factory: HandlerFactory) {
        if self.factories.contains_key(&object_type) {
            self.duplicates.push(object_type);
        } else {
            self.factories.insert(object_type, factory);
        }
    }

    /// Freezes the registry
    ///
    /// # Errors
    ///
    /// `ReplayError::DuplicateObjectType` naming the first key registered twice
    pub fn build(self) -> Result<HandlerRegistry, ReplayError> {
        if let Some(duplicate) = self.duplicates.into_iter().next() {
            return Err(ReplayError::DuplicateObjectType(duplicate));
        }
        Ok(HandlerRegistry {
            factories: self.factories,
        })
    }
}

/// Installs the process-wide registry
///
/// # Errors
///
/// `ReplayError::AlreadyInstalled` on any call after the first
pub fn install_global(registry: HandlerRegistry) -> Result<Arc<HandlerRegistry>, ReplayError> {
    let registry = Arc::new(registry);
    GLOBAL_REGISTRY
        .set(registry.clone())
        .map_err(|_| ReplayError::AlreadyInstalled)?;
    info!(object_types = ?registry.object_types(), "Handler registry installed");
    Ok(registry)
}

/// Returns the process-wide registry, if installed
pub fn global() -> Option<Arc<HandlerRegistry>> {
    GLOBAL_REGISTRY.get().cloned()
}

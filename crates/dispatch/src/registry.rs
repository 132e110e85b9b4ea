//! Handler factories and the service container
//!
//! The registry replaces reflection-based handler discovery with an
//! explicit `type name -> factory` map. Factories receive the service
//! container, which carries the process-wide collaborators a handler may
//! need — at minimum the identity card.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use scribe_config::HandlerConfig;
use scribe_event::{EventPool, MonitorRegistry};

use crate::error::{HandlerError, Result};
use crate::handler::Handler;
use crate::identity::IdentityCard;

/// Shared services handed to handler factories
#[derive(Clone)]
pub struct ServiceContainer {
    identity: Arc<RwLock<IdentityCard>>,
    pool: EventPool,
    monitors: MonitorRegistry,
}

impl ServiceContainer {
    pub fn new(pool: EventPool, monitors: MonitorRegistry) -> Self {
        Self {
            identity: Arc::new(RwLock::new(IdentityCard::new())),
            pool,
            monitors,
        }
    }

    /// The shared identity card
    pub fn identity(&self) -> &Arc<RwLock<IdentityCard>> {
        &self.identity
    }

    /// A point-in-time copy of the identity card
    pub fn identity_snapshot(&self) -> IdentityCard {
        self.identity
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// The shared event pool
    pub fn pool(&self) -> &EventPool {
        &self.pool
    }

    /// The monitor registry
    pub fn monitors(&self) -> &MonitorRegistry {
        &self.monitors
    }
}

type FactoryFn = dyn Fn(&HandlerConfig, &ServiceContainer) -> Result<Box<dyn Handler>> + Send + Sync;

/// Explicit `type name -> factory` registry
///
/// The dispatcher instantiates handlers for unclaimed configurations
/// through this map; `HandlerConfig::type_name` is the key.
#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, Box<FactoryFn>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a factory to a handler type name
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        factory: impl Fn(&HandlerConfig, &ServiceContainer) -> Result<Box<dyn Handler>>
            + Send
            + Sync
            + 'static,
    ) {
        self.factories.insert(type_name.into(), Box::new(factory));
    }

    /// Instantiate a handler for a configuration
    pub fn create(
        &self,
        config: &HandlerConfig,
        services: &ServiceContainer,
    ) -> Result<Box<dyn Handler>> {
        let type_name = config.type_name();
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| HandlerError::UnknownHandlerType(type_name.to_owned()))?;
        factory(config, services)
    }

    /// Registered type names
    pub fn type_names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

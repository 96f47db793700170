// Named service container

use crate::error::{FactoryError, FactoryResult};
use crate::locator::{ParameterBag, Service, ServiceLocator};
use armature_cache::SharedStore;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Lazily creates services the container has no entry for.
pub trait AbstractFactory: Send + Sync {
    fn can_create(&self, container: &ServiceContainer, name: &str) -> bool;

    fn create(&self, container: &ServiceContainer, name: &str) -> FactoryResult<Service>;
}

#[derive(Default)]
struct Inner {
    services: RwLock<HashMap<String, Service>>,
    parameters: RwLock<HashMap<String, Value>>,
    factories: RwLock<Vec<Arc<dyn AbstractFactory>>>,
}

/// Service container keyed by name.
///
/// Services created by abstract factories are cached and shared by every
/// later `get`. No lock is held while a factory runs, so factories may
/// resolve other services from the same container.
#[derive(Clone, Default)]
pub struct ServiceContainer {
    inner: Arc<Inner>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        debug!("Creating new service container");
        Self::default()
    }

    /// Register a service instance
    pub fn set_service<T: Any + Send + Sync>(&self, name: impl Into<String>, service: T) {
        self.set_shared(name, Arc::new(service));
    }

    /// Register an already shared service
    pub fn set_shared(&self, name: impl Into<String>, service: Service) {
        let name = name.into();
        trace!(service = %name, "Acquiring write lock for registration");
        self.inner.services.write().insert(name.clone(), service);
        debug!(service = %name, "Service registered in container");
    }

    /// Register a cache store under `name`
    pub fn set_store(&self, name: impl Into<String>, store: SharedStore) {
        self.set_service(name, store);
    }

    /// Register the application configuration as the `config` service
    pub fn set_config(&self, config: Value) {
        self.set_service("config", config);
    }

    pub fn set_parameter(&self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.inner.parameters.write().insert(name.clone(), value);
        debug!(parameter = %name, "Parameter registered in container");
    }

    pub fn add_abstract_factory(&self, factory: Arc<dyn AbstractFactory>) {
        self.inner.factories.write().push(factory);
        debug!("Abstract factory registered in container");
    }

    pub fn has(&self, name: &str) -> bool {
        if self.inner.services.read().contains_key(name) {
            return true;
        }

        let exists = self
            .factories()
            .iter()
            .any(|factory| factory.can_create(self, name));
        trace!(service = name, exists, "Checked service existence");
        exists
    }

    pub fn get(&self, name: &str) -> FactoryResult<Service> {
        if let Some(service) = self.inner.services.read().get(name) {
            trace!(service = name, "Service resolved from container");
            return Ok(service.clone());
        }

        let factory = self
            .factories()
            .into_iter()
            .find(|factory| factory.can_create(self, name))
            .ok_or_else(|| FactoryError::ServiceNotFound(name.to_string()))?;

        let service = factory.create(self, name)?;

        // Keep the first instance if a concurrent `get` created one meanwhile
        let service = self
            .inner
            .services
            .write()
            .entry(name.to_string())
            .or_insert(service)
            .clone();

        debug!(service = name, "Service created by abstract factory");
        Ok(service)
    }

    /// Remove a service; returns whether it was registered.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.inner.services.write().remove(name).is_some();
        debug!(service = name, removed, "Removed service from container");
        removed
    }

    /// Remove every service and parameter. Abstract factories stay registered.
    pub fn clear(&self) {
        let mut services = self.inner.services.write();
        let count = services.len();
        services.clear();
        self.inner.parameters.write().clear();

        debug!(service_count = count, "Cleared all services from container");
    }

    fn factories(&self) -> Vec<Arc<dyn AbstractFactory>> {
        self.inner.factories.read().clone()
    }
}

impl ServiceLocator for ServiceContainer {
    fn has(&self, name: &str) -> bool {
        ServiceContainer::has(self, name)
    }

    fn get(&self, name: &str) -> FactoryResult<Service> {
        ServiceContainer::get(self, name)
    }

    fn parameters(&self) -> Option<&dyn ParameterBag> {
        Some(self)
    }
}

impl ParameterBag for ServiceContainer {
    fn has_parameter(&self, name: &str) -> bool {
        self.inner.parameters.read().contains_key(name)
    }

    fn get_parameter(&self, name: &str) -> FactoryResult<Value> {
        self.inner
            .parameters
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| FactoryError::ServiceNotFound(format!("parameter {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::resolve;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        created: AtomicUsize,
    }

    impl AbstractFactory for Counter {
        fn can_create(&self, _container: &ServiceContainer, name: &str) -> bool {
            name.starts_with("counted.")
        }

        fn create(&self, container: &ServiceContainer, name: &str) -> FactoryResult<Service> {
            // Factories may call back into the container
            let base = resolve::<i32>(container, "base")?;
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(format!("{}:{}", name, base)))
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let container = ServiceContainer::new();
        container.set_service("answer", 42_i32);

        assert!(container.has("answer"));
        assert_eq!(*resolve::<i32>(&container, "answer").unwrap(), 42);
        assert!(matches!(container.get("missing"), Err(FactoryError::ServiceNotFound(_))));
    }

    #[test]
    fn test_abstract_factory_singletons() {
        let container = ServiceContainer::new();
        let counter = Arc::new(Counter {
            created: AtomicUsize::new(0),
        });
        container.set_service("base", 7_i32);
        container.add_abstract_factory(counter.clone());

        assert!(container.has("counted.a"));
        assert!(!container.has("other"));

        let first = resolve::<String>(&container, "counted.a").unwrap();
        let second = resolve::<String>(&container, "counted.a").unwrap();
        assert_eq!(*first, "counted.a:7");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counter.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parameters_and_clear() {
        let container = ServiceContainer::new();
        container.set_parameter("cache", json!({"default": {"type": "array"}}));
        container.set_config(json!({}));

        let bag = ServiceLocator::parameters(&container).unwrap();
        assert!(bag.has_parameter("cache"));
        assert_eq!(bag.get_parameter("cache").unwrap()["default"]["type"], "array");

        assert!(container.remove("config"));
        assert!(!container.remove("config"));

        container.clear();
        assert!(!container.has_parameter("cache"));
    }
}

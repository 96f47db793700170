//! Service locator capability consumed by the factories.

use crate::error::{FactoryError, FactoryResult};
use serde_json::Value;
use std::any::{Any, type_name};
use std::sync::Arc;

/// A service as handed out by a locator.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Named configuration parameters some containers expose next to services.
pub trait ParameterBag: Send + Sync {
    fn has_parameter(&self, name: &str) -> bool;

    fn get_parameter(&self, name: &str) -> FactoryResult<Value>;
}

/// Resolve services by name.
pub trait ServiceLocator: Send + Sync {
    fn has(&self, name: &str) -> bool;

    fn get(&self, name: &str) -> FactoryResult<Service>;

    /// The parameter bag, when the container has one.
    fn parameters(&self) -> Option<&dyn ParameterBag> {
        None
    }
}

/// Get a service and downcast it to `T`.
///
/// A service of another type is an [`FactoryError::InvalidConfig`] error.
pub fn resolve<T: Any + Send + Sync>(locator: &dyn ServiceLocator, name: &str) -> FactoryResult<Arc<T>> {
    locator.get(name)?.downcast::<T>().map_err(|_| {
        FactoryError::InvalidConfig(format!(
            "Service \"{}\" is not a {}",
            name,
            type_name::<T>()
        ))
    })
}

/// Like [`resolve`], returning an owned clone of the service.
pub fn resolve_cloned<T: Any + Send + Sync + Clone>(locator: &dyn ServiceLocator, name: &str) -> FactoryResult<T> {
    resolve::<T>(locator, name).map(|service| service.as_ref().clone())
}

/// Factories that need the container before they run.
pub trait ContainerAware {
    fn set_container(&mut self, container: Arc<dyn ServiceLocator>);

    fn container(&self) -> FactoryResult<&dyn ServiceLocator>;
}

/// Container storage embedded by [`ContainerAware`] factories.
#[derive(Clone, Default)]
pub struct ContainerSlot {
    container: Option<Arc<dyn ServiceLocator>>,
}

impl ContainerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, container: Arc<dyn ServiceLocator>) {
        self.container = Some(container);
    }

    pub fn is_set(&self) -> bool {
        self.container.is_some()
    }

    /// The stored container; an empty slot is an [`FactoryError::InvalidContainer`] error.
    pub fn get(&self) -> FactoryResult<&dyn ServiceLocator> {
        self.container
            .as_deref()
            .ok_or_else(|| FactoryError::InvalidContainer("No container has been set".to_string()))
    }
}

impl ContainerAware for ContainerSlot {
    fn set_container(&mut self, container: Arc<dyn ServiceLocator>) {
        self.set(container);
    }

    fn container(&self) -> FactoryResult<&dyn ServiceLocator> {
        self.get()
    }
}

use super::{AdapterFactory, check_namespace, is_blank, seconds};
use crate::connection::{ConnectionBuilder, DefaultConnectionBuilder};
use crate::error::{FactoryError, FactoryResult};
use crate::locator::{ContainerAware, ContainerSlot, ServiceLocator};
use crate::options::{Options, OptionsExt};
use armature_cache::{RedisCache, RedisConnection, SharedStore};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Connection parameters of a DSN-built Redis client.
///
/// `timeout` and `read_timeout` are seconds. The remaining fields are kept
/// for configuration compatibility; the `redis` client has no equivalent
/// for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisParams {
    pub class: String,
    pub compression: bool,
    pub lazy: bool,
    pub persistent: i64,
    pub persistent_id: String,
    pub read_timeout: i64,
    pub retry_interval: i64,
    pub tcp_keepalive: i64,
    pub timeout: i64,
}

impl Default for RedisParams {
    fn default() -> Self {
        Self {
            class: "\\Redis".to_string(),
            compression: true,
            lazy: false,
            persistent: 0,
            persistent_id: String::new(),
            read_timeout: 0,
            retry_interval: 0,
            tcp_keepalive: 0,
            timeout: 30,
        }
    }
}

impl RedisParams {
    pub fn from_options(options: &Options) -> Self {
        let defaults = Self::default();
        Self {
            class: options.string_or("class", &defaults.class),
            compression: options.bool_or("compression", defaults.compression),
            lazy: options.bool_or("lazy", defaults.lazy),
            persistent: options.int_or("persistent", defaults.persistent),
            persistent_id: options.string_or("persistent_id", &defaults.persistent_id),
            read_timeout: options.int_or("read_timeout", defaults.read_timeout),
            retry_interval: options.int_or("retry_interval", defaults.retry_interval),
            tcp_keepalive: options.int_or("tcp_keepalive", defaults.tcp_keepalive),
            timeout: options.int_or("timeout", defaults.timeout),
        }
    }
}

/// Redis adapter; `client` names a connection service, `dsn` builds one.
#[derive(Clone)]
pub struct RedisAdapterFactory {
    container: ContainerSlot,
    connections: Arc<dyn ConnectionBuilder>,
}

impl Default for RedisAdapterFactory {
    fn default() -> Self {
        Self::new(Arc::new(DefaultConnectionBuilder::new()))
    }
}

impl RedisAdapterFactory {
    pub fn new(connections: Arc<dyn ConnectionBuilder>) -> Self {
        Self {
            container: ContainerSlot::new(),
            connections,
        }
    }

    /// Resolve the connection from `client`, falling back to `dsn`.
    pub fn connection(&self, options: &Options) -> FactoryResult<RedisConnection> {
        let client = options.string_or("client", "");
        if !is_blank(&client) {
            let container = self.container.get()?;
            if container.has(&client) {
                debug!(service = %client, "Using Redis connection service");
                return connection_service(container, &client);
            }
        }

        let dsn = match options.value("dsn") {
            Some(Value::String(dsn)) if !is_blank(dsn) => dsn.clone(),
            _ => {
                return Err(FactoryError::MissingConfig(
                    "A Redis service name, DSNs or connection information not found".to_string(),
                ));
            }
        };

        self.connections.redis(&dsn, &RedisParams::from_options(options))
    }
}

/// A connection service is either a [`RedisConnection`] or a bare `redis::Client`.
fn connection_service(container: &dyn ServiceLocator, name: &str) -> FactoryResult<RedisConnection> {
    let service = container.get(name)?;
    if let Some(connection) = service.downcast_ref::<RedisConnection>() {
        return Ok(connection.clone());
    }

    match service.downcast_ref::<redis::Client>() {
        Some(client) => Ok(RedisConnection::new(client.clone())),
        None => Err(FactoryError::InvalidConfig(format!(
            "Service \"{}\" is not a Redis connection",
            name
        ))),
    }
}

impl AdapterFactory for RedisAdapterFactory {
    fn create(&self, options: &Options) -> FactoryResult<SharedStore> {
        let namespace = options.string_or("namespace", "");
        check_namespace(&namespace)?;

        let connection = self.connection(options)?;
        Ok(Arc::new(RedisCache::new(
            connection,
            namespace,
            seconds(options.int_or("maxLifetime", 0)),
        )))
    }

    fn container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        Some(&mut self.container)
    }
}

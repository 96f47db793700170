use super::{AdapterFactory, check_namespace, is_blank, seconds};
use crate::connection::{ConnectionBuilder, DefaultConnectionBuilder};
use crate::error::{FactoryError, FactoryResult};
use crate::locator::{ContainerAware, ContainerSlot, resolve_cloned};
use crate::options::{self, Options, OptionsExt};
use armature_cache::{MemcachedCache, MemcachedClient, SharedStore};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Client options of a DSN-built Memcached connection.
///
/// Timeouts are milliseconds, except `recv_timeout` and `send_timeout`
/// which are microseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemcachedParams {
    pub auto_eject_hosts: bool,
    pub buffer_writes: bool,
    pub compression: bool,
    pub compression_type: String,
    pub connect_timeout: i64,
    pub distribution: String,
    pub hash: String,
    pub libketama_compatible: bool,
    pub no_block: bool,
    pub number_of_replicas: i64,
    pub prefix_key: String,
    pub poll_timeout: i64,
    pub randomize_replica_read: bool,
    pub recv_timeout: i64,
    pub retry_timeout: i64,
    pub send_timeout: i64,
    pub serializer: String,
    pub server_failure_limit: i64,
    pub socket_recv_size: i64,
    pub tcp_keepalive: bool,
    pub tcp_nodelay: bool,
    pub use_udp: bool,
    pub verify_key: bool,
}

impl Default for MemcachedParams {
    fn default() -> Self {
        Self {
            auto_eject_hosts: false,
            buffer_writes: false,
            compression: true,
            compression_type: String::new(),
            connect_timeout: 1000,
            distribution: "consistent".to_string(),
            hash: "md5".to_string(),
            libketama_compatible: true,
            no_block: true,
            number_of_replicas: 0,
            prefix_key: String::new(),
            poll_timeout: 1000,
            randomize_replica_read: false,
            recv_timeout: 0,
            retry_timeout: 0,
            send_timeout: 0,
            serializer: "php".to_string(),
            server_failure_limit: 0,
            socket_recv_size: 0,
            tcp_keepalive: false,
            tcp_nodelay: false,
            use_udp: false,
            verify_key: false,
        }
    }
}

impl MemcachedParams {
    pub fn from_options(options: &Options) -> Self {
        let d = Self::default();
        Self {
            auto_eject_hosts: options.bool_or("auto_eject_hosts", d.auto_eject_hosts),
            buffer_writes: options.bool_or("buffer_writes", d.buffer_writes),
            compression: options.bool_or("compression", d.compression),
            compression_type: options.string_or("compression_type", &d.compression_type),
            connect_timeout: options.int_or("connect_timeout", d.connect_timeout),
            distribution: options.string_or("distribution", &d.distribution),
            hash: options.string_or("hash", &d.hash),
            libketama_compatible: options.bool_or("libketama_compatible", d.libketama_compatible),
            no_block: options.bool_or("no_block", d.no_block),
            number_of_replicas: options.int_or("number_of_replicas", d.number_of_replicas),
            prefix_key: options.string_or("prefix_key", &d.prefix_key),
            poll_timeout: options.int_or("poll_timeout", d.poll_timeout),
            randomize_replica_read: options.bool_or("randomize_replica_read", d.randomize_replica_read),
            recv_timeout: options.int_or("recv_timeout", d.recv_timeout),
            retry_timeout: options.int_or("retry_timeout", d.retry_timeout),
            send_timeout: options.int_or("send_timeout", d.send_timeout),
            serializer: options.string_or("serializer", &d.serializer),
            server_failure_limit: options.int_or("server_failure_limit", d.server_failure_limit),
            socket_recv_size: options.int_or("socket_recv_size", d.socket_recv_size),
            tcp_keepalive: options.bool_or("tcp_keepalive", d.tcp_keepalive),
            tcp_nodelay: options.bool_or("tcp_nodelay", d.tcp_nodelay),
            use_udp: options.bool_or("use_udp", d.use_udp),
            verify_key: options.bool_or("verify_key", d.verify_key),
        }
    }
}

/// Server DSNs from a string or a list of strings.
pub(crate) fn dsn_list(value: Option<&Value>) -> Vec<String> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(options::to_string)
            .filter(|dsn| !dsn.is_empty())
            .collect(),
        Some(Value::Object(items)) => items
            .values()
            .map(options::to_string)
            .filter(|dsn| !dsn.is_empty())
            .collect(),
        Some(other) if options::is_empty(other) => Vec::new(),
        Some(other) => vec![options::to_string(other)],
    }
}

/// Memcached adapter; `client` names a [`MemcachedClient`] service, `dsn` builds one.
#[derive(Clone)]
pub struct MemcachedAdapterFactory {
    container: ContainerSlot,
    connections: Arc<dyn ConnectionBuilder>,
}

impl Default for MemcachedAdapterFactory {
    fn default() -> Self {
        Self::new(Arc::new(DefaultConnectionBuilder::new()))
    }
}

impl MemcachedAdapterFactory {
    pub fn new(connections: Arc<dyn ConnectionBuilder>) -> Self {
        Self {
            container: ContainerSlot::new(),
            connections,
        }
    }

    pub fn client(&self, options: &Options) -> FactoryResult<MemcachedClient> {
        let client = options.string_or("client", "");
        if !is_blank(&client) {
            debug!(service = %client, "Using Memcached client service");
            return resolve_cloned::<MemcachedClient>(self.container.get()?, &client);
        }

        let dsns = dsn_list(options.value("dsn"));
        if dsns.is_empty() {
            return Err(FactoryError::MissingConfig(
                "A Memcached service name, DSNs or connection information not found".to_string(),
            ));
        }

        self.connections
            .memcached(&dsns, &MemcachedParams::from_options(options))
    }
}

impl AdapterFactory for MemcachedAdapterFactory {
    fn create(&self, options: &Options) -> FactoryResult<SharedStore> {
        let namespace = options.string_or("namespace", "");
        check_namespace(&namespace)?;

        let client = self.client(options)?;
        Ok(Arc::new(MemcachedCache::new(
            client,
            namespace,
            seconds(options.int_or("maxLifetime", 0)),
        )))
    }

    fn container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        Some(&mut self.container)
    }
}

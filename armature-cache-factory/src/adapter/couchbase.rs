use super::memcached::dsn_list;
use super::{AdapterFactory, check_namespace, is_blank, seconds};
use crate::connection::{ConnectionBuilder, DefaultConnectionBuilder};
use crate::error::{FactoryError, FactoryResult};
use crate::locator::{ContainerAware, ContainerSlot, resolve_cloned};
use crate::options::{self, Options, OptionsExt};
use armature_cache::{CouchbaseBucket, CouchbaseCache, SharedStore};
use std::sync::Arc;

/// Bucket options of a DSN-built Couchbase connection; timeouts are microseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchbaseParams {
    pub operation_timeout: i64,
    pub config_timeout: i64,
    pub config_node_timeout: i64,
    pub view_timeout: i64,
    pub http_timeout: i64,
    pub config_delay: i64,
    pub htconfig_idle_timeout: i64,
    pub durability_interval: i64,
    pub durability_timeout: i64,
    /// Only set when configured non-empty
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for CouchbaseParams {
    fn default() -> Self {
        Self {
            operation_timeout: 2_500_000,
            config_timeout: 5_000_000,
            config_node_timeout: 2_000_000,
            view_timeout: 75_000_000,
            http_timeout: 75_000_000,
            config_delay: 10_000,
            htconfig_idle_timeout: 4_294_967_295,
            durability_interval: 100_000,
            durability_timeout: 5_000_000,
            username: None,
            password: None,
        }
    }
}

impl CouchbaseParams {
    pub fn from_options(options: &Options) -> Self {
        let d = Self::default();
        Self {
            operation_timeout: options.int_or("operationTimeout", d.operation_timeout),
            config_timeout: options.int_or("configTimeout", d.config_timeout),
            config_node_timeout: options.int_or("configNodeTimeout", d.config_node_timeout),
            view_timeout: options.int_or("viewTimeout", d.view_timeout),
            http_timeout: options.int_or("httpTimeout", d.http_timeout),
            config_delay: options.int_or("configDelay", d.config_delay),
            htconfig_idle_timeout: options.int_or("htconfigIdleTimeout", d.htconfig_idle_timeout),
            durability_interval: options.int_or("durabilityInterval", d.durability_interval),
            durability_timeout: options.int_or("durabilityTimeout", d.durability_timeout),
            username: options.non_empty("username").map(options::to_string),
            password: options.non_empty("password").map(options::to_string),
        }
    }
}

/// Couchbase adapter; `client` names an `Arc<dyn CouchbaseBucket>` service.
#[derive(Clone)]
pub struct CouchbaseAdapterFactory {
    container: ContainerSlot,
    connections: Arc<dyn ConnectionBuilder>,
}

impl Default for CouchbaseAdapterFactory {
    fn default() -> Self {
        Self::new(Arc::new(DefaultConnectionBuilder::new()))
    }
}

impl CouchbaseAdapterFactory {
    pub fn new(connections: Arc<dyn ConnectionBuilder>) -> Self {
        Self {
            container: ContainerSlot::new(),
            connections,
        }
    }

    pub fn bucket(&self, options: &Options) -> FactoryResult<Arc<dyn CouchbaseBucket>> {
        let client = options.string_or("client", "");
        if !is_blank(&client) {
            return resolve_cloned::<Arc<dyn CouchbaseBucket>>(self.container.get()?, &client);
        }

        let dsns = dsn_list(options.value("dsn"));
        let params = CouchbaseParams::from_options(options);

        // An empty dsn list is accepted once both credentials are given
        if dsns.is_empty() && (params.username.is_none() || params.password.is_none()) {
            return Err(FactoryError::MissingConfig(
                "A Couchbase service name, DSNs or connection information not found".to_string(),
            ));
        }

        self.connections.couchbase(&dsns, &params)
    }
}

impl AdapterFactory for CouchbaseAdapterFactory {
    fn create(&self, options: &Options) -> FactoryResult<SharedStore> {
        let namespace = options.string_or("namespace", "");
        check_namespace(&namespace)?;

        let bucket = self.bucket(options)?;
        Ok(Arc::new(CouchbaseCache::new(
            bucket,
            namespace,
            seconds(options.int_or("maxLifetime", 0)),
        )))
    }

    fn container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        Some(&mut self.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ConnectionRequest, MemoryBucket, RecordingConnectionBuilder, RecordingLocator};
    use serde_json::{Value, json};

    fn options(value: Value) -> Options {
        value.as_object().cloned().unwrap_or_default()
    }

    fn factory(locator: Arc<RecordingLocator>, connections: Arc<RecordingConnectionBuilder>) -> CouchbaseAdapterFactory {
        let mut factory = CouchbaseAdapterFactory::new(connections);
        factory.container.set(locator);
        factory
    }

    #[test]
    fn test_defaults() {
        let params = CouchbaseParams::from_options(&Options::new());
        assert_eq!(params, CouchbaseParams::default());
        assert_eq!(params.htconfig_idle_timeout, 4_294_967_295);
        assert!(params.username.is_none());
        assert!(params.password.is_none());
    }

    #[test]
    fn test_credentials_only_when_non_empty() {
        let params = CouchbaseParams::from_options(&options(json!({"username": "", "password": "secret"})));
        assert_eq!(params.username, None);
        assert_eq!(params.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_client_service() {
        let bucket: Arc<dyn CouchbaseBucket> = Arc::new(MemoryBucket::default());
        let locator = Arc::new(RecordingLocator::new().with_service("bucket", bucket));
        let connections = Arc::new(RecordingConnectionBuilder::new());
        let factory = factory(locator.clone(), connections.clone());

        factory.create(&options(json!({"client": "bucket"}))).unwrap();

        assert_eq!(locator.calls(), vec!["get:bucket"]);
        assert!(connections.requests().is_empty());
    }

    #[test]
    fn test_dsn_path() {
        let locator = Arc::new(RecordingLocator::new());
        let connections = Arc::new(RecordingConnectionBuilder::new());
        let factory = factory(locator.clone(), connections.clone());

        factory
            .create(&options(json!({"dsn": "couchbase://localhost/cache"})))
            .unwrap();

        assert_eq!(
            connections.requests(),
            vec![ConnectionRequest::Couchbase {
                dsns: vec!["couchbase://localhost/cache".to_string()],
                params: CouchbaseParams::default(),
            }]
        );
        assert!(locator.calls().is_empty());
    }

    #[test]
    fn test_credentials_without_dsn() {
        let connections = Arc::new(RecordingConnectionBuilder::new());
        let factory = factory(Arc::new(RecordingLocator::new()), connections.clone());

        factory
            .create(&options(json!({"username": "user", "password": "pass"})))
            .unwrap();

        match connections.requests().as_slice() {
            [ConnectionRequest::Couchbase { dsns, params }] => {
                assert!(dsns.is_empty());
                assert_eq!(params.username.as_deref(), Some("user"));
            }
            other => panic!("unexpected requests: {:?}", other),
        }
    }

    #[test]
    fn test_missing_connection_information() {
        let factory = factory(
            Arc::new(RecordingLocator::new()),
            Arc::new(RecordingConnectionBuilder::new()),
        );

        for opts in [json!({}), json!({"username": "user"}), json!({"password": "pass"})] {
            assert!(matches!(
                factory.create(&options(opts)),
                Err(FactoryError::MissingConfig(_))
            ));
        }
    }
}

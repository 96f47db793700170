//! Test doubles for code that builds caches.
//!
//! [`RecordingLocator`] and [`RecordingConnectionBuilder`] record every call
//! they receive so tests can assert which services were looked up and which
//! connections would have been opened.

use crate::adapter::{CouchbaseParams, MemcachedParams, PdoParams, RedisParams};
use crate::connection::{ConnectionBuilder, DefaultConnectionBuilder};
use crate::error::{FactoryError, FactoryResult};
use crate::locator::{ParameterBag, Service, ServiceLocator};
use armature_cache::{
    CacheProvider, CacheResult, CouchbaseBucket, MemcachedClient, RedisConnection, SharedStore,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use sqlx::AnyPool;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Service locator that records `has`/`get` calls.
///
/// Calls are recorded as `"has:<name>"`, `"get:<name>"`,
/// `"has_parameter:<name>"` and `"get_parameter:<name>"`.
#[derive(Default)]
pub struct RecordingLocator {
    services: HashMap<String, Service>,
    parameters: Option<HashMap<String, Value>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service<T: Any + Send + Sync>(mut self, name: impl Into<String>, service: T) -> Self {
        self.services.insert(name.into(), Arc::new(service));
        self
    }

    pub fn with_store(self, name: impl Into<String>, store: SharedStore) -> Self {
        self.with_service(name, store)
    }

    /// Expose `config` as the `config` service
    pub fn with_config(self, config: Value) -> Self {
        self.with_service("config", config)
    }

    /// Expose `settings` as the `settings` service
    pub fn with_settings(self, settings: Value) -> Self {
        self.with_service("settings", settings)
    }

    /// Add a parameter; enables the parameter bag.
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value);
        self
    }

    /// Enable an empty parameter bag.
    pub fn with_parameter_bag(mut self) -> Self {
        self.parameters.get_or_insert_with(HashMap::new);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn was_called(&self, call: &str) -> bool {
        self.call_count(call) > 0
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: &str, name: &str) {
        self.calls.lock().push(format!("{}:{}", call, name));
    }
}

impl ServiceLocator for RecordingLocator {
    fn has(&self, name: &str) -> bool {
        self.record("has", name);
        self.services.contains_key(name)
    }

    fn get(&self, name: &str) -> FactoryResult<Service> {
        self.record("get", name);
        self.services
            .get(name)
            .cloned()
            .ok_or_else(|| FactoryError::ServiceNotFound(name.to_string()))
    }

    fn parameters(&self) -> Option<&dyn ParameterBag> {
        self.parameters.as_ref().map(|_| self as &dyn ParameterBag)
    }
}

impl ParameterBag for RecordingLocator {
    fn has_parameter(&self, name: &str) -> bool {
        self.record("has_parameter", name);
        self.parameters
            .as_ref()
            .is_some_and(|parameters| parameters.contains_key(name))
    }

    fn get_parameter(&self, name: &str) -> FactoryResult<Value> {
        self.record("get_parameter", name);
        self.parameters
            .as_ref()
            .and_then(|parameters| parameters.get(name))
            .cloned()
            .ok_or_else(|| FactoryError::ServiceNotFound(format!("parameter {}", name)))
    }
}

/// A connection a [`RecordingConnectionBuilder`] was asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionRequest {
    Redis { dsn: String, params: RedisParams },
    Memcached { dsns: Vec<String>, params: MemcachedParams },
    Couchbase { dsns: Vec<String>, params: CouchbaseParams },
    Database { dsn: String, params: PdoParams },
}

/// Connection builder that records requests and hands out local handles.
///
/// Redis and Memcached handles point at localhost and are never connected
/// unless used. Couchbase gets a [`MemoryBucket`]. Databases get a lazy
/// in-memory SQLite pool, so they need a Tokio runtime.
#[derive(Default)]
pub struct RecordingConnectionBuilder {
    requests: Mutex<Vec<ConnectionRequest>>,
}

impl RecordingConnectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<ConnectionRequest> {
        self.requests.lock().clone()
    }

    pub fn clear(&self) {
        self.requests.lock().clear();
    }

    fn record(&self, request: ConnectionRequest) {
        self.requests.lock().push(request);
    }
}

impl ConnectionBuilder for RecordingConnectionBuilder {
    fn redis(&self, dsn: &str, params: &RedisParams) -> FactoryResult<RedisConnection> {
        self.record(ConnectionRequest::Redis {
            dsn: dsn.to_string(),
            params: params.clone(),
        });
        Ok(RedisConnection::open("redis://127.0.0.1/")?)
    }

    fn memcached(&self, dsns: &[String], params: &MemcachedParams) -> FactoryResult<MemcachedClient> {
        self.record(ConnectionRequest::Memcached {
            dsns: dsns.to_vec(),
            params: params.clone(),
        });
        Ok(MemcachedClient::new(["127.0.0.1:11211"]).with_prefix_key(params.prefix_key.clone()))
    }

    fn couchbase(&self, dsns: &[String], params: &CouchbaseParams) -> FactoryResult<Arc<dyn CouchbaseBucket>> {
        self.record(ConnectionRequest::Couchbase {
            dsns: dsns.to_vec(),
            params: params.clone(),
        });
        Ok(Arc::new(MemoryBucket::default()))
    }

    fn database(&self, dsn: &str, params: &PdoParams) -> FactoryResult<AnyPool> {
        self.record(ConnectionRequest::Database {
            dsn: dsn.to_string(),
            params: params.clone(),
        });
        DefaultConnectionBuilder::new().database("sqlite::memory:", &PdoParams::default())
    }
}

/// In-memory [`CouchbaseBucket`]; expiry is not enforced.
#[derive(Default)]
pub struct MemoryBucket {
    documents: Mutex<HashMap<String, String>>,
}

impl MemoryBucket {
    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }
}

#[async_trait]
impl CouchbaseBucket for MemoryBucket {
    async fn get(&self, id: &str) -> CacheResult<Option<String>> {
        Ok(self.documents.lock().get(id).cloned())
    }

    async fn upsert(&self, id: &str, value: String, _expiry: u32) -> CacheResult<()> {
        self.documents.lock().insert(id.to_string(), value);
        Ok(())
    }

    async fn remove(&self, id: &str) -> CacheResult<()> {
        self.documents.lock().remove(id);
        Ok(())
    }

    async fn flush(&self) -> CacheResult<()> {
        self.documents.lock().clear();
        Ok(())
    }
}

/// In-memory [`CacheProvider`]; lifetimes are not enforced.
#[derive(Default)]
pub struct MemoryProvider {
    entries: Mutex<HashMap<String, String>>,
}

impl CacheProvider for MemoryProvider {
    fn fetch(&self, id: &str) -> CacheResult<Option<String>> {
        Ok(self.entries.lock().get(id).cloned())
    }

    fn save(&self, id: &str, data: String, _lifetime: u64) -> CacheResult<()> {
        self.entries.lock().insert(id.to_string(), data);
        Ok(())
    }

    fn delete(&self, id: &str) -> CacheResult<()> {
        self.entries.lock().remove(id);
        Ok(())
    }

    fn delete_all(&self) -> CacheResult<()> {
        self.entries.lock().clear();
        Ok(())
    }

    fn flush_all(&self) -> CacheResult<()> {
        self.entries.lock().clear();
        Ok(())
    }
}

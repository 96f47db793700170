//! Dispatch from configured type names to adapter factories.

use crate::adapter::{
    AdapterFactory, ApcuAdapterFactory, ArrayAdapterFactory, ChainAdapterFactory,
    CouchbaseAdapterFactory, FilesystemAdapterFactory, MemcachedAdapterFactory, PdoAdapterFactory,
    PhpArrayAdapterFactory, PhpFilesAdapterFactory, ProxyAdapterFactory, RedisAdapterFactory,
};
use crate::connection::ConnectionBuilder;
use crate::error::{FactoryError, FactoryResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// The built-in adapter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    Apcu,
    Array,
    Chain,
    Couchbase,
    Filesystem,
    Memcached,
    Pdo,
    PhpArray,
    PhpFiles,
    Proxy,
    Redis,
}

impl BackendType {
    pub const ALL: [BackendType; 11] = [
        Self::Apcu,
        Self::Array,
        Self::Chain,
        Self::Couchbase,
        Self::Filesystem,
        Self::Memcached,
        Self::Pdo,
        Self::PhpArray,
        Self::PhpFiles,
        Self::Proxy,
        Self::Redis,
    ];

    /// Match a type name case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        Self::ALL.into_iter().find(|backend| backend.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apcu => "apcu",
            Self::Array => "array",
            Self::Chain => "chain",
            Self::Couchbase => "couchbase",
            Self::Filesystem => "filesystem",
            Self::Memcached => "memcached",
            Self::Pdo => "pdo",
            Self::PhpArray => "phparray",
            Self::PhpFiles => "phpfiles",
            Self::Proxy => "proxy",
            Self::Redis => "redis",
        }
    }

    /// Reserved names always dispatch to the built-in factory.
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Pdo | Self::Memcached | Self::Redis)
    }

    /// A fresh factory of this type.
    pub fn factory(&self, connections: Arc<dyn ConnectionBuilder>) -> Box<dyn AdapterFactory> {
        match self {
            Self::Apcu => Box::new(ApcuAdapterFactory),
            Self::Array => Box::new(ArrayAdapterFactory),
            Self::Chain => Box::new(ChainAdapterFactory::new()),
            Self::Couchbase => Box::new(CouchbaseAdapterFactory::new(connections)),
            Self::Filesystem => Box::new(FilesystemAdapterFactory),
            Self::Memcached => Box::new(MemcachedAdapterFactory::new(connections)),
            Self::Pdo => Box::new(PdoAdapterFactory::new(connections)),
            Self::PhpArray => Box::new(PhpArrayAdapterFactory::new()),
            Self::PhpFiles => Box::new(PhpFilesAdapterFactory),
            Self::Proxy => Box::new(ProxyAdapterFactory::new()),
            Self::Redis => Box::new(RedisAdapterFactory::new(connections)),
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a type name resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryId {
    Builtin(BackendType),
    /// A name registered in the [`FactoryRegistry`], used verbatim
    Custom(String),
}

type Constructor = Arc<dyn Fn() -> Box<dyn AdapterFactory> + Send + Sync>;

#[derive(Clone)]
enum RegisteredType {
    Factory(Constructor),
    /// A named type that is not an adapter factory
    Plain(&'static str),
}

/// Named types known at runtime, consulted before the built-in names.
#[derive(Clone, Default)]
pub struct FactoryRegistry {
    types: HashMap<String, RegisteredType>,
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.types.keys().collect();
        names.sort();
        f.debug_struct("FactoryRegistry").field("types", &names).finish()
    }
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom adapter factory under `name`.
    ///
    /// `constructor` runs once per adapter build.
    pub fn register_factory<F, A>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: AdapterFactory + 'static,
    {
        let constructor: Constructor =
            Arc::new(move || Box::new(constructor()) as Box<dyn AdapterFactory>);
        self.types
            .insert(name.into(), RegisteredType::Factory(constructor));
        self
    }

    /// Register a named type that does not build adapters.
    ///
    /// Dispatching to it fails; this mirrors a configured type that exists
    /// but does not satisfy the factory contract.
    pub fn register_type<T: ?Sized>(&mut self, name: impl Into<String>) -> &mut Self {
        self.types
            .insert(name.into(), RegisteredType::Plain(std::any::type_name::<T>()));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Resolve a configured type name.
    ///
    /// A registered name wins unless it is a reserved built-in name
    /// (`pdo`, `memcached`, `redis`, any case); otherwise the built-in
    /// names are matched case-insensitively.
    pub fn resolve(&self, type_name: &str) -> Option<FactoryId> {
        let builtin = BackendType::from_name(type_name);
        let reserved = builtin.is_some_and(|backend| backend.is_reserved());

        if !reserved && self.types.contains_key(type_name) {
            trace!(type_name, "Resolved registered factory");
            return Some(FactoryId::Custom(type_name.to_string()));
        }

        builtin.map(FactoryId::Builtin)
    }

    /// Build a fresh factory for a resolved id.
    pub fn instantiate(
        &self,
        id: &FactoryId,
        connections: Arc<dyn ConnectionBuilder>,
    ) -> FactoryResult<Box<dyn AdapterFactory>> {
        match id {
            FactoryId::Builtin(backend) => Ok(backend.factory(connections)),
            FactoryId::Custom(name) => match self.types.get(name) {
                Some(RegisteredType::Factory(constructor)) => Ok(constructor()),
                Some(RegisteredType::Plain(type_name)) => Err(FactoryError::InvalidConfig(format!(
                    "Type {} ({}) must implement AdapterFactory",
                    name, type_name
                ))),
                None => Err(FactoryError::InvalidConfig(format!(
                    "Unable to locate a factory by the name of: {}",
                    name
                ))),
            },
        }
    }
}

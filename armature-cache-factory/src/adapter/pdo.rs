use super::{AdapterFactory, check_namespace, seconds};
use crate::connection::{ConnectionBuilder, DefaultConnectionBuilder};
use crate::error::{FactoryError, FactoryResult};
use crate::locator::{ContainerAware, ContainerSlot, resolve_cloned};
use crate::options::{self, Options, OptionsExt};
use armature_cache::{DatabaseCache, DatabaseSchema, SharedStore};
use sqlx::AnyPool;
use std::sync::Arc;
use tracing::debug;

/// Table layout and credentials of the database adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct PdoParams {
    pub db_table: String,
    pub db_id_col: String,
    /// Defaults to the id column name; configure it explicitly
    pub db_data_col: String,
    pub db_lifetime_col: String,
    pub db_time_col: String,
    pub db_username: String,
    pub db_password: String,
    /// Driver options appended to the DSN
    pub db_connection_options: Options,
}

impl Default for PdoParams {
    fn default() -> Self {
        Self {
            db_table: "cache_items".to_string(),
            db_id_col: "item_id".to_string(),
            db_data_col: "item_id".to_string(),
            db_lifetime_col: "item_lifetime".to_string(),
            db_time_col: "item_time".to_string(),
            db_username: String::new(),
            db_password: String::new(),
            db_connection_options: Options::new(),
        }
    }
}

impl PdoParams {
    pub fn from_options(options: &Options) -> Self {
        let d = Self::default();
        Self {
            db_table: options.string_or("db_table", &d.db_table),
            db_id_col: options.string_or("db_id_col", &d.db_id_col),
            db_data_col: options.string_or("db_data_col", &d.db_data_col),
            db_lifetime_col: options.string_or("db_lifetime_col", &d.db_lifetime_col),
            db_time_col: options.string_or("db_time_col", &d.db_time_col),
            db_username: options.string_or("db_username", &d.db_username),
            db_password: options.string_or("db_password", &d.db_password),
            db_connection_options: options.map_or_empty("db_connection_options"),
        }
    }

    /// The table layout handed to [`DatabaseCache`].
    pub fn schema(&self) -> DatabaseSchema {
        DatabaseSchema {
            table: self.db_table.clone(),
            id_col: self.db_id_col.clone(),
            data_col: self.db_data_col.clone(),
            lifetime_col: self.db_lifetime_col.clone(),
            time_col: self.db_time_col.clone(),
        }
    }
}

/// Database adapter; `client` is a pool service name or a DSN.
#[derive(Clone)]
pub struct PdoAdapterFactory {
    container: ContainerSlot,
    connections: Arc<dyn ConnectionBuilder>,
}

impl Default for PdoAdapterFactory {
    fn default() -> Self {
        Self::new(Arc::new(DefaultConnectionBuilder::new()))
    }
}

impl PdoAdapterFactory {
    pub fn new(connections: Arc<dyn ConnectionBuilder>) -> Self {
        Self {
            container: ContainerSlot::new(),
            connections,
        }
    }

    pub fn pool(&self, options: &Options, params: &PdoParams) -> FactoryResult<AnyPool> {
        let client = match options.non_empty("client") {
            Some(client) => options::to_string(client),
            None => {
                return Err(FactoryError::InvalidConfig(
                    "Missing client service name or dsn".to_string(),
                ));
            }
        };

        let container = self.container.get()?;
        if container.has(&client) {
            debug!(service = %client, "Using database pool service");
            return resolve_cloned::<AnyPool>(container, &client);
        }

        self.connections.database(&client, params)
    }
}

impl AdapterFactory for PdoAdapterFactory {
    fn create(&self, options: &Options) -> FactoryResult<SharedStore> {
        let params = PdoParams::from_options(options);
        let namespace = options.string_or("namespace", "");
        check_namespace(&namespace)?;

        let pool = self.pool(options, &params)?;

        Ok(Arc::new(DatabaseCache::new(
            pool,
            params.schema(),
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
    use crate::testing::{ConnectionRequest, RecordingConnectionBuilder, RecordingLocator};
    use serde_json::{Value, json};

    fn options(value: Value) -> Options {
        value.as_object().cloned().unwrap_or_default()
    }

    fn factory(locator: Arc<RecordingLocator>, connections: Arc<RecordingConnectionBuilder>) -> PdoAdapterFactory {
        let mut factory = PdoAdapterFactory::new(connections);
        factory.container.set(locator);
        factory
    }

    #[test]
    fn test_defaults() {
        let params = PdoParams::from_options(&Options::new());
        assert_eq!(params, PdoParams::default());
        assert_eq!(params.db_table, "cache_items");
        assert_eq!(params.db_data_col, "item_id");
        assert!(params.db_connection_options.is_empty());
    }

    #[test]
    fn test_schema_from_params() {
        let params = PdoParams::from_options(&options(json!({"db_data_col": "item_data", "db_table": "kv"})));
        let schema = params.schema();

        assert_eq!(schema.table, "kv");
        assert_eq!(schema.data_col, "item_data");
        assert!(schema.validate().is_ok());
        assert!(PdoParams::default().schema().validate().is_err());
    }

    #[test]
    fn test_falsy_client_is_invalid() {
        let factory = factory(
            Arc::new(RecordingLocator::new()),
            Arc::new(RecordingConnectionBuilder::new()),
        );

        for opts in [json!({}), json!({"client": ""}), json!({"client": false})] {
            assert!(matches!(
                factory.create(&options(opts)),
                Err(FactoryError::InvalidConfig(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_unknown_client_is_used_as_dsn() {
        let locator = Arc::new(RecordingLocator::new());
        let connections = Arc::new(RecordingConnectionBuilder::new());
        let factory = factory(locator.clone(), connections.clone());

        factory
            .create(&options(json!({"client": "sqlite::memory:", "db_username": "app"})))
            .unwrap();

        let expected = PdoParams {
            db_username: "app".to_string(),
            ..PdoParams::default()
        };
        assert_eq!(
            connections.requests(),
            vec![ConnectionRequest::Database {
                dsn: "sqlite::memory:".to_string(),
                params: expected,
            }]
        );
        assert_eq!(locator.calls(), vec!["has:sqlite::memory:"]);
    }

    #[tokio::test]
    async fn test_pool_service() {
        let pool = DefaultConnectionBuilder::new()
            .database("sqlite::memory:", &PdoParams::default())
            .unwrap();
        let locator = Arc::new(RecordingLocator::new().with_service("db", pool));
        let connections = Arc::new(RecordingConnectionBuilder::new());
        let factory = factory(locator.clone(), connections.clone());

        let store = factory
            .create(&options(json!({"client": "db", "db_data_col": "item_data"})))
            .unwrap();

        assert_eq!(locator.calls(), vec!["has:db", "get:db"]);
        assert!(connections.requests().is_empty());
        assert!(store.get_json("missing").await.is_err());
    }
}

//! Native connection handles built from DSNs.
//!
//! Every handle is lazy: nothing here touches the network, so building an
//! adapter never blocks. Connection failures surface on first use.

use crate::adapter::{CouchbaseParams, MemcachedParams, PdoParams, RedisParams};
use crate::error::{FactoryError, FactoryResult};
use crate::options::{self, Options};
use armature_cache::{CouchbaseBucket, MemcachedClient, RedisConnection};
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Opens a Couchbase bucket for a DSN list.
pub type CouchbaseConnector =
    Arc<dyn Fn(&[String], &CouchbaseParams) -> FactoryResult<Arc<dyn CouchbaseBucket>> + Send + Sync>;

/// Creates native connection handles for the networked adapters.
pub trait ConnectionBuilder: Send + Sync {
    fn redis(&self, dsn: &str, params: &RedisParams) -> FactoryResult<RedisConnection>;

    fn memcached(&self, dsns: &[String], params: &MemcachedParams) -> FactoryResult<MemcachedClient>;

    fn couchbase(&self, dsns: &[String], params: &CouchbaseParams) -> FactoryResult<Arc<dyn CouchbaseBucket>>;

    /// Open a pool; must be called from within a Tokio runtime.
    fn database(&self, dsn: &str, params: &PdoParams) -> FactoryResult<AnyPool>;
}

/// [`ConnectionBuilder`] over the `redis`, `memcache` and `sqlx` clients.
///
/// There is no Couchbase client in this stack; install one with
/// [`with_couchbase_connector`](Self::with_couchbase_connector).
#[derive(Clone, Default)]
pub struct DefaultConnectionBuilder {
    couchbase: Option<CouchbaseConnector>,
}

impl fmt::Debug for DefaultConnectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultConnectionBuilder")
            .field("couchbase", &self.couchbase.is_some())
            .finish()
    }
}

impl DefaultConnectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_couchbase_connector<F>(mut self, connector: F) -> Self
    where
        F: Fn(&[String], &CouchbaseParams) -> FactoryResult<Arc<dyn CouchbaseBucket>> + Send + Sync + 'static,
    {
        self.couchbase = Some(Arc::new(connector));
        self
    }
}

impl ConnectionBuilder for DefaultConnectionBuilder {
    fn redis(&self, dsn: &str, params: &RedisParams) -> FactoryResult<RedisConnection> {
        let mut connection = RedisConnection::open(dsn)
            .map_err(|e| FactoryError::Connection(format!("Invalid Redis DSN \"{}\": {}", dsn, e)))?;

        if params.timeout > 0 {
            connection = connection.with_connect_timeout(Duration::from_secs(params.timeout.unsigned_abs()));
        }
        if params.read_timeout > 0 {
            connection = connection.with_response_timeout(Duration::from_secs(params.read_timeout.unsigned_abs()));
        }

        debug!(timeout = params.timeout, read_timeout = params.read_timeout, "Redis connection configured");
        Ok(connection)
    }

    fn memcached(&self, dsns: &[String], params: &MemcachedParams) -> FactoryResult<MemcachedClient> {
        let servers = dsns
            .iter()
            .map(|dsn| memcached_url(dsn, params))
            .collect::<FactoryResult<Vec<_>>>()?;

        debug!(servers = servers.len(), "Memcached client configured");
        Ok(MemcachedClient::new(servers).with_prefix_key(params.prefix_key.clone()))
    }

    fn couchbase(&self, dsns: &[String], params: &CouchbaseParams) -> FactoryResult<Arc<dyn CouchbaseBucket>> {
        match &self.couchbase {
            Some(connect) => connect(dsns, params),
            None => Err(FactoryError::Connection(
                "No Couchbase connector is configured".to_string(),
            )),
        }
    }

    fn database(&self, dsn: &str, params: &PdoParams) -> FactoryResult<AnyPool> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(FactoryError::Connection(
                "Database pools must be created within a Tokio runtime".to_string(),
            ));
        }

        let url = database_url(dsn, params)?;
        sqlx::any::install_default_drivers();

        AnyPoolOptions::new()
            .connect_lazy(&url)
            .map_err(|e| FactoryError::Connection(format!("Unable to open database pool: {}", e)))
    }
}

/// Server URL understood by the `memcache` client.
///
/// `memcached://` DSNs and bare `host:port` addresses are accepted.
pub fn memcached_url(dsn: &str, params: &MemcachedParams) -> FactoryResult<String> {
    let dsn = match dsn.split_once("://") {
        Some(("memcached" | "memcache", rest)) => format!("memcache://{}", rest),
        Some((scheme, _)) => {
            return Err(FactoryError::Connection(format!(
                "Unsupported Memcached DSN scheme \"{}\"",
                scheme
            )));
        }
        None => format!("memcache://{}", dsn),
    };

    let mut url = Url::parse(&dsn)
        .map_err(|e| FactoryError::Connection(format!("Invalid Memcached DSN \"{}\": {}", dsn, e)))?;

    {
        let mut query = url.query_pairs_mut();
        if params.tcp_nodelay {
            query.append_pair("tcp_nodelay", "true");
        }
        if params.use_udp {
            query.append_pair("udp", "true");
        }

        let timeout = params.recv_timeout.max(params.send_timeout);
        if timeout > 0 {
            let secs = Duration::from_micros(timeout.unsigned_abs()).as_secs_f64();
            query.append_pair("timeout", &secs.to_string());
        }
    }

    // `query_pairs_mut` leaves an empty `?` behind when nothing was appended
    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url.into())
}

/// URL form of a database DSN with credentials and driver options applied.
///
/// `mysql:host=..;port=..;dbname=..` and `pgsql:` DSNs are converted, URLs
/// and `sqlite:` DSNs are used as given.
pub fn database_url(dsn: &str, params: &PdoParams) -> FactoryResult<String> {
    let dsn = normalize_database_dsn(dsn)?;

    let has_credentials = !params.db_username.is_empty();
    if !has_credentials && params.db_connection_options.is_empty() {
        return Ok(dsn);
    }

    let mut url = Url::parse(&dsn)
        .map_err(|e| FactoryError::Connection(format!("Invalid database DSN: {}", e)))?;

    if has_credentials {
        if url.has_host() && url.username().is_empty() {
            url.set_username(&params.db_username)
                .and_then(|_| {
                    let password = Some(params.db_password.as_str()).filter(|p| !p.is_empty());
                    url.set_password(password)
                })
                .map_err(|_| FactoryError::Connection("Unable to set database credentials".to_string()))?;
        } else if !url.has_host() {
            warn!(scheme = url.scheme(), "Database credentials ignored for a DSN without host");
        }
    }

    append_options(&mut url, &params.db_connection_options);
    Ok(url.into())
}

fn append_options(url: &mut Url, options: &Options) {
    if options.is_empty() {
        return;
    }

    let mut query = url.query_pairs_mut();
    for (key, value) in options {
        query.append_pair(key, &options::to_string(value));
    }
}

fn normalize_database_dsn(dsn: &str) -> FactoryResult<String> {
    if dsn.contains("://") || dsn.starts_with("sqlite:") {
        return Ok(dsn.to_string());
    }

    let (scheme, rest) = match dsn.split_once(':') {
        Some(("mysql", rest)) => ("mysql", rest),
        Some(("pgsql", rest)) => ("postgres", rest),
        _ => {
            return Err(FactoryError::Connection(format!(
                "Unsupported database DSN \"{}\"",
                dsn
            )));
        }
    };

    let mut host = "localhost";
    let mut port = None;
    let mut database = "";
    for pair in rest.split(';').filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some(("host", value)) => host = value,
            Some(("port", value)) => port = Some(value),
            Some(("dbname", value)) => database = value,
            _ => {}
        }
    }

    Ok(match port {
        Some(port) => format!("{}://{}:{}/{}", scheme, host, port, database),
        None => format!("{}://{}/{}", scheme, host, database),
    })
}

//! Multi-Datasource Registry
//!
//! Builds one [`DataSource`] per entry in [`RedisSettings`]: a store obtained
//! from a [`StoreConnector`], plus the [`CacheClient`] and [`CacheService`]
//! helpers over it. Sources are looked up by their configured name.
//!
//! ```text
//!  RedisSettings ──> DataSourceRegistry::from_settings
//!                          │
//!                          │  per data source
//!                          ▼
//!                    StoreConnector::connect ──> Arc<dyn KeyValueStore>
//!                          │
//!                          ▼
//!               DataSource { client, service }
//! ```

use crate::cache::{CacheClient, CacheService};
use crate::config::{DataSourceConfig, RedisSettings};
use crate::error::{Error, Result};
use crate::storage::{ExpiryConfig, ExpirySweeper, KeyValueStore, StorageEngine};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Name registered when the settings list no data sources.
pub const DEFAULT_DATA_SOURCE: &str = "default";

/// Opens the store behind a configured data source.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, name: &str, config: &DataSourceConfig) -> Result<Arc<dyn KeyValueStore>>;
}

/// Serves every data source from an in-process [`StorageEngine`].
///
/// Data sources with the same [`DataSourceConfig::url`] share one engine, so
/// two names pointing at the same host and database see the same keys.
///
/// When a Tokio runtime is available, each new engine gets an
/// [`ExpirySweeper`]. The pool's `time-between-eviction-runs-ms`, if set,
/// overrides the sweeper's base interval. Sweepers stop when the connector
/// is dropped.
#[derive(Default)]
pub struct MemoryConnector {
    engines: Mutex<HashMap<String, Arc<StorageEngine>>>,
    sweepers: Mutex<Vec<ExpirySweeper>>,
    expiry: ExpiryConfig,
}

impl fmt::Debug for MemoryConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let engines = self.engines.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("MemoryConnector")
            .field("endpoints", &engines.keys().collect::<Vec<_>>())
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `expiry` for the sweepers of engines created from now on.
    pub fn with_expiry_config(expiry: ExpiryConfig) -> Self {
        Self {
            expiry,
            ..Self::default()
        }
    }

    /// Uses the `expiry` block of `settings`.
    pub fn from_settings(settings: &RedisSettings) -> Self {
        Self::with_expiry_config(settings.expiry.clone())
    }

    /// The engine serving `url`, if one has been created.
    pub fn engine(&self, url: &str) -> Option<Arc<StorageEngine>> {
        self.engines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    /// Number of running sweepers.
    pub fn sweeper_count(&self) -> usize {
        self.sweepers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn start_sweeper(&self, engine: &Arc<StorageEngine>, config: &DataSourceConfig) {
        if !self.expiry.enabled {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            debug!("No Tokio runtime, expired keys are reclaimed lazily");
            return;
        }

        let expiry = match config.pool.eviction_interval() {
            Some(interval) => self.expiry.with_base_interval(interval),
            None => self.expiry.clone(),
        };
        let sweeper = ExpirySweeper::start(Arc::clone(engine), expiry);
        self.sweepers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sweeper);
    }
}

impl StoreConnector for MemoryConnector {
    fn connect(&self, name: &str, config: &DataSourceConfig) -> Result<Arc<dyn KeyValueStore>> {
        let url = config.url();
        let mut engines = self.engines.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(engine) = engines.get(&url) {
            debug!(name, "Reusing in-memory engine for shared endpoint");
            let engine: Arc<dyn KeyValueStore> = engine.clone();
            return Ok(engine);
        }

        let engine = Arc::new(StorageEngine::new());
        engines.insert(url, Arc::clone(&engine));
        drop(engines);

        self.start_sweeper(&engine, config);
        Ok(engine)
    }
}

/// A named data source and the helpers bound to it.
#[derive(Debug, Clone)]
pub struct DataSource {
    name: String,
    config: DataSourceConfig,
    client: CacheClient,
    service: CacheService,
}

impl DataSource {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    pub fn client(&self) -> &CacheClient {
        &self.client
    }

    pub fn service(&self) -> &CacheService {
        &self.service
    }
}

/// All configured data sources, keyed by name.
///
/// # Example
///
/// ```
/// use rediskit::config::RedisSettings;
/// use rediskit::registry::{DataSourceRegistry, MemoryConnector};
///
/// let settings = RedisSettings::from_yaml_str(
///     "data-source:\n  orders:\n    database: 1\n  users:\n    database: 2\n",
/// )
/// .unwrap();
/// let registry = DataSourceRegistry::from_settings(&settings, MemoryConnector::new()).unwrap();
///
/// registry.client("orders").unwrap().set("order:1", "pending");
/// assert_eq!(registry.client("users").unwrap().get("order:1").unwrap(), None);
/// ```
pub struct DataSourceRegistry {
    sources: BTreeMap<String, DataSource>,
    connector: Box<dyn StoreConnector>,
}

impl fmt::Debug for DataSourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceRegistry")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl DataSourceRegistry {
    /// Validates `settings` and connects every data source through `connector`.
    ///
    /// With no data sources configured, a single source named
    /// [`DEFAULT_DATA_SOURCE`] with default settings is registered.
    pub fn from_settings<C>(settings: &RedisSettings, connector: C) -> Result<Self>
    where
        C: StoreConnector + 'static,
    {
        settings.validate()?;

        let mut configured = settings.data_source.clone();
        if configured.is_empty() {
            configured.insert(DEFAULT_DATA_SOURCE.to_string(), DataSourceConfig::default());
        }

        let mut sources = BTreeMap::new();
        for (name, config) in configured {
            let store = connector.connect(&name, &config)?;
            let client = CacheClient::new(store);
            let service = CacheService::new(client.clone());

            info!(
                name = %name,
                host = %config.host,
                port = config.port,
                database = config.database,
                "Registered data source"
            );

            sources.insert(
                name.clone(),
                DataSource {
                    name,
                    config,
                    client,
                    service,
                },
            );
        }

        Ok(Self {
            sources,
            connector: Box::new(connector),
        })
    }

    /// Serves every data source from memory, with sweepers configured by
    /// the settings' `expiry` block.
    pub fn in_memory(settings: &RedisSettings) -> Result<Self> {
        Self::from_settings(settings, MemoryConnector::from_settings(settings))
    }

    /// Looks up a data source by name.
    pub fn get(&self, name: &str) -> Result<&DataSource> {
        self.sources
            .get(name)
            .ok_or_else(|| Error::UnknownDataSource(name.to_string()))
    }

    pub fn client(&self, name: &str) -> Result<&CacheClient> {
        self.get(name).map(DataSource::client)
    }

    pub fn service(&self, name: &str) -> Result<&CacheService> {
        self.get(name).map(DataSource::service)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Registered names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataSource> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The connector the stores were opened with.
    pub fn connector(&self) -> &dyn StoreConnector {
        self.connector.as_ref()
    }
}

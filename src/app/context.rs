use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::app::clock::{Clock, SystemClock};
use crate::app::error::{Result, ThriftError};
use crate::chat::ChatRegistry;
use crate::config::Config;
use crate::ledger::PointsLedger;
use crate::lifecycle::ItemLifecycle;
use crate::market::Marketplace;
use crate::notifier::{RealtimeNotifier, SessionHub};
use crate::store::{SqliteStore, Store};

/// Every service wired against one store, one clock and one session hub.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub hub: Arc<SessionHub>,
    pub ledger: PointsLedger,
    pub items: ItemLifecycle,
    pub chats: ChatRegistry,
    pub market: Marketplace,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.store.database_path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };
        debug!("Opening database at {}", db_path.display());

        let store: Arc<dyn Store> = Arc::new(SqliteStore::new(&db_path)?);
        Ok(Self::with_parts(config, store, Arc::new(SystemClock)))
    }

    pub fn in_memory() -> Result<Self> {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory()?);
        Ok(Self::with_parts(Config::default(), store, Arc::new(SystemClock)))
    }

    pub fn with_parts(config: Config, store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        let hub = Arc::new(SessionHub::new());
        let notifier = RealtimeNotifier::new(hub.clone());
        let retry = config.store.retry_policy();

        let ledger = PointsLedger::new(store.clone(), retry);
        let items = ItemLifecycle::new(store.clone(), clock.clone(), notifier.clone(), retry);
        let chats = ChatRegistry::new(store.clone(), clock, notifier, retry)
            .with_max_message_len(config.chat.max_message_len);
        let market = Marketplace::new(
            store.clone(),
            ledger.clone(),
            items.clone(),
            chats.clone(),
            config.points.clone(),
            config.boost.clone(),
        );

        Self {
            config,
            store,
            hub,
            ledger,
            items,
            chats,
            market,
        }
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| ThriftError::Config("Could not find data directory".into()))?;
        let app_dir = data_dir.join("campus-thrift");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("campus-thrift.db"))
    }
}

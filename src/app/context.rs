use anyhow::{Context, Result};
use log::debug;
use rusqlite::Connection;
use std::rc::Rc;

use crate::config::AppConfig;
use crate::db::store::{keys, read, write};
use crate::db::{PersistedStore, SqliteStore};
use crate::models::Theme;
use crate::notify::TerminalNotifier;
use crate::prayer_times::{ConfiguredLocation, ConfiguredPlaceName, SalahTimeSource};
use crate::schedule::ScheduleResolver;
use crate::tracker::{DailyState, HistoryStore};
use crate::utils::{Clock, SystemClock};

/// Shared handles every command builds its components from.
pub struct AppContext {
    pub config: AppConfig,
    pub store: Rc<dyn PersistedStore>,
    pub clock: Rc<dyn Clock>,
}

impl AppContext {
    pub fn new(config: AppConfig, store: Rc<dyn PersistedStore>, clock: Rc<dyn Clock>) -> Self {
        Self {
            config,
            store,
            clock,
        }
    }

    /// Open the on-disk store under the data directory.
    pub fn open(config: AppConfig) -> Result<Self> {
        AppConfig::ensure_data_dir()?;
        let db_path = AppConfig::db_path()?;
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Opening database at {:?}", db_path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        debug!("opened store at {:?}", db_path);

        let store = SqliteStore::new(conn)?;
        Ok(Self::new(config, Rc::new(store), Rc::new(SystemClock)))
    }

    pub fn daily(&self) -> DailyState {
        DailyState::load(self.store.clone(), self.clock.clone())
    }

    pub fn history(&self) -> HistoryStore {
        HistoryStore::load(self.store.clone(), self.clock.clone())
    }

    pub fn resolver(&self) -> Result<ScheduleResolver> {
        let times = SalahTimeSource::from_config(&self.config.calculation)?;
        Ok(ScheduleResolver::new(
            self.store.clone(),
            self.clock.clone(),
            Rc::new(ConfiguredLocation::from_config(&self.config.location)),
            Rc::new(ConfiguredPlaceName::from_config(&self.config.location)),
            Rc::new(times),
            self.config.resolver.clone(),
        ))
    }

    pub fn notifier(&self) -> TerminalNotifier {
        TerminalNotifier::new(self.config.notifications.enabled)
    }

    /// Stored theme preference; anything unreadable means dark.
    pub fn theme(&self) -> Theme {
        read(&*self.store, keys::THEME)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) {
        write(&*self.store, keys::THEME, theme.as_str());
    }
}

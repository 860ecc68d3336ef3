//! tourfind-service
//!
//! Facade used by a tour front end: owns the live index, answers queries and
//! turns a chosen result into navigation plus an element trigger.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::Context;
use tracing::{debug, info, warn};

use tourfind_core::config::{resolve_with_base, SearchConfig};
use tourfind_core::sources::{load_business_directory, load_sheet_rows, ExternalData};
use tourfind_core::{Error, Result, SearchIndex, TourHandle};
use tourfind_index::IndexBuilder;
use tourfind_query::{QueryEngine, QueryOutcome, ResultAction, SearchResult};
use tourfind_trigger::{ElementTrigger, TriggerHandle, TriggerOutcome};

/// What [`TourSearch::select`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Navigated { index: usize },
    /// Navigated to the parent panorama; the element trigger runs in the
    /// background.
    Triggering { parent_index: usize, element_id: String },
    Inert,
}

struct Settings {
    config: Arc<SearchConfig>,
    engine: Arc<QueryEngine>,
}

pub struct TourSearch {
    settings: RwLock<Arc<Settings>>,
    index: RwLock<Arc<SearchIndex>>,
    tour: Option<Arc<dyn TourHandle>>,
    pending: Mutex<Option<TriggerHandle>>,
}

impl TourSearch {
    /// Validates `config` and starts with an empty index; call
    /// [`TourSearch::prepare`] to build one.
    pub fn new(config: SearchConfig, tour: Option<Arc<dyn TourHandle>>) -> Result<Self> {
        config.validate()?;
        let settings = Settings::new(config);
        let mode = tourfind_index::resolve(&settings.config);
        Ok(Self {
            settings: RwLock::new(Arc::new(settings)),
            index: RwLock::new(Arc::new(SearchIndex::empty(mode))),
            tour,
            pending: Mutex::new(None),
        })
    }

    pub fn config(&self) -> Arc<SearchConfig> {
        self.settings().config.clone()
    }

    /// Current index. Queries keep the snapshot they started with.
    pub fn index(&self) -> Arc<SearchIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Build a fresh index and swap it in once complete.
    pub fn prepare(&self, external: &ExternalData) -> Arc<SearchIndex> {
        let settings = self.settings();
        let built = Arc::new(IndexBuilder::new(&settings.config).build(self.tour.as_deref(), external));
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = built.clone();
        info!(records = built.len(), mode = %built.mode(), "search index swapped in");
        built
    }

    /// Replace the configuration and rebuild the index from scratch.
    pub fn reconfigure(&self, config: SearchConfig, external: &ExternalData) -> Result<Arc<SearchIndex>> {
        config.validate()?;
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(Settings::new(config));
        debug!("configuration replaced");
        Ok(self.prepare(external))
    }

    pub fn query(&self, term: &str) -> QueryOutcome {
        let settings = self.settings();
        let index = self.index();
        settings.engine.query(term, &index, &settings.config)
    }

    /// Act on a chosen result. Any trigger still running from an earlier
    /// selection is cancelled first. `on_complete` is only called for
    /// results that trigger an element.
    pub fn select<F>(&self, result: &SearchResult, on_complete: F) -> Result<Selection>
    where
        F: FnOnce(bool) + Send + 'static,
    {
        self.cancel_pending();
        match &result.action {
            ResultAction::Inert => Ok(Selection::Inert),
            ResultAction::Navigate { index } => {
                self.navigate(*index)?;
                Ok(Selection::Navigated { index: *index })
            }
            ResultAction::NavigateAndTrigger { parent_index, element_id } => {
                let tour = self.navigate(*parent_index)?;
                if tokio::runtime::Handle::try_current().is_err() {
                    return Err(Error::Operation("element triggering needs a tokio runtime".into()));
                }
                let trigger = ElementTrigger::new(tour, self.config().element_triggering.clone());
                let handle = trigger.spawn(element_id.clone(), on_complete);
                *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                Ok(Selection::Triggering { parent_index: *parent_index, element_id: element_id.clone() })
            }
        }
    }

    /// Wait for the trigger started by the last selection, if any.
    pub async fn settle(&self) -> Option<TriggerOutcome> {
        let handle = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take()?;
        handle.wait().await
    }

    pub fn cancel_pending(&self) {
        if let Some(handle) = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take() {
            if !handle.is_finished() {
                debug!("cancelling in-flight element trigger");
            }
            handle.cancel();
        }
    }

    fn settings(&self) -> Arc<Settings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn navigate(&self, index: usize) -> Result<Arc<dyn TourHandle>> {
        let tour = self.tour.clone().ok_or_else(|| Error::Operation("no tour attached".into()))?;
        if !tour.select_panorama(index) {
            warn!(index, "tour rejected panorama selection");
            return Err(Error::NotFound(format!("panorama {index}")));
        }
        Ok(tour)
    }
}

impl Settings {
    fn new(config: SearchConfig) -> Self {
        let engine = Arc::new(QueryEngine::nucleo(&config));
        Self { config: Arc::new(config), engine }
    }
}

/// Load the feeds named in `config`, resolving relative paths against
/// `base`. Remote spreadsheet URLs are left to the caller.
pub fn load_feeds(config: &SearchConfig, base: &Path) -> anyhow::Result<ExternalData> {
    let mut external = ExternalData::default();
    if config.business_data.use_business_data {
        if let Some(file) = config.business_data.business_data_file.as_deref() {
            let path = resolve_with_base(base, file);
            external.business = load_business_directory(&path)
                .with_context(|| format!("loading business directory {}", path.display()))?;
        }
    }
    if config.google_sheets.use_google_sheet_data {
        match config.google_sheets.google_sheet_url.as_deref() {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                debug!(url, "remote spreadsheet left to the host");
            }
            Some(file) => {
                let path = resolve_with_base(base, file);
                external.sheets =
                    load_sheet_rows(&path).with_context(|| format!("loading spreadsheet rows {}", path.display()))?;
            }
            None => warn!("spreadsheet data enabled without a source"),
        }
    }
    Ok(external)
}

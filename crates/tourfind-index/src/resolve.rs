//! Data source selection.

use tracing::error;

use tourfind_core::config::SearchConfig;
use tourfind_core::DataSourceMode;

/// Outcome of resolving the exclusive data source flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub mode: DataSourceMode,
    /// Every exclusive source the configuration asked for, in priority order.
    pub requested: Vec<DataSourceMode>,
}

impl Resolution {
    pub fn is_conflicting(&self) -> bool {
        self.requested.len() > 1
    }
}

/// The active data source for one build.
pub fn resolve(config: &SearchConfig) -> DataSourceMode {
    resolve_detailed(config).mode
}

/// Like [`resolve`], also reporting which exclusive flags were set. More than
/// one set flag is logged as a configuration error; the highest priority
/// source still wins.
pub fn resolve_detailed(config: &SearchConfig) -> Resolution {
    let flags = [
        (DataSourceMode::Business, config.business_data.use_business_data && config.business_data.replace_tour_data),
        (DataSourceMode::CustomThumbnails, config.custom_thumbnails.use_as_data_source),
        (
            DataSourceMode::GoogleSheets,
            config.google_sheets.use_google_sheet_data && config.google_sheets.use_as_data_source,
        ),
    ];
    let requested: Vec<DataSourceMode> = flags.iter().filter(|(_, on)| *on).map(|(mode, _)| *mode).collect();
    let mode = requested.first().copied().unwrap_or(DataSourceMode::Tour);
    if requested.len() > 1 {
        error!(
            active = %mode,
            requested = ?requested,
            "more than one exclusive data source is enabled; using the highest priority one"
        );
    }
    Resolution { mode, requested }
}

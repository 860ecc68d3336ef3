//! Layered configuration and path helpers.
//!
//! Figment merges serialized defaults, `tourfind.toml`, `tourfind.<env>.toml`
//! and `TOURFIND_*` environment variables (`__` separates nested keys, which
//! keep their camelCase spelling). The
//! typed [`SearchConfig`] is read-only input to every component; changing it
//! means building a new value and rebuilding the index.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{ElementType, SearchField};
use crate::traits::WeightedField;

pub const CONFIG_VERSION: &str = "1.0";
pub const ENV_PREFIX: &str = "TOURFIND_";

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Load with `tourfind*.toml` looked up in `dir`.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("TOURFIND_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(SearchConfig::default()))
            .merge(Toml::file(dir.join("tourfind.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("tourfind.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("tourfind.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("tourfind.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["ENV"]).lowercase(false).split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The whole typed search configuration, validated.
    pub fn search(&self) -> anyhow::Result<SearchConfig> {
        let config: SearchConfig = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract search configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

/// Allow/deny list mode shared by every filter section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    None,
    Whitelist,
    Blacklist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    pub version: String,
    pub min_search_chars: usize,
    /// Group display names keyed by group (type) name.
    pub display_labels: BTreeMap<String, String>,
    pub include_content: IncludeContent,
    pub filter: FilterConfig,
    pub use_as_label: UseAsLabel,
    pub thumbnails: ThumbnailConfig,
    pub business_data: BusinessDataConfig,
    pub google_sheets: GoogleSheetsConfig,
    pub custom_thumbnails: CustomThumbnailsConfig,
    pub search_settings: SearchSettings,
    pub group_order: Vec<String>,
    pub result_filter: ResultFilter,
    pub element_triggering: TriggerConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncludeContent {
    pub unlabeled_with_subtitles: bool,
    pub unlabeled_with_tags: bool,
    pub completely_blank: bool,
    pub elements: ElementToggles,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementToggles {
    pub include_panoramas: bool,
    pub include_hotspots: bool,
    pub include_polygons: bool,
    pub include_videos: bool,
    pub include_webframes: bool,
    pub include_images: bool,
    pub include_text: bool,
    pub include_projected_images: bool,
    pub include_elements: bool,
    pub include_business: bool,
    pub skip_empty_labels: bool,
    pub min_label_length: usize,
    /// Switches for types without a dedicated field, keyed `include<Type>s`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    /// Top-level value filter over panorama label and subtitle.
    pub mode: FilterMode,
    pub allowed_values: Vec<String>,
    pub blacklisted_values: Vec<String>,
    pub media_indexes: MediaIndexFilter,
    pub element_types: TypeFilter,
    pub element_labels: LabelFilter,
    pub tag_filtering: TagFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaIndexFilter {
    pub mode: FilterMode,
    pub allowed: Vec<usize>,
    pub blacklisted: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypeFilter {
    pub mode: FilterMode,
    pub allowed_types: Vec<String>,
    pub blacklisted_types: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelFilter {
    pub mode: FilterMode,
    pub allowed_values: Vec<String>,
    pub blacklisted_values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TagFilter {
    pub mode: FilterMode,
    pub allowed_tags: Vec<String>,
    pub blacklisted_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UseAsLabel {
    pub subtitles: bool,
    pub tags: bool,
    pub element_type: bool,
    pub custom_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThumbnailConfig {
    pub enabled: bool,
    pub default_image_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BusinessDataConfig {
    pub use_business_data: bool,
    /// Business directory becomes the only data source.
    pub replace_tour_data: bool,
    pub business_data_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoogleSheetsConfig {
    pub use_google_sheet_data: bool,
    /// Spreadsheet rows become the only data source.
    pub use_as_data_source: bool,
    pub google_sheet_url: Option<String>,
    pub fetch_mode: FetchMode,
    pub caching_enabled: bool,
    pub cache_timeout_minutes: u64,
    pub progressive_loading: bool,
    pub use_auth: bool,
    pub auth_key_file: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomThumbnailsConfig {
    pub use_as_data_source: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchSettings {
    pub behavior: SearchBehavior,
    pub field_weights: FieldWeights,
}

/// Tuning handed to the fuzzy engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchBehavior {
    /// Largest accepted per-field distance, 0 (exact) to 1 (anything).
    pub threshold: f64,
    /// Characters over which a late match location costs a full point.
    pub distance: u32,
    pub ignore_location: bool,
    pub min_match_char_length: usize,
    pub use_extended_search: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldWeights {
    pub label: f64,
    pub subtitle: f64,
    pub tags: f64,
    pub parent_label: f64,
    pub business_name: f64,
    pub business_tag: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResultFilter {
    pub mode: FilterMode,
    pub allowed_types: Vec<String>,
    pub blacklisted_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TriggerConfig {
    pub initial_delay_ms: u64,
    pub base_retry_interval_ms: u64,
    pub max_retry_interval_ms: u64,
    pub max_retries: u32,
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        let behavior = &self.search_settings.behavior;
        if !(0.0..=1.0).contains(&behavior.threshold) {
            return Err(Error::InvalidConfig(format!(
                "searchSettings.behavior.threshold must be within [0, 1], got {}",
                behavior.threshold
            )));
        }
        if behavior.distance == 0 {
            return Err(Error::InvalidConfig("searchSettings.behavior.distance must be positive".into()));
        }
        if self.min_search_chars == 0 {
            return Err(Error::InvalidConfig("minSearchChars must be at least 1".into()));
        }
        let trigger = &self.element_triggering;
        if trigger.max_retry_interval_ms < trigger.base_retry_interval_ms {
            return Err(Error::InvalidConfig(format!(
                "elementTriggering.maxRetryIntervalMs ({}) is below baseRetryIntervalMs ({})",
                trigger.max_retry_interval_ms, trigger.base_retry_interval_ms
            )));
        }
        Ok(())
    }

    /// Business directory enriches tour records instead of replacing them.
    pub fn business_enhancement(&self) -> bool {
        self.business_data.use_business_data && !self.business_data.replace_tour_data
    }

    /// Spreadsheet rows enrich tour records instead of replacing them.
    pub fn sheets_enhancement(&self) -> bool {
        self.google_sheets.use_google_sheet_data && !self.google_sheets.use_as_data_source
    }

    /// Weighted fields for the fuzzy engine, highest weight first.
    pub fn weighted_fields(&self) -> Vec<WeightedField> {
        let w = &self.search_settings.field_weights;
        let mut fields = vec![
            WeightedField { field: SearchField::Label, weight: w.label },
            WeightedField { field: SearchField::Subtitle, weight: w.subtitle },
            WeightedField { field: SearchField::Tags, weight: w.tags },
            WeightedField { field: SearchField::ParentLabel, weight: w.parent_label },
        ];
        if self.business_data.use_business_data {
            fields.push(WeightedField { field: SearchField::BusinessName, weight: w.business_name });
            fields.push(WeightedField { field: SearchField::BusinessTag, weight: w.business_tag });
        }
        fields.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
        fields
    }

    /// Display name for a result group.
    pub fn display_label<'a>(&'a self, group: &'a str) -> &'a str {
        self.display_labels.get(group).map_or(group, String::as_str)
    }
}

impl ElementToggles {
    /// Master switch for `kind`; `None` when nothing is configured for it.
    pub fn switch_for(&self, kind: &ElementType) -> Option<bool> {
        let flag = match kind {
            ElementType::Panorama => self.include_panoramas,
            ElementType::Hotspot => self.include_hotspots,
            ElementType::Polygon => self.include_polygons,
            ElementType::Video => self.include_videos,
            ElementType::Webframe => self.include_webframes,
            ElementType::Image => self.include_images,
            ElementType::Text => self.include_text,
            ElementType::ProjectedImage => self.include_projected_images,
            ElementType::Element => self.include_elements,
            ElementType::Business => self.include_business,
            ElementType::Custom(name) => return self.extra.get(&format!("include{name}s")).copied(),
        };
        Some(flag)
    }
}

impl TriggerConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_retry_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_retry_interval_ms)
    }
}

impl Default for ElementToggles {
    fn default() -> Self {
        Self {
            include_panoramas: true,
            include_hotspots: true,
            include_polygons: true,
            include_videos: true,
            include_webframes: true,
            include_images: true,
            include_text: true,
            include_projected_images: true,
            include_elements: true,
            include_business: true,
            skip_empty_labels: false,
            min_label_length: 0,
            extra: BTreeMap::new(),
        }
    }
}

impl Default for UseAsLabel {
    fn default() -> Self {
        Self { subtitles: true, tags: true, element_type: false, custom_text: "[Unnamed Item]".to_string() }
    }
}

impl Default for GoogleSheetsConfig {
    fn default() -> Self {
        Self {
            use_google_sheet_data: false,
            use_as_data_source: false,
            google_sheet_url: None,
            fetch_mode: FetchMode::Csv,
            caching_enabled: false,
            cache_timeout_minutes: 60,
            progressive_loading: false,
            use_auth: false,
            auth_key_file: None,
        }
    }
}

impl Default for SearchBehavior {
    fn default() -> Self {
        Self { threshold: 0.4, distance: 40, ignore_location: true, min_match_char_length: 1, use_extended_search: true }
    }
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self { label: 1.0, subtitle: 0.8, tags: 0.6, parent_label: 0.3, business_name: 0.9, business_tag: 0.5 }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self { initial_delay_ms: 300, base_retry_interval_ms: 300, max_retry_interval_ms: 1000, max_retries: 3 }
    }
}

/// Default group display order.
pub fn default_group_order() -> Vec<String> {
    ["Panorama", "Hotspot", "Polygon", "Video", "Webframe", "Image", "Text", "ProjectedImage", "Element", "Business"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            min_search_chars: 2,
            display_labels: BTreeMap::new(),
            include_content: IncludeContent::default(),
            filter: FilterConfig::default(),
            use_as_label: UseAsLabel::default(),
            thumbnails: ThumbnailConfig::default(),
            business_data: BusinessDataConfig::default(),
            google_sheets: GoogleSheetsConfig::default(),
            custom_thumbnails: CustomThumbnailsConfig::default(),
            search_settings: SearchSettings::default(),
            group_order: default_group_order(),
            result_filter: ResultFilter::default(),
            element_triggering: TriggerConfig::default(),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

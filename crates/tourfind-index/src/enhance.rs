//! Cross-referencing tour records with external feeds.
//!
//! Enhancement only ever augments a record: it swaps in the external display
//! name, fills gaps in subtitle and image, attaches the matched payload and
//! raises the boost. A record is never dropped here.

use tracing::trace;

use tourfind_core::config::SearchConfig;
use tourfind_core::sources::{BusinessEntry, ExternalData, SheetRow};
use tourfind_core::{DataSourceTag, SearchRecord};

pub const ENHANCED_BOOST: f64 = 0.5;

pub const SHEET_NAME_KEYS: [&str; 4] = ["name", "title", "label", "id"];
pub const SHEET_DESCRIPTION_KEYS: [&str; 3] = ["description", "summary", "details"];
pub const SHEET_TAG_KEYS: [&str; 3] = ["tag", "tags", "categories"];
pub const SHEET_IMAGE_KEYS: [&str; 4] = ["imageUrl", "image", "thumbnail", "thumbnailUrl"];

/// Which source enhanced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enhancement {
    Business,
    Sheets,
}

pub struct Enhancer<'a> {
    business: &'a [BusinessEntry],
    sheets: &'a [SheetRow],
}

impl<'a> Enhancer<'a> {
    /// Sources that are configured as enhancers; feeds running as the
    /// exclusive data source are not consulted.
    pub fn new(config: &SearchConfig, external: &'a ExternalData) -> Self {
        let business: &[BusinessEntry] = if config.business_enhancement() { &external.business } else { &[] };
        let sheets: &[SheetRow] = if config.sheets_enhancement() { &external.sheets } else { &[] };
        Self { business, sheets }
    }

    pub fn is_active(&self) -> bool {
        !self.business.is_empty() || !self.sheets.is_empty()
    }

    /// Enhance `record` from the first matching entry, business before sheets.
    pub fn apply(&self, record: &mut SearchRecord) -> Option<Enhancement> {
        if let Some(entry) = self.business.iter().find(|e| business_matches(e, record)) {
            apply_business(entry, record);
            trace!(label = %record.label, "enhanced from business directory");
            return Some(Enhancement::Business);
        }
        if let Some(row) = self.sheets.iter().find(|r| sheet_matches(r, record)) {
            apply_sheet(row, record);
            trace!(label = %record.label, "enhanced from spreadsheet");
            return Some(Enhancement::Sheets);
        }
        None
    }
}

fn business_matches(entry: &BusinessEntry, record: &SearchRecord) -> bool {
    if let Some(id) = record.id.as_deref() {
        let by_id = entry.id.as_deref() == Some(id) || entry.tag.as_deref().map(str::trim) == Some(id);
        if by_id {
            return true;
        }
    }
    entry.display_name().is_some_and(|name| label_contains(&record.original_label, name))
}

fn sheet_matches(row: &SheetRow, record: &SearchRecord) -> bool {
    if let (Some(id), Some(row_id)) = (record.id.as_deref(), row.text("id")) {
        if row_id == id {
            return true;
        }
    }
    row.first_text(&SHEET_NAME_KEYS[..3])
        .is_some_and(|name| label_contains(&record.original_label, &name))
}

fn label_contains(label: &str, name: &str) -> bool {
    !label.is_empty() && label.to_lowercase().contains(&name.to_lowercase())
}

fn apply_business(entry: &BusinessEntry, record: &mut SearchRecord) {
    if let Some(name) = entry.display_name() {
        record.label = name.to_string();
    }
    if record.subtitle.is_none() {
        record.subtitle = entry.description.clone().filter(|d| !d.trim().is_empty());
    }
    if let Some(image) = entry.image_url.clone() {
        record.image_url = Some(image);
    }
    record.business_data = Some(entry.to_payload());
    mark_enhanced(record);
}

fn apply_sheet(row: &SheetRow, record: &mut SearchRecord) {
    if let Some(name) = row.first_text(&SHEET_NAME_KEYS[..3]) {
        record.label = name;
    }
    if record.subtitle.is_none() {
        record.subtitle = row.first_text(&SHEET_DESCRIPTION_KEYS);
    }
    if let Some(image) = row.first_text(&SHEET_IMAGE_KEYS) {
        record.image_url = Some(image);
    }
    record.sheets_data = Some(row.to_payload());
    mark_enhanced(record);
}

fn mark_enhanced(record: &mut SearchRecord) {
    record.data_source = DataSourceTag::Enhanced;
    record.boost += ENHANCED_BOOST;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tourfind_core::ElementType;

    fn external() -> ExternalData {
        ExternalData {
            business: vec![BusinessEntry {
                id: Some("hs-cafe".into()),
                name: Some("Cafe Nero".into()),
                tag: Some("cafe".into()),
                description: Some("Coffee and cake".into()),
                ..BusinessEntry::default()
            }],
            sheets: vec![SheetRow(
                json!({"title": "Gift Shop", "summary": "Souvenirs", "image": "shop.jpg"})
                    .as_object()
                    .cloned()
                    .expect("row"),
            )],
        }
    }

    fn config(business: bool, sheets: bool) -> SearchConfig {
        let mut config = SearchConfig::default();
        config.business_data.use_business_data = business;
        config.google_sheets.use_google_sheet_data = sheets;
        config
    }

    #[test]
    fn business_matches_by_id_before_sheets() {
        let data = external();
        let config = config(true, true);
        let enhancer = Enhancer::new(&config, &data);
        let mut record = SearchRecord::new(ElementType::Hotspot, "gift shop door", DataSourceTag::Tour);
        record.id = Some("hs-cafe".into());

        assert_eq!(enhancer.apply(&mut record), Some(Enhancement::Business));
        assert_eq!(record.label, "Cafe Nero");
        assert_eq!(record.original_label, "gift shop door");
        assert_eq!(record.subtitle.as_deref(), Some("Coffee and cake"));
        assert_eq!(record.data_source, DataSourceTag::Enhanced);
        assert!((record.boost - 1.5).abs() < f64::EPSILON);
        assert!(record.sheets_data.is_none());
    }

    #[test]
    fn sheets_match_on_label_substring() {
        let data = external();
        let config = config(false, true);
        let enhancer = Enhancer::new(&config, &data);
        let mut record = SearchRecord::new(ElementType::Panorama, "The GIFT SHOP entrance", DataSourceTag::Tour);

        assert_eq!(enhancer.apply(&mut record), Some(Enhancement::Sheets));
        assert_eq!(record.label, "Gift Shop");
        assert_eq!(record.subtitle.as_deref(), Some("Souvenirs"));
        assert_eq!(record.image_url.as_deref(), Some("shop.jpg"));
    }

    #[test]
    fn exclusive_feeds_are_not_used_for_enhancement() {
        let data = external();
        let mut config = config(true, false);
        config.business_data.replace_tour_data = true;
        let enhancer = Enhancer::new(&config, &data);
        assert!(!enhancer.is_active());

        let mut record = SearchRecord::new(ElementType::Panorama, "Cafe Nero terrace", DataSourceTag::Tour);
        assert_eq!(enhancer.apply(&mut record), None);
        assert_eq!(record.data_source, DataSourceTag::Tour);
    }
}

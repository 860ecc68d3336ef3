//! Index construction.
//!
//! [`IndexBuilder::build`] resolves the data source, walks it and returns a
//! fresh [`SearchIndex`]. It never fails: anything that goes wrong inside is
//! logged and yields an empty index for the resolved mode.

use tracing::{debug, info, trace, warn};

use tourfind_core::config::SearchConfig;
use tourfind_core::host::{data_container, identity, property, text_property};
use tourfind_core::sources::{BusinessEntry, ExternalData, SheetRow};
use tourfind_core::{DataSourceMode, DataSourceTag, ElementType, Error, HostObject, HostRef, Result, SearchIndex, SearchRecord, TourHandle};

use crate::classify::classify;
use crate::enhance::{Enhancer, SHEET_DESCRIPTION_KEYS, SHEET_IMAGE_KEYS, SHEET_NAME_KEYS, SHEET_TAG_KEYS};
use crate::harvest::harvest;
use crate::policy::{element_verdict, panorama_verdict, passes_type_filter, PanoramaFacts};
use crate::resolve::resolve;

pub const LABELED_PANORAMA_BOOST: f64 = 1.5;
pub const BLANK_PANORAMA_BOOST: f64 = 1.0;
pub const CHILD_BOOST: f64 = 0.8;
pub const NAMED_BUSINESS_BOOST: f64 = 1.2;
pub const UNNAMED_BUSINESS_BOOST: f64 = 1.0;
pub const NAMED_ROW_BOOST: f64 = 1.0;
pub const UNNAMED_ROW_BOOST: f64 = 0.8;

const SHEET_TYPE_KEYS: [&str; 2] = ["type", "elementType"];

pub struct IndexBuilder<'a> {
    config: &'a SearchConfig,
}

/// Label, subtitle and tags of a scene node, read from its metadata
/// container with the node itself as fallback.
#[derive(Debug, Default)]
struct NodeMeta {
    label: String,
    subtitle: Option<String>,
    tags: Vec<String>,
}

impl NodeMeta {
    fn read(node: &dyn HostObject) -> Self {
        let data = data_container(node);
        let text = |name: &str| {
            data.as_deref()
                .and_then(|d| text_property(d, name))
                .or_else(|| text_property(node, name))
        };
        let tags = data
            .as_deref()
            .and_then(|d| property(d, "tags"))
            .or_else(|| property(node, "tags"))
            .map(|v| v.string_list())
            .unwrap_or_default();
        Self {
            label: text("label").unwrap_or_default(),
            subtitle: text("subtitle").or_else(|| text("description")),
            tags,
        }
    }
}

impl<'a> IndexBuilder<'a> {
    pub fn new(config: &'a SearchConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, tour: Option<&dyn TourHandle>, external: &ExternalData) -> SearchIndex {
        let mode = resolve(self.config);
        match self.records_for(mode, tour, external) {
            Ok(records) => {
                if records.is_empty() {
                    warn!(%mode, "index build produced no records");
                }
                info!(%mode, records = records.len(), "search index built");
                SearchIndex::new(mode, records)
            }
            Err(err) => {
                warn!(%mode, error = %err, "index build failed; serving an empty index");
                SearchIndex::empty(mode)
            }
        }
    }

    fn records_for(
        &self,
        mode: DataSourceMode,
        tour: Option<&dyn TourHandle>,
        external: &ExternalData,
    ) -> Result<Vec<SearchRecord>> {
        match mode {
            DataSourceMode::Tour => {
                let tour = tour.ok_or_else(|| Error::NotFound("tour handle for tour mode".into()))?;
                Ok(self.tour_records(tour, external))
            }
            DataSourceMode::Business => Ok(self.business_records(&external.business)),
            DataSourceMode::GoogleSheets => Ok(self.sheet_records(&external.sheets)),
            DataSourceMode::CustomThumbnails => {
                debug!("custom thumbnails source has no records to offer");
                Ok(Vec::new())
            }
        }
    }

    fn tour_records(&self, tour: &dyn TourHandle, external: &ExternalData) -> Vec<SearchRecord> {
        let items = tour.playlist_items();
        if items.is_empty() {
            warn!("tour exposes no playlist items");
        }
        let enhancer = Enhancer::new(self.config, external);
        let mut records = Vec::new();

        for (index, item) in items.iter().enumerate() {
            let media: HostRef = property(item.as_ref(), "media")
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_else(|| item.clone());
            let meta = NodeMeta::read(media.as_ref());
            let parent_label = self.display_label(&ElementType::Panorama, &meta);

            let facts = PanoramaFacts { index, label: &meta.label, subtitle: meta.subtitle.as_deref(), tags: &meta.tags };
            match panorama_verdict(&facts, self.config) {
                Ok(()) => {
                    let mut record = self.panorama_record(index, media.as_ref(), &meta, &parent_label);
                    enhancer.apply(&mut record);
                    records.push(record);
                }
                Err(reason) => trace!(index, %reason, "panorama excluded"),
            }

            let found = harvest(media.as_ref(), tour, Some(item.as_ref()));
            for overlay in &found.overlays {
                if let Some(mut record) = self.child_record(overlay.as_ref(), index, &parent_label) {
                    enhancer.apply(&mut record);
                    records.push(record);
                }
            }
        }
        records
    }

    fn panorama_record(&self, index: usize, media: &dyn HostObject, meta: &NodeMeta, label: &str) -> SearchRecord {
        let mut record = SearchRecord::new(ElementType::Panorama, label, DataSourceTag::Tour);
        record.original_label = meta.label.clone();
        record.subtitle = meta.subtitle.clone();
        record.tags = meta.tags.clone();
        record.index = Some(index);
        record.boost = if meta.label.is_empty() { BLANK_PANORAMA_BOOST } else { LABELED_PANORAMA_BOOST };
        if self.config.thumbnails.enabled {
            record.image_url = text_property(media, "thumbnailUrl").or_else(|| self.config.thumbnails.default_image_path.clone());
        }
        record
    }

    fn child_record(&self, overlay: &dyn HostObject, parent_index: usize, parent_label: &str) -> Option<SearchRecord> {
        let meta = NodeMeta::read(overlay);
        let kind = classify(overlay, &meta.label);
        if let Err(reason) = element_verdict(&kind, &meta.label, &meta.tags, self.config) {
            trace!(%kind, label = %meta.label, %reason, "element excluded");
            return None;
        }

        let label = self.display_label(&kind, &meta);
        let mut record = SearchRecord::new(kind, label, DataSourceTag::Tour);
        record.original_label = meta.label;
        record.subtitle = meta.subtitle;
        record.tags = meta.tags;
        record.id = identity(overlay);
        record.parent_index = Some(parent_index);
        record.parent_label = Some(parent_label.to_string());
        record.boost = CHILD_BOOST;
        Some(record)
    }

    /// Display label fallback chain: explicit label, subtitle, joined tags,
    /// type name, configured placeholder. The middle three are opt-in.
    fn display_label(&self, kind: &ElementType, meta: &NodeMeta) -> String {
        let rules = &self.config.use_as_label;
        if !meta.label.is_empty() {
            return meta.label.clone();
        }
        if rules.subtitles {
            if let Some(subtitle) = &meta.subtitle {
                return subtitle.clone();
            }
        }
        if rules.tags && !meta.tags.is_empty() {
            return meta.tags.join(", ");
        }
        if rules.element_type {
            return kind.to_string();
        }
        rules.custom_text.clone()
    }

    fn business_records(&self, entries: &[BusinessEntry]) -> Vec<SearchRecord> {
        if entries.is_empty() {
            warn!("business directory is empty");
        }
        if !self.type_enabled(&ElementType::Business) {
            debug!("Business type is filtered out");
            return Vec::new();
        }
        entries
            .iter()
            .map(|entry| {
                let name = entry.display_name();
                let label = name.map_or_else(|| self.config.use_as_label.custom_text.clone(), str::to_string);
                let mut record = SearchRecord::new(ElementType::Business, label, DataSourceTag::Business);
                record.original_label = name.unwrap_or_default().to_string();
                record.subtitle = entry.description.clone().filter(|d| !d.trim().is_empty());
                record.tags = entry.all_tags();
                record.id = entry.id.clone();
                record.image_url = entry.image_url.clone();
                record.boost = if name.is_some() { NAMED_BUSINESS_BOOST } else { UNNAMED_BUSINESS_BOOST };
                record.business_data = Some(entry.to_payload());
                record
            })
            .collect()
    }

    /// Type filter plus the per-type switch, for records that bypass the
    /// element policy.
    fn type_enabled(&self, kind: &ElementType) -> bool {
        passes_type_filter(kind, self.config) && self.config.include_content.elements.switch_for(kind) != Some(false)
    }

    fn sheet_records(&self, rows: &[SheetRow]) -> Vec<SearchRecord> {
        if rows.is_empty() {
            warn!("spreadsheet feed is empty");
        }
        rows.iter()
            .filter_map(|row| {
                let kind = row.first_text(&SHEET_TYPE_KEYS).map_or(ElementType::Element, |t| sheet_type(&t));
                if !self.type_enabled(&kind) {
                    trace!(%kind, "row type filtered");
                    return None;
                }
                let name = row.first_text(&SHEET_NAME_KEYS);
                let label = name.clone().unwrap_or_else(|| self.config.use_as_label.custom_text.clone());
                let mut record = SearchRecord::new(kind, label, DataSourceTag::GoogleSheets);
                record.original_label = name.clone().unwrap_or_default();
                record.subtitle = row.first_text(&SHEET_DESCRIPTION_KEYS);
                record.tags = row.tag_list(&SHEET_TAG_KEYS);
                record.id = row.text("id");
                record.index = row.index("index");
                record.parent_index = row.index("parentIndex");
                record.parent_label = row.text("parentLabel");
                record.image_url = row.first_text(&SHEET_IMAGE_KEYS);
                record.boost = if name.is_some() { NAMED_ROW_BOOST } else { UNNAMED_ROW_BOOST };
                record.sheets_data = Some(row.to_payload());
                Some(record)
            })
            .collect()
    }
}

/// Case-insensitive element type aliases used by spreadsheet feeds.
/// Unknown names are kept verbatim as custom types.
pub fn sheet_type(raw: &str) -> ElementType {
    match raw.trim().to_lowercase().as_str() {
        "" | "element" => ElementType::Element,
        "panorama" | "pano" | "scene" => ElementType::Panorama,
        "hotspot" | "spot" | "point" => ElementType::Hotspot,
        "polygon" | "area" | "region" => ElementType::Polygon,
        "video" => ElementType::Video,
        "webframe" | "web" | "iframe" | "frame" => ElementType::Webframe,
        "image" | "photo" | "picture" => ElementType::Image,
        "text" | "label" => ElementType::Text,
        "projectedimage" | "projected-image" => ElementType::ProjectedImage,
        "business" => ElementType::Business,
        _ => ElementType::Custom(raw.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_type_aliases() {
        assert_eq!(sheet_type("Pano"), ElementType::Panorama);
        assert_eq!(sheet_type(" IFRAME "), ElementType::Webframe);
        assert_eq!(sheet_type("projected-image"), ElementType::ProjectedImage);
        assert_eq!(sheet_type("Model3D"), ElementType::Custom("Model3D".into()));
    }

    #[test]
    fn display_label_chain() {
        let mut config = SearchConfig::default();
        let builder = IndexBuilder::new(&config);
        let meta = NodeMeta { label: String::new(), subtitle: None, tags: vec!["a".into(), "b".into()] };
        assert_eq!(builder.display_label(&ElementType::Video, &meta), "a, b");

        config.use_as_label.tags = false;
        config.use_as_label.element_type = true;
        let builder = IndexBuilder::new(&config);
        assert_eq!(builder.display_label(&ElementType::Video, &meta), "Video");

        config.use_as_label.element_type = false;
        let builder = IndexBuilder::new(&config);
        assert_eq!(builder.display_label(&ElementType::Video, &NodeMeta::default()), "[Unnamed Item]");
    }

    #[test]
    fn missing_tour_yields_empty_index() {
        let config = SearchConfig::default();
        let index = IndexBuilder::new(&config).build(None, &ExternalData::default());
        assert_eq!(index.mode(), DataSourceMode::Tour);
        assert!(index.is_empty());
    }
}

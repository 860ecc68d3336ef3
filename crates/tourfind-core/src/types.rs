//! Domain types shared by the index builder and the query engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic kind of an indexed item.
///
/// The closed variants cover everything the classifier can emit plus the
/// synthetic `Business` kind. `Custom` keeps unrecognized kinds coming from
/// free-form feeds (spreadsheet rows) verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementType {
    Panorama,
    Hotspot,
    Polygon,
    Video,
    Webframe,
    Image,
    Text,
    ProjectedImage,
    Element,
    Business,
    Custom(String),
}

impl ElementType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Panorama => "Panorama",
            Self::Hotspot => "Hotspot",
            Self::Polygon => "Polygon",
            Self::Video => "Video",
            Self::Webframe => "Webframe",
            Self::Image => "Image",
            Self::Text => "Text",
            Self::ProjectedImage => "ProjectedImage",
            Self::Element => "Element",
            Self::Business => "Business",
            Self::Custom(name) => name,
        }
    }

    /// Exact, case-sensitive lookup of a canonical type name.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "Panorama" => Self::Panorama,
            "Hotspot" => Self::Hotspot,
            "Polygon" => Self::Polygon,
            "Video" => Self::Video,
            "Webframe" => Self::Webframe,
            "Image" => Self::Image,
            "Text" => Self::Text,
            "ProjectedImage" => Self::ProjectedImage,
            "Element" => Self::Element,
            "Business" => Self::Business,
            _ => return None,
        };
        Some(kind)
    }
}

impl From<String> for ElementType {
    fn from(value: String) -> Self {
        Self::from_name(&value).unwrap_or(Self::Custom(value))
    }
}

impl From<ElementType> for String {
    fn from(value: ElementType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataSourceTag {
    Tour,
    Business,
    GoogleSheets,
    /// Tour-origin record augmented with matched external data.
    Enhanced,
}

/// The single source that supplies index content for one build.
///
/// Variants are declared in priority order: when several exclusive flags are
/// set the earliest one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataSourceMode {
    Business,
    CustomThumbnails,
    GoogleSheets,
    Tour,
}

impl fmt::Display for DataSourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Business => "business",
            Self::CustomThumbnails => "customThumbnails",
            Self::GoogleSheets => "googleSheets",
            Self::Tour => "tour",
        };
        f.write_str(name)
    }
}

/// Searchable fields of a record, as addressed by weighted-key specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchField {
    Label,
    Subtitle,
    Tags,
    ParentLabel,
    BusinessName,
    BusinessTag,
}

/// The unit indexed and returned by queries.
///
/// Records are built in full on every index preparation and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    #[serde(rename = "type")]
    pub kind: ElementType,
    pub label: String,
    pub original_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_label: Option<String>,
    pub data_source: DataSourceTag,
    pub boost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheets_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_data: Option<serde_json::Value>,
}

impl SearchRecord {
    pub fn new(kind: ElementType, label: impl Into<String>, data_source: DataSourceTag) -> Self {
        let label = label.into();
        Self {
            kind,
            original_label: label.clone(),
            label,
            subtitle: None,
            tags: Vec::new(),
            id: None,
            index: None,
            parent_index: None,
            parent_label: None,
            data_source,
            boost: 1.0,
            image_url: None,
            sheets_data: None,
            business_data: None,
        }
    }

    pub fn is_business_enhanced(&self) -> bool {
        self.data_source == DataSourceTag::Enhanced && self.business_data.is_some()
    }

    /// Text values of `field`; empty when the record has nothing there.
    pub fn field_values(&self, field: SearchField) -> Vec<&str> {
        match field {
            SearchField::Label => vec![self.label.as_str()],
            SearchField::Subtitle => self.subtitle.as_deref().into_iter().collect(),
            SearchField::Tags => self.tags.iter().map(String::as_str).collect(),
            SearchField::ParentLabel => self.parent_label.as_deref().into_iter().collect(),
            SearchField::BusinessName => self.business_value("name").into_iter().collect(),
            SearchField::BusinessTag => self.business_value("tag").into_iter().collect(),
        }
    }

    fn business_value(&self, key: &str) -> Option<&str> {
        self.business_data
            .as_ref()
            .and_then(|data| data.get(key))
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Immutable record set produced by one index build.
///
/// A new build produces a new value; readers holding the previous one keep a
/// consistent view until they drop it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchIndex {
    mode: DataSourceMode,
    records: Vec<SearchRecord>,
}

impl SearchIndex {
    pub fn new(mode: DataSourceMode, records: Vec<SearchRecord>) -> Self {
        Self { mode, records }
    }

    pub fn empty(mode: DataSourceMode) -> Self {
        Self::new(mode, Vec::new())
    }

    pub fn mode(&self) -> DataSourceMode {
        self.mode
    }

    pub fn records(&self) -> &[SearchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_type_roundtrips_through_names() {
        assert_eq!(ElementType::from("ProjectedImage".to_string()), ElementType::ProjectedImage);
        assert_eq!(
            ElementType::from("Model3D".to_string()),
            ElementType::Custom("Model3D".to_string())
        );
        assert_eq!(ElementType::Custom("Model3D".into()).to_string(), "Model3D");
    }

    #[test]
    fn record_serializes_type_key_and_camel_case() {
        let mut record = SearchRecord::new(ElementType::Hotspot, "Exit", DataSourceTag::Tour);
        record.parent_index = Some(2);
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["type"], "Hotspot");
        assert_eq!(json["parentIndex"], 2);
        assert_eq!(json["dataSource"], "tour");
        assert!(json.get("index").is_none());
    }

    #[test]
    fn business_fields_read_from_payload() {
        let mut record = SearchRecord::new(ElementType::Panorama, "Lobby", DataSourceTag::Enhanced);
        record.business_data = Some(serde_json::json!({"name": "Cafe Nero", "tag": "cafe"}));
        assert!(record.is_business_enhanced());
        assert_eq!(record.field_values(SearchField::BusinessName), vec!["Cafe Nero"]);
        assert_eq!(record.field_values(SearchField::BusinessTag), vec!["cafe"]);
        assert!(record.field_values(SearchField::Subtitle).is_empty());
    }
}

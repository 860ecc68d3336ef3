use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use tourfind_core::config::{FilterMode, SearchConfig};
use tourfind_core::snapshot::SnapshotTour;
use tourfind_core::sources::{BusinessEntry, ExternalData, SheetRow};
use tourfind_core::{DataSourceMode, DataSourceTag, ElementType};
use tourfind_index::{should_include_element, IndexBuilder};

fn lobby_tour() -> SnapshotTour {
    SnapshotTour::from_json(&json!({
        "mainPlayList": {"items": [
            {"media": {"id": "p0", "data": {"label": ""}}},
            {"media": {
                "id": "p1",
                "data": {"label": "Lobby", "tags": ["ground"]},
                "overlays": [
                    {"id": "hs-exit", "class": "HotspotPanoramaOverlay", "data": {"label": "goto-exit"}}
                ]
            }},
            {"media": {"id": "p2"}}
        ]}
    }))
    .expect("tour")
}

fn summary(index: &tourfind_core::SearchIndex) -> Vec<(String, String)> {
    index.records().iter().map(|r| (r.kind.to_string(), r.label.clone())).collect()
}

fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
    values.iter().map(|(k, l)| ((*k).to_string(), (*l).to_string())).collect()
}

#[test]
fn tour_mode_indexes_labeled_panorama_and_its_hotspot() {
    let config = SearchConfig::default();
    let tour = lobby_tour();
    let index = IndexBuilder::new(&config).build(Some(&tour), &ExternalData::default());

    assert_eq!(index.mode(), DataSourceMode::Tour);
    assert_eq!(summary(&index), pairs(&[("Panorama", "Lobby"), ("Hotspot", "goto-exit")]));

    let pano = &index.records()[0];
    assert_eq!(pano.index, Some(1));
    assert_eq!(pano.id, None);
    assert!((pano.boost - 1.5).abs() < f64::EPSILON);

    let hotspot = &index.records()[1];
    assert_eq!(hotspot.id.as_deref(), Some("hs-exit"));
    assert_eq!(hotspot.parent_index, Some(1));
    assert_eq!(hotspot.parent_label.as_deref(), Some("Lobby"));
    assert!((hotspot.boost - 0.8).abs() < f64::EPSILON);
}

#[test]
fn completely_blank_panoramas_are_opt_in() {
    let mut config = SearchConfig::default();
    config.include_content.completely_blank = true;
    let tour = lobby_tour();
    let index = IndexBuilder::new(&config).build(Some(&tour), &ExternalData::default());

    assert_eq!(
        summary(&index),
        pairs(&[
            ("Panorama", "[Unnamed Item]"),
            ("Panorama", "Lobby"),
            ("Hotspot", "goto-exit"),
            ("Panorama", "[Unnamed Item]"),
        ])
    );
    assert!((index.records()[0].boost - 1.0).abs() < f64::EPSILON);
    assert_eq!(index.records()[0].original_label, "");
}

#[test]
fn business_mode_ignores_tour_data() {
    let mut config = SearchConfig::default();
    config.business_data.use_business_data = true;
    config.business_data.replace_tour_data = true;
    let external = ExternalData {
        business: vec![BusinessEntry { name: Some("Cafe".into()), tag: Some("cafe".into()), ..BusinessEntry::default() }],
        sheets: Vec::new(),
    };
    let tour = lobby_tour();
    let index = IndexBuilder::new(&config).build(Some(&tour), &external);

    assert_eq!(index.mode(), DataSourceMode::Business);
    assert_eq!(summary(&index), pairs(&[("Business", "Cafe")]));
    let record = &index.records()[0];
    assert_eq!(record.data_source, DataSourceTag::Business);
    assert_eq!(record.tags, vec!["cafe".to_string()]);
    assert!((record.boost - 1.2).abs() < f64::EPSILON);
}

#[test]
fn business_mode_honors_type_blacklist() {
    let mut config = SearchConfig::default();
    config.business_data.use_business_data = true;
    config.business_data.replace_tour_data = true;
    config.filter.element_types.mode = FilterMode::Blacklist;
    config.filter.element_types.blacklisted_types = vec!["Business".into()];
    let external = ExternalData { business: vec![BusinessEntry::default()], sheets: Vec::new() };
    let index = IndexBuilder::new(&config).build(None, &external);
    assert!(index.is_empty());
}

#[test]
fn business_mode_honors_business_switch() {
    let mut config = SearchConfig::default();
    config.business_data.use_business_data = true;
    config.business_data.replace_tour_data = true;
    let external = ExternalData {
        business: vec![BusinessEntry { name: Some("Cafe".into()), ..BusinessEntry::default() }],
        sheets: Vec::new(),
    };
    assert_eq!(IndexBuilder::new(&config).build(None, &external).len(), 1);

    config.include_content.elements.include_business = false;
    assert!(IndexBuilder::new(&config).build(None, &external).is_empty());
}

#[test]
fn blacklist_wins_over_type_switch() {
    let mut config = SearchConfig::default();
    config.filter.element_types.mode = FilterMode::Blacklist;
    config.filter.element_types.blacklisted_types = vec!["Hotspot".into()];
    config.include_content.elements.include_hotspots = true;
    assert!(!should_include_element(&ElementType::Hotspot, "x", &[], &config));
}

fn row(value: Value) -> SheetRow {
    SheetRow(value.as_object().cloned().expect("row object"))
}

#[test]
fn sheets_mode_maps_rows_with_aliases() {
    let mut config = SearchConfig::default();
    config.google_sheets.use_google_sheet_data = true;
    config.google_sheets.use_as_data_source = true;
    let external = ExternalData {
        business: Vec::new(),
        sheets: vec![
            row(json!({"title": "Gift Shop", "summary": "Souvenirs", "categories": "retail, gifts", "type": "Spot", "parentIndex": 2})),
            row(json!({"details": "no name here"})),
        ],
    };
    let index = IndexBuilder::new(&config).build(None, &external);

    assert_eq!(index.mode(), DataSourceMode::GoogleSheets);
    assert_eq!(summary(&index), pairs(&[("Hotspot", "Gift Shop"), ("Element", "[Unnamed Item]")]));
    let shop = &index.records()[0];
    assert_eq!(shop.tags, vec!["retail".to_string(), "gifts".to_string()]);
    assert_eq!(shop.parent_index, Some(2));
    assert_eq!(shop.subtitle.as_deref(), Some("Souvenirs"));
    assert!((index.records()[1].boost - 0.8).abs() < f64::EPSILON);
}

#[test]
fn custom_thumbnails_mode_is_empty_and_valid() {
    let mut config = SearchConfig::default();
    config.custom_thumbnails.use_as_data_source = true;
    let tour = lobby_tour();
    let index = IndexBuilder::new(&config).build(Some(&tour), &ExternalData::default());
    assert_eq!(index.mode(), DataSourceMode::CustomThumbnails);
    assert!(index.is_empty());
}

#[test]
fn tour_mode_enhances_from_business_directory() {
    let mut config = SearchConfig::default();
    config.business_data.use_business_data = true;
    let external = ExternalData {
        business: vec![BusinessEntry {
            id: Some("hs-exit".into()),
            name: Some("North Exit".into()),
            image_url: Some("exit.png".into()),
            ..BusinessEntry::default()
        }],
        sheets: Vec::new(),
    };
    let tour = lobby_tour();
    let index = IndexBuilder::new(&config).build(Some(&tour), &external);

    assert_eq!(summary(&index), pairs(&[("Panorama", "Lobby"), ("Hotspot", "North Exit")]));
    let hotspot = &index.records()[1];
    assert_eq!(hotspot.original_label, "goto-exit");
    assert_eq!(hotspot.data_source, DataSourceTag::Enhanced);
    assert_eq!(hotspot.image_url.as_deref(), Some("exit.png"));
    assert!(hotspot.is_business_enhanced());
    assert!((hotspot.boost - 1.3).abs() < 1e-9);
}

#[test]
fn thumbnails_fall_back_to_default_image() {
    let mut config = SearchConfig::default();
    config.thumbnails.enabled = true;
    config.thumbnails.default_image_path = Some("default.jpg".into());
    let tour = SnapshotTour::from_json(&json!({"items": [
        {"media": {"label": "Roof", "thumbnailUrl": "roof.jpg"}},
        {"media": {"label": "Cellar"}},
    ]}))
    .expect("tour");
    let index = IndexBuilder::new(&config).build(Some(&tour), &ExternalData::default());
    let images: Vec<_> = index.records().iter().map(|r| r.image_url.clone()).collect();
    assert_eq!(images, vec![Some("roof.jpg".to_string()), Some("default.jpg".to_string())]);
}

#[test]
fn overlays_of_excluded_panoramas_are_still_indexed() {
    let mut config = SearchConfig::default();
    config.filter.media_indexes.mode = FilterMode::Blacklist;
    config.filter.media_indexes.blacklisted = vec![1];
    let tour = lobby_tour();
    let index = IndexBuilder::new(&config).build(Some(&tour), &ExternalData::default());
    assert_eq!(summary(&index), pairs(&[("Hotspot", "goto-exit")]));
}

#[test]
fn build_is_deterministic() {
    let config = SearchConfig::default();
    let tour = lobby_tour();
    let builder = IndexBuilder::new(&config);
    let first = builder.build(Some(&tour), &ExternalData::default());
    let second = builder.build(Some(&tour), &ExternalData::default());
    assert_eq!(first, second);
}

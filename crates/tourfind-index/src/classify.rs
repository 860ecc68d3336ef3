//! Element type classification for overlays.
//!
//! Tiers run in a fixed order and the first one that produces a type wins.
//! Tiers are never merged: an overlay carrying a known class name is
//! classified by it even when its label would suggest something else.

use tracing::debug;

use tourfind_core::host::{data_container, text_property, try_call, try_field};
use tourfind_core::{ElementType, HostObject, HostValue};

type Tier = fn(&dyn HostObject, &str) -> Option<ElementType>;

const TIERS: [(&str, Tier); 4] = [
    ("class-field", class_field),
    ("class-accessor", class_accessor),
    ("properties", by_properties),
    ("label", by_label),
];

const URL_KEYS: [&str; 2] = ["url", "webUrl"];
const VIDEO_KEYS: [&str; 2] = ["video", "videoUrl"];
const POLYGON_KEYS: [&str; 2] = ["vertices", "polygon"];

const LABEL_PATTERNS: [(&str, ElementType); 7] = [
    ("web", ElementType::Webframe),
    ("video", ElementType::Video),
    ("image", ElementType::Image),
    ("text", ElementType::Text),
    ("polygon", ElementType::Polygon),
    ("goto", ElementType::Hotspot),
    ("info", ElementType::Hotspot),
];

/// Semantic type of `overlay`. `fallback_label` is used for the label based
/// heuristics when the overlay carries no label of its own.
pub fn classify(overlay: &dyn HostObject, fallback_label: &str) -> ElementType {
    let label = overlay_label(overlay).unwrap_or_else(|| fallback_label.trim().to_string());
    for (tier, heuristic) in TIERS {
        if let Some(kind) = heuristic(overlay, &label) {
            debug!(tier, %kind, label = %label, "classified overlay");
            return kind;
        }
    }
    ElementType::Element
}

fn overlay_label(overlay: &dyn HostObject) -> Option<String> {
    text_property(overlay, "label").or_else(|| data_container(overlay).and_then(|data| text_property(data.as_ref(), "label")))
}

fn class_field(overlay: &dyn HostObject, label: &str) -> Option<ElementType> {
    let class = try_field(overlay, "class")?;
    from_class(overlay, class.as_str()?, label)
}

fn class_accessor(overlay: &dyn HostObject, label: &str) -> Option<ElementType> {
    let class = try_call(overlay, "get", &[HostValue::from("class")])?;
    from_class(overlay, class.as_str()?, label)
}

fn from_class(overlay: &dyn HostObject, class: &str, label: &str) -> Option<ElementType> {
    let kind = match class {
        "FramePanoramaOverlay" => ElementType::Webframe,
        "QuadVideoPanoramaOverlay" | "VideoPanoramaOverlay" => ElementType::Video,
        "ImagePanoramaOverlay" => ElementType::Image,
        "TextPanoramaOverlay" => ElementType::Text,
        "ProjectedImagePanoramaOverlay" => ElementType::ProjectedImage,
        "HotspotPanoramaOverlay" => refine_hotspot(overlay, label),
        _ => return None,
    };
    Some(kind)
}

/// Hotspot overlays double as text boxes, polygons and image pins; their
/// metadata flags and label tell them apart.
fn refine_hotspot(overlay: &dyn HostObject, label: &str) -> ElementType {
    let data = data_container(overlay);
    let flag = |name: &str| {
        data.as_deref()
            .and_then(|d| try_field(d, name))
            .or_else(|| try_field(overlay, name))
            .is_some_and(|v| v.is_truthy())
    };
    if flag("hasPanoramaAction") {
        return ElementType::Hotspot;
    }
    if flag("hasText") {
        return ElementType::Text;
    }
    if flag("isPolygon") {
        return ElementType::Polygon;
    }

    let lower = label.to_lowercase();
    if lower.contains("polygon") {
        ElementType::Polygon
    } else if lower == "image" {
        ElementType::Image
    } else {
        // "info-" pins and everything else stay hotspots.
        ElementType::Hotspot
    }
}

fn by_properties(overlay: &dyn HostObject, _label: &str) -> Option<ElementType> {
    let data = data_container(overlay);
    let has = |keys: &[&str]| {
        keys.iter().any(|key| {
            try_field(overlay, key).is_some() || data.as_deref().is_some_and(|d| try_field(d, key).is_some())
        })
    };
    if has(&URL_KEYS) {
        Some(ElementType::Webframe)
    } else if has(&VIDEO_KEYS) {
        Some(ElementType::Video)
    } else if has(&POLYGON_KEYS) {
        Some(ElementType::Polygon)
    } else {
        None
    }
}

fn by_label(_overlay: &dyn HostObject, label: &str) -> Option<ElementType> {
    let lower = label.to_lowercase();
    LABEL_PATTERNS
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, kind)| kind.clone())
}

//! Overlay discovery for one panorama.
//!
//! Viewer builds expose a panorama's overlays in different places. The
//! strategies below are tried in order until one yields a non-empty list;
//! each swallows its own failures and simply reports nothing.

use tracing::debug;

use tourfind_core::host::{identity, property, try_call, try_field};
use tourfind_core::traits::OVERLAY_CLASS;
use tourfind_core::{HostObject, HostRef, TourHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestStrategy {
    /// `media.getOverlays()`
    MediaAccessor,
    /// `media.overlays`
    MediaField,
    /// `item.overlays` on the playlist item holding the media
    ItemField,
    /// `media.overlaysByTags`, flattened across groups
    TaggedGroups,
    /// every overlay-class object whose `media` is this media
    GlobalQuery,
}

/// Overlays found for one media node, with the strategy that found them.
pub struct Harvest {
    pub strategy: Option<HarvestStrategy>,
    pub overlays: Vec<HostRef>,
}

struct Scope<'a> {
    media: &'a dyn HostObject,
    tour: &'a dyn TourHandle,
    item: Option<&'a dyn HostObject>,
}

type Strategy = fn(&Scope<'_>) -> Vec<HostRef>;

const STRATEGIES: [(HarvestStrategy, Strategy); 5] = [
    (HarvestStrategy::MediaAccessor, media_accessor),
    (HarvestStrategy::MediaField, media_field),
    (HarvestStrategy::ItemField, item_field),
    (HarvestStrategy::TaggedGroups, tagged_groups),
    (HarvestStrategy::GlobalQuery, global_query),
];

pub fn harvest(media: &dyn HostObject, tour: &dyn TourHandle, item: Option<&dyn HostObject>) -> Harvest {
    let scope = Scope { media, tour, item };
    for (strategy, run) in STRATEGIES {
        let overlays = run(&scope);
        if !overlays.is_empty() {
            debug!(?strategy, count = overlays.len(), "harvested overlays");
            return Harvest { strategy: Some(strategy), overlays };
        }
    }
    Harvest { strategy: None, overlays: Vec::new() }
}

fn media_accessor(scope: &Scope<'_>) -> Vec<HostRef> {
    try_call(scope.media, "getOverlays", &[]).map(|v| v.objects()).unwrap_or_default()
}

fn media_field(scope: &Scope<'_>) -> Vec<HostRef> {
    try_field(scope.media, "overlays").map(|v| v.objects()).unwrap_or_default()
}

fn item_field(scope: &Scope<'_>) -> Vec<HostRef> {
    scope
        .item
        .and_then(|item| try_field(item, "overlays"))
        .map(|v| v.objects())
        .unwrap_or_default()
}

fn tagged_groups(scope: &Scope<'_>) -> Vec<HostRef> {
    let Some(groups) = try_field(scope.media, "overlaysByTags").and_then(|v| v.as_object().cloned()) else {
        return Vec::new();
    };
    groups
        .keys()
        .iter()
        .filter_map(|key| try_field(groups.as_ref(), key))
        .flat_map(|group| group.objects())
        .collect()
}

fn global_query(scope: &Scope<'_>) -> Vec<HostRef> {
    let Some(media_id) = identity(scope.media) else {
        return Vec::new();
    };
    scope
        .tour
        .objects_by_class(OVERLAY_CLASS)
        .into_iter()
        .filter(|overlay| parent_media_id(overlay.as_ref()).as_deref() == Some(media_id.as_str()))
        .collect()
}

/// Identity of the media an overlay is attached to; the `media` property may
/// hold the media object or just its id.
fn parent_media_id(overlay: &dyn HostObject) -> Option<String> {
    let media = property(overlay, "media")?;
    match media.as_object() {
        Some(obj) => identity(obj.as_ref()),
        None => media.to_text().filter(|s| !s.is_empty()),
    }
}

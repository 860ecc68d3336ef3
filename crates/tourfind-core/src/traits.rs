//! Collaborator contracts: the live tour and the fuzzy-match engine.

use crate::host::{property, try_call, HostRef, HostValue};
use crate::types::{SearchField, SearchRecord};

/// Class name queried when overlays have to be found globally.
pub const OVERLAY_CLASS: &str = "PanoramaOverlay";

/// Handle on a loaded tour.
///
/// Only `root` and `select_panorama` are required; the remaining accessors
/// walk the scene graph from the root with the usual property fallbacks and
/// can be overridden by hosts with a more direct route.
pub trait TourHandle: Send + Sync {
    fn root(&self) -> HostRef;

    /// Make the panorama at `index` the current one. Returns `false` when
    /// the tour rejects the index.
    fn select_panorama(&self, index: usize) -> bool;

    fn player(&self) -> Option<HostRef> {
        property(self.root().as_ref(), "player").and_then(|v| v.as_object().cloned())
    }

    /// Ordered playlist items, one per panorama.
    fn playlist_items(&self) -> Vec<HostRef> {
        let root = self.root();
        if let Some(playlist) = property(root.as_ref(), "mainPlayList").and_then(|v| v.as_object().cloned()) {
            if let Some(items) = property(playlist.as_ref(), "items") {
                return items.objects();
            }
        }
        property(root.as_ref(), "items").map(|v| v.objects()).unwrap_or_default()
    }

    /// Every live object of the given class, as reported by the player.
    fn objects_by_class(&self, class: &str) -> Vec<HostRef> {
        let args = [HostValue::from(class)];
        self.player()
            .and_then(|player| try_call(player.as_ref(), "getByClassName", &args))
            .or_else(|| try_call(self.root().as_ref(), "getByClassName", &args))
            .map(|v| v.objects())
            .unwrap_or_default()
    }
}

/// A field taking part in ranking, with its relative weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedField {
    pub field: SearchField,
    pub weight: f64,
}

/// Query handed to the fuzzy engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FuzzyQuery {
    /// Extended pattern syntax: whitespace separated atoms, `'` for literal
    /// substrings, `^`/`$` anchors, `!` negation.
    Pattern(String),
    /// Whole-field, case-insensitive equality on one field.
    Exact { field: SearchField, value: String },
}

/// One ranked hit. `score` is a distance: 0 is a perfect match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch {
    /// Position of the record in the slice that was searched.
    pub position: usize,
    pub score: f64,
}

/// Black-box ranked approximate search over a record list.
///
/// Implementations return matches best first, with record `boost` folded
/// into the ordering.
pub trait FuzzyEngine: Send + Sync {
    fn search(
        &self,
        records: &[SearchRecord],
        fields: &[WeightedField],
        query: &FuzzyQuery,
    ) -> anyhow::Result<Vec<FuzzyMatch>>;
}

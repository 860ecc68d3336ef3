//! tourfind-index
//!
//! Turns a tour scene graph (or an external feed standing in for it) into a
//! flat [`SearchIndex`]. Each stage lives in its own module so that the
//! heuristics can be exercised in isolation.

pub mod build;
pub mod classify;
pub mod enhance;
pub mod harvest;
pub mod policy;
pub mod resolve;

pub use build::IndexBuilder;
pub use classify::classify;
pub use harvest::{harvest, Harvest, HarvestStrategy};
pub use policy::{should_include_element, should_include_panorama, PanoramaFacts, Rejection};
pub use resolve::{resolve, resolve_detailed, Resolution};

pub use tourfind_core::SearchIndex;

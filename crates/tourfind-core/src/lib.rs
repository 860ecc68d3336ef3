//! tourfind-core
//!
//! Shared vocabulary for the tour search workspace: the search record model,
//! the capability-checked adapter over the viewer's scene graph, collaborator
//! traits, layered configuration and the external feed loaders.

pub mod config;
pub mod error;
pub mod host;
pub mod snapshot;
pub mod sources;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use host::{CallOutcome, HostObject, HostRef, HostValue};
pub use traits::{FuzzyEngine, TourHandle};
pub use types::{DataSourceMode, DataSourceTag, ElementType, SearchField, SearchIndex, SearchRecord};

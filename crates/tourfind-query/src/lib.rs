//! tourfind-query
//!
//! Query execution over a built [`tourfind_core::SearchIndex`]: the
//! nucleo-backed fuzzy engine, the query front end with its special syntaxes,
//! and the grouped result model handed to the UI layer.

pub mod engine;
pub mod fuzzy;
pub mod results;

pub use engine::{parse_term, QueryEngine};
pub use fuzzy::NucleoEngine;
pub use results::{GroupedResults, QueryOutcome, ResultAction, ResultGroup, SearchResult};

//! Query front end: special syntaxes, engine call, grouping and ordering.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, warn};

use tourfind_core::config::{FilterMode, SearchBehavior, SearchConfig};
use tourfind_core::traits::FuzzyQuery;
use tourfind_core::{FuzzyEngine, SearchField, SearchIndex};

use crate::fuzzy::NucleoEngine;
use crate::results::{GroupedResults, QueryOutcome, ResultGroup, SearchResult};

pub const WILDCARD: &str = "*";
const EXACT_PREFIX: char = '=';
const LITERAL_MARKER: char = '\'';

pub struct QueryEngine {
    engine: Arc<dyn FuzzyEngine>,
}

impl QueryEngine {
    pub fn new(engine: Arc<dyn FuzzyEngine>) -> Self {
        Self { engine }
    }

    /// Engine backed by nucleo with the configured tuning.
    pub fn nucleo(config: &SearchConfig) -> Self {
        Self::new(Arc::new(NucleoEngine::new(config.search_settings.behavior.clone())))
    }

    pub fn query(&self, raw: &str, index: &SearchIndex, config: &SearchConfig) -> QueryOutcome {
        let term = raw.trim();
        if term.is_empty() {
            return QueryOutcome::Idle;
        }
        if term == WILDCARD {
            return QueryOutcome::Results(wildcard(index, config));
        }
        if term.chars().count() < config.min_search_chars {
            return QueryOutcome::NeedsMoreCharacters { min: config.min_search_chars };
        }
        let Some(query) = parse_term(term, &config.search_settings.behavior) else {
            return QueryOutcome::NeedsMoreCharacters { min: config.min_search_chars };
        };

        let fields = config.weighted_fields();
        match self.engine.search(index.records(), &fields, &query) {
            Ok(matches) => {
                debug!(term, hits = matches.len(), "query executed");
                let results = matches
                    .into_iter()
                    .filter_map(|m| index.records().get(m.position).map(|r| SearchResult::new(r.clone(), m.score)))
                    .collect();
                QueryOutcome::Results(arrange(results, config, true))
            }
            Err(err) => {
                warn!(term, error = %err, "search failed");
                QueryOutcome::Error(format!("search error: {err}"))
            }
        }
    }
}

/// Engine query for a non-empty, non-wildcard term. `=value` asks for an
/// exact label; id-like terms (digits, `-`, `_`) are marked literal so the
/// matcher does not scatter them.
pub fn parse_term(term: &str, behavior: &SearchBehavior) -> Option<FuzzyQuery> {
    if let Some(value) = term.strip_prefix(EXACT_PREFIX) {
        let value = value.trim();
        return (!value.is_empty())
            .then(|| FuzzyQuery::Exact { field: SearchField::Label, value: value.to_string() });
    }
    let id_like = term.chars().any(|c| c.is_ascii_digit() || c == '-' || c == '_');
    if behavior.use_extended_search && id_like && !term.starts_with(LITERAL_MARKER) {
        return Some(FuzzyQuery::Pattern(format!("{LITERAL_MARKER}{term}")));
    }
    Some(FuzzyQuery::Pattern(term.to_string()))
}

/// Every record, zero score, index order, no result filter.
fn wildcard(index: &SearchIndex, config: &SearchConfig) -> GroupedResults {
    let results = index.records().iter().map(|r| SearchResult::new(r.clone(), 0.0)).collect();
    arrange(results, config, false)
}

fn arrange(results: Vec<SearchResult>, config: &SearchConfig, ranked_query: bool) -> GroupedResults {
    let ranked: Vec<SearchResult> = if ranked_query {
        results.into_iter().filter(|r| passes_result_filter(r.group_key(), config)).collect()
    } else {
        results
    };

    let mut groups: Vec<ResultGroup> = Vec::new();
    for result in &ranked {
        let key = result.group_key();
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.results.push(result.clone()),
            None => groups.push(ResultGroup {
                key: key.to_string(),
                display_label: config.display_label(key).to_string(),
                results: vec![result.clone()],
            }),
        }
    }
    if ranked_query {
        for group in &mut groups {
            group.results.sort_by(by_label);
        }
    }
    order_groups(&mut groups, &config.group_order);
    GroupedResults { ranked, groups }
}

fn by_label(a: &SearchResult, b: &SearchResult) -> Ordering {
    let parent = |r: &SearchResult| r.record.parent_label.as_deref().unwrap_or_default().to_lowercase();
    a.record
        .label
        .to_lowercase()
        .cmp(&b.record.label.to_lowercase())
        .then_with(|| parent(a).cmp(&parent(b)))
}

/// Listed groups first in list order, the rest in discovery order.
fn order_groups(groups: &mut [ResultGroup], order: &[String]) {
    let rank = |key: &str| order.iter().position(|k| k == key).unwrap_or(order.len());
    // Stable sort keeps discovery order among unlisted groups.
    groups.sort_by_key(|g| rank(&g.key));
}

/// Result type allow/deny list applied to rendered groups.
fn passes_result_filter(key: &str, config: &SearchConfig) -> bool {
    let filter = &config.result_filter;
    match filter.mode {
        FilterMode::None => true,
        FilterMode::Whitelist => filter.allowed_types.is_empty() || filter.allowed_types.iter().any(|t| t == key),
        FilterMode::Blacklist => !filter.blacklisted_types.iter().any(|t| t == key),
    }
}

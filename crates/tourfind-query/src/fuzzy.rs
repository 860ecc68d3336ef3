//! nucleo-backed fuzzy engine.
//!
//! Each weighted field is scored on its own and turned into a distance in
//! `[0, 1]` relative to what the pattern would score against itself. Field
//! distances combine multiplicatively, each raised to its weight, so a close
//! match on a heavy field beats the same match on a light one. The record
//! boost divides the combined distance.
//!
//! Plain terms that fail the subsequence match get a second chance through
//! normalized Damerau-Levenshtein against each word of the field, so a
//! swapped or dropped letter still finds its record within the threshold.

use anyhow::ensure;
use nucleo_matcher::pattern::{Atom, AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};
use tracing::trace;

use tourfind_core::config::SearchBehavior;
use tourfind_core::traits::{FuzzyMatch, FuzzyQuery, WeightedField};
use tourfind_core::{FuzzyEngine, SearchField, SearchRecord};

/// Floor applied to a field distance before weighting; a perfect match
/// would otherwise zero out every other field.
const MIN_DISTANCE: f64 = 0.001;
const MIN_BOOST: f64 = 0.01;

pub struct NucleoEngine {
    behavior: SearchBehavior,
}

enum Compiled {
    /// `typos` holds the lowercased plain tokens used for edit-distance
    /// fallback; empty when the term uses extended operators.
    Pattern { pattern: Pattern, perfect: u32, typos: Vec<String> },
    Exact { field: SearchField, atom: Atom },
}

struct Scorer<'a> {
    matcher: Matcher,
    buf: Vec<char>,
    indices: Vec<u32>,
    behavior: &'a SearchBehavior,
}

impl NucleoEngine {
    pub fn new(behavior: SearchBehavior) -> Self {
        Self { behavior }
    }

    fn compile(&self, query: &FuzzyQuery, matcher: &mut Matcher) -> Option<Compiled> {
        match query {
            FuzzyQuery::Pattern(term) => {
                let significant = term.chars().filter(|c| !c.is_whitespace() && *c != '\'').count();
                if significant == 0 || significant < self.behavior.min_match_char_length {
                    return None;
                }
                let pattern = if self.behavior.use_extended_search {
                    Pattern::parse(term, CaseMatching::Ignore, Normalization::Smart)
                } else {
                    Pattern::new(term, CaseMatching::Ignore, Normalization::Smart, AtomKind::Fuzzy)
                };
                if pattern.atoms.is_empty() {
                    return None;
                }
                let perfect = perfect_score(&pattern, matcher);
                let typos = typo_needles(term, self.behavior.use_extended_search);
                Some(Compiled::Pattern { pattern, perfect, typos })
            }
            FuzzyQuery::Exact { field, value } => {
                let value = value.trim();
                if value.is_empty() {
                    return None;
                }
                let atom = Atom::new(value, CaseMatching::Ignore, Normalization::Smart, AtomKind::Exact, false);
                Some(Compiled::Exact { field: *field, atom })
            }
        }
    }
}

/// What the pattern scores against its own needles.
fn perfect_score(pattern: &Pattern, matcher: &mut Matcher) -> u32 {
    pattern
        .atoms
        .iter()
        .filter(|atom| !atom.negative)
        .filter_map(|atom| atom.score(atom.needle_text(), matcher))
        .map(u32::from)
        .sum()
}

impl Scorer<'_> {
    /// Distance of one field value, `None` when it does not match or falls
    /// outside the threshold.
    fn distance(&mut self, compiled: &Compiled, value: &str) -> Option<f64> {
        let haystack = Utf32Str::new(value, &mut self.buf);
        match compiled {
            Compiled::Exact { atom, .. } => atom.score(haystack, &mut self.matcher).map(|_| 0.0),
            Compiled::Pattern { pattern, perfect, typos } => {
                let matched = if self.behavior.ignore_location {
                    pattern.score(haystack, &mut self.matcher).map(|score| relative_distance(score, *perfect))
                } else {
                    self.indices.clear();
                    let score = pattern.indices(haystack, &mut self.matcher, &mut self.indices);
                    let first = self.indices.iter().min().copied().unwrap_or(0);
                    let offset = f64::from(first) / f64::from(self.behavior.distance.max(1));
                    score.map(|score| relative_distance(score, *perfect) + offset)
                };
                let threshold = self.behavior.threshold;
                matched
                    .map(|distance| distance.clamp(0.0, 1.0))
                    .filter(|distance| *distance <= threshold)
                    .or_else(|| typo_distance(typos, value).filter(|distance| *distance <= threshold))
            }
        }
    }

    /// Best distance over a field's values.
    fn field_distance(&mut self, compiled: &Compiled, values: &[&str]) -> Option<f64> {
        values
            .iter()
            .filter_map(|value| self.distance(compiled, value))
            .min_by(f64::total_cmp)
    }
}

/// Whitespace-separated tokens of a plain term. Extended operators
/// (`'`, `^`, `!`, trailing `$`) ask for literal matching, so such terms get
/// no typo tolerance.
fn typo_needles(term: &str, extended: bool) -> Vec<String> {
    let operator = |token: &str| token.starts_with(&['\'', '^', '!'][..]) || token.ends_with('$');
    let tokens: Vec<&str> = term.split_whitespace().collect();
    if extended && tokens.iter().any(|token| operator(token)) {
        return Vec::new();
    }
    tokens.iter().map(|token| token.to_lowercase()).collect()
}

/// Worst needle distance, each needle taking its closest word of `value`.
fn typo_distance(needles: &[String], value: &str) -> Option<f64> {
    if needles.is_empty() {
        return None;
    }
    let words: Vec<String> = value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect();
    let mut worst = 0.0_f64;
    for needle in needles {
        let closest = words
            .iter()
            .map(|word| 1.0 - strsim::normalized_damerau_levenshtein(needle, word))
            .min_by(f64::total_cmp)?;
        worst = worst.max(closest);
    }
    Some(worst)
}

fn relative_distance(score: u32, perfect: u32) -> f64 {
    if perfect == 0 {
        return 0.0;
    }
    1.0 - f64::from(score) / f64::from(perfect)
}

impl FuzzyEngine for NucleoEngine {
    fn search(
        &self,
        records: &[SearchRecord],
        fields: &[WeightedField],
        query: &FuzzyQuery,
    ) -> anyhow::Result<Vec<FuzzyMatch>> {
        ensure!(
            self.behavior.threshold.is_finite(),
            "fuzzy threshold is not a finite number: {}",
            self.behavior.threshold
        );
        let mut matcher = Matcher::new(Config::DEFAULT);
        let Some(compiled) = self.compile(query, &mut matcher) else {
            return Ok(Vec::new());
        };
        let exact_fields;
        let fields = match &compiled {
            Compiled::Exact { field, .. } => {
                exact_fields = [WeightedField { field: *field, weight: 1.0 }];
                &exact_fields[..]
            }
            Compiled::Pattern { .. } => fields,
        };

        let mut scorer = Scorer { matcher, buf: Vec::new(), indices: Vec::new(), behavior: &self.behavior };
        let mut hits = Vec::new();
        for (position, record) in records.iter().enumerate() {
            let mut combined = 1.0_f64;
            let mut matched = false;
            for weighted in fields.iter().filter(|f| f.weight > 0.0) {
                let values = record.field_values(weighted.field);
                if let Some(distance) = scorer.field_distance(&compiled, &values) {
                    matched = true;
                    combined *= distance.max(MIN_DISTANCE).powf(weighted.weight);
                }
            }
            if matched {
                let score = combined / record.boost.max(MIN_BOOST);
                trace!(position, score, label = %record.label, "fuzzy hit");
                hits.push(FuzzyMatch { position, score });
            }
        }

        hits.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| records[b.position].boost.total_cmp(&records[a.position].boost))
                .then_with(|| a.position.cmp(&b.position))
        });
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourfind_core::{DataSourceTag, ElementType};

    fn record(label: &str, boost: f64) -> SearchRecord {
        let mut record = SearchRecord::new(ElementType::Panorama, label, DataSourceTag::Tour);
        record.boost = boost;
        record
    }

    fn label_only() -> Vec<WeightedField> {
        vec![WeightedField { field: SearchField::Label, weight: 1.0 }]
    }

    fn positions(hits: &[FuzzyMatch]) -> Vec<usize> {
        hits.iter().map(|h| h.position).collect()
    }

    #[test]
    fn boost_breaks_equal_text_similarity() {
        let engine = NucleoEngine::new(SearchBehavior::default());
        let mut enhanced = record("Lobby", 1.5);
        enhanced.data_source = DataSourceTag::Enhanced;
        enhanced.boost += 0.5;
        let records = vec![record("Lobby", 1.5), enhanced];

        let hits = engine
            .search(&records, &label_only(), &FuzzyQuery::Pattern("lobby".into()))
            .expect("search");
        assert_eq!(positions(&hits), vec![1, 0]);
        assert!(hits[0].score <= hits[1].score);
    }

    #[test]
    fn heavier_field_outranks_lighter_field() {
        let engine = NucleoEngine::new(SearchBehavior::default());
        let mut child = record("goto-exit", 1.0);
        child.parent_label = Some("Lobby".into());
        let records = vec![child, record("Lobby", 1.0)];
        let fields = vec![
            WeightedField { field: SearchField::Label, weight: 1.0 },
            WeightedField { field: SearchField::ParentLabel, weight: 0.3 },
        ];

        let hits = engine.search(&records, &fields, &FuzzyQuery::Pattern("lob".into())).expect("search");
        assert_eq!(positions(&hits), vec![1, 0]);
    }

    #[test]
    fn zero_threshold_rejects_gapped_matches() {
        let behavior = SearchBehavior { threshold: 0.0, ..SearchBehavior::default() };
        let engine = NucleoEngine::new(behavior);
        let records = vec![record("Lobby", 1.0)];
        let hits = engine.search(&records, &label_only(), &FuzzyQuery::Pattern("lby".into())).expect("search");
        assert!(hits.is_empty());
    }

    #[test]
    fn transposed_letters_fall_back_to_edit_distance() {
        let engine = NucleoEngine::new(SearchBehavior::default());
        let records = vec![record("Kitchen", 1.0), record("Main Lobby", 1.0)];
        let hits = engine.search(&records, &label_only(), &FuzzyQuery::Pattern("lobyb".into())).expect("search");
        assert_eq!(positions(&hits), vec![1]);
        assert!((hits[0].score - 0.2).abs() < 1e-9);

        let strict = NucleoEngine::new(SearchBehavior { threshold: 0.1, ..SearchBehavior::default() });
        assert!(strict.search(&records, &label_only(), &FuzzyQuery::Pattern("lobyb".into())).expect("search").is_empty());
    }

    #[test]
    fn literal_terms_get_no_typo_tolerance() {
        let engine = NucleoEngine::new(SearchBehavior::default());
        let records = vec![record("Lobby", 1.0)];
        let hits = engine.search(&records, &label_only(), &FuzzyQuery::Pattern("'lobyb".into())).expect("search");
        assert!(hits.is_empty());
        assert_eq!(typo_needles("Main lobyb", true), vec!["main".to_string(), "lobyb".to_string()]);
        assert!(typo_needles("^main lobby", true).is_empty());
    }

    #[test]
    fn exact_query_requires_whole_field_equality() {
        let engine = NucleoEngine::new(SearchBehavior::default());
        let records = vec![record("Lobby East", 1.0), record("lobby", 1.0)];
        let query = FuzzyQuery::Exact { field: SearchField::Label, value: "Lobby".into() };
        let hits = engine.search(&records, &[], &query).expect("search");
        assert_eq!(positions(&hits), vec![1]);
    }

    #[test]
    fn unrelated_terms_and_short_patterns_find_nothing() {
        let behavior = SearchBehavior { min_match_char_length: 3, ..SearchBehavior::default() };
        let engine = NucleoEngine::new(behavior);
        let records = vec![record("Lobby", 1.0)];
        assert!(engine.search(&records, &label_only(), &FuzzyQuery::Pattern("zzz".into())).expect("search").is_empty());
        assert!(engine.search(&records, &label_only(), &FuzzyQuery::Pattern("lo".into())).expect("search").is_empty());
    }

    #[test]
    fn late_matches_cost_distance_when_location_matters() {
        let behavior = SearchBehavior { ignore_location: false, distance: 10, threshold: 1.0, ..SearchBehavior::default() };
        let engine = NucleoEngine::new(behavior);
        let records = vec![record("The grand lobby", 1.0), record("Lobby", 1.0)];
        let hits = engine.search(&records, &label_only(), &FuzzyQuery::Pattern("lobby".into())).expect("search");
        assert_eq!(positions(&hits), vec![1, 0]);
    }
}

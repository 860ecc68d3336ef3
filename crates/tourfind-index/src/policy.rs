//! Inclusion policy: which classified items become searchable.
//!
//! Checks short-circuit on the first rejection. The verdict functions report
//! which rule rejected an item so the builder can trace it; the `should_*`
//! wrappers are the boolean form used by callers that only need the answer.

use std::fmt;

use tourfind_core::config::{FilterMode, SearchConfig};
use tourfind_core::ElementType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyLabel,
    LabelTooShort,
    TypeFilter,
    LabelFilter,
    TagFilter,
    TypeDisabled,
    MediaIndex,
    CompletelyBlank,
    Unlabeled,
    ValueFilter,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::EmptyLabel => "empty label",
            Self::LabelTooShort => "label below minimum length",
            Self::TypeFilter => "type filtered",
            Self::LabelFilter => "label filtered",
            Self::TagFilter => "tags filtered",
            Self::TypeDisabled => "type disabled",
            Self::MediaIndex => "media index filtered",
            Self::CompletelyBlank => "completely blank",
            Self::Unlabeled => "unlabeled",
            Self::ValueFilter => "value filtered",
        };
        f.write_str(reason)
    }
}

/// What the panorama rules look at.
#[derive(Debug, Clone, Copy)]
pub struct PanoramaFacts<'a> {
    pub index: usize,
    pub label: &'a str,
    pub subtitle: Option<&'a str>,
    pub tags: &'a [String],
}

pub fn should_include_element(kind: &ElementType, label: &str, tags: &[String], config: &SearchConfig) -> bool {
    element_verdict(kind, label, tags, config).is_ok()
}

pub fn should_include_panorama(facts: &PanoramaFacts<'_>, config: &SearchConfig) -> bool {
    panorama_verdict(facts, config).is_ok()
}

pub fn element_verdict(
    kind: &ElementType,
    label: &str,
    tags: &[String],
    config: &SearchConfig,
) -> Result<(), Rejection> {
    let toggles = &config.include_content.elements;
    let label = label.trim();
    if label.is_empty() && toggles.skip_empty_labels {
        return Err(Rejection::EmptyLabel);
    }
    if !label.is_empty() && label.chars().count() < toggles.min_label_length {
        return Err(Rejection::LabelTooShort);
    }
    if !passes_type_filter(kind, config) {
        return Err(Rejection::TypeFilter);
    }

    let labels = &config.filter.element_labels;
    if !passes_list(labels.mode, &labels.allowed_values, &labels.blacklisted_values, |value| label.contains(value)) {
        return Err(Rejection::LabelFilter);
    }
    if !passes_tag_filter(tags, config) {
        return Err(Rejection::TagFilter);
    }
    if toggles.switch_for(kind) == Some(false) {
        return Err(Rejection::TypeDisabled);
    }
    Ok(())
}

pub fn panorama_verdict(facts: &PanoramaFacts<'_>, config: &SearchConfig) -> Result<(), Rejection> {
    let media = &config.filter.media_indexes;
    match media.mode {
        FilterMode::Whitelist if !media.allowed.is_empty() && !media.allowed.contains(&facts.index) => {
            return Err(Rejection::MediaIndex);
        }
        FilterMode::Blacklist if media.blacklisted.contains(&facts.index) => return Err(Rejection::MediaIndex),
        _ => {}
    }

    let label = facts.label.trim();
    let subtitle = facts.subtitle.map(str::trim).filter(|s| !s.is_empty());
    if label.is_empty() {
        let content = &config.include_content;
        let has_subtitle = subtitle.is_some();
        let has_tags = !facts.tags.is_empty();
        if !has_subtitle && !has_tags {
            if !content.completely_blank {
                return Err(Rejection::CompletelyBlank);
            }
        } else if !((has_subtitle && content.unlabeled_with_subtitles) || (has_tags && content.unlabeled_with_tags)) {
            return Err(Rejection::Unlabeled);
        }
    }

    let filter = &config.filter;
    let matches_value = |value: &str| label.contains(value) || subtitle.is_some_and(|s| s.contains(value));
    if !passes_list(filter.mode, &filter.allowed_values, &filter.blacklisted_values, matches_value) {
        return Err(Rejection::ValueFilter);
    }
    if !passes_type_filter(&ElementType::Panorama, config) {
        return Err(Rejection::TypeFilter);
    }
    if !passes_tag_filter(facts.tags, config) {
        return Err(Rejection::TagFilter);
    }
    if !config.include_content.elements.include_panoramas {
        return Err(Rejection::TypeDisabled);
    }
    Ok(())
}

/// Pre-index type allow/deny list.
pub fn passes_type_filter(kind: &ElementType, config: &SearchConfig) -> bool {
    let types = &config.filter.element_types;
    let name = kind.as_str();
    passes_list(types.mode, &types.allowed_types, &types.blacklisted_types, |t| t == name)
}

fn passes_tag_filter(tags: &[String], config: &SearchConfig) -> bool {
    let filter = &config.filter.tag_filtering;
    if filter.mode == FilterMode::Whitelist && !filter.allowed_tags.is_empty() && tags.is_empty() {
        return false;
    }
    passes_list(filter.mode, &filter.allowed_tags, &filter.blacklisted_tags, |wanted| {
        tags.iter().any(|tag| tag == wanted)
    })
}

/// Shared allow/deny evaluation. An empty allow list admits everything;
/// blank list entries are ignored.
fn passes_list(mode: FilterMode, allowed: &[String], denied: &[String], hit: impl Fn(&str) -> bool) -> bool {
    let entries = |list: &[String]| {
        list.iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .any(&hit)
    };
    match mode {
        FilterMode::None => true,
        FilterMode::Whitelist => allowed.iter().all(|v| v.trim().is_empty()) || entries(allowed),
        FilterMode::Blacklist => !entries(denied),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn empty_label_short_circuits() {
        let mut config = SearchConfig::default();
        config.include_content.elements.skip_empty_labels = true;
        assert_eq!(
            element_verdict(&ElementType::Hotspot, "  ", &tags(&["a"]), &config),
            Err(Rejection::EmptyLabel)
        );
        config.include_content.elements.skip_empty_labels = false;
        assert!(should_include_element(&ElementType::Hotspot, "", &[], &config));
    }

    #[test]
    fn label_filter_uses_substrings() {
        let mut config = SearchConfig::default();
        config.filter.element_labels.mode = FilterMode::Blacklist;
        config.filter.element_labels.blacklisted_values = tags(&["temp"]);
        assert!(!should_include_element(&ElementType::Image, "temp-banner", &[], &config));
        assert!(should_include_element(&ElementType::Image, "banner", &[], &config));

        config.filter.element_labels.mode = FilterMode::Whitelist;
        config.filter.element_labels.allowed_values = tags(&["Exit"]);
        assert!(should_include_element(&ElementType::Image, "Exit north", &[], &config));
        assert!(!should_include_element(&ElementType::Image, "exit north", &[], &config));
    }

    #[test]
    fn tag_whitelist_rejects_untagged_elements() {
        let mut config = SearchConfig::default();
        config.filter.tag_filtering.mode = FilterMode::Whitelist;
        config.filter.tag_filtering.allowed_tags = tags(&["public"]);
        assert_eq!(element_verdict(&ElementType::Text, "Note", &[], &config), Err(Rejection::TagFilter));
        assert!(should_include_element(&ElementType::Text, "Note", &tags(&["staff", "public"]), &config));

        config.filter.tag_filtering.mode = FilterMode::Blacklist;
        config.filter.tag_filtering.blacklisted_tags = tags(&["staff"]);
        assert!(!should_include_element(&ElementType::Text, "Note", &tags(&["staff"]), &config));
        assert!(should_include_element(&ElementType::Text, "Note", &[], &config));
    }

    #[test]
    fn unknown_types_default_to_included() {
        let mut config = SearchConfig::default();
        let custom = ElementType::Custom("Model".into());
        assert!(should_include_element(&custom, "Statue", &[], &config));
        config.include_content.elements.extra.insert("includeModels".into(), false);
        assert_eq!(element_verdict(&custom, "Statue", &[], &config), Err(Rejection::TypeDisabled));
    }

    #[test]
    fn min_label_length_counts_characters() {
        let mut config = SearchConfig::default();
        config.include_content.elements.min_label_length = 3;
        assert_eq!(element_verdict(&ElementType::Video, "ab", &[], &config), Err(Rejection::LabelTooShort));
        assert!(should_include_element(&ElementType::Video, "äöü", &[], &config));
    }

    #[test]
    fn blank_panoramas_need_explicit_opt_in() {
        let mut config = SearchConfig::default();
        let blank = PanoramaFacts { index: 1, label: "", subtitle: None, tags: &[] };
        assert_eq!(panorama_verdict(&blank, &config), Err(Rejection::CompletelyBlank));
        config.include_content.completely_blank = true;
        assert!(should_include_panorama(&blank, &config));

        config.filter.media_indexes.mode = FilterMode::Blacklist;
        config.filter.media_indexes.blacklisted = vec![1];
        assert_eq!(panorama_verdict(&blank, &config), Err(Rejection::MediaIndex));
    }

    #[test]
    fn unlabeled_panoramas_follow_their_flags() {
        let mut config = SearchConfig::default();
        let subtitled = PanoramaFacts { index: 0, label: "", subtitle: Some("Ground floor"), tags: &[] };
        assert_eq!(panorama_verdict(&subtitled, &config), Err(Rejection::Unlabeled));
        config.include_content.unlabeled_with_subtitles = true;
        assert!(should_include_panorama(&subtitled, &config));

        let tagged_tags = tags(&["outdoor"]);
        let tagged = PanoramaFacts { index: 0, label: "", subtitle: None, tags: &tagged_tags };
        assert!(!should_include_panorama(&tagged, &config));
        config.include_content.unlabeled_with_tags = true;
        assert!(should_include_panorama(&tagged, &config));
    }

    #[test]
    fn value_filter_checks_label_and_subtitle() {
        let mut config = SearchConfig::default();
        config.filter.mode = FilterMode::Whitelist;
        config.filter.allowed_values = tags(&["Wing"]);
        let facts = PanoramaFacts { index: 0, label: "Lobby", subtitle: Some("East Wing"), tags: &[] };
        assert!(should_include_panorama(&facts, &config));
        let facts = PanoramaFacts { index: 0, label: "Lobby", subtitle: None, tags: &[] };
        assert_eq!(panorama_verdict(&facts, &config), Err(Rejection::ValueFilter));
    }
}

//! Result model handed back to the UI layer.

use serde::Serialize;

use tourfind_core::{ElementType, SearchRecord};

pub const BUSINESS_GROUP: &str = "Business";

/// What selecting a result does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ResultAction {
    #[serde(rename_all = "camelCase")]
    Navigate { index: usize },
    #[serde(rename_all = "camelCase")]
    NavigateAndTrigger { parent_index: usize, element_id: String },
    /// Nothing to navigate to, e.g. a business-only entry.
    Inert,
}

impl ResultAction {
    pub fn for_record(record: &SearchRecord) -> Self {
        if record.kind == ElementType::Panorama {
            return record.index.map_or(Self::Inert, |index| Self::Navigate { index });
        }
        match (record.parent_index, record.id.as_deref().filter(|id| !id.is_empty())) {
            (Some(parent_index), Some(id)) => Self::NavigateAndTrigger { parent_index, element_id: id.to_string() },
            (Some(index), None) => Self::Navigate { index },
            (None, _) => record.index.map_or(Self::Inert, |index| Self::Navigate { index }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub record: SearchRecord,
    /// Distance reported by the fuzzy engine; 0 is best.
    pub score: f64,
    pub action: ResultAction,
}

impl SearchResult {
    pub fn new(record: SearchRecord, score: f64) -> Self {
        let action = ResultAction::for_record(&record);
        Self { record, score, action }
    }

    /// Group the result is rendered under. Tour records enhanced from the
    /// business directory are shown with the businesses.
    pub fn group_key(&self) -> &str {
        if self.record.is_business_enhanced() {
            BUSINESS_GROUP
        } else {
            self.record.kind.as_str()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultGroup {
    pub key: String,
    pub display_label: String,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedResults {
    /// Every surviving result, best first.
    pub ranked: Vec<SearchResult>,
    pub groups: Vec<ResultGroup>,
}

impl GroupedResults {
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn group(&self, key: &str) -> Option<&ResultGroup> {
        self.groups.iter().find(|g| g.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "camelCase")]
pub enum QueryOutcome {
    /// Empty term; the caller shows its idle state.
    Idle,
    NeedsMoreCharacters { min: usize },
    Results(GroupedResults),
    /// The search itself failed; the index is untouched.
    Error(String),
}

impl QueryOutcome {
    pub fn results(&self) -> Option<&GroupedResults> {
        match self {
            Self::Results(results) => Some(results),
            _ => None,
        }
    }
}

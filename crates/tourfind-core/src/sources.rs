//! External feeds: the business directory and spreadsheet rows.
//!
//! Fetching stays outside the workspace; these loaders read already
//! downloaded JSON documents and normalize their shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// One business directory entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BusinessEntry {
    #[serde(deserialize_with = "text_or_number")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "matchTag")]
    pub tag: Option<String>,
    pub alt_tags: Vec<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BusinessEntry {
    pub fn display_name(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
    }

    /// Primary tag followed by alternates, empties dropped.
    pub fn all_tags(&self) -> Vec<String> {
        self.tag
            .iter()
            .chain(self.alt_tags.iter())
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Directory exports carry ids as strings or bare numbers.
fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A spreadsheet row with free-form keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetRow(pub Map<String, Value>);

impl SheetRow {
    /// First non-empty text value among `keys`, tried in order.
    pub fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.text(key))
    }

    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => non_empty(Some(s.trim())).map(str::to_string),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn index(&self, key: &str) -> Option<usize> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Tags from the first present key in `keys`: arrays are taken as is,
    /// strings are split on commas.
    pub fn tag_list(&self, keys: &[&str]) -> Vec<String> {
        let Some(value) = keys.iter().find_map(|key| self.0.get(*key)) else {
            return Vec::new();
        };
        let raw: Vec<String> = match value {
            Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Value::String(s) => s.split(',').map(str::to_string).collect(),
            _ => Vec::new(),
        };
        raw.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn to_payload(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Pre-parsed external data made available to one index build.
#[derive(Debug, Clone, Default)]
pub struct ExternalData {
    pub business: Vec<BusinessEntry>,
    pub sheets: Vec<SheetRow>,
}

/// Read a business directory: either a bare array of entries or an object
/// holding them under `businesses`.
pub fn load_business_directory(path: &Path) -> Result<Vec<BusinessEntry>> {
    let text = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;
    let entries = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => map
            .remove("businesses")
            .ok_or_else(|| Error::NotFound(format!("`businesses` array in {}", path.display())))?,
        _ => return Err(Error::Operation(format!("unexpected business directory shape in {}", path.display()))),
    };
    let entries: Vec<BusinessEntry> = serde_json::from_value(entries)?;
    if entries.is_empty() {
        warn!(path = %path.display(), "business directory is empty");
    }
    debug!(count = entries.len(), "loaded business directory");
    Ok(entries)
}

/// Read spreadsheet rows exported as a JSON array of objects. Non-object
/// rows are skipped.
pub fn load_sheet_rows(path: &Path) -> Result<Vec<SheetRow>> {
    let text = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;
    let Value::Array(items) = value else {
        return Err(Error::Operation(format!("expected an array of rows in {}", path.display())));
    };
    let total = items.len();
    let rows: Vec<SheetRow> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(SheetRow(map)),
            _ => None,
        })
        .collect();
    if rows.len() < total {
        warn!(skipped = total - rows.len(), "ignored malformed spreadsheet rows");
    }
    Ok(rows)
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

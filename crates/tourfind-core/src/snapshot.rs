//! JSON scene-graph snapshots.
//!
//! A snapshot is an exported copy of the viewer's object graph. Plain keys
//! become fields. Two reserved keys describe behaviour:
//!
//! - `"$methods"`: method name to return value. When a method is called with
//!   a leading string argument and its return value is an object, the
//!   argument selects a field of that object (`get("label")`,
//!   `getById("hs-1")`).
//! - `"$throws"`: names of methods that raise when called.
//!
//! Every call is appended to the object's call log.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::host::{property, try_call, CallOutcome, HostObject, HostRef, HostValue};
use crate::traits::TourHandle;

const METHODS_KEY: &str = "$methods";
const THROWS_KEY: &str = "$throws";

pub struct SnapshotObject {
    fields: Vec<(String, HostValue)>,
    methods: BTreeMap<String, HostValue>,
    throws: BTreeSet<String>,
    calls: Mutex<Vec<String>>,
}

impl SnapshotObject {
    pub fn from_map(map: &Map<String, Value>) -> Arc<Self> {
        let mut fields = Vec::with_capacity(map.len());
        let mut methods = BTreeMap::new();
        let mut throws = BTreeSet::new();
        for (key, value) in map {
            match key.as_str() {
                METHODS_KEY => {
                    if let Value::Object(defs) = value {
                        for (name, ret) in defs {
                            methods.insert(name.clone(), to_host_value(ret));
                        }
                    }
                }
                THROWS_KEY => {
                    if let Value::Array(names) = value {
                        throws.extend(names.iter().filter_map(Value::as_str).map(str::to_string));
                    }
                }
                _ => fields.push((key.clone(), to_host_value(value))),
            }
        }
        Arc::new(Self { fields, methods, throws, calls: Mutex::new(Vec::new()) })
    }

    /// Calls made on this object so far, rendered as `name(arg, ...)`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn record_call(&self, method: &str, args: &[HostValue]) {
        let rendered: Vec<String> = args
            .iter()
            .map(|a| a.to_text().unwrap_or_else(|| format!("{a:?}")))
            .collect();
        if let Ok(mut log) = self.calls.lock() {
            log.push(format!("{method}({})", rendered.join(", ")));
        }
    }
}

impl HostObject for SnapshotObject {
    fn field(&self, name: &str) -> Option<HostValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }

    fn keys(&self) -> Vec<String> {
        self.fields.iter().map(|(k, _)| k.clone()).collect()
    }

    fn call(&self, method: &str, args: &[HostValue]) -> CallOutcome {
        self.record_call(method, args);
        if self.throws.contains(method) {
            return CallOutcome::Threw(format!("{method} is not available"));
        }
        let Some(ret) = self.methods.get(method) else {
            return CallOutcome::Missing;
        };
        match (ret, args.first().and_then(HostValue::as_str)) {
            (HostValue::Object(obj), Some(key)) => {
                CallOutcome::Returned(obj.field(key).unwrap_or(HostValue::Null))
            }
            _ => CallOutcome::Returned(ret.clone()),
        }
    }
}

/// Convert a JSON document into host values, objects becoming
/// [`SnapshotObject`]s.
pub fn to_host_value(value: &Value) -> HostValue {
    match value {
        Value::Null => HostValue::Null,
        Value::Bool(b) => HostValue::Bool(*b),
        Value::Number(n) => n.as_f64().map_or(HostValue::Null, HostValue::Number),
        Value::String(s) => HostValue::Str(s.clone()),
        Value::Array(items) => HostValue::List(items.iter().map(to_host_value).collect()),
        Value::Object(map) => HostValue::Object(SnapshotObject::from_map(map)),
    }
}

/// A tour backed by a scene snapshot.
pub struct SnapshotTour {
    root: Arc<SnapshotObject>,
    selected: Mutex<Option<usize>>,
}

impl SnapshotTour {
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::Host("snapshot root must be an object".into()));
        };
        Ok(Self { root: SnapshotObject::from_map(map), selected: Mutex::new(None) })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)?;
        Self::from_json(&value)
    }

    /// Last index accepted by [`TourHandle::select_panorama`].
    pub fn selected_index(&self) -> Option<usize> {
        self.selected.lock().ok().and_then(|s| *s)
    }
}

impl TourHandle for SnapshotTour {
    fn root(&self) -> HostRef {
        self.root.clone()
    }

    fn select_panorama(&self, index: usize) -> bool {
        if index >= self.playlist_items().len() {
            return false;
        }
        if let Some(playlist) = property(self.root.as_ref(), "mainPlayList").and_then(|v| v.as_object().cloned()) {
            // Snapshots without a setter still count as navigated.
            let _ = try_call(playlist.as_ref(), "set", &[HostValue::from("selectedIndex"), HostValue::from(index)]);
        }
        if let Ok(mut selected) = self.selected.lock() {
            *selected = Some(index);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn methods_index_object_returns_by_argument() {
        let HostValue::Object(obj) = to_host_value(&json!({
            "$methods": {"get": {"label": "Lobby"}, "getOverlays": []},
            "$throws": ["explode"],
        })) else {
            panic!("expected object");
        };
        assert!(matches!(obj.call("get", &["label".into()]), CallOutcome::Returned(HostValue::Str(s)) if s == "Lobby"));
        assert!(matches!(obj.call("get", &["nope".into()]), CallOutcome::Returned(HostValue::Null)));
        assert!(matches!(obj.call("getOverlays", &[]), CallOutcome::Returned(HostValue::List(_))));
        assert!(matches!(obj.call("explode", &[]), CallOutcome::Threw(_)));
        assert!(matches!(obj.call("absent", &[]), CallOutcome::Missing));
        assert!(obj.keys().is_empty());
    }

    #[test]
    fn call_log_records_arguments() {
        let obj = SnapshotObject::from_map(json!({"$methods": {"trigger": null}}).as_object().expect("map"));
        let _ = obj.call("trigger", &["click".into()]);
        assert_eq!(obj.calls(), vec!["trigger(click)"]);
    }

    #[test]
    fn tour_walks_playlist_and_tracks_selection() {
        let tour = SnapshotTour::from_json(&json!({
            "mainPlayList": {"items": [{"media": {"id": "p0"}}, {"media": {"id": "p1"}}]},
        }))
        .expect("tour");
        assert_eq!(tour.playlist_items().len(), 2);
        assert!(tour.select_panorama(1));
        assert!(!tour.select_panorama(5));
        assert_eq!(tour.selected_index(), Some(1));
    }
}

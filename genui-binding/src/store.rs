//! Shared data-model store.
//!
//! A path-keyed map of JSON values with an observable per path.
//! Writes from the model (via `data_model_update` messages) and from
//! widgets (via two-way bindings) both land here.

use crate::observable::Observable;
use crate::path::BindingPath;
use genui_core::messages::DataModelUpdate;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Path-keyed shared value store.
#[derive(Debug, Clone, Default)]
pub struct DataModelStore {
    observables: Arc<Mutex<HashMap<BindingPath, Observable<JsonValue>>>>,
}

impl DataModelStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value at a path; `Null` when unset.
    #[must_use]
    pub fn get(&self, path: &BindingPath) -> JsonValue {
        self.observables
            .lock()
            .get(path)
            .map(Observable::get)
            .unwrap_or(JsonValue::Null)
    }

    /// Whether the path has ever been written or observed.
    #[must_use]
    pub fn contains(&self, path: &BindingPath) -> bool {
        self.observables.lock().contains_key(path)
    }

    /// Write a value, notifying that path's subscribers.
    pub fn set(&self, path: &BindingPath, value: JsonValue) {
        let observable = self.observe(path);
        observable.set(value);
    }

    /// The observable for a path, created on first access.
    #[must_use]
    pub fn observe(&self, path: &BindingPath) -> Observable<JsonValue> {
        self.observables
            .lock()
            .entry(path.clone())
            .or_insert_with(|| Observable::new(JsonValue::Null))
            .clone()
    }

    /// Apply a `data_model_update` message: each entry's key parses
    /// as a path, prefixed by the update's scope when present.
    /// Unparseable keys are skipped with a warning.
    pub fn apply_update(&self, update: &DataModelUpdate) {
        let scope = match update.scope.as_deref() {
            Some(raw) => match BindingPath::parse(raw) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(scope = raw, error = %e, "ignoring update with unparseable scope");
                    return;
                }
            },
            None => None,
        };

        for (key, value) in &update.updates {
            match BindingPath::parse(key) {
                Ok(path) => {
                    let target = match &scope {
                        Some(scope) => scope.join(&path),
                        None => path,
                    };
                    self.set(&target, value.clone());
                }
                Err(e) => {
                    warn!(key, error = %e, "skipping update with unparseable path");
                }
            }
        }
    }

    /// Number of tracked paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observables.lock().len()
    }

    /// Whether the store tracks no paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observables.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> BindingPath {
        BindingPath::parse(s).unwrap()
    }

    #[test]
    fn test_get_unset_is_null() {
        let store = DataModelStore::new();
        assert_eq!(store.get(&path("a.b")), JsonValue::Null);
    }

    #[test]
    fn test_set_then_get() {
        let store = DataModelStore::new();
        store.set(&path("user.name"), json!("ada"));
        assert_eq!(store.get(&path("user.name")), json!("ada"));
    }

    #[test]
    fn test_observe_notifies_on_set() {
        let store = DataModelStore::new();
        let observable = store.observe(&path("count"));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = observable.subscribe(move |v| seen_clone.lock().push(v.clone()));

        store.set(&path("count"), json!(1));
        store.set(&path("count"), json!(2));
        assert_eq!(*seen.lock(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_notation_equivalence_shares_storage() {
        let store = DataModelStore::new();
        store.set(&BindingPath::from_dot_notation("a.b[2].c").unwrap(), json!(9));
        assert_eq!(
            store.get(&BindingPath::from_slash_notation("/a/b/2/c").unwrap()),
            json!(9)
        );
    }

    #[test]
    fn test_apply_update_without_scope() {
        let store = DataModelStore::new();
        let update: DataModelUpdate = serde_json::from_value(json!({
            "updates": {"user.name": "ada", "user.age": 36}
        }))
        .unwrap();

        store.apply_update(&update);
        assert_eq!(store.get(&path("user.name")), json!("ada"));
        assert_eq!(store.get(&path("user.age")), json!(36));
    }

    #[test]
    fn test_apply_update_with_scope() {
        let store = DataModelStore::new();
        let update: DataModelUpdate = serde_json::from_value(json!({
            "updates": {"name": "ada"},
            "scope": "form.fields"
        }))
        .unwrap();

        store.apply_update(&update);
        assert_eq!(store.get(&path("form.fields.name")), json!("ada"));
    }

    #[test]
    fn test_apply_update_skips_bad_paths() {
        let store = DataModelStore::new();
        let update: DataModelUpdate = serde_json::from_value(json!({
            "updates": {"ok.path": 1, "bad..path": 2}
        }))
        .unwrap();

        store.apply_update(&update);
        assert_eq!(store.get(&path("ok.path")), json!(1));
        assert_eq!(store.len(), 1);
    }
}

//! Live bindings and their registry.
//!
//! A `WidgetBinding` connects one widget property to one data-model
//! path. The registry owns every live binding, indexed by widget and
//! by surface so teardown can be done in bulk when a widget or a
//! whole surface goes away.

use crate::cache::TransformCache;
use crate::definition::{parse_binding_spec, BindingDefinition};
use crate::error::{BindingError, BindingResult};
use crate::observable::{Observable, Subscription};
use crate::store::DataModelStore;
use genui_core::messages::WidgetNode;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A live binding between a widget property and a model path.
pub struct WidgetBinding {
    /// Owning widget.
    pub widget_id: String,
    /// Surface the widget lives on.
    pub surface_id: String,
    /// The parsed definition.
    pub definition: BindingDefinition,
    value: Observable<JsonValue>,
    store: DataModelStore,
    subscription: Option<Subscription>,
    cache_key: Option<String>,
    last_written: Arc<Mutex<Option<JsonValue>>>,
}

impl std::fmt::Debug for WidgetBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetBinding")
            .field("widget_id", &self.widget_id)
            .field("surface_id", &self.surface_id)
            .field("definition", &self.definition)
            .finish()
    }
}

impl WidgetBinding {
    fn bind(
        widget_id: &str,
        surface_id: &str,
        definition: BindingDefinition,
        store: &DataModelStore,
        cache: &TransformCache,
    ) -> Self {
        let source = store.observe(&definition.path);
        let last_written: Arc<Mutex<Option<JsonValue>>> = Arc::new(Mutex::new(None));

        // Derive the widget-facing observable. Transformed bindings
        // go through the shared cache so repeated binds of the same
        // widget property reuse one derived observable.
        let (value, cache_key) = match &definition.to_widget {
            Some(transform) => {
                let key = format!("{surface_id}/{widget_id}/{}", definition.property);
                let derived = cache.get_or_create(&key, &source, transform.clone());
                (derived, Some(key))
            }
            None => (Observable::new(source.get()), None),
        };

        let subscription = if definition.reads_from_model() {
            if cache_key.is_some() {
                // The cache subscription already propagates changes.
                None
            } else {
                let value = value.clone();
                let last_written = last_written.clone();
                Some(source.subscribe(move |incoming: &JsonValue| {
                    // Skip the echo of our own write-back so a
                    // feedback cycle cannot start.
                    if last_written.lock().as_ref() == Some(incoming) {
                        return;
                    }
                    value.set(incoming.clone());
                }))
            }
        } else {
            None
        };

        Self {
            widget_id: widget_id.to_string(),
            surface_id: surface_id.to_string(),
            definition,
            value,
            store: store.clone(),
            subscription,
            cache_key,
            last_written,
        }
    }

    /// The widget-facing observable value.
    #[must_use]
    pub fn value(&self) -> &Observable<JsonValue> {
        &self.value
    }

    /// Push a widget-side edit back to the model.
    ///
    /// No-op for one-way bindings. A write identical to the previous
    /// one from this binding is suppressed, which both bounds
    /// redundant store traffic and breaks update cycles.
    ///
    /// Returns whether a store write happened.
    pub fn update_from_widget(&self, value: JsonValue) -> bool {
        if !self.definition.writes_to_model() {
            debug!(
                widget = %self.widget_id,
                property = %self.definition.property,
                "ignoring widget write on one-way binding"
            );
            return false;
        }

        let outgoing = match &self.definition.to_model {
            Some(transform) => transform(&value),
            None => value,
        };

        {
            let mut last = self.last_written.lock();
            if last.as_ref() == Some(&outgoing) {
                return false;
            }
            *last = Some(outgoing.clone());
        }

        self.store.set(&self.definition.path, outgoing);
        true
    }

    fn dispose(&mut self, cache: &TransformCache) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if let Some(key) = self.cache_key.take() {
            cache.remove(&key);
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    bindings: HashMap<u64, WidgetBinding>,
    by_widget: HashMap<String, Vec<u64>>,
    by_surface: HashMap<String, Vec<u64>>,
    next_id: u64,
}

/// Owns every live binding.
pub struct BindingRegistry {
    store: DataModelStore,
    cache: TransformCache,
    inner: Mutex<RegistryInner>,
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("bindings", &self.binding_count())
            .finish()
    }
}

impl BindingRegistry {
    /// Create a registry over a store, bounding the derived-observable
    /// cache to `max_cached_transforms` entries.
    #[must_use]
    pub fn new(store: DataModelStore, max_cached_transforms: usize) -> Self {
        Self {
            store,
            cache: TransformCache::new(max_cached_transforms),
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// The store this registry binds against.
    #[must_use]
    pub fn store(&self) -> &DataModelStore {
        &self.store
    }

    /// Register a widget's declarative bindings, if it has any.
    ///
    /// Returns the number of live bindings created. A widget with a
    /// binding spec but no id is rejected: the id keys teardown.
    pub fn bind_widget(&self, surface_id: &str, widget: &WidgetNode) -> BindingResult<usize> {
        let Some(spec) = &widget.data_binding else {
            return Ok(0);
        };
        let widget_id = widget.id.as_deref().ok_or(BindingError::MissingWidgetId)?;

        let definitions = parse_binding_spec(spec)?;
        let count = definitions.len();

        let mut inner = self.inner.lock();
        for definition in definitions {
            let binding =
                WidgetBinding::bind(widget_id, surface_id, definition, &self.store, &self.cache);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.bindings.insert(id, binding);
            inner
                .by_widget
                .entry(widget_id.to_string())
                .or_default()
                .push(id);
            inner
                .by_surface
                .entry(surface_id.to_string())
                .or_default()
                .push(id);
        }
        Ok(count)
    }

    /// Register one programmatic binding (e.g. with transforms).
    pub fn bind(
        &self,
        surface_id: &str,
        widget_id: &str,
        definition: BindingDefinition,
    ) -> u64 {
        let binding =
            WidgetBinding::bind(widget_id, surface_id, definition, &self.store, &self.cache);
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.bindings.insert(id, binding);
        inner
            .by_widget
            .entry(widget_id.to_string())
            .or_default()
            .push(id);
        inner
            .by_surface
            .entry(surface_id.to_string())
            .or_default()
            .push(id);
        id
    }

    /// Current widget-facing value of a bound property.
    #[must_use]
    pub fn widget_value(&self, widget_id: &str, property: &str) -> Option<JsonValue> {
        let inner = self.inner.lock();
        let ids = inner.by_widget.get(widget_id)?;
        ids.iter()
            .filter_map(|id| inner.bindings.get(id))
            .find(|b| b.definition.property == property)
            .map(|b| b.value().get())
    }

    /// Push a widget-side edit through the matching binding.
    ///
    /// Returns whether a store write happened.
    pub fn update_from_widget(&self, widget_id: &str, property: &str, value: JsonValue) -> bool {
        let inner = self.inner.lock();
        let Some(ids) = inner.by_widget.get(widget_id) else {
            return false;
        };
        let Some(binding) = ids
            .iter()
            .filter_map(|id| inner.bindings.get(id))
            .find(|b| b.definition.property == property)
        else {
            return false;
        };
        binding.update_from_widget(value)
    }

    /// Tear down every binding owned by a widget.
    ///
    /// Returns the number of bindings removed.
    pub fn remove_widget(&self, widget_id: &str) -> usize {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let Some(ids) = inner.by_widget.remove(widget_id) else {
            return 0;
        };
        let mut removed = 0;
        for id in ids {
            if let Some(mut binding) = inner.bindings.remove(&id) {
                binding.dispose(&self.cache);
                removed += 1;
            }
        }
        let bindings = &inner.bindings;
        for list in inner.by_surface.values_mut() {
            list.retain(|id| bindings.contains_key(id));
        }
        removed
    }

    /// Tear down every binding on a surface.
    ///
    /// Returns the number of bindings removed.
    pub fn remove_surface(&self, surface_id: &str) -> usize {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let Some(ids) = inner.by_surface.remove(surface_id) else {
            return 0;
        };
        let mut removed = 0;
        for id in ids {
            if let Some(mut binding) = inner.bindings.remove(&id) {
                binding.dispose(&self.cache);
                removed += 1;
            }
        }
        let bindings = &inner.bindings;
        for list in inner.by_widget.values_mut() {
            list.retain(|id| bindings.contains_key(id));
        }
        inner.by_widget.retain(|_, list| !list.is_empty());
        removed
    }

    /// Number of live bindings.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.inner.lock().bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::BindingPath;
    use genui_core::messages::BindingMode;
    use serde_json::json;

    fn widget(id: &str, binding: serde_json::Value) -> WidgetNode {
        serde_json::from_value(json!({
            "type": "textField",
            "id": id,
            "dataBinding": binding
        }))
        .unwrap()
    }

    fn path(s: &str) -> BindingPath {
        BindingPath::parse(s).unwrap()
    }

    #[test]
    fn test_bind_widget_bare_path() {
        let registry = BindingRegistry::new(DataModelStore::new(), 8);
        let count = registry
            .bind_widget("s1", &widget("w1", json!("user.name")))
            .unwrap();
        assert_eq!(count, 1);

        registry.store().set(&path("user.name"), json!("ada"));
        assert_eq!(registry.widget_value("w1", "value"), Some(json!("ada")));
    }

    #[test]
    fn test_widget_without_binding_is_fine() {
        let registry = BindingRegistry::new(DataModelStore::new(), 8);
        let node: WidgetNode = serde_json::from_value(json!({"type": "text"})).unwrap();
        assert_eq!(registry.bind_widget("s1", &node).unwrap(), 0);
    }

    #[test]
    fn test_widget_binding_without_id_rejected() {
        let registry = BindingRegistry::new(DataModelStore::new(), 8);
        let node: WidgetNode =
            serde_json::from_value(json!({"type": "text", "dataBinding": "a.b"})).unwrap();
        assert_eq!(
            registry.bind_widget("s1", &node),
            Err(BindingError::MissingWidgetId)
        );
    }

    #[test]
    fn test_two_way_write_back() {
        let registry = BindingRegistry::new(DataModelStore::new(), 8);
        registry
            .bind_widget(
                "s1",
                &widget("w1", json!({"value": {"path": "form.name", "mode": "twoWay"}})),
            )
            .unwrap();

        assert!(registry.update_from_widget("w1", "value", json!("typed")));
        assert_eq!(registry.store().get(&path("form.name")), json!("typed"));
    }

    #[test]
    fn test_duplicate_widget_write_suppressed() {
        let store = DataModelStore::new();
        let writes = Arc::new(Mutex::new(0u32));
        let writes_counter = writes.clone();
        let _listener = store
            .observe(&path("form.name"))
            .subscribe(move |_| *writes_counter.lock() += 1);

        let registry = BindingRegistry::new(store, 8);
        registry
            .bind_widget(
                "s1",
                &widget("w1", json!({"value": {"path": "form.name", "mode": "twoWay"}})),
            )
            .unwrap();

        assert!(registry.update_from_widget("w1", "value", json!("x")));
        assert!(!registry.update_from_widget("w1", "value", json!("x")));
        assert_eq!(*writes.lock(), 1);

        // A genuinely new value writes again.
        assert!(registry.update_from_widget("w1", "value", json!("y")));
        assert_eq!(*writes.lock(), 2);
    }

    #[test]
    fn test_model_echo_does_not_loop() {
        let registry = BindingRegistry::new(DataModelStore::new(), 8);
        registry
            .bind_widget(
                "s1",
                &widget("w1", json!({"value": {"path": "form.name", "mode": "twoWay"}})),
            )
            .unwrap();

        registry.update_from_widget("w1", "value", json!("typed"));
        // The widget-facing value was not re-set by the echo of its
        // own write; it still reflects the model state on demand.
        assert_eq!(registry.store().get(&path("form.name")), json!("typed"));

        // An external model write does reach the widget.
        registry.store().set(&path("form.name"), json!("external"));
        assert_eq!(registry.widget_value("w1", "value"), Some(json!("external")));
    }

    #[test]
    fn test_one_way_binding_ignores_widget_writes() {
        let registry = BindingRegistry::new(DataModelStore::new(), 8);
        registry
            .bind_widget("s1", &widget("w1", json!("display.title")))
            .unwrap();

        assert!(!registry.update_from_widget("w1", "value", json!("nope")));
        assert_eq!(registry.store().get(&path("display.title")), JsonValue::Null);
    }

    #[test]
    fn test_remove_widget_tears_down() {
        let store = DataModelStore::new();
        let registry = BindingRegistry::new(store.clone(), 8);
        registry
            .bind_widget("s1", &widget("w1", json!("a.b")))
            .unwrap();
        let source = store.observe(&path("a.b"));
        assert_eq!(source.listener_count(), 1);

        assert_eq!(registry.remove_widget("w1"), 1);
        assert_eq!(registry.binding_count(), 0);
        assert_eq!(source.listener_count(), 0);
        assert_eq!(registry.widget_value("w1", "value"), None);
    }

    #[test]
    fn test_remove_surface_bulk_teardown() {
        let registry = BindingRegistry::new(DataModelStore::new(), 8);
        registry
            .bind_widget("s1", &widget("w1", json!("a.b")))
            .unwrap();
        registry
            .bind_widget("s1", &widget("w2", json!("a.c")))
            .unwrap();
        registry
            .bind_widget("s2", &widget("w3", json!("a.d")))
            .unwrap();

        assert_eq!(registry.remove_surface("s1"), 2);
        assert_eq!(registry.binding_count(), 1);
        assert_eq!(registry.widget_value("w3", "value"), Some(JsonValue::Null));
    }

    #[test]
    fn test_transformed_binding_uses_cache() {
        let store = DataModelStore::new();
        let registry = BindingRegistry::new(store.clone(), 8);
        store.set(&path("n"), json!(2));

        let definition = BindingDefinition::new("label", path("n"), BindingMode::OneWay)
            .with_to_widget(Arc::new(|v| match v.as_i64() {
                Some(n) => json!(n * 10),
                None => v.clone(),
            }));
        registry.bind("s1", "w1", definition);

        assert_eq!(registry.widget_value("w1", "label"), Some(json!(20)));
        store.set(&path("n"), json!(5));
        assert_eq!(registry.widget_value("w1", "label"), Some(json!(50)));
    }
}

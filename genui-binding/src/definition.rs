//! Binding definitions.
//!
//! Parses the declarative binding spec a widget carries into typed
//! definitions, one per bound property.

use crate::error::BindingResult;
use crate::path::BindingPath;
use genui_core::messages::{BindingMode, DataBindingSpec, PropertyBinding};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Value transformer applied between the model and a widget property.
pub type Transform = Arc<dyn Fn(&JsonValue) -> JsonValue + Send + Sync>;

/// One property's binding, parsed from the wire spec.
#[derive(Clone)]
pub struct BindingDefinition {
    /// Widget property being bound.
    pub property: String,
    /// Data-model path.
    pub path: BindingPath,
    /// Propagation direction.
    pub mode: BindingMode,
    /// Transform applied when a model value flows to the widget.
    pub to_widget: Option<Transform>,
    /// Transform applied when a widget value flows to the model.
    pub to_model: Option<Transform>,
}

impl std::fmt::Debug for BindingDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingDefinition")
            .field("property", &self.property)
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("to_widget", &self.to_widget.is_some())
            .field("to_model", &self.to_model.is_some())
            .finish()
    }
}

impl BindingDefinition {
    /// Create a one-way definition.
    pub fn new(property: impl Into<String>, path: BindingPath, mode: BindingMode) -> Self {
        Self {
            property: property.into(),
            path,
            mode,
            to_widget: None,
            to_model: None,
        }
    }

    /// Set the model-to-widget transform.
    #[must_use]
    pub fn with_to_widget(mut self, transform: Transform) -> Self {
        self.to_widget = Some(transform);
        self
    }

    /// Set the widget-to-model transform.
    #[must_use]
    pub fn with_to_model(mut self, transform: Transform) -> Self {
        self.to_model = Some(transform);
        self
    }

    /// Whether widget-side writes flow back to the model.
    #[must_use]
    pub fn writes_to_model(&self) -> bool {
        matches!(self.mode, BindingMode::TwoWay | BindingMode::OneWayToSource)
    }

    /// Whether model-side changes flow to the widget.
    #[must_use]
    pub fn reads_from_model(&self) -> bool {
        matches!(self.mode, BindingMode::OneWay | BindingMode::TwoWay)
    }
}

/// Parse a wire binding spec into per-property definitions.
///
/// A bare path string binds one-way to the `value` property; the map
/// form binds each named property, with an optional explicit mode.
pub fn parse_binding_spec(spec: &DataBindingSpec) -> BindingResult<Vec<BindingDefinition>> {
    match spec {
        DataBindingSpec::Path(raw) => {
            let path = BindingPath::parse(raw)?;
            Ok(vec![BindingDefinition::new("value", path, BindingMode::OneWay)])
        }
        DataBindingSpec::Map(map) => {
            let mut definitions = Vec::with_capacity(map.len());
            for (property, binding) in map {
                let (raw, mode) = match binding {
                    PropertyBinding::Path(raw) => (raw, BindingMode::OneWay),
                    PropertyBinding::Full { path, mode } => (path, *mode),
                };
                definitions.push(BindingDefinition::new(
                    property.clone(),
                    BindingPath::parse(raw)?,
                    mode,
                ));
            }
            Ok(definitions)
        }
    }
}

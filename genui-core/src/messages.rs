//! Structured UI-control messages and the widget tree they carry.
//!
//! These are the four closed message kinds a model can emit to drive
//! the UI layer, plus the widget node / data-binding wire shapes that
//! ride inside them. Wire discriminants are stable: `begin_rendering`,
//! `surface_update`, `data_model_update`, `delete_surface`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Closed set of UI-control messages.
///
/// Unknown discriminants fail to deserialize; callers surface that as
/// "unrecognized" rather than a crash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum A2uiMessage {
    /// Start rendering a new surface.
    BeginRendering(BeginRendering),
    /// Add or replace widgets on a surface.
    SurfaceUpdate(SurfaceUpdate),
    /// Write values into the shared data model.
    DataModelUpdate(DataModelUpdate),
    /// Tear down a surface.
    DeleteSurface(DeleteSurface),
}

impl A2uiMessage {
    /// The wire discriminant for this message kind.
    #[must_use]
    pub fn discriminant(&self) -> &'static str {
        match self {
            Self::BeginRendering(_) => "begin_rendering",
            Self::SurfaceUpdate(_) => "surface_update",
            Self::DataModelUpdate(_) => "data_model_update",
            Self::DeleteSurface(_) => "delete_surface",
        }
    }

    /// The surface this message targets, if it targets one.
    #[must_use]
    pub fn surface_id(&self) -> Option<&str> {
        match self {
            Self::BeginRendering(m) => Some(&m.surface_id),
            Self::SurfaceUpdate(m) => Some(&m.surface_id),
            Self::DeleteSurface(m) => Some(&m.surface_id),
            Self::DataModelUpdate(_) => None,
        }
    }
}

/// Start rendering a new surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginRendering {
    /// Identifier of the surface to render.
    pub surface_id: String,
    /// Surface to nest under, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_surface_id: Option<String>,
    /// Root widget id. Kept exactly as received: `None` means the
    /// model did not specify one, and defaulting is owned by the
    /// consuming layer via [`BeginRendering::root_or_default`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// Free-form metadata attached by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

impl BeginRendering {
    /// Create a message for the given surface.
    pub fn new(surface_id: impl Into<String>) -> Self {
        Self {
            surface_id: surface_id.into(),
            parent_surface_id: None,
            root: None,
            metadata: None,
        }
    }

    /// The root widget id, defaulted to `"root"` when unspecified.
    ///
    /// This accessor is the single place the default is applied.
    #[must_use]
    pub fn root_or_default(&self) -> &str {
        self.root.as_deref().unwrap_or("root")
    }

    /// Set the parent surface.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_surface_id = Some(parent.into());
        self
    }

    /// Set the root widget id.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }
}

/// Add or replace widgets on a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceUpdate {
    /// Target surface.
    pub surface_id: String,
    /// Widgets in render order.
    #[serde(default)]
    pub widgets: Vec<WidgetNode>,
    /// Append to the surface instead of replacing its contents.
    #[serde(default)]
    pub append: bool,
}

impl SurfaceUpdate {
    /// Create an update replacing the surface contents.
    pub fn new(surface_id: impl Into<String>, widgets: Vec<WidgetNode>) -> Self {
        Self {
            surface_id: surface_id.into(),
            widgets,
            append: false,
        }
    }
}

/// Write values into the shared data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataModelUpdate {
    /// Path-to-value writes, in the order the model emitted them.
    #[serde(default)]
    pub updates: IndexMap<String, JsonValue>,
    /// Optional path prefix the updates are relative to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Tear down a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSurface {
    /// Surface to delete.
    pub surface_id: String,
    /// Also delete nested surfaces.
    #[serde(default = "default_true")]
    pub cascade: bool,
}

fn default_true() -> bool {
    true
}

impl DeleteSurface {
    /// Create a cascading delete for the given surface.
    pub fn new(surface_id: impl Into<String>) -> Self {
        Self {
            surface_id: surface_id.into(),
            cascade: true,
        }
    }
}

/// One node in a widget tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetNode {
    /// Widget type name from the catalog.
    #[serde(rename = "type")]
    pub widget_type: String,
    /// Stable id, when the model assigned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Widget properties.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, JsonValue>,
    /// Ordered children: nested nodes or id references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<WidgetChild>>,
    /// Declarative binding of properties to data-model paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_binding: Option<DataBindingSpec>,
}

impl WidgetNode {
    /// Create a node of the given type with no properties.
    pub fn new(widget_type: impl Into<String>) -> Self {
        Self {
            widget_type: widget_type.into(),
            id: None,
            properties: IndexMap::new(),
            children: None,
            data_binding: None,
        }
    }

    /// Set the node id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Set the binding spec.
    #[must_use]
    pub fn with_binding(mut self, binding: DataBindingSpec) -> Self {
        self.data_binding = Some(binding);
        self
    }
}

/// A child entry: a fully nested node, or a reference to one by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WidgetChild {
    /// Reference to a node defined elsewhere.
    Reference(String),
    /// Inline nested node.
    Node(Box<WidgetNode>),
}

/// Declarative data-binding spec as it appears on the wire.
///
/// Either a bare path string (one-way bind to the `value` property),
/// or a map from property name to a path or `{path, mode}` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataBindingSpec {
    /// Bare path bound one-way to the `value` property.
    Path(String),
    /// Per-property bindings.
    Map(IndexMap<String, PropertyBinding>),
}

/// Binding target for a single property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyBinding {
    /// Bare path, bound one-way.
    Path(String),
    /// Path with an explicit mode.
    Full {
        /// Data-model path.
        path: String,
        /// Propagation direction.
        mode: BindingMode,
    },
}

/// Direction a binding propagates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingMode {
    /// Model to widget only.
    OneWay,
    /// Model and widget both ways.
    TwoWay,
    /// Widget to model only.
    OneWayToSource,
}

impl Default for BindingMode {
    fn default() -> Self {
        Self::OneWay
    }
}

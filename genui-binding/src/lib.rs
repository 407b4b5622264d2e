//! # genui-binding
//!
//! Reactive data binding between UI widgets and the shared data
//! model.
//!
//! Widgets declare bindings on the wire (`dataBinding` on a widget
//! node); this crate parses them, subscribes to the shared store, and
//! propagates writes in both directions with duplicate-write
//! suppression so model/widget update cycles cannot form. Derived
//! (transformed) observables live in a bounded LRU cache.
//!
//! ## Core Concepts
//!
//! - **[`BindingPath`]**: dotted/bracket or slash paths into the model
//! - **[`Observable`] / [`Subscription`]**: explicit listener handles
//!   with deterministic teardown
//! - **[`DataModelStore`]**: path-keyed shared values
//! - **[`BindingDefinition`] / [`parse_binding_spec`]**: the wire spec
//! - **[`TransformCache`]**: bounded LRU of derived observables
//! - **[`BindingRegistry`]**: live bindings, indexed for bulk teardown
//!
//! ## Example
//!
//! ```ignore
//! use genui_binding::{BindingPath, BindingRegistry, DataModelStore};
//! use serde_json::json;
//!
//! let store = DataModelStore::new();
//! let registry = BindingRegistry::new(store.clone(), 32);
//!
//! registry.bind_widget("surface-1", &widget)?;
//! store.set(&BindingPath::parse("user.name")?, json!("ada"));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cache;
pub mod definition;
pub mod error;
pub mod observable;
pub mod path;
pub mod registry;
pub mod store;

// Re-exports
pub use cache::TransformCache;
pub use definition::{parse_binding_spec, BindingDefinition, Transform};
pub use error::{BindingError, BindingResult};
pub use observable::{Observable, Subscription};
pub use path::BindingPath;
pub use registry::{BindingRegistry, WidgetBinding};
pub use store::DataModelStore;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        parse_binding_spec, BindingDefinition, BindingError, BindingPath, BindingRegistry,
        DataModelStore, Observable, Subscription, TransformCache,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let path = BindingPath::parse("a.b").unwrap();
        assert_eq!(path.leaf(), Some("b"));
        let store = DataModelStore::new();
        assert!(store.is_empty());
    }
}

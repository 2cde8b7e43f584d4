//! Applies one widget payload: data model first, then the surface.
//!
//! The registry built here lives only for the duration of [`apply`]; ids in
//! a later payload are never looked up against it.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::api::A2uiPayload;
use crate::core::component::ComponentRegistry;
use crate::core::data_store::DataStore;
use crate::core::resolver::{self, RenderTree};

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceView {
    /// Resolved tree; may be empty when the root id is unknown.
    Tree(RenderTree),
    /// Payload lacked a surface or a root; shown as pretty JSON.
    Raw(String),
}

impl SurfaceView {
    pub fn tree(&self) -> Option<&RenderTree> {
        match self {
            SurfaceView::Tree(tree) => Some(tree),
            SurfaceView::Raw(_) => None,
        }
    }
}

pub fn decode_payload(data: &Value) -> Result<A2uiPayload, serde_json::Error> {
    A2uiPayload::deserialize(data)
}

/// Seeds the store from `dataModelUpdate`, then resolves the root.
///
/// The raw view pretty-prints `data` as received, fields unknown to
/// [`A2uiPayload`] included.
pub fn apply(data: &Value, store: &mut DataStore) -> Result<SurfaceView, serde_json::Error> {
    let payload = decode_payload(data)?;
    if let Some(update) = &payload.data_model_update {
        let written = store.apply_update(update);
        debug!(written, "applied data model update");
    }

    match (&payload.surface_update, &payload.begin_rendering) {
        (Some(surface), Some(begin)) => {
            let registry = ComponentRegistry::from_entries(&surface.components);
            debug!(
                root = %begin.root,
                components = registry.len(),
                "resolving surface"
            );
            Ok(SurfaceView::Tree(resolver::resolve(
                &begin.root,
                &registry,
                store,
            )))
        }
        _ => serde_json::to_string_pretty(data).map(SurfaceView::Raw),
    }
}

//! State behind the discount settings form.
//!
//! Rendering is left to the host; this module owns what the form loads,
//! edits and persists.

mod form;
mod requests;
mod resources;

use serde::Serialize;
use thiserror::Error;

pub use form::{
    can_toggle_discount_class, toggle_discount_class, AppliesTo, DiscountClass, Percentages,
    SettingsForm,
};
pub use requests::{Commit, RequestId, RequestTracker};
pub use resources::{resolve_collection_products, resolve_products, AdminQuery, ResourceRef};

use crate::config::{METAFIELD_KEY, METAFIELD_NAMESPACE, METAFIELD_TYPE};

/// Errors raised while editing or persisting discount settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The host rejected a change to the discount's classes.
    #[error("discount classes could not be updated")]
    DiscountClassUpdate,

    /// The admin API call itself failed.
    #[error("admin API query failed")]
    Query(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The admin API answered with an unexpected payload.
    #[error("unexpected admin API response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    /// The configuration could not be encoded for the metafield.
    #[error("failed to encode discount configuration: {0}")]
    Encode(serde_json::Error),
}

/// Metafield write sent to the host when the form is saved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldChange {
    #[serde(rename = "type")]
    pub change_type: &'static str,
    pub namespace: &'static str,
    pub key: &'static str,
    pub value: String,
    pub value_type: &'static str,
}

impl MetafieldChange {
    /// An `updateMetafield` change carrying `value` under the configuration key.
    pub fn update(value: String) -> Self {
        Self {
            change_type: "updateMetafield",
            namespace: METAFIELD_NAMESPACE,
            key: METAFIELD_KEY,
            value,
            value_type: METAFIELD_TYPE,
        }
    }
}

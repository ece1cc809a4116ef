//! Store receipt returned by a successful upload

use serde::Deserialize;
use serde_json::Value;

use super::share;

/// How the store satisfied a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// A fresh blob was registered
    NewlyCreated,
    /// Identical bytes were already stored; the existing id is returned
    AlreadyCertified,
}

/// Resolved identifier plus the untouched store response
#[derive(Debug, Clone, PartialEq)]
pub struct BlobReceipt {
    pub blob_id: String,
    pub outcome: StoreOutcome,
    pub raw: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreResponse {
    newly_created: Option<NewlyCreated>,
    already_certified: Option<AlreadyCertified>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewlyCreated {
    blob_object: BlobObject,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobObject {
    blob_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlreadyCertified {
    blob_id: String,
}

impl BlobReceipt {
    /// Resolve the blob id from a store response.
    /// Returns `None` when neither branch carries a non-empty id.
    pub fn from_response(raw: Value) -> Option<Self> {
        let parsed: StoreResponse = serde_json::from_value(raw.clone()).ok()?;

        let (blob_id, outcome) = match (parsed.newly_created, parsed.already_certified) {
            (Some(created), _) => (created.blob_object.blob_id, StoreOutcome::NewlyCreated),
            (None, Some(certified)) => (certified.blob_id, StoreOutcome::AlreadyCertified),
            (None, None) => return None,
        };

        if blob_id.is_empty() {
            return None;
        }

        Some(Self {
            blob_id,
            outcome,
            raw,
        })
    }

    /// Link to the blob on a block explorer
    pub fn explorer_url(&self, explorer_base: &str) -> String {
        share::explorer_link(explorer_base, &self.blob_id)
    }

    /// Raw response, indented for display
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }
}

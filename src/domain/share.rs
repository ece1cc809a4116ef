//! Shareable links
//!
//! A recording is addressed as `<origin>/#<blobId>`. Older links carried the
//! id in a `recording` query parameter, which is still accepted.

use url::Url;

/// Query parameter used by older share links
pub const LEGACY_QUERY_PARAM: &str = "recording";

/// Build the share link for a blob
pub fn share_link(origin: &str, blob_id: &str) -> String {
    format!("{}/#{}", origin.trim_end_matches('/'), blob_id)
}

/// Link to a blob on a block explorer
pub fn explorer_link(explorer_base: &str, blob_id: &str) -> String {
    format!("{}/blob/{}", explorer_base.trim_end_matches('/'), blob_id)
}

/// Extract a blob id from a share link, a `#fragment`, or a bare id
pub fn parse_share_target(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(input) {
        let from_query = url
            .query_pairs()
            .find(|(key, _)| key == LEGACY_QUERY_PARAM)
            .map(|(_, value)| value.into_owned());
        return from_query
            .or_else(|| url.fragment().map(str::to_string))
            .filter(|id| is_blob_id(id));
    }

    let candidate = input.strip_prefix('#').unwrap_or(input);
    is_blob_id(candidate).then(|| candidate.to_string())
}

/// Blob ids are URL-safe base64
fn is_blob_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

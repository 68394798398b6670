//! Location parsing.
//!
//! Every location string entering the resolver is classified exactly once by
//! [`VideoLocation::parse`]; the rest of the crate matches on the variant.

use std::fmt;

const BLOB_PREFIX: &str = "blob:";
const STORE_KEY_PREFIX: &str = "idb://";

/// A classified video location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VideoLocation {
    /// `http://` or `https://` URL, playable as-is
    Remote(String),
    /// Session-scoped `blob:` URL that stops working when the session ends
    LocalBlob(String),
    /// `idb://<key>` reference into the local blob store
    StoreKey { location: String, key: String },
    /// Anything else (data URIs, relative paths); passed through untouched
    Opaque(String),
}

impl VideoLocation {
    /// Classify `location` by prefix. Surrounding whitespace is ignored.
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        let lower = trimmed
            .get(..STORE_KEY_PREFIX.len().max(8))
            .unwrap_or(trimmed)
            .to_ascii_lowercase();

        if lower.starts_with("https://") || lower.starts_with("http://") {
            VideoLocation::Remote(trimmed.to_string())
        } else if lower.starts_with(BLOB_PREFIX) {
            VideoLocation::LocalBlob(trimmed.to_string())
        } else if lower.starts_with(STORE_KEY_PREFIX) {
            let key = trimmed[STORE_KEY_PREFIX.len()..].to_string();
            VideoLocation::StoreKey {
                location: trimmed.to_string(),
                key,
            }
        } else {
            VideoLocation::Opaque(trimmed.to_string())
        }
    }

    /// The original location string.
    pub fn as_str(&self) -> &str {
        match self {
            VideoLocation::Remote(url)
            | VideoLocation::LocalBlob(url)
            | VideoLocation::Opaque(url) => url,
            VideoLocation::StoreKey { location, .. } => location,
        }
    }

    /// Whether the location only works inside the current browsing session.
    pub fn is_session_local(&self) -> bool {
        matches!(self, VideoLocation::LocalBlob(_))
    }

    /// Short label used in logs and failure classification.
    pub fn kind(&self) -> LocationKind {
        match self {
            VideoLocation::Remote(_) => LocationKind::Remote,
            VideoLocation::LocalBlob(_) => LocationKind::LocalBlob,
            VideoLocation::StoreKey { .. } => LocationKind::StoreKey,
            VideoLocation::Opaque(_) => LocationKind::Opaque,
        }
    }
}

impl fmt::Display for VideoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant tag of a [`VideoLocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    Remote,
    LocalBlob,
    StoreKey,
    Opaque,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LocationKind::Remote => "remote",
            LocationKind::LocalBlob => "local_blob",
            LocationKind::StoreKey => "store_key",
            LocationKind::Opaque => "opaque",
        };
        f.write_str(label)
    }
}

/// Returns `true` for URLs that only live as long as the current session.
pub fn is_session_local_url(url: &str) -> bool {
    url.get(..BLOB_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(BLOB_PREFIX))
}

/// Splits `blob:<origin>/<id>` into its origin and identifier.
pub fn blob_parts(url: &str) -> Option<(&str, &str)> {
    let rest = url.get(BLOB_PREFIX.len()..)?;
    let (origin, id) = rest.rsplit_once('/')?;
    if origin.is_empty() {
        return None;
    }
    Some((origin, id))
}

/// Heuristic: does this blob URL belong to a session that has ended?
///
/// A blob URL looks expired when it is malformed, its identifier is shorter
/// than `min_id_len`, or (when `page_origin` is known) it was minted by a
/// different origin.
pub fn blob_looks_expired(url: &str, page_origin: Option<&str>, min_id_len: usize) -> bool {
    let Some((origin, id)) = blob_parts(url) else {
        return true;
    };

    if id.len() < min_id_len {
        return true;
    }

    match page_origin {
        Some(page) => !origin.eq_ignore_ascii_case(page.trim_end_matches('/')),
        None => false,
    }
}

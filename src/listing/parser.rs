use super::xml::{Element, parse_document};
use crate::types::{LastModified, ListingPage, ObjectEntry, S3_XML_NAMESPACE, StorageError};

/// Ways of locating repeated elements in a listing document
///
/// The same endpoint family emits listings both with and without the S3
/// namespace declared, so lookups walk these in order and stop at the first
/// one that matches anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Descendants bound to the S3 namespace
    Namespaced,
    /// Descendants with no prefix and no namespace
    Unqualified,
    /// Direct children of the root, compared by local name only
    LocalName,
}

pub const SEARCH_ORDER: [SearchStrategy; 3] = [
    SearchStrategy::Namespaced,
    SearchStrategy::Unqualified,
    SearchStrategy::LocalName,
];

impl SearchStrategy {
    /// Elements this strategy matches; empty means no match
    pub fn find<'a>(self, root: &'a Element, tag: &str) -> Vec<&'a Element> {
        match self {
            SearchStrategy::Namespaced => root
                .descendants()
                .into_iter()
                .filter(|e| {
                    e.local_name() == tag && e.namespace.as_deref() == Some(S3_XML_NAMESPACE)
                })
                .collect(),
            SearchStrategy::Unqualified => root
                .descendants()
                .into_iter()
                .filter(|e| e.is_unqualified() && e.name == tag)
                .collect(),
            SearchStrategy::LocalName => root
                .children
                .iter()
                .filter(|e| e.local_name() == tag)
                .collect(),
        }
    }
}

/// Apply the strategies in order and return the first non-empty match set
pub fn find_all<'a>(root: &'a Element, tag: &str) -> Vec<&'a Element> {
    for strategy in SEARCH_ORDER {
        let found = strategy.find(root, tag);
        if !found.is_empty() {
            if strategy != SearchStrategy::Namespaced {
                tracing::debug!("Found <{}> elements via {:?} lookup", tag, strategy);
            }
            return found;
        }
    }
    Vec::new()
}

/// First element for a single-valued field such as `IsTruncated`
///
/// Same order as `find_all`, but the last resort searches every descendant
/// by local name since pagination fields are not always root children.
fn find_first<'a>(root: &'a Element, tag: &str) -> Option<&'a Element> {
    find_all(root, tag).into_iter().next().or_else(|| {
        root.descendants()
            .into_iter()
            .find(|e| e.local_name() == tag)
    })
}

/// Decode one page of a ListObjectsV2 response
///
/// Only a document that is not well-formed is an error. Entries without a
/// key are dropped, an absent or non-numeric size counts as 0, and a missing
/// `IsTruncated` means the listing is complete.
pub fn parse_listing(raw: &str) -> Result<ListingPage, StorageError> {
    let root = parse_document(raw)?;

    let entries: Vec<ObjectEntry> = find_all(&root, "Contents")
        .into_iter()
        .filter_map(parse_entry)
        .collect();

    let is_truncated = find_first(&root, "IsTruncated")
        .map(|e| e.text.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let continuation_token = find_first(&root, "NextContinuationToken")
        .map(|e| e.text.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    if entries.is_empty() && root.local_name() != "ListBucketResult" {
        tracing::warn!(
            "Listing response has unexpected root <{}>, treating as empty page",
            root.name
        );
    }

    Ok(ListingPage {
        entries,
        is_truncated,
        continuation_token,
    })
}

fn parse_entry(el: &Element) -> Option<ObjectEntry> {
    // Keys are taken verbatim: whitespace-only keys are legal
    let Some(key) = el
        .child("Key")
        .map(|k| k.text.as_str())
        .filter(|k| !k.is_empty())
    else {
        tracing::debug!("Skipping listing entry without a key");
        return None;
    };

    let size = el
        .child_text("Size")
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);

    let last_modified = el
        .child_text("LastModified")
        .map(|t| LastModified::from_text(t.trim()));

    Some(ObjectEntry {
        key: key.to_string(),
        size,
        last_modified,
    })
}

/// Decode a ListBuckets response into bucket names, in document order
pub fn parse_bucket_names(raw: &str) -> Result<Vec<String>, StorageError> {
    let root = parse_document(raw)?;

    Ok(find_all(&root, "Bucket")
        .into_iter()
        .filter_map(|bucket| bucket.child_text("Name"))
        .map(|name| name.trim().to_string())
        .collect())
}

//! Catalog extraction from a raw meta page.
//!
//! The page embeds one JSON object (the framework's hydration payload) in a
//! script tag. Instead of parsing the whole document we find the marker,
//! delimit the object with a depth-counting pass, and decode only that slice.

use serde::Deserialize;
use serde_json::Value;

use super::CatalogEntry;
use super::error::{ExtractResult, ExtractionError};

/// Marker the hydration payload starts with.
pub const DEFAULT_BLOCK_MARKER: &str = r#"{"props":"#;

/// Where the query results live inside the payload.
const QUERIES_POINTER: &str = "/props/pageProps/dehydratedState/queries";
/// Where a deck list lives inside one query result.
const ENTRY_LIST_POINTER: &str = "/state/data/guideDecks";

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    #[serde(rename = "teamBuilderKey", default)]
    team_builder_key: String,
}

/// Parses raw page content into an ordered catalog.
#[derive(Debug, Clone)]
pub struct CatalogExtractor {
    marker: String,
}

impl Default for CatalogExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_MARKER)
    }
}

impl CatalogExtractor {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Extract the deck catalog, positions assigned in source order.
    pub fn extract(&self, page: &str) -> ExtractResult<Vec<CatalogEntry>> {
        let block = locate_block(page, &self.marker)?;
        let doc: Value = serde_json::from_str(block).map_err(|e| ExtractionError::DecodeFailed {
            message: e.to_string(),
        })?;

        let list = first_entry_list(&doc).ok_or(ExtractionError::EntriesNotFound)?;
        let raw = Vec::<RawEntry>::deserialize(list).map_err(|e| ExtractionError::DecodeFailed {
            message: format!("deck entry: {e}"),
        })?;

        tracing::debug!(entries = raw.len(), block_len = block.len(), "catalog extracted");
        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(position, e)| CatalogEntry::new(e.name, e.team_builder_key, position))
            .collect())
    }
}

/// First query result whose deck list is a non-empty array.
fn first_entry_list(doc: &Value) -> Option<&Value> {
    doc.pointer(QUERIES_POINTER)?
        .as_array()?
        .iter()
        .filter_map(|query| query.pointer(ENTRY_LIST_POINTER))
        .find(|list| list.as_array().is_some_and(|a| !a.is_empty()))
}

/// Delimit the embedded object that starts at `marker`.
///
/// Counts brace depth from the first `{` at or after the marker until it
/// returns to zero. Braces inside JSON string literals (including escaped
/// quotes) are ignored.
pub fn locate_block<'a>(page: &'a str, marker: &str) -> ExtractResult<&'a str> {
    let not_found = || ExtractionError::BlockNotFound {
        marker: marker.to_string(),
    };
    let marker_at = page.find(marker).ok_or_else(not_found)?;
    let start = page[marker_at..]
        .find('{')
        .map(|i| marker_at + i)
        .ok_or_else(not_found)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    // Only ASCII bytes are inspected, so every cut lands on a char boundary.
    for (i, &b) in page.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&page[start..=start + i]);
                }
            }
            _ => {}
        }
    }

    Err(ExtractionError::Unbalanced {
        offset: start,
        depth,
    })
}

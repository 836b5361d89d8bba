//! Deck catalog: the ordered list of recommendable decks for a mode.
//!
//! - [`extract`] turns a raw meta page into catalog entries
//! - [`fetch`] retrieves raw pages (`ureq` in production, in-memory in tests)
//! - [`source`] ties both together per mode, with a TTL cache and its sweeper

pub mod error;
pub mod extract;
pub mod fetch;
pub mod source;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use error::{CatalogError, CatalogResult, ExtractionError, FetchError};
pub use extract::CatalogExtractor;
pub use fetch::{ContentFetcher, HttpFetcher, StaticFetcher};
pub use source::{CacheSweeper, CatalogCache, CatalogSource};

/// One deck as listed by the source, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    /// Opaque key used to build the deck's external reference link.
    pub reference_key: String,
    /// Zero-based index in the order the source returned.
    pub position: usize,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, reference_key: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            reference_key: reference_key.into(),
            position,
        }
    }

    pub fn display_id(&self) -> DisplayId {
        DisplayId::from_position(self.position)
    }
}

/// One-based identifier used to address a catalog entry in rendered options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DisplayId(usize);

impl DisplayId {
    pub fn from_position(position: usize) -> Self {
        Self(position + 1)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DisplayId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_id_is_one_based() {
        let entry = CatalogEntry::new("Y", "k-y", 1);
        assert_eq!(entry.display_id().get(), 2);
        assert_eq!(entry.display_id().to_string(), "2");
    }

    #[test]
    fn display_id_parses_from_payload_text() {
        let id: DisplayId = "7".parse().unwrap();
        assert_eq!(id, DisplayId::from_position(6));
        assert!("x7".parse::<DisplayId>().is_err());
    }
}

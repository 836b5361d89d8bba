//! Recommendation selection: which catalog entries to offer this cycle.
//!
//! Entries whose name starts with the priority marker are always surfaced
//! (every uncompleted one, newest listing position first). Of the remaining
//! plain entries only one is offered per cycle: the highest-position one that
//! is not completed yet. Completion is matched by exact name, no normalisation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogEntry, DisplayId};

/// Leading character that marks a priority deck name.
pub const DEFAULT_PRIORITY_MARKER: char = '[';

/// Which class of deck an offer group carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferKind {
    Ordinary,
    Priority,
}

impl OfferKind {
    /// Title of the rendered option set.
    pub fn title(self) -> &'static str {
        match self {
            Self::Ordinary => "Ordinary deck",
            Self::Priority => "Priority decks",
        }
    }
}

/// One offered deck, addressed by its display id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub display_id: DisplayId,
    pub name: String,
}

impl Offer {
    fn from_entry(entry: &CatalogEntry) -> Self {
        Self {
            display_id: entry.display_id(),
            name: entry.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferGroup {
    pub kind: OfferKind,
    pub entries: Vec<Offer>,
}

/// Computes offer groups from a catalog and the completed-name set.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationSelector {
    marker: char,
}

impl Default for RecommendationSelector {
    fn default() -> Self {
        Self::new(DEFAULT_PRIORITY_MARKER)
    }
}

impl RecommendationSelector {
    pub fn new(marker: char) -> Self {
        Self { marker }
    }

    pub fn marker(&self) -> char {
        self.marker
    }

    pub fn is_priority(&self, name: &str) -> bool {
        name.starts_with(self.marker)
    }

    /// Offer groups for this cycle: `Ordinary` (at most one entry) first, then
    /// `Priority`. Empty groups are left out, so an empty result means there
    /// is nothing left to recommend.
    pub fn select(&self, catalog: &[CatalogEntry], completed: &HashSet<String>) -> Vec<OfferGroup> {
        let mut by_position: Vec<&CatalogEntry> = catalog.iter().collect();
        by_position.sort_by(|a, b| b.position.cmp(&a.position));

        let (special, plain): (Vec<&CatalogEntry>, Vec<&CatalogEntry>) = by_position
            .into_iter()
            .filter(|e| !completed.contains(&e.name))
            .partition(|e| self.is_priority(&e.name));

        let mut groups = Vec::with_capacity(2);
        if let Some(first) = plain.first() {
            groups.push(OfferGroup {
                kind: OfferKind::Ordinary,
                entries: vec![Offer::from_entry(first)],
            });
        }
        if !special.is_empty() {
            groups.push(OfferGroup {
                kind: OfferKind::Priority,
                entries: special.into_iter().map(Offer::from_entry).collect(),
            });
        }
        groups
    }
}

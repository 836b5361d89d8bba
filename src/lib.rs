// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # deck-scout
//!
//! Recommends the next deck to play from a ranked meta catalog, skipping the
//! ones already completed, through a button-driven chat flow.
//!
//! ## Architecture
//!
//! - **Catalog** (`catalog`): fetches the meta page (`ureq`), extracts the
//!   embedded deck list and caches it per mode with a background sweeper
//! - **Selection** (`recommend`): one ordinary deck plus every open priority deck
//! - **Session** (`session`): display id → deck name for live buttons
//! - **Storage** (`store`): completed decks and the active mode (redb or memory)
//! - **Channels** (`channel`): Telegram Bot API, console, in-memory
//! - **Controller** (`controller`): the offer → select → confirm/restore flow
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use deck_scout::catalog::source::SourceUrls;
//! use deck_scout::catalog::{CatalogExtractor, CatalogSource, HttpFetcher};
//! use deck_scout::channel::ConsoleChannel;
//! use deck_scout::controller::InteractionController;
//! use deck_scout::recommend::RecommendationSelector;
//! use deck_scout::store::MemStore;
//!
//! let source = CatalogSource::new(
//!     Box::new(HttpFetcher::default()),
//!     CatalogExtractor::default(),
//!     SourceUrls::default(),
//! );
//! let mut controller = InteractionController::new(
//!     Arc::new(MemStore::new()),
//!     source,
//!     Box::new(ConsoleChannel::stdio()),
//!     RecommendationSelector::default(),
//! );
//! controller.run().unwrap();
//! ```

pub mod catalog;
pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod mode;
pub mod paths;
pub mod recommend;
pub mod session;
pub mod store;

//! Rich diagnostic error types for deck-scout.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. `ScoutError` composes them so callers can
//! use `?` across subsystem boundaries without losing the diagnostic chain.

use miette::Diagnostic;
use thiserror::Error;

use crate::catalog::error::{CatalogError, ExtractionError, FetchError};
use crate::channel::ChannelError;
use crate::config::ConfigError;
use crate::paths::PathError;
use crate::session::SessionError;

/// Top-level error type for deck-scout.
#[derive(Debug, Error, Diagnostic)]
pub enum ScoutError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),
}

impl From<FetchError> for ScoutError {
    fn from(e: FetchError) -> Self {
        Self::Catalog(CatalogError::Fetch(e))
    }
}

impl From<ExtractionError> for ScoutError {
    fn from(e: ExtractionError) -> Self {
        Self::Catalog(CatalogError::Extraction(e))
    }
}

/// Convenience alias used by the controller and the binary.
pub type ScoutResult<T> = std::result::Result<T, ScoutError>;

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(scout::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(scout::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             If it keeps happening, move the database file aside and start fresh; \
             only the completed-deck list and the mode are stored there."
        )
    )]
    Redb { message: String },

    #[error("corrupt setting \"{key}\": {value}")]
    #[diagnostic(
        code(scout::store::corrupt_setting),
        help("The stored value is not recognised. Set it again, e.g. with `deck-scout mode --switch`.")
    )]
    CorruptSetting { key: String, value: String },
}

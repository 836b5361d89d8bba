//! Catalog subsystem error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

/// Failures while retrieving a raw page.
#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("invalid URL \"{url}\"")]
    #[diagnostic(
        code(scout::fetch::invalid_url),
        help("Source URLs must start with http:// or https://. Check the [source] section of the config.")
    )]
    InvalidUrl { url: String },

    #[error("transport error fetching \"{url}\": {message}")]
    #[diagnostic(
        code(scout::fetch::transport),
        help("The source could not be reached. Check network connectivity, or raise [fetch] retries.")
    )]
    Transport { url: String, message: String },

    #[error("HTTP {code} from \"{url}\"")]
    #[diagnostic(
        code(scout::fetch::status),
        help("The source answered with a non-success status. It may be rate limiting or down.")
    )]
    Status { url: String, code: u16 },

    #[error("failed to read body from \"{url}\": {message}")]
    #[diagnostic(
        code(scout::fetch::body),
        help("The response body was truncated or not valid UTF-8.")
    )]
    Body { url: String, message: String },

    #[error("no page registered for \"{url}\"")]
    #[diagnostic(
        code(scout::fetch::static_missing),
        help("The in-memory fetcher only serves pages that were added with `with_page`.")
    )]
    NotServed { url: String },
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Failures while pulling the embedded catalog out of a page.
#[derive(Debug, Error, Diagnostic)]
pub enum ExtractionError {
    #[error("no embedded data block starting with {marker:?}")]
    #[diagnostic(
        code(scout::extract::not_found),
        help(
            "The page did not contain the embedded data marker. The source may have \
             changed its page layout; check [source] block_marker."
        )
    )]
    BlockNotFound { marker: String },

    #[error("unbalanced braces in embedded data block at offset {offset} (depth {depth} at end of input)")]
    #[diagnostic(
        code(scout::extract::unbalanced),
        help("The embedded block never closes. The page was probably truncated in transit.")
    )]
    Unbalanced { offset: usize, depth: usize },

    #[error("failed to decode embedded data block: {message}")]
    #[diagnostic(
        code(scout::extract::decode_failed),
        help("The delimited block is not valid JSON or an entry has an unexpected shape.")
    )]
    DecodeFailed { message: String },

    #[error("no query result carries a non-empty deck list")]
    #[diagnostic(
        code(scout::extract::entries_not_found),
        help("The data block was found but holds no decks. The source may be between patches.")
    )]
    EntriesNotFound,
}

pub type ExtractResult<T> = std::result::Result<T, ExtractionError>;

/// Errors from the per-mode catalog source.
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("deck \"{name}\" is not in the current {mode} catalog")]
    #[diagnostic(
        code(scout::catalog::unknown_entry),
        help("The deck dropped out of the source listing. Run /update for a fresh list.")
    )]
    UnknownEntry { name: String, mode: String },
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

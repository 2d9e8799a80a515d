//! Error types for edge operations.
//!
//! [`EdgeError`] wraps the error of every stage so that callers driving a
//! whole resolution can propagate with `?`.

use std::io;

use thiserror::Error;

use edgecreator_core::publication::InvalidPublicationCode;

use crate::{document::DocumentError, fetch::FetchError, resolver::ResolveError, sync::SyncError};

/// The main error type for edge operations.
#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Publication(#[from] InvalidPublicationCode),

    #[error("no issue to load")]
    EmptySession,

    #[error("Configuration error: {0}")]
    Config(String),
}

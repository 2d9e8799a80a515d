//! Collaborators consulted while resolving models.
//!
//! The resolver never touches storage directly: documents, legacy records and
//! image sizes come through the traits below, and per-step problems are
//! reported to a [`WarningSink`]. [`crate::store::FileStore`] implements the
//! fetchers over a directory tree; tests use in-memory fakes.

use std::cell::RefCell;

use indexmap::IndexMap;
use log::warn;
use thiserror::Error;

use edgecreator_core::publication::IssueSelector;
use edgecreator_legacy::record::{LegacyContribution, LegacyEdge, LegacyStep, ModelId};

pub use edgecreator_legacy::asset::{AssetError, AssetSizeLookup, ImageSize, NoAssets};

use crate::document::ParsedDocument;

/// Failure of a collaborator lookup.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

/// Source of serialized edge documents.
pub trait DocumentFetcher {
    /// Fetch the document of `selector`, published or current.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] when the issue has no such document.
    fn fetch(&self, selector: &IssueSelector, published: bool)
    -> Result<ParsedDocument, FetchError>;
}

/// Steps of several legacy models, keyed by model id.
pub type LegacyStepsById = IndexMap<ModelId, Vec<LegacyStep>>;

/// Source of legacy edge records.
pub trait LegacyRecordFetcher {
    /// Returns the legacy model of `selector`, if one exists.
    fn fetch_record(&self, selector: &IssueSelector) -> Result<Option<LegacyEdge>, FetchError>;

    /// Returns the steps of every model in `model_ids`.
    ///
    /// Callers bound the number of ids per call; see [`crate::batch::chunked`].
    fn fetch_steps(&self, model_ids: &[ModelId]) -> Result<LegacyStepsById, FetchError>;

    fn fetch_contributors(&self, model_id: ModelId) -> Result<Vec<LegacyContribution>, FetchError>;

    /// Returns the file name of the photo the model was drawn from.
    fn fetch_main_photo(&self, model_id: ModelId) -> Result<Option<String>, FetchError>;
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    message: String,
    step_number: Option<i64>,
}

impl Warning {
    pub fn new(message: impl Into<String>, step_number: Option<i64>) -> Self {
        Self {
            message: message.into(),
            step_number,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Original step number of the step the warning is about, if any.
    pub fn step_number(&self) -> Option<i64> {
        self.step_number
    }
}

/// Receiver of non-fatal problems found while resolving a model.
pub trait WarningSink {
    fn report(&self, message: &str, step_number: Option<i64>);
}

/// A sink that keeps every warning for later display.
#[derive(Debug, Default)]
pub struct Warnings {
    entries: RefCell<Vec<Warning>>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Returns a snapshot of the collected warnings.
    pub fn entries(&self) -> Vec<Warning> {
        self.entries.borrow().clone()
    }

    /// Dismisses the warning at `index`.
    pub fn remove(&self, index: usize) -> Option<Warning> {
        let mut entries = self.entries.borrow_mut();
        (index < entries.len()).then(|| entries.remove(index))
    }

    /// Drains every collected warning.
    pub fn take(&self) -> Vec<Warning> {
        self.entries.take()
    }
}

impl WarningSink for Warnings {
    fn report(&self, message: &str, step_number: Option<i64>) {
        self.entries
            .borrow_mut()
            .push(Warning::new(message, step_number));
    }
}

/// A sink that forwards warnings to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWarnings;

impl WarningSink for LogWarnings {
    fn report(&self, message: &str, step_number: Option<i64>) {
        match step_number {
            Some(step_number) => warn!(step_number; "{message}"),
            None => warn!("{message}"),
        }
    }
}

impl<T: WarningSink + ?Sized> WarningSink for &T {
    fn report(&self, message: &str, step_number: Option<i64>) {
        (**self).report(message, step_number);
    }
}

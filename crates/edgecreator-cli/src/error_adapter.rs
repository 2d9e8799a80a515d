//! Error adapter for converting EdgeError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.
//!
//! # Multi-Error Support
//!
//! Step warnings collected while resolving are rendered as one report each,
//! after the error that stopped the run.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, Severity};

use edgecreator::{
    EdgeError,
    fetch::{FetchError, Warning},
    resolver::ResolveError,
    sync::SyncError,
};

/// Adapter for a [`EdgeError`].
pub struct ErrorAdapter<'a>(pub &'a EdgeError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            EdgeError::Io(_) => "edgecreator::io",
            EdgeError::Resolve(_) => "edgecreator::resolve",
            EdgeError::Sync(_) => "edgecreator::sync",
            EdgeError::Fetch(_) => "edgecreator::fetch",
            EdgeError::Document(_) => "edgecreator::document",
            EdgeError::Publication(_) => "edgecreator::publication",
            EdgeError::EmptySession => "edgecreator::session",
            EdgeError::Config(_) => "edgecreator::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            EdgeError::Resolve(ResolveError::NoModelFound(_)) => {
                "no current document, published document or legacy model exists for this issue"
            }
            EdgeError::Sync(SyncError::InconsistentSteps { .. }) => {
                "issues edited together must have the same components in the same order"
            }
            EdgeError::Sync(SyncError::UnknownIssue(_)) => {
                "the first issue must be listed by the publication's legacy file or documents"
            }
            EdgeError::Fetch(FetchError::Backend(_)) => "check that the store is readable",
            _ => return None,
        };
        Some(Box::new(help))
    }
}

/// Adapter for a step [`Warning`] reported while resolving.
pub struct WarningAdapter<'a>(pub &'a Warning);

impl fmt::Debug for WarningAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for WarningAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.step_number() {
            Some(step) => write!(f, "step {step}: {}", self.0.message()),
            None => f.write_str(self.0.message()),
        }
    }
}

impl std::error::Error for WarningAdapter<'_> {}

impl MietteDiagnostic for WarningAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("edgecreator::step"))
    }

    fn severity(&self) -> Option<Severity> {
        Some(Severity::Warning)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// A reportable problem that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// The error that stopped the run.
    Error(ErrorAdapter<'a>),
    /// A step dropped while resolving.
    Warning(WarningAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Error(e) => fmt::Display::fmt(e, f),
            Reportable::Warning(w) => fmt::Display::fmt(w, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Error(e) => e.source(),
            Reportable::Warning(_) => None,
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Error(e) => e.code(),
            Reportable::Warning(w) => w.code(),
        }
    }

    fn severity(&self) -> Option<Severity> {
        match self {
            Reportable::Error(e) => e.severity(),
            Reportable::Warning(w) => w.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Error(e) => e.help(),
            Reportable::Warning(w) => w.help(),
        }
    }
}

/// Convert an [`EdgeError`] into a list of reportable problems.
pub fn to_reportables(err: &EdgeError) -> Vec<Reportable<'_>> {
    vec![Reportable::Error(ErrorAdapter(err))]
}

/// Convert step warnings into reportable problems, in report order.
pub fn warnings_to_reportables(warnings: &[Warning]) -> Vec<Reportable<'_>> {
    warnings
        .iter()
        .map(|warning| Reportable::Warning(WarningAdapter(warning)))
        .collect()
}

//! CLI logic for the edgecreator tool.
//!
//! This module resolves the edge models of a selection of issues from a
//! filesystem store and exports them as current documents.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::{fs, path::Path};

use log::{info, warn};

use edgecreator::{
    EdgeCreator, EdgeError,
    context::SessionContext,
    fetch::{Warning, Warnings},
    publication::{IssueSelector, PublicationCode},
    store::FileStore,
};

/// Run the edgecreator CLI application
///
/// This function resolves the selected issues, checks that their step
/// sequences agree, and writes one current document per issue into the
/// output directory. Returns the step warnings reported while resolving.
///
/// # Errors
///
/// Returns `EdgeError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - An unknown first issue or a malformed publication code
/// - Selections where no issue has a model
/// - Issues whose models have different components
pub fn run(args: &Args) -> Result<Vec<Warning>, EdgeError> {
    info!(
        store = args.store,
        publication = args.publication,
        issue = args.issue;
        "Processing selection"
    );

    let app_config = config::load_config(args.config.as_ref())?;

    let store = FileStore::new(&args.store);
    let publication: PublicationCode = args.publication.parse()?;
    let publication_issues = store.publication_issues(&publication)?;
    let mut context = SessionContext::select_issues(
        &publication,
        &publication_issues,
        &args.issue,
        args.to.as_deref(),
        &args.also,
    )?;

    let creator = EdgeCreator::new(app_config);
    let warnings = Warnings::new();
    let session = creator.load_session(&store, &mut context, &warnings)?;

    let output = Path::new(&args.output);
    fs::create_dir_all(output)?;
    for issue in context.issues() {
        if let Some(document) = creator.export(&session, issue) {
            write_document(output, issue, &document)?;
        }
    }

    if args.surrounding {
        let surrounding =
            creator.resolve_surrounding(&store, &context, &publication_issues, &warnings);
        for (issue, result) in surrounding {
            match result {
                Ok(model) => write_document(output, &issue, &creator.export_model(&model))?,
                Err(err) => warn!(issue = issue.to_string(), err:% = err; "Skipping surrounding issue"),
            }
        }
    }

    info!(output_dir = args.output, issues = context.issues().len(); "Documents exported successfully");

    Ok(warnings.take())
}

/// Write `document` under the current-document name of `issue`.
fn write_document(output: &Path, issue: &IssueSelector, document: &str) -> Result<(), EdgeError> {
    let path = output.join(format!("_{}.{}.svg", issue.magazine(), issue.issue_number()));
    fs::write(&path, document)?;
    info!(path = path.display().to_string(); "Document written");
    Ok(())
}

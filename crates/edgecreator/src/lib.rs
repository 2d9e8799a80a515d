//! Edgecreator - Resolution and synchronized editing of magazine edge models.
//!
//! An edge model is the ordered list of drawing steps that renders the spine
//! of a magazine issue. Models come from the current document of an issue,
//! its published document, or a legacy record whose options are normalized
//! on the fly. Issues edited together keep structurally identical step
//! sequences through [`sync::StepSyncManager`].

pub mod batch;
pub mod config;
pub mod context;
pub mod document;
pub mod fetch;
pub mod metadata;
pub mod resolver;
pub mod store;
pub mod sync;

mod error;

pub use edgecreator_core::{component, dimensions, publication, step};

pub use error::EdgeError;

use indexmap::IndexMap;
use log::{debug, info, warn};

use config::AppConfig;
use context::{SURROUNDING_ISSUES, SessionContext};
use document::write_document;
use fetch::{AssetSizeLookup, DocumentFetcher, LegacyRecordFetcher, WarningSink};
use metadata::EdgeMetadata;
use publication::IssueSelector;
use resolver::{EdgeModel, ModelResolver, ModelSource, ResolveError};
use sync::StepSyncManager;

/// Every collaborator needed to resolve models.
pub trait ModelStore: DocumentFetcher + LegacyRecordFetcher + AssetSizeLookup {}

impl<T: DocumentFetcher + LegacyRecordFetcher + AssetSizeLookup> ModelStore for T {}

/// Models of an editing session, installed in a step manager.
#[derive(Debug)]
pub struct LoadedSession {
    steps: StepSyncManager,
    sources: IndexMap<IssueSelector, ModelSource>,
    primary: Option<IssueSelector>,
    metadata: EdgeMetadata,
}

impl LoadedSession {
    pub fn steps(&self) -> &StepSyncManager {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut StepSyncManager {
        &mut self.steps
    }

    /// Where the model of `issue` was found.
    pub fn source(&self, issue: &IssueSelector) -> Option<ModelSource> {
        self.sources.get(issue).copied()
    }

    /// The primary issue, if its model was found.
    pub fn primary(&self) -> Option<&IssueSelector> {
        self.primary.as_ref()
    }

    /// Contributors and photos of the primary issue.
    pub fn metadata(&self) -> &EdgeMetadata {
        &self.metadata
    }
}

/// Entry point for loading, editing and exporting edge models.
///
/// # Examples
///
/// ```rust,no_run
/// use edgecreator::{EdgeCreator, config::AppConfig, context::SessionContext};
/// use edgecreator::{fetch::LogWarnings, publication::{IssueSelector, PublicationCode}, store::FileStore};
///
/// let store = FileStore::new("/srv/edges");
/// let issue = IssueSelector::new(PublicationCode::new("fr", "DDD"), "1");
/// let mut context = SessionContext::new(vec![issue.clone()]);
///
/// let creator = EdgeCreator::new(AppConfig::default());
/// let session = creator
///     .load_session(&store, &mut context, &LogWarnings)
///     .expect("Failed to load");
/// let svg = creator.export(&session, &issue);
/// ```
#[derive(Debug, Default)]
pub struct EdgeCreator {
    config: AppConfig,
}

impl EdgeCreator {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Create a resolver over `store`.
    pub fn resolver<'a, S: ModelStore>(
        &self,
        store: &'a S,
        warnings: &'a dyn WarningSink,
    ) -> ModelResolver<'a> {
        ModelResolver::new(
            self.config.resolver().clone(),
            self.config.render_catalog(),
            store,
            store,
            store,
            warnings,
        )
    }

    /// Resolve every issue of `context` and install their models.
    ///
    /// The first issue of the session is the primary one: its contributors
    /// and photos are gathered. Issues without a model are dropped from the
    /// session with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::EmptySession`] when the session has no issue,
    /// [`EdgeError::Resolve`] when none of its issues has a model, and
    /// [`EdgeError::Sync`] when two models have different components.
    pub fn load_session<S: ModelStore>(
        &self,
        store: &S,
        context: &mut SessionContext,
        warnings: &dyn WarningSink,
    ) -> Result<LoadedSession, EdgeError> {
        let primary = context.issues().first().cloned();
        let resolver = self.resolver(store, warnings);
        let results = resolver.resolve_all(context.issues(), primary.as_ref());

        let mut steps = StepSyncManager::new();
        let mut sources = IndexMap::new();
        let mut metadata = EdgeMetadata::default();
        let mut first_error = None;
        for (issue, result) in results {
            let model = match result {
                Ok(model) => model,
                Err(err) => {
                    warn!(issue = issue.to_string(), err:% = err; "Dropping issue without model");
                    steps.release_issue(context, &issue);
                    first_error.get_or_insert(err);
                    continue;
                }
            };
            sources.insert(issue.clone(), model.source());
            let (dimensions, sequence, model_metadata) = model.into_parts();
            if let Some(model_metadata) = model_metadata {
                metadata = model_metadata;
            }
            steps.set_dimensions(context, Some(&issue), dimensions);
            steps.set_steps(context, &issue, sequence)?;
        }

        if sources.is_empty() {
            return Err(first_error.map_or(EdgeError::EmptySession, EdgeError::from));
        }
        steps.flush()?;
        info!(issues = sources.len(); "Session loaded");
        let primary = primary.filter(|issue| sources.contains_key(issue));
        Ok(LoadedSession {
            steps,
            sources,
            primary,
            metadata,
        })
    }

    /// Resolve the issues around the session, without their metadata.
    pub fn resolve_surrounding<S: ModelStore>(
        &self,
        store: &S,
        context: &SessionContext,
        publication_issues: &[String],
        warnings: &dyn WarningSink,
    ) -> IndexMap<IssueSelector, Result<EdgeModel, ResolveError>> {
        let (before, after) = context.surrounding_issues(publication_issues, SURROUNDING_ISSUES);
        debug!(before = before.len(), after = after.len(); "Resolving surrounding issues");
        let issues: Vec<_> = before.into_iter().chain(after).collect();
        self.resolver(store, warnings).resolve_all(&issues, None)
    }

    /// Serialize the installed model of `issue` into a current document.
    ///
    /// Metadata is written for the primary issue only. Returns `None` when
    /// `issue` has no installed model.
    pub fn export(&self, session: &LoadedSession, issue: &IssueSelector) -> Option<String> {
        let steps = session.steps.steps(issue)?;
        let dimensions = session
            .steps
            .dimensions(issue)
            .unwrap_or_else(|| self.config.resolver().default_dimensions());
        let metadata = if session.primary.as_ref() == Some(issue) {
            session.metadata.clone()
        } else {
            EdgeMetadata::default()
        };
        Some(write_document(
            dimensions,
            steps,
            &metadata,
            self.config.resolver().unit_factor(),
        ))
    }

    /// Serialize a resolved model into a current document.
    pub fn export_model(&self, model: &EdgeModel) -> String {
        let metadata = model.metadata().cloned().unwrap_or_default();
        write_document(
            model.dimensions(),
            model.steps(),
            &metadata,
            self.config.resolver().unit_factor(),
        )
    }
}

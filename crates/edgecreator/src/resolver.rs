//! Model resolution.
//!
//! An issue's model can come from three places, tried in a fixed order:
//!
//! 1. its current (unpublished) document,
//! 2. its published document,
//! 3. its legacy record, normalized step by step,
//! 4. its published document again, as a last resort.
//!
//! The order is an explicit state machine: [`ResolveState::next`] maps the
//! outcome of one attempt to the next state, and [`ModelResolver`] only runs
//! the attempt each state names.

use std::{cell::RefCell, collections::HashSet};

use indexmap::IndexMap;
use log::{debug, info, trace, warn};
use thiserror::Error;

use edgecreator_core::{
    dimensions::Dimensions,
    publication::IssueSelector,
    step::{Step, StepSequence},
};
use edgecreator_legacy::{
    catalog::RenderCatalog,
    normalize::{IssueContext, LegacyNormalizer},
    record::{LegacyStep, ModelId, dimensions_from_steps},
};

use crate::{
    batch::chunked,
    config::ResolverConfig,
    document::DocumentStatus,
    fetch::{AssetSizeLookup, DocumentFetcher, FetchError, LegacyRecordFetcher, WarningSink},
    metadata::EdgeMetadata,
};

/// Errors raised by [`ModelResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no model found for {0}")]
    NoModelFound(IssueSelector),

    #[error("resolution of {0} is already in progress")]
    ResolutionInProgress(IssueSelector),
}

/// Where a resolved model came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSource {
    CurrentDocument,
    PublishedDocument,
    LegacyRecord,
}

impl From<DocumentStatus> for ModelSource {
    fn from(status: DocumentStatus) -> Self {
        match status {
            DocumentStatus::Current => Self::CurrentDocument,
            DocumentStatus::Published => Self::PublishedDocument,
        }
    }
}

/// The resolved model of one issue.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeModel {
    dimensions: Dimensions,
    steps: StepSequence,
    source: ModelSource,
    metadata: Option<EdgeMetadata>,
}

impl EdgeModel {
    pub fn new(
        dimensions: Dimensions,
        steps: StepSequence,
        source: ModelSource,
        metadata: Option<EdgeMetadata>,
    ) -> Self {
        Self {
            dimensions,
            steps,
            source,
            metadata,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn source(&self) -> ModelSource {
        self.source
    }

    /// Contributors and photos; only gathered for the primary issue.
    pub fn metadata(&self) -> Option<&EdgeMetadata> {
        self.metadata.as_ref()
    }

    pub fn into_parts(self) -> (Dimensions, StepSequence, Option<EdgeMetadata>) {
        (self.dimensions, self.steps, self.metadata)
    }
}

/// States of the resolution of one issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    TryCurrentDoc,
    TryPublishedDoc,
    TryLegacyRecord,
    TryPublishedDocFinal,
    Done,
    Failed,
}

/// Result of the attempt made in a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Found,
    Missing,
}

impl ResolveState {
    /// Transition table of the resolver.
    pub fn next(self, outcome: Outcome) -> Self {
        use Outcome::*;
        use ResolveState::*;

        match (self, outcome) {
            (TryCurrentDoc | TryPublishedDoc | TryLegacyRecord | TryPublishedDocFinal, Found) => {
                Done
            }
            (TryCurrentDoc, Missing) => TryPublishedDoc,
            (TryPublishedDoc, Missing) => TryLegacyRecord,
            (TryLegacyRecord, Missing) => TryPublishedDocFinal,
            (TryPublishedDocFinal, Missing) => Failed,
            (Done, _) => Done,
            (Failed, _) => Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Issues currently being resolved.
#[derive(Debug, Default)]
pub struct InFlight {
    issues: RefCell<HashSet<IssueSelector>>,
}

impl InFlight {
    /// Marks `issue` as being resolved until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ResolutionInProgress`] if `issue` is already
    /// being resolved.
    pub fn begin(&self, issue: &IssueSelector) -> Result<InFlightGuard<'_>, ResolveError> {
        if !self.issues.borrow_mut().insert(issue.clone()) {
            return Err(ResolveError::ResolutionInProgress(issue.clone()));
        }
        Ok(InFlightGuard {
            registry: self,
            issue: issue.clone(),
        })
    }

    pub fn contains(&self, issue: &IssueSelector) -> bool {
        self.issues.borrow().contains(issue)
    }
}

/// Releases an in-flight issue on drop.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    registry: &'a InFlight,
    issue: IssueSelector,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.issues.borrow_mut().remove(&self.issue);
    }
}

/// Resolves issue models through the document and legacy fallback chain.
pub struct ModelResolver<'a> {
    config: ResolverConfig,
    catalog: RenderCatalog,
    documents: &'a dyn DocumentFetcher,
    records: &'a dyn LegacyRecordFetcher,
    assets: &'a dyn AssetSizeLookup,
    warnings: &'a dyn WarningSink,
    in_flight: InFlight,
}

impl<'a> ModelResolver<'a> {
    /// Create a resolver over the given collaborators.
    ///
    /// # Arguments
    ///
    /// * `config` - Batch size, default canvas and unit factor.
    /// * `catalog` - Legacy function names and their components.
    /// * `documents` - Source of current and published documents.
    /// * `records` - Source of legacy records.
    /// * `assets` - Image sizes for legacy image steps.
    /// * `warnings` - Receiver of dropped-step reports.
    pub fn new(
        config: ResolverConfig,
        catalog: RenderCatalog,
        documents: &'a dyn DocumentFetcher,
        records: &'a dyn LegacyRecordFetcher,
        assets: &'a dyn AssetSizeLookup,
        warnings: &'a dyn WarningSink,
    ) -> Self {
        Self {
            config,
            catalog,
            documents,
            records,
            assets,
            warnings,
            in_flight: InFlight::default(),
        }
    }

    /// Resolve the model of `issue`.
    ///
    /// Contributors and photos are gathered only when `primary` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NoModelFound`] when every source is exhausted
    /// and [`ResolveError::ResolutionInProgress`] when `issue` is already
    /// being resolved.
    pub fn resolve(&self, issue: &IssueSelector, primary: bool) -> Result<EdgeModel, ResolveError> {
        let _guard = self.in_flight.begin(issue)?;
        info!(issue = issue.to_string(), primary; "Resolving model");

        let mut state = ResolveState::TryCurrentDoc;
        let mut resolved = None;
        while !state.is_terminal() {
            resolved = self.attempt(state, issue, primary);
            let outcome = if resolved.is_some() {
                Outcome::Found
            } else {
                Outcome::Missing
            };
            let next = state.next(outcome);
            trace!(issue = issue.to_string(), state:? = state, next:? = next; "Resolver transition");
            state = next;
        }

        match (state, resolved) {
            (ResolveState::Done, Some(model)) => {
                debug!(
                    issue = issue.to_string(),
                    source:? = model.source(),
                    steps = model.steps().len();
                    "Model resolved"
                );
                Ok(model)
            }
            _ => Err(ResolveError::NoModelFound(issue.clone())),
        }
    }

    /// Resolve every issue of `issues`, independently.
    ///
    /// Only `primary`, when given, gets its metadata gathered. A failure for
    /// one issue does not affect the others.
    pub fn resolve_all(
        &self,
        issues: &[IssueSelector],
        primary: Option<&IssueSelector>,
    ) -> IndexMap<IssueSelector, Result<EdgeModel, ResolveError>> {
        issues
            .iter()
            .map(|issue| {
                let result = self.resolve(issue, primary == Some(issue));
                (issue.clone(), result)
            })
            .collect()
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    fn attempt(&self, state: ResolveState, issue: &IssueSelector, primary: bool) -> Option<EdgeModel> {
        match state {
            ResolveState::TryCurrentDoc => self.try_document(issue, DocumentStatus::Current, primary),
            ResolveState::TryPublishedDoc => {
                self.try_document(issue, DocumentStatus::Published, primary)
            }
            ResolveState::TryLegacyRecord => self.try_legacy_record(issue, primary),
            ResolveState::TryPublishedDocFinal => {
                self.try_document(issue, DocumentStatus::Published, false)
            }
            ResolveState::Done | ResolveState::Failed => None,
        }
    }

    fn try_document(
        &self,
        issue: &IssueSelector,
        status: DocumentStatus,
        with_metadata: bool,
    ) -> Option<EdgeModel> {
        let document = match self.documents.fetch(issue, status.is_published()) {
            Ok(document) => document,
            Err(err) => {
                log_fetch_failure(issue, "document", &err);
                return None;
            }
        };

        Some(EdgeModel::new(
            document.dimensions(self.config.unit_factor()),
            document.steps(self.warnings),
            document.status().into(),
            with_metadata.then(|| document.metadata()),
        ))
    }

    fn try_legacy_record(&self, issue: &IssueSelector, with_metadata: bool) -> Option<EdgeModel> {
        let record = match self.records.fetch_record(issue) {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(issue = issue.to_string(); "No legacy record");
                return None;
            }
            Err(err) => {
                log_fetch_failure(issue, "legacy record", &err);
                return None;
            }
        };

        let mut legacy_steps = match self.fetch_legacy_steps(record.id) {
            Ok(steps) => steps,
            Err(err) => {
                log_fetch_failure(issue, "legacy steps", &err);
                return None;
            }
        };
        legacy_steps.sort_by_key(|step| step.step_number);

        let dimensions = dimensions_from_steps(&legacy_steps, self.config.default_dimensions());
        let normalizer = LegacyNormalizer::new(self.assets);
        let steps = legacy_steps
            .iter()
            .filter(|step| !step.is_dimensions())
            .filter_map(|step| self.normalize_step(&normalizer, step, dimensions, issue))
            .collect();

        let metadata = with_metadata.then(|| self.legacy_metadata(issue, record.id));
        Some(EdgeModel::new(
            dimensions,
            steps,
            ModelSource::LegacyRecord,
            metadata,
        ))
    }

    fn fetch_legacy_steps(&self, model_id: ModelId) -> Result<Vec<LegacyStep>, FetchError> {
        let mut steps_by_id = chunked(&[model_id], self.config.step_chunk_size(), |ids| {
            self.records.fetch_steps(ids)
        })?;
        Ok(steps_by_id.swap_remove(&model_id).unwrap_or_default())
    }

    fn normalize_step(
        &self,
        normalizer: &LegacyNormalizer<'_>,
        step: &LegacyStep,
        dimensions: Dimensions,
        issue: &IssueSelector,
    ) -> Option<Step> {
        let Some(component) = self.catalog.component_for(&step.function_name) else {
            self.warnings.report(
                &format!("unknown legacy function `{}`", step.function_name),
                Some(step.step_number),
            );
            return None;
        };

        let context = IssueContext::new(issue.publication(), issue.issue_number(), step.step_number);
        match normalizer.normalize(component, &step.options, dimensions, &context) {
            Ok(options) => Some(Step::with_options(component, options)),
            Err(err) => {
                self.warnings.report(&err.to_string(), Some(step.step_number));
                None
            }
        }
    }

    fn legacy_metadata(&self, issue: &IssueSelector, model_id: ModelId) -> EdgeMetadata {
        let mut metadata = EdgeMetadata::default();

        match self.records.fetch_contributors(model_id) {
            Ok(contributions) => {
                for contribution in contributions {
                    metadata
                        .contributors_mut()
                        .add(contribution.kind(), contribution.user_id.to_string());
                }
            }
            Err(err) => log_fetch_failure(issue, "contributors", &err),
        }

        match self.records.fetch_main_photo(model_id) {
            Ok(Some(photo)) => metadata.add_photo(photo),
            Ok(None) => {}
            Err(err) => log_fetch_failure(issue, "main photo", &err),
        }

        metadata
    }
}

fn log_fetch_failure(issue: &IssueSelector, what: &str, err: &FetchError) {
    match err {
        FetchError::NotFound(_) => debug!(issue = issue.to_string(), what; "Not found"),
        FetchError::Backend(_) => warn!(issue = issue.to_string(), what, err:% = err; "Lookup failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use edgecreator_core::{component::ComponentKind, publication::PublicationCode};
    use edgecreator_legacy::record::{LegacyContribution, LegacyEdge};

    use super::*;
    use crate::{
        document::{DocumentNode, ParsedDocument},
        fetch::{LegacyStepsById, NoAssets, Warnings},
    };

    fn issue(number: &str) -> IssueSelector {
        IssueSelector::new(PublicationCode::new("fr", "DDD"), number)
    }

    /// Serves at most one document per status, counting fetches.
    #[derive(Default)]
    struct FakeDocuments {
        current: Option<ParsedDocument>,
        published: Option<ParsedDocument>,
        fetches: RefCell<Vec<bool>>,
    }

    impl DocumentFetcher for FakeDocuments {
        fn fetch(&self, selector: &IssueSelector, published: bool) -> Result<ParsedDocument, FetchError> {
            self.fetches.borrow_mut().push(published);
            let document = if published { &self.published } else { &self.current };
            document
                .clone()
                .ok_or_else(|| FetchError::NotFound(selector.to_string()))
        }
    }

    #[derive(Default)]
    struct FakeRecords {
        steps: Vec<LegacyStep>,
        exists: bool,
        record_fetches: Cell<usize>,
    }

    impl LegacyRecordFetcher for FakeRecords {
        fn fetch_record(&self, selector: &IssueSelector) -> Result<Option<LegacyEdge>, FetchError> {
            self.record_fetches.set(self.record_fetches.get() + 1);
            Ok(self.exists.then(|| LegacyEdge {
                id: 7,
                issue_number: selector.issue_number().to_string(),
            }))
        }

        fn fetch_steps(&self, model_ids: &[ModelId]) -> Result<LegacyStepsById, FetchError> {
            Ok(model_ids.iter().map(|id| (*id, self.steps.clone())).collect())
        }

        fn fetch_contributors(&self, _model_id: ModelId) -> Result<Vec<LegacyContribution>, FetchError> {
            Ok(vec![LegacyContribution {
                contribution: "photographe".to_string(),
                user_id: 3,
            }])
        }

        fn fetch_main_photo(&self, _model_id: ModelId) -> Result<Option<String>, FetchError> {
            Err(FetchError::Backend("photo store offline".to_string()))
        }
    }

    fn document(status: DocumentStatus) -> ParsedDocument {
        ParsedDocument::new(
            30.0,
            300.0,
            status,
            vec![
                DocumentNode::metadata("contributor-designer", "alice"),
                DocumentNode::group(Some("Fill".to_string()), Some(json!({"fill": "#000000"}))),
            ],
        )
    }

    fn legacy_step(step_number: i64, function_name: &str, options: serde_json::Value) -> LegacyStep {
        LegacyStep {
            step_number,
            function_name: function_name.to_string(),
            options: options.as_object().cloned().unwrap_or_default(),
        }
    }

    fn resolver<'a>(
        documents: &'a FakeDocuments,
        records: &'a FakeRecords,
        warnings: &'a Warnings,
    ) -> ModelResolver<'a> {
        ModelResolver::new(
            ResolverConfig::default(),
            RenderCatalog::default(),
            documents,
            records,
            &NoAssets,
            warnings,
        )
    }

    #[test]
    fn test_transition_table() {
        use Outcome::*;
        use ResolveState::*;

        assert_eq!(TryCurrentDoc.next(Found), Done);
        assert_eq!(TryCurrentDoc.next(Missing), TryPublishedDoc);
        assert_eq!(TryPublishedDoc.next(Found), Done);
        assert_eq!(TryPublishedDoc.next(Missing), TryLegacyRecord);
        assert_eq!(TryLegacyRecord.next(Found), Done);
        assert_eq!(TryLegacyRecord.next(Missing), TryPublishedDocFinal);
        assert_eq!(TryPublishedDocFinal.next(Found), Done);
        assert_eq!(TryPublishedDocFinal.next(Missing), Failed);
        assert_eq!(Done.next(Missing), Done);
        assert_eq!(Failed.next(Found), Failed);
        assert!(Done.is_terminal() && Failed.is_terminal());
        assert!(!TryLegacyRecord.is_terminal());
    }

    #[test]
    fn test_in_flight_rejects_reentry() {
        let in_flight = InFlight::default();
        let guard = in_flight.begin(&issue("1")).unwrap();

        assert_eq!(
            in_flight.begin(&issue("1")).unwrap_err(),
            ResolveError::ResolutionInProgress(issue("1"))
        );
        assert!(in_flight.begin(&issue("2")).is_ok());

        drop(guard);
        assert!(!in_flight.contains(&issue("1")));
        assert!(in_flight.begin(&issue("1")).is_ok());
    }

    #[test]
    fn test_current_document_wins() {
        let documents = FakeDocuments {
            current: Some(document(DocumentStatus::Current)),
            published: Some(document(DocumentStatus::Published)),
            ..Default::default()
        };
        let records = FakeRecords {
            exists: true,
            ..Default::default()
        };
        let warnings = Warnings::new();

        let model = resolver(&documents, &records, &warnings)
            .resolve(&issue("1"), true)
            .unwrap();

        assert_eq!(model.source(), ModelSource::CurrentDocument);
        assert_eq!(model.dimensions(), Dimensions::new(20.0, 200.0));
        assert_eq!(model.steps()[0].component(), ComponentKind::Fill);
        assert_eq!(
            model.metadata().unwrap().contributors().designers(),
            ["alice".to_string()]
        );
        assert_eq!(documents.fetches.borrow().as_slice(), [false]);
        assert_eq!(records.record_fetches.get(), 0);
    }

    #[test]
    fn test_published_document_after_missing_current() {
        let documents = FakeDocuments {
            published: Some(document(DocumentStatus::Published)),
            ..Default::default()
        };
        let records = FakeRecords::default();
        let warnings = Warnings::new();

        let model = resolver(&documents, &records, &warnings)
            .resolve(&issue("1"), false)
            .unwrap();

        assert_eq!(model.source(), ModelSource::PublishedDocument);
        assert_eq!(model.metadata(), None);
        assert_eq!(documents.fetches.borrow().as_slice(), [false, true]);
    }

    #[test]
    fn test_legacy_record_drops_bad_steps_with_warnings() {
        let documents = FakeDocuments::default();
        let records = FakeRecords {
            exists: true,
            steps: vec![
                legacy_step(2, "Remplir", json!({"Pos_x": 0, "Pos_y": 0})),
                legacy_step(-1, "", json!({"Dimension_x": 20, "Dimension_y": 250})),
                legacy_step(0, "Remplir", json!({"Pos_x": 0, "Pos_y": 0, "Couleur": "0,0,0"})),
                legacy_step(1, "Cadre", json!({})),
            ],
            ..Default::default()
        };
        let warnings = Warnings::new();

        let model = resolver(&documents, &records, &warnings)
            .resolve(&issue("1"), true)
            .unwrap();

        assert_eq!(model.source(), ModelSource::LegacyRecord);
        assert_eq!(model.dimensions(), Dimensions::new(20.0, 250.0));
        assert_eq!(model.steps().len(), 1);
        assert_eq!(model.steps()[0].option("fill"), Some(&json!("#000000")));

        let reported = warnings.entries();
        assert_eq!(reported.len(), 2);
        assert_eq!(reported[0].step_number(), Some(1));
        assert_eq!(reported[1].step_number(), Some(2));
        assert_eq!(reported[1].message(), "required option not found: Couleur");

        let metadata = model.metadata().unwrap();
        assert_eq!(metadata.contributors().photographers(), ["3".to_string()]);
        assert!(metadata.photos().is_empty());
    }

    #[test]
    fn test_no_source_fails_for_that_issue_only() {
        let documents = FakeDocuments::default();
        let records = FakeRecords::default();
        let warnings = Warnings::new();
        let resolver = resolver(&documents, &records, &warnings);

        let results = resolver.resolve_all(&[issue("1"), issue("2")], Some(&issue("1")));

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[&issue("2")],
            Err(ResolveError::NoModelFound(issue("2")))
        );
        assert_eq!(
            documents.fetches.borrow().as_slice(),
            [false, true, true, false, true, true]
        );
        assert!(!resolver.in_flight().contains(&issue("1")));
    }
}

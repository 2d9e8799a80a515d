//! Editing sessions over several issues.
//!
//! A [`SessionContext`] names the issues edited together and which of them,
//! and which step, the user is focused on. It is passed explicitly to every
//! synchronization operation.

use log::warn;

use edgecreator_core::publication::{IssueSelector, PublicationCode};

use crate::sync::SyncError;

/// Number of neighbouring issues shown on each side of a selection.
pub const SURROUNDING_ISSUES: usize = 10;

/// The issues and step currently being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Focus {
    issues: Vec<IssueSelector>,
    step: Option<usize>,
}

impl Focus {
    pub fn new(issues: Vec<IssueSelector>, step: Option<usize>) -> Self {
        Self { issues, step }
    }

    pub fn issues(&self) -> &[IssueSelector] {
        &self.issues
    }

    pub fn step(&self) -> Option<usize> {
        self.step
    }
}

/// Issues edited together, with the current focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    issues: Vec<IssueSelector>,
    is_range: bool,
    focus: Focus,
}

impl SessionContext {
    /// Create a session over `issues`, all focused, with no focused step.
    pub fn new(issues: Vec<IssueSelector>) -> Self {
        Self {
            focus: Focus::new(issues.clone(), None),
            issues,
            is_range: false,
        }
    }

    /// Select the issues of a session among the issues of a publication.
    ///
    /// With `max`, every issue from `min` to `max` in publication order is
    /// selected; an unknown `max` extends the range to the last issue.
    /// Without `max`, `min` and `others` are selected as given.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownIssue`] if `min` is not an issue of the
    /// publication.
    pub fn select_issues(
        publication: &PublicationCode,
        publication_issues: &[String],
        min: &str,
        max: Option<&str>,
        others: &[String],
    ) -> Result<Self, SyncError> {
        let first = publication_issues
            .iter()
            .position(|issue| issue == min)
            .ok_or_else(|| SyncError::UnknownIssue(min.to_string()))?;

        let selector = |issue: &str| IssueSelector::new(publication.clone(), issue);
        let Some(max) = max else {
            let issues = std::iter::once(min)
                .chain(others.iter().map(String::as_str))
                .map(selector)
                .collect();
            return Ok(Self::new(issues));
        };

        let last = match publication_issues.iter().position(|issue| issue == max) {
            Some(last) => last,
            None => {
                let last = publication_issues.len() - 1;
                warn!(
                    requested = max,
                    fallback = publication_issues[last].as_str();
                    "Issue doesn't exist, falling back to the last issue"
                );
                last
            }
        };

        let issues = publication_issues
            .get(first..=last)
            .unwrap_or_default()
            .iter()
            .map(|issue| selector(issue))
            .collect();
        let mut context = Self::new(issues);
        context.is_range = true;
        Ok(context)
    }

    pub fn issues(&self) -> &[IssueSelector] {
        &self.issues
    }

    /// Returns true when the issues were selected as a range.
    pub fn is_range(&self) -> bool {
        self.is_range
    }

    pub fn contains(&self, issue: &IssueSelector) -> bool {
        self.issues.contains(issue)
    }

    pub fn focus(&self) -> &Focus {
        &self.focus
    }

    /// Focus on `issues`, keeping only those in the session.
    pub fn focus_issues(&mut self, issues: Vec<IssueSelector>) {
        self.focus.issues = issues
            .into_iter()
            .filter(|issue| self.issues.contains(issue))
            .collect();
    }

    pub fn focus_step(&mut self, step: Option<usize>) {
        self.focus.step = step;
    }

    /// Remove `issue` from the session and from the focus.
    pub fn remove_issue(&mut self, issue: &IssueSelector) {
        self.issues.retain(|active| active != issue);
        self.focus.issues.retain(|focused| focused != issue);
    }

    /// Issues shown around the selection: up to `count` issues before the
    /// first selected issue and up to `count` after the last one, in
    /// publication order.
    pub fn surrounding_issues(
        &self,
        publication_issues: &[String],
        count: usize,
    ) -> (Vec<IssueSelector>, Vec<IssueSelector>) {
        let (Some(first), Some(last)) = (self.issues.first(), self.issues.last()) else {
            return (Vec::new(), Vec::new());
        };
        let position = |selected: &IssueSelector| {
            publication_issues
                .iter()
                .position(|issue| issue == selected.issue_number())
        };
        let to_selectors = |issues: &[String]| {
            issues
                .iter()
                .map(|issue| first.sibling(issue.as_str()))
                .collect::<Vec<_>>()
        };

        let before = position(first)
            .map(|index| to_selectors(&publication_issues[index.saturating_sub(count)..index]))
            .unwrap_or_default();
        let after = position(last)
            .map(|index| {
                let end = (index + 1 + count).min(publication_issues.len());
                to_selectors(&publication_issues[index + 1..end])
            })
            .unwrap_or_default();
        (before, after)
    }
}

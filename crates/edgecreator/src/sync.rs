//! Synchronized step sequences of several issues.
//!
//! Issues edited together must keep structurally identical step sequences:
//! the same components in the same order. Options may differ per issue.
//! [`StepSyncManager`] owns the sequences of a session and is the only way to
//! change them once they are installed.
//!
//! Installs, option changes and structural mutations go through one ordered
//! queue and take effect on [`StepSyncManager::flush`], so an install always
//! observes every mutation queued before it. Each queued event is validated
//! against every sequence it touches before any of them is changed.

use std::collections::VecDeque;

use indexmap::IndexMap;
use log::{debug, info, trace};
use thiserror::Error;

use edgecreator_core::{
    component::ComponentKind,
    dimensions::Dimensions,
    publication::IssueSelector,
    step::{Step, StepOptions, StepSequence, component_kinds, describe_components},
};

use crate::context::SessionContext;

/// Errors raised by [`StepSyncManager`] and session selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(
        "issues {first_issue} and {issue} don't have the same components: {} vs {}",
        describe_components(.first_components),
        describe_components(.components)
    )]
    InconsistentSteps {
        first_issue: IssueSelector,
        first_components: Vec<ComponentKind>,
        issue: IssueSelector,
        components: Vec<ComponentKind>,
    },

    #[error("step {index} does not exist for {issue}, which has {len} steps")]
    StepOutOfRange {
        issue: IssueSelector,
        index: usize,
        len: usize,
    },

    #[error("issue {0} is not part of the editing session")]
    InactiveIssue(IssueSelector),

    #[error("issue {0} doesn't exist")]
    UnknownIssue(String),

    #[error("no step is focused")]
    NoFocusedStep,

    #[error("issue {0} has no step sequence to copy")]
    NoSequence(IssueSelector),
}

/// An option patch for one step of several issues.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionChange {
    issues: Option<Vec<IssueSelector>>,
    step: Option<usize>,
    patch: StepOptions,
}

impl OptionChange {
    /// A patch for the focused step of the focused issues.
    pub fn new(patch: StepOptions) -> Self {
        Self {
            issues: None,
            step: None,
            patch,
        }
    }

    /// Target `issues` instead of the focused issues.
    pub fn with_issues(mut self, issues: Vec<IssueSelector>) -> Self {
        self.issues = Some(issues);
        self
    }

    /// Target step `step` instead of the focused step.
    pub fn with_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    pub fn patch(&self) -> &StepOptions {
        &self.patch
    }
}

/// A queued change, with its targets resolved against the session.
#[derive(Debug, Clone, PartialEq)]
enum SyncEvent {
    Install {
        issue: IssueSelector,
        steps: StepSequence,
    },
    OptionChange {
        issues: Vec<IssueSelector>,
        step: usize,
        patch: StepOptions,
    },
    Add {
        issues: Vec<IssueSelector>,
        component: ComponentKind,
    },
    Remove {
        issues: Vec<IssueSelector>,
        index: usize,
    },
    Duplicate {
        issues: Vec<IssueSelector>,
        index: usize,
    },
    Swap {
        issues: Vec<IssueSelector>,
        first: usize,
        second: usize,
    },
    Copy {
        from: IssueSelector,
        to: IssueSelector,
    },
}

impl SyncEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Install { .. } => "install",
            Self::OptionChange { .. } => "option change",
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::Duplicate { .. } => "duplicate",
            Self::Swap { .. } => "swap",
            Self::Copy { .. } => "copy",
        }
    }
}

/// Owner of the step sequences and dimensions of an editing session.
#[derive(Debug, Default)]
pub struct StepSyncManager {
    sequences: IndexMap<IssueSelector, StepSequence>,
    dimensions: IndexMap<IssueSelector, Dimensions>,
    pending: VecDeque<SyncEvent>,
}

impl StepSyncManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the installed steps of `issue`.
    pub fn steps(&self, issue: &IssueSelector) -> Option<&[Step]> {
        self.sequences.get(issue).map(Vec::as_slice)
    }

    pub fn dimensions(&self, issue: &IssueSelector) -> Option<Dimensions> {
        self.dimensions.get(issue).copied()
    }

    /// Issues with an installed sequence, in installation order.
    pub fn issues(&self) -> impl Iterator<Item = &IssueSelector> {
        self.sequences.keys()
    }

    /// Number of events waiting for [`Self::flush`].
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue the installation of `steps` as the sequence of `issue`.
    ///
    /// The components of `steps` are checked against the first other active
    /// issue with a non-empty sequence, now and again when the install is
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InactiveIssue`] if `issue` is not in `ctx` and
    /// [`SyncError::InconsistentSteps`] on a component mismatch.
    pub fn set_steps(
        &mut self,
        ctx: &SessionContext,
        issue: &IssueSelector,
        steps: StepSequence,
    ) -> Result<(), SyncError> {
        if !ctx.contains(issue) {
            return Err(SyncError::InactiveIssue(issue.clone()));
        }
        self.check_same_components(issue, &steps, |other| ctx.contains(other))?;
        self.enqueue(SyncEvent::Install {
            issue: issue.clone(),
            steps,
        });
        Ok(())
    }

    /// Queue an option patch.
    ///
    /// Issues and step default to the focus of `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoFocusedStep`] when `change` names no step and
    /// none is focused.
    pub fn apply_option_change(
        &mut self,
        ctx: &SessionContext,
        change: OptionChange,
    ) -> Result<(), SyncError> {
        let step = change
            .step
            .or(ctx.focus().step())
            .ok_or(SyncError::NoFocusedStep)?;
        let issues = change
            .issues
            .unwrap_or_else(|| ctx.focus().issues().to_vec());
        self.enqueue(SyncEvent::OptionChange {
            issues,
            step,
            patch: change.patch,
        });
        Ok(())
    }

    /// Queue the addition of an option-less `component` step at the end of
    /// every sequence of the session.
    pub fn add_step(&mut self, ctx: &SessionContext, component: ComponentKind) {
        self.enqueue(SyncEvent::Add {
            issues: ctx.issues().to_vec(),
            component,
        });
    }

    /// Queue the removal of step `index` from every sequence of the session.
    pub fn remove_step(&mut self, ctx: &SessionContext, index: usize) {
        self.enqueue(SyncEvent::Remove {
            issues: ctx.issues().to_vec(),
            index,
        });
    }

    /// Queue the duplication of step `index` in every sequence of the
    /// session; the copy is inserted before the original.
    pub fn duplicate_step(&mut self, ctx: &SessionContext, index: usize) {
        self.enqueue(SyncEvent::Duplicate {
            issues: ctx.issues().to_vec(),
            index,
        });
    }

    /// Queue the exchange of steps `first` and `second` in every sequence of
    /// the session.
    pub fn swap_steps(&mut self, ctx: &SessionContext, first: usize, second: usize) {
        self.enqueue(SyncEvent::Swap {
            issues: ctx.issues().to_vec(),
            first,
            second,
        });
    }

    /// Queue a deep copy of the dimensions and steps of `from` onto `to`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InactiveIssue`] if `from` or `to` is not in
    /// `ctx`. Flushing the copy fails with [`SyncError::NoSequence`] when
    /// `from` has no installed sequence by then, leaving `to` untouched.
    pub fn copy_sequence(
        &mut self,
        ctx: &SessionContext,
        from: &IssueSelector,
        to: &IssueSelector,
    ) -> Result<(), SyncError> {
        if let Some(inactive) = [from, to].into_iter().find(|issue| !ctx.contains(issue)) {
            return Err(SyncError::InactiveIssue(inactive.clone()));
        }
        self.enqueue(SyncEvent::Copy {
            from: from.clone(),
            to: to.clone(),
        });
        Ok(())
    }

    /// Set the dimensions of `issue`, or of every focused issue.
    pub fn set_dimensions(
        &mut self,
        ctx: &SessionContext,
        issue: Option<&IssueSelector>,
        dimensions: Dimensions,
    ) {
        let targets = match issue {
            Some(issue) => std::slice::from_ref(issue),
            None => ctx.focus().issues(),
        };
        for issue in targets {
            self.dimensions.insert(issue.clone(), dimensions);
        }
    }

    /// Drop `issue` from the session, with its sequence, dimensions and
    /// pending installs.
    pub fn release_issue(&mut self, ctx: &mut SessionContext, issue: &IssueSelector) {
        self.sequences.shift_remove(issue);
        self.dimensions.shift_remove(issue);
        self.pending.retain(|event| {
            !matches!(event, SyncEvent::Install { issue: pending, .. } if pending == issue)
        });
        ctx.remove_issue(issue);
        debug!(issue = issue.to_string(); "Issue released");
    }

    /// Apply every pending event, in order.
    ///
    /// Returns the number of events applied.
    ///
    /// # Errors
    ///
    /// Stops at the first event that cannot be applied. That event is
    /// discarded without having changed any sequence; later events stay
    /// queued.
    pub fn flush(&mut self) -> Result<usize, SyncError> {
        let mut applied = 0;
        while let Some(event) = self.pending.pop_front() {
            let name = event.name();
            self.apply(event)?;
            trace!(event = name; "Applied sync event");
            applied += 1;
        }
        if applied > 0 {
            info!(events = applied; "Step sequences synchronized");
        }
        Ok(applied)
    }

    fn enqueue(&mut self, event: SyncEvent) {
        trace!(event = event.name(), pending = self.pending.len(); "Queued sync event");
        self.pending.push_back(event);
    }

    fn apply(&mut self, event: SyncEvent) -> Result<(), SyncError> {
        match event {
            SyncEvent::Install { issue, steps } => {
                self.check_same_components(&issue, &steps, |_| true)?;
                self.sequences.insert(issue, steps);
            }
            SyncEvent::OptionChange {
                issues,
                step,
                patch,
            } => {
                let targets = self.stored(&issues);
                self.check_index(&targets, step)?;
                for issue in &targets {
                    let target = self.sequences.get_mut(issue).and_then(|steps| steps.get_mut(step));
                    if let Some(target) = target {
                        target.merge_options(&patch);
                    }
                }
            }
            SyncEvent::Add { issues, component } => {
                for steps in self.sequences_mut(&issues) {
                    steps.push(Step::new(component));
                }
            }
            SyncEvent::Remove { issues, index } => {
                self.check_index(&self.stored(&issues), index)?;
                for steps in self.sequences_mut(&issues) {
                    steps.remove(index);
                }
            }
            SyncEvent::Duplicate { issues, index } => {
                self.check_index(&self.stored(&issues), index)?;
                for steps in self.sequences_mut(&issues) {
                    let copy = steps[index].clone();
                    steps.insert(index, copy);
                }
            }
            SyncEvent::Swap {
                issues,
                first,
                second,
            } => {
                let targets = self.stored(&issues);
                self.check_index(&targets, first)?;
                self.check_index(&targets, second)?;
                for steps in self.sequences_mut(&issues) {
                    steps.swap(first, second);
                }
            }
            SyncEvent::Copy { from, to } => {
                let Some(steps) = self.sequences.get(&from).cloned() else {
                    return Err(SyncError::NoSequence(from));
                };
                if let Some(dimensions) = self.dimensions.get(&from).copied() {
                    self.dimensions.insert(to.clone(), dimensions);
                }
                self.sequences.insert(to, steps);
            }
        }
        Ok(())
    }

    /// Fails if `steps` does not have the components of the first other
    /// non-empty sequence accepted by `in_scope`.
    fn check_same_components(
        &self,
        issue: &IssueSelector,
        steps: &[Step],
        in_scope: impl Fn(&IssueSelector) -> bool,
    ) -> Result<(), SyncError> {
        let Some((first_issue, first_steps)) = self
            .sequences
            .iter()
            .find(|&(other, other_steps)| other != issue && in_scope(other) && !other_steps.is_empty())
        else {
            return Ok(());
        };

        let first_components = component_kinds(first_steps);
        let components = component_kinds(steps);
        if first_components == components {
            return Ok(());
        }
        Err(SyncError::InconsistentSteps {
            first_issue: first_issue.clone(),
            first_components,
            issue: issue.clone(),
            components,
        })
    }

    /// The issues of `issues` that have an installed sequence.
    fn stored(&self, issues: &[IssueSelector]) -> Vec<IssueSelector> {
        issues
            .iter()
            .filter(|issue| self.sequences.contains_key(*issue))
            .cloned()
            .collect()
    }

    fn check_index(&self, issues: &[IssueSelector], index: usize) -> Result<(), SyncError> {
        for issue in issues {
            let len = self.sequences.get(issue).map_or(0, Vec::len);
            if index >= len {
                return Err(SyncError::StepOutOfRange {
                    issue: issue.clone(),
                    index,
                    len,
                });
            }
        }
        Ok(())
    }

    fn sequences_mut<'s>(
        &'s mut self,
        issues: &'s [IssueSelector],
    ) -> impl Iterator<Item = &'s mut StepSequence> {
        self.sequences
            .iter_mut()
            .filter(move |(issue, _)| issues.contains(issue))
            .map(|(_, steps)| steps)
    }
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use edgecreator_core::publication::PublicationCode;

    use super::*;

    fn component_strategy() -> impl Strategy<Value = ComponentKind> {
        prop::sample::select(ComponentKind::ALL.to_vec())
    }

    /// Adding a step keeps every sequence structurally identical.
    fn check_add_keeps_sequences_equal(
        issue_count: usize,
        initial: &[ComponentKind],
        added: &[ComponentKind],
    ) -> Result<(), TestCaseError> {
        let issues: Vec<_> = (0..issue_count)
            .map(|n| IssueSelector::new(PublicationCode::new("fr", "DDD"), n.to_string()))
            .collect();
        let ctx = SessionContext::new(issues.clone());
        let mut manager = StepSyncManager::new();
        for issue in &issues {
            let steps = initial.iter().copied().map(Step::new).collect();
            manager
                .set_steps(&ctx, issue, steps)
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
        }
        for component in added {
            manager.add_step(&ctx, *component);
        }
        manager
            .flush()
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        let expected: Vec<_> = initial.iter().chain(added).copied().collect();
        for issue in &issues {
            let steps = manager
                .steps(issue)
                .ok_or_else(|| TestCaseError::fail("missing sequence"))?;
            prop_assert_eq!(component_kinds(steps), expected.clone());
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn add_keeps_sequences_equal(
            issue_count in 1usize..5,
            initial in prop::collection::vec(component_strategy(), 0..6),
            added in prop::collection::vec(component_strategy(), 1..4),
        ) {
            check_add_keeps_sequences_equal(issue_count, &initial, &added)?;
        }
    }
}

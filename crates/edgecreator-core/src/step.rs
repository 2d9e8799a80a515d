//! Drawing steps and step sequences.
//!
//! A [`Step`] pairs a [`ComponentKind`] with renderer-ready options. An edge
//! is drawn by applying its steps in order, so the position of a step in its
//! sequence is part of its identity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::component::ComponentKind;

/// Renderer options of a step, keyed by option name.
///
/// Insertion order is preserved so that serialised documents stay stable.
pub type StepOptions = Map<String, Value>;

/// An ordered list of steps describing one edge.
pub type StepSequence = Vec<Step>;

/// A single drawing operation of an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    component: ComponentKind,
    #[serde(default)]
    options: StepOptions,
}

impl Step {
    /// Creates a step with no options.
    pub fn new(component: ComponentKind) -> Self {
        Self {
            component,
            options: StepOptions::new(),
        }
    }

    /// Creates a step with the given options.
    pub fn with_options(component: ComponentKind, options: StepOptions) -> Self {
        Self { component, options }
    }

    pub fn component(&self) -> ComponentKind {
        self.component
    }

    pub fn options(&self) -> &StepOptions {
        &self.options
    }

    /// Returns the option value for `name`, if set.
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// Shallow-merges `patch` into the options of this step.
    ///
    /// Keys present in `patch` overwrite existing values; other keys are kept.
    pub fn merge_options(&mut self, patch: &StepOptions) {
        for (name, value) in patch {
            self.options.insert(name.clone(), value.clone());
        }
    }
}

/// Returns the ordered component kinds of a step sequence.
pub fn component_kinds(steps: &[Step]) -> Vec<ComponentKind> {
    steps.iter().map(Step::component).collect()
}

/// Formats component kinds as `Fill+Text+Image`, the notation used in
/// diagnostics about mismatching sequences.
pub fn describe_components(kinds: &[ComponentKind]) -> String {
    kinds
        .iter()
        .map(ComponentKind::as_str)
        .collect::<Vec<_>>()
        .join("+")
}

//! Component kinds for edge steps.
//!
//! Every drawing step of an edge is rendered by exactly one component out of
//! a fixed, closed set. [`ComponentKind`] names that set.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a string does not name a known component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown component `{0}`")]
pub struct UnknownComponent(pub String);

/// The kind of component that renders a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    ArcCircle,
    Fill,
    Gradient,
    Image,
    Polygon,
    Rectangle,
    Staple,
    Text,
}

impl ComponentKind {
    /// All component kinds, in declaration order.
    pub const ALL: [ComponentKind; 8] = [
        Self::ArcCircle,
        Self::Fill,
        Self::Gradient,
        Self::Image,
        Self::Polygon,
        Self::Rectangle,
        Self::Staple,
        Self::Text,
    ];

    /// Returns the component name as used in documents (e.g. `"ArcCircle"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArcCircle => "ArcCircle",
            Self::Fill => "Fill",
            Self::Gradient => "Gradient",
            Self::Image => "Image",
            Self::Polygon => "Polygon",
            Self::Rectangle => "Rectangle",
            Self::Staple => "Staple",
            Self::Text => "Text",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = UnknownComponent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownComponent(s.to_string()))
    }
}

//! Mapping from legacy function names to component kinds.
//!
//! Legacy step rows name the drawing routine that produced them
//! (`functionName`). The [`RenderCatalog`] maps those names onto the current
//! [`ComponentKind`]s; names without a mapping cannot be normalized.

use serde::Deserialize;

use edgecreator_core::component::ComponentKind;

/// One legacy function name and the component that replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenderMapping {
    original_name: String,
    component: ComponentKind,
}

impl RenderMapping {
    pub fn new(original_name: impl Into<String>, component: ComponentKind) -> Self {
        Self {
            original_name: original_name.into(),
            component,
        }
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn component(&self) -> ComponentKind {
        self.component
    }
}

/// The set of legacy functions that have a current component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCatalog {
    mappings: Vec<RenderMapping>,
}

impl RenderCatalog {
    pub fn new(mappings: Vec<RenderMapping>) -> Self {
        Self { mappings }
    }

    /// Returns the component replacing `original_name`, if any.
    pub fn component_for(&self, original_name: &str) -> Option<ComponentKind> {
        self.mappings
            .iter()
            .find(|mapping| mapping.original_name == original_name)
            .map(RenderMapping::component)
    }

    pub fn mappings(&self) -> &[RenderMapping] {
        &self.mappings
    }
}

impl Default for RenderCatalog {
    /// The function names used by the legacy edge store.
    fn default() -> Self {
        Self::new(vec![
            RenderMapping::new("Arc_cercle", ComponentKind::ArcCircle),
            RenderMapping::new("Remplir", ComponentKind::Fill),
            RenderMapping::new("Degrade", ComponentKind::Gradient),
            RenderMapping::new("Image", ComponentKind::Image),
            RenderMapping::new("Polygone", ComponentKind::Polygon),
            RenderMapping::new("Rectangle", ComponentKind::Rectangle),
            RenderMapping::new("Agrafer", ComponentKind::Staple),
            RenderMapping::new("TexteMyFonts", ComponentKind::Text),
        ])
    }
}

impl From<Vec<RenderMapping>> for RenderCatalog {
    fn from(mappings: Vec<RenderMapping>) -> Self {
        Self::new(mappings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_covers_every_component() {
        let catalog = RenderCatalog::default();
        for kind in ComponentKind::ALL {
            assert!(
                catalog.mappings().iter().any(|m| m.component() == kind),
                "no legacy function maps to {kind}"
            );
        }
    }

    #[test]
    fn test_component_for() {
        let catalog = RenderCatalog::new(vec![RenderMapping::new("Fond", ComponentKind::Fill)]);
        assert_eq!(catalog.component_for("Fond"), Some(ComponentKind::Fill));
        assert_eq!(catalog.component_for("Remplir"), None);
    }
}

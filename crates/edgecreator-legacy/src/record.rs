//! Legacy record types.
//!
//! These mirror the rows returned by the legacy record store. Field names
//! follow the store's JSON shape (`stepNumber`, `functionName`, ...).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use edgecreator_core::dimensions::Dimensions;

use crate::value::LegacyFields;

/// Raw options of one legacy step: strings or numbers keyed by legacy field
/// name.
pub type LegacyOptions = Map<String, Value>;

/// Step number reserved for the dimensions declaration of a legacy model.
pub const DIMENSIONS_STEP_NUMBER: i64 = -1;

/// Identifier of a legacy edge model.
pub type ModelId = u64;

/// A legacy edge model: the record describing one issue's edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyEdge {
    pub id: ModelId,
    pub issue_number: String,
}

/// One step row of a legacy edge model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyStep {
    pub step_number: i64,
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub options: LegacyOptions,
}

impl LegacyStep {
    /// Returns true for the sentinel step declaring the canvas size.
    pub fn is_dimensions(&self) -> bool {
        self.step_number == DIMENSIONS_STEP_NUMBER
    }
}

/// Kind of contribution recorded for a legacy model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContributionKind {
    Designer,
    Photographer,
}

/// A contributor row of a legacy edge model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyContribution {
    pub contribution: String,
    pub user_id: u64,
}

impl LegacyContribution {
    /// Legacy rows name photographers `photographe`; any other value is a
    /// design contribution.
    pub fn kind(&self) -> ContributionKind {
        if self.contribution == "photographe" {
            ContributionKind::Photographer
        } else {
            ContributionKind::Designer
        }
    }
}

/// Returns the canvas size declared by the sentinel step, or `default`.
///
/// A sentinel whose `Dimension_x`/`Dimension_y` cannot be read also yields
/// `default`.
pub fn dimensions_from_steps(steps: &[LegacyStep], default: Dimensions) -> Dimensions {
    steps
        .iter()
        .find(|step| step.is_dimensions())
        .and_then(|step| {
            let fields = LegacyFields::new(&step.options);
            let width = fields.number("Dimension_x").ok()?;
            let height = fields.number("Dimension_y").ok()?;
            Some(Dimensions::new(width, height))
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn step(value: Value) -> LegacyStep {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_legacy_step_deserializes_store_shape() {
        let step = step(json!({
            "stepNumber": 3,
            "functionName": "Remplir",
            "options": {"Couleur": "255,0,0"}
        }));
        assert_eq!(step.step_number, 3);
        assert_eq!(step.function_name, "Remplir");
        assert!(!step.is_dimensions());
    }

    #[test]
    fn test_dimensions_from_sentinel() {
        let steps = vec![
            step(json!({"stepNumber": 0, "functionName": "Remplir"})),
            step(json!({"stepNumber": -1, "options": {"Dimension_x": "20", "Dimension_y": 250}})),
        ];
        assert_eq!(
            dimensions_from_steps(&steps, Dimensions::default()),
            Dimensions::new(20.0, 250.0)
        );
    }

    #[test]
    fn test_dimensions_default_without_sentinel() {
        let steps = vec![step(json!({"stepNumber": 0, "functionName": "Remplir"}))];
        assert_eq!(
            dimensions_from_steps(&steps, Dimensions::default()),
            Dimensions::new(15.0, 200.0)
        );
    }

    #[test]
    fn test_contribution_kind() {
        let photographer = LegacyContribution {
            contribution: "photographe".to_string(),
            user_id: 1,
        };
        let designer = LegacyContribution {
            contribution: "createur".to_string(),
            user_id: 2,
        };
        assert_eq!(photographer.kind(), ContributionKind::Photographer);
        assert_eq!(designer.kind(), ContributionKind::Designer);
    }
}

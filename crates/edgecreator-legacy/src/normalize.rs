//! Conversion of legacy step options into renderer options.
//!
//! Each [`ComponentKind`] has a declarative list of required legacy fields
//! ([`required_fields`]) and one conversion function. Validation of the
//! required fields always runs before any conversion, so a step missing a
//! field fails with [`NormalizeError::MissingField`] regardless of what else
//! is wrong with it.

use log::{trace, warn};
use serde_json::{Number, Value};

use edgecreator_core::{
    component::ComponentKind, dimensions::Dimensions, publication::PublicationCode,
    step::StepOptions,
};

use crate::{
    NormalizeError,
    asset::AssetSizeLookup,
    record::LegacyOptions,
    template::{TemplateContext, resolve_template},
    value::LegacyFields,
};

/// Color used for the unfilled side of shapes.
const TRANSPARENT: &str = "transparent";

/// Side of the square drawn in place of an image that cannot be found.
const PLACEHOLDER_IMAGE_SIDE: f64 = 20.0;

/// The issue and step a legacy step belongs to.
#[derive(Debug, Clone, Copy)]
pub struct IssueContext<'a> {
    publication: &'a PublicationCode,
    issue_number: &'a str,
    step_number: i64,
}

impl<'a> IssueContext<'a> {
    pub fn new(publication: &'a PublicationCode, issue_number: &'a str, step_number: i64) -> Self {
        Self {
            publication,
            issue_number,
            step_number,
        }
    }

    pub fn publication(&self) -> &PublicationCode {
        self.publication
    }

    pub fn issue_number(&self) -> &str {
        self.issue_number
    }

    pub fn step_number(&self) -> i64 {
        self.step_number
    }
}

/// Legacy fields that must be present for a component to be normalized.
pub const fn required_fields(kind: ComponentKind) -> &'static [&'static str] {
    match kind {
        ComponentKind::ArcCircle => &[
            "Rempli",
            "Pos_x_centre",
            "Pos_y_centre",
            "Largeur",
            "Hauteur",
            "Couleur",
        ],
        ComponentKind::Fill => &["Pos_x", "Pos_y", "Couleur"],
        ComponentKind::Gradient => &[
            "Pos_x_debut",
            "Pos_y_debut",
            "Pos_x_fin",
            "Pos_y_fin",
            "Couleur_debut",
            "Couleur_fin",
            "Sens",
        ],
        ComponentKind::Image => &[
            "Source",
            "Position",
            "Decalage_x",
            "Decalage_y",
            "Compression_x",
            "Compression_y",
        ],
        ComponentKind::Polygon => &["X", "Y", "Couleur"],
        ComponentKind::Rectangle => &[
            "Rempli",
            "Pos_x_debut",
            "Pos_y_debut",
            "Pos_x_fin",
            "Pos_y_fin",
            "Couleur",
        ],
        ComponentKind::Staple => &["Y1", "Y2", "Taille_agrafe"],
        ComponentKind::Text => &[
            "Pos_x",
            "Pos_y",
            "Couleur_texte",
            "Couleur_fond",
            "Chaine",
            "Largeur",
            "Rotation",
            "Demi_hauteur",
            "Compression_x",
            "Compression_y",
            "URL",
        ],
    }
}

/// Converts a legacy rotation to the renderer's convention.
///
/// The legacy rotation is rounded to whole degrees and brought into
/// `[0, 360)`; the renderer rotates the other way, so the result is
/// `360 - normalized`, within `(0, 360]`.
pub fn convert_rotation(legacy_rotation: f64) -> f64 {
    360.0 - legacy_rotation.round().rem_euclid(360.0)
}

/// Stateless converter from legacy options to renderer options.
pub struct LegacyNormalizer<'a> {
    assets: &'a dyn AssetSizeLookup,
}

impl<'a> LegacyNormalizer<'a> {
    /// Create a normalizer resolving image sizes through `assets`.
    pub fn new(assets: &'a dyn AssetSizeLookup) -> Self {
        Self { assets }
    }

    /// Convert the legacy `options` of one step into renderer options.
    ///
    /// # Arguments
    ///
    /// * `kind` - Component the step maps to.
    /// * `options` - Raw legacy options of the step.
    /// * `dimensions` - Canvas size of the edge the step belongs to.
    /// * `issue` - Issue and step number, for templates and diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::MissingField`] naming the first absent
    /// required field, [`NormalizeError::UnsupportedGeometry`] for shapes the
    /// renderer cannot express, and number/color errors for unreadable
    /// values.
    pub fn normalize(
        &self,
        kind: ComponentKind,
        options: &LegacyOptions,
        dimensions: Dimensions,
        issue: &IssueContext<'_>,
    ) -> Result<StepOptions, NormalizeError> {
        let fields = LegacyFields::new(options);
        fields.require_all(required_fields(kind))?;

        let normalized = match kind {
            ComponentKind::ArcCircle => arc_circle(&fields)?,
            ComponentKind::Fill => fill(&fields, issue)?,
            ComponentKind::Gradient => gradient(&fields)?,
            ComponentKind::Image => self.image(&fields, dimensions, issue)?,
            ComponentKind::Polygon => polygon(&fields)?,
            ComponentKind::Rectangle => rectangle(&fields)?,
            ComponentKind::Staple => staple(&fields)?,
            ComponentKind::Text => text(&fields)?,
        };

        trace!(
            component = kind.as_str(),
            step_number = issue.step_number();
            "Normalized legacy step"
        );
        Ok(normalized)
    }

    fn image(
        &self,
        fields: &LegacyFields<'_>,
        dimensions: Dimensions,
        issue: &IssueContext<'_>,
    ) -> Result<StepOptions, NormalizeError> {
        let source = fields.text("Source")?;
        let from_bottom = fields.text("Position")? == "bas";
        let offset_x = fields.number_or("Decalage_x", 0.0)?;
        let offset_y = fields.number_or("Decalage_y", 0.0)?;
        let compression_x = fields.number_or("Compression_x", 1.0)?;
        let compression_y = fields.number_or("Compression_y", 1.0)?;

        let template_context = TemplateContext::new(issue.issue_number(), dimensions.height());
        let element_path = format!(
            "{}/elements/{}",
            issue.publication().country(),
            resolve_template(&source, &template_context)
        );

        let image_size = match self.assets.fetch_image_size(&element_path) {
            Ok(size) if size.width > 0.0 => size,
            Ok(_) => {
                warn!(path = element_path.as_str(); "Image has no width, using placeholder");
                return Ok(image_placeholder(source));
            }
            Err(err) => {
                warn!(source = source.as_str(), err:% = err; "Image could not be retrieved, using placeholder");
                return Ok(image_placeholder(source));
            }
        };

        let embedded_height = dimensions.width() * image_size.aspect_ratio();
        let y = if from_bottom {
            dimensions.height() - embedded_height - offset_y
        } else {
            offset_y
        };

        Ok(options([
            ("src", Value::String(source)),
            ("x", number(offset_x)),
            ("y", number(y)),
            ("width", number(compression_x * dimensions.width())),
            ("height", number(compression_y * embedded_height)),
        ]))
    }
}

/// Build renderer options from name/value pairs.
fn options<const N: usize>(entries: [(&str, Value); N]) -> StepOptions {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Convert a number to JSON, keeping whole numbers integral.
fn number(value: f64) -> Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

/// Returns `(fill, stroke)`: the color goes to the fill when `filled`,
/// otherwise to the stroke.
fn paint(filled: bool, color: String) -> (Value, Value) {
    let transparent = Value::from(TRANSPARENT);
    if filled {
        (Value::String(color), transparent)
    } else {
        (transparent, Value::String(color))
    }
}

fn image_placeholder(source: String) -> StepOptions {
    options([
        ("x", number(0.0)),
        ("y", number(0.0)),
        ("width", number(PLACEHOLDER_IMAGE_SIDE)),
        ("height", number(PLACEHOLDER_IMAGE_SIDE)),
        ("src", Value::String(source)),
    ])
}

fn arc_circle(fields: &LegacyFields<'_>) -> Result<StepOptions, NormalizeError> {
    let (fill, stroke) = paint(fields.flag("Rempli")?, fields.color("Couleur")?);
    Ok(options([
        ("cx", number(fields.number("Pos_x_centre")?)),
        ("cy", number(fields.number("Pos_y_centre")?)),
        ("rx", number(fields.number("Largeur")? / 2.0)),
        ("ry", number(fields.number("Hauteur")? / 2.0)),
        ("fill", fill),
        ("stroke", stroke),
    ]))
}

fn fill(
    fields: &LegacyFields<'_>,
    issue: &IssueContext<'_>,
) -> Result<StepOptions, NormalizeError> {
    for field in ["Pos_x", "Pos_y"] {
        match fields.number(field) {
            Ok(offset) if offset == 0.0 => {}
            _ => warn!(
                step_number = issue.step_number(),
                field = field;
                "Fill offset is not zero, this is not supported"
            ),
        }
    }
    Ok(options([("fill", Value::String(fields.color("Couleur")?))]))
}

fn gradient(fields: &LegacyFields<'_>) -> Result<StepOptions, NormalizeError> {
    let x = fields.number("Pos_x_debut")?;
    let y = fields.number("Pos_y_debut")?;
    Ok(options([
        ("x", number(x)),
        ("y", number(y)),
        ("width", number(fields.number("Pos_x_fin")? - x)),
        ("height", number(fields.number("Pos_y_fin")? - y)),
        ("colorStart", Value::String(fields.color("Couleur_debut")?)),
        ("colorEnd", Value::String(fields.color("Couleur_fin")?)),
        ("direction", Value::String(fields.text("Sens")?)),
    ]))
}

fn polygon(fields: &LegacyFields<'_>) -> Result<StepOptions, NormalizeError> {
    let xs = fields.coordinates("X")?;
    let ys = fields.coordinates("Y")?;
    if xs.len() != ys.len() {
        return Err(NormalizeError::UnsupportedGeometry(format!(
            "polygon has {} X coordinates but {} Y coordinates",
            xs.len(),
            ys.len()
        )));
    }
    let points = xs
        .into_iter()
        .zip(ys)
        .map(|(x, y)| Value::Array(vec![number(x), number(y)]))
        .collect();
    Ok(options([
        ("points", Value::Array(points)),
        ("fill", Value::String(fields.color("Couleur")?)),
    ]))
}

fn rectangle(fields: &LegacyFields<'_>) -> Result<StepOptions, NormalizeError> {
    let x = fields.number("Pos_x_debut")?;
    let y = fields.number("Pos_y_debut")?;
    let (fill, stroke) = paint(fields.flag("Rempli")?, fields.color("Couleur")?);
    Ok(options([
        ("x", number(x)),
        ("y", number(y)),
        ("width", number(fields.number("Pos_x_fin")? - x)),
        ("height", number(fields.number("Pos_y_fin")? - y)),
        ("fill", fill),
        ("stroke", stroke),
    ]))
}

fn staple(fields: &LegacyFields<'_>) -> Result<StepOptions, NormalizeError> {
    Ok(options([
        ("y1", number(fields.number("Y1")?)),
        ("y2", number(fields.number("Y2")?)),
        ("height", number(fields.number("Taille_agrafe")?)),
    ]))
}

fn text(fields: &LegacyFields<'_>) -> Result<StepOptions, NormalizeError> {
    Ok(options([
        ("x", number(fields.number("Pos_x")?)),
        ("y", number(fields.number("Pos_y")?)),
        ("fgColor", Value::String(fields.color("Couleur_texte")?)),
        ("bgColor", Value::String(fields.color("Couleur_fond")?)),
        ("font", Value::String(fields.text("URL")?.replace('.', "/"))),
        ("text", Value::String(fields.text("Chaine")?)),
        ("internalWidth", number(fields.number("Largeur")?)),
        (
            "rotation",
            number(convert_rotation(fields.number("Rotation")?)),
        ),
        ("isHalfHeight", Value::Bool(fields.flag("Demi_hauteur")?)),
        (
            "widthCompression",
            number(fields.number_or("Compression_x", 1.0)?),
        ),
        (
            "heightCompression",
            number(fields.number_or("Compression_y", 1.0)?),
        ),
    ]))
}

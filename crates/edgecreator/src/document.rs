//! Serialized edge documents.
//!
//! A current-format document is an SVG file whose size is the canvas size
//! multiplied by the unit factor. Every top-level `<g>` is one step: its
//! `class` names the component and its `<metadata>` child holds the step
//! options as JSON. Top-level `<metadata type="...">` nodes carry contributor
//! names and photo file names.
//!
//! ```text
//! <svg width="22.5" height="300">
//!   <metadata type="contributor-designer">alice</metadata>
//!   <g class="Fill"><metadata>{"fill":"#FF0000"}</metadata></g>
//! </svg>
//! ```

use std::{fmt, str::FromStr};

use log::{debug, warn};
use serde_json::Value;
use svg::{
    Document, Node as _,
    node::{
        Text,
        element::{Element, Group, tag::Type},
    },
    parser::Event,
};
use thiserror::Error;

use edgecreator_core::{
    component::ComponentKind,
    dimensions::Dimensions,
    step::{Step, StepOptions, StepSequence},
};

use crate::{
    fetch::WarningSink,
    metadata::{ContributionKind, EdgeMetadata},
};

const PHOTO_METADATA: &str = "photo";
const DESIGNER_METADATA: &str = "contributor-designer";
const PHOTOGRAPHER_METADATA: &str = "contributor-photographer";

/// Publication state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    /// Work in progress, not yet visible to readers.
    Current,
    Published,
}

impl DocumentStatus {
    pub fn is_published(self) -> bool {
        self == Self::Published
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Published => write!(f, "published"),
        }
    }
}

/// Errors raised while reading a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("document has no `{0}` attribute")]
    MissingAttribute(&'static str),

    #[error("document attribute `{name}` is not a number: `{value}`")]
    InvalidAttribute { name: &'static str, value: String },
}

/// One element of interest in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode {
    tag: String,
    class: Option<String>,
    payload: Option<Value>,
    metadata_type: Option<String>,
    text: Option<String>,
}

impl DocumentNode {
    /// A step group with its class label and options payload.
    pub fn group(class: Option<String>, payload: Option<Value>) -> Self {
        Self {
            tag: "g".to_string(),
            class,
            payload,
            metadata_type: None,
            text: None,
        }
    }

    /// A typed `<metadata>` node.
    pub fn metadata(metadata_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: "metadata".to_string(),
            class: None,
            payload: None,
            metadata_type: Some(metadata_type.into()),
            text: Some(text.into()),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn metadata_type(&self) -> Option<&str> {
        self.metadata_type.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// A document reduced to what model resolution needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    width: f64,
    height: f64,
    status: DocumentStatus,
    nodes: Vec<DocumentNode>,
}

impl ParsedDocument {
    pub fn new(width: f64, height: f64, status: DocumentStatus, nodes: Vec<DocumentNode>) -> Self {
        Self {
            width,
            height,
            status,
            nodes,
        }
    }

    /// Declared width, in document units.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Declared height, in document units.
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn nodes(&self) -> &[DocumentNode] {
        &self.nodes
    }

    /// Canvas size: the declared size truncated to whole units, divided by
    /// `unit_factor`.
    pub fn dimensions(&self, unit_factor: f64) -> Dimensions {
        Dimensions::new(self.width.trunc(), self.height.trunc()).scale_down(unit_factor)
    }

    /// Steps described by the document's groups, in document order.
    ///
    /// Groups whose class is not a known component are reported to
    /// `warnings` and skipped.
    pub fn steps(&self, warnings: &dyn WarningSink) -> StepSequence {
        self.nodes
            .iter()
            .filter(|node| node.tag == "g")
            .enumerate()
            .filter_map(|(index, node)| {
                let class = node.class().unwrap_or_default();
                let component = match ComponentKind::from_str(class) {
                    Ok(component) => component,
                    Err(err) => {
                        warnings.report(&err.to_string(), i64::try_from(index).ok());
                        return None;
                    }
                };
                let options = match node.payload() {
                    Some(Value::Object(options)) => options.clone(),
                    _ => StepOptions::new(),
                };
                Some(Step::with_options(component, options))
            })
            .collect()
    }

    /// Contributors and photos named by the document's metadata nodes.
    pub fn metadata(&self) -> EdgeMetadata {
        let mut metadata = EdgeMetadata::default();
        for node in &self.nodes {
            let (Some(metadata_type), Some(text)) = (node.metadata_type(), node.text()) else {
                continue;
            };
            match metadata_type {
                PHOTO_METADATA => metadata.add_photo(text),
                DESIGNER_METADATA => {
                    metadata
                        .contributors_mut()
                        .add(ContributionKind::Designer, text);
                }
                PHOTOGRAPHER_METADATA => {
                    metadata
                        .contributors_mut()
                        .add(ContributionKind::Photographer, text);
                }
                other => debug!(metadata_type = other; "Ignoring unknown metadata node"),
            }
        }
        metadata
    }
}

/// Where the text of an open `<metadata>` element goes.
enum MetadataTarget {
    Group(usize),
    Typed(String),
}

/// Parse the content of a document file.
///
/// # Errors
///
/// Returns [`DocumentError::Malformed`] when the markup cannot be read and
/// [`DocumentError::MissingAttribute`] or [`DocumentError::InvalidAttribute`]
/// when the root size is absent or not numeric.
pub fn parse_document(content: &str, status: DocumentStatus) -> Result<ParsedDocument, DocumentError> {
    let parser = svg::read(content).map_err(|err| DocumentError::Malformed(err.to_string()))?;

    let mut size = None;
    let mut nodes = Vec::new();
    let mut open = Vec::<String>::new();
    let mut group = None;
    let mut metadata: Option<(MetadataTarget, String)> = None;

    for event in parser {
        match event {
            Event::Error(err) => return Err(DocumentError::Malformed(err.to_string())),
            Event::Tag(tag, kind, attributes) => {
                let attribute = |name: &str| attributes.get(name).map(|value| value.to_string());
                if matches!(kind, Type::Start | Type::Empty) {
                    match tag {
                        "svg" if size.is_none() => {
                            size = Some((
                                size_attribute("width", attribute("width"))?,
                                size_attribute("height", attribute("height"))?,
                            ));
                        }
                        "g" if open.len() == 1 => {
                            nodes.push(DocumentNode::group(attribute("class"), None));
                            if matches!(kind, Type::Start) {
                                group = Some(nodes.len() - 1);
                            }
                        }
                        "metadata" if matches!(kind, Type::Start) => {
                            let target = match (group, open.len()) {
                                (Some(index), 2) => Some(MetadataTarget::Group(index)),
                                (None, 1) => attribute("type").map(MetadataTarget::Typed),
                                _ => None,
                            };
                            metadata = target.map(|target| (target, String::new()));
                        }
                        _ => {}
                    }
                }
                match kind {
                    Type::Start => open.push(tag.to_string()),
                    Type::End => {
                        open.pop();
                        match tag {
                            "metadata" => {
                                if let Some((target, text)) = metadata.take() {
                                    close_metadata(&mut nodes, target, &unescape(text.trim()));
                                }
                            }
                            "g" if open.len() == 1 => group = None,
                            _ => {}
                        }
                    }
                    Type::Empty => {}
                }
            }
            Event::Text(text) => {
                if let Some((_, content)) = metadata.as_mut() {
                    content.push_str(text);
                }
            }
            _ => {}
        }
    }

    let (width, height) = size.ok_or(DocumentError::MissingAttribute("width"))?;
    Ok(ParsedDocument::new(width, height, status, nodes))
}

fn size_attribute(name: &'static str, value: Option<String>) -> Result<f64, DocumentError> {
    let value = value.ok_or(DocumentError::MissingAttribute(name))?;
    value
        .trim()
        .parse()
        .map_err(|_| DocumentError::InvalidAttribute { name, value })
}

fn close_metadata(nodes: &mut Vec<DocumentNode>, target: MetadataTarget, text: &str) {
    match target {
        MetadataTarget::Group(index) => {
            let Some(node) = nodes.get_mut(index) else {
                return;
            };
            match serde_json::from_str(text) {
                Ok(payload) => node.payload = Some(payload),
                Err(err) => warn!(
                    class = node.class().unwrap_or_default(),
                    err:% = err;
                    "Ignoring unreadable step options"
                ),
            }
        }
        MetadataTarget::Typed(metadata_type) => {
            nodes.push(DocumentNode::metadata(metadata_type, text));
        }
    }
}

/// Decode the predefined XML entities and numeric character references.
///
/// Unknown or malformed references are kept verbatim.
fn unescape(text: &str) -> String {
    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);
        rest = &rest[start..];
        let entity = rest.find(';').and_then(|end| Some((decode_entity(&rest[1..end])?, end)));
        match entity {
            Some((decoded_char, end)) => {
                decoded.push(decoded_char);
                rest = &rest[end + 1..];
            }
            None => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        _ => {
            let code = name.strip_prefix('#')?;
            let code = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Serialize a model into a current-format document.
pub fn write_document(
    dimensions: Dimensions,
    steps: &[Step],
    metadata: &EdgeMetadata,
    unit_factor: f64,
) -> String {
    let size = dimensions.scale_up(unit_factor);
    let mut document = Document::new()
        .set(
            "viewBox",
            format!("0 0 {} {}", dimensions.width(), dimensions.height()),
        )
        .set("width", size.width())
        .set("height", size.height());

    let contributors = metadata.contributors();
    let typed_nodes = contributors
        .designers()
        .iter()
        .map(|user| (DESIGNER_METADATA, user))
        .chain(
            contributors
                .photographers()
                .iter()
                .map(|user| (PHOTOGRAPHER_METADATA, user)),
        )
        .chain(metadata.photos().iter().map(|photo| (PHOTO_METADATA, photo)));
    for (metadata_type, text) in typed_nodes {
        let mut node = Element::new("metadata");
        node.assign("type", metadata_type);
        node.append(Text::new(text.as_str()));
        document = document.add(node);
    }

    for step in steps {
        let mut payload = Element::new("metadata");
        payload.append(Text::new(Value::Object(step.options().clone()).to_string()));
        document = document.add(
            Group::new()
                .set("class", step.component().as_str())
                .add(payload),
        );
    }

    document.to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fetch::Warnings;

    const DOCUMENT: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="22.9" height="300">
  <metadata type="contributor-designer">alice</metadata>
  <metadata type="photo"> photo_1.jpg </metadata>
  <g class="Fill"><metadata>{&quot;fill&quot;:&quot;#FF0000&quot;}</metadata></g>
  <g class="Rectangle"></g>
  <g class="Sparkles"><metadata>{}</metadata></g>
</svg>"##;

    #[test]
    fn test_parse_document() {
        let document = parse_document(DOCUMENT, DocumentStatus::Current).unwrap();

        assert_eq!(document.width(), 22.9);
        assert_eq!(document.height(), 300.0);
        assert_eq!(document.status(), DocumentStatus::Current);
        assert_eq!(document.nodes().len(), 5);
        assert_eq!(document.nodes()[2].payload(), Some(&json!({"fill": "#FF0000"})));
    }

    #[test]
    fn test_numeric_character_references_are_decoded() {
        let document = parse_document(
            r##"<svg width="30" height="300"><g class="Text"><metadata>{&#34;text&#x22;:&#34;Picsou &#X26; Donald&#34;,"color":"&#35;FF0000"}</metadata></g></svg>"##,
            DocumentStatus::Current,
        )
        .unwrap();

        assert_eq!(
            document.nodes()[0].payload(),
            Some(&json!({"text": "Picsou & Donald", "color": "#FF0000"}))
        );
    }

    #[test]
    fn test_unescape_keeps_unknown_references() {
        assert_eq!(unescape("a &amp;amp; b"), "a &amp; b");
        assert_eq!(unescape("&nbsp; &#xZZ; &#1114112; & ;"), "&nbsp; &#xZZ; &#1114112; & ;");
        assert_eq!(unescape("&#39;&apos;&#x3C;"), "''<");
    }

    #[test]
    fn test_dimensions_truncate_then_scale() {
        let document = parse_document(DOCUMENT, DocumentStatus::Current).unwrap();

        let dimensions = document.dimensions(1.5);
        assert_eq!(dimensions.width(), 22.0 / 1.5);
        assert_eq!(dimensions.height(), 200.0);
    }

    #[test]
    fn test_steps_skip_unknown_components() {
        let document = parse_document(DOCUMENT, DocumentStatus::Published).unwrap();
        let warnings = Warnings::new();

        let steps = document.steps(&warnings);

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].component(), ComponentKind::Fill);
        assert_eq!(steps[0].option("fill"), Some(&json!("#FF0000")));
        assert_eq!(steps[1].component(), ComponentKind::Rectangle);
        assert!(steps[1].options().is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings.entries()[0].step_number(), Some(2));
    }

    #[test]
    fn test_metadata_nodes() {
        let document = parse_document(DOCUMENT, DocumentStatus::Current).unwrap();

        let metadata = document.metadata();

        assert_eq!(metadata.contributors().designers(), ["alice".to_string()]);
        assert!(metadata.contributors().photographers().is_empty());
        assert_eq!(metadata.photos(), ["photo_1.jpg".to_string()]);
    }

    #[test]
    fn test_missing_size_is_an_error() {
        let err = parse_document(r#"<svg height="3"></svg>"#, DocumentStatus::Current).unwrap_err();
        assert!(matches!(err, DocumentError::MissingAttribute("width")));
    }

    #[test]
    fn test_written_document_reads_back() {
        let mut metadata = EdgeMetadata::default();
        metadata
            .contributors_mut()
            .add(ContributionKind::Photographer, "bob");
        metadata.add_photo("edge.jpg");
        let steps = vec![
            Step::with_options(
                ComponentKind::Text,
                json!({"text": "Tom & \"Jerry\"", "x": 1})
                    .as_object()
                    .unwrap()
                    .clone(),
            ),
            Step::new(ComponentKind::Staple),
        ];

        let content = write_document(Dimensions::new(15.0, 200.0), &steps, &metadata, 1.5);
        let document = parse_document(&content, DocumentStatus::Current).unwrap();

        assert_eq!(document.width(), 22.5);
        assert_eq!(document.height(), 300.0);
        assert_eq!(document.steps(&Warnings::new()), steps);
        assert_eq!(document.metadata(), metadata);
    }
}

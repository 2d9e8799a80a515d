//! Legacy edge records and their normalization.
//!
//! Edges drawn before the current renderer existed are stored as relational
//! records: one row per step, with French field names, RGB triples for colors
//! and a rotation convention opposite to the current one. This crate turns
//! such rows into renderer-ready [`Step`](edgecreator_core::step::Step)
//! options.
//!
//! # Overview
//!
//! - [`record`] - Legacy record types as returned by the record store
//! - [`asset`] - Image size lookup consulted for image steps
//! - [`catalog`] - Mapping from legacy function names to component kinds
//! - [`template`] - Resolution of `[Numero]`-style placeholders in sources
//! - [`value`] - Grammar for legacy numbers, colors and coordinate lists
//! - [`normalize`] - Per-component conversion into renderer options
//!
//! # Example
//!
//! ```
//! # use edgecreator_core::{component::ComponentKind, dimensions::Dimensions, publication::PublicationCode};
//! # use edgecreator_legacy::{asset::NoAssets, normalize::{IssueContext, LegacyNormalizer}};
//! # use serde_json::json;
//! let options = json!({"Pos_x": "0", "Pos_y": "0", "Couleur": "255,0,0"});
//! let publication = PublicationCode::new("fr", "DDD");
//! let issue = IssueContext::new(&publication, "1", 0);
//!
//! let normalizer = LegacyNormalizer::new(&NoAssets);
//! let normalized = normalizer
//!     .normalize(
//!         ComponentKind::Fill,
//!         options.as_object().unwrap(),
//!         Dimensions::default(),
//!         &issue,
//!     )
//!     .unwrap();
//! assert_eq!(normalized["fill"], json!("#FF0000"));
//! ```

pub mod asset;
pub mod catalog;
pub mod normalize;
pub mod record;
pub mod template;
pub mod value;

mod error;

pub use error::NormalizeError;

//! Edgecreator Core Types and Definitions
//!
//! This crate provides the foundational types shared by every edgecreator
//! crate. It includes:
//!
//! - **Components**: The closed set of drawable step kinds ([`component::ComponentKind`])
//! - **Steps**: Renderer-ready drawing steps and their options ([`step`] module)
//! - **Dimensions**: Canvas size of an edge ([`dimensions::Dimensions`])
//! - **Publications**: Publication and issue identifiers ([`publication`] module)

pub mod component;
pub mod dimensions;
pub mod publication;
pub mod step;

//! Configuration types for model resolution.
//!
//! All types implement [`serde::Deserialize`] so that they can be loaded from
//! external sources; every field falls back to the historical default when
//! absent.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining resolver settings and
//!   the legacy render catalog.
//! - [`ResolverConfig`] - Batch size, default canvas and unit factor used
//!   while resolving models.
//!
//! Deserializing only checks types; call [`AppConfig::validate`] before use.
//!
//! # Example
//!
//! ```
//! # use edgecreator::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.resolver().step_chunk_size().get(), 10);
//! assert_eq!(config.resolver().unit_factor(), 1.5);
//! ```

use std::num::NonZeroUsize;

use serde::Deserialize;
use thiserror::Error;

use edgecreator_core::dimensions::Dimensions;
use edgecreator_legacy::catalog::{RenderCatalog, RenderMapping};

/// A configuration value that deserialized but cannot be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidConfig {
    #[error("unit_factor must be a positive number, got {0}")]
    UnitFactor(f64),

    #[error("default_dimensions must be positive, got {width}x{height}")]
    DefaultDimensions { width: f64, height: f64 },
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Resolver configuration section.
    #[serde(default)]
    resolver: ResolverConfig,

    /// Legacy function names and their components. Empty means the built-in
    /// catalog.
    #[serde(default)]
    renders: Vec<RenderMapping>,
}

impl AppConfig {
    /// Creates a new [`AppConfig`].
    ///
    /// # Arguments
    ///
    /// * `resolver` - Resolver settings.
    /// * `renders` - Legacy render mappings; empty selects the built-in catalog.
    pub fn new(resolver: ResolverConfig, renders: Vec<RenderMapping>) -> Self {
        Self { resolver, renders }
    }

    /// Returns the resolver configuration.
    pub fn resolver(&self) -> &ResolverConfig {
        &self.resolver
    }

    /// Checks the values serde cannot reject by type.
    ///
    /// # Errors
    ///
    /// See [`ResolverConfig::validate`].
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        self.resolver.validate()
    }

    /// Returns the render catalog used for legacy steps.
    pub fn render_catalog(&self) -> RenderCatalog {
        if self.renders.is_empty() {
            RenderCatalog::default()
        } else {
            RenderCatalog::new(self.renders.clone())
        }
    }
}

/// Settings of the model resolver.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Maximum number of legacy models per step lookup.
    #[serde(default = "default_step_chunk_size")]
    step_chunk_size: NonZeroUsize,

    /// Canvas used when a legacy model declares none.
    #[serde(default)]
    default_dimensions: DimensionsConfig,

    /// Ratio between document units and canvas units.
    #[serde(default = "default_unit_factor")]
    unit_factor: f64,
}

impl ResolverConfig {
    pub fn new(step_chunk_size: NonZeroUsize, default_dimensions: Dimensions, unit_factor: f64) -> Self {
        Self {
            step_chunk_size,
            default_dimensions: DimensionsConfig {
                width: default_dimensions.width(),
                height: default_dimensions.height(),
            },
            unit_factor,
        }
    }

    pub fn step_chunk_size(&self) -> NonZeroUsize {
        self.step_chunk_size
    }

    pub fn default_dimensions(&self) -> Dimensions {
        Dimensions::new(self.default_dimensions.width, self.default_dimensions.height)
    }

    pub fn unit_factor(&self) -> f64 {
        self.unit_factor
    }

    /// Checks that the unit factor and default canvas can scale documents.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig::UnitFactor`] for a unit factor that is not
    /// finite and strictly positive, and [`InvalidConfig::DefaultDimensions`]
    /// likewise for either side of the default canvas.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if !is_positive(self.unit_factor) {
            return Err(InvalidConfig::UnitFactor(self.unit_factor));
        }
        let DimensionsConfig { width, height } = self.default_dimensions;
        if !is_positive(width) || !is_positive(height) {
            return Err(InvalidConfig::DefaultDimensions { width, height });
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            step_chunk_size: default_step_chunk_size(),
            default_dimensions: DimensionsConfig::default(),
            unit_factor: default_unit_factor(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct DimensionsConfig {
    width: f64,
    height: f64,
}

impl Default for DimensionsConfig {
    fn default() -> Self {
        Self {
            width: Dimensions::DEFAULT.width(),
            height: Dimensions::DEFAULT.height(),
        }
    }
}

fn default_step_chunk_size() -> NonZeroUsize {
    NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN)
}

fn default_unit_factor() -> f64 {
    1.5
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

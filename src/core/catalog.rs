//! Built-in model catalog
//!
//! The catalog is loaded from `builtin_models.toml`, which is embedded at
//! build time. It is a static routing table: nothing mutates it at runtime.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;

use crate::core::usage::AccessTier;

pub const DEFAULT_MODEL_ID: &str = "gpt-4";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityScores {
    pub speed: u8,
    pub reasoning: u8,
    pub creativity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub display_name: String,
    pub provider: String,
    pub tier: AccessTier,
    #[serde(default)]
    pub description: String,
    pub endpoint: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    pub scores: CapabilityScores,
}

impl ModelDescriptor {
    pub fn is_premium(&self) -> bool {
        self.tier == AccessTier::Premium
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    models: Vec<ModelDescriptor>,
}

#[derive(Debug)]
pub enum CatalogError {
    /// The embedded catalog could not be parsed.
    Parse(toml::de::Error),
    /// A model id was requested that the catalog does not contain.
    UnknownModel { id: String, available: Vec<String> },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Parse(source) => {
                write!(f, "Failed to parse builtin_models.toml: {}", source)
            }
            CatalogError::UnknownModel { id, available } => write!(
                f,
                "Model '{}' not found. Available models: {}",
                id,
                available.join(", ")
            ),
        }
    }
}

impl StdError for CatalogError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CatalogError::Parse(source) => Some(source),
            CatalogError::UnknownModel { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelDescriptor>,
}

impl ModelCatalog {
    /// Load the catalog shipped with the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        const CATALOG_CONTENT: &str = include_str!("../builtin_models.toml");
        Self::from_toml(CATALOG_CONTENT)
    }

    pub fn from_toml(contents: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(contents).map_err(CatalogError::Parse)?;
        Ok(Self {
            models: file.models,
        })
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    /// Find a model by id (case-insensitive)
    pub fn find(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id.eq_ignore_ascii_case(id))
    }

    pub fn require(&self, id: &str) -> Result<&ModelDescriptor, CatalogError> {
        self.find(id).ok_or_else(|| CatalogError::UnknownModel {
            id: id.to_string(),
            available: self.models.iter().map(|m| m.id.clone()).collect(),
        })
    }

    /// Provider names in catalog order, without duplicates
    pub fn providers(&self) -> Vec<&str> {
        let mut providers: Vec<&str> = Vec::new();
        for model in &self.models {
            if !providers.contains(&model.provider.as_str()) {
                providers.push(model.provider.as_str());
            }
        }
        providers
    }

    pub fn models_for_provider<'a>(
        &'a self,
        provider: &'a str,
    ) -> impl Iterator<Item = &'a ModelDescriptor> + 'a {
        self.models
            .iter()
            .filter(move |m| m.provider.eq_ignore_ascii_case(provider))
    }
}

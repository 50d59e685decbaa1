use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::catalog::DEFAULT_MODEL_ID;
use crate::core::usage::{AccessTier, UsageMeter, DEFAULT_PREMIUM_BUDGET};

pub const ENV_BASE_URL: &str = "AIHUB_BASE_URL";
pub const ENV_PROJECT_ID: &str = "AIHUB_PROJECT_ID";
pub const ENV_PROJECT_GROUP_ID: &str = "AIHUB_PROJECT_GROUP_ID";

/// A persona defined in the config file; ids are assigned at load time.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PersonaEntry {
    pub name: String,
    pub personality: String,
    #[serde(default)]
    pub instructions: String,
}

/// Where catalog endpoints are forwarded and which identifiers ride along.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct RoutingConfig {
    /// Backend that serves the integration endpoints
    pub base_url: Option<String>,
    /// Path prefix that is rewritten onto the backend (default `/integrations/`)
    pub path_prefix: Option<String>,
    pub project_id: Option<String>,
    pub project_group_id: Option<String>,
}

impl RoutingConfig {
    /// Overlay values from the environment. `lookup` is usually
    /// `std::env::var(..).ok()`; tests pass a map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(base_url) = non_empty(ENV_BASE_URL) {
            self.base_url = Some(base_url);
        }
        if let Some(project_id) = non_empty(ENV_PROJECT_ID) {
            self.project_id = Some(project_id);
        }
        if let Some(group_id) = non_empty(ENV_PROJECT_GROUP_ID) {
            self.project_group_id = Some(group_id);
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Model selected when a session starts (catalog id)
    pub default_model: Option<String>,
    /// Persona selected when a session starts (id or name)
    pub default_persona: Option<String>,
    /// Starting access tier ("free" or "premium")
    pub tier: Option<AccessTier>,
    /// Premium calls allowed on the free tier
    pub premium_budget: Option<i32>,
    /// Include the built-in personas shipped with the binary
    pub builtin_personas: Option<bool>,
    /// Additional personas available in every session
    #[serde(default)]
    pub personas: Vec<PersonaEntry>,
    #[serde(default)]
    pub routing: RoutingConfig,
}

impl Config {
    pub fn default_model_id(&self) -> &str {
        self.default_model.as_deref().unwrap_or(DEFAULT_MODEL_ID)
    }

    pub fn usage_meter(&self) -> UsageMeter {
        UsageMeter::new(
            self.tier.unwrap_or_default(),
            self.premium_budget.unwrap_or(DEFAULT_PREMIUM_BUDGET),
        )
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

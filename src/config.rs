use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::calls::CallError;

/// Tunables for the call coordinator. Every field has a default, so a config
/// file only needs the values it overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallHandlerConfig {
    /// Joined members a room needs before a call can be placed in it.
    pub required_members: usize,
    pub timeout_title: String,
    pub timeout_description: String,
    pub dismiss_label: String,
}

impl Default for CallHandlerConfig {
    fn default() -> Self {
        Self {
            required_members: 2,
            timeout_title: "Call Timeout".to_string(),
            timeout_description: "The remote side failed to pick up.".to_string(),
            dismiss_label: "OK".to_string(),
        }
    }
}

impl CallHandlerConfig {
    pub fn from_json(json: &str) -> Result<Self, CallError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CallError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CallError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CallError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), CallError> {
        if self.required_members < 2 {
            return Err(CallError::Config(format!(
                "required_members must be at least 2, got {}",
                self.required_members
            )));
        }
        Ok(())
    }
}

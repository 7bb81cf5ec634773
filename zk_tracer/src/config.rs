use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

use crate::error::HubError;

/// Maximum number of stack operations a single instruction may perform
/// (seven pops and one push for `CALL`).
pub const MAX_STACK_OPERATIONS: usize = 8;

/// Default distance between the stack stamps of two consecutive hub stamps.
pub const DEFAULT_STACK_STAMP_SPACING: usize = 8;

/// EVM operand stack limit.
pub const DEFAULT_MAX_STACK_HEIGHT: usize = 1024;

/// EIP-170 deployed code size limit.
pub const DEFAULT_MAX_CODE_SIZE: usize = 24_576;

const_assert!(DEFAULT_STACK_STAMP_SPACING >= MAX_STACK_OPERATIONS);

/// Tunables of the hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Stack operations of hub stamp `s` are stamped in
    /// `[s * spacing, (s + 1) * spacing)`.
    pub stack_stamp_spacing: usize,
    pub max_stack_height: usize,
    pub max_code_size: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            stack_stamp_spacing: DEFAULT_STACK_STAMP_SPACING,
            max_stack_height: DEFAULT_MAX_STACK_HEIGHT,
            max_code_size: DEFAULT_MAX_CODE_SIZE,
        }
    }
}

impl HubConfig {
    /// Parses a JSON configuration, missing fields taking their default
    /// value.
    pub fn from_json(json: &str) -> Result<Self, HubError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| HubError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HubError> {
        if self.stack_stamp_spacing < MAX_STACK_OPERATIONS {
            return Err(HubError::InvalidConfig(format!(
                "stack stamp spacing {} is below {MAX_STACK_OPERATIONS}",
                self.stack_stamp_spacing
            )));
        }
        if self.max_stack_height == 0 {
            return Err(HubError::InvalidConfig(
                "maximum stack height must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = HubConfig::from_json(r#"{ "max_code_size": 49152 }"#).unwrap();
        assert_eq!(config.max_code_size, 49_152);
        assert_eq!(config.stack_stamp_spacing, DEFAULT_STACK_STAMP_SPACING);
        assert_eq!(config.max_stack_height, DEFAULT_MAX_STACK_HEIGHT);
    }

    #[test]
    fn narrow_stamp_spacing_is_rejected() {
        let err = HubConfig::from_json(r#"{ "stack_stamp_spacing": 4 }"#).unwrap_err();
        assert!(matches!(err, HubError::InvalidConfig(_)));
    }
}

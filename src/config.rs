//! Session configuration, loaded from TOML.

use std::path::Path;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::PieceKind;
use crate::error::ConfigError;
use crate::models::game::START_FEN;

/// What to do when a pawn reaches the last rank. Occupancy cannot tell
/// which piece was put down, so the choice comes from here or the operator.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PromotionPolicy {
    /// Promote immediately, to a piece supplied beforehand or else `piece`
    Auto { piece: PieceKind },
    /// Wait for `supply_promotion_choice`
    AwaitChoice,
}

impl Default for PromotionPolicy {
    fn default() -> Self {
        PromotionPolicy::Auto {
            piece: PieceKind::Queen,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Position the first game starts from
    pub start_fen: String,
    pub promotion: PromotionPolicy,
    /// Allow `confirm` to commit a capture whose destination never toggled
    pub capture_fallback: bool,
    /// Halt a pending action older than this. Unset means no limit.
    pub pending_timeout_ms: Option<u64>,
    /// Render the board from black's side
    pub flip_board: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_fen: START_FEN.to_string(),
            promotion: PromotionPolicy::default(),
            capture_fallback: true,
            pending_timeout_ms: None,
            flip_board: false,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SessionConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let PromotionPolicy::Auto { piece } = self.promotion {
            if !piece.is_promotion_piece() {
                return Err(ConfigError::Invalid {
                    message: format!("cannot promote to {}", piece),
                });
            }
        }
        if self.pending_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                message: "pending_timeout_ms must be positive".to_string(),
            });
        }
        if self.start_fen.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "start_fen is empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn pending_timeout(&self) -> Option<Duration> {
        self.pending_timeout_ms.map(Duration::from_millis)
    }
}

/// JSON schema of the config file
pub fn config_schema() -> schemars::Schema {
    schemars::schema_for!(SessionConfig)
}

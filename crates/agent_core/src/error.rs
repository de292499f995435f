//! Error taxonomy for the agent core.
//!
//! Errors fall into three buckets, mirroring how failures were triaged in
//! the reference design: protocol/inventory/invariant violations are
//! fatal and propagate all the way out, planning failures are absorbed by
//! their caller (the scheduler just tries again next tick), and anything
//! merely unexpected is logged and skipped rather than raised.

use crate::geometry::Pos;
use crate::recipe::RecipeRegistryError;
use thiserror::Error;

/// Fatal errors: the agent cannot continue in its current state once one
/// of these occurs. Callers should propagate these with `?` rather than
/// attempt to recover locally.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("malformed telemetry packet on tick {tick}: {reason}")]
    Protocol { tick: u64, reason: String },

    #[error("inventory desync for {owner}: claimed {claimed} but only {available} available")]
    InventoryDesync { owner: String, claimed: u64, available: u64 },

    #[error("internal invariant violated: {0}")]
    Invariant(String),

    #[error("no recipe registered with id {0:?}")]
    UnknownRecipe(String),

    #[error("recipe {recipe:?} names unknown station {station:?}")]
    UnknownStation { recipe: String, station: String },

    #[error("config error: {0}")]
    Config(#[from] ron::de::SpannedError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("recipe registry error: {0}")]
    RecipeRegistry(#[from] RecipeRegistryError),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// A planning attempt that found no viable result. Not an error: the
/// scheduler or pathfinder simply has nothing to offer this tick and
/// will be asked again later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanFailure {
    NoPathFound { from: Pos, to: Pos },
    NoTaskAvailable,
    InsufficientItems { missing: Vec<(String, u64)> },
}

/// Logs a recoverable warning in the style used throughout the agent:
/// printed to stderr and otherwise ignored. Never used for anything a
/// caller needs to branch on.
pub fn warn(message: impl AsRef<str>) {
    eprintln!("warning: {}", message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_error_formats_message() {
        let err = AgentError::Invariant("claims exceeded amount".to_string());
        assert_eq!(err.to_string(), "internal invariant violated: claims exceeded amount");
    }
}

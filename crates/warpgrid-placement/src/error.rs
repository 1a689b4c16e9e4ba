//! Placement error types.

use thiserror::Error;

use crate::selector::SelectorError;

/// Errors that abort a scoring pass.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("invalid label selector: {0}")]
    InvalidSelector(#[from] SelectorError),

    #[error("state error: {0}")]
    State(#[from] warpgrid_state::StateError),

    #[error("invalid scoring config: {0}")]
    Config(String),
}

pub type PlacementResult<T> = Result<T, PlacementError>;

//! Typed errors for the task-board core.
//!
//! `BoardError` is what every store operator returns. The HTTP layer folds the
//! not-found family and `InvalidMove` into a single 404 signal; the variants
//! stay distinct here so callers and logs can tell them apart.

use thiserror::Error;

/// Errors from the board store and its operators.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Board {id} not found")]
    BoardNotFound { id: String },

    #[error("Column {id} not found")]
    ColumnNotFound { id: String },

    #[error("Card {id} not found")]
    CardNotFound { id: String },

    #[error("Card {card_id} cannot move to column {target_column_id} on a different board")]
    InvalidMove {
        card_id: String,
        target_column_id: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

impl BoardError {
    /// True for the variants callers see as "not found or invalid".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BoardError::BoardNotFound { .. }
                | BoardError::ColumnNotFound { .. }
                | BoardError::CardNotFound { .. }
                | BoardError::InvalidMove { .. }
        )
    }
}

impl From<rusqlite::Error> for BoardError {
    fn from(err: rusqlite::Error) -> Self {
        BoardError::Database(err.into())
    }
}

pub type BoardResult<T> = std::result::Result<T, BoardError>;

//! Same-board check for card moves.

use rusqlite::{Connection, OptionalExtension, params};

use super::db::query_column;
use super::models::{Card, Column};
use crate::errors::{BoardError, BoardResult};

/// Confirm `card` may move into `target_column_id`.
///
/// The reference point is the board of the card's *current* column: a move
/// is allowed only when the target column lives on that same board.
/// Returns the resolved target column on success.
pub fn validate_move(
    conn: &Connection,
    card: &Card,
    target_column_id: &str,
) -> BoardResult<Column> {
    let target = query_column(conn, target_column_id)?.ok_or_else(|| {
        tracing::warn!(
            card_id = %card.id,
            target_column_id,
            "Move rejected: target column not found"
        );
        BoardError::ColumnNotFound {
            id: target_column_id.to_string(),
        }
    })?;

    let current_board: String = conn
        .query_row(
            "SELECT board_id FROM columns WHERE id = ?1",
            params![card.column_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| BoardError::ColumnNotFound {
            id: card.column_id.clone(),
        })?;

    if target.board_id != current_board {
        tracing::warn!(
            card_id = %card.id,
            from_board = %current_board,
            to_board = %target.board_id,
            "Move rejected: target column belongs to a different board"
        );
        return Err(BoardError::InvalidMove {
            card_id: card.id.clone(),
            target_column_id: target.id,
        });
    }

    Ok(target)
}

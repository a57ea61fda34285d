//! Append-position allocation for ordered siblings.
//!
//! Columns are ordered within a board and cards within a column. New
//! children always go to the end of their parent, and positions are never
//! renumbered afterwards, so a delete can leave a gap in the sequence.
//!
//! Allocation is a read followed by a write. It must run inside the same
//! immediate transaction as the insert/update that uses the result; see
//! `BoardDb::immediate`.

use rusqlite::{Connection, params};

/// The container a new child is appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent<'a> {
    /// Columns of a board.
    Board(&'a str),
    /// Cards of a column.
    Column(&'a str),
}

impl Parent<'_> {
    fn query(&self) -> &'static str {
        match self {
            Parent::Board(_) => {
                "SELECT COALESCE(MAX(position), -1) + 1 FROM columns WHERE board_id = ?1"
            }
            Parent::Column(_) => {
                "SELECT COALESCE(MAX(position), -1) + 1 FROM cards WHERE column_id = ?1"
            }
        }
    }

    fn id(&self) -> &str {
        match self {
            Parent::Board(id) | Parent::Column(id) => id,
        }
    }
}

/// Next free append position under `parent`.
///
/// For a parent that has only ever been appended to this is the sibling
/// count. After deletes it stays one past the highest surviving position,
/// which keeps positions unique without renumbering.
pub fn next_position(conn: &Connection, parent: Parent<'_>) -> rusqlite::Result<i64> {
    let position: i64 = conn.query_row(parent.query(), params![parent.id()], |row| row.get(0))?;
    tracing::debug!(?parent, position, "Allocated append position");
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::db::BoardDb;
    use anyhow::Result;

    #[test]
    fn test_empty_board_starts_at_zero() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Empty")?;
        assert_eq!(next_position(db.connection(), Parent::Board(&board.id))?, 0);
        Ok(())
    }

    #[test]
    fn test_unknown_parent_starts_at_zero() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        assert_eq!(next_position(db.connection(), Parent::Column("nope"))?, 0);
        Ok(())
    }

    #[test]
    fn test_position_follows_sibling_count() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Counting")?;
        let column = db.create_column(&board.id, "To Do")?;

        for expected in 0..4 {
            assert_eq!(
                next_position(db.connection(), Parent::Column(&column.id))?,
                expected
            );
            db.create_card(&column.id, &format!("Card {}", expected), None)?;
        }
        Ok(())
    }

    #[test]
    fn test_parents_are_scoped_independently() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Scoped")?;
        let todo = db.create_column(&board.id, "To Do")?;
        let done = db.create_column(&board.id, "Done")?;
        db.create_card(&todo.id, "A", None)?;
        db.create_card(&todo.id, "B", None)?;

        assert_eq!(next_position(db.connection(), Parent::Column(&todo.id))?, 2);
        assert_eq!(next_position(db.connection(), Parent::Column(&done.id))?, 0);
        assert_eq!(next_position(db.connection(), Parent::Board(&board.id))?, 2);
        Ok(())
    }

    #[test]
    fn test_gap_does_not_reuse_highest_position() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Gaps")?;
        let column = db.create_column(&board.id, "To Do")?;
        let first = db.create_card(&column.id, "first", None)?;
        db.create_card(&column.id, "second", None)?;
        db.create_card(&column.id, "third", None)?;

        db.delete_card(&first.id)?;

        // Two cards remain (1 and 2); the next slot is past the highest one.
        assert_eq!(next_position(db.connection(), Parent::Column(&column.id))?, 3);
        Ok(())
    }
}

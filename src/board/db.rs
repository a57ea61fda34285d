use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use uuid::Uuid;

use super::models::*;
use super::ownership;
use super::position::{self, Parent};
use crate::errors::{BoardError, BoardResult};

/// How long a writer waits for another connection's write lock before
/// giving up with `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Async-safe handle to the board database.
///
/// Wraps `BoardDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O
/// never ties up async worker threads. The mutex also serializes every
/// operator issued by this process.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<BoardDb>>,
}

impl DbHandle {
    pub fn new(db: BoardDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> BoardResult<R>
    where
        F: FnOnce(&BoardDb) -> BoardResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| BoardError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .map_err(|e| BoardError::Database(anyhow::anyhow!("DB task panicked: {}", e)))?
    }
}

pub struct BoardDb {
    conn: Connection,
}

impl BoardDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.conn
            .busy_timeout(BUSY_TIMEOUT)
            .context("Failed to set busy timeout")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS boards (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS columns (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    position INTEGER NOT NULL DEFAULT 0,
                    board_id TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS cards (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT,
                    position INTEGER NOT NULL DEFAULT 0,
                    column_id TEXT NOT NULL REFERENCES columns(id) ON DELETE CASCADE
                );

                CREATE UNIQUE INDEX IF NOT EXISTS idx_columns_board_position
                    ON columns(board_id, position);
                CREATE UNIQUE INDEX IF NOT EXISTS idx_cards_column_position
                    ON cards(column_id, position);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    /// Begin a transaction that takes the write lock up front.
    ///
    /// Position allocation reads the siblings and then writes, so two
    /// writers must never both be between those steps. `BEGIN IMMEDIATE`
    /// makes a second connection wait (up to `BUSY_TIMEOUT`) at `BEGIN`.
    /// Dropping the transaction without `commit` rolls it back.
    fn immediate(&self) -> BoardResult<Transaction<'_>> {
        // Safety: DbHandle's Mutex already guarantees single-threaded access
        // to this connection, and operators never nest transactions.
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    // ── Boards ────────────────────────────────────────────────────────

    pub fn create_board(&self, name: &str) -> BoardResult<Board> {
        let board = Board {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        self.conn.execute(
            "INSERT INTO boards (id, name) VALUES (?1, ?2)",
            params![board.id, board.name],
        )?;
        tracing::info!(board_id = %board.id, name = %board.name, "Created board");
        Ok(board)
    }

    /// All boards. Order is insertion order but is not part of the contract.
    pub fn list_boards(&self) -> BoardResult<Vec<Board>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM boards ORDER BY rowid")?;
        let rows = stmt.query_map([], board_from_row)?;
        let mut boards = Vec::new();
        for row in rows {
            boards.push(row?);
        }
        Ok(boards)
    }

    pub fn get_board(&self, id: &str) -> BoardResult<Option<Board>> {
        Ok(query_board(&self.conn, id)?)
    }

    /// Delete a board together with its columns and their cards.
    pub fn delete_board(&self, id: &str) -> BoardResult<()> {
        let count = self
            .conn
            .execute("DELETE FROM boards WHERE id = ?1", params![id])?;
        if count == 0 {
            return Err(BoardError::BoardNotFound { id: id.to_string() });
        }
        tracing::info!(board_id = %id, "Deleted board");
        Ok(())
    }

    /// Board with its columns and cards, both in ascending position order.
    pub fn get_board_detail(&self, id: &str) -> BoardResult<BoardDetail> {
        // A deferred transaction gives the three reads one consistent snapshot.
        let tx = self.conn.unchecked_transaction()?;

        let board = query_board(&tx, id)?.ok_or_else(|| BoardError::BoardNotFound {
            id: id.to_string(),
        })?;

        let columns = {
            let mut stmt = tx.prepare(
                "SELECT id, name, board_id, position FROM columns
                 WHERE board_id = ?1 ORDER BY position",
            )?;
            let rows = stmt.query_map(params![id], column_from_row)?;
            let mut columns = Vec::new();
            for row in rows {
                columns.push(row?);
            }
            columns
        };

        let mut cards_by_column: HashMap<String, Vec<Card>> = HashMap::new();
        {
            let mut stmt = tx.prepare(
                "SELECT c.id, c.title, c.description, c.column_id, c.position
                 FROM cards c JOIN columns col ON c.column_id = col.id
                 WHERE col.board_id = ?1
                 ORDER BY c.position",
            )?;
            let rows = stmt.query_map(params![id], card_from_row)?;
            for row in rows {
                let card = row?;
                cards_by_column
                    .entry(card.column_id.clone())
                    .or_default()
                    .push(card);
            }
        }
        tx.finish()?;

        let columns = columns
            .into_iter()
            .map(|column| {
                let cards = cards_by_column.remove(&column.id).unwrap_or_default();
                ColumnWithCards { column, cards }
            })
            .collect();

        Ok(BoardDetail {
            id: board.id,
            name: board.name,
            columns,
        })
    }

    // ── Columns ───────────────────────────────────────────────────────

    /// Append a new column to the end of a board.
    pub fn create_column(&self, board_id: &str, name: &str) -> BoardResult<Column> {
        let tx = self.immediate()?;
        if query_board(&tx, board_id)?.is_none() {
            return Err(BoardError::BoardNotFound {
                id: board_id.to_string(),
            });
        }

        let column = Column {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            board_id: board_id.to_string(),
            position: position::next_position(&tx, Parent::Board(board_id))?,
        };
        tx.execute(
            "INSERT INTO columns (id, name, position, board_id) VALUES (?1, ?2, ?3, ?4)",
            params![column.id, column.name, column.position, column.board_id],
        )?;
        tx.commit()?;

        tracing::info!(
            column_id = %column.id,
            board_id = %column.board_id,
            position = column.position,
            "Created column"
        );
        Ok(column)
    }

    pub fn get_column(&self, id: &str) -> BoardResult<Option<Column>> {
        Ok(query_column(&self.conn, id)?)
    }

    /// Delete a column and its cards. Sibling columns keep their positions.
    pub fn delete_column(&self, id: &str) -> BoardResult<()> {
        let count = self
            .conn
            .execute("DELETE FROM columns WHERE id = ?1", params![id])?;
        if count == 0 {
            return Err(BoardError::ColumnNotFound { id: id.to_string() });
        }
        tracing::info!(column_id = %id, "Deleted column");
        Ok(())
    }

    // ── Cards ─────────────────────────────────────────────────────────

    /// Append a new card to the end of a column.
    pub fn create_card(
        &self,
        column_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> BoardResult<Card> {
        let tx = self.immediate()?;
        if query_column(&tx, column_id)?.is_none() {
            return Err(BoardError::ColumnNotFound {
                id: column_id.to_string(),
            });
        }

        let card = Card {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            column_id: column_id.to_string(),
            position: position::next_position(&tx, Parent::Column(column_id))?,
        };
        tx.execute(
            "INSERT INTO cards (id, title, description, position, column_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                card.id,
                card.title,
                card.description,
                card.position,
                card.column_id
            ],
        )?;
        tx.commit()?;

        tracing::info!(
            card_id = %card.id,
            column_id = %card.column_id,
            position = card.position,
            "Created card"
        );
        Ok(card)
    }

    pub fn get_card(&self, id: &str) -> BoardResult<Option<Card>> {
        Ok(query_card(&self.conn, id)?)
    }

    /// Apply only the supplied fields. Column and position never change here.
    pub fn update_card(&self, id: &str, changes: &CardChanges) -> BoardResult<Card> {
        let tx = self.immediate()?;
        let mut card = query_card(&tx, id)?.ok_or_else(|| BoardError::CardNotFound {
            id: id.to_string(),
        })?;

        if let Some(title) = &changes.title {
            tx.execute(
                "UPDATE cards SET title = ?1 WHERE id = ?2",
                params![title, id],
            )?;
            card.title = title.clone();
        }
        if let Some(description) = &changes.description {
            tx.execute(
                "UPDATE cards SET description = ?1 WHERE id = ?2",
                params![description, id],
            )?;
            card.description = Some(description.clone());
        }

        tx.commit()?;
        tracing::info!(card_id = %id, "Updated card");
        Ok(card)
    }

    /// Remove a card. Remaining siblings keep their positions.
    pub fn delete_card(&self, id: &str) -> BoardResult<()> {
        let count = self
            .conn
            .execute("DELETE FROM cards WHERE id = ?1", params![id])?;
        if count == 0 {
            return Err(BoardError::CardNotFound { id: id.to_string() });
        }
        tracing::info!(card_id = %id, "Deleted card");
        Ok(())
    }

    /// Move a card to the end of another column on the same board.
    ///
    /// The card lands at the next append position of the target column.
    /// Cards left behind in the source column are not renumbered. On any
    /// rejection the transaction rolls back and the card is unchanged.
    pub fn move_card(&self, card_id: &str, target_column_id: &str) -> BoardResult<Card> {
        let tx = self.immediate()?;
        let mut card = query_card(&tx, card_id)?.ok_or_else(|| BoardError::CardNotFound {
            id: card_id.to_string(),
        })?;

        let target = ownership::validate_move(&tx, &card, target_column_id)?;
        let position = position::next_position(&tx, Parent::Column(&target.id))?;
        tx.execute(
            "UPDATE cards SET column_id = ?1, position = ?2 WHERE id = ?3",
            params![target.id, position, card_id],
        )?;
        tx.commit()?;

        tracing::info!(
            card_id = %card_id,
            from_column = %card.column_id,
            to_column = %target.id,
            position,
            "Moved card"
        );
        card.column_id = target.id;
        card.position = position;
        Ok(card)
    }
}

// ── Row helpers ───────────────────────────────────────────────────────

fn board_from_row(row: &Row<'_>) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn column_from_row(row: &Row<'_>) -> rusqlite::Result<Column> {
    Ok(Column {
        id: row.get(0)?,
        name: row.get(1)?,
        board_id: row.get(2)?,
        position: row.get(3)?,
    })
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        column_id: row.get(3)?,
        position: row.get(4)?,
    })
}

fn query_board(conn: &Connection, id: &str) -> rusqlite::Result<Option<Board>> {
    conn.query_row(
        "SELECT id, name FROM boards WHERE id = ?1",
        params![id],
        board_from_row,
    )
    .optional()
}

pub(crate) fn query_column(conn: &Connection, id: &str) -> rusqlite::Result<Option<Column>> {
    conn.query_row(
        "SELECT id, name, board_id, position FROM columns WHERE id = ?1",
        params![id],
        column_from_row,
    )
    .optional()
}

fn query_card(conn: &Connection, id: &str) -> rusqlite::Result<Option<Card>> {
    conn.query_row(
        "SELECT id, title, description, column_id, position FROM cards WHERE id = ?1",
        params![id],
        card_from_row,
    )
    .optional()
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(cards: &[Card]) -> Vec<i64> {
        cards.iter().map(|c| c.position).collect()
    }

    #[test]
    fn test_create_database_and_run_migrations() -> Result<()> {
        let db = BoardDb::new_in_memory()?;

        let table_count: i32 = db.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('boards', 'columns', 'cards')",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(table_count, 3, "Expected 3 tables to exist");

        let index_count: i32 = db.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name IN ('idx_columns_board_position', 'idx_cards_column_position')",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(index_count, 2, "Expected 2 position indexes to exist");

        Ok(())
    }

    #[test]
    fn test_reopening_file_database_keeps_data() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("board.db");

        let id = {
            let db = BoardDb::new(&path)?;
            db.create_board("Persistent")?.id
        };

        let db = BoardDb::new(&path)?;
        let board = db.get_board(&id)?.expect("board should survive reopen");
        assert_eq!(board.name, "Persistent");
        Ok(())
    }

    #[test]
    fn test_create_and_list_boards() -> Result<()> {
        let db = BoardDb::new_in_memory()?;

        let alpha = db.create_board("Project Alpha")?;
        db.create_board("Project Beta")?;
        assert!(!alpha.id.is_empty());

        let boards = db.list_boards()?;
        assert_eq!(boards.len(), 2);
        assert!(boards.iter().any(|b| b.name == "Project Alpha"));
        assert!(boards.iter().any(|b| b.name == "Project Beta"));

        let fetched = db.get_board(&alpha.id)?.expect("board should exist");
        assert_eq!(fetched, alpha);
        Ok(())
    }

    #[test]
    fn test_board_ids_are_unique() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let a = db.create_board("Same")?;
        let b = db.create_board("Same")?;
        assert_ne!(a.id, b.id);
        Ok(())
    }

    #[test]
    fn test_column_positions_follow_append_order() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Board")?;

        let names = ["To Do", "Doing", "Review", "Done"];
        for (expected, name) in names.iter().enumerate() {
            let column = db.create_column(&board.id, name)?;
            assert_eq!(column.position, expected as i64);
            assert_eq!(column.board_id, board.id);
        }
        Ok(())
    }

    #[test]
    fn test_create_column_missing_board() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let err = db.create_column("invalid-uuid", "To Do").unwrap_err();
        assert!(matches!(err, BoardError::BoardNotFound { ref id } if id == "invalid-uuid"));
        Ok(())
    }

    #[test]
    fn test_n_appends_yield_zero_to_n_minus_one() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Board")?;
        let column = db.create_column(&board.id, "To Do")?;

        let mut cards = Vec::new();
        for i in 0..10 {
            cards.push(db.create_card(&column.id, &format!("Task {}", i), None)?);
        }
        assert_eq!(positions(&cards), (0..10).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_create_card_with_and_without_description() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Board")?;
        let column = db.create_column(&board.id, "In Progress")?;

        let with = db.create_card(&column.id, "Task 1", Some("Desc"))?;
        assert_eq!(with.description.as_deref(), Some("Desc"));
        assert_eq!(with.column_id, column.id);

        let without = db.create_card(&column.id, "Task 2", None)?;
        assert!(without.description.is_none());

        let fetched = db.get_card(&with.id)?.expect("card should exist");
        assert_eq!(fetched, with);
        Ok(())
    }

    #[test]
    fn test_create_card_missing_column() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let err = db.create_card("non-existent-id", "Task", None).unwrap_err();
        assert!(matches!(err, BoardError::ColumnNotFound { .. }));
        Ok(())
    }

    #[test]
    fn test_update_title_only_keeps_description() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Board")?;
        let column = db.create_column(&board.id, "To Do")?;
        let card = db.create_card(&column.id, "Old title", Some("Keep me"))?;

        let updated = db.update_card(
            &card.id,
            &CardChanges {
                title: Some("New title".into()),
                description: None,
            },
        )?;
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.description.as_deref(), Some("Keep me"));

        let fetched = db.get_card(&card.id)?.expect("card should exist");
        assert_eq!(fetched, updated);
        Ok(())
    }

    #[test]
    fn test_update_description_only_keeps_title() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Board")?;
        let column = db.create_column(&board.id, "To Do")?;
        let card = db.create_card(&column.id, "Stable title", None)?;

        let updated = db.update_card(
            &card.id,
            &CardChanges {
                title: None,
                description: Some("Now described".into()),
            },
        )?;
        assert_eq!(updated.title, "Stable title");
        assert_eq!(updated.description.as_deref(), Some("Now described"));
        assert_eq!(updated.position, card.position);
        assert_eq!(updated.column_id, card.column_id);
        Ok(())
    }

    #[test]
    fn test_update_missing_card() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let err = db
            .update_card("non-existent-id", &CardChanges::default())
            .unwrap_err();
        assert!(matches!(err, BoardError::CardNotFound { .. }));
        Ok(())
    }

    #[test]
    fn test_delete_card_leaves_gap() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Board")?;
        let column = db.create_column(&board.id, "To Do")?;
        let a = db.create_card(&column.id, "a", None)?;
        let b = db.create_card(&column.id, "b", None)?;
        let c = db.create_card(&column.id, "c", None)?;

        db.delete_card(&b.id)?;
        assert!(db.get_card(&b.id)?.is_none());

        // Survivors are not renumbered.
        assert_eq!(db.get_card(&a.id)?.unwrap().position, 0);
        assert_eq!(db.get_card(&c.id)?.unwrap().position, 2);

        // The next append still gets a fresh slot.
        let d = db.create_card(&column.id, "d", None)?;
        assert_eq!(d.position, 3);

        let err = db.delete_card(&b.id).unwrap_err();
        assert!(matches!(err, BoardError::CardNotFound { .. }));
        Ok(())
    }

    #[test]
    fn test_move_card_appends_to_target() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Board")?;
        let todo = db.create_column(&board.id, "To Do")?;
        let done = db.create_column(&board.id, "Done")?;
        db.create_card(&done.id, "already done 1", None)?;
        db.create_card(&done.id, "already done 2", None)?;
        let first = db.create_card(&todo.id, "first", None)?;
        let mover = db.create_card(&todo.id, "Move me", None)?;
        let last = db.create_card(&todo.id, "last", None)?;

        let moved = db.move_card(&mover.id, &done.id)?;
        assert_eq!(moved.column_id, done.id);
        assert_eq!(moved.position, 2, "Card lands after the two existing cards");

        let fetched = db.get_card(&mover.id)?.expect("card should exist");
        assert_eq!(fetched, moved);

        // The source column keeps its positions, gap and all.
        assert_eq!(db.get_card(&first.id)?.unwrap().position, 0);
        assert_eq!(db.get_card(&last.id)?.unwrap().position, 2);
        Ok(())
    }

    #[test]
    fn test_move_card_into_empty_column_gets_zero() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Board")?;
        let todo = db.create_column(&board.id, "To Do")?;
        let done = db.create_column(&board.id, "Done")?;
        let card = db.create_card(&todo.id, "Move me", None)?;

        let moved = db.move_card(&card.id, &done.id)?;
        assert_eq!(moved.position, 0);
        Ok(())
    }

    #[test]
    fn test_move_card_within_own_column_goes_to_end() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Board")?;
        let todo = db.create_column(&board.id, "To Do")?;
        let card = db.create_card(&todo.id, "first", None)?;
        db.create_card(&todo.id, "second", None)?;

        let moved = db.move_card(&card.id, &todo.id)?;
        assert_eq!(moved.column_id, todo.id);
        assert_eq!(moved.position, 2);
        Ok(())
    }

    #[test]
    fn test_move_card_to_other_board_is_rejected_and_unchanged() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board1 = db.create_board("Board 1")?;
        let board2 = db.create_board("Board 2")?;
        let col1 = db.create_column(&board1.id, "To Do")?;
        let col2 = db.create_column(&board2.id, "Done")?;
        let card = db.create_card(&col1.id, "Card in Board 1", None)?;

        let err = db.move_card(&card.id, &col2.id).unwrap_err();
        assert!(matches!(err, BoardError::InvalidMove { .. }));
        assert!(err.is_not_found());

        let fetched = db.get_card(&card.id)?.expect("card should exist");
        assert_eq!(fetched.column_id, col1.id);
        assert_eq!(fetched.position, card.position);
        Ok(())
    }

    #[test]
    fn test_move_card_missing_card_or_column() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Board")?;
        let todo = db.create_column(&board.id, "To Do")?;
        let card = db.create_card(&todo.id, "Card", None)?;

        let err = db.move_card(&card.id, "non-existent-column").unwrap_err();
        assert!(matches!(err, BoardError::ColumnNotFound { .. }));
        assert_eq!(db.get_card(&card.id)?.unwrap().column_id, todo.id);

        let err = db.move_card("non-existent-card", &todo.id).unwrap_err();
        assert!(matches!(err, BoardError::CardNotFound { .. }));
        Ok(())
    }

    #[test]
    fn test_delete_board_cascades() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Doomed")?;
        let keep = db.create_board("Survivor")?;
        let todo = db.create_column(&board.id, "To Do")?;
        let done = db.create_column(&board.id, "Done")?;
        let c1 = db.create_card(&todo.id, "a", None)?;
        let c2 = db.create_card(&done.id, "b", None)?;
        let keep_col = db.create_column(&keep.id, "Other")?;
        let keep_card = db.create_card(&keep_col.id, "stays", None)?;

        db.delete_board(&board.id)?;

        assert!(db.get_board(&board.id)?.is_none());
        assert!(db.get_column(&todo.id)?.is_none());
        assert!(db.get_column(&done.id)?.is_none());
        assert!(db.get_card(&c1.id)?.is_none());
        assert!(db.get_card(&c2.id)?.is_none());

        assert!(db.get_column(&keep_col.id)?.is_some());
        assert!(db.get_card(&keep_card.id)?.is_some());

        let err = db.delete_board(&board.id).unwrap_err();
        assert!(matches!(err, BoardError::BoardNotFound { .. }));
        Ok(())
    }

    #[test]
    fn test_delete_column_cascades_and_keeps_sibling_positions() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Board")?;
        let todo = db.create_column(&board.id, "To Do")?;
        let doing = db.create_column(&board.id, "Doing")?;
        let done = db.create_column(&board.id, "Done")?;
        let card = db.create_card(&doing.id, "in flight", None)?;

        db.delete_column(&doing.id)?;
        assert!(db.get_card(&card.id)?.is_none());
        assert_eq!(db.get_column(&todo.id)?.unwrap().position, 0);
        assert_eq!(db.get_column(&done.id)?.unwrap().position, 2);

        let next = db.create_column(&board.id, "Archive")?;
        assert_eq!(next.position, 3);
        Ok(())
    }

    #[test]
    fn test_get_board_detail_orders_columns_and_cards() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("My Board")?;
        let todo = db.create_column(&board.id, "To Do")?;
        let done = db.create_column(&board.id, "Done")?;
        db.create_card(&todo.id, "first", None)?;
        let second = db.create_card(&todo.id, "second", None)?;
        db.create_card(&todo.id, "third", None)?;
        db.move_card(&second.id, &done.id)?;

        let detail = db.get_board_detail(&board.id)?;
        assert_eq!(detail.name, "My Board");
        assert_eq!(detail.columns.len(), 2);
        assert_eq!(detail.columns[0].column.name, "To Do");
        assert_eq!(detail.columns[1].column.name, "Done");

        let todo_titles: Vec<&str> = detail.columns[0]
            .cards
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(todo_titles, vec!["first", "third"]);
        assert_eq!(detail.columns[1].cards.len(), 1);
        assert_eq!(detail.columns[1].cards[0].title, "second");
        Ok(())
    }

    #[test]
    fn test_get_board_detail_empty_and_missing() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Empty")?;
        let detail = db.get_board_detail(&board.id)?;
        assert!(detail.columns.is_empty());

        let err = db.get_board_detail("non-existent-id").unwrap_err();
        assert!(matches!(err, BoardError::BoardNotFound { .. }));
        Ok(())
    }

    #[test]
    fn test_position_index_rejects_duplicate_slot() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Board")?;
        let column = db.create_column(&board.id, "To Do")?;
        db.create_card(&column.id, "taken", None)?;

        let result = db.conn.execute(
            "INSERT INTO cards (id, title, position, column_id) VALUES ('dup', 'dup', 0, ?1)",
            params![column.id],
        );
        assert!(result.is_err(), "Duplicate position must violate the unique index");
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_through_handle_are_unique() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let board = db.create_board("Busy")?;
        let column = db.create_column(&board.id, "To Do")?;
        let handle = DbHandle::new(db);

        let mut tasks = Vec::new();
        for i in 0..20 {
            let handle = handle.clone();
            let column_id = column.id.clone();
            tasks.push(tokio::spawn(async move {
                handle
                    .call(move |db| db.create_card(&column_id, &format!("Task {}", i), None))
                    .await
            }));
        }

        let mut positions = Vec::new();
        for task in tasks {
            positions.push(task.await??.position);
        }
        positions.sort_unstable();
        assert_eq!(positions, (0..20).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_concurrent_appends_across_connections_are_unique() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("shared.db");
        let column_id = {
            let db = BoardDb::new(&path)?;
            let board = db.create_board("Shared")?;
            db.create_column(&board.id, "To Do")?.id
        };

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let path = path.clone();
                let column_id = column_id.clone();
                std::thread::spawn(move || -> Result<Vec<i64>> {
                    let db = BoardDb::new(&path)?;
                    let mut positions = Vec::new();
                    for i in 0..10 {
                        let card =
                            db.create_card(&column_id, &format!("w{} #{}", worker, i), None)?;
                        positions.push(card.position);
                    }
                    Ok(positions)
                })
            })
            .collect();

        let mut positions = Vec::new();
        for worker in workers {
            let result = worker
                .join()
                .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;
            positions.extend(result?);
        }
        positions.sort_unstable();
        assert_eq!(positions, (0..40).collect::<Vec<_>>());
        Ok(())
    }
}

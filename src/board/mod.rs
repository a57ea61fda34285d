//! Task board back-end: boards, ordered columns, ordered cards.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (build_router, start_server)         │
//! │          │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘   JSON   │         │                                        │
//!                       │         │ DbHandle::call()  (blocking pool)      │
//!                       │         v                                        │
//!                       │  db.rs  (BoardDb operators, one txn each)        │
//!                       │         │                                        │
//!                       │         ├─ position.rs   (next append slot)      │
//!                       │         └─ ownership.rs  (same-board moves)      │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! | Module      | Responsibility                                          |
//! |-------------|---------------------------------------------------------|
//! | `models`    | `Board`, `Column`, `Card`, nested `BoardDetail` view    |
//! | `db`        | SQLite schema, `BoardDb` operators, `DbHandle`          |
//! | `position`  | Append-position allocation within a parent              |
//! | `ownership` | Rejects moves to a column on another board              |
//! | `api`       | axum handlers, request shapes, `ApiError` → HTTP status |
//! | `server`    | Router assembly, CORS, tracing layer, listener          |
//!
//! ## Typical Request Flow (move card)
//!
//! 1. `PATCH /cards/{id}/move` with `newColumnId` or `new_column_id`
//! 2. `api::move_card` → `BoardDb::move_card` inside `BEGIN IMMEDIATE`
//! 3. `ownership::validate_move` checks the target column shares the card's
//!    board; a rejection rolls back and surfaces as 404
//! 4. `position::next_position` picks the end of the target column
//! 5. The card row is updated and the transaction commits

pub mod api;
pub mod db;
pub mod models;
pub mod ownership;
pub mod position;
pub mod server;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Board {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub id: String,
    pub name: String,
    pub board_id: String,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub column_id: String,
    pub position: i64,
}

/// Field changes for a card. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct CardChanges {
    pub title: Option<String>,
    pub description: Option<String>,
}

// API view types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDetail {
    pub id: String,
    pub name: String,
    pub columns: Vec<ColumnWithCards>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnWithCards {
    #[serde(flatten)]
    pub column: Column,
    pub cards: Vec<Card>,
}

//! Composite entities assembled by the construction pass.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::records::{CardRow, ChapterRow, Effect, ItemRow, QuestRow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub id: i32,
    pub name: String,
    pub rare: i32,
    pub resource: String,
    /// `None` when the row's effect id has no matching effect.
    pub effect: Option<Effect>,
}

impl Card {
    pub fn from_row(row: CardRow, effect: Option<Effect>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            rare: row.rare,
            resource: row.resource,
            effect,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: i32,
    pub name: String,
    pub item_type: i32,
    pub resource: String,
    pub effect: Option<Effect>,
}

impl Item {
    pub fn from_row(row: ItemRow, effect: Option<Effect>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            item_type: row.item_type,
            resource: row.resource,
            effect,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quest {
    pub id: i32,
    pub name: String,
    pub resource: String,
    pub chapter_id: i32,
    pub move_point: i32,
}

impl From<QuestRow> for Quest {
    fn from(row: QuestRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            resource: row.resource,
            chapter_id: row.chapter_id,
            move_point: row.move_point,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    pub id: i32,
    pub name: String,
    pub resource: String,
    pub quest_type: i32,
    pub condition: i32,
    /// Quests belonging to this chapter, in quest table order.
    pub quests: Vec<Quest>,
}

impl Chapter {
    pub fn from_row(row: ChapterRow, quests: Vec<Quest>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            resource: row.resource,
            quest_type: row.quest_type,
            condition: row.condition,
            quests,
        }
    }

    /// Returns the ids of this chapter's quests.
    pub fn quest_ids(&self) -> Vec<i32> {
        self.quests.iter().map(|q| q.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameEvent {
    pub id: i32,
    pub name: String,
    pub resource: String,
    pub start_at: NaiveDateTime,
    pub game_end_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
}

/// A localized string keyed by its text key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalizedText {
    pub key: String,
    pub text: String,
}

mod entities;
mod records;

pub use entities::{Card, Chapter, GameEvent, Item, LocalizedText, Quest};
pub use records::{CardRow, ChapterRow, Effect, EventRow, ItemRow, QuestRow, TextRow};

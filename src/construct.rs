//! Construction pass: joins raw tables into composite entities and indexes them.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::index::IndexedTable;
use crate::models::{
    Card, CardRow, Chapter, ChapterRow, Effect, EventRow, GameEvent, Item, ItemRow,
    LocalizedText, Quest, QuestRow, TextRow,
};
use crate::table::{Language, Table};

/// Datetime layouts accepted for event schedules, tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstructError {
    #[error("Invalid timestamp in {table} id {id}, field {field}: '{value}'")]
    InvalidTimestamp {
        table: Table,
        id: i32,
        field: &'static str,
        value: String,
    },
}

/// Row data of every table, as loaded.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub jp_text: Vec<TextRow>,
    pub en_text: Vec<TextRow>,
    pub cards: Vec<CardRow>,
    pub chapters: Vec<ChapterRow>,
    pub quests: Vec<QuestRow>,
    pub events: Vec<EventRow>,
    pub items: Vec<ItemRow>,
    pub effects: Vec<Effect>,
}

impl RawTables {
    fn take_text(&mut self, language: Language) -> Vec<TextRow> {
        match language.text_table() {
            Table::EnText => std::mem::take(&mut self.en_text),
            _ => std::mem::take(&mut self.jp_text),
        }
    }
}

/// Fully built, read-only master data.
#[derive(Debug, Default)]
pub struct MasterTables {
    pub texts: IndexedTable<String, LocalizedText>,
    pub cards: IndexedTable<i32, Card>,
    pub items: IndexedTable<i32, Item>,
    pub chapters: IndexedTable<i32, Chapter>,
    pub quests: IndexedTable<i32, Quest>,
    pub events: IndexedTable<i32, GameEvent>,
    /// Source-ordered lists, duplicates included.
    pub chapter_list: Vec<Chapter>,
    pub quest_list: Vec<Quest>,
    pub event_list: Vec<GameEvent>,
}

/// Runs the construction pass over loaded rows.
///
/// Dangling effect ids resolve to `None`. A malformed event timestamp fails
/// the whole pass.
pub fn build(mut raw: RawTables, language: Language) -> Result<MasterTables, ConstructError> {
    let texts = build_texts(raw.take_text(language));

    let effects = IndexedTable::build(raw.effects, |e: &Effect| Some(e.id));

    let cards = raw
        .cards
        .into_iter()
        .map(|row| {
            let effect = effects.get(&row.effect_id).cloned();
            Card::from_row(row, effect)
        })
        .collect::<Vec<_>>();
    let cards = IndexedTable::build(cards, |c: &Card| Some(c.id));

    let items = raw
        .items
        .into_iter()
        .map(|row| {
            let effect = effects.get(&row.effect_id).cloned();
            Item::from_row(row, effect)
        })
        .collect::<Vec<_>>();
    let items = IndexedTable::build(items, |i: &Item| Some(i.id));

    let event_list = raw
        .events
        .into_iter()
        .map(build_event)
        .collect::<Result<Vec<_>, _>>()?;
    let events = IndexedTable::build(event_list.clone(), |e: &GameEvent| Some(e.id));

    // Quests must be complete before chapters collect them.
    let quest_list: Vec<Quest> = raw.quests.into_iter().map(Quest::from).collect();

    let chapter_list: Vec<Chapter> = raw
        .chapters
        .into_iter()
        .map(|row| {
            let quests = quest_list
                .iter()
                .filter(|q| q.chapter_id == row.id)
                .cloned()
                .collect();
            Chapter::from_row(row, quests)
        })
        .collect();

    let quests = IndexedTable::build(quest_list.clone(), |q: &Quest| Some(q.id));
    let chapters = IndexedTable::build(chapter_list.clone(), |c: &Chapter| Some(c.id));

    tracing::debug!(
        "Constructed {} texts, {} cards, {} items, {} chapters, {} quests, {} events",
        texts.len(),
        cards.len(),
        items.len(),
        chapters.len(),
        quests.len(),
        events.len()
    );

    Ok(MasterTables {
        texts,
        cards,
        items,
        chapters,
        quests,
        events,
        chapter_list,
        quest_list,
        event_list,
    })
}

fn build_texts(rows: Vec<TextRow>) -> IndexedTable<String, LocalizedText> {
    let texts = rows.into_iter().filter_map(|row| match row.key {
        Some(key) if !key.is_empty() => Some(LocalizedText {
            key,
            text: row.text,
        }),
        _ => None,
    });
    IndexedTable::build(texts, |t: &LocalizedText| Some(t.key.clone()))
}

fn build_event(row: EventRow) -> Result<GameEvent, ConstructError> {
    let field = |name: &'static str, value: &str| {
        parse_timestamp(value).ok_or_else(|| ConstructError::InvalidTimestamp {
            table: Table::Event,
            id: row.id,
            field: name,
            value: value.to_string(),
        })
    };

    let start_at = field("startAt", &row.start_at)?;
    let game_end_at = field("gameEndAt", &row.game_end_at)?;
    let end_at = field("endAt", &row.end_at)?;

    Ok(GameEvent {
        id: row.id,
        name: row.name,
        resource: row.resource,
        start_at,
        game_end_at,
        end_at,
    })
}

/// Parses an event timestamp. Offsets are normalized to UTC; date-only values map to midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

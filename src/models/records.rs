//! Flat rows as received from the remote source. No relations are resolved here.

use serde::{Deserialize, Serialize};

/// One localized string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextRow {
    pub key: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardRow {
    pub id: i32,
    pub name: String,
    pub rare: i32,
    pub resource: String,
    pub effect_id: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemRow {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: i32,
    pub resource: String,
    pub effect_id: i32,
}

/// Effect rows are only ever exposed embedded in a card or item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Effect {
    pub id: i32,
    pub name: String,
    pub power: i32,
    pub resource: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChapterRow {
    pub id: i32,
    pub name: String,
    pub resource: String,
    pub quest_type: i32,
    pub condition: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestRow {
    pub id: i32,
    pub name: String,
    pub resource: String,
    pub chapter_id: i32,
    pub move_point: i32,
}

/// Event rows carry their schedule as unparsed strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventRow {
    pub id: i32,
    pub name: String,
    pub resource: String,
    pub start_at: String,
    pub game_end_at: String,
    pub end_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_row_camel_case_fields() {
        let row: CardRow =
            serde_json::from_str(r#"{"id": 1, "name": "Slime", "effectId": 10}"#).unwrap();
        assert_eq!(row.id, 1);
        assert_eq!(row.name, "Slime");
        assert_eq!(row.effect_id, 10);
        assert_eq!(row.rare, 0);
    }

    #[test]
    fn test_item_row_type_field() {
        let row: ItemRow = serde_json::from_str(r#"{"id": 4, "type": 2}"#).unwrap();
        assert_eq!(row.item_type, 2);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let row: QuestRow =
            serde_json::from_str(r#"{"id": 100, "chapterId": 1, "memo": "x"}"#).unwrap();
        assert_eq!(row.chapter_id, 1);
    }

    #[test]
    fn test_text_row_missing_key() {
        let row: TextRow = serde_json::from_str(r#"{"text": "orphan"}"#).unwrap();
        assert!(row.key.is_none());
    }
}

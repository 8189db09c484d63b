//! Table identifiers and the versioned envelope every table is shipped in.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Master data tables known to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    JpText,
    EnText,
    Card,
    Chapter,
    Quest,
    Event,
    Item,
    Effect,
}

impl Table {
    /// Every table loaded by a setup run.
    pub const ALL: [Table; 8] = [
        Table::JpText,
        Table::EnText,
        Table::Card,
        Table::Chapter,
        Table::Quest,
        Table::Event,
        Table::Item,
        Table::Effect,
    ];

    /// Returns the sheet name, used as remote query value and cache file stem.
    pub fn name(&self) -> &'static str {
        match self {
            Table::JpText => "JP_Text",
            Table::EnText => "EN_Text",
            Table::Card => "Card",
            Table::Chapter => "Chapter",
            Table::Quest => "Quest",
            Table::Event => "Event",
            Table::Item => "Item",
            Table::Effect => "Effect",
        }
    }

    /// Returns the cache filename for this table.
    pub fn filename(&self) -> String {
        format!("{}.json", self.name())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// A raw table as served by the remote source and stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEnvelope<T> {
    pub version: i64,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Language whose text table backs localized text lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ja,
    En,
}

impl Language {
    /// Returns the text table holding this language's strings.
    pub fn text_table(&self) -> Table {
        match self {
            Language::Ja => Table::JpText,
            Language::En => Table::EnText,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Ja => write!(f, "ja"),
            Language::En => write!(f, "en"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ja" | "jp" => Ok(Language::Ja),
            "en" => Ok(Language::En),
            _ => Err(format!("Unsupported language: '{}'. Use 'ja' or 'en'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_filename() {
        assert_eq!(Table::JpText.filename(), "JP_Text.json");
        assert_eq!(Table::Card.filename(), "Card.json");
        assert_eq!(Table::Effect.filename(), "Effect.json");
    }

    #[test]
    fn test_all_tables_have_distinct_names() {
        let mut names: Vec<&str> = Table::ALL.iter().map(|t| t.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Table::ALL.len());
    }

    #[test]
    fn test_table_serializes_as_sheet_name() {
        assert_eq!(serde_json::to_string(&Table::JpText).unwrap(), r#""JP_Text""#);
        assert_eq!(
            serde_json::to_value([Table::Card, Table::EnText]).unwrap(),
            serde_json::json!(["Card", "EN_Text"])
        );
    }

    #[test]
    fn test_envelope_missing_data_defaults_to_empty() {
        let env: TableEnvelope<serde_json::Value> =
            serde_json::from_str(r#"{"version": 3}"#).unwrap();
        assert_eq!(env.version, 3);
        assert!(env.data.is_empty());
    }

    #[test]
    fn test_envelope_requires_version() {
        let result: Result<TableEnvelope<serde_json::Value>, _> =
            serde_json::from_str(r#"{"data": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_language_parse() {
        assert_eq!("ja".parse::<Language>().unwrap(), Language::Ja);
        assert_eq!("EN".parse::<Language>().unwrap(), Language::En);
        assert!("fr".parse::<Language>().is_err());
        assert_eq!(Language::En.text_table(), Table::EnText);
    }
}

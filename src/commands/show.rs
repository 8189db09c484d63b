use clap::{Args, Subcommand};
use serde::Serialize;

use super::{open_repository, CommandError, OutputFormat};
use crate::config::Config;
use masterdata::MasterData;

/// Look up master data entries
#[derive(Args)]
pub struct ShowCommand {
    #[command(subcommand)]
    pub command: ShowSubcommand,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text", global = true)]
    format: OutputFormat,
}

#[derive(Subcommand)]
pub enum ShowSubcommand {
    /// Show a card by id
    Card { id: i32 },
    /// Show an item by id
    Item { id: i32 },
    /// Show a chapter and its quests
    Chapter { id: i32 },
    /// Show a quest by id
    Quest { id: i32 },
    /// Show an event by id
    Event { id: i32 },
    /// Show a localized text by key
    Text { key: String },
    /// List all chapters
    Chapters,
    /// List all text keys
    TextKeys,
}

impl ShowCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        let md = open_repository(config)?;
        md.setup(config.use_cache.value).await?;
        self.show(&md)
    }

    fn show(&self, md: &MasterData) -> Result<(), CommandError> {
        match &self.command {
            ShowSubcommand::Card { id } => self.print(md.card(*id), "card", id),
            ShowSubcommand::Item { id } => self.print(md.item(*id), "item", id),
            ShowSubcommand::Chapter { id } => self.print(md.chapter(*id), "chapter", id),
            ShowSubcommand::Quest { id } => self.print(md.quest(*id), "quest", id),
            ShowSubcommand::Event { id } => self.print(md.event(*id), "event", id),
            ShowSubcommand::Text { key } => match md.localized_text(key) {
                Some(text) => {
                    println!("{}", text);
                    Ok(())
                }
                None => {
                    println!("No text found for key: {}", key);
                    Ok(())
                }
            },
            ShowSubcommand::Chapters => {
                match self.format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(md.chapters())?);
                    }
                    OutputFormat::Text => {
                        for chapter in md.chapters() {
                            println!(
                                "{:>5}  {}  ({} quests)",
                                chapter.id,
                                chapter.name,
                                chapter.quests.len()
                            );
                        }
                    }
                }
                Ok(())
            }
            ShowSubcommand::TextKeys => {
                for key in md.text_keys() {
                    println!("{}", key);
                }
                Ok(())
            }
        }
    }

    fn print<T, K>(&self, entry: Option<&T>, kind: &str, key: K) -> Result<(), CommandError>
    where
        T: Serialize + std::fmt::Debug,
        K: std::fmt::Display,
    {
        let Some(entry) = entry else {
            println!("No {} found with id: {}", kind, key);
            return Ok(());
        };

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entry)?),
            OutputFormat::Text => println!("{:#?}", entry),
        }
        Ok(())
    }
}

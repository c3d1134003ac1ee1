use anyhow::{Context, Result};
use clap::Parser;
use entity::achievement::{self, RequirementType};
use indicatif::ProgressBar;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, EntityTrait, NotSet, QueryFilter,
    Schema, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{
    fs::read_to_string,
    sync::atomic::{AtomicBool, Ordering},
};

/// A command line tool for importing achievement definitions into the arcade database.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The database URL
    #[arg(short, long)]
    db_url: String,

    /// The JSON file to import
    #[arg(short, long)]
    json_file: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct RawAchievement {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
    category: String,
    #[serde(default = "default_rarity")]
    rarity: String,
    #[serde(default)]
    points: i32,
    requirement_type: RequirementType,
    requirement_value: i64,
    #[serde(default)]
    game: Option<String>,
}

fn default_rarity() -> String {
    "common".to_owned()
}

static TERMINATE: AtomicBool = AtomicBool::new(false);
#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = ctrlc::set_handler(move || {
        println!("Ctrl+C pressed, exiting...");
        TERMINATE.store(true, Ordering::SeqCst);
    }) {
        println!("Error occurred when setting Ctrl+C handler: {}. You will be unable to stop the program during running gracefully!", e);
    }

    let args = Args::parse();

    println!("Reading JSON data from `{}`", args.json_file);
    let content = read_to_string(&args.json_file)
        .with_context(|| format!("Failed to read JSON file from `{}`", args.json_file))?;

    let raw_achievements: Vec<RawAchievement> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON file from `{}`", args.json_file))?;

    println!("Found {} achievement definitions", raw_achievements.len());

    println!("Connecting to database at `{}`", args.db_url);
    let db = Database::connect(&args.db_url)
        .await
        .with_context(|| format!("Failed to connect to database at `{}`", args.db_url))?;

    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    db.execute(backend.build(schema.create_table_from_entity(achievement::Entity).if_not_exists()))
        .await
        .with_context(|| "Failed to create the achievement table")?;

    println!("Importing achievement definitions into database");
    // start transaction
    let t = db
        .begin()
        .await
        .with_context(|| "Failed to start transaction")?;

    let pb = ProgressBar::new(raw_achievements.len() as u64);
    for raw in raw_achievements {
        if TERMINATE.load(Ordering::SeqCst) {
            // Ask user if he wants to commit or rollback
            let mut input = String::new();
            println!("Commit or rollback the changes? (c/r)");
            std::io::stdin()
                .read_line(&mut input)
                .expect("Failed to read line");
            match input.trim() {
                "c" => {
                    t.commit()
                        .await
                        .with_context(|| "Failed to commit transaction")?;
                    println!("Changes committed");
                }
                "r" => {
                    t.rollback()
                        .await
                        .with_context(|| "Failed to rollback transaction")?;
                    println!("Changes rolled back");
                }
                _ => {
                    println!("Invalid input, changes rolled back");
                    t.rollback()
                        .await
                        .with_context(|| "Failed to rollback transaction")?;
                }
            }
            return Ok(());
        }

        let existing = achievement::Entity::find()
            .filter(achievement::Column::Name.eq(raw.name.as_str()))
            .one(&t)
            .await
            .with_context(|| format!("Error occurred when finding achievement `{}`", raw.name))?;
        if existing.is_some() {
            println!("Achievement `{}` already exists, skipping", raw.name);
            pb.inc(1);
            continue;
        }

        let name = raw.name.clone();
        achievement::ActiveModel {
            id: NotSet,
            name: Set(raw.name),
            description: Set(raw.description),
            icon: Set(raw.icon),
            category: Set(raw.category),
            rarity: Set(raw.rarity),
            points: Set(raw.points),
            requirement_type: Set(raw.requirement_type),
            requirement_value: Set(raw.requirement_value),
            game: Set(raw.game),
        }
        .insert(&t)
        .await
        .with_context(|| format!("Error occurred when inserting achievement `{}`", name))?;
        pb.inc(1);
    }
    pb.finish_with_message("Committing changes");
    t.commit()
        .await
        .with_context(|| "Failed to commit transaction")?;
    println!("Congratulations! All achievement definitions have been imported successfully!");
    Ok(())
}

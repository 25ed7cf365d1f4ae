use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use note_sync::config::AppConfig;
use note_sync::search::TantivyIndex;
use note_sync::storage::postgres::PostgresStorage;
use note_sync::{notifications, NoteData, NoteService, NotesApi};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: note_sync <list | get ID | create TITLE CONTENT | update ID TITLE CONTENT | delete ID | search QUERY | reindex>";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = dotenv() {
        debug!(error = %err, "no .env file loaded");
    }
    let config = AppConfig::from_env()?;

    let storage = PostgresStorage::connect(config.database_url(), *config.store_timeout())
        .await
        .context("connecting to the canonical store")?;
    let index = TantivyIndex::open(config.index_path(), config.index_settings())
        .context("opening the search index")?;

    let service = Arc::new(NoteService::new(storage, index));
    let api = NotesApi::new(Arc::clone(&service));

    let events = tokio::spawn(notifications::log_events(service.subscribe()));

    if *config.reindex_on_startup() {
        api.reindex().await?;
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        [] => {}
        ["list"] => print_json(&api.list_notes().await?)?,
        ["get", id] => print_json(&api.get_note(id).await?)?,
        ["create", title, content] => {
            print_json(&api.create_note(NoteData::new(*title, *content)).await?)?
        }
        ["update", id, title, content] => {
            print_json(&api.update_note(id, NoteData::new(*title, *content)).await?)?
        }
        ["delete", id] => print_json(&api.delete_note(id).await?)?,
        ["search", query @ ..] => {
            let query = query.join(" ");
            print_json(&api.search_notes(Some(query.as_str())).await?)?
        }
        ["reindex"] => print_json(&api.reindex().await?)?,
        _ => bail!(USAGE),
    }

    // Close the hub so the logger drains what is left and exits.
    drop(api);
    drop(service);
    if let Err(err) = events.await {
        debug!(error = %err, "event logger ended abnormally");
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

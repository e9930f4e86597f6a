//! `notegraph` command-line entry point.
//!
//! Thin wrapper over `notegraph_core`: parses flags, opens the database and
//! prints records as pretty JSON.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::debug;
use notegraph_core::{
    default_log_level, init_logging, open_db, BlobContent, EditedNotesService, GraphService,
    HoistingContext, NewNote, NotePathService, NoteService, RevisionService, SqliteBlobStore,
};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

mod args;
use args::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        start_logging(cli.log_level.as_deref(), log_dir)?;
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    debug!(
        "event=cli_command module=cli status=start command={:?}",
        cli.command
    );

    match cli.command {
        Commands::Init => {
            println!("initialized {}", cli.db.display());
        }
        Commands::Create {
            title,
            content,
            parent,
        } => {
            let (note, _) = NoteService::new(&conn)
                .create_note(&parent, NewNote::text(title, content.unwrap_or_default()))?;
            print_json(&note)?;
        }
        Commands::Link {
            parent,
            note,
            position,
            prefix,
        } => {
            let branch =
                GraphService::new(&conn).link(&parent, &note, position, prefix.as_deref())?;
            print_json(&branch)?;
        }
        Commands::Unlink { parent, note } => {
            GraphService::new(&conn).unlink(&parent, &note)?;
            println!("unlinked {note} from {parent}");
        }
        Commands::Path { note } => {
            let paths = NotePathService::new(&conn).with_protected_session(cli.unlock_protected);
            match paths.note_path_data(&note)? {
                Some(data) => print_json(&data)?,
                None => println!("null"),
            }
        }
        Commands::Snapshot { note } => {
            let revision = RevisionService::new(&conn).create_revision(&note)?;
            print_json(&revision)?;
        }
        Commands::Revisions { note } => {
            let revisions = RevisionService::new(&conn).list_revisions(&note)?;
            print_json(&revisions)?;
        }
        Commands::Show { revision, preview } => {
            let view = RevisionService::new(&conn)
                .with_protected_session(cli.unlock_protected)
                .get_revision_content(&revision, preview)?;
            match view.content {
                BlobContent::Text(text) => println!("{text}"),
                BlobContent::Binary(bytes) => {
                    println!("<binary {} of {} bytes>", bytes.len(), view.content_length)
                }
            }
        }
        Commands::Restore { revision } => {
            let note = RevisionService::new(&conn)
                .with_protected_session(cli.unlock_protected)
                .restore_revision(&revision)?;
            print_json(&note)?;
        }
        Commands::Erase { revisions } => {
            let erased = RevisionService::new(&conn).erase_revisions(&revisions)?;
            println!("erased {erased} revision(s)");
        }
        Commands::EraseAll { note } => {
            let erased = RevisionService::new(&conn).erase_all_revisions(&note)?;
            println!("erased {erased} revision(s)");
        }
        Commands::Edited { date } => {
            let edited = EditedNotesService::new(&conn)
                .with_protected_session(cli.unlock_protected)
                .edited_on_date(&date, &HoistingContext::new(cli.hoisted))?;
            print_json(&edited)?;
        }
        Commands::Gc => {
            let erased = SqliteBlobStore::try_new(&conn)?.erase_unused_blobs()?;
            println!("erased {erased} unused blob(s)");
        }
    }
    Ok(())
}

fn start_logging(level: Option<&str>, log_dir: &Path) -> Result<()> {
    let log_dir = if log_dir.is_absolute() {
        log_dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(log_dir)
    };
    let log_dir = log_dir
        .to_str()
        .ok_or_else(|| anyhow!("log directory is not valid UTF-8"))?;
    init_logging(level.unwrap_or_else(|| default_log_level()), log_dir).map_err(|err| anyhow!(err))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

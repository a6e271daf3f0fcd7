mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use roomshare_classroom::{watch_room, ClassroomService};
use roomshare_contract::{PersistedRecord, SharedRecord, UploadRequest};
use roomshare_storage::{open_store, LoadOutcome};
use tracing::{info, warn};

use crate::config::{RuntimeConfig, DEFAULT_CONFIG_PATH};

#[derive(Debug, Parser)]
#[command(author, version, about = "Share PDFs with classroom devices")]
struct Cli {
    /// Config file; defaults to config/roomshare.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Share a PDF with a classroom
    Share {
        #[arg(long)]
        room: String,
        file: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
    },
    /// List the PDFs shared with a classroom
    List {
        #[arg(long, required_unless_present = "all", conflicts_with = "all")]
        room: Option<String>,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Remove every PDF shared with a classroom
    Clear {
        #[arg(long)]
        room: String,
    },
    /// Print the known classrooms
    Rooms,
    /// Follow a classroom's PDF list until interrupted
    Watch {
        #[arg(long)]
        room: String,
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Report whether the stored blob is missing, readable or corrupt
    Inspect,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::load(path, true)?,
        None => config::load(Path::new(DEFAULT_CONFIG_PATH), false)?,
    };
    let service = build_service(&config).await?;

    match cli.command {
        Command::Share {
            room,
            file,
            content_type,
        } => share(&service, &room, &file, content_type).await,
        Command::List { room, all, json } => list(&service, room.as_deref(), all, json).await,
        Command::Clear { room } => clear(&service, &room).await,
        Command::Rooms => {
            for room in service.rooms() {
                println!("Room {room}");
            }
            Ok(())
        }
        Command::Watch {
            room,
            interval_secs,
        } => {
            let interval = interval_secs
                .map(|secs| std::time::Duration::from_secs(secs.max(1)))
                .unwrap_or_else(|| config.classroom.poll_interval());
            watch(&service, &room, interval).await
        }
        Command::Inspect => inspect(&service).await,
    }
}

async fn build_service(config: &RuntimeConfig) -> Result<ClassroomService> {
    let store = open_store(&config.storage)
        .await
        .context("failed to open record store")?;

    if !config.classroom.enforce_registry {
        warn!("classroom registry not enforced: any room name is accepted");
    }

    Ok(ClassroomService::new(
        store,
        config.classroom.registry(),
        config.classroom.enforce_registry,
        config.classroom.timing(),
    ))
}

async fn share(
    service: &ClassroomService,
    room: &str,
    file: &Path,
    content_type: Option<String>,
) -> Result<()> {
    let contents = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", file.display()))?;

    info!(file = %file.display(), room = %room, "sharing PDF");
    let record = service
        .share_pdf(UploadRequest::new(file_name, content_type, contents), room)
        .await
        .context("sharing failed")?;

    println!(
        "\"{}\" has been sent to Room {} (id {})",
        record.name, record.room_number, record.id
    );
    Ok(())
}

async fn list(service: &ClassroomService, room: Option<&str>, all: bool, json: bool) -> Result<()> {
    let records = match room {
        Some(room) if !all => service.refresh(room).await,
        _ => service.store().list_all().await,
    };

    if json {
        let persisted: Vec<PersistedRecord> = records.iter().map(PersistedRecord::from).collect();
        let rendered = serde_json::to_string_pretty(&persisted).context("serialize records")?;
        println!("{rendered}");
        return Ok(());
    }

    match room {
        Some(room) if !all => println!("Room {room}: {} PDF(s)", records.len()),
        _ => println!("All rooms: {} PDF(s)", records.len()),
    }
    for record in &records {
        println!("{}", render_line(record, all));
    }
    Ok(())
}

async fn clear(service: &ClassroomService, room: &str) -> Result<()> {
    let removed = service
        .clear_room(room)
        .await
        .with_context(|| format!("failed to clear Room {room}"))?;

    if removed == 0 {
        println!("Room {room} has no PDFs");
    } else {
        println!("All PDFs have been removed from Room {room} ({removed} removed)");
    }
    Ok(())
}

async fn watch(service: &ClassroomService, room: &str, interval: std::time::Duration) -> Result<()> {
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    watch_room(service, room, interval, shutdown, |records| {
        println!("Room {room}: {} PDF(s)", records.len());
        for record in records {
            println!("{}", render_line(record, false));
        }
    })
    .await;
    Ok(())
}

async fn inspect(service: &ClassroomService) -> Result<()> {
    let store = service.store();
    match store.load().await.context("failed to read record store")? {
        LoadOutcome::Missing => println!("{}: no data", store.describe()),
        LoadOutcome::Loaded(records) => {
            println!("{}: {} record(s)", store.describe(), records.len())
        }
        LoadOutcome::Corrupt { reason } => {
            println!("{}: corrupt ({reason})", store.describe())
        }
    }
    Ok(())
}

fn render_line(record: &SharedRecord, with_room: bool) -> String {
    let uploaded = record
        .uploaded_at
        .with_timezone(&Local)
        .format("%b %-d, %H:%M");
    let megabytes = record.file.metadata.size as f64 / 1024.0 / 1024.0;
    let line = format!("  {uploaded}  {}  {megabytes:.2} MB", record.name);
    if with_room {
        format!("{line}  [Room {}]", record.room_number)
    } else {
        line
    }
}

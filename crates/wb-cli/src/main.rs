//! wb - command-line client for whiteboard documents, ingestion and queries

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;
use wb_core::{
    AskOutcome, DocumentSession, EventSink, IngestionTracker, JobPhase, QuerySession,
    SaveController, SyncEvent,
};
use wb_remote::{DocumentId, DocumentSnapshot, HttpRemote, RemoteApi, StaticSession, UploadFile};

mod config;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "wb")]
#[command(about = "Whiteboard documents, PDF ingestion and questions", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Backend base URL
    #[arg(long, env = "WB_API_URL", global = true)]
    api_url: Option<String>,
    /// Bearer access token
    #[arg(long, env = "WB_ACCESS_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,
    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List documents
    List,
    /// Show one document
    Show {
        /// Document ID
        id: String,
    },
    /// Create a document
    Create {
        /// Initial title
        #[arg(long)]
        title: Option<String>,
    },
    /// Rename a document
    Rename {
        /// Document ID
        id: String,
        /// New title
        title: String,
    },
    /// Delete a document
    Delete {
        /// Document ID
        id: String,
    },
    /// Upload PDFs and track them until processed
    Ingest {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Delay between status polls
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },
    /// Ask a question about ingested material
    Ask {
        /// Question text
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// Feed a JSON array of snapshots through the debounced saver
    Replay {
        /// Document ID
        id: String,
        /// JSON file holding an array of snapshots
        snapshots: PathBuf,
        /// Delay between consecutive snapshots
        #[arg(long, default_value = "200")]
        gap_ms: u64,
        /// Quiet interval before a write is dispatched
        #[arg(long)]
        quiet_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = CliConfig::load(cli.config.as_deref())?
        .with_overrides(cli.api_url, cli.token)
        .with_timeout_secs(cli.timeout_secs);
    match &cli.command {
        Commands::Ingest {
            poll_interval_ms, ..
        } => config = config.with_poll_interval_ms(*poll_interval_ms),
        Commands::Replay { quiet_ms, .. } => config = config.with_quiet_period_ms(*quiet_ms),
        _ => {}
    }
    let session = match config.access_token.clone() {
        Some(token) => StaticSession::new(token),
        None => StaticSession::signed_out(),
    };
    let remote: Arc<dyn RemoteApi> =
        Arc::new(HttpRemote::new(&config.remote, Arc::new(session))?);
    tracing::debug!("Using backend {}", config.remote.base_url);

    match cli.command {
        Commands::List => {
            let documents = remote.list_documents().await?;
            if documents.is_empty() {
                println!("No documents");
            }
            for doc in documents {
                println!("{}  {}  (updated {})", doc.id, doc.title, doc.updated_at);
            }
        }
        Commands::Show { id } => {
            let doc = remote.get_document(&DocumentId::new(id)).await?;
            println!("ID:       {}", doc.id);
            println!("Title:    {}", doc.title);
            println!("Elements: {}", doc.snapshot.elements.len());
            println!("Files:    {}", doc.snapshot.files.len());
            println!("Created:  {}", doc.created_at);
            println!("Updated:  {}", doc.updated_at);
        }
        Commands::Create { title } => {
            let doc = remote.create_document(title).await?;
            println!("Created {} ({})", doc.id, doc.title);
        }
        Commands::Rename { id, title } => {
            let controller = SaveController::new(
                DocumentId::new(id),
                Arc::clone(&remote),
                config.sync.save,
                EventSink::none(),
            );
            controller.rename(title).await?;
            println!("Renamed {}", controller.document_id());
        }
        Commands::Delete { id } => {
            let id = DocumentId::new(id);
            remote.delete_document(&id).await?;
            println!("Deleted {id}");
        }
        Commands::Ingest { files, .. } => return ingest(remote, &config, &files).await,
        Commands::Ask { question } => return ask(remote, &config, &question.join(" ")).await,
        Commands::Replay {
            id,
            snapshots,
            gap_ms,
            ..
        } => {
            let gap = Duration::from_millis(gap_ms);
            replay(remote, &config, DocumentId::new(id), &snapshots, gap).await?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn ingest(
    remote: Arc<dyn RemoteApi>,
    config: &CliConfig,
    paths: &[PathBuf],
) -> Result<ExitCode> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        files.push(UploadFile::new(name, bytes));
    }

    let (events, rx) = EventSink::channel();
    let printer = print_events(rx);
    let tracker = IngestionTracker::new(remote, config.sync.ingest.clone(), events);

    let extension = &config.sync.ingest.accepted_extension;
    let accepted = tracker.submit_all(files);
    if accepted.is_empty() {
        bail!("no .{extension} files given");
    }
    if accepted.len() < paths.len() {
        println!(
            "Skipped {} file(s) without .{extension} extension",
            paths.len() - accepted.len()
        );
    }

    tracker.wait_settled().await;
    let jobs = tracker.jobs();
    drop(tracker);
    let _ = printer.await;

    let failed = jobs.iter().filter(|job| job.phase == JobPhase::Error).count();
    println!("{} ready, {} failed", jobs.len() - failed, failed);
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn ask(remote: Arc<dyn RemoteApi>, config: &CliConfig, question: &str) -> Result<ExitCode> {
    let session = QuerySession::new(remote, config.sync.query, EventSink::none());
    let outcome = session.ask(question).await;
    if outcome == AskOutcome::Ignored {
        bail!("question is empty");
    }

    if let Some(entry) = session.transcript().last() {
        println!("{}", entry.text);
        if let Some(sources) = entry.sources.as_ref().filter(|s| !s.is_empty()) {
            println!();
            println!("Sources:");
            for source in sources {
                println!("  - {source}");
            }
        }
    }
    Ok(if outcome == AskOutcome::Answered {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn replay(
    remote: Arc<dyn RemoteApi>,
    config: &CliConfig,
    id: DocumentId,
    path: &Path,
    gap: Duration,
) -> Result<()> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let snapshots: Vec<DocumentSnapshot> =
        serde_json::from_str(&text).context("expected a JSON array of snapshots")?;

    let (events, rx) = EventSink::channel();
    let printer = print_events(rx);
    let session = DocumentSession::open(remote, &id, config.sync.save, events).await?;
    println!(
        "Replaying {} snapshot(s) into {} ({})",
        snapshots.len(),
        id,
        session.record().title
    );

    for snapshot in snapshots {
        session.controller().on_change(snapshot);
        tokio::time::sleep(gap).await;
    }
    session.controller().flush().await?;
    drop(session);
    let _ = printer.await;
    Ok(())
}

/// Print events until every sink is dropped
fn print_events(mut rx: UnboundedReceiver<SyncEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                SyncEvent::SaveStatusChanged { document_id, status } => {
                    println!("[{document_id}] {status}");
                }
                SyncEvent::JobPhaseChanged {
                    file_name, phase, ..
                } => println!("{file_name}: {phase}"),
                SyncEvent::JobDismissed { file_name, .. } => println!("{file_name}: dismissed"),
                SyncEvent::TranscriptAppended(entry) => println!("{}", entry.text),
            }
        }
    })
}

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docingest::api::{DocumentApi, DocumentFilters, DocumentService, FilePayload, SortDirection};
use docingest::config::{self, get_config};
use docingest::listing::DocumentBrowser;
use docingest::logging;
use docingest::metrics::IngestMetrics;
use docingest::queue::{UploadLimits, UploadQueue, validate};
use docingest::tracking::{DocumentStore, StatusTracker, TrackEvent};
use futures_util::{pin_mut, stream::StreamExt};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "docingest",
    about = "Upload documents to the intelligence service and track their processing"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload one or more files and wait for processing to finish.
    Upload {
        /// Files to upload.
        files: Vec<PathBuf>,
        /// Submit all files as a single batch request.
        #[arg(long)]
        batch: bool,
        /// Return as soon as uploads are accepted, without polling.
        #[arg(long)]
        no_track: bool,
    },
    /// List documents matching the given filters.
    List {
        #[arg(long)]
        q: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        sort_by: Option<String>,
        /// Sort descending instead of ascending.
        #[arg(long)]
        desc: bool,
        /// Walk every page instead of a single one.
        #[arg(long)]
        all: bool,
    },
    /// Show a document's current record, optionally polling until terminal.
    Status {
        id: String,
        #[arg(long)]
        watch: bool,
    },
    /// Obtain a short-lived download link for a document.
    Download { id: String },
    /// Delete a document and its stored artifacts.
    Delete { id: String },
    /// Probe service health.
    Health,
}

#[tokio::main]
async fn main() {
    config::init_config();
    logging::init_tracing();

    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let service = Arc::new(DocumentService::new()?);

    match cli.command {
        Command::Upload {
            files,
            batch,
            no_track,
        } => upload(service, files, batch, no_track).await,
        Command::List {
            q,
            tag,
            status,
            content_type,
            page,
            page_size,
            sort_by,
            desc,
            all,
        } => {
            let filters = DocumentFilters {
                q,
                tag,
                status,
                content_type,
                page,
                page_size,
                sort_by,
                sort_dir: desc.then_some(SortDirection::Desc),
                ..Default::default()
            };
            list(service, filters, all).await
        }
        Command::Status { id, watch } => status(service, &id, watch).await,
        Command::Download { id } => {
            let link = service.download_url(&id).await?;
            println!("{} (expires {})", link.download_url, link.expires_at);
            Ok(())
        }
        Command::Delete { id } => {
            service.delete_document(&id).await?;
            println!("deleted {id}");
            Ok(())
        }
        Command::Health => {
            let health = service.health().await?;
            println!("status: {}", health.status);
            for (dependency, detail) in &health.dependencies {
                println!("  {dependency}: {detail}");
            }
            Ok(())
        }
    }
}

async fn upload(
    service: Arc<DocumentService>,
    paths: Vec<PathBuf>,
    batch: bool,
    no_track: bool,
) -> Result<()> {
    if paths.is_empty() {
        bail!("no files given");
    }

    let config = get_config();
    let defaults = UploadLimits::default();
    let limits = UploadLimits {
        max_file_bytes: config.max_file_bytes.unwrap_or(defaults.max_file_bytes),
        max_files: config.max_queue_files.unwrap_or(defaults.max_files),
    };

    let api: Arc<dyn DocumentApi> = service;
    let metrics = Arc::new(IngestMetrics::new());
    let store = Arc::new(DocumentStore::new());
    let tracker = Arc::new(StatusTracker::new(
        Arc::clone(&api),
        Arc::clone(&store),
        config.poll_interval(),
        Arc::clone(&metrics),
    ));
    let mut queue = UploadQueue::new(Arc::clone(&api), limits, Arc::clone(&metrics));
    if !no_track {
        queue = queue.with_tracker(Arc::clone(&tracker));
    }

    let mut payloads = Vec::new();
    for path in &paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = validate::guess_content_type(&filename)
            .with_context(|| format!("{filename}: unrecognized file type"))?;
        payloads.push(FilePayload {
            filename,
            content_type: content_type.to_string(),
            bytes,
        });
    }

    let outcome = queue.enqueue(payloads);
    for rejected in &outcome.rejected {
        eprintln!("rejected {}: {}", rejected.filename, rejected.reason);
    }
    if outcome.accepted.is_empty() {
        bail!("no files accepted for upload");
    }

    if batch {
        match queue.submit_batch().await? {
            Some(response) => println!(
                "batch {} accepted ({} files, status {})",
                response.batch_id, response.file_count, response.status
            ),
            None => println!("nothing to submit"),
        }
        return Ok(());
    }

    let mut accepted_ids = Vec::new();
    for item_id in outcome.accepted {
        let filename = queue
            .item(item_id)
            .map(|item| item.file.filename.clone())
            .unwrap_or_default();
        match queue.submit_one(item_id).await {
            Ok(document_id) => {
                println!("{filename}: accepted as {document_id}");
                accepted_ids.push(document_id);
            }
            Err(err) => {
                eprintln!("{filename}: {err}");
                if let Some(quota) = queue.quota() {
                    eprintln!("  capacity: {}/{} documents processing", quota.current, quota.limit);
                }
            }
        }
    }

    if !no_track {
        for document_id in &accepted_ids {
            tracker.wait_until_terminal(document_id).await;
            if let Some(record) = store.get(document_id) {
                println!("{document_id}: {}", record.status);
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        uploads_succeeded = snapshot.uploads_succeeded,
        uploads_failed = snapshot.uploads_failed,
        polls_issued = snapshot.polls_issued,
        "Upload session finished"
    );
    Ok(())
}

async fn list(service: Arc<DocumentService>, filters: DocumentFilters, all: bool) -> Result<()> {
    if all {
        let stream = docingest::api::stream_documents(service.as_ref(), &filters);
        pin_mut!(stream);
        while let Some(record) = stream.next().await {
            let record = record?;
            print_record(&record);
        }
        return Ok(());
    }

    let api: Arc<dyn DocumentApi> = service;
    let browser = DocumentBrowser::new(api);
    if let Some(listing) = browser.refresh(&filters).await? {
        println!(
            "page {}/{} ({} total)",
            listing.page, listing.total_pages, listing.total
        );
        for record in &listing.documents {
            print_record(record);
        }
    }
    Ok(())
}

async fn status(service: Arc<DocumentService>, id: &str, watch: bool) -> Result<()> {
    if !watch {
        let record = service.get_document(id).await?;
        print_record(&record);
        return Ok(());
    }

    let config = get_config();
    let api: Arc<dyn DocumentApi> = service;
    let store = Arc::new(DocumentStore::new());
    let tracker = StatusTracker::new(
        api,
        Arc::clone(&store),
        config.poll_interval(),
        Arc::new(IngestMetrics::new()),
    );

    let mut events = tracker.subscribe();
    tracker.track(id);
    while let Ok(event) = events.recv().await {
        match event {
            TrackEvent::Updated(record) if record.id == id => {
                println!("{}: {}", record.id, record.status);
            }
            TrackEvent::Terminal(record) if record.id == id => {
                print_record(&record);
                break;
            }
            _ => {}
        }
    }
    Ok(())
}

fn print_record(record: &docingest::api::DocumentRecord) {
    let created = record.created_at.as_deref().unwrap_or("-");
    println!("{}  {}  {}", record.id, record.status, created);
    if let Some(error) = &record.error {
        println!("    error: {error}");
    }
    if let Some(extracted) = &record.extracted {
        if let Some(vendor) = &extracted.vendor_name {
            println!("    vendor: {vendor}");
        }
        for item in &extracted.items {
            println!(
                "    item: {} x{}",
                item.description.as_deref().unwrap_or("?"),
                item.quantity.unwrap_or(0.0)
            );
        }
    }
}

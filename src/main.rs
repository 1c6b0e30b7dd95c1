use clap::{ArgAction, Parser, Subcommand};
use hue_gallery::{
    ArtworkUpload, GalleryConfig, GalleryError, GalleryService, IngestForm, Library,
    LocalObjectStore, OneOrMany, OwnerId, PriceInput, Result, UploadedImage,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use walkdir::WalkDir;

/// Image file extensions picked up by folder ingestion
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif"];

type Service = GalleryService<Library, LocalObjectStore>;

#[derive(Parser)]
#[command(name = "hue-gallery")]
#[command(about = "Art gallery ingestion and hue search")]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Gallery database (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage gallery owners
    Owner {
        #[command(subcommand)]
        command: OwnerCommand,
    },
    /// Add images to an owner's gallery
    Ingest {
        #[arg(long)]
        owner: OwnerId,
        /// Image file; repeat once per image
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        /// Display name per image ("" for the default)
        #[arg(long = "name")]
        names: Vec<String>,
        /// Price per image (one value with --dir)
        #[arg(long = "price")]
        prices: Vec<String>,
        /// Comma-separated tags per image
        #[arg(long = "tags")]
        tags: Vec<String>,
        /// Ingest every image under this folder instead
        #[arg(long, conflicts_with_all = ["images", "names", "tags"])]
        dir: Option<PathBuf>,
    },
    /// Flag or unflag an image as important
    Important {
        #[arg(long)]
        owner: OwnerId,
        #[arg(long)]
        image_ref: String,
        #[arg(long, action = ArgAction::Set)]
        set: bool,
    },
    /// Remove an image from a gallery
    Delete {
        #[arg(long)]
        owner: OwnerId,
        #[arg(long)]
        image_ref: String,
    },
    /// Show an owner's gallery
    Gallery {
        #[arg(long)]
        owner: OwnerId,
    },
    /// Find the images closest to a hue across all galleries
    Nearest {
        #[arg(long, allow_hyphen_values = true)]
        hue: String,
        #[arg(long)]
        limit: Option<String>,
    },
    /// Render solid-colour swatches at evenly spaced hues
    Swatches {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 50)]
        count: usize,
        #[arg(long, default_value_t = 200)]
        size: u32,
    },
}

#[derive(Subcommand)]
enum OwnerCommand {
    Add {
        #[arg(long, default_value = "")]
        first: String,
        #[arg(long, default_value = "")]
        last: String,
    },
    Rename {
        #[arg(long)]
        id: OwnerId,
        #[arg(long, default_value = "")]
        first: String,
        #[arg(long, default_value = "")]
        last: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_json = std::env::var("HUE_GALLERY_LOG_JSON")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false);

    // stdout carries command output, logs go to stderr
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ {} {}", err.status_code(), err);
            ExitCode::FAILURE
        }
    }
}

/// Load config and open the gallery; `db` overrides the configured database
fn open_service(config_path: Option<&Path>, db: Option<&Path>) -> Result<Service> {
    let mut config = GalleryConfig::load(config_path)?;
    if let Some(db) = db {
        config.database_path = db.to_path_buf();
    }

    let library = Library::open(&config.database_path)?;
    info!("🎨 Hue gallery initialized with {} entries", library.entry_count()?);

    let objects = LocalObjectStore::new(&config.object_store_dir, config.public_base_url.clone());
    Ok(GalleryService::new(Arc::new(library), Arc::new(objects))
        .with_limits(config.max_batch_size, config.nearest_default_limit))
}

async fn run(cli: Cli) -> Result<()> {
    let open = || open_service(cli.config.as_deref(), cli.db.as_deref());

    match cli.command {
        Command::Owner { command } => {
            let service = open()?;
            match command {
                OwnerCommand::Add { first, last } => {
                    let owner = service.create_owner(&first, &last)?;
                    print_json(json!({ "status": 201, "owner": owner }))
                }
                OwnerCommand::Rename { id, first, last } => {
                    let owner = service.rename_owner(id, &first, &last).await?;
                    print_json(json!({ "status": 200, "owner": owner }))
                }
            }
        }
        Command::Ingest {
            owner,
            images,
            names,
            prices,
            tags,
            dir,
        } => {
            let service = open()?;
            match dir {
                Some(dir) => ingest_folder(&service, owner, &dir, &prices).await,
                None => ingest_files(&service, owner, images, names, prices, tags).await,
            }
        }
        Command::Important {
            owner,
            image_ref,
            set,
        } => {
            let updated = open()?.set_importance(owner, &image_ref, set).await?;
            print_json(json!({ "status": 200, "updated": updated }))
        }
        Command::Delete { owner, image_ref } => {
            let removed = open()?.delete_entry(owner, &image_ref).await?;
            print_json(json!({ "status": 200, "removed": removed }))
        }
        Command::Gallery { owner } => {
            let service = open()?;
            let doc = service.gallery(owner)?;
            let featured = service.important_entries(owner)?;
            print_json(json!({ "status": 200, "owner": doc, "important": featured }))
        }
        Command::Nearest { hue, limit } => {
            let found = open()?.nearest_hue(&hue, limit.as_deref())?;
            print_json(json!({ "status": 200, "results": found }))
        }
        // Needs no gallery, so nothing is opened
        Command::Swatches { out, count, size } => {
            let written = hue_gallery::swatch::write_swatches(&out, count, size)?;
            print_json(json!({ "status": 200, "written": written }))
        }
    }
}

fn print_json(value: serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn read_upload(path: &Path) -> Result<UploadedImage> {
    let bytes = std::fs::read(path).map_err(|e| {
        GalleryError::validation(format!("cannot read {}: {}", path.display(), e))
    })?;
    let file_name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    Ok(UploadedImage::new(file_name, bytes))
}

fn split_tags(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ingest explicitly listed files with their parallel metadata flags
async fn ingest_files(
    service: &Service,
    owner: OwnerId,
    images: Vec<PathBuf>,
    names: Vec<String>,
    prices: Vec<String>,
    tags: Vec<String>,
) -> Result<()> {
    let form = IngestForm {
        images: images
            .iter()
            .map(|p| read_upload(p))
            .collect::<Result<_>>()?,
        names: names.into(),
        prices: prices.into_iter().map(PriceInput::Text).collect::<Vec<_>>().into(),
        tags: tags
            .iter()
            .map(|csv| OneOrMany::Many(split_tags(csv)))
            .collect::<Vec<_>>()
            .into(),
    };

    let entries = service.ingest_form(owner, form).await?;
    print_json(json!({
        "status": 201,
        "galleryEntries": entries,
        "metrics": service.metrics(),
    }))
}

/// Check if a path is a supported image file
fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|e| {
            let ext = e.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Ingest every image under `dir`, in path order, one batch at a time
async fn ingest_folder(
    service: &Service,
    owner: OwnerId,
    dir: &Path,
    prices: &[String],
) -> Result<()> {
    let price = match prices {
        [price] => PriceInput::Text(price.clone()).parse()?,
        _ => return Err(GalleryError::validation("--dir takes exactly one --price")),
    };

    info!("🔍 Scanning folder: {}", dir.display());

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(GalleryError::validation(format!(
            "no images found under {}",
            dir.display()
        )));
    }

    let mut ingested = Vec::with_capacity(paths.len());
    for chunk in paths.chunks(service.max_batch_size()) {
        let artworks = chunk
            .iter()
            .map(|p| read_upload(p).map(|image| ArtworkUpload::new(image, "", price, Vec::new())))
            .collect::<Result<Vec<_>>>()?;

        let entries = service.ingest(owner, artworks).await?;
        info!("⏳ Imported {} of {} files...", ingested.len() + entries.len(), paths.len());
        ingested.extend(entries);
    }

    print_json(json!({
        "status": 201,
        "galleryEntries": ingested,
        "metrics": service.metrics(),
    }))
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scene_annotator::detect::FlorenceClient;
use scene_annotator::session::{RestoreOrigin, SaveOptions, Session};
use scene_annotator::storage::{BlobStore, FsStore, MemoryStore};
use scene_annotator::AppConfig;

#[derive(Parser)]
#[command(
    name = "scene-annotator",
    version,
    about = "Headless tools for scene annotation folders"
)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show per-image annotation state of a folder
    Status {
        folder: PathBuf,
        /// Save directory holding export documents
        #[arg(long)]
        save_dir: Option<PathBuf>,
    },
    /// Pre-annotate every image of a folder with the detector and save
    Detect {
        folder: PathBuf,
        #[arg(long)]
        save_dir: PathBuf,
        /// Detector base URL, overriding the config file
        #[arg(long)]
        url: Option<String>,
        /// Also copy each image into the save directory
        #[arg(long)]
        copy_image: bool,
    },
    /// Delete every recovery snapshot
    ClearCache,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_from_default_path(),
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let recovery = recovery_store(&config)?;
    let mut session = Session::new(config, recovery);

    match cli.command {
        Commands::Status { folder, save_dir } => {
            if let Some(dir) = save_dir {
                session.set_save_directory(Box::new(FsStore::open(dir)?))?;
            }
            let Some(mut report) = session.open_folder(Box::new(FsStore::open(&folder)?))? else {
                println!("no images in {}", folder.display());
                return Ok(());
            };
            loop {
                let origin = match report.origin {
                    RestoreOrigin::Cache => "unsaved",
                    RestoreOrigin::Durable => "saved",
                    RestoreOrigin::Fresh => "new",
                };
                println!(
                    "{:>9}  {:<8} {:>4} annotations  {}",
                    session.progress(),
                    origin,
                    session.annotations().len(),
                    report.image
                );
                match session.next_image()? {
                    Some(next) => report = next,
                    None => break,
                }
            }
        }
        Commands::Detect {
            folder,
            save_dir,
            url,
            copy_image,
        } => {
            let mut detector_config = session.config().detector.clone();
            if let Some(url) = url {
                detector_config.url = url;
            }
            let detector = FlorenceClient::from_config(&detector_config);
            let options = SaveOptions::new()
                .copy_image(copy_image || session.config().copy_image_on_save);

            session.set_save_directory(Box::new(FsStore::create(save_dir)?))?;
            if session.open_folder(Box::new(FsStore::open(&folder)?))?.is_none() {
                println!("no images in {}", folder.display());
                return Ok(());
            }

            let mut failures = 0;
            loop {
                let image = session.current_image().unwrap_or_default().to_string();
                match session.run_detection(&detector) {
                    Ok(report) => {
                        session.save(&options)?;
                        println!(
                            "{:>9}  {}: {} objects added",
                            session.progress(),
                            image,
                            report.added
                        );
                    }
                    Err(e) => {
                        failures += 1;
                        log::error!("Detection failed for '{}': {}", image, e);
                    }
                }
                if session.next_image()?.is_none() {
                    break;
                }
            }
            if failures > 0 {
                println!("{failures} images failed, see log for details");
            }
        }
        Commands::ClearCache => {
            let removed = session.clear_all_recovery()?;
            println!("removed {removed} recovery entries");
        }
    }

    Ok(())
}

fn recovery_store(config: &AppConfig) -> Result<Box<dyn BlobStore>, Box<dyn std::error::Error>> {
    match config.recovery_path() {
        Some(dir) => Ok(Box::new(FsStore::create(dir)?)),
        None => {
            log::warn!("No cache directory available, recovery snapshots are kept in memory");
            Ok(Box::new(MemoryStore::new().with_label("recovery")))
        }
    }
}

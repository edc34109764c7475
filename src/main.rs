use anyhow::Result;
use std::path::PathBuf;

use photolog::db::photos::{self, NewPhoto};
use photolog::media::exif_taken_at;
use photolog::{Config, MediaStore, SaveOptions, Store};

enum Command {
    Import(Vec<PathBuf>),
    List,
    Delete(String),
    Status,
}

struct Args {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut command = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("photolog {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "import" => {
                let sources: Vec<PathBuf> = args[i + 1..].iter().map(PathBuf::from).collect();
                if sources.is_empty() {
                    eprintln!("Error: import requires at least one file argument");
                    std::process::exit(1);
                }
                command = Some(Command::Import(sources));
                i = args.len();
            }
            "list" => {
                command = Some(Command::List);
            }
            "delete" => {
                if i + 1 < args.len() {
                    command = Some(Command::Delete(args[i + 1].clone()));
                    i += 1;
                } else {
                    eprintln!("Error: delete requires a photo id argument");
                    std::process::exit(1);
                }
            }
            "status" => {
                command = Some(Command::Status);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let command = command.unwrap_or_else(|| {
        print_help();
        std::process::exit(1);
    });

    Args {
        config_path,
        command,
    }
}

fn print_help() {
    println!(
        r#"photolog - local-first photo diary storage

USAGE:
    photolog [OPTIONS] <COMMAND>

COMMANDS:
    import FILE...      Copy images into managed storage and record them
    list                List stored photos, newest first
    delete ID           Remove a photo record and its files
    status              Show active backend and schema version

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    PHOTOLOG_LOG        Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/photolog/config.toml"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();

    // Load configuration first so logging can honor a configured log_dir
    let config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = photolog::logging::init(config.log_dir.clone());

    // Open the database; falls back to the document store on its own
    let db = Store::open(&config.database)?;
    let media = MediaStore::new(&config.media);

    match args.command {
        Command::Import(sources) => {
            let options = SaveOptions {
                thumbnail_max_size: config.media.thumbnail_max_size,
                quality: config.media.thumbnail_quality,
                ..SaveOptions::default()
            };
            for source in sources {
                let saved = media.save_image(&source, &options)?;
                let photo = NewPhoto {
                    id: saved.id.clone(),
                    file_uri: saved.file_uri.display().to_string(),
                    thumbnail_uri: saved.thumbnail_uri.map(|p| p.display().to_string()),
                    taken_at: exif_taken_at(&source),
                    width: saved.width.map(i64::from),
                    height: saved.height.map(i64::from),
                };
                photos::create_photo(&db, &photo)?;
                println!("{}  {}", saved.id, source.display());
            }
        }
        Command::List => {
            for photo in photos::list_photos(&db)? {
                let dims = match (photo.width, photo.height) {
                    (Some(w), Some(h)) => format!("{w}x{h}"),
                    _ => "-".to_string(),
                };
                println!(
                    "{}  {}  {:>9}  {}",
                    photo.id, photo.created_at, dims, photo.file_uri
                );
            }
        }
        Command::Delete(id) => {
            let photo = photos::list_photos(&db)?
                .into_iter()
                .find(|p| p.id == id);
            let Some(photo) = photo else {
                eprintln!("No photo with id {id}");
                std::process::exit(1);
            };
            photos::soft_delete_photo(&db, &id)?;
            let outcome = media.delete_image(
                PathBuf::from(&photo.file_uri).as_path(),
                photo.thumbnail_uri.as_deref().map(std::path::Path::new),
            );
            println!(
                "deleted {id} (file removed: {}, thumbnail removed: {:?})",
                outcome.photo_deleted, outcome.thumbnail_deleted
            );
        }
        Command::Status => {
            println!("backend:        {}", db.active_backend());
            println!("schema version: {}", db.schema_version());
            println!("photos dir:     {}", media.photos_dir().display());
        }
    }

    Ok(())
}

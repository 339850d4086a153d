use clap::{Parser, Subcommand};
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;
use rust_anime_scraper::config::Config;
use rust_anime_scraper::{Cancellation, Envelope, Registry, ScrapeError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "anime-scraper")]
#[command(about = "Scrape anime listings, details and episodes as JSON envelopes", long_about = None)]
struct Cli {
    /// Path to configuration file (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source name or alias (otakudesu, samehadaku, anoboy, kuramanime, animasu, jikan).
    /// Required by every command except `sources`.
    source: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Latest/ongoing listing
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Anime detail by slug
    Detail { slug: String },
    /// Episode streams and downloads by slug
    Episode { slug: String },
    /// Search by title
    Search { query: String },
    /// Genre index
    Genres,
    /// A-Z listing; use '#' for titles not starting with a letter
    Letter {
        letter: char,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Print the registered source names
    Sources,
}

fn init_logging() {
    const LOG_FILE: &str = "log4rs.yml";
    if Path::new(LOG_FILE).exists() {
        match log4rs::init_file(LOG_FILE, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("ignoring {}: {}", LOG_FILE, e),
        }
    }

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l})} {t} - {m}{n}")))
        .build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info));
    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("logging disabled: {}", e);
            }
        }
        Err(e) => eprintln!("logging disabled: {}", e),
    }
}

fn emit<T: Serialize>(envelope: Envelope<T>) -> ExitCode {
    println!("{}", envelope.to_json());
    if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn require_source(source: Option<&str>) -> Result<&str, ScrapeError> {
    source.ok_or_else(|| ScrapeError::InvalidInput {
        operation: "cli",
        message: "a source name is required".to_string(),
    })
}

async fn run(
    registry: &Registry,
    source: Option<&str>,
    command: Command,
    cancel: &Cancellation,
) -> ExitCode {
    let adapter = match (&command, source) {
        (Command::Sources, _) => return emit(Envelope::success(registry.names())),
        (_, source) => match require_source(source).and_then(|s| registry.get(s)) {
            Ok(adapter) => adapter,
            Err(e) => return emit(Envelope::<()>::from(Err(e))),
        },
    };
    log::info!("{} {:?}", adapter.name(), command);

    match command {
        Command::List { page } => emit(adapter.list(page, cancel).await),
        Command::Detail { slug } => emit(adapter.detail(&slug, cancel).await),
        Command::Episode { slug } => emit(adapter.episode(&slug, cancel).await),
        Command::Search { query } => emit(adapter.search(&query, cancel).await),
        Command::Genres => emit(adapter.genres(cancel).await),
        Command::Letter { letter, page } => emit(adapter.by_letter(letter, page, cancel).await),
        Command::Sources => emit(Envelope::success(registry.names())),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    let registry = match Registry::new(&config) {
        Ok(registry) => registry,
        Err(e) => return emit(Envelope::<()>::from(Err(e))),
    };

    let cancel = Cancellation::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted; cancelling in-flight request");
            on_interrupt.cancel();
        }
    });

    run(&registry, cli.source.as_deref(), cli.command, &cancel).await
}

use anyhow::Context;
use clap::Parser;
use quotesync_core::sync::SyncEvent;
use quotesync_core::{
    CategoryFilter, Config, Error, Exporter, HttpRemoteFetcher, JsonFileStorage, QuoteStore,
    SqliteStorage, Storage, StorageBackend, SyncService, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "quotesync")]
#[command(version, about = "Random quotes with a synced remote collection", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "QUOTESYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Data file, overrides the configured storage path
    #[arg(long, global = true, env = "QUOTESYNC_DATA")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show a random quote
    Show {
        /// Category to pick from (defaults to the saved filter)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show the last quote displayed this session
    Last,
    /// Add a new quote
    Add {
        /// Quote text
        text: String,
        /// Quote category
        category: String,
        /// Also post the quote to the server
        #[arg(long)]
        publish: bool,
    },
    /// List all categories
    Categories,
    /// Show or change the saved category filter ("all" clears it)
    Filter {
        category: Option<String>,
    },
    /// List quotes
    List {
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Import quotes from a JSON file
    Import {
        file: PathBuf,
    },
    /// Export quotes (.json, .csv or .md)
    Export {
        file: PathBuf,
    },
    /// Sync once with the server
    Sync,
    /// Keep syncing with the server until interrupted
    Watch {
        /// Seconds between syncs (defaults to the configured interval)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quotesync=info,quotesync_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(data) = &cli.data {
        config.storage.path = Some(data.clone());
    }

    let Some(command) = cli.command else {
        println!("No command specified. Try --help");
        return Ok(());
    };

    let mut store = open_store(&config)?;

    match command {
        Commands::Show { category } => {
            let filter = match category {
                Some(c) => c.parse::<CategoryFilter>()?,
                None => store.selected_filter(),
            };
            match store.random_quote(&filter, &mut rand::thread_rng()) {
                Some(quote) => println!("{}\n  - {}", quote.text, quote.category),
                None => println!("No quotes found in this category."),
            }
        }
        Commands::Last => match store.last_viewed() {
            Some(quote) => println!("{}\n  - {}", quote.text, quote.category),
            None => println!("No quote shown yet this session."),
        },
        Commands::Add {
            text,
            category,
            publish,
        } => {
            let quote = match store.add(&text, &category) {
                Ok(quote) => quote,
                Err(Error::Validation(e)) => {
                    println!("{}", e);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            println!("Quote added successfully!");

            if publish {
                let service = sync_service(&config, store)?;
                match service.publish(&quote).await {
                    Ok(Some(id)) => println!("Posted to server as #{}", id),
                    Ok(None) => println!("Posted to server"),
                    Err(e) => println!("{}", e),
                }
            }
        }
        Commands::Categories => {
            let selected = store.selected_filter();
            for category in store.categories() {
                let marker = if selected.as_str() == category { "*" } else { " " };
                println!("{} {}", marker, category);
            }
        }
        Commands::Filter { category: None } => {
            println!("{}", store.selected_filter());
        }
        Commands::Filter {
            category: Some(category),
        } => {
            let filter = category.parse::<CategoryFilter>()?;
            match store.set_filter(filter.clone()) {
                Ok(()) => println!("Filter set to {}", filter),
                Err(Error::Validation(e)) => println!("{}", e),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::List { category } => {
            let filter = match category {
                Some(c) => c.parse::<CategoryFilter>()?,
                None => store.selected_filter(),
            };
            let quotes = store.filtered(&filter);
            if quotes.is_empty() {
                println!("No quotes found in this category.");
            }
            for quote in quotes {
                match quote.id {
                    Some(id) => println!("[{}] #{} {}", quote.category, id, quote.text),
                    None => println!("[{}] {}", quote.category, quote.text),
                }
            }
        }
        Commands::Import { file } => match store.import_file(&file) {
            Ok(0) => println!("No new quotes to import."),
            Ok(count) => println!("Quotes imported successfully! ({} added)", count),
            Err(Error::NoValidRecords) => println!("No valid quotes found in the file."),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to import {}", file.display())))
            }
        },
        Commands::Export { file } => {
            let format = Exporter::export_to_file(store.quotes(), &file)?;
            println!(
                "Exported {} quotes to {} ({})",
                store.len(),
                file.display(),
                format.extension()
            );
        }
        Commands::Sync => {
            let service = sync_service(&config, store)?;
            match service.sync_once().await {
                Ok(Some(report)) => println!(
                    "Quotes synced with server! {} total ({} from server, {} local kept)",
                    report.merge.total, report.merge.remote_count, report.merge.kept_local
                ),
                Ok(None) => println!("A sync is already running."),
                Err(e) => println!("{}", e),
            }
        }
        Commands::Watch { interval } => {
            let interval = interval
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or_else(|| config.sync.interval());
            let service = Arc::new(sync_service(&config, store)?);
            watch_loop(service, interval).await?;
        }
        Commands::Config { save } => {
            let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
            print!("{}", rendered);

            if save {
                match &cli.config {
                    Some(path) => config.save_to(path)?,
                    None => config.save()?,
                }
                println!("Configuration saved.");
            }
        }
    }

    Ok(())
}

/// Open the persistent store the config points at, plus the session store
fn open_store(config: &Config) -> anyhow::Result<QuoteStore> {
    let path = config.storage.resolved_path()?;
    tracing::debug!("Using {:?} storage at {}", config.storage.backend, path.display());

    let storage: Arc<dyn Storage> = match config.storage.backend {
        StorageBackend::Json => Arc::new(JsonFileStorage::new(&path)),
        StorageBackend::Sqlite => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let path = path
                .to_str()
                .context("SQLite path is not valid UTF-8")?;
            Arc::new(SqliteStorage::open(path)?)
        }
    };

    // Session data lives in the temp dir and goes away with it
    let session: Arc<dyn Storage> = Arc::new(JsonFileStorage::new(
        std::env::temp_dir().join("quotesync-session.json"),
    ));

    Ok(QuoteStore::open(storage, session).with_policy(config.sync.merge_policy))
}

fn sync_service(config: &Config, store: QuoteStore) -> anyhow::Result<SyncService> {
    let fetcher = HttpRemoteFetcher::new(
        &config.sync.base_url,
        config.sync.timeout(),
        config.sync.remote_category.clone(),
    )?;

    Ok(SyncService::new(
        Arc::new(Mutex::new(store)),
        Arc::new(fetcher),
        Arc::new(SystemClock),
    ))
}

async fn watch_loop(service: Arc<SyncService>, interval: Duration) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let runner = Arc::clone(&service);
    let sync_task = tokio::spawn(async move {
        runner
            .run_periodic(interval, shutdown_rx, Some(events_tx))
            .await;
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                SyncEvent::Synced(report) => println!(
                    "[{}] Quotes synced with server! {} total",
                    report.synced_at.format("%H:%M:%S"),
                    report.merge.total
                ),
                SyncEvent::Failed(e) => println!("{}", e),
                SyncEvent::Skipped => {}
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    println!("Stopping sync...");

    // Receiver may already be gone if the loop ended on its own
    let _ = shutdown_tx.send(true);
    sync_task.await?;
    printer.await?;
    Ok(())
}

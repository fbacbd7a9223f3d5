use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use bbs_dialer::{
    find_entry, launch, load_entries, rebuild_entries, App, AppConfig, BaseDirs, ProcessSpawner,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bbs-dialer")]
#[command(about = "Pick a bulletin board from a menu and connect to it")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file to use instead of the default location.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every known entry.
    List,
    /// Connect to an entry given its name or id.
    Launch { target: String },
    /// Rescan the source directories and rewrite the cache.
    Refresh,
    /// Print the effective configuration.
    Config,
}

fn init_logging(log_file: &Path) {
    let parent = log_file.parent().unwrap_or(Path::new("."));
    let opened = fs::create_dir_all(parent)
        .and_then(|_| OpenOptions::new().create(true).append(true).open(log_file));
    let writer: Box<dyn Write + Send> = match opened {
        Ok(file) => Box::new(file),
        // the terminal belongs to the menu, so no stderr fallback
        Err(_) => Box::new(io::sink()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bbs_dialer=info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(writer))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let base = BaseDirs::from_platform()?;
    init_logging(&base.log_file());

    let config = AppConfig::resolve(cli.config.as_deref(), &base)
        .context("failed to load configuration")?;
    tracing::debug!(?config, "resolved configuration");

    match cli.command {
        None => {
            let entries = load_entries(&config).context("failed to load entries")?;
            App::new(config, entries).run()?;
        }
        Some(Commands::List) => {
            for entry in load_entries(&config).context("failed to load entries")? {
                println!("{}\t{}\t{}", entry.name, entry.address, entry.description);
            }
        }
        Some(Commands::Launch { target }) => {
            let entries = load_entries(&config).context("failed to load entries")?;
            let entry = find_entry(&entries, &target)?;
            launch(entry, &mut ProcessSpawner)?;
        }
        Some(Commands::Refresh) => {
            let entries = rebuild_entries(&config).context("failed to rebuild cache")?;
            println!("cached {} entries in {}", entries.len(), config.cache_file.display());
        }
        Some(Commands::Config) => {
            print!("{}", serde_yaml::to_string(&config)?);
        }
    }

    Result::Ok(())
}

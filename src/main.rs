//! deck-scout CLI: deck recommendation bot.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use deck_scout::catalog::{CacheSweeper, CatalogSource, ContentFetcher, HttpFetcher, StaticFetcher};
use deck_scout::channel::{ConsoleChannel, MessagingChannel, TelegramChannel};
use deck_scout::config::ScoutConfig;
use deck_scout::controller::InteractionController;
use deck_scout::mode::Mode;
use deck_scout::paths::ScoutPaths;
use deck_scout::store::{CompletionStore, MemStore, RedbStore};

#[derive(Parser)]
#[command(name = "deck-scout", version, about = "Deck recommendation bot")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/deck-scout/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for the completion database.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Keep completions in memory only.
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and create the data directory.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },

    /// Run the Telegram bot.
    Run,

    /// Run the bot over stdin/stdout. `#n` presses button n.
    Console,

    /// Print the extracted catalog.
    Extract {
        /// Extract from a saved page instead of fetching.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Catalog to fetch (default: the persisted mode).
        #[arg(long)]
        mode: Option<Mode>,
    },

    /// Print the offer groups for the current completions.
    Recommend {
        #[arg(long)]
        mode: Option<Mode>,
    },

    /// Show or toggle the persisted mode.
    Mode {
        #[arg(long)]
        switch: bool,
    },

    /// Manage completed decks.
    Completed {
        /// Mode to operate on (default: the persisted mode).
        #[arg(long)]
        mode: Option<Mode>,

        #[command(subcommand)]
        action: CompletedAction,
    },
}

#[derive(Subcommand)]
enum CompletedAction {
    /// List completed decks.
    List,
    /// Mark a deck completed.
    Add {
        /// Exact deck name.
        name: String,
    },
    /// Make a completed deck recommendable again.
    Remove {
        /// Exact deck name.
        name: String,
    },
    /// Forget every completed deck.
    Reset,
}

struct App {
    paths: ScoutPaths,
    config_file: PathBuf,
    ephemeral: bool,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let mut paths = ScoutPaths::resolve()?;
        if let Some(dir) = &cli.data_dir {
            paths = paths.with_data_dir(dir);
        }
        let config_file = cli.config.clone().unwrap_or_else(|| paths.config_file());
        Ok(Self {
            paths,
            config_file,
            ephemeral: cli.ephemeral,
        })
    }

    fn config(&self) -> Result<ScoutConfig> {
        Ok(ScoutConfig::resolve(&self.config_file)?)
    }

    fn store(&self) -> Result<Arc<dyn CompletionStore>> {
        if self.ephemeral {
            return Ok(Arc::new(MemStore::new()));
        }
        Ok(Arc::new(RedbStore::open(&self.paths.data_dir)?))
    }

    fn source(&self, config: &ScoutConfig, fetcher: Box<dyn ContentFetcher>) -> CatalogSource {
        CatalogSource::new(fetcher, config.extractor(), config.source_urls())
    }

    fn http_source(&self, config: &ScoutConfig) -> CatalogSource {
        self.source(config, Box::new(HttpFetcher::new(config.fetch_options())))
    }

    /// Run the controller over `channel` with a cache sweeper alongside.
    fn serve(&self, config: &ScoutConfig, channel: Box<dyn MessagingChannel>) -> Result<()> {
        let store = self.store()?;
        let source = self.http_source(config);
        let mut sweeper = CacheSweeper::spawn(
            source.cache().clone(),
            config.cache_ttl(),
            config.sweep_interval(),
        );
        let mut controller = InteractionController::new(store, source, channel, config.selector());
        let outcome = controller.run();
        sweeper.stop();
        Ok(outcome?)
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = App::new(&cli)?;

    match cli.command {
        Commands::Init { force } => {
            if app.config_file.exists() && !force {
                println!("Config already exists at {}", app.config_file.display());
            } else {
                ScoutConfig::default().save(&app.config_file)?;
                println!("Wrote default config to {}", app.config_file.display());
            }
            app.paths.ensure_dirs()?;
            if !app.ephemeral {
                app.store()?;
                println!("Completion store at {}", app.paths.database_file().display());
            }
        }

        Commands::Run => {
            let config = app.config()?;
            let channel = TelegramChannel::new(config.telegram()?);
            tracing::info!(chat = channel.settings().chat_id, "starting telegram bot");
            app.serve(&config, Box::new(channel))?;
        }

        Commands::Console => {
            let config = app.config()?;
            println!("deck-scout console. Send /help for commands, #n to press a button.");
            app.serve(&config, Box::new(ConsoleChannel::stdio()))?;
        }

        Commands::Extract { file, mode } => {
            let config = app.config()?;
            let mode = match mode {
                Some(mode) => mode,
                None => app.store()?.mode()?,
            };
            let source = match file {
                Some(path) => {
                    let page = std::fs::read_to_string(&path).into_diagnostic()?;
                    let url = config.source_urls().for_mode(mode).to_string();
                    app.source(&config, Box::new(StaticFetcher::new().with_page(url, page)))
                }
                None => app.http_source(&config),
            };

            let catalog = source.refresh(mode)?;
            println!("Catalog ({}, {} decks):", mode.label(), catalog.len());
            for entry in &catalog {
                println!("  {:>3}  {}  {}", entry.position, entry.name, entry.reference_key);
            }
        }

        Commands::Recommend { mode } => {
            let config = app.config()?;
            let store = app.store()?;
            let mode = match mode {
                Some(mode) => mode,
                None => store.mode()?,
            };
            let catalog = app.http_source(&config).refresh(mode)?;
            let completed = store.completed_set(mode)?;
            let groups = config.selector().select(&catalog, &completed);

            if groups.is_empty() {
                println!("All {} decks completed.", mode.label());
            }
            for group in &groups {
                println!("{}:", group.kind.title());
                for offer in &group.entries {
                    println!("  [{}] {}", offer.display_id, offer.name);
                }
            }
        }

        Commands::Mode { switch } => {
            let store = app.store()?;
            let mut mode = store.mode()?;
            if switch {
                mode = mode.toggle();
                store.save_mode(mode)?;
                println!("Switched to {}", mode.label());
            } else {
                println!("Current mode: {}", mode.label());
            }
        }

        Commands::Completed { mode, action } => {
            let store = app.store()?;
            let mode = match mode {
                Some(mode) => mode,
                None => store.mode()?,
            };

            match action {
                CompletedAction::List => {
                    let mut names = store.all(mode)?;
                    if names.is_empty() {
                        println!("No completed decks in {}.", mode.label());
                    } else {
                        names.sort();
                        println!("Completed decks ({}, {}):", mode.label(), names.len());
                        for name in &names {
                            println!("  {name}");
                        }
                    }
                }
                CompletedAction::Add { name } => {
                    store.save(mode, &name)?;
                    println!("Marked \"{name}\" completed in {}", mode.label());
                }
                CompletedAction::Remove { name } => {
                    if store.delete_by_name(mode, &name)? {
                        println!("Restored \"{name}\" in {}", mode.label());
                    } else {
                        println!("\"{name}\" was not completed in {}", mode.label());
                    }
                }
                CompletedAction::Reset => {
                    store.delete_all(mode)?;
                    println!("Completed list of {} cleared.", mode.label());
                }
            }
        }
    }

    Ok(())
}

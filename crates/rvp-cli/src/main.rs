use anyhow::Context;
use clap::Parser;
use rvp_cache::{SqliteStorage, Storage};
use rvp_core::{
    Config, DisplayController, DisplaySettings, ProductFetcher, RenderOutcome, SlideContainer,
    ViewedItemsRecorder,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rvp")]
#[command(version, about = "Recently viewed products for a storefront", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/rvp/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storefront origin, overrides the config file
    #[arg(long, global = true, env = "RVP_BASE_URL")]
    base_url: Option<String>,

    /// Shop the viewed list belongs to, overrides the config file
    #[arg(long, global = true, env = "RVP_SHOP_ID")]
    shop_id: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Record a product view
    Record {
        /// Product handle
        handle: String,
    },
    /// Print the viewed list, most recent first
    List,
    /// Resolve and print recently viewed product cards
    Show {
        /// Handle of the product being viewed; it is never shown
        #[arg(long)]
        current: Option<String>,
        /// Rendering on a product page (current product doesn't count)
        #[arg(long)]
        product_template: bool,
        /// Number of cards to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Drop every cached fragment
    ClearCache,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rvp=info,rvp_core=info,rvp_api=info,rvp_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::Record { handle }) => {
            let recorder = recorder(&config)?;
            recorder.record(&handle)?;
            tracing::info!("Recorded view of {}", handle);
        }
        Some(Commands::List) => {
            for handle in recorder(&config)?.list() {
                println!("{}", handle);
            }
        }
        Some(Commands::Show {
            current,
            product_template,
            limit,
        }) => {
            let fetcher = ProductFetcher::from_config(&config, session_storage(&config)?)?;

            let mut settings = DisplaySettings::from_config(&config);
            settings.current_handle = current;
            settings.is_product_template = product_template;
            if let Some(limit) = limit {
                settings.products_to_show = limit;
            }

            let controller = DisplayController::new(recorder(&config)?, Arc::new(fetcher), settings);
            let mut container = SlideContainer::new();

            match controller.render(&mut container, None).await {
                RenderOutcome::Rendered { cards, .. } => {
                    tracing::info!("Rendered {} cards", cards);
                    println!("{}", container.inner_html);
                }
                RenderOutcome::Hidden | RenderOutcome::Empty => {
                    println!("No recently viewed products.");
                }
                RenderOutcome::Skipped => {}
            }
        }
        Some(Commands::ClearCache) => {
            let fetcher = ProductFetcher::from_config(&config, session_storage(&config)?)?;
            let removed = fetcher.session().clear()?;
            println!("Removed {} cached fragments", removed);
        }
        None => {
            println!("No command specified. Try --help");
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // CLI > Env > File > Defaults
    if let Some(base_url) = &cli.base_url {
        config.storefront.base_url = base_url.clone();
    }
    if let Some(shop_id) = &cli.shop_id {
        config.storefront.shop_id = shop_id.clone();
    }

    Ok(config)
}

fn recorder(config: &Config) -> anyhow::Result<ViewedItemsRecorder> {
    let storage = open_storage(config.cache.local_db.clone(), "local.db")?;
    Ok(ViewedItemsRecorder::with_namespace(
        storage,
        &config.display.storage_namespace,
        &config.storefront.shop_id,
    )
    .with_max_items(config.display.max_items))
}

fn session_storage(config: &Config) -> anyhow::Result<Arc<dyn Storage>> {
    open_storage(config.cache.session_db.clone(), "session.db")
}

fn open_storage(configured: Option<PathBuf>, file_name: &str) -> anyhow::Result<Arc<dyn Storage>> {
    let path = match configured {
        Some(path) => path,
        None => Config::data_dir()?.join(file_name),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let storage = SqliteStorage::open(&path)
        .with_context(|| format!("Failed to open storage at {}", path.display()))?;
    Ok(Arc::new(storage))
}

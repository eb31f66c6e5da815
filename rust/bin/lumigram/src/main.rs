//! `lumigram`: drives the feed engine against a local redb store.
//!
//! Usage:
//!   lumigram [-c feed.toml] [--db PATH] [--page-size N] [--double-tap-ms N]
//!            [--no-fallback] [--user ID] [--pages N] [--toggle POST]...
//!
//! An empty database is seeded with synthetic posts. The composed feed view
//! (or the favorites view with `--favorites`) is printed as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use lumigram_feed::request::{LoadMoreReq, RefreshReq, StartFeedReq, ToggleFavoriteReq};
use lumigram_feed::{
    generate_posts, register_handlers, FallbackDataProvider, FavoriteSyncEngine, FeedConfig,
    FeedContext, FeedView, FeedViewModel, KvFeedStore, PaginationController, SessionHandle,
};
use lumigram_flux::{Flux, StateStore};
use lumigram_kv::RedbStore;
use tracing::{debug, info};

/// Lumigram feed driver.
#[derive(Parser, Debug)]
#[command(name = "lumigram", about = "Lumigram feed engine driver")]
struct Cli {
    /// Path to a TOML feed configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Database file (overrides the configuration).
    #[arg(long = "db")]
    db: Option<PathBuf>,

    /// Posts per page (overrides the configuration).
    #[arg(long = "page-size")]
    page_size: Option<usize>,

    /// Double-tap window in milliseconds (overrides the configuration).
    #[arg(long = "double-tap-ms")]
    double_tap_ms: Option<u64>,

    /// Never substitute placeholder posts for an empty or failed feed.
    #[arg(long = "no-fallback")]
    no_fallback: bool,

    /// Signed-in user. Without one, favorites are disabled.
    #[arg(long = "user")]
    user: Option<String>,

    /// Pages to load, including the first.
    #[arg(long = "pages", default_value_t = 1)]
    pages: usize,

    /// Toggle favorite on these post ids after loading.
    #[arg(long = "toggle")]
    toggle: Vec<String>,

    /// Refresh once after everything else.
    #[arg(long = "refresh")]
    refresh: bool,

    /// Print the favorites view instead of the feed.
    #[arg(long = "favorites")]
    favorites: bool,

    /// Posts to seed into an empty database.
    #[arg(long = "seed", default_value_t = 25)]
    seed: usize,
}

impl Cli {
    /// The configuration file (or defaults) with command-line overrides
    /// applied, validated.
    fn feed_config(&self) -> anyhow::Result<FeedConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                FeedConfig::load(path)?
            }
            None => FeedConfig::default(),
        };
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(ms) = self.double_tap_ms {
            config.double_tap_window_ms = ms;
        }
        if self.no_fallback {
            config.fallback_enabled = false;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = cli.feed_config()?;

    // Storage.
    let kv = RedbStore::open(&config.db_path)
        .map_err(|e| anyhow::anyhow!("failed to open KV store: {}", e))?;
    let store = Arc::new(KvFeedStore::new(kv));
    if store.post_count()? == 0 {
        store.insert_posts(&generate_posts(cli.seed))?;
        info!(count = cli.seed, "seeded empty store");
    }

    // Engine.
    let states = Arc::new(StateStore::new());
    let session = Arc::new(SessionHandle::new());
    if let Some(user) = &cli.user {
        session.sign_in(user);
    }
    let pagination = Arc::new(PaginationController::new(
        store.clone(),
        FallbackDataProvider::new(),
        &config,
        states.clone(),
    ));
    let favorites = Arc::new(FavoriteSyncEngine::new(store.clone(), states.clone()));
    let view_model = Arc::new(FeedViewModel::new(
        pagination,
        favorites,
        session,
        states.clone(),
    ));
    view_model.bind();

    let flux = Flux::with_store(states);
    register_handlers(&flux, Arc::new(FeedContext::new(view_model.clone(), &config)));
    flux.subscribe(FeedView::PATH, |_, value| {
        if let Some(view) = value.downcast_ref::<FeedView>() {
            debug!(phase = ?view.phase, items = view.items.len(), "feed view");
        }
    });

    // Drive it.
    flux.emit(StartFeedReq::PATH, StartFeedReq).await;
    for _ in 1..cli.pages {
        flux.emit(LoadMoreReq::PATH, LoadMoreReq).await;
    }
    for post_id in &cli.toggle {
        flux.emit(
            ToggleFavoriteReq::PATH,
            ToggleFavoriteReq {
                post_id: post_id.clone(),
            },
        )
        .await;
    }
    if cli.refresh {
        flux.emit(RefreshReq::PATH, RefreshReq).await;
    }

    let output = if cli.favorites {
        serde_json::to_string_pretty(&view_model.favorites_view())?
    } else {
        serde_json::to_string_pretty(&view_model.snapshot())?
    };
    println!("{}", output);
    Ok(())
}

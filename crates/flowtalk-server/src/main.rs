mod api;
mod auth;
mod communities;
mod config;
mod conversations;
mod error;
mod fanout;
mod messages;
mod rate_limit;
mod users;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use flowtalk_shared::auth::TokenKey;
use flowtalk_store::Database;
use flowtalk_translate::{
    CacheConfig, HttpTranslateProvider, PhraseTableProvider, PipelineConfig, TranslateProvider,
    TranslationCache, TranslationPipeline,
};

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in development; ignored when absent.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,flowtalk_server=debug")),
        )
        .init();

    info!("Starting FlowTalk server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env()?;
    info!(
        addr = %config.http_addr,
        db = %config.db_path().display(),
        offline = config.translator_offline,
        "Loaded configuration"
    );

    std::fs::create_dir_all(&config.database_url)?;
    let db = Database::open_at(&config.db_path())?;
    let db = Arc::new(Mutex::new(db));

    let cache = Arc::new(TranslationCache::new(CacheConfig {
        max_entries: config.cache_max_entries,
        ttl: config.cache_ttl,
        cleanup_interval: config.cache_cleanup_interval,
    }));

    let provider: Arc<dyn TranslateProvider> = match (&config.translator_api_key, config.translator_offline) {
        (Some(key), false) => Arc::new(HttpTranslateProvider::new(
            &config.translator_api_url,
            key,
        )?),
        (None, false) => {
            warn!("TRANSLATOR_API_KEY not set, falling back to the offline phrase table");
            Arc::new(PhraseTableProvider)
        }
        (_, true) => {
            info!("Translator in offline mode, using the phrase table");
            Arc::new(PhraseTableProvider)
        }
    };

    let pipeline = Arc::new(TranslationPipeline::new(
        cache.clone(),
        provider,
        PipelineConfig {
            concurrency: config.translate_concurrency,
            max_content_codepoints: config.max_content_length,
        },
    ));

    let rate_limiter = RateLimiter::default();

    let state = AppState {
        db,
        pipeline,
        token_key: TokenKey::from_secret(&config.jwt_secret),
        rate_limiter: rate_limiter.clone(),
        config: Arc::new(config.clone()),
    };

    // Cache cleanup on the configured interval.
    let cleanup_cache = cache.clone();
    let cache_janitor = tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_cache.cleanup_interval());
        loop {
            interval.tick().await;
            let removed = cleanup_cache.cleanup().await;
            if removed > 0 {
                debug!(removed, "expired translation cache entries removed");
            }
        }
    });

    // Rate limiter cleanup every 5 min, evict buckets idle >10 min.
    let rl = rate_limiter.clone();
    let limiter_janitor = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale(600.0).await;
        }
    });

    let http_addr = config.http_addr;
    tokio::select! {
        result = api::serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                cache_janitor.abort();
                limiter_janitor.abort();
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    // Drain: stop the janitors and drop the cache with the process.
    cache_janitor.abort();
    limiter_janitor.abort();

    Ok(())
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use teloxide::Bot;
use tokio::sync::watch;
use tracing::{info, warn};

use agora_channels::MessageChannel;
use agora_core::{
    config::AgoraConfig,
    retry::{with_retry, RetryPolicy},
};
use agora_polls::PollService;
use agora_reports::{register_recurring_jobs, ReportContext};
use agora_scheduler::{JobStore, Scheduler};
use agora_store::{BotLogLevel, SqliteStore, Store};
use agora_telegram::{BotContext, TelegramAdapter, TelegramChannel};

mod app;
mod http;
mod runner;

#[derive(Debug, Parser)]
#[command(name = "agora-gateway", version, about = "Community bot for a Telegram founders group")]
struct Cli {
    /// Path to the TOML config file. Falls back to $AGORA_CONFIG, then
    /// ~/.agora/agora.toml.
    #[arg(long, short)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("AGORA_CONFIG").ok());
    let config = AgoraConfig::load(config_path.as_deref()).context("loading configuration")?;

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    let store = Arc::new(SqliteStore::new(open_db(db_path)?)?);
    let job_store = if config.scheduler.persist_jobs {
        Some(JobStore::new(open_db(db_path)?)?)
    } else {
        None
    };
    info!("database migrations complete");

    let retry = RetryPolicy::from(&config.retry);
    let bot = Bot::new(&config.telegram.bot_token);
    let channel: Arc<dyn MessageChannel> = Arc::new(TelegramChannel::new(bot.clone()));

    let scheduler = Scheduler::new(
        job_store,
        Duration::from_secs(config.scheduler.job_timeout_secs),
    );
    let resolve_after = chrono::Duration::seconds(
        i64::try_from(config.scheduler.poll_resolve_after_secs)
            .context("scheduler.poll_resolve_after_secs out of range")?,
    );
    let polls = Arc::new(PollService::new(
        scheduler.clone(),
        Arc::clone(&channel),
        store.clone() as Arc<dyn Store>,
        retry.clone(),
        resolve_after,
    ));

    // Open polls come back with their resolver jobs.
    let restored = scheduler.restore()?;
    polls.rehydrate(&restored);
    let added = register_recurring_jobs(&scheduler)?;
    info!(restored = restored.len(), added, "scheduler ready");

    let bot_username = {
        let channel = &channel;
        match with_retry("identity", &retry, move || channel.identity()).await {
            Ok(name) => {
                info!(username = %name, "connected to Telegram");
                Some(name)
            }
            Err(e) => {
                warn!(error = %e, "Telegram identity check failed, continuing");
                None
            }
        }
    };

    let reports = ReportContext {
        channel: Arc::clone(&channel),
        store: store.clone() as Arc<dyn Store>,
        retry: retry.clone(),
        chat_id: config.telegram.chat_id,
        discussion_thread: Some(config.telegram.threads.discussion),
        ops_chat_id: config.ops.log_chat_id,
    };
    let runner = Arc::new(runner::JobRunner::new(Arc::clone(&polls), reports));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.clone().run(runner, shutdown_rx.clone()));

    let bot_ctx = Arc::new(BotContext {
        config: config.telegram.clone(),
        bot_username,
        polls: Arc::clone(&polls),
        scheduler: scheduler.clone(),
        store: store.clone() as Arc<dyn Store>,
        channel: Arc::clone(&channel),
        retry,
    });
    let telegram_task = tokio::spawn(TelegramAdapter::new(bot, bot_ctx).run(shutdown_rx.clone()));

    log_event(store.as_ref(), BotLogLevel::Info, "bot started").await;

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let state = Arc::new(app::AppState::new(scheduler.clone(), polls));
    let router = app::build_router(state);
    let addr: SocketAddr = format!("{}:{}", config.http.bind, config.http.port).parse()?;
    info!("Agora gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let mut http_shutdown = shutdown_rx;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = http_shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    if let Err(e) = telegram_task.await {
        warn!(error = %e, "telegram task ended abnormally");
    }
    if let Err(e) = scheduler_task.await {
        warn!(error = %e, "scheduler task ended abnormally");
    }
    scheduler.flush().await;
    log_event(store.as_ref(), BotLogLevel::Info, "bot stopped").await;
    Ok(())
}

/// Open a connection to the bot database with the pragmas every subsystem
/// expects.
fn open_db(path: &str) -> anyhow::Result<rusqlite::Connection> {
    let db = rusqlite::Connection::open(path)
        .with_context(|| format!("opening database at {path}"))?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
    Ok(db)
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

async fn log_event(store: &dyn Store, level: BotLogLevel, message: &str) {
    if let Err(e) = store.log_bot_event(level, message).await {
        warn!(error = %e, "writing bot log failed");
    }
}

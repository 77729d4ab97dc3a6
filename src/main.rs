//! # IQX Rewrite
//!
//! Scrapes stock-market news from a listing page on cafef.vn, extracts and
//! vets each article, rewrites it for SEO through an OpenAI-compatible chat
//! API, and optionally publishes the result as a post.
//!
//! ## Usage
//!
//! ```sh
//! iqx_rewrite --config ./iqx.yaml run
//! iqx_rewrite --config ./iqx.yaml watch
//! ```
//!
//! ## Architecture
//!
//! Each run follows the same pipeline:
//! 1. **Listing**: Collect candidate article links from the target page
//! 2. **Classification**: Drop links that are not article pages
//! 3. **Extraction**: Fetch each article and pull out title and body
//! 4. **Validation**: Sanitize the body and reject thin or spammy content
//! 5. **Rewrite**: Send the article to the chat API and store the result
//! 6. **Publish**: Optionally turn the rewrite into a post

use clap::Parser;
use std::error::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod pipeline;
mod publish;
mod sanitize;
mod scrapers;
mod store;
mod utils;
mod validate;

use cli::{Cli, Command};
use config::FileConfig;
use error::PipelineError;
use models::Article;
use pipeline::{Pipeline, Trigger};
use publish::{FilePostSink, PublishSink};
use store::{ArticleStore, JsonFileStore};
use utils::{ensure_writable_dir, truncate_for_log};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339());
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received; stopping after the current article");
                token.cancel();
            }
            Err(e) => error!(error = %e, "Could not listen for Ctrl-C"),
        }
    });
}

fn print_article_line(article: &Article) {
    println!(
        "{:>5}  {:<9}  {}  {}",
        article.id,
        article.status.label(),
        article.created_at.format("%Y-%m-%d %H:%M"),
        truncate_for_log(article.display_title(), 120),
    );
}

/// Scheduled runs until cancelled. Configuration errors end the loop; any
/// other failure is logged and the next tick is awaited.
async fn watch<S, P>(pipeline: &Pipeline<S, P>) -> Result<(), PipelineError>
where
    S: ArticleStore,
    P: PublishSink,
{
    let every = pipeline.config().scraping.frequency.interval();
    let cancel = pipeline.cancellation();
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(every_secs = every.as_secs(), "Watching for new articles");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match pipeline.run_scrape(Trigger::Scheduled).await {
                    Ok(summary) => info!(?summary, "Scheduled run finished"),
                    Err(e @ PipelineError::Config(_)) => return Err(e),
                    Err(e) => error!(error = %e, "Scheduled run failed"),
                }
            }
        }
    }
    info!("Watch stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    init_tracing(args.json_logs);

    let start_time = std::time::Instant::now();
    info!(config = %args.config.display(), "iqx_rewrite starting up");

    let config = FileConfig::load(&args.config)?.resolve(args.overrides())?;
    info!(
        target = %config.target_url,
        domain = config.target_domain(),
        model = %config.api.model,
        limit = config.scraping.limit,
        "Configuration loaded"
    );

    let store = JsonFileStore::open(&config.store_path).await?;
    let sink = FilePostSink::new(&config.post.output_dir);
    if matches!(args.command, Command::Run | Command::Watch | Command::Publish { .. }) {
        ensure_writable_dir(&config.post.output_dir).await?;
    }
    info!(
        store = %store.path().display(),
        posts = %sink.root().display(),
        "Storage ready"
    );
    let pipeline = Pipeline::new(config, store, sink)?;

    match args.command {
        Command::Run => {
            cancel_on_interrupt(pipeline.cancellation());
            let summary = pipeline.run_scrape(Trigger::Manual).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Watch => {
            cancel_on_interrupt(pipeline.cancellation());
            watch(&pipeline).await?;
        }
        Command::List { page, per_page } => {
            let listing = pipeline.list_articles(page, per_page).await?;
            for article in &listing.items {
                print_article_line(article);
            }
            println!("page {page}, {} of {} articles", listing.items.len(), listing.total);
        }
        Command::Pending { limit } => {
            let pending = pipeline.pending_articles(limit).await?;
            for article in &pending {
                print_article_line(article);
            }
            println!("{} pending", pending.len());
        }
        Command::Rewrite { id } => {
            let article = pipeline.rewrite_article(id).await?;
            print_article_line(&article);
        }
        Command::Publish { id } => {
            let article = pipeline.publish_article(id).await?;
            print_article_line(&article);
            if let Some(post) = article.published_ref() {
                println!("post: {}", post.0);
            }
        }
    }

    info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "iqx_rewrite finished"
    );
    Ok(())
}

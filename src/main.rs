//! News Curator — Binary Entrypoint
//! One-shot run: fetch candidates, rank, gate, compose, publish, persist.
//!
//! Exit codes: 0 posted (or dry run), 1 nothing eligible to post, 2 fatal.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_curator::ai::{CallBudget, OpenAiJudge};
use news_curator::compose::PostComposer;
use news_curator::config::{CurationConfig, Settings};
use news_curator::extract::render::BrowserlessRenderer;
use news_curator::extract::{ArticleExtractor, HttpFetcher, PageRenderer};
use news_curator::history::{default_store_path, PostStore};
use news_curator::pool::JsonFeedSource;
use news_curator::publish::bluesky::BlueskyPublisher;
use news_curator::publish::twitter::TwitterPublisher;
use news_curator::publish::Publisher;
use news_curator::rank::Ranker;
use news_curator::similarity::SimilarityChecker;
use news_curator::{CurationPipeline, PipelineConfig, PoolAllocation, RunOutcome};

/// Curate one newsworthy article and post it to social platforms.
#[derive(Parser, Debug)]
#[command(name = "news-curator")]
#[command(about = "Selects, vets, and posts one news article per run", long_about = None)]
struct Args {
    /// Run every gate but skip publishing and persistence
    #[arg(long)]
    test: bool,

    /// Platforms to post to (default: all with configured credentials)
    #[arg(long, value_delimiter = ',', value_name = "NAME")]
    platforms: Vec<String>,

    /// Curation config TOML (default: $CURATION_CONFIG_PATH or config/curation.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Feed export location, file path or http(s) URL (default: $NEWS_FEED_SOURCE)
    #[arg(long, value_name = "PATH_OR_URL")]
    feed: Option<String>,

    /// Post store path
    #[arg(long, value_name = "FILE")]
    store: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_curator=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn build_publishers(
    settings: &Settings,
    requested: &[String],
) -> anyhow::Result<Vec<Arc<dyn Publisher>>> {
    let wanted: Vec<String> = if requested.is_empty() {
        let mut all = Vec::new();
        if settings.has_bluesky() {
            all.push("bluesky".to_string());
        }
        if settings.has_twitter() {
            all.push("twitter".to_string());
        }
        all
    } else {
        requested.iter().map(|p| p.trim().to_lowercase()).collect()
    };

    let mut publishers: Vec<Arc<dyn Publisher>> = Vec::new();
    for name in &wanted {
        match name.as_str() {
            "bluesky" => {
                let (Some(identifier), Some(password)) = (
                    settings.bluesky_identifier.as_deref(),
                    settings.bluesky_password.as_deref(),
                ) else {
                    anyhow::bail!("bluesky requested but BLUESKY_IDENTIFIER/BLUESKY_APP_PASSWORD not set");
                };
                publishers.push(Arc::new(BlueskyPublisher::new(
                    &settings.bluesky_pds_base,
                    identifier,
                    password,
                )));
            }
            "twitter" => {
                let Some(bearer) = settings.twitter_bearer_token.as_deref() else {
                    anyhow::bail!("twitter requested but TWITTER_BEARER_TOKEN not set");
                };
                publishers.push(Arc::new(TwitterPublisher::new(bearer)));
            }
            other => anyhow::bail!("unknown platform: {other}"),
        }
    }
    Ok(publishers)
}

async fn run(args: Args) -> anyhow::Result<RunOutcome> {
    let settings = Settings::from_env();
    if args.test {
        if settings.ai_api_key.is_empty() {
            anyhow::bail!("missing AI_API_KEY");
        }
    } else {
        settings.validate()?;
    }

    let cfg = CurationConfig::load(args.config.as_deref())?;

    let budget = CallBudget::new(&cfg.ai.budget_dir, cfg.ai.daily_limit);
    let judge = Arc::new(OpenAiJudge::new(
        &settings.ai_api_base,
        &settings.ai_api_key,
        &settings.ai_model,
        budget,
    ));

    let fetcher = Arc::new(HttpFetcher::new(&cfg.extract.user_agent));
    let renderer: Option<Arc<dyn PageRenderer>> = settings
        .renderer_base_url
        .as_deref()
        .map(|base| {
            Arc::new(BrowserlessRenderer::new(
                base,
                settings.renderer_token.as_deref(),
            )) as Arc<dyn PageRenderer>
        });
    if renderer.is_none() {
        tracing::warn!("no renderer configured; paywall fallback extraction disabled");
    }

    let feed = args
        .feed
        .clone()
        .or_else(|| settings.feed_source.clone())
        .ok_or_else(|| anyhow::anyhow!("no feed source: pass --feed or set NEWS_FEED_SOURCE"))?;

    let publishers = build_publishers(&settings, &args.platforms)?;
    let store_path = args
        .store
        .clone()
        .unwrap_or_else(|| default_store_path().to_path_buf());

    let pipeline = CurationPipeline {
        cfg: PipelineConfig {
            allocation: PoolAllocation::from_config(&cfg.pool),
            shortlist_size: cfg.pool.shortlist_size,
            history_window: cfg.history.window_size,
            min_word_count: cfg.extract.min_word_count,
            test_mode: args.test,
        },
        source: Arc::new(JsonFeedSource::new(feed)),
        ranker: Ranker::new(judge.clone()),
        extractor: ArticleExtractor::new(cfg.extract.clone(), fetcher, renderer),
        similarity: SimilarityChecker::new(cfg.similarity.clone(), judge.clone()),
        composer: PostComposer::new(cfg.compose.clone(), judge),
        publishers,
        store: PostStore::new(store_path, cfg.history.max_records),
    };

    Ok(pipeline.run().await?)
}

#[tokio::main]
async fn main() {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();
    tracing::info!(test = args.test, "starting news-curator run");

    let exit_code = match run(args).await {
        Ok(RunOutcome::Posted { record, published }) => {
            tracing::info!(
                url = %record.candidate_url,
                platforms = published.len(),
                "run complete: posted"
            );
            0
        }
        Ok(RunOutcome::DryRun { selection, post }) => {
            tracing::info!(
                title = %selection.candidate.title,
                text = %post.rendered(),
                "run complete: dry run"
            );
            0
        }
        Ok(RunOutcome::NoEligibleCandidate { considered }) => {
            tracing::warn!(considered, "run complete: no eligible candidate today");
            1
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "run failed");
            2
        }
    };

    tracing::info!(exit_code, "news-curator finished");
    std::process::exit(exit_code);
}

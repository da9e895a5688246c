//! Job Hunter CLI
//!
//! Runs one hunt: fetch sources, screen, deliver the digest, record what was sent.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use job_hunter::{
    error::Result,
    models::Config,
    pipeline::{self, Hunt, RunOptions},
    services::{
        Deliverer, DiscordWebhook, HttpProbe, PostSource, RedditClient, RedditCredentials,
        SimplifyFeed, discord,
    },
    storage::LocalStateStore,
    utils::http,
};

const CONFIG_ENV: &str = "JOB_HUNTER_CONFIG";
const WEBHOOK_ENV: &str = "DISCORD_WEBHOOK_URL";

/// Job Hunter - internship and new-grad digest
#[derive(Parser, Debug)]
#[command(
    name = "job-hunter",
    version,
    about = "Collects internship postings and sends a daily digest"
)]
struct Cli {
    /// Ignore previously announced links
    #[arg(long)]
    force: bool,

    /// Print the digest instead of delivering it; leaves run state untouched
    #[arg(long)]
    dry_run: bool,
}

/// Initialize logging from `RUST_LOG`, defaulting to info.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Run failed: {e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    log::info!("Job Hunter starting...");

    let config_path =
        PathBuf::from(std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".into()));
    let config = Config::load_or_default(&config_path);
    config.validate()?;

    let source_client =
        http::create_client(&config.http.user_agent, config.http.source_timeout_secs)?;
    let feed_client =
        http::create_client(&config.http.user_agent, config.http.feed_timeout_secs)?;
    let probe_client = http::create_client(
        &config.http.probe_user_agent,
        config.http.resolve_timeout_secs,
    )?;

    let sources: Vec<Box<dyn PostSource>> = vec![
        Box::new(RedditClient::new(
            source_client,
            config.sources.communities.clone(),
            config.sources.fetch_limit,
            RedditCredentials::from_env(),
        )),
        Box::new(SimplifyFeed::new(
            feed_client,
            config.sources.feed_url.clone(),
            config.sources.feed_name.clone(),
        )),
    ];

    let webhook = match std::env::var(WEBHOOK_ENV) {
        Ok(url) if !url.trim().is_empty() => {
            let client =
                http::create_client(&config.http.user_agent, config.http.webhook_timeout_secs)?;
            let webhook = DiscordWebhook::new(client, &url, config.delivery.clone());
            log::info!("Delivering to {}", discord::mask(&url));
            Some(webhook)
        }
        _ => {
            if !cli.dry_run {
                log::warn!("{WEBHOOK_ENV} is not set; postings will not be delivered");
            }
            None
        }
    };

    let probe = HttpProbe::new(probe_client);
    let store = LocalStateStore::new(&config.run.state_file);
    let hunt = Hunt {
        sources: &sources,
        probe: &probe,
        store: &store,
        deliverer: webhook.as_ref().map(|w| w as &dyn Deliverer),
    };
    let options = RunOptions {
        force: cli.force,
        dry_run: cli.dry_run,
        ..Default::default()
    };

    let report = pipeline::run_hunt(&config, &hunt, &options).await?;

    if cli.dry_run {
        for line in report.digest() {
            println!("{line}");
        }
    }

    log::info!(
        "Done! {} posting(s) selected, {} announced",
        report.postings.len(),
        report.announced.len()
    );

    Ok(())
}

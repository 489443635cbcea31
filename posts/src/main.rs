//! `postboard`: prints every post of a placeholder API with its author.
//!
//! ```bash
//! postboard --base-url http://localhost:3000 --user-fetch memoized
//! RUST_LOG=postboard=debug postboard --header fetch-on-mount
//! ```

use anyhow::Context;
use clap::Parser;
use postboard::{
    new_store, HeaderStrategy, HttpPlaceholderApi, Loader, PostList, PostboardConfig,
    UserFetchPolicy,
};
use postboard_runtime::StoreConfig;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fetch posts and their authors from a JSONPlaceholder-style API
#[derive(Parser, Debug)]
#[command(name = "postboard", version, about)]
struct Cli {
    /// API server [env: POSTBOARD_BASE_URL]
    #[arg(long)]
    base_url: Option<String>,

    /// Per-request timeout in seconds [env: POSTBOARD_REQUEST_TIMEOUT_SECS]
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// `always` or `memoized` [env: POSTBOARD_USER_FETCH]
    #[arg(long)]
    user_fetch: Option<UserFetchPolicy>,

    /// `pull` or `fetch-on-mount` [env: POSTBOARD_HEADER]
    #[arg(long)]
    header: Option<HeaderStrategy>,

    /// Default log level when RUST_LOG is unset [env: POSTBOARD_LOG_LEVEL]
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut PostboardConfig) {
        if let Some(base_url) = self.base_url {
            config.base_url = base_url.trim().to_string();
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = Some(secs);
        }
        if let Some(policy) = self.user_fetch {
            config.user_fetch = policy;
        }
        if let Some(strategy) = self.header {
            config.header = strategy;
        }
        if let Some(level) = self.log_level {
            config.log_level = level.to_ascii_lowercase();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = PostboardConfig::from_env().context("reading POSTBOARD_* environment")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    tracing::info!(
        base_url = %config.base_url,
        user_fetch = %config.user_fetch,
        header = %config.header,
        "Starting postboard"
    );

    let api = HttpPlaceholderApi::from_config(&config).context("building HTTP client")?;
    let store = new_store(StoreConfig::default());
    let loader = Loader::new(store.clone(), Arc::new(api))
        .with_policy(config.user_fetch)
        .with_failure_queue_size(config.failure_queue_size);

    let mut list = PostList::new(config.header);

    match config.header {
        HeaderStrategy::Pull => {
            let fetches = loader
                .load_posts_and_authors()
                .await
                .context("loading posts")?;
            let report = fetches.wait().await;
            tracing::info!(
                fetched = report.fetched.len(),
                failed = report.failed.len(),
                "Authors loaded"
            );
            list.sync(&store.state(|state| state.posts.clone()).await);
        },
        HeaderStrategy::FetchOnMount => {
            loader.load_posts().await.context("loading posts")?;
            list.sync(&store.state(|state| state.posts.clone()).await);
            list.mount(&loader).await;
        },
    }

    let (rendered, posts, users, duplicates) = store
        .state(|state| {
            (
                list.render(state),
                state.posts.len(),
                state.users.len(),
                state.duplicate_user_records(),
            )
        })
        .await;

    print!("{rendered}");
    println!();
    println!("{posts} posts, {users} user records ({duplicates} duplicates)");

    let failures = loader.failures().drain();
    if !failures.is_empty() {
        println!("{} failed user fetches:", failures.len());
        for failure in &failures {
            println!("  user {}: {}", failure.payload, failure.error_message);
        }
    }

    store
        .shutdown(store.config().shutdown_timeout)
        .await
        .context("shutting down store")?;

    Ok(())
}

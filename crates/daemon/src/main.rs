//! vigild — the change-listener daemon.
//!
//! Loads listener definitions from the configured sources, then runs
//! the tick loop: gate, concurrent pipelines, change detection,
//! notification dispatch, store flush. `--once` runs a single tick at
//! t=0 and exits.

mod runner;
mod sources;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use vigil_core::Config;
use vigil_engine::html::RawDocumentParser;
use vigil_engine::http::ReqwestClient;
use vigil_engine::pipeline::PipelineContext;
use vigil_engine::store::Store;
use vigil_notify::browser::BrowserNotifier;
use vigil_notify::desktop::DesktopNotifier;
use vigil_notify::slack::SlackNotifier;
use vigil_notify::{Dispatcher, Notifier};

use runner::Runner;

/// Change-listener daemon: evaluates listener pipelines on a fixed
/// tick and dispatches notifications on value transitions.
#[derive(Parser, Debug)]
#[command(name = "vigild", version, about)]
struct Cli {
    /// Newline-separated listener source list.
    #[arg(long)]
    listeners: Option<PathBuf>,

    /// Remote source list URL (used in headless mode).
    #[arg(long)]
    listeners_url: Option<String>,

    /// Path of the persisted value store.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Run exactly one tick at t=0, flush the store, and exit.
    #[arg(long)]
    once: bool,

    /// Disable desktop notifications and browser launches.
    #[arg(long)]
    headless: bool,

    /// Default per-listener debug logging.
    #[arg(long)]
    debug: bool,

    /// Logical tick step in seconds.
    #[arg(long)]
    tick_secs: Option<u64>,
}

impl Cli {
    /// Overlay command-line flags on the environment config.
    fn apply(&self, config: &mut Config) {
        if let Some(listeners) = &self.listeners {
            config.sources.list_file = listeners.clone();
        }
        if let Some(url) = &self.listeners_url {
            config.sources.remote_url = Some(url.clone());
        }
        if let Some(store) = &self.store {
            config.runtime.store_file = store.clone();
        }
        if let Some(tick_secs) = self.tick_secs {
            config.runtime.tick_secs = tick_secs;
        }
        config.runtime.single_shot |= self.once;
        config.runtime.headless |= self.headless;
        config.runtime.debug |= self.debug;
    }
}

/// Build the delivery channels the runtime configuration allows.
fn build_dispatcher(config: &Config) -> Dispatcher {
    let mut channels: Vec<Box<dyn Notifier>> = Vec::new();

    if !config.runtime.headless {
        channels.push(Box::new(BrowserNotifier::new()));
        channels.push(Box::new(DesktopNotifier::new()));
    }

    if let Some(token) = &config.slack.token {
        match SlackNotifier::from_config(
            token.clone(),
            config.slack.channel.clone(),
            config.slack.users.clone(),
        ) {
            Ok(slack) => channels.push(Box::new(slack)),
            Err(error) => warn!(error = %error, "Slack channel disabled"),
        }
    }

    Dispatcher::new(channels)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    vigil_core::load_dotenv();
    let cli = Cli::parse();
    let mut config = Config::from_env();
    cli.apply(&mut config);
    config.log_summary();

    let client = reqwest::Client::new();
    let definitions = sources::load_listeners(&config, &client).await?;
    if definitions.is_empty() {
        warn!("no listeners loaded");
    } else {
        info!(listeners = definitions.len(), "listener definitions loaded");
    }

    let store = Store::load(&config.runtime.store_file);
    let context = PipelineContext {
        http: Arc::new(ReqwestClient::new()),
        html: Arc::new(RawDocumentParser),
    };
    let dispatcher = build_dispatcher(&config);
    info!(channels = dispatcher.channel_count(), "notification channels ready");

    let mut runner = Runner::new(
        definitions,
        store,
        context,
        dispatcher,
        config.runtime.debug,
    );

    if config.runtime.single_shot {
        runner.run_tick(0).await;
        info!("single-shot tick complete");
    } else {
        info!(tick_secs = config.runtime.tick_secs, "vigild starting tick loop");
        runner.run(config.runtime.tick_secs).await;
    }

    Ok(())
}

//! Listener source acquisition.
//!
//! Reads the newline-separated source list (local file, or the remote
//! URL in headless mode), fetches each listed source, and parses it
//! into listener definitions. A source that cannot be read or parsed
//! contributes zero listeners; the others still load.

use std::fs;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use url::Url;

use vigil_core::Config;
use vigil_engine::definition::ListenerDefinition;
use vigil_engine::loader;

/// Load every listener definition the configured sources declare.
pub async fn load_listeners(
    config: &Config,
    client: &reqwest::Client,
) -> Result<Vec<ListenerDefinition>> {
    let list_text = if config.runtime.headless {
        let url = match &config.sources.remote_url {
            Some(url) => url,
            None => bail!("headless mode requires LISTENERS_URL"),
        };
        fetch_remote(client, url)
            .await
            .with_context(|| format!("fetching source list from {url}"))?
    } else {
        fs::read_to_string(&config.sources.list_file).with_context(|| {
            format!("reading source list {}", config.sources.list_file.display())
        })?
    };

    let mut definitions = Vec::new();
    for location in loader::parse_source_list(&list_text) {
        let text = match read_source(client, &location).await {
            Ok(text) => text,
            Err(error) => {
                warn!(source = %location, error = %error, "cannot read listener source");
                continue;
            }
        };
        match loader::parse_definitions(&location, &text) {
            Ok(mut parsed) => {
                info!(source = %location, listeners = parsed.len(), "loaded listener source");
                definitions.append(&mut parsed);
            }
            Err(error) => {
                warn!(source = %location, error = %error, "failed to parse listener source");
            }
        }
    }

    Ok(definitions)
}

/// Whether a source location is an absolute http(s) URL.
fn is_remote(location: &str) -> bool {
    Url::parse(location)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

async fn read_source(client: &reqwest::Client, location: &str) -> Result<String> {
    if is_remote(location) {
        fetch_remote(client, location).await
    } else {
        fs::read_to_string(location).with_context(|| format!("reading {location}"))
    }
}

async fn fetch_remote(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        bail!("{url} returned {status}");
    }
    Ok(response.text().await?)
}

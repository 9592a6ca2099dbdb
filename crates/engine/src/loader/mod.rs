//! Definition loader.
//!
//! Turns raw config text into listener definitions. Two source forms
//! are supported, dispatched on the location's file extension:
//! - `.json` — an array of listener objects with code-only pipelines;
//! - `.md` — one `# `-headed section per listener, holding one fenced
//!   `yaml` config block and any number of `javascript`/`fetch`/`curl`
//!   step blocks in document order.
//!
//! A parse error anywhere in a source aborts that entire source (zero
//! listeners from it); other sources are unaffected.

mod json;
mod markdown;

use serde_json::Value;
use tracing::warn;

use crate::definition::{ActionSpec, ListenerDefinition, Step, DEFAULT_COMPARE};

/// Errors that abort a source's load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid definition: {0}")]
    Definition(String),

    #[error("unsupported source extension: {0}")]
    UnsupportedExtension(String),
}

/// Source text format, derived from the location's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Markdown,
}

/// Parse the newline-separated source list: blank lines and lines
/// starting with `#` are ignored.
pub fn parse_source_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Determine a source's format from its location.
pub fn source_format(location: &str) -> Result<SourceFormat, LoadError> {
    let extension = location
        .rsplit('.')
        .next()
        .map(str::trim)
        .unwrap_or_default();
    match extension {
        "json" => Ok(SourceFormat::Json),
        "md" => Ok(SourceFormat::Markdown),
        _ => Err(LoadError::UnsupportedExtension(location.to_string())),
    }
}

/// Parse one source's text into listener definitions.
pub fn parse_definitions(
    location: &str,
    text: &str,
) -> Result<Vec<ListenerDefinition>, LoadError> {
    match source_format(location)? {
        SourceFormat::Json => json::parse_json(text),
        SourceFormat::Markdown => markdown::parse_markdown(text),
    }
}

/// Raw fields common to both source forms, before defaults apply.
#[derive(Debug, Default)]
pub(super) struct DefinitionParts {
    pub name: String,
    pub user: Option<String>,
    pub initial_value: Option<Value>,
    pub compare: Option<String>,
    pub open: Option<String>,
    pub notify: Option<String>,
    pub interval: Option<i64>,
    pub delay: Option<i64>,
    pub debug: Option<bool>,
    pub pipeline: Vec<Step>,
}

/// Apply defaults and produce the immutable definition.
pub(super) fn build_definition(parts: DefinitionParts) -> Result<ListenerDefinition, LoadError> {
    if parts.name.trim().is_empty() {
        return Err(LoadError::Definition("listener has no name".to_string()));
    }
    if parts.pipeline.is_empty() {
        warn!(listener = %parts.name, "listener has an empty pipeline");
    }

    Ok(ListenerDefinition {
        name: parts.name.trim().to_string(),
        user: parts.user.unwrap_or_else(|| "channel".to_string()),
        initial_value: parts.initial_value,
        compare: parts.compare.unwrap_or_else(|| DEFAULT_COMPARE.to_string()),
        pipeline: parts.pipeline,
        open: ActionSpec::classify(parts.open),
        notify: ActionSpec::classify(parts.notify),
        interval: parts.interval.unwrap_or(60),
        delay: parts.delay.unwrap_or(0),
        debug: parts.debug,
    })
}

//! Listener definition schema.
//!
//! Definitions are built once by the loader and never mutated afterwards.
//! Defaults (recipient, compare expression, interval) are applied at load
//! time so the executor only ever sees fully-formed definitions.

use indexmap::IndexMap;
use serde_json::Value;

/// Compare expression used when a listener does not declare one.
pub const DEFAULT_COMPARE: &str = "prevValue !== value";

/// How a fetched response body is decoded into the pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Text,
    Json,
    Html,
}

impl ResponseKind {
    /// Derive the kind from a block tag-line metadata string.
    ///
    /// Only the first four characters are significant (`"json https://…"`
    /// reads as json). Empty metadata means text.
    pub fn from_metadata(metadata: &str) -> Option<Self> {
        let key: String = metadata.trim().chars().take(4).collect();
        match key.as_str() {
            "" | "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "html" => Some(Self::Html),
            _ => None,
        }
    }

    /// The url-line key this kind selects in a fetch block.
    pub fn line_key(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}

/// One unit of pipeline work.
#[derive(Debug, Clone)]
pub enum Step {
    Fetch(FetchStep),
    Curl(CurlStep),
    Code(CodeStep),
}

/// A request described by header-style `key: value` lines.
///
/// Repeated keys accumulate in declaration order; the URL line is the
/// first entry under the response-kind key, headers are the `header`
/// entries, and the method is the first `method` entry.
#[derive(Debug, Clone)]
pub struct FetchStep {
    pub kind: ResponseKind,
    pub lines: IndexMap<String, Vec<String>>,
}

/// A request described in curl syntax, with `{{ expr }}` template tokens.
#[derive(Debug, Clone)]
pub struct CurlStep {
    pub kind: ResponseKind,
    pub template: String,
}

/// A computation step evaluated against the pipeline state.
#[derive(Debug, Clone)]
pub struct CodeStep {
    pub source: String,
}

/// A notification field that may be a plain string or an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSpec {
    Literal(String),
    Expression(String),
    Absent,
}

impl ActionSpec {
    /// Classify a raw config string.
    ///
    /// Strings opening with a quote character or containing a `return`
    /// keyword are evaluated at fire time; anything else is literal.
    pub fn classify(raw: Option<String>) -> Self {
        match raw {
            None => Self::Absent,
            Some(s) => {
                if s.starts_with('"') || s.starts_with('\'') || crate::expr::has_return_keyword(&s)
                {
                    Self::Expression(s)
                } else {
                    Self::Literal(s)
                }
            }
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// A named, independently scheduled pipeline with comparison and
/// notification rules.
#[derive(Debug, Clone)]
pub struct ListenerDefinition {
    /// Unique key into the value store.
    pub name: String,
    /// Notification recipient tag (`"channel"` targets everyone).
    pub user: String,
    /// Seed for the pipeline value; when absent the stored value is used.
    pub initial_value: Option<Value>,
    /// Boolean expression over `prevValue` / `value`.
    pub compare: String,
    /// Ordered steps; order is fixed at load time.
    pub pipeline: Vec<Step>,
    /// URL to open on fire.
    pub open: ActionSpec,
    /// Notification message on fire.
    pub notify: ActionSpec,
    /// Tick period in seconds.
    pub interval: i64,
    /// Tick phase offset in seconds.
    pub delay: i64,
    /// Per-listener debug logging; `None` inherits the global flag.
    pub debug: Option<bool>,
}

impl ListenerDefinition {
    pub fn debug_enabled(&self, global: bool) -> bool {
        self.debug.unwrap_or(global)
    }
}

//! Request template translation.
//!
//! Turns a declarative step body — header-style `key: value` lines or a
//! curl command with `{{ }}` template tokens — into a resolved request
//! the HTTP transport can issue.

mod curl;
mod fetch;

pub use curl::{interpolate, translate_curl};
pub use fetch::translate_fetch;

use indexmap::IndexMap;

use crate::expr::{display_string, evaluate, EvalError, Scope};

/// A fully resolved request description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub url: String,
    pub method: String,
    pub headers: IndexMap<String, String>,
}

/// Translation failure: the step is skipped, fetch slots untouched.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("no resolvable url")]
    MissingUrl,

    #[error("url expression failed: {0}")]
    UrlEval(#[from] EvalError),

    #[error("malformed request template: {0}")]
    Syntax(String),
}

/// Resolve a url field: a plain token is literal; text opening with a
/// quote or containing `return` is evaluated as an expression.
pub(crate) fn resolve_url(raw: &str, scope: &Scope<'_>) -> Result<String, TranslateError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TranslateError::MissingUrl);
    }
    if raw.starts_with('"') || raw.starts_with('\'') || crate::expr::has_return_keyword(raw) {
        let value = evaluate(raw, scope)?;
        let url = display_string(&value);
        if url.is_empty() {
            return Err(TranslateError::MissingUrl);
        }
        Ok(url)
    } else {
        Ok(raw.to_string())
    }
}

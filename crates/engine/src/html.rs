//! HTML document collaborator contracts.
//!
//! Document parsing lives outside the engine. The pipeline stores
//! whatever the configured [`DocumentParser`] produces; expressions
//! reach it through the `select` helper and the `html` binding.

use std::sync::Arc;

/// A parsed document handle.
pub trait Document: Send + Sync {
    /// The document's textual form (exposed to expressions as `html`).
    fn text(&self) -> &str;

    /// Text content of the first node matching a selector, if any.
    fn select_first(&self, selector: &str) -> Option<String>;
}

/// Produces documents from fetched response bodies.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, html: &str) -> Arc<dyn Document>;
}

/// Passthrough implementation used when no HTML engine is wired in:
/// the raw markup is exposed as text and selectors never match.
pub struct RawDocumentParser;

impl DocumentParser for RawDocumentParser {
    fn parse(&self, html: &str) -> Arc<dyn Document> {
        Arc::new(RawDocument {
            text: html.to_string(),
        })
    }
}

struct RawDocument {
    text: String,
}

impl Document for RawDocument {
    fn text(&self) -> &str {
        &self.text
    }

    fn select_first(&self, _selector: &str) -> Option<String> {
        None
    }
}

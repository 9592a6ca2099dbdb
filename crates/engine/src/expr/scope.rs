//! Two-tier identifier scope for expression evaluation.

use std::cell::Cell;

use serde_json::{Map, Value};

use crate::html::Document;

/// The environment a snippet evaluates against.
///
/// Lookup order: when the current computed value is an object its fields
/// resolve first, so bare identifiers reach into the value; everything
/// else falls back to the named outer bindings (`text`, `json`, `error`,
/// `value`, `prevValue`, …). The scope also carries the optional HTML
/// document handle for the `select` helper and the exit flag set by the
/// `exit()` helper.
#[derive(Default)]
pub struct Scope<'a> {
    value_fields: Option<&'a Map<String, Value>>,
    bindings: Vec<(String, Value)>,
    document: Option<&'a dyn Document>,
    exit: Cell<bool>,
}

impl<'a> Scope<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an outer-tier binding.
    pub fn bind(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bindings.push((name.into(), value));
        self
    }

    /// Bind the current computed value, exposing its fields as the inner
    /// tier when it is an object.
    pub fn with_value(mut self, value: &'a Value) -> Self {
        if let Value::Object(fields) = value {
            self.value_fields = Some(fields);
        }
        self.bindings.push(("value".to_string(), value.clone()));
        self
    }

    /// Attach a parsed document; `html` resolves to its text and the
    /// `select` helper queries it.
    pub fn with_document(mut self, document: &'a dyn Document) -> Self {
        self.bindings
            .push(("html".to_string(), Value::String(document.text().to_string())));
        self.document = Some(document);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(fields) = self.value_fields {
            if let Some(found) = fields.get(name) {
                return Some(found.clone());
            }
        }
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value.clone())
    }

    pub fn document(&self) -> Option<&dyn Document> {
        self.document
    }

    pub fn request_exit(&self) {
        self.exit.set(true);
    }

    pub fn exit_requested(&self) -> bool {
        self.exit.get()
    }
}

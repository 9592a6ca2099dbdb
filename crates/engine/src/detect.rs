//! Change detection and fire resolution.
//!
//! Compares a listener's freshly computed value with its last observed
//! value and, on a detected transition, resolves the open-url and
//! notification-message fields into a [`FireEvent`] ready for dispatch.

use serde_json::{json, Value};
use tracing::warn;

use crate::definition::{ActionSpec, ListenerDefinition};
use crate::expr::{display_string, evaluate, truthy, Scope};

/// A detected transition, resolved for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireEvent {
    pub listener: String,
    /// Recipient tag (`"channel"` or a configured user name).
    pub user: String,
    /// Resolved message; defaults to `"<name> got a notification"`.
    pub message: String,
    /// Resolved URL to open, when the listener declares one.
    pub url: Option<String>,
    /// Whether the listener declares a desktop notification.
    pub desktop: bool,
}

/// Result of comparing one listener's new value against its history.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub fired: bool,
    /// The previous value the comparison ran against (after null
    /// coercion), kept for debug logging.
    pub prev: Value,
    pub event: Option<FireEvent>,
}

/// The type-appropriate zero substituted for a null previous value.
pub fn zero_for(value: &Value) -> Value {
    match value {
        Value::Number(_) => json!(0),
        Value::Bool(_) => json!(false),
        Value::String(_) => json!(""),
        _ => json!({}),
    }
}

/// Evaluate a listener's compare expression and resolve notifications.
///
/// `stored_prev` is the store entry for the listener, if any. The
/// previous value falls back to the declared initial value, then to the
/// type-appropriate zero of the new value.
pub fn detect_transition(
    definition: &ListenerDefinition,
    new_value: &Value,
    stored_prev: Option<&Value>,
) -> TransitionOutcome {
    let mut prev = stored_prev
        .cloned()
        .or_else(|| definition.initial_value.clone())
        .unwrap_or(Value::Null);
    if prev.is_null() {
        prev = zero_for(new_value);
    }

    let scope = Scope::new().bind("prevValue", prev.clone()).with_value(new_value);
    let fired = match evaluate(&definition.compare, &scope) {
        Ok(result) => truthy(&result),
        Err(error) => {
            warn!(
                listener = %definition.name,
                compare = %definition.compare,
                error = %error,
                "compare expression failed"
            );
            false
        }
    };

    let event = if fired {
        let url = resolve_action(&definition.open, &prev, new_value, &definition.name)
            .filter(|u| !u.is_empty());
        let message = resolve_action(&definition.notify, &prev, new_value, &definition.name)
            .unwrap_or_else(|| format!("{} got a notification", definition.name));
        Some(FireEvent {
            listener: definition.name.clone(),
            user: definition.user.clone(),
            message,
            url,
            desktop: !definition.notify.is_absent(),
        })
    } else {
        None
    };

    TransitionOutcome { fired, prev, event }
}

/// Resolve an open/notify field against `{prevValue, value}`.
///
/// Literals pass through; expressions evaluate, faulting softly to
/// `None` so the caller substitutes its default.
fn resolve_action(
    spec: &ActionSpec,
    prev: &Value,
    value: &Value,
    listener: &str,
) -> Option<String> {
    match spec {
        ActionSpec::Absent => None,
        ActionSpec::Literal(text) => Some(text.clone()),
        ActionSpec::Expression(source) => {
            let scope = Scope::new().bind("prevValue", prev.clone()).with_value(value);
            match evaluate(source, &scope) {
                Ok(resolved) => Some(display_string(&resolved)),
                Err(error) => {
                    warn!(listener = %listener, error = %error, "notification expression failed");
                    None
                }
            }
        }
    }
}

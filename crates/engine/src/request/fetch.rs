//! Header-line request form.

use indexmap::IndexMap;

use crate::definition::FetchStep;
use crate::expr::Scope;

use super::{resolve_url, ResolvedRequest, TranslateError};

/// Build a request from a fetch step's `key: value` lines.
///
/// The URL is the first line under the response-kind key (`text`, `json`
/// or `html`), the method the first `method` line (default GET), and
/// every `header` line contributes one header.
pub fn translate_fetch(
    step: &FetchStep,
    scope: &Scope<'_>,
) -> Result<ResolvedRequest, TranslateError> {
    let raw_url = step
        .lines
        .get(step.kind.line_key())
        .and_then(|values| values.first())
        .ok_or(TranslateError::MissingUrl)?;

    let url = resolve_url(raw_url, scope)?;

    let method = step
        .lines
        .get("method")
        .and_then(|values| values.first())
        .map(|m| m.trim().to_uppercase())
        .unwrap_or_else(|| "GET".to_string());

    let mut headers = IndexMap::new();
    if let Some(lines) = step.lines.get("header") {
        for line in lines {
            let (name, value) = line.split_once(':').unwrap_or((line.as_str(), ""));
            headers.insert(name.trim().to_string(), value.trim().to_string());
        }
    }

    Ok(ResolvedRequest { url, method, headers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ResponseKind;
    use serde_json::json;

    fn step(kind: ResponseKind, lines: &[(&str, &str)]) -> FetchStep {
        let mut map: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, value) in lines {
            map.entry(key.to_string())
                .or_default()
                .push(value.to_string());
        }
        FetchStep { kind, lines: map }
    }

    #[test]
    fn literal_url_and_defaults() {
        let step = step(ResponseKind::Json, &[("json", "https://api.example.com/p")]);
        let resolved = translate_fetch(&step, &Scope::new()).unwrap();
        assert_eq!(resolved.url, "https://api.example.com/p");
        assert_eq!(resolved.method, "GET");
        assert!(resolved.headers.is_empty());
    }

    #[test]
    fn method_uppercased_and_headers_collected() {
        let step = step(
            ResponseKind::Text,
            &[
                ("text", "https://example.com"),
                ("method", "post"),
                ("header", "Authorization: Bearer xyz"),
                ("header", "Accept: text/plain"),
            ],
        );
        let resolved = translate_fetch(&step, &Scope::new()).unwrap();
        assert_eq!(resolved.method, "POST");
        assert_eq!(resolved.headers["Authorization"], "Bearer xyz");
        assert_eq!(resolved.headers["Accept"], "text/plain");
    }

    #[test]
    fn computed_url_expression() {
        let value = json!({"symbol": "btc"});
        let scope = Scope::new().with_value(&value);
        let step = step(
            ResponseKind::Json,
            &[("json", "\"https://api.example.com/\" + symbol")],
        );
        let resolved = translate_fetch(&step, &scope).unwrap();
        assert_eq!(resolved.url, "https://api.example.com/btc");
    }

    #[test]
    fn missing_url_line_is_error() {
        let step = step(ResponseKind::Html, &[("json", "https://example.com")]);
        assert!(matches!(
            translate_fetch(&step, &Scope::new()),
            Err(TranslateError::MissingUrl)
        ));
    }

    #[test]
    fn failing_url_expression_is_error() {
        let step = step(ResponseKind::Text, &[("text", "\"https://\" + missing")]);
        assert!(matches!(
            translate_fetch(&step, &Scope::new()),
            Err(TranslateError::UrlEval(_))
        ));
    }

    #[test]
    fn first_url_line_wins() {
        let step = step(
            ResponseKind::Text,
            &[("text", "https://one.example"), ("text", "https://two.example")],
        );
        let resolved = translate_fetch(&step, &Scope::new()).unwrap();
        assert_eq!(resolved.url, "https://one.example");
    }
}

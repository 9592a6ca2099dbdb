//! Curl-style request form.

use indexmap::IndexMap;

use crate::definition::CurlStep;
use crate::expr::{display_string, evaluate, Scope};

use super::{ResolvedRequest, TranslateError};

/// Interpolate `{{ expr }}` tokens against the current state.
///
/// The template splits into literal / open / expression / close groups;
/// literals pass through verbatim, expressions are evaluated and their
/// display form substituted. A failing expression interpolates as the
/// empty string with a warning.
pub fn interpolate(template: &str, scope: &Scope<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        rest = &rest[open + 2..];

        let Some(close) = rest.find("}}") else {
            // Unterminated token: emit the remainder verbatim.
            out.push_str("{{");
            out.push_str(rest);
            return out;
        };

        let snippet = &rest[..close];
        rest = &rest[close + 2..];

        match evaluate(snippet, scope) {
            Ok(value) => out.push_str(&display_string(&value)),
            Err(error) => {
                tracing::warn!(snippet = %snippet.trim(), error = %error, "template expression failed");
            }
        }
    }

    out.push_str(rest);
    out
}

/// Translate a curl step: interpolate templates, then parse the curl
/// command line into a resolved request.
pub fn translate_curl(
    step: &CurlStep,
    scope: &Scope<'_>,
) -> Result<ResolvedRequest, TranslateError> {
    let rendered = interpolate(&step.template, scope);
    parse_curl(&rendered)
}

/// Parse a curl command line into `{url, method, headers}`.
///
/// Handles `-H`/`--header`, `-X`/`--request`, `--url`, and the data
/// options (which imply POST when no explicit method is given). The
/// first free argument is the URL; a leading `curl` word is skipped.
fn parse_curl(command: &str) -> Result<ResolvedRequest, TranslateError> {
    let words = shell_split(command)?;

    let mut url: Option<String> = None;
    let mut method: Option<String> = None;
    let mut headers = IndexMap::new();
    let mut has_data = false;

    let mut iter = words.into_iter();
    let mut first_word = true;

    while let Some(word) = iter.next() {
        if first_word {
            first_word = false;
            if word == "curl" {
                continue;
            }
        }

        match word.as_str() {
            "-H" | "--header" => {
                let line = iter
                    .next()
                    .ok_or_else(|| TranslateError::Syntax("missing header value".to_string()))?;
                let (name, value) = line.split_once(':').unwrap_or((line.as_str(), ""));
                headers.insert(name.trim().to_string(), value.trim().to_string());
            }
            "-X" | "--request" => {
                let value = iter
                    .next()
                    .ok_or_else(|| TranslateError::Syntax("missing request method".to_string()))?;
                method = Some(value.to_uppercase());
            }
            "--url" => {
                let value = iter
                    .next()
                    .ok_or_else(|| TranslateError::Syntax("missing url value".to_string()))?;
                url = Some(value);
            }
            "-d" | "--data" | "--data-raw" | "--data-binary" | "--data-urlencode" => {
                // The body itself is not part of the request contract,
                // but it implies POST.
                iter.next()
                    .ok_or_else(|| TranslateError::Syntax("missing data value".to_string()))?;
                has_data = true;
            }
            flag if flag.starts_with('-') => {
                tracing::debug!(flag = %flag, "ignoring unsupported curl flag");
            }
            free => {
                if url.is_none() {
                    url = Some(free.to_string());
                }
            }
        }
    }

    let url = url.filter(|u| !u.is_empty()).ok_or(TranslateError::MissingUrl)?;
    let method = method.unwrap_or_else(|| if has_data { "POST" } else { "GET" }.to_string());

    Ok(ResolvedRequest { url, method, headers })
}

/// Split a command line into words, honoring single/double quotes and
/// backslash escapes.
fn shell_split(command: &str) -> Result<Vec<String>, TranslateError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else if c == '\\' && q == '"' {
                    match chars.next() {
                        Some(escaped) => current.push(escaped),
                        None => {
                            return Err(TranslateError::Syntax(
                                "trailing backslash".to_string(),
                            ));
                        }
                    }
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_word = true;
                }
                '\\' => match chars.next() {
                    Some(escaped) => {
                        // A backslash-newline is a line continuation.
                        if escaped != '\n' {
                            current.push(escaped);
                        }
                        in_word = in_word || escaped != '\n';
                    }
                    None => {
                        return Err(TranslateError::Syntax("trailing backslash".to_string()));
                    }
                },
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                c => {
                    current.push(c);
                    in_word = true;
                }
            },
        }
    }

    if quote.is_some() {
        return Err(TranslateError::Syntax("unterminated quote".to_string()));
    }
    if in_word {
        words.push(current);
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ResponseKind;
    use serde_json::json;

    #[test]
    fn interpolate_literal_and_expressions() {
        let value = json!({"token": "abc", "url": "http://x"});
        let scope = Scope::new().with_value(&value);
        let rendered = interpolate(
            "curl -H \"Authorization: Bearer {{token}}\" {{url}}",
            &scope,
        );
        assert_eq!(rendered, "curl -H \"Authorization: Bearer abc\" http://x");
    }

    #[test]
    fn interpolate_failed_expression_is_empty() {
        let rendered = interpolate("x{{missing}}y", &Scope::new());
        assert_eq!(rendered, "xy");
    }

    #[test]
    fn interpolate_unterminated_token_passes_through() {
        let rendered = interpolate("a {{ oops", &Scope::new());
        assert_eq!(rendered, "a {{ oops");
    }

    #[test]
    fn parse_basic_get() {
        let resolved = parse_curl("curl https://example.com/feed").unwrap();
        assert_eq!(resolved.url, "https://example.com/feed");
        assert_eq!(resolved.method, "GET");
    }

    #[test]
    fn parse_headers_and_method() {
        let resolved = parse_curl(
            "curl -X put -H 'Accept: application/json' -H 'X-Key: k' https://example.com",
        )
        .unwrap();
        assert_eq!(resolved.method, "PUT");
        assert_eq!(resolved.headers["Accept"], "application/json");
        assert_eq!(resolved.headers["X-Key"], "k");
    }

    #[test]
    fn data_implies_post() {
        let resolved = parse_curl("curl -d 'a=1' https://example.com").unwrap();
        assert_eq!(resolved.method, "POST");
    }

    #[test]
    fn explicit_method_beats_data() {
        let resolved = parse_curl("curl -X PATCH -d 'a=1' https://example.com").unwrap();
        assert_eq!(resolved.method, "PATCH");
    }

    #[test]
    fn no_url_is_error() {
        assert!(matches!(
            parse_curl("curl -H 'A: b'"),
            Err(TranslateError::MissingUrl)
        ));
    }

    #[test]
    fn quoted_url_with_spaces() {
        let resolved = parse_curl("curl \"https://example.com/a b\"").unwrap();
        assert_eq!(resolved.url, "https://example.com/a b");
    }

    #[test]
    fn translate_full_step() {
        let value = json!({"id": 7});
        let scope = Scope::new().with_value(&value);
        let step = CurlStep {
            kind: ResponseKind::Json,
            template: "curl https://api.example.com/items/{{id}}".to_string(),
        };
        let resolved = translate_curl(&step, &scope).unwrap();
        assert_eq!(resolved.url, "https://api.example.com/items/7");
    }
}

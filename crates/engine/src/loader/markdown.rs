//! Markdown source form: one `# `-headed section per listener.
//!
//! Within a section, fenced code blocks carry the configuration and
//! pipeline: exactly one block tagged `yaml` holds flat `key: value`
//! configuration, and each `javascript`/`fetch`/`curl` block becomes a
//! pipeline step in document order. Other block tags are ignored.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

use crate::definition::{
    CodeStep, CurlStep, FetchStep, ListenerDefinition, ResponseKind, Step,
};

use super::{build_definition, DefinitionParts, LoadError};

pub(super) fn parse_markdown(text: &str) -> Result<Vec<ListenerDefinition>, LoadError> {
    split_sections(text)
        .iter()
        .map(|section| parse_section(section))
        .collect()
}

/// Split the document on lines beginning with `# `. Content before the
/// first header is ignored.
fn split_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        if let Some(header) = line.strip_prefix("# ") {
            if let Some(done) = current.take() {
                sections.push(done);
            }
            current = Some(format!("{header}\n"));
        } else if let Some(section) = current.as_mut() {
            section.push_str(line);
            section.push('\n');
        }
    }

    if let Some(done) = current {
        sections.push(done);
    }
    sections
}

fn parse_section(section: &str) -> Result<ListenerDefinition, LoadError> {
    let fragments: Vec<&str> = section.trim().split("```").collect();
    // Fragments alternate prose / block; an even count means a fence
    // was never closed.
    if fragments.len() % 2 == 0 {
        return Err(LoadError::Definition(format!(
            "unterminated code fence in section `{}`",
            first_line(fragments[0])
        )));
    }

    let name = first_line(fragments[0]).to_string();
    let mut config: Option<IndexMap<String, Value>> = None;
    let mut pipeline = Vec::new();

    for block in fragments.iter().skip(1).step_by(2) {
        let (tag_line, body) = block.split_once('\n').unwrap_or((*block, ""));
        let (tag, metadata) = match tag_line.trim().split_once(' ') {
            Some((tag, metadata)) => (tag, metadata.trim()),
            None => (tag_line.trim(), ""),
        };

        match tag {
            "yaml" => {
                if config.is_none() {
                    config = Some(parse_flat_config(body));
                }
            }
            "javascript" => pipeline.push(Step::Code(CodeStep {
                source: body.to_string(),
            })),
            "fetch" => pipeline.push(Step::Fetch(FetchStep {
                kind: response_kind(metadata, &name)?,
                lines: parse_lines(body),
            })),
            "curl" => pipeline.push(Step::Curl(CurlStep {
                kind: response_kind(metadata, &name)?,
                template: body.to_string(),
            })),
            _ => {}
        }
    }

    let config = config.ok_or_else(|| {
        LoadError::Definition(format!("section `{name}` has no yaml block"))
    })?;

    into_parts(name, config, pipeline).and_then(build_definition)
}

fn first_line(fragment: &str) -> &str {
    fragment.trim().lines().next().unwrap_or("").trim()
}

fn response_kind(metadata: &str, listener: &str) -> Result<ResponseKind, LoadError> {
    ResponseKind::from_metadata(metadata).ok_or_else(|| {
        LoadError::Definition(format!(
            "listener `{listener}` has unknown response kind `{metadata}`"
        ))
    })
}

/// Parse the flat `key: value` configuration block.
///
/// Values split on the first colon; integer-looking values become
/// numbers, `true`/`false` become booleans, everything else is a
/// trimmed string.
fn parse_flat_config(body: &str) -> IndexMap<String, Value> {
    let mut config = IndexMap::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once(':').unwrap_or((line, ""));
        config.insert(key.trim().to_string(), coerce_scalar(value.trim()));
    }
    config
}

fn coerce_scalar(raw: &str) -> Value {
    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(number) = raw.parse::<i64>() {
            return Value::from(number);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Parse a fetch block body into the ordered line multimap: repeated
/// keys accumulate their values in declaration order.
fn parse_lines(body: &str) -> IndexMap<String, Vec<String>> {
    let mut lines: IndexMap<String, Vec<String>> = IndexMap::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once(':').unwrap_or((line, ""));
        lines
            .entry(key.trim().to_string())
            .or_default()
            .push(value.trim().to_string());
    }
    lines
}

fn into_parts(
    name: String,
    config: IndexMap<String, Value>,
    pipeline: Vec<Step>,
) -> Result<DefinitionParts, LoadError> {
    let mut parts = DefinitionParts {
        name,
        pipeline,
        ..Default::default()
    };

    for (key, value) in config {
        match key.as_str() {
            "user" => parts.user = Some(scalar_string(&value)),
            "initialValue" => parts.initial_value = Some(value),
            "compare" => parts.compare = Some(scalar_string(&value)),
            "open" => parts.open = Some(scalar_string(&value)),
            "notify" => parts.notify = Some(scalar_string(&value)),
            "interval" => parts.interval = Some(scalar_integer(&parts.name, "interval", &value)?),
            "delay" => parts.delay = Some(scalar_integer(&parts.name, "delay", &value)?),
            "debug" => match value {
                Value::Bool(flag) => parts.debug = Some(flag),
                other => {
                    return Err(LoadError::Definition(format!(
                        "listener `{}` has non-boolean debug `{other}`",
                        parts.name
                    )));
                }
            },
            other => {
                warn!(listener = %parts.name, key = %other, "ignoring unknown config key");
            }
        }
    }

    Ok(parts)
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn scalar_integer(listener: &str, key: &str, value: &Value) -> Result<i64, LoadError> {
    value.as_i64().ok_or_else(|| {
        LoadError::Definition(format!(
            "listener `{listener}` has non-integer {key} `{value}`"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ActionSpec;
    use serde_json::json;

    const DOCUMENT: &str = r#"Intro prose, ignored.

# btc price

```yaml
interval: 120
notify: "price is " + value
open: https://example.com/chart
debug: true
```

```fetch json
json: https://api.example.com/price
header: Accept: application/json
method: get
```

```javascript
return json.price
```

# release watch

```yaml
user: alice
delay: 30
```

```curl json
curl -H "Authorization: Bearer {{value}}" https://api.example.com/releases
```
"#;

    #[test]
    fn parse_two_sections() {
        let defs = parse_markdown(DOCUMENT).unwrap();
        assert_eq!(defs.len(), 2);

        let btc = &defs[0];
        assert_eq!(btc.name, "btc price");
        assert_eq!(btc.interval, 120);
        assert_eq!(btc.debug, Some(true));
        assert!(matches!(btc.notify, ActionSpec::Expression(_)));
        assert_eq!(
            btc.open,
            ActionSpec::Literal("https://example.com/chart".to_string())
        );
        assert_eq!(btc.pipeline.len(), 2);

        match &btc.pipeline[0] {
            Step::Fetch(fetch) => {
                assert_eq!(fetch.kind, ResponseKind::Json);
                assert_eq!(fetch.lines["json"], vec!["https://api.example.com/price"]);
                assert_eq!(fetch.lines["header"], vec!["Accept: application/json"]);
                assert_eq!(fetch.lines["method"], vec!["get"]);
            }
            other => panic!("expected fetch step, got {other:?}"),
        }
        match &btc.pipeline[1] {
            Step::Code(code) => assert_eq!(code.source.trim(), "return json.price"),
            other => panic!("expected code step, got {other:?}"),
        }

        let release = &defs[1];
        assert_eq!(release.name, "release watch");
        assert_eq!(release.user, "alice");
        assert_eq!(release.delay, 30);
        assert_eq!(release.interval, 60);
        match &release.pipeline[0] {
            Step::Curl(curl) => {
                assert_eq!(curl.kind, ResponseKind::Json);
                assert!(curl.template.contains("{{value}}"));
            }
            other => panic!("expected curl step, got {other:?}"),
        }
    }

    #[test]
    fn config_value_with_colons_is_preserved() {
        let config = parse_flat_config("open: https://example.com/a:b\n");
        assert_eq!(config["open"], json!("https://example.com/a:b"));
    }

    #[test]
    fn coercion_rules() {
        assert_eq!(coerce_scalar("60"), json!(60));
        assert_eq!(coerce_scalar("true"), json!(true));
        assert_eq!(coerce_scalar("false"), json!(false));
        assert_eq!(coerce_scalar("60s"), json!("60s"));
        assert_eq!(coerce_scalar(""), json!(""));
    }

    #[test]
    fn missing_yaml_block_aborts() {
        let doc = "# no config\n\n```javascript\n1 + 1\n```\n";
        assert!(matches!(
            parse_markdown(doc),
            Err(LoadError::Definition(_))
        ));
    }

    #[test]
    fn unterminated_fence_aborts() {
        let doc = "# broken\n\n```yaml\ninterval: 10\n";
        assert!(parse_markdown(doc).is_err());
    }

    #[test]
    fn unknown_response_kind_aborts() {
        let doc = "# bad\n\n```yaml\ninterval: 10\n```\n\n```fetch csv\ncsv: https://x\n```\n";
        assert!(parse_markdown(doc).is_err());
    }

    #[test]
    fn non_integer_interval_aborts() {
        let doc = "# bad\n\n```yaml\ninterval: often\n```\n";
        assert!(parse_markdown(doc).is_err());
    }

    #[test]
    fn other_block_tags_ignored() {
        let doc = "# ok\n\n```yaml\ninterval: 10\n```\n\n```text\njust notes\n```\n";
        let defs = parse_markdown(doc).unwrap();
        assert!(defs[0].pipeline.is_empty());
    }

    #[test]
    fn document_without_headers_is_empty() {
        assert!(parse_markdown("no headers here\n").unwrap().is_empty());
    }

    #[test]
    fn initial_value_scalar_kept() {
        let doc = "# seeded\n\n```yaml\ninitialValue: 42\n```\n";
        let defs = parse_markdown(doc).unwrap();
        assert_eq!(defs[0].initial_value, Some(json!(42)));
    }
}

//! JSON source form: an array of listener objects whose pipelines are
//! code-only snippets.

use serde::Deserialize;
use serde_json::Value;

use crate::definition::{CodeStep, ListenerDefinition, Step};

use super::{build_definition, DefinitionParts, LoadError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawListener {
    name: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    initial_value: Option<Value>,
    #[serde(default)]
    compare: Option<String>,
    #[serde(default)]
    pipeline: Vec<String>,
    #[serde(default)]
    open: Option<String>,
    #[serde(default)]
    notify: Option<String>,
    #[serde(default)]
    interval: Option<i64>,
    #[serde(default)]
    delay: Option<i64>,
    #[serde(default)]
    debug: Option<bool>,
}

pub(super) fn parse_json(text: &str) -> Result<Vec<ListenerDefinition>, LoadError> {
    let raw: Vec<RawListener> = serde_json::from_str(text)?;
    raw.into_iter().map(into_definition).collect()
}

fn into_definition(raw: RawListener) -> Result<ListenerDefinition, LoadError> {
    build_definition(DefinitionParts {
        name: raw.name,
        user: raw.user,
        initial_value: raw.initial_value,
        compare: raw.compare,
        open: raw.open,
        notify: raw.notify,
        interval: raw.interval,
        delay: raw.delay,
        debug: raw.debug,
        pipeline: raw
            .pipeline
            .into_iter()
            .map(|source| Step::Code(CodeStep { source }))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ActionSpec;
    use serde_json::json;

    #[test]
    fn parse_full_listener() {
        let text = r#"[
            {
                "name": "price",
                "user": "alice",
                "initialValue": 10,
                "compare": "value > prevValue",
                "pipeline": ["value + 1", "value * 2"],
                "open": "https://example.com",
                "notify": "\"price: \" + value",
                "interval": 120,
                "delay": 30,
                "debug": true
            }
        ]"#;

        let defs = parse_json(text).unwrap();
        assert_eq!(defs.len(), 1);
        let def = &defs[0];
        assert_eq!(def.name, "price");
        assert_eq!(def.user, "alice");
        assert_eq!(def.initial_value, Some(json!(10)));
        assert_eq!(def.compare, "value > prevValue");
        assert_eq!(def.pipeline.len(), 2);
        assert!(matches!(def.pipeline[0], Step::Code(_)));
        assert_eq!(def.open, ActionSpec::Literal("https://example.com".to_string()));
        assert!(matches!(def.notify, ActionSpec::Expression(_)));
        assert_eq!(def.interval, 120);
        assert_eq!(def.delay, 30);
        assert_eq!(def.debug, Some(true));
    }

    #[test]
    fn parse_minimal_listener_gets_defaults() {
        let defs = parse_json(r#"[{"name": "tiny"}]"#).unwrap();
        assert_eq!(defs[0].interval, 60);
        assert_eq!(defs[0].user, "channel");
        assert!(defs[0].pipeline.is_empty());
    }

    #[test]
    fn malformed_json_aborts_source() {
        assert!(matches!(
            parse_json("[{\"name\": }]"),
            Err(LoadError::Json(_))
        ));
    }

    #[test]
    fn missing_name_aborts_source() {
        assert!(parse_json(r#"[{"interval": 10}]"#).is_err());
    }

    #[test]
    fn one_bad_listener_aborts_the_source() {
        let text = r#"[{"name": "good"}, {"name": ""}]"#;
        assert!(parse_json(text).is_err());
    }
}

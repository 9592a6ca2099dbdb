//! Sequential step executor.
//!
//! Each listener owns one [`PipelineState`] per tick. Steps run strictly
//! in declaration order; faults are isolated per step so a failing fetch
//! or expression never aborts the pipeline, and the `exit()` helper
//! short-circuits everything after the step that called it.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::definition::{ListenerDefinition, ResponseKind, Step};
use crate::expr::{evaluate, Scope};
use crate::html::DocumentParser;
use crate::http::HttpClient;
use crate::request::{translate_curl, translate_fetch, ResolvedRequest, TranslateError};

/// Mutable record threaded through one listener's steps for one tick.
pub struct PipelineState {
    pub text: Option<String>,
    pub json: Option<Value>,
    pub html: Option<Arc<dyn crate::html::Document>>,
    pub error: Option<String>,
    pub value: Value,
    pub exit_requested: bool,
}

impl PipelineState {
    pub fn new(initial_value: Value) -> Self {
        Self {
            text: None,
            json: None,
            html: None,
            error: None,
            value: initial_value,
            exit_requested: false,
        }
    }

    /// Build the evaluation scope over the current state.
    fn scope(&self) -> Scope<'_> {
        let mut scope = Scope::new()
            .bind("text", opt_string(&self.text))
            .bind("json", self.json.clone().unwrap_or(Value::Null))
            .bind("error", opt_string(&self.error));
        scope = match &self.html {
            Some(document) => scope.with_document(document.as_ref()),
            None => scope.bind("html", Value::Null),
        };
        scope.with_value(&self.value)
    }
}

fn opt_string(value: &Option<String>) -> Value {
    value
        .as_ref()
        .map(|s| Value::String(s.clone()))
        .unwrap_or(Value::Null)
}

/// Collaborators the executor needs: transport and document parsing.
#[derive(Clone)]
pub struct PipelineContext {
    pub http: Arc<dyn HttpClient>,
    pub html: Arc<dyn DocumentParser>,
}

/// Run one listener's pipeline for one tick.
///
/// Returns the final state; callers read `value` and `exit_requested`.
pub async fn run_pipeline(
    definition: &ListenerDefinition,
    initial_value: Value,
    context: &PipelineContext,
    debug_enabled: bool,
) -> PipelineState {
    let mut state = PipelineState::new(initial_value);
    let name = definition.name.as_str();

    for (index, step) in definition.pipeline.iter().enumerate() {
        if state.exit_requested {
            info!(listener = %name, "stopping pipeline");
            break;
        }

        match step {
            Step::Fetch(_) | Step::Curl(_) => {
                let (resolved, exited, kind) = {
                    let scope = state.scope();
                    let (resolved, kind) = match step {
                        Step::Fetch(fetch) => (translate_fetch(fetch, &scope), fetch.kind),
                        Step::Curl(curl) => (translate_curl(curl, &scope), curl.kind),
                        Step::Code(_) => unreachable!("matched above"),
                    };
                    (resolved, scope.exit_requested(), kind)
                };
                state.exit_requested |= exited;

                match resolved {
                    Ok(request) => {
                        execute_request(name, &request, kind, context, &mut state, debug_enabled)
                            .await;
                    }
                    Err(TranslateError::MissingUrl) => {
                        warn!(listener = %name, step = index, "cannot resolve request url");
                    }
                    Err(error) => {
                        warn!(listener = %name, step = index, error = %error, "cannot translate request");
                    }
                }
            }
            Step::Code(code) => {
                let (result, exited) = {
                    let scope = state.scope();
                    let result = evaluate(&code.source, &scope);
                    (result, scope.exit_requested())
                };
                state.exit_requested |= exited;

                match result {
                    Ok(value) => {
                        // An exit mid-expression leaves the state as of
                        // the exit point.
                        if !exited {
                            if debug_enabled {
                                info!(listener = %name, value = %value, "computed value");
                            } else {
                                debug!(listener = %name, value = %value, "computed value");
                            }
                            state.value = value;
                        }
                    }
                    Err(error) => {
                        warn!(listener = %name, step = index, error = %error, "failed executing code block");
                    }
                }
            }
        }
    }

    state
}

/// Issue a translated request and decode the body into the state slot
/// selected by the response kind. Status outside 200–399 is a step
/// fault captured into `state.error`.
async fn execute_request(
    name: &str,
    request: &ResolvedRequest,
    kind: ResponseKind,
    context: &PipelineContext,
    state: &mut PipelineState,
    debug_enabled: bool,
) {
    if debug_enabled {
        info!(listener = %name, url = %request.url, method = %request.method, "fetching");
    } else {
        debug!(listener = %name, url = %request.url, method = %request.method, "fetching");
    }

    match context.http.request(request).await {
        Ok(response) if response.is_acceptable() => match kind {
            ResponseKind::Text => {
                state.text = Some(response.body);
            }
            ResponseKind::Json => match serde_json::from_str(&response.body) {
                Ok(parsed) => state.json = Some(parsed),
                Err(error) => {
                    warn!(listener = %name, error = %error, "response body is not valid json");
                    state.error = Some(format!("invalid json response: {error}"));
                }
            },
            ResponseKind::Html => {
                state.html = Some(context.html.parse(&response.body));
            }
        },
        Ok(response) => {
            warn!(listener = %name, status = response.status, "fetch failed");
            state.error = Some(response.body);
        }
        Err(error) => {
            warn!(listener = %name, error = %error, "fetch failed");
            state.error = Some(error.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ActionSpec, CodeStep, CurlStep, FetchStep};
    use crate::html::RawDocumentParser;
    use crate::http::{HttpError, HttpResponse};
    use async_trait::async_trait;
    use indexmap::IndexMap;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock transport: fixed response, counts requests.
    struct MockHttp {
        status: u16,
        body: String,
        calls: AtomicUsize,
    }

    impl MockHttp {
        fn new(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttp {
        async fn request(&self, _request: &ResolvedRequest) -> Result<HttpResponse, HttpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    fn context(http: Arc<MockHttp>) -> PipelineContext {
        PipelineContext {
            http,
            html: Arc::new(RawDocumentParser),
        }
    }

    fn definition(name: &str, pipeline: Vec<Step>) -> ListenerDefinition {
        ListenerDefinition {
            name: name.to_string(),
            user: "channel".to_string(),
            initial_value: None,
            compare: crate::definition::DEFAULT_COMPARE.to_string(),
            pipeline,
            open: ActionSpec::Absent,
            notify: ActionSpec::Absent,
            interval: 60,
            delay: 0,
            debug: None,
        }
    }

    fn json_fetch(url: &str) -> Step {
        let mut lines: IndexMap<String, Vec<String>> = IndexMap::new();
        lines.insert("json".to_string(), vec![url.to_string()]);
        Step::Fetch(FetchStep {
            kind: ResponseKind::Json,
            lines,
        })
    }

    fn code(source: &str) -> Step {
        Step::Code(CodeStep {
            source: source.to_string(),
        })
    }

    #[tokio::test]
    async fn fetch_then_code_extracts_value() {
        let http = Arc::new(MockHttp::new(200, r#"{"price": 42}"#));
        let def = definition(
            "price",
            vec![json_fetch("https://api.example.com/p"), code("return json.price")],
        );

        let state = run_pipeline(&def, Value::Null, &context(http), false).await;
        assert_eq!(state.value, json!(42));
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn code_step_increments_value() {
        let http = Arc::new(MockHttp::new(200, ""));
        let def = definition("inc", vec![code("value + 1")]);

        let state = run_pipeline(&def, json!(3), &context(http), false).await;
        assert_eq!(state.value, json!(4));
    }

    #[tokio::test]
    async fn failed_fetch_captures_error_and_continues() {
        let http = Arc::new(MockHttp::new(500, "boom"));
        let def = definition(
            "failing",
            vec![json_fetch("https://api.example.com/p"), code("error")],
        );

        let state = run_pipeline(&def, Value::Null, &context(http.clone()), false).await;
        assert_eq!(http.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.json, None);
        assert_eq!(state.value, json!("boom"));
    }

    #[tokio::test]
    async fn failing_code_leaves_value_unchanged() {
        let http = Arc::new(MockHttp::new(200, ""));
        let def = definition("faulty", vec![code("nonexistent + 1")]);

        let state = run_pipeline(&def, json!(7), &context(http), false).await;
        assert_eq!(state.value, json!(7));
    }

    #[tokio::test]
    async fn exit_short_circuits_remaining_steps() {
        let http = Arc::new(MockHttp::new(200, r#"{"price": 1}"#));
        let def = definition(
            "early",
            vec![code("exit()"), json_fetch("https://api.example.com/p")],
        );

        let state = run_pipeline(&def, json!("before"), &context(http.clone()), false).await;
        assert!(state.exit_requested);
        assert_eq!(state.value, json!("before"));
        assert_eq!(http.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn conditional_exit_keeps_running_when_not_taken() {
        let http = Arc::new(MockHttp::new(200, ""));
        let def = definition(
            "conditional",
            vec![code("value > 10 ? exit() : value + 1"), code("value * 2")],
        );

        let state = run_pipeline(&def, json!(3), &context(http), false).await;
        assert!(!state.exit_requested);
        assert_eq!(state.value, json!(8));
    }

    #[tokio::test]
    async fn curl_step_fetches_into_slot() {
        let http = Arc::new(MockHttp::new(200, r#"{"ok": true}"#));
        let def = definition(
            "curl",
            vec![
                Step::Curl(CurlStep {
                    kind: ResponseKind::Json,
                    template: "curl https://api.example.com/{{value}}".to_string(),
                }),
                code("json.ok"),
            ],
        );

        let state = run_pipeline(&def, json!("x"), &context(http), false).await;
        assert_eq!(state.value, json!(true));
    }

    #[tokio::test]
    async fn untranslatable_curl_skips_step() {
        let http = Arc::new(MockHttp::new(200, ""));
        let def = definition(
            "nourl",
            vec![Step::Curl(CurlStep {
                kind: ResponseKind::Text,
                template: "curl -H 'A: b'".to_string(),
            })],
        );

        let state = run_pipeline(&def, json!(1), &context(http.clone()), false).await;
        assert_eq!(http.calls.load(Ordering::SeqCst), 0);
        assert!(state.text.is_none());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn html_fetch_binds_document_text() {
        let http = Arc::new(MockHttp::new(200, "<h1>title</h1>"));
        let mut lines: IndexMap<String, Vec<String>> = IndexMap::new();
        lines.insert("html".to_string(), vec!["https://example.com".to_string()]);
        let def = definition(
            "page",
            vec![
                Step::Fetch(FetchStep {
                    kind: ResponseKind::Html,
                    lines,
                }),
                code("html"),
            ],
        );

        let state = run_pipeline(&def, Value::Null, &context(http), false).await;
        assert_eq!(state.value, json!("<h1>title</h1>"));
    }
}

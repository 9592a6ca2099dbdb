//! Listener pipeline engine.
//!
//! This crate provides:
//! - Listener definition schema and the JSON/markdown definition loader
//! - A sandboxed expression evaluator for pipeline code and templates
//! - Request template translation (header-line and curl-style forms)
//! - The sequential step executor with threaded pipeline state
//! - Tick-eligibility gate, change detection, and the persisted value store
//! - Narrow contracts for the HTTP transport and HTML document collaborators

pub mod definition;
pub mod detect;
pub mod expr;
pub mod gate;
pub mod html;
pub mod http;
pub mod loader;
pub mod pipeline;
pub mod request;
pub mod store;

pub use definition::{ActionSpec, ListenerDefinition, ResponseKind, Step};
pub use detect::{detect_transition, FireEvent, TransitionOutcome};
pub use expr::{evaluate, EvalError, Scope};
pub use gate::is_due;
pub use http::{HttpClient, HttpError, HttpResponse, ReqwestClient};
pub use pipeline::{run_pipeline, PipelineContext, PipelineState};
pub use store::Store;

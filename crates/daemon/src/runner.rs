//! Tick orchestration.
//!
//! One [`Runner`] owns the loaded definitions, the value store, and the
//! delivery dispatcher. Each tick it gates the listener set, runs every
//! due pipeline concurrently, then applies change detection, dispatch,
//! and the store writes sequentially before a single flush.

use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use vigil_engine::definition::ListenerDefinition;
use vigil_engine::pipeline::{run_pipeline, PipelineContext};
use vigil_engine::store::Store;
use vigil_engine::{detect, gate};
use vigil_notify::Dispatcher;

pub struct Runner {
    definitions: Vec<ListenerDefinition>,
    store: Store,
    context: PipelineContext,
    dispatcher: Dispatcher,
    /// Global default for per-listener debug logging.
    debug: bool,
}

impl Runner {
    pub fn new(
        definitions: Vec<ListenerDefinition>,
        store: Store,
        context: PipelineContext,
        dispatcher: Dispatcher,
        debug: bool,
    ) -> Self {
        Self {
            definitions,
            store,
            context,
            dispatcher,
            debug,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run one tick at logical time `tick`.
    ///
    /// Due pipelines run concurrently; each listener exclusively owns
    /// its state, so the only shared mutation — the store — happens
    /// after the join, one key per listener, followed by one flush.
    pub async fn run_tick(&mut self, tick: i64) {
        let due: Vec<&ListenerDefinition> = self
            .definitions
            .iter()
            .filter(|def| gate::is_due(tick, def.interval, def.delay))
            .collect();

        if due.is_empty() {
            debug!(tick, "no listeners due");
            return;
        }
        debug!(tick, due = due.len(), "tick");

        let context = &self.context;
        let jobs = due.into_iter().map(|def| {
            // The declared initial value seeds the pipeline; the stored
            // value only when the definition omits one.
            let initial = def
                .initial_value
                .clone()
                .or_else(|| self.store.get(&def.name).cloned())
                .unwrap_or(Value::Null);
            let debug_enabled = def.debug_enabled(self.debug);
            async move {
                let state = run_pipeline(def, initial, context, debug_enabled).await;
                (def, state)
            }
        });

        for (def, state) in join_all(jobs).await {
            if state.exit_requested {
                debug!(listener = %def.name, "pipeline exited, keeping stored value");
                continue;
            }

            let outcome = detect::detect_transition(def, &state.value, self.store.get(&def.name));
            if def.debug_enabled(self.debug) {
                info!(
                    listener = %def.name,
                    prev = %outcome.prev,
                    value = %state.value,
                    fired = outcome.fired,
                    "evaluated listener"
                );
            }

            if let Some(event) = &outcome.event {
                info!(listener = %def.name, message = %event.message, "listener fired");
                self.dispatcher.dispatch(event).await;
            }

            self.store.set(def.name.clone(), state.value);
        }

        if let Err(error) = self.store.flush() {
            warn!(error = %error, path = %self.store.path().display(), "failed to flush value store");
        }
    }

    /// Run ticks forever at a fixed cadence, starting at t=0.
    ///
    /// The whole tick is awaited inside the loop; a slow tick delays
    /// the next one instead of overlapping it.
    pub async fn run(&mut self, tick_secs: u64) {
        let mut interval = tokio::time::interval(Duration::from_secs(tick_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut tick: i64 = 0;
        loop {
            interval.tick().await;
            self.run_tick(tick).await;
            tick += tick_secs as i64;
        }
    }
}

// ─── Progress ───
// Stage-scoped progress reporting. A stage starts at 0.0, only moves forward
// and reports 1.0 exactly once.

use std::sync::{Arc, Mutex};

use tracing::debug;

/// Receives `(stage, fraction)` events. Implemented for plain closures.
pub trait ProgressSink: Send + Sync {
    fn report(&self, stage: &str, fraction: f32);
}

impl<F> ProgressSink for F
where
    F: Fn(&str, f32) + Send + Sync,
{
    fn report(&self, stage: &str, fraction: f32) {
        self(stage, fraction)
    }
}

pub type SharedProgress = Arc<dyn ProgressSink>;

/// Sink that forwards every event to `tracing`.
pub fn log_sink() -> SharedProgress {
    Arc::new(|stage: &str, fraction: f32| {
        tracing::info!("{}: {:.0}%", stage, fraction * 100.0);
    })
}

/// Sink that drops every event.
pub fn silent_sink() -> SharedProgress {
    Arc::new(|_: &str, _: f32| {})
}

struct Counter {
    completed: usize,
    last: f32,
    finished: bool,
}

/// Counts completed items of one stage and turns them into monotonic
/// progress events. Shared between workers behind an `Arc`.
pub struct StageProgress {
    stage: String,
    total: usize,
    sink: SharedProgress,
    state: Mutex<Counter>,
}

impl StageProgress {
    /// Create the tracker and emit the initial 0.0.
    pub fn start(stage: impl Into<String>, total: usize, sink: SharedProgress) -> Arc<Self> {
        let stage = stage.into();
        debug!("Stage '{}' started with {} items", stage, total);
        sink.report(&stage, 0.0);
        Arc::new(Self {
            stage,
            total,
            sink,
            state: Mutex::new(Counter {
                completed: 0,
                last: 0.0,
                finished: false,
            }),
        })
    }

    /// Record one completed item. The lock is held while emitting so events
    /// leave in counter order.
    pub fn tick(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.finished {
            return;
        }
        state.completed += 1;
        let fraction = if self.total == 0 {
            1.0
        } else {
            (state.completed as f32 / self.total as f32).min(1.0)
        };
        self.emit(&mut state, fraction);
    }

    /// Report an intermediate fraction for stages that are not item based.
    pub fn set(&self, fraction: f32) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.finished {
            return;
        }
        self.emit(&mut state, fraction.clamp(0.0, 1.0));
    }

    /// Emit 1.0 if it has not been emitted yet.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.finished {
            self.emit(&mut state, 1.0);
        }
    }

    pub fn completed(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).completed
    }

    fn emit(&self, state: &mut Counter, fraction: f32) {
        if fraction < state.last {
            return;
        }
        state.last = fraction;
        if fraction >= 1.0 {
            state.finished = true;
        }
        self.sink.report(&self.stage, fraction);
    }
}

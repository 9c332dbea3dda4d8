//! In-memory log ring and its HTTP endpoints.
//!
//! A `tracing` layer taps every event into a bounded ring so the console
//! can tail recent activity without log files. `start` counts backwards
//! from the newest entry and results come back newest-first; the level
//! filter applies after windowing.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::response;
use crate::ApiState;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;
const DEFAULT_CAPACITY: usize = 1000;

/// One captured log event.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Bounded ring of recent log entries, oldest evicted first.
#[derive(Clone)]
pub struct LogRing {
    inner: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 { DEFAULT_CAPACITY } else { capacity };
        Self {
            inner: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        let mut logs = self.inner.write();
        if logs.len() == self.capacity {
            logs.pop_front();
        }
        logs.push_back(entry);
    }

    /// Window into the ring: skip `start` entries from the newest end,
    /// take up to `limit`, newest first. A level filter (if non-empty)
    /// applies to the windowed slice.
    pub fn tail(&self, start: usize, limit: usize, level: Option<&str>) -> Vec<LogEntry> {
        let logs = self.inner.read();
        let total = logs.len();
        let limit = if limit == 0 { DEFAULT_LIMIT } else { limit.min(MAX_LIMIT) };

        let end_idx = total.saturating_sub(start);
        let start_idx = end_idx.saturating_sub(limit);

        let mut window: Vec<LogEntry> = logs
            .iter()
            .skip(start_idx)
            .take(end_idx - start_idx)
            .cloned()
            .collect();
        window.reverse();

        match level {
            Some(level) if !level.is_empty() => {
                window.retain(|entry| entry.level == level);
            }
            _ => {}
        }
        window
    }

    pub fn total(&self) -> usize {
        self.inner.read().len()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// The tracing layer that feeds this ring.
    pub fn layer(&self) -> RingLayer {
        RingLayer { ring: self.clone() }
    }
}

/// `tracing_subscriber` layer that copies events into a [`LogRing`].
pub struct RingLayer {
    ring: LogRing,
}

impl<S: Subscriber> Layer<S> for RingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        self.ring.push(LogEntry {
            timestamp: Utc::now(),
            level: event.metadata().level().as_str().to_ascii_lowercase(),
            target: event.metadata().target().to_string(),
            message: visitor.rendered,
        });
    }
}

/// Flattens an event's message and fields into one line.
#[derive(Default)]
struct EventVisitor {
    rendered: String,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            if self.rendered.is_empty() {
                self.rendered = format!("{value:?}");
            } else {
                self.rendered = format!("{value:?} {}", self.rendered);
            }
        } else {
            if !self.rendered.is_empty() {
                self.rendered.push(' ');
            }
            self.rendered
                .push_str(&format!("{}={:?}", field.name(), value));
        }
    }
}

// ── HTTP endpoints ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub limit: usize,
    pub level: Option<String>,
}

#[derive(Serialize)]
struct LogsBody {
    logs: Vec<LogEntry>,
    total: usize,
    start: usize,
    limit: usize,
}

/// GET /logs
pub async fn get_logs(
    State(state): State<ApiState>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let limit = if query.limit == 0 { DEFAULT_LIMIT } else { query.limit.min(MAX_LIMIT) };
    let logs = state.logs.tail(query.start, limit, query.level.as_deref());

    response::success(LogsBody {
        logs,
        total: state.logs.total(),
        start: query.start,
        limit,
    })
}

/// POST /logs/clear
pub async fn clear_logs(State(state): State<ApiState>) -> impl IntoResponse {
    state.logs.clear();
    response::success_empty()
}

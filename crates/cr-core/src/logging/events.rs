//! Structured event definitions.
//!
//! Every lifecycle event carries `run_id`, `host_id` and a [`Stage`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Pipeline stages of a crisk invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration loading.
    Init,
    /// Observation and measurement resolution.
    Evidence,
    /// Variable elimination.
    Infer,
    /// Counterfactual ranking.
    Explain,
    /// Beta parameter update.
    Learn,
    /// Durable commit of learning state.
    Persist,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Evidence => "evidence",
            Stage::Infer => "infer",
            Stage::Explain => "explain",
            Stage::Learn => "learn",
            Stage::Persist => "persist",
        };
        f.write_str(s)
    }
}

/// Stable event names.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";

    pub const EVIDENCE_RESOLVED: &str = "evidence.resolved";
    pub const EVIDENCE_REJECTED: &str = "evidence.rejected";

    pub const INFER_STARTED: &str = "infer.started";
    pub const INFER_FINISHED: &str = "infer.finished";

    pub const EXPLAIN_FINISHED: &str = "explain.finished";

    pub const LEARN_UPDATED: &str = "learn.updated";
    pub const PERSIST_FAILED: &str = "persist.failed";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// A structured log record in JSONL form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub ts: DateTime<Utc>,
    pub level: Level,
    /// Event name, e.g. "infer.finished".
    pub event: String,
    pub run_id: String,
    pub stage: Stage,
    pub host_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogEvent {
    pub fn new(
        level: Level,
        event: impl Into<String>,
        run_id: impl Into<String>,
        host_id: impl Into<String>,
        stage: Stage,
        message: impl Into<String>,
    ) -> Self {
        LogEvent {
            ts: Utc::now(),
            level,
            event: event.into(),
            run_id: run_id.into(),
            stage,
            host_id: host_id.into(),
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field to the event.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.fields.insert(key.into(), v);
        }
        self
    }

    /// Serialize to a single JSON line.
    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"serialization_failed","event":"{}"}}"#,
                self.event
            )
        })
    }
}

/// Correlation IDs shared by every event of one invocation.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub host_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>, host_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            host_id: host_id.into(),
        }
    }

    pub fn event(
        &self,
        level: Level,
        event: impl Into<String>,
        stage: Stage,
        message: impl Into<String>,
    ) -> LogEvent {
        LogEvent::new(level, event, &self.run_id, &self.host_id, stage, message)
    }

    pub fn info(&self, event: impl Into<String>, stage: Stage, message: impl Into<String>) -> LogEvent {
        self.event(Level::Info, event, stage, message)
    }

    pub fn error(&self, event: impl Into<String>, stage: Stage, message: impl Into<String>) -> LogEvent {
        self.event(Level::Error, event, stage, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_serialization() {
        let event = LogEvent::new(
            Level::Info,
            event_names::LEARN_UPDATED,
            "run-12345",
            "host-abc",
            Stage::Learn,
            "feedback committed",
        )
        .with_field("alpha", 11.0);

        let json = event.to_jsonl();
        assert!(json.contains(r#""event":"learn.updated""#));
        assert!(json.contains(r#""level":"info""#));
        assert!(json.contains(r#""stage":"learn""#));
        assert!(json.contains(r#""alpha":11.0"#));
    }

    #[test]
    fn test_log_context() {
        let ctx = LogContext::new("run-abc", "host-xyz");
        let event = ctx.error(event_names::PERSIST_FAILED, Stage::Persist, "disk full");
        assert_eq!(event.run_id, "run-abc");
        assert_eq!(event.host_id, "host-xyz");
        assert_eq!(event.level, Level::Error);
        assert_eq!(event.stage, Stage::Persist);
    }

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [
            Stage::Init,
            Stage::Evidence,
            Stage::Infer,
            Stage::Explain,
            Stage::Learn,
            Stage::Persist,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn test_level_from_tracing() {
        assert_eq!(Level::from(tracing::Level::INFO), Level::Info);
        assert_eq!(Level::from(tracing::Level::WARN), Level::Warn);
    }
}

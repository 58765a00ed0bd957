//! Logging hook handler

use crate::hooks::{HookBroker, HookHandler, HookResult};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, info, trace, warn, Level};

/// Logs the hook being dispatched and its arguments, passing the value through
pub struct LoggingHandler {
    name: String,
    level: Level,
    format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl LoggingHandler {
    /// Create a logging handler from `level` and `format` options
    pub fn new(name: impl Into<String>, options: &HashMap<String, Value>) -> Self {
        let level = options
            .get("level")
            .and_then(Value::as_str)
            .and_then(|s| match s.to_lowercase().as_str() {
                "error" => Some(Level::ERROR),
                "warn" | "warning" => Some(Level::WARN),
                "info" => Some(Level::INFO),
                "debug" => Some(Level::DEBUG),
                "trace" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::INFO);

        let format = options
            .get("format")
            .and_then(Value::as_str)
            .and_then(|s| match s.to_lowercase().as_str() {
                "json" => Some(LogFormat::Json),
                "pretty" => Some(LogFormat::Pretty),
                "compact" => Some(LogFormat::Compact),
                _ => None,
            })
            .unwrap_or(LogFormat::Compact);

        Self {
            name: name.into(),
            level,
            format,
        }
    }

    fn format_message(&self, tag: &str, args: &[Value]) -> String {
        match self.format {
            LogFormat::Json => serde_json::json!({
                "hook": tag,
                "handler": self.name,
                "args": args,
            })
            .to_string(),
            LogFormat::Pretty => format!(
                "Hook: {} | Handler: {} | Args: {}",
                tag,
                self.name,
                serde_json::to_string_pretty(args).unwrap_or_default()
            ),
            LogFormat::Compact => format!(
                "[{}] {}: {}",
                tag,
                self.name,
                serde_json::to_string(args).unwrap_or_default()
            ),
        }
    }
}

impl HookHandler for LoggingHandler {
    fn call(&self, broker: &HookBroker, args: &[Value]) -> HookResult<Value> {
        let tag = broker.current_filter().unwrap_or_default();
        let message = self.format_message(&tag, args);

        match self.level {
            Level::ERROR => error!("{}", message),
            Level::WARN => warn!("{}", message),
            Level::INFO => info!("{}", message),
            Level::DEBUG => debug!("{}", message),
            _ => trace!("{}", message),
        }

        Ok(args.first().cloned().unwrap_or(Value::Null))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

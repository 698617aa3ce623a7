use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tag key the bootstrap hook uses for values JSON cannot carry directly.
pub const TYPE_TAG: &str = "@t";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub method: String,
    pub data: Vec<Value>,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("log event carries no entries")]
    EmptyEvent,
    #[error("message has no string `method` field")]
    MissingMethod,
    #[error("unsupported message shape: {0}")]
    UnsupportedShape(&'static str),
}

impl ConsoleMessage {
    pub fn new(method: impl Into<String>, data: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            data,
            timestamp: String::new(),
        }
    }

    /// Echo of a command the user submitted at the prompt.
    pub fn command(line: &str) -> Self {
        Self::new("command", vec![Value::String(line.to_string())])
    }

    /// Decodes a payload posted by an execution context.
    ///
    /// An array is a structured log event and its first entry is the record.
    /// A bare object is a direct `{method, data}` record. Either way the
    /// timestamp is left empty.
    pub fn decode(payload: &Value) -> Result<Self, DecodeError> {
        match payload {
            Value::Array(entries) => {
                let first = entries.first().ok_or(DecodeError::EmptyEvent)?;
                match first {
                    Value::Object(record) => Self::from_record(record),
                    _ => Err(DecodeError::UnsupportedShape("log entry is not an object")),
                }
            }
            Value::Object(record) => Self::from_record(record),
            Value::Null => Err(DecodeError::UnsupportedShape("null")),
            Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                Err(DecodeError::UnsupportedShape("scalar"))
            }
        }
    }

    fn from_record(record: &Map<String, Value>) -> Result<Self, DecodeError> {
        let method = record
            .get("method")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingMethod)?;
        let data = match record.get("data") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
        };
        Ok(Self::new(method, data))
    }

    /// One terminal line: `> cmd` for commands, `[method] args` otherwise.
    pub fn render_line(&self) -> String {
        let body = self
            .data
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(" ");
        match self.method.as_str() {
            "command" => format!("> {body}"),
            "log" | "info" | "debug" => body,
            other => format!("[{other}] {body}"),
        }
    }
}

/// Renders a logged value the way a console would show it: top-level strings
/// unquoted, tagged values by their description, everything else as JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => render_nested(other),
    }
}

fn render_nested(value: &Value) -> String {
    if let Some(tagged) = render_tagged(value) {
        return tagged;
    }
    match value {
        Value::Array(items) => {
            let inner = items.iter().map(render_nested).collect::<Vec<_>>().join(", ");
            format!("[{inner}]")
        }
        Value::Object(map) => {
            if map.is_empty() {
                return "{}".to_string();
            }
            let inner = map
                .iter()
                .map(|(k, v)| format!("{k}: {}", render_nested(v)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{ {inner} }}")
        }
        other => other.to_string(),
    }
}

fn render_tagged(value: &Value) -> Option<String> {
    let map = value.as_object()?;
    let tag = map.get(TYPE_TAG)?.as_str()?;
    let inner = map.get("v").and_then(Value::as_str).unwrap_or_default();
    let rendered = match tag {
        "undefined" => "undefined".to_string(),
        "function" => format!("[Function {inner}]"),
        "circular" => "[Circular]".to_string(),
        "error" => inner.to_string(),
        "bigint" => format!("{inner}n"),
        _ => inner.to_string(),
    };
    Some(rendered)
}

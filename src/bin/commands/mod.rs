pub mod backup;
pub mod config;
pub mod migrate;
pub mod status;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Output format shared by all commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines (default)
    #[default]
    Text,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON with indentation
    JsonPretty,
}

impl OutputFormat {
    pub fn all_names() -> &'static [&'static str] {
        &["text", "json", "json-pretty"]
    }

    /// Print `value` as JSON; returns false for text output so the caller
    /// can print its own lines.
    pub fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<bool> {
        match self {
            Self::Text => Ok(false),
            Self::Json => {
                println!("{}", serde_json::to_string(value)?);
                Ok(true)
            }
            Self::JsonPretty => {
                println!("{}", serde_json::to_string_pretty(value)?);
                Ok(true)
            }
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::JsonPretty => write!(f, "json-pretty"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "json-pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            _ => Err(format!(
                "Unknown output format '{}'. Valid formats: {}",
                s,
                Self::all_names().join(", ")
            )),
        }
    }
}

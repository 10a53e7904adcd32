// Error types for the extraction collaborator

use std::fmt;

#[derive(Debug, Clone)]
pub enum ExtractError {
    /// Network timeout while talking to the media platform
    NetworkTimeout,

    /// The platform refused the request (429, bot detection, geo block)
    Blocked,

    /// Extraction tool not installed or not on PATH
    ToolNotFound(String),

    /// The requested media is gone, private, or otherwise unreachable
    Unavailable(String),

    /// Failed to parse the collaborator's JSON output
    ParseError(String),

    /// Subprocess or command execution failed
    ExecutionError(String),

    /// Unknown error with details
    Unknown(String),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkTimeout => write!(f, "Network timeout: the platform is not responding"),
            Self::Blocked => write!(
                f,
                "The platform is refusing requests from this address; try again later"
            ),
            Self::ToolNotFound(tool) => write!(f, "Tool not found: {}", tool),
            Self::Unavailable(msg) => write!(f, "Media unavailable: {}", msg),
            Self::ParseError(msg) => write!(f, "Parse error: {}", msg),
            Self::ExecutionError(msg) => write!(f, "Execution error: {}", msg),
            Self::Unknown(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl std::error::Error for ExtractError {}

// Classify raw stderr/stdout text from the extraction tool
impl From<String> for ExtractError {
    fn from(s: String) -> Self {
        if s.contains("timeout") || s.contains("timed out") {
            return Self::NetworkTimeout;
        }

        if s.contains("429")
            || s.contains("403")
            || s.contains("bot")
            || s.contains("blocked")
            || s.contains("rate-limit")
        {
            return Self::Blocked;
        }

        if s.contains("Private video")
            || s.contains("unavailable")
            || s.contains("has been removed")
        {
            return Self::Unavailable(s);
        }

        if s.contains("not found") || s.contains("No such file") || s.contains("command not found")
        {
            return Self::ToolNotFound(s);
        }

        if s.contains("parse") || s.contains("JSON") {
            return Self::ParseError(s);
        }

        Self::Unknown(s)
    }
}

pub mod config;
pub mod doctor;
pub mod migrate;
pub mod seed;

use serde::Serialize;

/// Outcome of a CLI command: the process exit code plus the line printed to stdout.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: &'a str,
    error_class: Option<&'a str>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: serialize_payload(CommandOutcome {
                command,
                status: "ok",
                error_class: None,
                message: message.into(),
            }),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self {
            exit_code,
            output: serialize_payload(CommandOutcome {
                command,
                status: "error",
                error_class: Some(error_class),
                message: message.into(),
            }),
        }
    }
}

fn serialize_payload(payload: CommandOutcome<'_>) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub mod doctor;
pub mod migrate;
pub mod recommend;
pub mod seed;
pub mod stats;

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::build(command, message, None)
    }

    /// Success with a structured payload under `data`.
    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self::build(command, message, Some(data))
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    fn build(command: &str, message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Commands run their async body on a local current-thread runtime so the
/// CLI stays a plain synchronous binary.
pub(crate) fn block_on<F, T>(command: &'static str, future: F) -> Result<T, CommandResult>
where
    F: std::future::Future<Output = Result<T, (&'static str, String, u8)>>,
{
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return Err(CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            ));
        }
    };
    runtime.block_on(future).map_err(|(error_class, message, exit_code)| {
        CommandResult::failure(command, error_class, message, exit_code)
    })
}

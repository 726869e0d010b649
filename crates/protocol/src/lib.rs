//! # Flowcell Planner Protocol
//!
//! JSON envelope spoken by every front end of the planner.
//!
//! A request names one [`CommandAction`] and carries a free-form payload.
//! A response always has the same shape: a status, optional error
//! envelope, hints, suggested next actions, the action's data and
//! timing metadata.
//!
//! ```text
//! {"action": "build", "payload": {...}, "options": {"lab": "lab.json"}}
//!        │
//!        ▼
//! {"status": "ok", "data": {...}, "hints": [...], "meta": {"duration_ms": 3}}
//! ```

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CAPABILITIES_SCHEMA_VERSION: u32 = 1;
pub const COMMAND_API_VERSION: &str = "1";

/// Operations the planner exposes.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    /// Parse free text into tubes and batches and link each tube to one batch
    Resolve,
    /// Build designations for the linked tubes and add them to the working set
    Build,
    /// Apply a multi-edit template to selected designations
    Edit,
    /// Pack queued designations into flowcells
    Allocate,
    /// Reload queued designations from the store against the current lineage
    Pending,
    Capabilities,
}

impl CommandAction {
    pub const ALL: [CommandAction; 6] = [
        CommandAction::Resolve,
        CommandAction::Build,
        CommandAction::Edit,
        CommandAction::Allocate,
        CommandAction::Pending,
        CommandAction::Capabilities,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CommandAction::Resolve => "resolve",
            CommandAction::Build => "build",
            CommandAction::Edit => "edit",
            CommandAction::Allocate => "allocate",
            CommandAction::Pending => "pending",
            CommandAction::Capabilities => "capabilities",
        }
    }

    /// Whether the action reads or writes the session file.
    pub const fn uses_session(self) -> bool {
        matches!(
            self,
            CommandAction::Build
                | CommandAction::Edit
                | CommandAction::Allocate
                | CommandAction::Pending
        )
    }
}

/// Where the lab snapshot and the session live. Missing fields fall back to
/// the front end's own flags.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RequestOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct CommandRequest {
    pub action: CommandAction,
    #[serde(default = "empty_payload")]
    pub payload: Value,
    #[serde(default)]
    pub options: Option<RequestOptions>,
}

fn empty_payload() -> Value {
    Value::Object(Default::default())
}

impl CommandRequest {
    pub fn new(action: CommandAction, payload: Value) -> Self {
        Self {
            action,
            payload,
            options: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct NextAction {
    pub action: CommandAction,
    pub args: Value,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
    pub hint: Option<String>,
    #[serde(default)]
    pub next_actions: Vec<NextAction>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    Info,
    Action,
    Warn,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct Hint {
    #[serde(rename = "type")]
    pub kind: HintKind,
    pub text: String,
}

impl Hint {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: HintKind::Info,
            text: text.into(),
        }
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self {
            kind: HintKind::Warn,
            text: text.into(),
        }
    }

    pub fn action(text: impl Into<String>) -> Self {
        Self {
            kind: HintKind::Action,
            text: text.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_updated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct CommandResponse {
    pub status: CommandStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<NextAction>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub meta: ResponseMeta,
}

impl CommandResponse {
    pub fn is_error(&self) -> bool {
        matches!(self.status, CommandStatus::Error)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct CapabilitiesServer {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct Capabilities {
    pub schema_version: u32,
    pub command_api: String,
    pub server: CapabilitiesServer,
    pub actions: Vec<CommandAction>,
    pub start_route: NextAction,
}

impl Capabilities {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            schema_version: CAPABILITIES_SCHEMA_VERSION,
            command_api: COMMAND_API_VERSION.to_string(),
            server: CapabilitiesServer {
                name: name.into(),
                version: version.into(),
            },
            actions: CommandAction::ALL.to_vec(),
            start_route: NextAction {
                action: CommandAction::Resolve,
                args: serde_json::json!({ "input": "" }),
                reason: "Link tubes or batches to LCSETs before building designations."
                    .to_string(),
            },
        }
    }
}

/// JSON schemas of the request and response envelopes.
pub fn envelope_schemas() -> Value {
    let request = schemars::schema_for!(CommandRequest);
    let response = schemars::schema_for!(CommandResponse);
    serde_json::json!({ "request": request, "response": response })
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

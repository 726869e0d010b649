use anyhow::{Context as AnyhowContext, Result};
use chrono::{DateTime, Utc};
use fct_designation::MultiEditTemplate;
use fct_model::{DesignationStatus, EditContext, LabEventType};
use fct_protocol::{CommandAction, Hint, NextAction, ResponseMeta};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResolvePayload {
    /// Free text holding tube barcodes and batch names
    pub input: String,

    /// Loading tubes of this kind are collected for batch tokens
    #[serde(default = "default_event_kind")]
    pub event_kind: LabEventType,

    /// Picks for ambiguous tubes, barcode to LCSET
    #[serde(default)]
    pub choices: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildPayload {
    pub input: String,
    #[serde(default = "default_event_kind")]
    pub event_kind: LabEventType,
    #[serde(default)]
    pub choices: BTreeMap<String, String>,

    /// End of the event window and creation time of the new records
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

pub(crate) fn default_event_kind() -> LabEventType {
    LabEventType::DenatureTransfer
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EditPayload {
    pub template: MultiEditTemplate,

    /// Rows to select by tube barcode
    #[serde(default)]
    pub barcodes: Vec<String>,

    /// Select every row of the working set
    #[serde(default)]
    pub all: bool,

    #[serde(default = "default_edit_context")]
    pub context: EditContext,

    /// Statuses written to the store after the edit; defaults to every
    /// status the store accepts
    #[serde(default)]
    pub persist: Option<BTreeSet<DesignationStatus>>,
}

fn default_edit_context() -> EditContext {
    EditContext::Designation
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AllocatePayload {
    /// Overrides `allocation.partial_flowcells` from the config
    #[serde(default)]
    pub partial_flowcells: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PendingPayload {
    #[serde(default = "default_pending_statuses")]
    pub statuses: BTreeSet<DesignationStatus>,
}

fn default_pending_statuses() -> BTreeSet<DesignationStatus> {
    BTreeSet::from([DesignationStatus::Queued])
}

impl Default for PendingPayload {
    fn default() -> Self {
        Self {
            statuses: default_pending_statuses(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CapabilitiesPayload {
    /// Include JSON schemas of the request and response envelopes
    #[serde(default)]
    pub schemas: bool,
}

/// What a service hands back before it is wrapped into a response.
#[derive(Debug, Default)]
pub struct CommandOutcome {
    pub data: Value,
    pub hints: Vec<Hint>,
    pub meta: ResponseMeta,
    pub next_actions: Vec<NextAction>,
}

impl CommandOutcome {
    pub fn from_value<T: Serialize>(value: T) -> Result<Self> {
        Ok(Self {
            data: serde_json::to_value(value)?,
            ..Self::default()
        })
    }
}

pub fn parse_payload<T: DeserializeOwned>(action: CommandAction, payload: Value) -> Result<T> {
    serde_json::from_value(payload)
        .with_context(|| format!("Invalid payload for {}", action.as_str()))
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub code: String,
    pub hint: Option<String>,
    pub hints: Vec<Hint>,
    pub next_actions: Vec<NextAction>,
}

/// Maps an error message onto a stable code, with hints on how to recover.
pub fn classify_error(
    message: &str,
    action: Option<CommandAction>,
    payload: Option<&Value>,
) -> ErrorClassification {
    let mut hints = Vec::new();
    let mut next_actions = Vec::new();
    let mut code = "internal".to_string();

    if message.contains("Invalid payload") || message.contains("Invalid JSON") {
        code = "invalid_request".to_string();
        hints.push(Hint::action(
            "Check the payload fields; run action=capabilities with schemas=true for the envelope.",
        ));
        next_actions.push(NextAction {
            action: CommandAction::Capabilities,
            args: json!({ "schemas": true }),
            reason: "Inspect the request schema.".to_string(),
        });
    }

    if message.contains("not specified") || message.contains("template is empty") {
        code = "invalid_request".to_string();
        hints.push(Hint::action(
            "Pass --lab/--session flags or set options.lab/options.session in the request.",
        ));
    }

    if message.contains("Failed to read") || message.contains("No designation for") {
        code = "not_found".to_string();
        hints.push(Hint::warn(
            "A referenced file or working-set row does not exist; check the path or barcode.",
        ));
    }

    if message.contains("is not a candidate")
        || message.contains("cannot change")
        || message.contains("already allocated")
        || message.contains("only reach IN_FCT")
    {
        code = "conflict".to_string();
        if action == Some(CommandAction::Build) || action == Some(CommandAction::Resolve) {
            let input = payload
                .and_then(|p| p.get("input"))
                .cloned()
                .unwrap_or(Value::Null);
            hints.push(Hint::action(
                "Resolve the input again to see the candidate LCSETs of each ambiguous tube.",
            ));
            next_actions.push(NextAction {
                action: CommandAction::Resolve,
                args: json!({ "input": input }),
                reason: "List candidates before choosing.".to_string(),
            });
        }
    }

    if message.contains("config") {
        code = "config_error".to_string();
        hints.push(Hint::warn(
            "Config issue detected; verify the file passed with --config or FCT_CONFIG.",
        ));
    }

    let hint = hints.first().map(|h| h.text.clone());
    ErrorClassification {
        code,
        hint,
        hints,
        next_actions,
    }
}

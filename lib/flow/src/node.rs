//! Flow nodes and their typed configurations.
//!
//! A node's kind is a closed tagged union carried on the wire as
//! `{"node_type": ..., "config": {...}}`. Each known kind has a dedicated
//! config struct that rejects unknown keys, so a typo in the editor payload
//! fails at authoring time instead of being silently ignored during a walk.
//! Unrecognized kinds deserialize to [`NodeKind::Unknown`] and dispatch as a
//! logged no-op, so a graph authored against a newer editor never aborts a
//! customer's walk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use copper_sparrow_messaging::{Button, ListSection};

/// One step in a flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Editor-assigned node id, unique within the flow.
    pub id: String,
    /// Operator-facing label.
    #[serde(default)]
    pub name: String,
    /// The node's kind and typed configuration.
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node_type", content = "config", rename_all = "camelCase")]
pub enum NodeKind {
    /// Entry marker. Never dispatched for effect; only the initial position.
    Trigger(TriggerNodeConfig),

    // Senders
    SendText(SendTextConfig),
    SendImage(SendMediaConfig),
    SendVideo(SendMediaConfig),
    SendAudio(SendMediaConfig),
    SendDocument(SendMediaConfig),
    SendSticker(SendMediaConfig),
    SendLocation(SendLocationConfig),
    SendContact(SendContactConfig),
    SendButtons(SendButtonsConfig),
    SendList(SendListConfig),

    /// Suspends the walk until the customer's next message.
    WaitForReply(WaitForReplyConfig),
    /// Branches on the first matching condition.
    Condition(ConditionConfig),
    /// Applies an ordered list of variable assignments.
    SetVariable(SetVariableConfig),
    /// Calls an external HTTP API. Failures never halt the walk.
    ApiCall(ApiCallConfig),
    /// Suspends the walk until a timer fires.
    Delay(DelayConfig),
    /// Bounds graph cycles with a hidden per-node visit counter.
    Loop(LoopConfig),

    // Data and utility nodes
    GetCustomerPhone(StoreVariableConfig),
    GetCustomerCountry(StoreVariableConfig),
    FormatPhoneNumber(FormatPhoneNumberConfig),
    DateTime(DateTimeConfig),
    MathOperation(MathOperationConfig),
    TextOperation(TextOperationConfig),
    RandomChoice(RandomChoiceConfig),

    /// Terminates the execution.
    End(EndNodeConfig),

    /// Any kind this engine does not recognize. Dispatches as a logged no-op.
    #[serde(other)]
    Unknown,
}

/// Deserialization mirror of [`NodeKind`]. The derived adjacently-tagged
/// impl cannot express `#[serde(other)]` when a `config` payload is present
/// alongside an unrecognized tag, so [`NodeKind`]'s `Deserialize` checks the
/// tag first and delegates known kinds here.
#[derive(Deserialize)]
#[serde(
    tag = "node_type",
    content = "config",
    rename_all = "camelCase",
    remote = "NodeKind"
)]
enum NodeKindDef {
    Trigger(TriggerNodeConfig),
    SendText(SendTextConfig),
    SendImage(SendMediaConfig),
    SendVideo(SendMediaConfig),
    SendAudio(SendMediaConfig),
    SendDocument(SendMediaConfig),
    SendSticker(SendMediaConfig),
    SendLocation(SendLocationConfig),
    SendContact(SendContactConfig),
    SendButtons(SendButtonsConfig),
    SendList(SendListConfig),
    WaitForReply(WaitForReplyConfig),
    Condition(ConditionConfig),
    SetVariable(SetVariableConfig),
    ApiCall(ApiCallConfig),
    Delay(DelayConfig),
    Loop(LoopConfig),
    GetCustomerPhone(StoreVariableConfig),
    GetCustomerCountry(StoreVariableConfig),
    FormatPhoneNumber(FormatPhoneNumberConfig),
    DateTime(DateTimeConfig),
    MathOperation(MathOperationConfig),
    TextOperation(TextOperationConfig),
    RandomChoice(RandomChoiceConfig),
    End(EndNodeConfig),
    #[serde(other)]
    Unknown,
}

/// The wire names recognized by [`NodeKindDef`]; any other tag is
/// [`NodeKind::Unknown`].
const KNOWN_NODE_TYPES: &[&str] = &[
    "trigger",
    "sendText",
    "sendImage",
    "sendVideo",
    "sendAudio",
    "sendDocument",
    "sendSticker",
    "sendLocation",
    "sendContact",
    "sendButtons",
    "sendList",
    "waitForReply",
    "condition",
    "setVariable",
    "apiCall",
    "delay",
    "loop",
    "getCustomerPhone",
    "getCustomerCountry",
    "formatPhoneNumber",
    "dateTime",
    "mathOperation",
    "textOperation",
    "randomChoice",
    "end",
];

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value.get("node_type").and_then(serde_json::Value::as_str) {
            Some(tag) if !KNOWN_NODE_TYPES.contains(&tag) => Ok(Self::Unknown),
            _ => NodeKindDef::deserialize(value).map_err(serde::de::Error::custom),
        }
    }
}

impl NodeKind {
    /// The wire name of this kind, for logs and the execution log.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Trigger(_) => "trigger",
            Self::SendText(_) => "sendText",
            Self::SendImage(_) => "sendImage",
            Self::SendVideo(_) => "sendVideo",
            Self::SendAudio(_) => "sendAudio",
            Self::SendDocument(_) => "sendDocument",
            Self::SendSticker(_) => "sendSticker",
            Self::SendLocation(_) => "sendLocation",
            Self::SendContact(_) => "sendContact",
            Self::SendButtons(_) => "sendButtons",
            Self::SendList(_) => "sendList",
            Self::WaitForReply(_) => "waitForReply",
            Self::Condition(_) => "condition",
            Self::SetVariable(_) => "setVariable",
            Self::ApiCall(_) => "apiCall",
            Self::Delay(_) => "delay",
            Self::Loop(_) => "loop",
            Self::GetCustomerPhone(_) => "getCustomerPhone",
            Self::GetCustomerCountry(_) => "getCustomerCountry",
            Self::FormatPhoneNumber(_) => "formatPhoneNumber",
            Self::DateTime(_) => "dateTime",
            Self::MathOperation(_) => "mathOperation",
            Self::TextOperation(_) => "textOperation",
            Self::RandomChoice(_) => "randomChoice",
            Self::End(_) => "end",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true for the trigger entry marker.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        matches!(self, Self::Trigger(_))
    }
}

/// The trigger node carries no configuration of its own; the trigger rule
/// lives on the flow record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerNodeConfig {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendTextConfig {
    /// Message body. May contain `{{path}}` placeholders.
    pub text: String,
}

/// Shared config for image/video/audio/document/sticker senders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendMediaConfig {
    /// Media URL. May contain placeholders.
    pub url: String,
    /// Optional caption. May contain placeholders.
    #[serde(default)]
    pub caption: Option<String>,
    /// Optional filename, for documents.
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendLocationConfig {
    /// Latitude. Templated, parsed as a number at dispatch.
    pub latitude: String,
    /// Longitude. Templated, parsed as a number at dispatch.
    pub longitude: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendContactConfig {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendButtonsConfig {
    /// Message body shown above the buttons. May contain placeholders.
    pub body: String,
    /// The buttons, in display order.
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendListConfig {
    /// Message body shown above the list button. May contain placeholders.
    pub body: String,
    /// Label on the button that opens the list.
    pub button_label: String,
    /// List sections, in display order.
    pub sections: Vec<ListSection>,
}

/// The kind of reply a waiting node expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedReply {
    /// Any inbound message resumes the execution.
    #[default]
    Any,
    Text,
    Button,
    List,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WaitForReplyConfig {
    /// The kind of reply expected.
    #[serde(default)]
    pub expected_type: ExpectedReply,
    /// When set, the reply text is bound to this variable on resume.
    #[serde(default)]
    pub variable_name: Option<String>,
}

/// The comparison applied between a variable and a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    /// Regex match. An invalid pattern evaluates to false.
    Matches,
    /// True when the variable is present and non-empty.
    Exists,
}

/// One `(variable, operator, value)` triple with the branch it selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConditionRule {
    /// Dot path into the variable environment.
    pub variable: String,
    pub operator: ConditionOperator,
    /// Comparison literal. May contain placeholders.
    #[serde(default)]
    pub value: String,
    /// The branch handle selected when this rule is true.
    pub output_handle: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConditionConfig {
    /// Evaluated in order; the first true rule wins.
    pub conditions: Vec<ConditionRule>,
    /// The branch taken when no rule is true. Defaults to `"false"`.
    #[serde(default)]
    pub default_handle: Option<String>,
}

/// How a `setVariable` assignment produces its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssignmentSource {
    /// Interpolate the value as a template string.
    #[default]
    Template,
    /// Copy another variable's value verbatim, preserving its type.
    Variable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Assignment {
    /// Target dot path. Nested paths create intermediate objects.
    pub variable: String,
    /// Template string or source variable path, per `value_type`.
    pub value: String,
    #[serde(default)]
    pub value_type: AssignmentSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetVariableConfig {
    /// Applied in order; later assignments see earlier results.
    pub assignments: Vec<Assignment>,
}

/// Maps one path in an API response to a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResponseMapping {
    /// Dot path into the parsed JSON response.
    pub path: String,
    /// Target variable path.
    pub variable: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiCallConfig {
    /// Request URL. May contain placeholders.
    pub url: String,
    /// HTTP method. Defaults to GET; unrecognized methods fall back to GET.
    #[serde(default)]
    pub method: Option<String>,
    /// Request headers. Values may contain placeholders.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request body. May contain placeholders. Sent as-is.
    #[serde(default)]
    pub body: Option<String>,
    /// Response paths copied into variables after the call.
    #[serde(default)]
    pub response_mapping: Vec<ResponseMapping>,
    /// Request timeout in seconds. Defaults to 10.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DelayConfig {
    /// How long to wait before the walk continues.
    pub delay_seconds: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoopConfig {
    /// Visits before the loop exits via the `"complete"` branch. Defaults
    /// to 10.
    #[serde(default)]
    pub max_iterations: Option<u32>,
}

/// Config for nodes that only pick the variable they write to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StoreVariableConfig {
    /// Target variable. Each node kind has its own default.
    #[serde(default)]
    pub variable_name: Option<String>,
}

/// Output form for `formatPhoneNumber`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhoneFormat {
    /// `+` followed by digits.
    #[default]
    E164,
    /// Digits only.
    Digits,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FormatPhoneNumberConfig {
    /// Source variable. Defaults to `customer_phone`.
    #[serde(default)]
    pub variable: Option<String>,
    #[serde(default)]
    pub format: PhoneFormat,
    /// Target variable. Defaults to `formatted_phone`.
    #[serde(default)]
    pub variable_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DateTimeConfig {
    /// strftime format string. Defaults to RFC 3339. An invalid format
    /// falls back to RFC 3339.
    #[serde(default)]
    pub format: Option<String>,
    /// Target variable. Defaults to `date_time`.
    #[serde(default)]
    pub variable_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MathOperator {
    Add,
    Subtract,
    Multiply,
    /// Division by zero yields 0.
    Divide,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MathOperationConfig {
    pub operator: MathOperator,
    /// Left operand. Templated, then parsed as a number (unparsable is 0).
    pub left: String,
    /// Right operand. Templated, then parsed as a number (unparsable is 0).
    pub right: String,
    /// Target variable.
    pub variable_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextOperator {
    Uppercase,
    Lowercase,
    Trim,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextOperationConfig {
    pub operator: TextOperator,
    /// Input text. May contain placeholders.
    pub input: String,
    /// Substring to replace, for [`TextOperator::Replace`].
    #[serde(default)]
    pub search: Option<String>,
    /// Replacement text, for [`TextOperator::Replace`].
    #[serde(default)]
    pub replacement: Option<String>,
    /// Target variable.
    pub variable_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RandomChoiceConfig {
    /// The values to choose among. The chosen value is also the branch
    /// handle.
    pub choices: Vec<String>,
    /// Target variable. Defaults to `random_choice`.
    #[serde(default)]
    pub variable_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndNodeConfig {}

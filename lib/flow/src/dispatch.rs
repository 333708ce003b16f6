//! Polymorphic node dispatch.
//!
//! Each dispatch reads the node's typed config, interpolates templated
//! fields against the variable environment, applies the node's effect, and
//! returns how the walk proceeds. Dispatch is infallible by policy: gateway
//! errors and API failures are recorded into variables or logged, never
//! surfaced, because a transient provider failure must not strand a
//! conversation.

use chrono::{DateTime, Duration, Utc};
use rand::seq::IndexedRandom;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

use copper_sparrow_messaging::{
    Button, ButtonsContent, ChannelCredentials, ContactContent, CustomerProfile, ListContent,
    ListRow, ListSection, LocationContent, MediaContent, MessageRecorder, MessagingGateway,
    OutboundMessage, OutboundRecord,
};

use crate::condition::{coerce_number, select_handle};
use crate::execution::WaitKind;
use crate::node::{
    ApiCallConfig, AssignmentSource, DateTimeConfig, ExpectedReply, FormatPhoneNumberConfig,
    LoopConfig, MathOperationConfig, MathOperator, Node, NodeKind, PhoneFormat,
    RandomChoiceConfig, SetVariableConfig, StoreVariableConfig, TextOperationConfig, TextOperator,
};
use crate::template::{interpolate, interpolate_opt};
use crate::variables::{VariableEnvironment, lookup_path};

/// How the walk proceeds after dispatching one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Follow the first unlabeled outgoing edge.
    Continue,
    /// Follow the outgoing edge labeled with this handle.
    Branch(String),
    /// Suspend the execution at this node.
    Wait {
        kind: WaitKind,
        /// Set for timer waits.
        resume_at: Option<DateTime<Utc>>,
    },
    /// Terminate the execution.
    End,
}

impl DispatchOutcome {
    /// Summary written to the execution log.
    #[must_use]
    pub fn summary(&self) -> Value {
        match self {
            Self::Continue => json!({"outcome": "continue"}),
            Self::Branch(handle) => json!({"outcome": "branch", "handle": handle}),
            Self::Wait { kind, resume_at } => {
                json!({"outcome": "wait", "waiting_for": kind, "resume_at": resume_at})
            }
            Self::End => json!({"outcome": "end"}),
        }
    }
}

/// Per-invocation identity dispatch works against.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub channel: ChannelCredentials,
    pub customer: CustomerProfile,
}

/// Dispatches nodes against the messaging gateway and the HTTP client.
pub struct NodeDispatcher {
    gateway: Arc<dyn MessagingGateway>,
    recorder: Arc<dyn MessageRecorder>,
    http: reqwest::Client,
}

impl NodeDispatcher {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        recorder: Arc<dyn MessageRecorder>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            gateway,
            recorder,
            http,
        }
    }

    /// Dispatches one node.
    pub async fn dispatch(
        &self,
        node: &Node,
        ctx: &DispatchContext,
        env: &mut VariableEnvironment,
    ) -> DispatchOutcome {
        match &node.kind {
            // The trigger node is a position marker; if it is ever dispatched
            // it has no effect.
            NodeKind::Trigger(_) => DispatchOutcome::Continue,

            NodeKind::SendText(config) => {
                let message = OutboundMessage::Text {
                    body: interpolate(&config.text, env),
                };
                self.deliver(node, ctx, message).await
            }
            NodeKind::SendImage(config) => {
                let media = self.media(config, env);
                self.deliver(node, ctx, OutboundMessage::Image(media)).await
            }
            NodeKind::SendVideo(config) => {
                let media = self.media(config, env);
                self.deliver(node, ctx, OutboundMessage::Video(media)).await
            }
            NodeKind::SendAudio(config) => {
                let media = self.media(config, env);
                self.deliver(node, ctx, OutboundMessage::Audio(media)).await
            }
            NodeKind::SendDocument(config) => {
                let media = self.media(config, env);
                self.deliver(node, ctx, OutboundMessage::Document(media))
                    .await
            }
            NodeKind::SendSticker(config) => {
                let media = self.media(config, env);
                self.deliver(node, ctx, OutboundMessage::Sticker(media))
                    .await
            }
            NodeKind::SendLocation(config) => {
                let message = OutboundMessage::Location(LocationContent {
                    latitude: coerce_number(&interpolate(&config.latitude, env)),
                    longitude: coerce_number(&interpolate(&config.longitude, env)),
                    name: interpolate_opt(config.name.as_deref(), env),
                    address: interpolate_opt(config.address.as_deref(), env),
                });
                self.deliver(node, ctx, message).await
            }
            NodeKind::SendContact(config) => {
                let message = OutboundMessage::Contact(ContactContent {
                    name: interpolate(&config.name, env),
                    phone: interpolate(&config.phone, env),
                });
                self.deliver(node, ctx, message).await
            }
            NodeKind::SendButtons(config) => {
                let message = OutboundMessage::Buttons(ButtonsContent {
                    body: interpolate(&config.body, env),
                    buttons: config
                        .buttons
                        .iter()
                        .map(|button| Button {
                            id: button.id.clone(),
                            title: interpolate(&button.title, env),
                        })
                        .collect(),
                });
                self.deliver(node, ctx, message).await
            }
            NodeKind::SendList(config) => {
                let message = OutboundMessage::List(ListContent {
                    body: interpolate(&config.body, env),
                    button_label: interpolate(&config.button_label, env),
                    sections: config
                        .sections
                        .iter()
                        .map(|section| ListSection {
                            title: interpolate(&section.title, env),
                            rows: section
                                .rows
                                .iter()
                                .map(|row| ListRow {
                                    id: row.id.clone(),
                                    title: interpolate(&row.title, env),
                                    description: interpolate_opt(row.description.as_deref(), env),
                                })
                                .collect(),
                        })
                        .collect(),
                });
                self.deliver(node, ctx, message).await
            }

            NodeKind::WaitForReply(config) => DispatchOutcome::Wait {
                kind: match config.expected_type {
                    ExpectedReply::Any => WaitKind::Any,
                    ExpectedReply::Text => WaitKind::Text,
                    ExpectedReply::Button => WaitKind::Button,
                    ExpectedReply::List => WaitKind::List,
                },
                resume_at: None,
            },

            NodeKind::Condition(config) => DispatchOutcome::Branch(select_handle(config, env)),

            NodeKind::SetVariable(config) => {
                apply_assignments(config, env);
                DispatchOutcome::Continue
            }

            NodeKind::ApiCall(config) => {
                self.api_call(node, config, env).await;
                DispatchOutcome::Continue
            }

            NodeKind::Delay(config) => DispatchOutcome::Wait {
                kind: WaitKind::Timer,
                resume_at: Some(Utc::now() + Duration::seconds(config.delay_seconds as i64)),
            },

            NodeKind::Loop(config) => advance_loop(node, config, env),

            NodeKind::GetCustomerPhone(config) => {
                store_value(config, "customer_phone", json!(ctx.customer.phone), env)
            }
            NodeKind::GetCustomerCountry(config) => {
                let country = country_for_phone(&ctx.customer.phone).unwrap_or("unknown");
                store_value(config, "customer_country", json!(country), env)
            }
            NodeKind::FormatPhoneNumber(config) => format_phone(config, env),
            NodeKind::DateTime(config) => current_date_time(config, env),
            NodeKind::MathOperation(config) => math_operation(config, env),
            NodeKind::TextOperation(config) => text_operation(config, env),
            NodeKind::RandomChoice(config) => random_choice(node, config, env),

            NodeKind::End(_) => DispatchOutcome::End,

            NodeKind::Unknown => {
                // Forward compatibility: a graph authored against a newer
                // editor must not strand the customer.
                warn!(
                    node_id = %node.id,
                    node_name = %node.name,
                    "skipping node of unknown kind"
                );
                DispatchOutcome::Continue
            }
        }
    }

    fn media(&self, config: &crate::node::SendMediaConfig, env: &VariableEnvironment) -> MediaContent {
        MediaContent {
            url: interpolate(&config.url, env),
            caption: interpolate_opt(config.caption.as_deref(), env),
            filename: interpolate_opt(config.filename.as_deref(), env),
        }
    }

    /// Sends one outbound message and records it against the conversation.
    /// Gateway errors are logged and swallowed; delivery failure is never
    /// fatal to the walk.
    async fn deliver(
        &self,
        node: &Node,
        ctx: &DispatchContext,
        message: OutboundMessage,
    ) -> DispatchOutcome {
        match self
            .gateway
            .send(&ctx.channel, &ctx.customer.phone, &message)
            .await
        {
            Ok(receipt) => {
                debug!(
                    node_id = %node.id,
                    provider_message_id = %receipt.provider_message_id,
                    "outbound message delivered"
                );
                let record = OutboundRecord::delivered(
                    ctx.customer.id,
                    ctx.channel.channel_id,
                    message,
                    &receipt,
                );
                if let Err(error) = self.recorder.record(record).await {
                    warn!(node_id = %node.id, %error, "failed to record outbound message");
                }
            }
            Err(error) => {
                warn!(node_id = %node.id, %error, "gateway send failed, continuing walk");
            }
        }
        DispatchOutcome::Continue
    }

    /// Issues the configured HTTP request and maps the response into
    /// variables. Every exit path records `api_success`; failures also
    /// record `api_error`.
    async fn api_call(&self, node: &Node, config: &ApiCallConfig, env: &mut VariableEnvironment) {
        let url = interpolate(&config.url, env);
        let method = config
            .method
            .as_deref()
            .and_then(|name| reqwest::Method::from_bytes(name.to_uppercase().as_bytes()).ok())
            .unwrap_or(reqwest::Method::GET);
        let timeout = std::time::Duration::from_secs(config.timeout_seconds.unwrap_or(10));

        let mut request = self.http.request(method, &url).timeout(timeout);
        for (name, value) in &config.headers {
            request = request.header(name, interpolate(value, env));
        }
        if let Some(body) = &config.body {
            request = request.body(interpolate(body, env));
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                env.set("api_status", json!(status.as_u16()));
                env.set("api_success", json!(status.is_success()));
                let body: Value = response.json().await.unwrap_or_else(|_| json!({}));
                for mapping in &config.response_mapping {
                    let value = lookup_path(&body, &mapping.path)
                        .cloned()
                        .unwrap_or(Value::String(String::new()));
                    env.set(&mapping.variable, value);
                }
            }
            Err(error) => {
                warn!(node_id = %node.id, %url, %error, "API call failed, continuing walk");
                env.set("api_success", json!(false));
                env.set("api_error", json!(error.to_string()));
            }
        }
    }
}

fn apply_assignments(config: &SetVariableConfig, env: &mut VariableEnvironment) {
    for assignment in &config.assignments {
        let value = match assignment.value_type {
            AssignmentSource::Variable => env
                .get(&assignment.value)
                .cloned()
                .unwrap_or(Value::String(String::new())),
            AssignmentSource::Template => Value::String(interpolate(&assignment.value, env)),
        };
        env.set(&assignment.variable, value);
    }
}

/// Counts visits in a hidden per-node variable. The counter reaching
/// `max_iterations` exits via the `"complete"` branch and clears itself, so
/// a later re-entry starts fresh.
fn advance_loop(node: &Node, config: &LoopConfig, env: &mut VariableEnvironment) -> DispatchOutcome {
    let key = format!("__loop_{}", node.id);
    let max = config.max_iterations.unwrap_or(10).max(1);
    let visits = env
        .get(&key)
        .and_then(Value::as_u64)
        .unwrap_or(0)
        .saturating_add(1);
    if visits >= u64::from(max) {
        env.remove(&key);
        DispatchOutcome::Branch("complete".to_string())
    } else {
        env.set(&key, json!(visits));
        DispatchOutcome::Branch("loop".to_string())
    }
}

fn store_value(
    config: &StoreVariableConfig,
    default_name: &str,
    value: Value,
    env: &mut VariableEnvironment,
) -> DispatchOutcome {
    let name = config.variable_name.as_deref().unwrap_or(default_name);
    env.set(name, value);
    DispatchOutcome::Continue
}

fn format_phone(config: &FormatPhoneNumberConfig, env: &mut VariableEnvironment) -> DispatchOutcome {
    let source = config.variable.as_deref().unwrap_or("customer_phone");
    let digits: String = env
        .get_string(source)
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let formatted = match config.format {
        PhoneFormat::E164 => format!("+{digits}"),
        PhoneFormat::Digits => digits,
    };
    let target = config.variable_name.as_deref().unwrap_or("formatted_phone");
    env.set(target, json!(formatted));
    DispatchOutcome::Continue
}

fn current_date_time(config: &DateTimeConfig, env: &mut VariableEnvironment) -> DispatchOutcome {
    use chrono::format::{Item, StrftimeItems};

    let now = Utc::now();
    let rendered = match config.format.as_deref() {
        Some(format) => {
            let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
            if items.iter().any(|item| matches!(item, Item::Error)) {
                warn!(%format, "invalid date format, falling back to RFC 3339");
                now.to_rfc3339()
            } else {
                now.format_with_items(items.into_iter()).to_string()
            }
        }
        None => now.to_rfc3339(),
    };
    let target = config.variable_name.as_deref().unwrap_or("date_time");
    env.set(target, json!(rendered));
    DispatchOutcome::Continue
}

fn math_operation(config: &MathOperationConfig, env: &mut VariableEnvironment) -> DispatchOutcome {
    let left = coerce_number(&interpolate(&config.left, env));
    let right = coerce_number(&interpolate(&config.right, env));
    let result = match config.operator {
        MathOperator::Add => left + right,
        MathOperator::Subtract => left - right,
        MathOperator::Multiply => left * right,
        MathOperator::Divide => {
            if right == 0.0 {
                warn!("division by zero in math node, yielding 0");
                0.0
            } else {
                left / right
            }
        }
    };
    let number = serde_json::Number::from_f64(result).unwrap_or_else(|| 0.into());
    env.set(&config.variable_name, Value::Number(number));
    DispatchOutcome::Continue
}

fn text_operation(config: &TextOperationConfig, env: &mut VariableEnvironment) -> DispatchOutcome {
    let input = interpolate(&config.input, env);
    let output = match config.operator {
        TextOperator::Uppercase => input.to_uppercase(),
        TextOperator::Lowercase => input.to_lowercase(),
        TextOperator::Trim => input.trim().to_string(),
        TextOperator::Replace => {
            let search = config.search.as_deref().unwrap_or_default();
            let replacement = interpolate(config.replacement.as_deref().unwrap_or_default(), env);
            if search.is_empty() {
                input
            } else {
                input.replace(search, &replacement)
            }
        }
    };
    env.set(&config.variable_name, json!(output));
    DispatchOutcome::Continue
}

fn random_choice(
    node: &Node,
    config: &RandomChoiceConfig,
    env: &mut VariableEnvironment,
) -> DispatchOutcome {
    let Some(choice) = config.choices.choose(&mut rand::rng()) else {
        warn!(node_id = %node.id, "random choice node has no choices");
        return DispatchOutcome::Continue;
    };
    let name = config.variable_name.as_deref().unwrap_or("random_choice");
    env.set(name, json!(choice));
    DispatchOutcome::Branch(choice.clone())
}

/// Longest-prefix country lookup over calling codes. Covers the markets the
/// platform ships in; anything else reports as unknown.
fn country_for_phone(phone: &str) -> Option<&'static str> {
    const PREFIXES: &[(&str, &str)] = &[
        ("351", "PT"),
        ("353", "IE"),
        ("358", "FI"),
        ("966", "SA"),
        ("971", "AE"),
        ("972", "IL"),
        ("20", "EG"),
        ("27", "ZA"),
        ("30", "GR"),
        ("31", "NL"),
        ("32", "BE"),
        ("33", "FR"),
        ("34", "ES"),
        ("39", "IT"),
        ("41", "CH"),
        ("43", "AT"),
        ("44", "GB"),
        ("45", "DK"),
        ("46", "SE"),
        ("47", "NO"),
        ("48", "PL"),
        ("49", "DE"),
        ("51", "PE"),
        ("52", "MX"),
        ("54", "AR"),
        ("55", "BR"),
        ("56", "CL"),
        ("57", "CO"),
        ("60", "MY"),
        ("61", "AU"),
        ("62", "ID"),
        ("63", "PH"),
        ("64", "NZ"),
        ("65", "SG"),
        ("66", "TH"),
        ("81", "JP"),
        ("82", "KR"),
        ("84", "VN"),
        ("86", "CN"),
        ("90", "TR"),
        ("91", "IN"),
        ("1", "US"),
        ("7", "RU"),
    ];

    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    PREFIXES
        .iter()
        .find(|(prefix, _)| digits.starts_with(prefix))
        .map(|(_, country)| *country)
}

#[cfg(test)]
mod tests {
    use super::*;
    use copper_sparrow_core::{ChannelId, CustomerId};
    use copper_sparrow_messaging::{GatewayError, MockGateway, NullRecorder};
    use crate::node::{
        Assignment, ConditionConfig, ConditionOperator, ConditionRule, SendTextConfig,
    };
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context() -> DispatchContext {
        DispatchContext {
            channel: ChannelCredentials {
                channel_id: ChannelId::new(),
                sender_id: "sender".to_string(),
                access_token: "token".to_string(),
            },
            customer: CustomerProfile {
                id: CustomerId::new(),
                name: Some("Ada".to_string()),
                phone: "+351912345678".to_string(),
            },
        }
    }

    fn dispatcher() -> (NodeDispatcher, Arc<MockGateway>) {
        let gateway = Arc::new(MockGateway::new());
        let dispatcher = NodeDispatcher::new(
            gateway.clone(),
            Arc::new(NullRecorder),
            reqwest::Client::new(),
        );
        (dispatcher, gateway)
    }

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: id.to_string(),
            name: id.to_string(),
            kind,
        }
    }

    #[tokio::test]
    async fn send_text_interpolates_and_delivers() {
        let (dispatcher, gateway) = dispatcher();
        let mut env = VariableEnvironment::new();
        env.set("customer_name", json!("Ada"));
        let node = node(
            "greet",
            NodeKind::SendText(SendTextConfig {
                text: "Hi {{customer_name}}".to_string(),
            }),
        );

        let outcome = dispatcher.dispatch(&node, &context(), &mut env).await;
        assert_eq!(outcome, DispatchOutcome::Continue);

        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].message,
            OutboundMessage::Text {
                body: "Hi Ada".to_string()
            }
        );
    }

    #[tokio::test]
    async fn gateway_failure_is_swallowed() {
        let (dispatcher, gateway) = dispatcher();
        gateway.fail_next(GatewayError::Transport {
            message: "down".to_string(),
        });
        let mut env = VariableEnvironment::new();
        let node = node(
            "greet",
            NodeKind::SendText(SendTextConfig {
                text: "hi".to_string(),
            }),
        );

        let outcome = dispatcher.dispatch(&node, &context(), &mut env).await;
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn condition_branches_on_fallthrough() {
        let (dispatcher, _) = dispatcher();
        let mut env = VariableEnvironment::new();
        env.set("age", json!("15"));
        let node = node(
            "gate",
            NodeKind::Condition(ConditionConfig {
                conditions: vec![ConditionRule {
                    variable: "age".to_string(),
                    operator: ConditionOperator::GreaterThan,
                    value: "18".to_string(),
                    output_handle: "adult".to_string(),
                }],
                default_handle: Some("minor".to_string()),
            }),
        );

        let outcome = dispatcher.dispatch(&node, &context(), &mut env).await;
        assert_eq!(outcome, DispatchOutcome::Branch("minor".to_string()));
    }

    #[tokio::test]
    async fn set_variable_applies_assignments_in_order() {
        let (dispatcher, _) = dispatcher();
        let mut env = VariableEnvironment::new();
        env.set("customer_name", json!("Ada"));
        let node = node(
            "assign",
            NodeKind::SetVariable(SetVariableConfig {
                assignments: vec![
                    Assignment {
                        variable: "order.owner".to_string(),
                        value: "{{customer_name}}".to_string(),
                        value_type: AssignmentSource::Template,
                    },
                    Assignment {
                        variable: "owner_copy".to_string(),
                        value: "order.owner".to_string(),
                        value_type: AssignmentSource::Variable,
                    },
                ],
            }),
        );

        dispatcher.dispatch(&node, &context(), &mut env).await;
        assert_eq!(env.get_string("order.owner"), "Ada");
        assert_eq!(env.get_string("owner_copy"), "Ada");
    }

    #[tokio::test]
    async fn loop_completes_on_max_iterations_and_clears_counter() {
        let (dispatcher, _) = dispatcher();
        let mut env = VariableEnvironment::new();
        let node = node(
            "retry",
            NodeKind::Loop(LoopConfig {
                max_iterations: Some(3),
            }),
        );
        let ctx = context();

        for _ in 0..2 {
            let outcome = dispatcher.dispatch(&node, &ctx, &mut env).await;
            assert_eq!(outcome, DispatchOutcome::Branch("loop".to_string()));
        }
        let outcome = dispatcher.dispatch(&node, &ctx, &mut env).await;
        assert_eq!(outcome, DispatchOutcome::Branch("complete".to_string()));
        assert!(env.get("__loop_retry").is_none());
    }

    #[tokio::test]
    async fn delay_waits_on_a_timer() {
        let (dispatcher, _) = dispatcher();
        let mut env = VariableEnvironment::new();
        let node = node("pause", NodeKind::Delay(crate::node::DelayConfig {
            delay_seconds: 60,
        }));

        let before = Utc::now();
        let outcome = dispatcher.dispatch(&node, &context(), &mut env).await;
        match outcome {
            DispatchOutcome::Wait {
                kind: WaitKind::Timer,
                resume_at: Some(at),
            } => {
                let expected = before + Duration::seconds(60);
                assert!((at - expected).num_seconds().abs() <= 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn api_call_maps_response_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders/42"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"order": {"status": "shipped"}})),
            )
            .mount(&server)
            .await;

        let (dispatcher, _) = dispatcher();
        let mut env = VariableEnvironment::new();
        env.set("order_id", json!("42"));
        let node = node(
            "lookup",
            NodeKind::ApiCall(ApiCallConfig {
                url: format!("{}/orders/{{{{order_id}}}}", server.uri()),
                method: Some("get".to_string()),
                headers: Default::default(),
                body: None,
                response_mapping: vec![crate::node::ResponseMapping {
                    path: "order.status".to_string(),
                    variable: "order_status".to_string(),
                }],
                timeout_seconds: Some(5),
            }),
        );

        let outcome = dispatcher.dispatch(&node, &context(), &mut env).await;
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(env.get("api_status"), Some(&json!(200)));
        assert_eq!(env.get("api_success"), Some(&json!(true)));
        assert_eq!(env.get_string("order_status"), "shipped");
    }

    #[tokio::test]
    async fn api_failure_never_halts_the_walk() {
        let (dispatcher, _) = dispatcher();
        let mut env = VariableEnvironment::new();
        let node = node(
            "lookup",
            NodeKind::ApiCall(ApiCallConfig {
                url: "http://127.0.0.1:1/unreachable".to_string(),
                method: None,
                headers: Default::default(),
                body: None,
                response_mapping: vec![],
                timeout_seconds: Some(1),
            }),
        );

        let outcome = dispatcher.dispatch(&node, &context(), &mut env).await;
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(env.get("api_success"), Some(&json!(false)));
        assert!(!env.get_string("api_error").is_empty());
    }

    #[tokio::test]
    async fn random_choice_branches_on_chosen_value() {
        let (dispatcher, _) = dispatcher();
        let mut env = VariableEnvironment::new();
        let choices = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let node = node(
            "pick",
            NodeKind::RandomChoice(RandomChoiceConfig {
                choices: choices.clone(),
                variable_name: None,
            }),
        );

        let outcome = dispatcher.dispatch(&node, &context(), &mut env).await;
        let DispatchOutcome::Branch(handle) = outcome else {
            panic!("expected a branch");
        };
        assert!(choices.contains(&handle));
        assert_eq!(env.get_string("random_choice"), handle);
    }

    #[tokio::test]
    async fn customer_identity_nodes_fill_variables() {
        let (dispatcher, _) = dispatcher();
        let mut env = VariableEnvironment::new();
        let ctx = context();

        dispatcher
            .dispatch(
                &node(
                    "phone",
                    NodeKind::GetCustomerPhone(StoreVariableConfig::default()),
                ),
                &ctx,
                &mut env,
            )
            .await;
        dispatcher
            .dispatch(
                &node(
                    "country",
                    NodeKind::GetCustomerCountry(StoreVariableConfig::default()),
                ),
                &ctx,
                &mut env,
            )
            .await;

        assert_eq!(env.get_string("customer_phone"), "+351912345678");
        assert_eq!(env.get_string("customer_country"), "PT");
    }

    #[tokio::test]
    async fn math_divide_by_zero_yields_zero() {
        let (dispatcher, _) = dispatcher();
        let mut env = VariableEnvironment::new();
        let node = node(
            "math",
            NodeKind::MathOperation(MathOperationConfig {
                operator: MathOperator::Divide,
                left: "10".to_string(),
                right: "0".to_string(),
                variable_name: "result".to_string(),
            }),
        );

        dispatcher.dispatch(&node, &context(), &mut env).await;
        assert_eq!(env.get("result"), Some(&json!(0.0)));
    }

    #[tokio::test]
    async fn text_replace_operation() {
        let (dispatcher, _) = dispatcher();
        let mut env = VariableEnvironment::new();
        env.set("greeting", json!("hello world"));
        let node = node(
            "text",
            NodeKind::TextOperation(TextOperationConfig {
                operator: TextOperator::Replace,
                input: "{{greeting}}".to_string(),
                search: Some("world".to_string()),
                replacement: Some("there".to_string()),
                variable_name: "out".to_string(),
            }),
        );

        dispatcher.dispatch(&node, &context(), &mut env).await;
        assert_eq!(env.get_string("out"), "hello there");
    }

    #[tokio::test]
    async fn unknown_kind_is_a_no_op() {
        let (dispatcher, gateway) = dispatcher();
        let mut env = VariableEnvironment::new();
        let node = node("mystery", NodeKind::Unknown);

        let outcome = dispatcher.dispatch(&node, &context(), &mut env).await;
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert!(gateway.sent().is_empty());
    }
}

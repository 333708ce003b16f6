//! The flow engine: execution lifecycle and the dispatch loop.
//!
//! One engine invocation handles one inbound message (or one due timer). It
//! locates or creates the customer's execution, walks the graph node by node
//! until a wait, an end, or a dead end, and writes the new state back exactly
//! once, conditional on the version it loaded. A failed conditional write
//! means another invocation already advanced this conversation; the engine
//! aborts quietly.

use chrono::{DateTime, Utc};
use copper_sparrow_core::ExecutionId;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use copper_sparrow_messaging::{CustomerProfile, InboundMessage};

use crate::dispatch::{DispatchContext, DispatchOutcome, NodeDispatcher};
use crate::error::EngineError;
use crate::execution::{Execution, ExecutionLogEntry, ExecutionStatus};
use crate::graph::FlowGraph;
use crate::node::NodeKind;
use crate::store::{ChannelDirectory, ExecutionStore, GraphStore, StoreError};
use crate::trigger::match_flow;
use crate::variables::VariableEnvironment;

/// Engine tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Maximum nodes dispatched per invocation. A last-resort guard against
    /// cyclic graphs that bypass loop nodes.
    pub step_ceiling: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { step_ceiling: 256 }
    }
}

/// What one invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    /// No open execution and no trigger matched.
    NoMatch,
    /// Another invocation advanced this conversation first.
    Superseded,
    /// The execution suspended at a wait node.
    Suspended { execution_id: ExecutionId },
    /// The execution reached an end node or a dead end.
    Completed { execution_id: ExecutionId },
}

enum WalkEnd {
    Suspended,
    Completed,
}

/// The resumable graph-walk interpreter.
pub struct FlowEngine {
    graph_store: Arc<dyn GraphStore>,
    execution_store: Arc<dyn ExecutionStore>,
    channels: Arc<dyn ChannelDirectory>,
    dispatcher: NodeDispatcher,
    config: EngineConfig,
}

impl FlowEngine {
    #[must_use]
    pub fn new(
        graph_store: Arc<dyn GraphStore>,
        execution_store: Arc<dyn ExecutionStore>,
        channels: Arc<dyn ChannelDirectory>,
        dispatcher: NodeDispatcher,
        config: EngineConfig,
    ) -> Self {
        Self {
            graph_store,
            execution_store,
            channels,
            dispatcher,
            config,
        }
    }

    /// Handles one inbound message: resumes the customer's open execution if
    /// one exists, otherwise matches triggers and starts a fresh one.
    ///
    /// # Errors
    ///
    /// Configuration and store failures abort the invocation; the previous
    /// persisted execution state remains authoritative.
    pub async fn handle_message(
        &self,
        message: &InboundMessage,
    ) -> Result<EngineOutcome, EngineError> {
        let channel = self
            .channels
            .credentials(message.channel_id)
            .await
            .ok_or_else(|| EngineError::UnknownChannel {
                channel: message.channel_id.to_string(),
            })?;
        let ctx = DispatchContext {
            channel,
            customer: message.customer.clone(),
        };

        let existing = self
            .execution_store
            .find_open(message.customer.id, message.channel_id)
            .await?;
        match existing {
            Some(execution) => self.resume(execution, message, &ctx).await,
            None => self.start(message, &ctx).await,
        }
    }

    /// Resumes executions whose timer wait has become due. Returns one
    /// outcome per resumed execution; executions on unconfigured channels are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Store failures abort the sweep.
    pub async fn resume_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<EngineOutcome>, EngineError> {
        let due = self.execution_store.find_due_timers(now).await?;
        let mut outcomes = Vec::with_capacity(due.len());
        for execution in due {
            let Some(channel) = self.channels.credentials(execution.channel_id).await else {
                warn!(
                    execution_id = %execution.id,
                    channel_id = %execution.channel_id,
                    "skipping due timer on unconfigured channel"
                );
                continue;
            };
            // Timer resumes have no inbound message; the customer identity
            // was snapshotted into the variables when the execution started.
            let customer = CustomerProfile {
                id: execution.customer_id,
                name: Some(execution.variables.get_string("customer_name"))
                    .filter(|name| !name.is_empty()),
                phone: execution.variables.get_string("customer_phone"),
            };
            let ctx = DispatchContext { channel, customer };
            outcomes.push(self.advance(execution, &ctx).await?);
        }
        Ok(outcomes)
    }

    async fn start(
        &self,
        message: &InboundMessage,
        ctx: &DispatchContext,
    ) -> Result<EngineOutcome, EngineError> {
        let flows = self
            .graph_store
            .find_candidate_flows(message.channel_id)
            .await?;
        let Some(flow) = match_flow(&flows, &message.text) else {
            debug!(customer_id = %message.customer.id, "no trigger matched");
            return Ok(EngineOutcome::NoMatch);
        };

        let bundle = self.graph_store.load_flow(flow.id).await?;
        let trigger = bundle
            .graph
            .trigger()
            .ok_or(EngineError::MissingTrigger { flow_id: flow.id })?;

        let mut variables = VariableEnvironment::new();
        seed_message_variables(&mut variables, message);
        let execution = Execution::start(
            flow.id,
            message.customer.id,
            message.channel_id,
            trigger.id.clone(),
            variables,
        );
        // Creating the record is what claims the (customer, channel) slot;
        // the walk then commits through one conditional update.
        self.execution_store.create(&execution).await?;
        info!(
            execution_id = %execution.id,
            flow_id = %flow.id,
            flow_name = %flow.name,
            customer_id = %message.customer.id,
            "started execution"
        );

        self.walk(execution, &bundle.graph, ctx).await
    }

    async fn resume(
        &self,
        mut execution: Execution,
        message: &InboundMessage,
        ctx: &DispatchContext,
    ) -> Result<EngineOutcome, EngineError> {
        seed_message_variables(&mut execution.variables, message);
        debug!(
            execution_id = %execution.id,
            node_id = %execution.current_node_id,
            "resuming execution"
        );
        self.advance(execution, ctx).await.map(|outcome| {
            if let EngineOutcome::Completed { execution_id } = outcome {
                debug!(%execution_id, "execution completed on resume");
            }
            outcome
        })
    }

    /// Loads the graph, binds the reply to the waiting node's variable, and
    /// walks on from the node the execution is positioned at.
    async fn advance(
        &self,
        mut execution: Execution,
        ctx: &DispatchContext,
    ) -> Result<EngineOutcome, EngineError> {
        let bundle = match self.graph_store.load_flow(execution.flow_id).await {
            Ok(bundle) => bundle,
            Err(StoreError::NotFound { .. }) => {
                // The flow was deleted under a live execution. Close it out
                // rather than leaving a conversation stuck waiting forever.
                warn!(
                    execution_id = %execution.id,
                    flow_id = %execution.flow_id,
                    "flow vanished under a live execution, completing it"
                );
                let at = execution.current_node_id.clone();
                execution.complete(&at);
                return self.persist(execution, WalkEnd::Completed).await;
            }
            Err(error) => return Err(error.into()),
        };

        if execution.status == ExecutionStatus::Waiting {
            bind_reply(&mut execution, &bundle.graph);
        }
        execution.status = ExecutionStatus::Running;
        execution.waiting_for = None;
        execution.resume_at = None;

        self.walk(execution, &bundle.graph, ctx).await
    }

    /// The sequential dispatch loop. The execution is positioned at a node
    /// that has already had its effect (the trigger, or the node that
    /// suspended), so the walk first steps past it along its first outgoing
    /// edge, ignoring branch handles.
    async fn walk(
        &self,
        mut execution: Execution,
        graph: &FlowGraph,
        ctx: &DispatchContext,
    ) -> Result<EngineOutcome, EngineError> {
        let mut position = graph
            .any_edge_from(&execution.current_node_id)
            .map(|edge| edge.target.clone());
        let mut steps: u32 = 0;

        let end = loop {
            let Some(node_id) = position else {
                // Dead end: the resolved branch has no edge. Normal
                // completion, not an error.
                let at = execution.current_node_id.clone();
                execution.complete(&at);
                break WalkEnd::Completed;
            };
            steps += 1;
            if steps > self.config.step_ceiling {
                return Err(EngineError::StepCeiling {
                    limit: self.config.step_ceiling,
                });
            }
            let Some(node) = graph.node(&node_id) else {
                warn!(%node_id, "edge targets a node missing from the graph, completing");
                execution.complete(&node_id);
                break WalkEnd::Completed;
            };

            execution.current_node_id = node_id.clone();
            let outcome = self
                .dispatcher
                .dispatch(node, ctx, &mut execution.variables)
                .await;
            self.append_log(&execution, node, &outcome).await;

            position = match outcome {
                DispatchOutcome::Continue => graph
                    .unlabeled_edge_from(&node_id)
                    .map(|edge| edge.target.clone()),
                DispatchOutcome::Branch(handle) => graph
                    .edge_for_handle(&node_id, &handle)
                    .map(|edge| edge.target.clone()),
                DispatchOutcome::Wait { kind, resume_at } => {
                    execution.suspend(&node_id, kind, resume_at);
                    break WalkEnd::Suspended;
                }
                DispatchOutcome::End => {
                    execution.complete(&node_id);
                    break WalkEnd::Completed;
                }
            };
        };

        self.persist(execution, end).await
    }

    /// The invocation's single conditional write. A version conflict means
    /// another invocation advanced the conversation; its state wins and this
    /// invocation's work is discarded.
    async fn persist(
        &self,
        mut execution: Execution,
        end: WalkEnd,
    ) -> Result<EngineOutcome, EngineError> {
        let expected = execution.version;
        execution.version = expected + 1;
        match self.execution_store.update(&execution, expected).await {
            Ok(()) => Ok(match end {
                WalkEnd::Suspended => EngineOutcome::Suspended {
                    execution_id: execution.id,
                },
                WalkEnd::Completed => EngineOutcome::Completed {
                    execution_id: execution.id,
                },
            }),
            Err(StoreError::VersionConflict { execution_id }) => {
                debug!(%execution_id, "conditional write lost, discarding this invocation");
                Ok(EngineOutcome::Superseded)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Observability only; failure to append never affects the walk.
    async fn append_log(&self, execution: &Execution, node: &crate::node::Node, outcome: &DispatchOutcome) {
        let entry = ExecutionLogEntry::new(
            execution.id,
            node.id.clone(),
            node.kind.name(),
            outcome.summary(),
        );
        if let Err(error) = self.execution_store.append_log(entry).await {
            warn!(execution_id = %execution.id, %error, "failed to append execution log");
        }
    }
}

/// Message-derived variables, written at start and merged on every resume.
fn seed_message_variables(variables: &mut VariableEnvironment, message: &InboundMessage) {
    variables.set("last_message", json!(message.text));
    variables.set("customer_phone", json!(message.customer.phone));
    if let Some(name) = &message.customer.name {
        variables.set("customer_name", json!(name));
    }
    if let Some(button_id) = &message.button_id {
        variables.set("last_button_id", json!(button_id));
    }
    if let Some(row_id) = &message.list_row_id {
        variables.set("last_list_row_id", json!(row_id));
    }
}

/// If the node the execution suspended at asked for the reply in a variable,
/// bind it. `last_message` was already merged, so the bound variable is just
/// a stable alias chosen by the flow author.
fn bind_reply(execution: &mut Execution, graph: &FlowGraph) {
    let Some(node) = graph.node(&execution.current_node_id) else {
        return;
    };
    if let NodeKind::WaitForReply(config) = &node.kind {
        if let Some(name) = &config.variable_name {
            let reply = execution.variables.get_string("last_message");
            execution.variables.set(name, json!(reply));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use copper_sparrow_core::{ChannelId, CustomerId, FlowId};
    use copper_sparrow_messaging::{
        ChannelCredentials, MockGateway, NullRecorder, OutboundMessage,
    };
    use crate::definition::Flow;
    use crate::edge::Edge;
    use crate::execution::WaitKind;
    use crate::memory::{InMemoryChannelDirectory, InMemoryExecutionStore, InMemoryGraphStore};
    use crate::node::{
        Assignment, AssignmentSource, ConditionConfig, ConditionOperator, ConditionRule,
        DelayConfig, EndNodeConfig, Node, SendTextConfig, SetVariableConfig, TriggerNodeConfig,
        WaitForReplyConfig,
    };
    use crate::store::FlowBundle;
    use crate::trigger::TriggerRule;

    struct Fixture {
        engine: FlowEngine,
        gateway: Arc<MockGateway>,
        executions: Arc<InMemoryExecutionStore>,
        graphs: Arc<InMemoryGraphStore>,
        channel_id: ChannelId,
    }

    fn fixture() -> Fixture {
        let gateway = Arc::new(MockGateway::new());
        let executions = Arc::new(InMemoryExecutionStore::new());
        let graphs = Arc::new(InMemoryGraphStore::new());
        let channels = Arc::new(InMemoryChannelDirectory::new());
        let channel_id = ChannelId::new();
        channels.insert(ChannelCredentials {
            channel_id,
            sender_id: "sender".to_string(),
            access_token: "token".to_string(),
        });
        let engine = FlowEngine::new(
            graphs.clone(),
            executions.clone(),
            channels,
            NodeDispatcher::new(gateway.clone(), Arc::new(NullRecorder), reqwest::Client::new()),
            EngineConfig::default(),
        );
        Fixture {
            engine,
            gateway,
            executions,
            graphs,
            channel_id,
        }
    }

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: id.to_string(),
            name: id.to_string(),
            kind,
        }
    }

    fn insert_flow(
        fixture: &Fixture,
        trigger: TriggerRule,
        priority: i32,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> FlowId {
        let flow = Flow {
            id: FlowId::new(),
            channel_id: fixture.channel_id,
            name: "test flow".to_string(),
            trigger,
            priority,
            is_active: true,
            is_published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let id = flow.id;
        fixture.graphs.insert(FlowBundle {
            flow,
            graph: FlowGraph::from_parts(nodes, edges).expect("valid graph"),
        });
        id
    }

    fn message(fixture: &Fixture, customer: &CustomerProfile, text: &str) -> InboundMessage {
        InboundMessage::text(customer.clone(), fixture.channel_id, text)
    }

    fn customer() -> CustomerProfile {
        CustomerProfile {
            id: CustomerId::new(),
            name: Some("Ada".to_string()),
            phone: "+15550100".to_string(),
        }
    }

    fn sent_text(gateway: &MockGateway, index: usize) -> String {
        match &gateway.sent()[index].message {
            OutboundMessage::Text { body } => body.clone(),
            other => panic!("expected text, got {other:?}"),
        }
    }

    /// trigger -> ask -> wait(answer) -> thanks -> end
    fn ask_and_thank(fixture: &Fixture) {
        insert_flow(
            fixture,
            TriggerRule::Keyword {
                keywords: "hi".to_string(),
            },
            10,
            vec![
                node("start", NodeKind::Trigger(TriggerNodeConfig::default())),
                node(
                    "ask",
                    NodeKind::SendText(SendTextConfig {
                        text: "What is the answer?".to_string(),
                    }),
                ),
                node(
                    "wait",
                    NodeKind::WaitForReply(WaitForReplyConfig {
                        expected_type: Default::default(),
                        variable_name: Some("answer".to_string()),
                    }),
                ),
                node(
                    "thanks",
                    NodeKind::SendText(SendTextConfig {
                        text: "Thanks: {{answer}}".to_string(),
                    }),
                ),
                node("done", NodeKind::End(EndNodeConfig::default())),
            ],
            vec![
                Edge::new("start", "ask"),
                Edge::new("ask", "wait"),
                Edge::new("wait", "thanks"),
                Edge::new("thanks", "done"),
            ],
        );
    }

    #[tokio::test]
    async fn start_walks_to_the_wait_node_and_suspends() {
        let fixture = fixture();
        ask_and_thank(&fixture);
        let customer = customer();

        let outcome = fixture
            .engine
            .handle_message(&message(&fixture, &customer, "hi"))
            .await
            .expect("invocation");
        let EngineOutcome::Suspended { execution_id } = outcome else {
            panic!("expected suspension, got {outcome:?}");
        };

        let stored = fixture.executions.get(execution_id).expect("stored");
        assert_eq!(stored.status, ExecutionStatus::Waiting);
        assert_eq!(stored.waiting_for, Some(WaitKind::Any));
        assert_eq!(stored.current_node_id, "wait");
        assert_eq!(stored.version, 1);
        assert_eq!(sent_text(&fixture.gateway, 0), "What is the answer?");
    }

    #[tokio::test]
    async fn resume_binds_reply_and_continues_past_the_wait_node() {
        let fixture = fixture();
        ask_and_thank(&fixture);
        let customer = customer();

        fixture
            .engine
            .handle_message(&message(&fixture, &customer, "hi"))
            .await
            .expect("start");
        let outcome = fixture
            .engine
            .handle_message(&message(&fixture, &customer, "42"))
            .await
            .expect("resume");
        let EngineOutcome::Completed { execution_id } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };

        let stored = fixture.executions.get(execution_id).expect("stored");
        assert_eq!(stored.status, ExecutionStatus::Completed);
        assert_eq!(stored.variables.get_string("answer"), "42");
        assert_eq!(sent_text(&fixture.gateway, 1), "Thanks: 42");
        // The wait node was not re-dispatched: two sends, four log entries.
        assert_eq!(fixture.gateway.sent().len(), 2);
    }

    #[tokio::test]
    async fn second_message_resumes_instead_of_duplicating() {
        let fixture = fixture();
        ask_and_thank(&fixture);
        let customer = customer();

        fixture
            .engine
            .handle_message(&message(&fixture, &customer, "hi"))
            .await
            .expect("start");
        // "hi" also matches the trigger, but the open execution must win.
        fixture
            .engine
            .handle_message(&message(&fixture, &customer, "hi"))
            .await
            .expect("resume");

        assert_eq!(fixture.executions.all().len(), 1);
    }

    #[tokio::test]
    async fn no_trigger_match_is_not_an_error() {
        let fixture = fixture();
        ask_and_thank(&fixture);

        let outcome = fixture
            .engine
            .handle_message(&message(&fixture, &customer(), "goodbye"))
            .await
            .expect("invocation");
        assert_eq!(outcome, EngineOutcome::NoMatch);
        assert!(fixture.executions.all().is_empty());
    }

    #[tokio::test]
    async fn condition_fallthrough_takes_the_default_branch() {
        let fixture = fixture();
        insert_flow(
            &fixture,
            TriggerRule::AnyMessage,
            1,
            vec![
                node("start", NodeKind::Trigger(TriggerNodeConfig::default())),
                node(
                    "age",
                    NodeKind::SetVariable(SetVariableConfig {
                        assignments: vec![Assignment {
                            variable: "age".to_string(),
                            value: "15".to_string(),
                            value_type: AssignmentSource::Template,
                        }],
                    }),
                ),
                node(
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
                ),
                node(
                    "adult_msg",
                    NodeKind::SendText(SendTextConfig {
                        text: "adult path".to_string(),
                    }),
                ),
                node(
                    "minor_msg",
                    NodeKind::SendText(SendTextConfig {
                        text: "minor path".to_string(),
                    }),
                ),
                node("done", NodeKind::End(EndNodeConfig::default())),
            ],
            vec![
                Edge::new("start", "age"),
                Edge::new("age", "gate"),
                Edge::with_handle("gate", "adult_msg", "adult"),
                Edge::with_handle("gate", "minor_msg", "minor"),
                Edge::new("adult_msg", "done"),
                Edge::new("minor_msg", "done"),
            ],
        );

        let outcome = fixture
            .engine
            .handle_message(&message(&fixture, &customer(), "anything"))
            .await
            .expect("invocation");
        assert!(matches!(outcome, EngineOutcome::Completed { .. }));
        assert_eq!(sent_text(&fixture.gateway, 0), "minor path");
    }

    #[tokio::test]
    async fn dead_end_completes_the_execution() {
        let fixture = fixture();
        insert_flow(
            &fixture,
            TriggerRule::AnyMessage,
            1,
            vec![
                node("start", NodeKind::Trigger(TriggerNodeConfig::default())),
                node(
                    "only",
                    NodeKind::SendText(SendTextConfig {
                        text: "bye".to_string(),
                    }),
                ),
            ],
            vec![Edge::new("start", "only")],
        );

        let outcome = fixture
            .engine
            .handle_message(&message(&fixture, &customer(), "x"))
            .await
            .expect("invocation");
        let EngineOutcome::Completed { execution_id } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        let stored = fixture.executions.get(execution_id).expect("stored");
        assert_eq!(stored.status, ExecutionStatus::Completed);
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn delay_suspends_on_a_timer_and_resume_due_continues() {
        let fixture = fixture();
        insert_flow(
            &fixture,
            TriggerRule::AnyMessage,
            1,
            vec![
                node("start", NodeKind::Trigger(TriggerNodeConfig::default())),
                node("pause", NodeKind::Delay(DelayConfig { delay_seconds: 0 })),
                node(
                    "after",
                    NodeKind::SendText(SendTextConfig {
                        text: "back".to_string(),
                    }),
                ),
                node("done", NodeKind::End(EndNodeConfig::default())),
            ],
            vec![
                Edge::new("start", "pause"),
                Edge::new("pause", "after"),
                Edge::new("after", "done"),
            ],
        );

        let outcome = fixture
            .engine
            .handle_message(&message(&fixture, &customer(), "x"))
            .await
            .expect("invocation");
        let EngineOutcome::Suspended { execution_id } = outcome else {
            panic!("expected timer suspension, got {outcome:?}");
        };
        let stored = fixture.executions.get(execution_id).expect("stored");
        assert_eq!(stored.waiting_for, Some(WaitKind::Timer));
        assert!(stored.resume_at.is_some());

        let outcomes = fixture
            .engine
            .resume_due(Utc::now() + Duration::seconds(1))
            .await
            .expect("sweep");
        assert_eq!(outcomes, vec![EngineOutcome::Completed { execution_id }]);
        assert_eq!(sent_text(&fixture.gateway, 0), "back");
    }

    #[tokio::test]
    async fn unknown_node_is_logged_and_skipped() {
        let fixture = fixture();
        insert_flow(
            &fixture,
            TriggerRule::AnyMessage,
            1,
            vec![
                node("start", NodeKind::Trigger(TriggerNodeConfig::default())),
                node("mystery", NodeKind::Unknown),
                node(
                    "after",
                    NodeKind::SendText(SendTextConfig {
                        text: "still here".to_string(),
                    }),
                ),
                node("done", NodeKind::End(EndNodeConfig::default())),
            ],
            vec![
                Edge::new("start", "mystery"),
                Edge::new("mystery", "after"),
                Edge::new("after", "done"),
            ],
        );

        let outcome = fixture
            .engine
            .handle_message(&message(&fixture, &customer(), "x"))
            .await
            .expect("invocation");
        assert!(matches!(outcome, EngineOutcome::Completed { .. }));
        assert_eq!(sent_text(&fixture.gateway, 0), "still here");
        assert!(fixture
            .executions
            .log_entries()
            .iter()
            .any(|entry| entry.node_kind == "unknown"));
    }

    #[tokio::test]
    async fn step_ceiling_aborts_unbounded_cycles() {
        let fixture = fixture();
        let engine_config = EngineConfig { step_ceiling: 16 };
        // Rebuild the engine with a tight ceiling.
        let fixture = Fixture {
            engine: FlowEngine::new(
                fixture.graphs.clone(),
                fixture.executions.clone(),
                {
                    let channels = Arc::new(InMemoryChannelDirectory::new());
                    channels.insert(ChannelCredentials {
                        channel_id: fixture.channel_id,
                        sender_id: "sender".to_string(),
                        access_token: "token".to_string(),
                    });
                    channels
                },
                NodeDispatcher::new(
                    fixture.gateway.clone(),
                    Arc::new(NullRecorder),
                    reqwest::Client::new(),
                ),
                engine_config,
            ),
            ..fixture
        };
        insert_flow(
            &fixture,
            TriggerRule::AnyMessage,
            1,
            vec![
                node("start", NodeKind::Trigger(TriggerNodeConfig::default())),
                node(
                    "spin",
                    NodeKind::SetVariable(SetVariableConfig {
                        assignments: vec![],
                    }),
                ),
            ],
            vec![Edge::new("start", "spin"), Edge::new("spin", "spin")],
        );

        let result = fixture
            .engine
            .handle_message(&message(&fixture, &customer(), "x"))
            .await;
        assert!(matches!(result, Err(EngineError::StepCeiling { limit: 16 })));
    }
}

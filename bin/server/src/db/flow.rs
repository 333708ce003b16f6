//! Flow definitions and graphs from PostgreSQL.
//!
//! Flows are authored elsewhere; this store is read-only. The whole graph is
//! one JSONB document per flow, so the editor can evolve node configs
//! without schema migrations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use copper_sparrow_core::{ChannelId, FlowId};
use copper_sparrow_flow::{
    Flow, FlowBundle, FlowGraph, GraphDoc, GraphStore, StoreError, TriggerRule,
};
use sqlx::{FromRow, PgPool};

use super::{backend_error, decode_id};

/// Row type for flow queries.
#[derive(FromRow)]
struct FlowRow {
    id: String,
    channel_id: String,
    name: String,
    trigger_type: String,
    trigger_value: Option<String>,
    priority: i32,
    is_active: bool,
    is_published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FlowRow {
    fn try_into_flow(self) -> Result<Flow, StoreError> {
        let trigger = match self.trigger_type.as_str() {
            "keyword" => TriggerRule::Keyword {
                keywords: self.trigger_value.unwrap_or_default(),
            },
            "any_message" => TriggerRule::AnyMessage,
            other => {
                return Err(StoreError::Backend {
                    message: format!("flow {} has unknown trigger type '{other}'", self.id),
                });
            }
        };
        Ok(Flow {
            id: decode_id("flow", &self.id)?,
            channel_id: decode_id("channel", &self.channel_id)?,
            name: self.name,
            trigger,
            priority: self.priority,
            is_active: self.is_active,
            is_published: self.is_published,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row type carrying the graph document alongside the flow columns.
#[derive(FromRow)]
struct FlowWithGraphRow {
    #[sqlx(flatten)]
    flow: FlowRow,
    graph: serde_json::Value,
}

/// A [`GraphStore`] over the `flows` table.
pub struct PgGraphStore {
    pool: PgPool,
}

impl PgGraphStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GraphStore for PgGraphStore {
    async fn load_flow(&self, flow_id: FlowId) -> Result<FlowBundle, StoreError> {
        let row: Option<FlowWithGraphRow> = sqlx::query_as(
            r#"
            SELECT id, channel_id, name, trigger_type, trigger_value, priority,
                   is_active, is_published, created_at, updated_at, graph
            FROM flows
            WHERE id = $1
            "#,
        )
        .bind(flow_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;

        let row = row.ok_or_else(|| StoreError::NotFound {
            what: "flow",
            id: flow_id.to_string(),
        })?;
        let doc: GraphDoc =
            serde_json::from_value(row.graph).map_err(|error| StoreError::Backend {
                message: format!("flow {flow_id} has an unreadable graph: {error}"),
            })?;
        let graph = FlowGraph::try_from(doc).map_err(|error| StoreError::Backend {
            message: format!("flow {flow_id} has an inconsistent graph: {error}"),
        })?;
        Ok(FlowBundle {
            flow: row.flow.try_into_flow()?,
            graph,
        })
    }

    async fn find_candidate_flows(&self, channel_id: ChannelId) -> Result<Vec<Flow>, StoreError> {
        let rows: Vec<FlowRow> = sqlx::query_as(
            r#"
            SELECT id, channel_id, name, trigger_type, trigger_value, priority,
                   is_active, is_published, created_at, updated_at
            FROM flows
            WHERE channel_id = $1 AND is_active = TRUE AND is_published = TRUE
            ORDER BY priority DESC
            "#,
        )
        .bind(channel_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend_error)?;

        rows.into_iter().map(FlowRow::try_into_flow).collect()
    }
}

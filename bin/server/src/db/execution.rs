//! Execution state and the execution log in PostgreSQL.
//!
//! The update path is the engine's optimistic lock: the UPDATE is
//! conditional on the version the invocation loaded, and zero affected rows
//! means another invocation advanced the conversation first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use copper_sparrow_core::{ChannelId, CustomerId};
use copper_sparrow_flow::{
    Execution, ExecutionLogEntry, ExecutionStatus, ExecutionStore, StoreError,
    VariableEnvironment, WaitKind,
};
use sqlx::{FromRow, PgPool};

use super::{backend_error, decode_id};

fn status_as_str(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Running => "running",
        ExecutionStatus::Waiting => "waiting",
        ExecutionStatus::Completed => "completed",
    }
}

fn status_from_str(raw: &str) -> ExecutionStatus {
    match raw {
        "waiting" => ExecutionStatus::Waiting,
        "completed" => ExecutionStatus::Completed,
        _ => ExecutionStatus::Running,
    }
}

fn wait_as_str(wait: WaitKind) -> &'static str {
    match wait {
        WaitKind::Any => "any",
        WaitKind::Text => "text",
        WaitKind::Button => "button",
        WaitKind::List => "list",
        WaitKind::Timer => "timer",
    }
}

fn wait_from_str(raw: &str) -> WaitKind {
    match raw {
        "text" => WaitKind::Text,
        "button" => WaitKind::Button,
        "list" => WaitKind::List,
        "timer" => WaitKind::Timer,
        _ => WaitKind::Any,
    }
}

/// Row type for execution queries.
#[derive(FromRow)]
struct ExecutionRow {
    id: String,
    flow_id: String,
    customer_id: String,
    channel_id: String,
    current_node_id: String,
    status: String,
    waiting_for: Option<String>,
    resume_at: Option<DateTime<Utc>>,
    variables: serde_json::Value,
    version: i64,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl ExecutionRow {
    fn try_into_execution(self) -> Result<Execution, StoreError> {
        let variables: VariableEnvironment =
            serde_json::from_value(self.variables).map_err(|error| StoreError::Backend {
                message: format!("execution {} has unreadable variables: {error}", self.id),
            })?;
        Ok(Execution {
            id: decode_id("execution", &self.id)?,
            flow_id: decode_id("flow", &self.flow_id)?,
            customer_id: decode_id("customer", &self.customer_id)?,
            channel_id: decode_id("channel", &self.channel_id)?,
            current_node_id: self.current_node_id,
            status: status_from_str(&self.status),
            waiting_for: self.waiting_for.as_deref().map(wait_from_str),
            resume_at: self.resume_at,
            variables,
            version: self.version,
            started_at: self.started_at,
            completed_at: self.completed_at,
        })
    }
}

/// An [`ExecutionStore`] over the `executions` and `execution_log` tables.
pub struct PgExecutionStore {
    pool: PgPool,
}

impl PgExecutionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn variables_json(execution: &Execution) -> Result<serde_json::Value, StoreError> {
        serde_json::to_value(&execution.variables).map_err(|error| StoreError::Backend {
            message: format!("execution {} variables refuse to serialize: {error}", execution.id),
        })
    }
}

const EXECUTION_COLUMNS: &str = r#"
    id, flow_id, customer_id, channel_id, current_node_id, status,
    waiting_for, resume_at, variables, version, started_at, completed_at
"#;

#[async_trait]
impl ExecutionStore for PgExecutionStore {
    async fn find_open(
        &self,
        customer_id: CustomerId,
        channel_id: ChannelId,
    ) -> Result<Option<Execution>, StoreError> {
        let row: Option<ExecutionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {EXECUTION_COLUMNS}
            FROM executions
            WHERE customer_id = $1 AND channel_id = $2 AND status <> 'completed'
            ORDER BY started_at DESC
            LIMIT 1
            "#,
        ))
        .bind(customer_id.to_string())
        .bind(channel_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;

        row.map(ExecutionRow::try_into_execution).transpose()
    }

    async fn find_due_timers(&self, now: DateTime<Utc>) -> Result<Vec<Execution>, StoreError> {
        let rows: Vec<ExecutionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {EXECUTION_COLUMNS}
            FROM executions
            WHERE status = 'waiting' AND waiting_for = 'timer' AND resume_at <= $1
            ORDER BY resume_at ASC
            "#,
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_error)?;

        rows.into_iter()
            .map(ExecutionRow::try_into_execution)
            .collect()
    }

    async fn create(&self, execution: &Execution) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO executions
                (id, flow_id, customer_id, channel_id, current_node_id, status,
                 waiting_for, resume_at, variables, version, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(execution.id.to_string())
        .bind(execution.flow_id.to_string())
        .bind(execution.customer_id.to_string())
        .bind(execution.channel_id.to_string())
        .bind(&execution.current_node_id)
        .bind(status_as_str(execution.status))
        .bind(execution.waiting_for.map(wait_as_str))
        .bind(execution.resume_at)
        .bind(Self::variables_json(execution)?)
        .bind(execution.version)
        .bind(execution.started_at)
        .bind(execution.completed_at)
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(())
    }

    async fn update(
        &self,
        execution: &Execution,
        expected_version: i64,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE executions
            SET current_node_id = $3, status = $4, waiting_for = $5, resume_at = $6,
                variables = $7, version = $8, completed_at = $9
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(execution.id.to_string())
        .bind(expected_version)
        .bind(&execution.current_node_id)
        .bind(status_as_str(execution.status))
        .bind(execution.waiting_for.map(wait_as_str))
        .bind(execution.resume_at)
        .bind(Self::variables_json(execution)?)
        .bind(execution.version)
        .bind(execution.completed_at)
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::VersionConflict {
                execution_id: execution.id,
            });
        }
        Ok(())
    }

    async fn append_log(&self, entry: ExecutionLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO execution_log (id, execution_id, node_id, node_kind, result, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.execution_id.to_string())
        .bind(&entry.node_id)
        .bind(&entry.node_kind)
        .bind(&entry.result)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(())
    }
}

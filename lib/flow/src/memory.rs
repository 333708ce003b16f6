//! In-memory store implementations for tests and embedding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use copper_sparrow_core::{ChannelId, CustomerId, ExecutionId, FlowId};
use copper_sparrow_messaging::ChannelCredentials;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::definition::Flow;
use crate::execution::{Execution, ExecutionLogEntry, WaitKind};
use crate::store::{
    ChannelDirectory, ExecutionStore, FlowBundle, GraphStore, StoreError,
};

/// A [`GraphStore`] over a hash map.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    flows: Mutex<HashMap<FlowId, FlowBundle>>,
}

impl InMemoryGraphStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a flow and its graph.
    pub fn insert(&self, bundle: FlowBundle) {
        self.flows.lock().unwrap().insert(bundle.flow.id, bundle);
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn load_flow(&self, flow_id: FlowId) -> Result<FlowBundle, StoreError> {
        self.flows
            .lock()
            .unwrap()
            .get(&flow_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                what: "flow",
                id: flow_id.to_string(),
            })
    }

    async fn find_candidate_flows(&self, channel_id: ChannelId) -> Result<Vec<Flow>, StoreError> {
        let mut flows: Vec<Flow> = self
            .flows
            .lock()
            .unwrap()
            .values()
            .map(|bundle| bundle.flow.clone())
            .filter(|flow| flow.channel_id == channel_id && flow.is_active && flow.is_published)
            .collect();
        flows.sort_by_key(|flow| std::cmp::Reverse(flow.priority));
        Ok(flows)
    }
}

/// An [`ExecutionStore`] over hash maps, with real compare-and-swap
/// semantics on update.
#[derive(Debug, Default)]
pub struct InMemoryExecutionStore {
    executions: Mutex<HashMap<ExecutionId, Execution>>,
    log: Mutex<Vec<ExecutionLogEntry>>,
}

impl InMemoryExecutionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one execution, for assertions.
    #[must_use]
    pub fn get(&self, execution_id: ExecutionId) -> Option<Execution> {
        self.executions.lock().unwrap().get(&execution_id).cloned()
    }

    /// Snapshot of the execution log, for assertions.
    #[must_use]
    pub fn log_entries(&self) -> Vec<ExecutionLogEntry> {
        self.log.lock().unwrap().clone()
    }

    /// Snapshot of every stored execution, for assertions.
    #[must_use]
    pub fn all(&self) -> Vec<Execution> {
        self.executions.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn find_open(
        &self,
        customer_id: CustomerId,
        channel_id: ChannelId,
    ) -> Result<Option<Execution>, StoreError> {
        Ok(self
            .executions
            .lock()
            .unwrap()
            .values()
            .find(|execution| {
                execution.customer_id == customer_id
                    && execution.channel_id == channel_id
                    && execution.is_open()
            })
            .cloned())
    }

    async fn find_due_timers(&self, now: DateTime<Utc>) -> Result<Vec<Execution>, StoreError> {
        Ok(self
            .executions
            .lock()
            .unwrap()
            .values()
            .filter(|execution| {
                execution.is_open()
                    && execution.waiting_for == Some(WaitKind::Timer)
                    && execution.resume_at.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect())
    }

    async fn create(&self, execution: &Execution) -> Result<(), StoreError> {
        self.executions
            .lock()
            .unwrap()
            .insert(execution.id, execution.clone());
        Ok(())
    }

    async fn update(
        &self,
        execution: &Execution,
        expected_version: i64,
    ) -> Result<(), StoreError> {
        let mut executions = self.executions.lock().unwrap();
        let stored = executions
            .get_mut(&execution.id)
            .ok_or_else(|| StoreError::NotFound {
                what: "execution",
                id: execution.id.to_string(),
            })?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                execution_id: execution.id,
            });
        }
        *stored = execution.clone();
        Ok(())
    }

    async fn append_log(&self, entry: ExecutionLogEntry) -> Result<(), StoreError> {
        self.log.lock().unwrap().push(entry);
        Ok(())
    }
}

/// A [`ChannelDirectory`] over a fixed map.
#[derive(Debug, Default)]
pub struct InMemoryChannelDirectory {
    channels: Mutex<HashMap<ChannelId, ChannelCredentials>>,
}

impl InMemoryChannelDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, credentials: ChannelCredentials) {
        self.channels
            .lock()
            .unwrap()
            .insert(credentials.channel_id, credentials);
    }
}

#[async_trait]
impl ChannelDirectory for InMemoryChannelDirectory {
    async fn credentials(&self, channel_id: ChannelId) -> Option<ChannelCredentials> {
        self.channels.lock().unwrap().get(&channel_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableEnvironment;

    fn execution() -> Execution {
        Execution::start(
            FlowId::new(),
            CustomerId::new(),
            ChannelId::new(),
            "start",
            VariableEnvironment::new(),
        )
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let store = InMemoryExecutionStore::new();
        let mut exec = execution();
        store.create(&exec).await.expect("create");

        exec.version = 1;
        store.update(&exec, 0).await.expect("first update");

        // A second writer still holding version 0 must lose.
        let mut stale = store.get(exec.id).expect("stored");
        stale.version = 1;
        stale.current_node_id = "elsewhere".to_string();
        let result = store.update(&stale, 0).await;
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));

        let stored = store.get(exec.id).expect("stored");
        assert_eq!(stored.current_node_id, "start");
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn find_open_skips_completed() {
        let store = InMemoryExecutionStore::new();
        let mut exec = execution();
        exec.complete("done");
        store.create(&exec).await.expect("create");

        let found = store
            .find_open(exec.customer_id, exec.channel_id)
            .await
            .expect("query");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn due_timers_respect_resume_at() {
        let store = InMemoryExecutionStore::new();
        let mut due = execution();
        due.suspend("pause", WaitKind::Timer, Some(Utc::now() - chrono::Duration::seconds(5)));
        store.create(&due).await.expect("create");

        let mut not_due = execution();
        not_due.suspend(
            "pause",
            WaitKind::Timer,
            Some(Utc::now() + chrono::Duration::seconds(60)),
        );
        store.create(&not_due).await.expect("create");

        let found = store.find_due_timers(Utc::now()).await.expect("query");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, due.id);
    }
}
